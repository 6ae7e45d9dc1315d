//! Client-credentials token acquisition.

use crate::config::ClientConfig;
use crate::credentials::Credentials;
use crate::error::{PbiError, Result};
use crate::transport::{HttpRequest, HttpTransport};
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info, warn};

/// Opaque bearer credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BearerToken(<redacted>)")
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

pub fn token_endpoint(credentials: &Credentials, config: &ClientConfig) -> String {
    format!(
        "{}/oauth2/v2.0/token",
        credentials.authority(&config.authority_host)
    )
}

/// Run the client-credentials grant and return the issued token.
pub fn fetch_token<T: HttpTransport>(
    transport: &T,
    credentials: &Credentials,
    config: &ClientConfig,
) -> Result<BearerToken> {
    let url = token_endpoint(credentials, config);
    debug!(target: "auth", "Requesting token from {}", url);

    let form = vec![
        ("grant_type".to_string(), "client_credentials".to_string()),
        ("client_id".to_string(), credentials.client_id().to_string()),
        (
            "client_secret".to_string(),
            credentials.client_secret().to_string(),
        ),
        ("scope".to_string(), credentials.scope().to_string()),
    ];

    let response = transport
        .send(HttpRequest::post(url).form(form))
        .map_err(|e| PbiError::Authentication(e.to_string()))?;

    let parsed: Option<TokenResponse> = serde_json::from_str(&response.body).ok();

    let token = parsed
        .as_ref()
        .filter(|_| response.status == 200)
        .and_then(|r| r.access_token.as_deref())
        .filter(|t| !t.is_empty());

    match token {
        Some(token) => {
            let expires_in = parsed.as_ref().and_then(|r| r.expires_in);
            info!(target: "auth", "Token acquired (expires_in: {:?}s)", expires_in);
            Ok(BearerToken::new(token))
        }
        None => {
            let reason = describe_failure(response.status, parsed.as_ref());
            warn!(target: "auth", "Token request failed: {}", reason);
            Err(PbiError::Authentication(reason))
        }
    }
}

fn describe_failure(status: u16, parsed: Option<&TokenResponse>) -> String {
    match parsed {
        Some(TokenResponse {
            error: Some(error),
            error_description,
            ..
        }) => match error_description {
            Some(desc) => format!("{} ({}): {}", error, status, desc),
            None => format!("{} ({})", error, status),
        },
        Some(_) if status == 200 => "response did not contain an access token".to_string(),
        Some(_) => format!("identity provider returned status {}", status),
        None => format!("unreadable token response (status {})", status),
    }
}
