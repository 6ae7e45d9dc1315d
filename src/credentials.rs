use std::fmt;

/// Service-principal credentials for the client-credentials grant.
///
/// Stored verbatim; nothing is validated until the identity provider sees them.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    scope: String,
}

impl Credentials {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: scope.into(),
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// `{host}/{tenant_id}`
    pub fn authority(&self, authority_host: &str) -> String {
        format!(
            "{}/{}",
            authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scope", &self.scope)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authority() {
        let creds = Credentials::new("tenant-1", "app", "secret", "scope/.default");
        assert_eq!(
            creds.authority("https://login.microsoftonline.com/"),
            "https://login.microsoftonline.com/tenant-1"
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = Credentials::new("t", "c", "super-secret", "s");
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
