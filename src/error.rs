use thiserror::Error;

pub type Result<T> = std::result::Result<T, PbiError>;

/// Everything the client can fail with.
///
/// Nothing here is retried. Each error reaches the caller of the operation that hit it.
#[derive(Debug, Error)]
pub enum PbiError {
    /// The identity provider did not hand out a usable token.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// An authenticated operation was attempted before `fetch_token`.
    #[error("no access token, call fetch_token() first")]
    NotAuthenticated,

    /// The analytics API answered with a status other than the expected one.
    #[error("API error: {status} - {body}")]
    Api { status: u16, body: String },

    /// The query engine answered 200 but not with `results[0].tables[0].rows`.
    #[error("unexpected query result shape: {0}")]
    QueryResultShape(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// A success response whose body is not the JSON we asked for.
    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("XLSX error: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),
}

impl PbiError {
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        PbiError::Api {
            status,
            body: body.into(),
        }
    }

    /// HTTP status carried by an `Api` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            PbiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PbiError {
    fn from(err: reqwest::Error) -> Self {
        PbiError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = PbiError::api(400, "Bad Request");
        assert_eq!(err.to_string(), "API error: 400 - Bad Request");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_status_only_for_api_errors() {
        assert_eq!(PbiError::NotAuthenticated.status(), None);
        assert_eq!(PbiError::Transport("reset".into()).status(), None);
    }
}
