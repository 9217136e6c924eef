use std::io;
use std::path::PathBuf;

/// Failures from the AI completion boundary.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("API key not configured; set it with /config set apiKey <key>")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("empty or unparsable response from API")]
    EmptyResponse,
}

/// Errors surfaced at the session-loop boundary. Everything except `Fatal`
/// is printed as a single line and the loop keeps running.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{0}")]
    Usage(String),
    #[error("{}: {source}", .path.display())]
    Filesystem { path: PathBuf, source: io::Error },
    #[error("config: {0}")]
    ConfigValidation(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("fatal: {0}")]
    Fatal(String),
}

impl SessionError {
    pub fn usage(msg: impl Into<String>) -> Self {
        SessionError::Usage(msg.into())
    }

    pub fn fs(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SessionError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::MissingApiKey;
        assert_eq!(
            err.to_string(),
            "API key not configured; set it with /config set apiKey <key>"
        );

        let err = BackendError::Api {
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "API error 401: unauthorized");

        let err = BackendError::EmptyResponse;
        assert_eq!(err.to_string(), "empty or unparsable response from API");
    }

    #[test]
    fn test_session_error_display() {
        let err = SessionError::usage("usage: /cat <file>");
        assert_eq!(err.to_string(), "usage: /cat <file>");

        let err = SessionError::fs(
            "/tmp/missing",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(err.to_string(), "/tmp/missing: no such file");

        let err = SessionError::ConfigValidation("unknown key `foo`".to_string());
        assert_eq!(err.to_string(), "config: unknown key `foo`");

        let err = SessionError::Fatal("stdin closed".to_string());
        assert_eq!(err.to_string(), "fatal: stdin closed");
    }

    #[test]
    fn test_backend_error_converts_to_session_error() {
        let err: SessionError = BackendError::MissingApiKey.into();
        assert!(matches!(err, SessionError::Backend(_)));
        assert!(err.to_string().contains("API key not configured"));
    }

    #[test]
    fn test_filesystem_error_keeps_path() {
        let err = SessionError::fs(
            "proj/sub",
            io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        );
        let SessionError::Filesystem { path, .. } = &err else {
            panic!("expected filesystem error");
        };
        assert_eq!(path, &PathBuf::from("proj/sub"));
    }
}
