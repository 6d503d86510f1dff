//! Integration tests for error types

#[cfg(test)]
mod tests {
    use repofetch_errors::*;

    #[test]
    fn test_error_conversion() {
        let net_err = NetworkError::Timeout {
            url: "https://example.com".into(),
        };
        let err: Error = net_err.into();
        assert!(matches!(err, Error::Network(_)));
        assert!(err.is_retryable());
        assert_eq!(err.user_code(), Some("error.network.timeout"));
    }

    #[test]
    fn test_error_display() {
        let err = MetadataError::PrimaryNotFound {
            repo_url: "https://mirror.example/BaseOS/x86_64/os/".into(),
        };
        assert_eq!(
            err.to_string(),
            "primary metadata not found for https://mirror.example/BaseOS/x86_64/os/"
        );
    }

    #[test]
    fn test_unsatisfiable_lists_requested() {
        let err = ResolveError::Unsatisfiable {
            requested: vec!["bash".into(), "vim".into()],
            explanation: "nothing provides libfoo needed by vim".into(),
        };
        let text = err.to_string();
        assert!(text.contains("bash, vim"));
        assert!(text.contains("nothing provides libfoo"));
    }

    #[test]
    fn test_http_status_retryability() {
        let server_err = NetworkError::HttpError {
            url: "u".into(),
            status: 503,
            message: "Service Unavailable".into(),
        };
        let client_err = NetworkError::HttpError {
            url: "u".into(),
            status: 404,
            message: "Not Found".into(),
        };
        assert!(server_err.is_retryable());
        assert!(!client_err.is_retryable());
        assert!(client_err.user_hint().is_some());
    }

    #[test]
    fn test_error_clone() {
        let err = DeliveryError::AttemptsExhausted {
            url: "https://h/a.deb".into(),
            destination: "downloads/deb/a.deb".into(),
            attempts: 3,
            last_error: "connection reset".into(),
        };
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let err = Error::io_with_path(&io_err, "/tmp/out");
        match err {
            Error::Io { kind, path, message } => {
                assert_eq!(kind, std::io::ErrorKind::PermissionDenied);
                assert_eq!(path, Some(std::path::PathBuf::from("/tmp/out")));
                assert!(message.starts_with("/tmp/out"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_helper_failed_without_code() {
        let err = PlatformError::HelperFailed {
            helper: "depsolve".into(),
            code: None,
            stderr: "killed".into(),
        };
        assert_eq!(err.to_string(), "depsolve failed with exit code none: killed");
    }

    #[test]
    fn test_cancelled() {
        assert!(Error::Cancelled.is_cancelled());
        assert_eq!(Error::Cancelled.user_code(), Some("error.cancelled"));
    }
}
