use thiserror::Error;

/// Top-level error type for Knowbot.
///
/// Subsystem crates define their own error enums; this one covers the
/// cross-cutting failures (configuration, I/O, serialization, server setup)
/// that the composition root has to deal with.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KnowbotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for KnowbotError {
    fn from(err: toml::de::Error) -> Self {
        KnowbotError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for KnowbotError {
    fn from(err: toml::ser::Error) -> Self {
        KnowbotError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for KnowbotError {
    fn from(err: serde_json::Error) -> Self {
        KnowbotError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Knowbot operations.
pub type Result<T> = std::result::Result<T, KnowbotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let cases: Vec<(KnowbotError, &str)> = vec![
            (
                KnowbotError::Config("bad key".to_string()),
                "Configuration error: bad key",
            ),
            (
                KnowbotError::Api("bind failed".to_string()),
                "API error: bind failed",
            ),
            (
                KnowbotError::Serialization("invalid json".to_string()),
                "Serialization error: invalid json",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: KnowbotError = io_err.into();
        assert!(matches!(err, KnowbotError::Io(_)));
        assert!(err.to_string().starts_with("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let knowbot_err: KnowbotError = err.unwrap_err().into();
        assert!(matches!(knowbot_err, KnowbotError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let knowbot_err: KnowbotError = err.unwrap_err().into();
        assert!(matches!(knowbot_err, KnowbotError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
