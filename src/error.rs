//! Error types for the citizen assistant

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Knowledge store error: {0}")]
    StoreError(String),

    #[error("Vector index error: {0}")]
    VectorDbError(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Rerank error: {0}")]
    RerankError(String),

    #[error("Rate limit store error: {0}")]
    RateLimitError(String),

    #[error("OpenAI API error: {0}")]
    OpenAiError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::ConnectionError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<qdrant_client::QdrantError> for Error {
    fn from(err: qdrant_client::QdrantError) -> Self {
        Error::VectorDbError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_store_error() {
        let err = Error::StoreError("timeout".to_string());
        assert!(err.to_string().contains("Knowledge store error"));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_error_display_vector_db_error() {
        let err = Error::VectorDbError("collection missing".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Vector index error"));
        assert!(msg.contains("collection missing"));
    }

    #[test]
    fn test_error_display_embedding_error() {
        let err = Error::EmbeddingError("no embedding returned".to_string());
        assert!(err.to_string().contains("Embedding error"));
    }

    #[test]
    fn test_error_display_rerank_error() {
        let err = Error::RerankError("status 502".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Rerank error"));
        assert!(msg.contains("502"));
    }

    #[test]
    fn test_error_display_rate_limit_error() {
        let err = Error::RateLimitError("pipeline failed".to_string());
        assert!(err.to_string().contains("Rate limit store error"));
    }

    #[test]
    fn test_error_display_openai_error() {
        let err = Error::OpenAiError("rate limit exceeded".to_string());
        assert!(err.to_string().contains("OpenAI"));
        assert!(err.to_string().contains("rate limit"));
    }

    #[test]
    fn test_error_display_invalid_argument() {
        let err = Error::InvalidArgument("missing required field".to_string());
        assert!(err.to_string().contains("Invalid argument"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::IoError(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();

        assert!(matches!(err, Error::SerializationError(_)));
        assert!(err.to_string().contains("Serialization error"));
    }

    #[test]
    fn test_error_display_connection_error() {
        let err = Error::ConnectionError("refused".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Connection error"));
        assert!(msg.contains("refused"));
    }

    #[test]
    fn test_error_display_unknown() {
        let err = Error::Unknown("something went wrong".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Unknown error"));
        assert!(msg.contains("something went wrong"));
    }

    #[test]
    fn test_result_type_err() {
        let result: Result<i32> = Err(Error::Unknown("test".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_error_all_variants_debug() {
        let variants: Vec<Error> = vec![
            Error::StoreError("store".to_string()),
            Error::VectorDbError("vector".to_string()),
            Error::EmbeddingError("embed".to_string()),
            Error::RerankError("rerank".to_string()),
            Error::RateLimitError("limit".to_string()),
            Error::OpenAiError("openai".to_string()),
            Error::SerializationError("serial".to_string()),
            Error::InvalidArgument("arg".to_string()),
            Error::ConnectionError("conn".to_string()),
            Error::Unknown("unknown".to_string()),
        ];

        for err in variants {
            let debug_str = format!("{:?}", err);
            assert!(!debug_str.is_empty());
        }
    }

    #[test]
    fn test_error_from_io_various_kinds() {
        let kinds = [
            std::io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::ConnectionRefused,
            std::io::ErrorKind::TimedOut,
        ];

        for kind in kinds {
            let io_err = std::io::Error::new(kind, "test");
            let err: Error = io_err.into();
            assert!(matches!(err, Error::IoError(_)));
        }
    }

    #[test]
    fn test_result_map() {
        let result: Result<i32> = Ok(10);
        let mapped = result.map(|x| x * 2);
        assert_eq!(mapped.unwrap(), 20);
    }

    #[test]
    fn test_result_unwrap_or_else() {
        let result: Result<i32> = Err(Error::Unknown("error".to_string()));
        let value = result.unwrap_or_else(|_| 42);
        assert_eq!(value, 42);
    }
}
