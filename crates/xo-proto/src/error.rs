//! Error types for the xo-proto crate.

use thiserror::Error;

/// Errors that can occur while encoding or decoding protocol frames.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Failed to encode a frame.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Failed to decode a frame.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// Request parameters did not serialize to a JSON object.
    #[error("params for {method} must be a JSON object, got {found}")]
    InvalidParams {
        /// Method the params were built for.
        method: String,
        /// JSON type that was produced instead.
        found: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_params_display() {
        let err = ProtoError::InvalidParams {
            method: "vm.start".to_string(),
            found: "array",
        };
        assert_eq!(err.to_string(), "params for vm.start must be a JSON object, got array");
    }
}
