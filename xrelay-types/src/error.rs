//! Error types shared by the relayer crates.

use thiserror::Error;

/// Malformed binary input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unexpected end of input reading {field} at offset {offset}")]
    UnexpectedEof { field: &'static str, offset: usize },

    #[error("non-canonical var-uint for {field} at offset {offset}")]
    NonCanonicalVarInt { field: &'static str, offset: usize },

    #[error("{remaining} trailing bytes after decoded value")]
    TrailingBytes { remaining: usize },

    #[error("invalid utf-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    #[error("invalid audit path direction {0:#04x}")]
    InvalidDirection(u8),

    #[error("{0}")]
    Invalid(String),
}

/// Keeper key parsing and encoding failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The key uses a scheme the encoder refuses to commit to.
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("unknown curve: {0}")]
    UnknownCurve(String),

    #[error("invalid public key: {0}")]
    InvalidKey(String),
}

/// Classified failure of a relayer operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// A required input was missing before the operation started.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The chain has not reached the height needed to produce the proof yet.
    #[error("proof unavailable: {0}")]
    ProofUnavailable(String),

    /// Malformed payload; `context` names where the bytes came from.
    #[error("decode error ({context}): {reason}")]
    Decode { context: String, reason: String },

    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    TransientNetwork(String),

    /// The chain adapter cannot perform the requested operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl RelayError {
    /// Build a decode error tagged with the provenance of the offending bytes.
    pub fn decode(context: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        RelayError::Decode {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the caller should back off and try again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RelayError::ProofUnavailable(_) | RelayError::TransientNetwork(_)
        )
    }

    /// Short machine-friendly label, used as a tracing field.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Configuration(_) => "configuration",
            RelayError::ProofUnavailable(_) => "proof_unavailable",
            RelayError::Decode { .. } => "decode",
            RelayError::UnsupportedKeyType(_) => "unsupported_key_type",
            RelayError::NotFound(_) => "not_found",
            RelayError::TransientNetwork(_) => "transient_network",
            RelayError::Unsupported(_) => "unsupported",
        }
    }
}

impl From<CodecError> for RelayError {
    fn from(err: CodecError) -> Self {
        RelayError::decode("binary payload", err)
    }
}

impl From<KeyError> for RelayError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::UnsupportedKeyType(what) => RelayError::UnsupportedKeyType(what),
            other => RelayError::decode("keeper key", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(RelayError::ProofUnavailable("h".into()).is_retryable());
        assert!(RelayError::TransientNetwork("io".into()).is_retryable());
        assert!(!RelayError::NotFound("tx".into()).is_retryable());
        assert!(!RelayError::Configuration("epoch".into()).is_retryable());
        assert!(!RelayError::decode("height 5", "bad").is_retryable());
        assert!(!RelayError::UnsupportedKeyType("ed25519".into()).is_retryable());
    }

    #[test]
    fn test_key_error_conversion_keeps_unsupported_distinct() {
        let err: RelayError = KeyError::UnsupportedKeyType("ed25519".into()).into();
        assert!(matches!(err, RelayError::UnsupportedKeyType(_)));

        let err: RelayError = KeyError::UnknownCurve("brainpool".into()).into();
        assert!(matches!(err, RelayError::Decode { .. }));
    }
}
