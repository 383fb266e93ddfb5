use thiserror::Error;

use crate::types::{CompileError, DecompileError, InstructionError, RawDataError};

/// Unified error type for whole-rule operations.
///
/// Returned by [`compile_rule`](crate::compile_rule),
/// [`decompile_rule`](crate::decompile_rule) and the JSON helpers on
/// [`RuleDefinition`](crate::RuleDefinition).
#[derive(Debug, Error)]
pub enum RulecodeError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Decompile(#[from] DecompileError),

    #[error(transparent)]
    Instruction(#[from] InstructionError),

    #[error(transparent)]
    RawData(#[from] RawDataError),

    #[error("invalid rule document: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Serialize(#[from] crate::serial::SerializeError),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Deserialize(#[from] crate::serial::DeserializeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_errors_pass_through() {
        let err = RulecodeError::from(CompileError::EmptyEffect);
        assert_eq!(err.to_string(), CompileError::EmptyEffect.to_string());
    }

    #[test]
    fn decompile_errors_pass_through() {
        let err = RulecodeError::from(DecompileError::Empty);
        assert!(matches!(err, RulecodeError::Decompile(DecompileError::Empty)));
        assert_eq!(err.to_string(), DecompileError::Empty.to_string());
    }

    #[test]
    fn raw_data_errors_pass_through() {
        let err = RulecodeError::from(RawDataError::UnknownKind(9));
        assert_eq!(err.to_string(), "unknown raw data kind tag 9");
    }

    #[test]
    fn json_errors_are_labelled() {
        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = RulecodeError::from(json);
        assert!(err.to_string().starts_with("invalid rule document: "));
    }
}
