use thiserror::Error;

use crate::abi::AbiError;

use super::expr::MAX_DEPTH;
use super::instruction::InstructionError;

/// Problems with the name tables themselves, reported before any lookup so
/// that a name or ID never silently binds to the first of two entries.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameTableError {
    #[error("{kind} name '{name}' is registered more than once")]
    DuplicateName { kind: &'static str, name: String },

    #[error("{kind} ID {id} is registered more than once")]
    DuplicateId { kind: &'static str, id: u32 },

    #[error("{kind} name '{name}' is not a valid identifier")]
    InvalidName { kind: &'static str, name: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("unsupported type '{ty}'")]
    UnsupportedType { ty: String },

    #[error("malformed signature '{declaration}': {reason}")]
    MalformedSignature { declaration: String, reason: String },

    #[error("malformed expression at offset {offset}: {message}")]
    MalformedExpression { offset: usize, message: String },

    #[error("unresolved {kind} reference '{name}'")]
    UnresolvedReference { kind: &'static str, name: String },

    #[error("tracker update 'TRU:{name}' is only allowed as the target of an effect")]
    MisplacedTrackerUpdate { name: String },

    #[error("tracker '{name}' {problem}")]
    TrackerKeyMismatch { name: String, problem: &'static str },

    #[error("effect text is empty")]
    EmptyEffect,

    #[error(transparent)]
    NameTable(#[from] NameTableError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecompileError {
    #[error(transparent)]
    Instruction(#[from] InstructionError),

    #[error(transparent)]
    Abi(#[from] AbiError),

    #[error(transparent)]
    NameTable(#[from] NameTableError),

    #[error("instruction set is empty")]
    Empty,

    #[error("placeholder {index} is out of range for a table of {len}")]
    PlaceholderOutOfRange { index: usize, len: usize },

    #[error("placeholder {index} has contradictory source flags")]
    InvalidPlaceholder { index: usize },

    #[error("no name for {kind} {id}")]
    UnknownName { kind: &'static str, id: u32 },

    #[error("slot {slot} is read at word {position} but is missing or already consumed")]
    SlotUnavailable { position: usize, slot: usize },

    #[error("write-back at word {position} is not the final instruction")]
    MisplacedWriteBack { position: usize },

    #[error("instruction set leaves {count} unconsumed values")]
    DanglingValues { count: usize },

    #[error("value built at word {position} nests deeper than {} levels", MAX_DEPTH)]
    TooDeep { position: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_type_message() {
        let err = CompileError::UnsupportedType { ty: "uint8".into() };
        assert_eq!(err.to_string(), "unsupported type 'uint8'");
    }

    #[test]
    fn malformed_expression_message() {
        let err = CompileError::MalformedExpression {
            offset: 4,
            message: "expected expression".into(),
        };
        assert_eq!(
            err.to_string(),
            "malformed expression at offset 4: expected expression"
        );
    }

    #[test]
    fn unresolved_reference_message() {
        let err = CompileError::UnresolvedReference {
            kind: "tracker",
            name: "balance".into(),
        };
        assert_eq!(err.to_string(), "unresolved tracker reference 'balance'");
    }

    #[test]
    fn misplaced_update_message() {
        let err = CompileError::MisplacedTrackerUpdate {
            name: "balance".into(),
        };
        assert_eq!(
            err.to_string(),
            "tracker update 'TRU:balance' is only allowed as the target of an effect"
        );
    }

    #[test]
    fn key_mismatch_message() {
        let err = CompileError::TrackerKeyMismatch {
            name: "limits".into(),
            problem: "is mapped and needs a key",
        };
        assert_eq!(err.to_string(), "tracker 'limits' is mapped and needs a key");
    }

    #[test]
    fn unknown_name_message() {
        let err = DecompileError::UnknownName {
            kind: "tracker",
            id: 3,
        };
        assert_eq!(err.to_string(), "no name for tracker 3");
    }

    #[test]
    fn dangling_values_message() {
        let err = DecompileError::DanglingValues { count: 2 };
        assert_eq!(err.to_string(), "instruction set leaves 2 unconsumed values");
    }

    #[test]
    fn too_deep_message() {
        let err = DecompileError::TooDeep { position: 130 };
        assert_eq!(
            err.to_string(),
            "value built at word 130 nests deeper than 64 levels"
        );
    }

    #[test]
    fn name_table_messages() {
        let err = CompileError::from(NameTableError::DuplicateId {
            kind: "tracker",
            id: 2,
        });
        assert_eq!(err.to_string(), "tracker ID 2 is registered more than once");
        let err = DecompileError::from(NameTableError::InvalidName {
            kind: "foreign call",
            name: "get-score".into(),
        });
        assert_eq!(
            err.to_string(),
            "foreign call name 'get-score' is not a valid identifier"
        );
    }

    #[test]
    fn instruction_error_is_transparent() {
        let err = DecompileError::from(InstructionError::OperandOverflow { position: 6 });
        assert_eq!(
            err.to_string(),
            "operand of instruction at word 6 does not fit an index"
        );
    }
}
