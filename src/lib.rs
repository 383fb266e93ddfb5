//! Compiler and decompiler for the condition and effect expressions of an
//! on-chain rules engine.
//!
//! Conditions such as `FC:getScore(to) > 10 AND TR:balance >= value` compile
//! to a flat instruction set of 256-bit words plus a placeholder table and a
//! raw data table; [`decompile_condition`] turns the result back into text
//! that recompiles to the same words.
//!
//! ```
//! use rulecode::{compile_condition, decompile_condition, NameTables, ValueType};
//!
//! let tables = NameTables::from_signature("address to, uint256 value")
//!     .unwrap()
//!     .tracker("balance", 1, ValueType::Uint256);
//! let compiled = compile_condition("value <= TR:balance", &tables).unwrap();
//! assert_eq!(compiled.placeholders.len(), 2);
//! assert_eq!(
//!     decompile_condition(&compiled, &tables).unwrap(),
//!     "value <= TR:balance"
//! );
//! ```

pub mod abi;
mod compile;
mod decompile;
mod effects;
mod error;
mod parse;
mod resolve;
mod rule;
#[cfg(feature = "binary-cache")]
pub mod serial;
mod types;

pub use compile::compile_condition;
pub use decompile::{decompile_condition, decompile_effect, decompile_instructions};
pub use effects::{compile_effect, compile_effects};
pub use error::RulecodeError;
pub use parse::{parse_condition, parse_statement};
pub use rule::{compile_rule, decompile_rule, RuleDefinition};
#[cfg(feature = "binary-cache")]
pub use serial::{DeserializeError, SerializeError};
pub use types::{
    parse_signature, ArgumentBinding, AssignOp, BinaryOp, CompileError, CompiledEffects,
    CompiledExpression, DecompileError, Effect, EventParam, Expr, GlobalVariable, Instruction,
    InstructionError, InstructionSet, NameResolver, NameTableError, NameTables, Opcode,
    Placeholder, RawDataEntry, RawDataError, RawDataKind, RawDataTable, ReferenceBinding,
    ReferenceEntry, ReferenceKind, RuleCompilationResult, Statement, Symbol, TrackerEntry,
    ValueType, MAX_DEPTH,
};
