mod argument;
mod compiled;
mod effect;
mod error;
mod expr;
mod instruction;
mod placeholder;
mod raw_data;
mod reference;
mod tables;
mod value_type;

pub use argument::{parse_signature, ArgumentBinding};
pub use compiled::{CompiledEffects, CompiledExpression, RuleCompilationResult};
pub(crate) use effect::strip_quotes;
pub use effect::{Effect, EventParam};
pub use error::{CompileError, DecompileError, NameTableError};
pub use expr::{AssignOp, BinaryOp, Expr, Statement, Symbol, MAX_DEPTH};
pub use instruction::{Instruction, InstructionError, InstructionSet, Opcode};
pub(crate) use placeholder::intern;
pub use placeholder::Placeholder;
pub use raw_data::{RawDataEntry, RawDataError, RawDataKind, RawDataTable};
pub use reference::{GlobalVariable, ReferenceBinding, ReferenceKind};
pub use tables::{NameResolver, NameTables, ReferenceEntry, TrackerEntry};
pub use value_type::ValueType;
