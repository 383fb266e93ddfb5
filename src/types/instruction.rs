use std::fmt;

use ruint::aliases::U256;
use thiserror::Error;

use super::expr::BinaryOp;
use super::raw_data::RawDataEntry;

/// Opcode numbering of the engine's instruction stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Literal = 0,
    Not = 1,
    Placeholder = 2,
    MappedAssign = 3,
    MappedPlaceholder = 4,
    Add = 5,
    Sub = 6,
    Mul = 7,
    Div = 8,
    Lt = 9,
    Gt = 10,
    Eq = 11,
    And = 12,
    Or = 13,
    Gte = 14,
    Lte = 15,
    Neq = 16,
    TrackerUpdate = 17,
    TrackerUpdatePlaceholder = 18,
}

impl Opcode {
    const ALL: [Opcode; 19] = [
        Opcode::Literal,
        Opcode::Not,
        Opcode::Placeholder,
        Opcode::MappedAssign,
        Opcode::MappedPlaceholder,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Lt,
        Opcode::Gt,
        Opcode::Eq,
        Opcode::And,
        Opcode::Or,
        Opcode::Gte,
        Opcode::Lte,
        Opcode::Neq,
        Opcode::TrackerUpdate,
        Opcode::TrackerUpdatePlaceholder,
    ];

    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn from_code(code: u64) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Number of operand words following the opcode word.
    #[must_use]
    pub fn operand_count(self) -> usize {
        match self {
            Opcode::Literal | Opcode::Not | Opcode::Placeholder => 1,
            Opcode::MappedAssign => 3,
            _ => 2,
        }
    }

    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Literal => "N",
            Opcode::Not => "NOT",
            Opcode::Placeholder => "PLH",
            Opcode::MappedAssign => "ASSIGN",
            Opcode::MappedPlaceholder => "PLHM",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Lt => "LT",
            Opcode::Gt => "GT",
            Opcode::Eq => "EQ",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Gte => "GTE",
            Opcode::Lte => "LTE",
            Opcode::Neq => "NEQ",
            Opcode::TrackerUpdate => "TRU",
            Opcode::TrackerUpdatePlaceholder => "TRUP",
        }
    }

    #[must_use]
    pub fn binary(op: BinaryOp) -> Self {
        match op {
            BinaryOp::Add => Opcode::Add,
            BinaryOp::Sub => Opcode::Sub,
            BinaryOp::Mul => Opcode::Mul,
            BinaryOp::Div => Opcode::Div,
            BinaryOp::Lt => Opcode::Lt,
            BinaryOp::Gt => Opcode::Gt,
            BinaryOp::Eq => Opcode::Eq,
            BinaryOp::And => Opcode::And,
            BinaryOp::Or => Opcode::Or,
            BinaryOp::Gte => Opcode::Gte,
            BinaryOp::Lte => Opcode::Lte,
            BinaryOp::Neq => Opcode::Neq,
        }
    }

    #[must_use]
    pub fn as_binary(self) -> Option<BinaryOp> {
        Some(match self {
            Opcode::Add => BinaryOp::Add,
            Opcode::Sub => BinaryOp::Sub,
            Opcode::Mul => BinaryOp::Mul,
            Opcode::Div => BinaryOp::Div,
            Opcode::Lt => BinaryOp::Lt,
            Opcode::Gt => BinaryOp::Gt,
            Opcode::Eq => BinaryOp::Eq,
            Opcode::And => BinaryOp::And,
            Opcode::Or => BinaryOp::Or,
            Opcode::Gte => BinaryOp::Gte,
            Opcode::Lte => BinaryOp::Lte,
            Opcode::Neq => BinaryOp::Neq,
            _ => return None,
        })
    }
}

/// A decoded instruction. Slot operands name the memory slot produced by an
/// earlier value-producing instruction, counted from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Literal(U256),
    Not { operand: usize },
    Placeholder { index: usize },
    MappedAssign { tracker_id: u32, key: usize, value: usize },
    MappedPlaceholder { index: usize, key: usize },
    Binary { op: BinaryOp, left: usize, right: usize },
    TrackerUpdate { tracker_id: u32, value: usize },
    TrackerUpdateFromPlaceholder { tracker_id: u32, index: usize },
}

impl Instruction {
    #[must_use]
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Literal(_) => Opcode::Literal,
            Instruction::Not { .. } => Opcode::Not,
            Instruction::Placeholder { .. } => Opcode::Placeholder,
            Instruction::MappedAssign { .. } => Opcode::MappedAssign,
            Instruction::MappedPlaceholder { .. } => Opcode::MappedPlaceholder,
            Instruction::Binary { op, .. } => Opcode::binary(*op),
            Instruction::TrackerUpdate { .. } => Opcode::TrackerUpdate,
            Instruction::TrackerUpdateFromPlaceholder { .. } => Opcode::TrackerUpdatePlaceholder,
        }
    }

    /// Whether executing this instruction fills a new memory slot.
    #[must_use]
    pub fn produces_value(&self) -> bool {
        !self.is_write_back()
    }

    #[must_use]
    pub fn is_write_back(&self) -> bool {
        matches!(
            self,
            Instruction::MappedAssign { .. }
                | Instruction::TrackerUpdate { .. }
                | Instruction::TrackerUpdateFromPlaceholder { .. }
        )
    }

    /// Tracker written by this instruction, if any.
    #[must_use]
    pub fn written_tracker(&self) -> Option<u32> {
        match self {
            Instruction::MappedAssign { tracker_id, .. }
            | Instruction::TrackerUpdate { tracker_id, .. }
            | Instruction::TrackerUpdateFromPlaceholder { tracker_id, .. } => Some(*tracker_id),
            _ => None,
        }
    }

    fn slots(&self) -> Vec<usize> {
        match *self {
            Instruction::Not { operand } => vec![operand],
            Instruction::MappedAssign { key, value, .. } => vec![key, value],
            Instruction::MappedPlaceholder { key, .. } => vec![key],
            Instruction::Binary { left, right, .. } => vec![left, right],
            Instruction::TrackerUpdate { value, .. } => vec![value],
            _ => Vec::new(),
        }
    }

    fn placeholder_index(&self) -> Option<usize> {
        match *self {
            Instruction::Placeholder { index }
            | Instruction::MappedPlaceholder { index, .. }
            | Instruction::TrackerUpdateFromPlaceholder { index, .. } => Some(index),
            _ => None,
        }
    }

    pub(crate) fn encode_into(&self, out: &mut Vec<U256>) {
        out.push(U256::from(u64::from(self.opcode().code())));
        match *self {
            Instruction::Literal(value) => out.push(value),
            Instruction::Not { operand } => out.push(usize_word(operand)),
            Instruction::Placeholder { index } => out.push(usize_word(index)),
            Instruction::MappedAssign {
                tracker_id,
                key,
                value,
            } => {
                out.push(U256::from(u64::from(tracker_id)));
                out.push(usize_word(key));
                out.push(usize_word(value));
            }
            Instruction::MappedPlaceholder { index, key } => {
                out.push(usize_word(index));
                out.push(usize_word(key));
            }
            Instruction::Binary { left, right, .. } => {
                out.push(usize_word(left));
                out.push(usize_word(right));
            }
            Instruction::TrackerUpdate { tracker_id, value } => {
                out.push(U256::from(u64::from(tracker_id)));
                out.push(usize_word(value));
            }
            Instruction::TrackerUpdateFromPlaceholder { tracker_id, index } => {
                out.push(U256::from(u64::from(tracker_id)));
                out.push(usize_word(index));
            }
        }
    }

    fn decode(opcode: Opcode, operands: &[U256], position: usize) -> Result<Self, InstructionError> {
        let slot = |i: usize| {
            word_to_u64(operands[i])
                .and_then(|v| usize::try_from(v).ok())
                .ok_or(InstructionError::OperandOverflow { position })
        };
        let id = |i: usize| {
            word_to_u64(operands[i])
                .and_then(|v| u32::try_from(v).ok())
                .ok_or(InstructionError::OperandOverflow { position })
        };
        Ok(match opcode {
            Opcode::Literal => Instruction::Literal(operands[0]),
            Opcode::Not => Instruction::Not { operand: slot(0)? },
            Opcode::Placeholder => Instruction::Placeholder { index: slot(0)? },
            Opcode::MappedAssign => Instruction::MappedAssign {
                tracker_id: id(0)?,
                key: slot(1)?,
                value: slot(2)?,
            },
            Opcode::MappedPlaceholder => Instruction::MappedPlaceholder {
                index: slot(0)?,
                key: slot(1)?,
            },
            Opcode::TrackerUpdate => Instruction::TrackerUpdate {
                tracker_id: id(0)?,
                value: slot(1)?,
            },
            Opcode::TrackerUpdatePlaceholder => Instruction::TrackerUpdateFromPlaceholder {
                tracker_id: id(0)?,
                index: slot(1)?,
            },
            binary => Instruction::Binary {
                op: binary
                    .as_binary()
                    .ok_or(InstructionError::UnknownOpcode {
                        position,
                        code: U256::from(u64::from(binary.code())),
                    })?,
                left: slot(0)?,
                right: slot(1)?,
            },
        })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.opcode().mnemonic();
        match self {
            Instruction::Literal(value) => write!(f, "{mnemonic} {value}"),
            Instruction::Not { operand } => write!(f, "{mnemonic} @{operand}"),
            Instruction::Placeholder { index } => write!(f, "{mnemonic} {index}"),
            Instruction::MappedAssign {
                tracker_id,
                key,
                value,
            } => write!(f, "{mnemonic} t{tracker_id} @{key} @{value}"),
            Instruction::MappedPlaceholder { index, key } => write!(f, "{mnemonic} {index} @{key}"),
            Instruction::Binary { left, right, .. } => write!(f, "{mnemonic} @{left} @{right}"),
            Instruction::TrackerUpdate { tracker_id, value } => {
                write!(f, "{mnemonic} t{tracker_id} @{value}")
            }
            Instruction::TrackerUpdateFromPlaceholder { tracker_id, index } => {
                write!(f, "{mnemonic} t{tracker_id} {index}")
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InstructionError {
    #[error("instruction at word {position} is truncated: opcode needs {needed} operands")]
    Truncated { position: usize, needed: usize },

    #[error("unknown opcode {code} at word {position}")]
    UnknownOpcode { position: usize, code: U256 },

    #[error("operand of instruction at word {position} does not fit an index")]
    OperandOverflow { position: usize },

    #[error("instruction at word {position} reads slot {slot} before it is produced")]
    SlotOutOfRange { position: usize, slot: usize },

    #[error("instruction at word {position} uses placeholder {index} but the table has {len}")]
    PlaceholderOutOfRange {
        position: usize,
        index: usize,
        len: usize,
    },

    #[error("raw data entry at word {position} does not point at a literal operand")]
    MisplacedRawData { position: usize },
}

/// A compiled instruction stream in its on-chain form: opcode words, each
/// followed by its operand words.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct InstructionSet {
    words: Vec<U256>,
}

impl InstructionSet {
    #[must_use]
    pub fn from_words(words: Vec<U256>) -> Self {
        Self { words }
    }

    #[must_use]
    pub fn words(&self) -> &[U256] {
        &self.words
    }

    #[must_use]
    pub fn into_words(self) -> Vec<U256> {
        self.words
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub(crate) fn push(&mut self, instruction: &Instruction) -> usize {
        let position = self.words.len();
        instruction.encode_into(&mut self.words);
        position
    }

    /// Decode into typed instructions paired with the word offset of their opcode.
    ///
    /// # Errors
    ///
    /// Returns [`InstructionError`] for unknown opcodes, truncated
    /// instructions or operands too large to be indices.
    pub fn decode(&self) -> Result<Vec<(usize, Instruction)>, InstructionError> {
        let mut decoded = Vec::new();
        let mut position = 0;
        while position < self.words.len() {
            let code = self.words[position];
            let opcode = word_to_u64(code)
                .and_then(Opcode::from_code)
                .ok_or(InstructionError::UnknownOpcode { position, code })?;
            let needed = opcode.operand_count();
            let operands = self
                .words
                .get(position + 1..position + 1 + needed)
                .ok_or(InstructionError::Truncated { position, needed })?;
            decoded.push((position, Instruction::decode(opcode, operands, position)?));
            position += 1 + needed;
        }
        Ok(decoded)
    }

    /// Check the structural invariants the engine relies on: every slot is
    /// read after it is produced, every placeholder index is within
    /// `placeholder_count`, and every raw data entry sits on a literal operand.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(
        &self,
        placeholder_count: usize,
        raw_data: &[RawDataEntry],
    ) -> Result<(), InstructionError> {
        let decoded = self.decode()?;
        let mut produced = 0usize;
        for (position, instruction) in &decoded {
            for slot in instruction.slots() {
                if slot >= produced {
                    return Err(InstructionError::SlotOutOfRange {
                        position: *position,
                        slot,
                    });
                }
            }
            if let Some(index) = instruction.placeholder_index() {
                if index >= placeholder_count {
                    return Err(InstructionError::PlaceholderOutOfRange {
                        position: *position,
                        index,
                        len: placeholder_count,
                    });
                }
            }
            if instruction.produces_value() {
                produced += 1;
            }
        }
        for entry in raw_data {
            let on_literal = decoded.iter().any(|(position, instruction)| {
                matches!(instruction, Instruction::Literal(_)) && position + 1 == entry.position
            });
            if !on_literal {
                return Err(InstructionError::MisplacedRawData {
                    position: entry.position,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for InstructionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decode() {
            Ok(decoded) => {
                for (position, instruction) in decoded {
                    writeln!(f, "{position:>4}: {instruction}")?;
                }
                Ok(())
            }
            Err(e) => write!(f, "<undecodable: {e}>"),
        }
    }
}

fn usize_word(value: usize) -> U256 {
    U256::from(value as u64)
}

pub(crate) fn word_to_u64(word: U256) -> Option<u64> {
    (word.bit_len() <= 64).then(|| word.as_limbs()[0])
}
