use crate::abi::{self, AbiError};

use super::instruction::InstructionSet;
use super::raw_data::RawDataEntry;
use super::value_type::ValueType;

/// Typed, ABI-encoded parameter attached to an emitted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventParam {
    pub value_type: ValueType,
    pub encoded: Vec<u8>,
}

impl EventParam {
    /// Sniff the parameter's type from its text: an address, then a decimal
    /// number, otherwise a string (one layer of quotes removed).
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        if let Some(address) = abi::parse_address(text) {
            return Self {
                value_type: ValueType::Address,
                encoded: abi::encode_address(&address),
            };
        }
        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(value) = ruint::aliases::U256::from_str_radix(text, 10) {
                return Self {
                    value_type: ValueType::Uint256,
                    encoded: abi::encode_uint(value),
                };
            }
        }
        Self {
            value_type: ValueType::String,
            encoded: abi::encode_string(strip_quotes(text)),
        }
    }

    /// Render the parameter back to effect syntax. Strings are always quoted
    /// so they are not re-sniffed as numbers or addresses.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError`] if the encoding does not match the value type.
    pub fn to_text(&self) -> Result<String, AbiError> {
        match self.value_type {
            ValueType::Address => Ok(abi::format_address(&abi::decode_address(&self.encoded)?)),
            ValueType::Uint256 => Ok(abi::decode_uint(&self.encoded)?.to_string()),
            _ => Ok(format!("\"{}\"", abi::decode_string(&self.encoded)?)),
        }
    }
}

/// What a rule does when its condition evaluates one way or the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Revert {
        message: String,
    },
    Event {
        tag: String,
        param: Option<EventParam>,
    },
    /// A side-effecting expression, typically a tracker update. Placeholder
    /// indices refer to the rule's shared effect placeholder table.
    Expression {
        instruction_set: InstructionSet,
        raw_data: Vec<RawDataEntry>,
    },
}

/// Remove one layer of matching single or double quotes.
pub(crate) fn strip_quotes(text: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    text
}
