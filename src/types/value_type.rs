use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::CompileError;

/// Parameter types understood by the rules engine.
///
/// The discriminants are the wire codes the engine stores alongside
/// placeholders and event parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum ValueType {
    Address = 0,
    String = 1,
    Uint256 = 2,
    Bool = 3,
    Void = 4,
    Bytes = 5,
    StaticTypeArray = 6,
    DynamicTypeArray = 7,
}

impl ValueType {
    /// Parse a Solidity-style type token such as `uint256`, `address` or `string[]`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::UnsupportedType`] for anything outside the
    /// engine's type table.
    pub fn parse(token: &str) -> Result<Self, CompileError> {
        let token = token.trim();
        if let Some(open) = token.find('[') {
            if !token.ends_with(']') {
                return Err(CompileError::UnsupportedType {
                    ty: token.to_owned(),
                });
            }
            let len = &token[open + 1..token.len() - 1];
            if !len.chars().all(|c| c.is_ascii_digit()) {
                return Err(CompileError::UnsupportedType {
                    ty: token.to_owned(),
                });
            }
            return match Self::parse_scalar(&token[..open]) {
                Some(Self::String | Self::Bytes) => Ok(Self::DynamicTypeArray),
                Some(Self::Void) | None => Err(CompileError::UnsupportedType {
                    ty: token.to_owned(),
                }),
                Some(_) => Ok(Self::StaticTypeArray),
            };
        }
        Self::parse_scalar(token).ok_or_else(|| CompileError::UnsupportedType {
            ty: token.to_owned(),
        })
    }

    fn parse_scalar(token: &str) -> Option<Self> {
        match token {
            "address" => Some(Self::Address),
            "string" => Some(Self::String),
            "uint256" | "uint" => Some(Self::Uint256),
            "bool" => Some(Self::Bool),
            "void" => Some(Self::Void),
            "bytes" => Some(Self::Bytes),
            _ => None,
        }
    }

    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Address,
            1 => Self::String,
            2 => Self::Uint256,
            3 => Self::Bool,
            4 => Self::Void,
            5 => Self::Bytes,
            6 => Self::StaticTypeArray,
            7 => Self::DynamicTypeArray,
            _ => return None,
        })
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Address => "address",
            ValueType::String => "string",
            ValueType::Uint256 => "uint256",
            ValueType::Bool => "bool",
            ValueType::Void => "void",
            ValueType::Bytes => "bytes",
            ValueType::StaticTypeArray => "static array",
            ValueType::DynamicTypeArray => "dynamic array",
        };
        f.write_str(name)
    }
}
