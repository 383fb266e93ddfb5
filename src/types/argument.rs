use std::collections::HashSet;

use super::error::CompileError;
use super::value_type::ValueType;

/// A named, typed argument of the calling function a rule is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentBinding {
    pub name: String,
    pub index: u32,
    pub value_type: ValueType,
}

/// Parse a calling-function signature into its positional argument table.
///
/// Accepts either a bare parameter list (`"address to, uint256 value"`) or a
/// full signature (`"transfer(address to, uint256 value)"`). Data location
/// keywords (`memory`, `calldata`, `storage`) are skipped.
///
/// # Errors
///
/// Returns [`CompileError::UnsupportedType`] for unknown type tokens and
/// [`CompileError::MalformedSignature`] for missing or repeated names.
pub fn parse_signature(signature: &str) -> Result<Vec<ArgumentBinding>, CompileError> {
    let params = match (signature.find('('), signature.rfind(')')) {
        (Some(open), Some(close)) if open < close => &signature[open + 1..close],
        (None, None) => signature,
        _ => {
            return Err(CompileError::MalformedSignature {
                declaration: signature.to_owned(),
                reason: "unbalanced parentheses".to_owned(),
            });
        }
    };

    if params.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut seen = HashSet::new();
    let mut arguments = Vec::new();
    for (position, declaration) in params.split(',').enumerate() {
        let tokens: Vec<&str> = declaration
            .split_whitespace()
            .filter(|t| !matches!(*t, "memory" | "calldata" | "storage"))
            .collect();
        let (ty, name) = match tokens.as_slice() {
            [ty, name] => (*ty, *name),
            [] => {
                return Err(CompileError::MalformedSignature {
                    declaration: signature.to_owned(),
                    reason: format!("empty declaration at position {position}"),
                });
            }
            [_] => {
                return Err(CompileError::MalformedSignature {
                    declaration: declaration.trim().to_owned(),
                    reason: "missing argument name".to_owned(),
                });
            }
            _ => {
                return Err(CompileError::MalformedSignature {
                    declaration: declaration.trim().to_owned(),
                    reason: "expected `type name`".to_owned(),
                });
            }
        };
        let value_type = ValueType::parse(ty)?;
        if !seen.insert(name) {
            return Err(CompileError::MalformedSignature {
                declaration: declaration.trim().to_owned(),
                reason: format!("duplicate argument name '{name}'"),
            });
        }
        arguments.push(ArgumentBinding {
            name: name.to_owned(),
            index: u32::try_from(position).map_err(|_| CompileError::MalformedSignature {
                declaration: signature.to_owned(),
                reason: "too many arguments".to_owned(),
            })?,
            value_type,
        });
    }
    Ok(arguments)
}
