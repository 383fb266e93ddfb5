//! Binary serialization and deserialization of compiled rules.
//!
//! This module provides a stable binary format for caching a
//! [`RuleCompilationResult`] between sessions, so a client can skip
//! recompiling authored rules it has already prepared. The format consists of
//! a 32-byte fixed header followed by a bincode-encoded payload.
//!
//! ## Wire Format
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic bytes: b"RLCD"
//! 4       2     Format version (u16, little-endian)
//! 6       2     Engine version (u16, little-endian)
//! 8       4     Flags (u32, reserved)
//! 12      4     Payload length in bytes (u32, little-endian)
//! 16      16    BLAKE3 hash of the payload (truncated to 16 bytes)
//! 32..    var   Bincode-encoded payload
//! ```
//!
//! ## Versioning
//!
//! The format version in the header must match exactly. If it does not,
//! deserialization fails immediately with [`DeserializeError::IncompatibleVersion`].
//! The engine version is informational only.
//!
//! Decoding re-checks the instruction set invariants, so a blob that passes
//! the checksum but was produced by a buggy writer is still rejected.

use ruint::aliases::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{
    Effect, EventParam, InstructionSet, Placeholder, RawDataEntry, RawDataKind,
    RuleCompilationResult, ValueType,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAGIC: &[u8; 4] = b"RLCD";
const FORMAT_VERSION: u16 = 1;
const ENGINE_VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when serializing a [`RuleCompilationResult`] to bytes.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to encode compiled rule: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("I/O error during serialization: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when deserializing a [`RuleCompilationResult`] from bytes.
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a compiled rule cache: invalid magic bytes")]
    BadMagic,

    #[error("incompatible format version: blob is v{blob}, engine supports v{supported}")]
    IncompatibleVersion { blob: u16, supported: u16 },

    #[error("integrity check failed: BLAKE3 checksum mismatch")]
    ChecksumMismatch,

    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u32, actual: usize },

    #[error("failed to decode payload: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("I/O error during deserialization: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Serialized type hierarchy
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct SerializedRule {
    metadata: RuleMetadata,
    condition: SerializedExpression,
    condition_placeholders: Vec<SerializedPlaceholder>,
    effect_placeholders: Vec<SerializedPlaceholder>,
    positive_effects: Vec<SerializedEffect>,
    negative_effects: Vec<SerializedEffect>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RuleMetadata {
    condition_words: usize,
    effect_count: usize,
    source_digest: Option<[u8; 32]>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedExpression {
    words: Vec<[u8; 32]>,
    raw_data: Vec<SerializedRawData>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedRawData {
    text: String,
    position: u64,
    kind: u8,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedPlaceholder {
    value_type: u8,
    reference_index: u32,
    flags: u8,
}

#[derive(Debug, Serialize, Deserialize)]
enum SerializedEffect {
    Revert(String),
    Event {
        tag: String,
        param: Option<(u8, Vec<u8>)>,
    },
    Expression(SerializedExpression),
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

fn serialize_expression(
    instruction_set: &InstructionSet,
    raw_data: &[RawDataEntry],
) -> SerializedExpression {
    SerializedExpression {
        words: instruction_set
            .words()
            .iter()
            .map(U256::to_be_bytes::<32>)
            .collect(),
        raw_data: raw_data
            .iter()
            .map(|entry| SerializedRawData {
                text: entry.text.clone(),
                position: entry.position as u64,
                kind: entry.kind.code(),
            })
            .collect(),
    }
}

fn deserialize_expression(
    ser: SerializedExpression,
) -> Result<(InstructionSet, Vec<RawDataEntry>), DeserializeError> {
    let instruction_set = InstructionSet::from_words(
        ser.words
            .iter()
            .map(|bytes| U256::from_be_bytes(*bytes))
            .collect(),
    );
    let raw_data = ser
        .raw_data
        .into_iter()
        .map(|entry| {
            let kind = RawDataKind::from_code(entry.kind).ok_or_else(|| {
                DeserializeError::Validation(format!("unknown raw data kind {}", entry.kind))
            })?;
            let position = usize::try_from(entry.position).map_err(|_| {
                DeserializeError::Validation(format!(
                    "raw data position {} does not fit an index",
                    entry.position
                ))
            })?;
            Ok(RawDataEntry {
                text: entry.text,
                position,
                kind,
            })
        })
        .collect::<Result<_, DeserializeError>>()?;
    Ok((instruction_set, raw_data))
}

fn serialize_placeholders(placeholders: &[Placeholder]) -> Vec<SerializedPlaceholder> {
    placeholders
        .iter()
        .map(|p| SerializedPlaceholder {
            value_type: p.value_type.code(),
            reference_index: p.reference_index,
            flags: p.flags(),
        })
        .collect()
}

fn deserialize_placeholders(
    ser: Vec<SerializedPlaceholder>,
) -> Result<Vec<Placeholder>, DeserializeError> {
    ser.into_iter()
        .enumerate()
        .map(|(i, p)| {
            let value_type = ValueType::from_code(p.value_type).ok_or_else(|| {
                DeserializeError::Validation(format!(
                    "placeholder {i} has unknown value type {}",
                    p.value_type
                ))
            })?;
            Placeholder::from_flags(value_type, p.reference_index, p.flags)
                .filter(|placeholder| placeholder.kind().is_some())
                .ok_or_else(|| {
                    DeserializeError::Validation(format!(
                        "placeholder {i} has invalid flags {:#04x}",
                        p.flags
                    ))
                })
        })
        .collect()
}

fn serialize_effect(effect: &Effect) -> SerializedEffect {
    match effect {
        Effect::Revert { message } => SerializedEffect::Revert(message.clone()),
        Effect::Event { tag, param } => SerializedEffect::Event {
            tag: tag.clone(),
            param: param
                .as_ref()
                .map(|p| (p.value_type.code(), p.encoded.clone())),
        },
        Effect::Expression {
            instruction_set,
            raw_data,
        } => SerializedEffect::Expression(serialize_expression(instruction_set, raw_data)),
    }
}

fn deserialize_effect(ser: SerializedEffect) -> Result<Effect, DeserializeError> {
    match ser {
        SerializedEffect::Revert(message) => Ok(Effect::Revert { message }),
        SerializedEffect::Event { tag, param } => {
            let param = param
                .map(|(code, encoded)| {
                    ValueType::from_code(code)
                        .map(|value_type| EventParam {
                            value_type,
                            encoded,
                        })
                        .ok_or_else(|| {
                            DeserializeError::Validation(format!(
                                "event '{tag}' has unknown parameter type {code}"
                            ))
                        })
                })
                .transpose()?;
            Ok(Effect::Event { tag, param })
        }
        SerializedEffect::Expression(expression) => {
            let (instruction_set, raw_data) = deserialize_expression(expression)?;
            Ok(Effect::Expression {
                instruction_set,
                raw_data,
            })
        }
    }
}

fn rule_to_serialized(rule: &RuleCompilationResult, source_text: Option<&str>) -> SerializedRule {
    let source_digest = source_text.map(|s| *blake3::hash(s.as_bytes()).as_bytes());
    SerializedRule {
        metadata: RuleMetadata {
            condition_words: rule.condition_instruction_set.len(),
            effect_count: rule.positive_effects.len() + rule.negative_effects.len(),
            source_digest,
        },
        condition: serialize_expression(&rule.condition_instruction_set, &rule.condition_raw_data),
        condition_placeholders: serialize_placeholders(&rule.condition_placeholders),
        effect_placeholders: serialize_placeholders(&rule.effect_placeholders),
        positive_effects: rule.positive_effects.iter().map(serialize_effect).collect(),
        negative_effects: rule.negative_effects.iter().map(serialize_effect).collect(),
    }
}

fn serialized_to_rule(ser: SerializedRule) -> Result<RuleCompilationResult, DeserializeError> {
    let effect_count = ser.positive_effects.len() + ser.negative_effects.len();
    if ser.metadata.effect_count != effect_count {
        return Err(DeserializeError::Validation(format!(
            "metadata says {} effects but payload has {effect_count}",
            ser.metadata.effect_count
        )));
    }
    if ser.metadata.condition_words != ser.condition.words.len() {
        return Err(DeserializeError::Validation(format!(
            "metadata says {} condition words but payload has {}",
            ser.metadata.condition_words,
            ser.condition.words.len()
        )));
    }

    let (condition_instruction_set, condition_raw_data) = deserialize_expression(ser.condition)?;
    let rule = RuleCompilationResult {
        condition_instruction_set,
        condition_placeholders: deserialize_placeholders(ser.condition_placeholders)?,
        condition_raw_data,
        effect_placeholders: deserialize_placeholders(ser.effect_placeholders)?,
        positive_effects: ser
            .positive_effects
            .into_iter()
            .map(deserialize_effect)
            .collect::<Result<_, _>>()?,
        negative_effects: ser
            .negative_effects
            .into_iter()
            .map(deserialize_effect)
            .collect::<Result<_, _>>()?,
    };
    rule.validate()
        .map_err(|e| DeserializeError::Validation(e.to_string()))?;
    Ok(rule)
}

// ---------------------------------------------------------------------------
// Header I/O
// ---------------------------------------------------------------------------

fn write_header(buf: &mut Vec<u8>, payload: &[u8]) {
    let hash = blake3::hash(payload);
    let hash_bytes = hash.as_bytes();

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&ENGINE_VERSION.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // flags (reserved)
    #[allow(clippy::cast_possible_truncation)] // payload will never exceed 4 GiB
    let payload_len = payload.len() as u32;
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&hash_bytes[..16]);
}

#[allow(clippy::cast_possible_truncation)] // HEADER_SIZE is 32, always fits in u32
fn read_header(bytes: &[u8]) -> Result<(u16, u32, [u8; 16]), DeserializeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DeserializeError::LengthMismatch {
            expected: HEADER_SIZE as u32,
            actual: bytes.len(),
        });
    }

    if &bytes[0..4] != MAGIC {
        return Err(DeserializeError::BadMagic);
    }

    let format_version = u16::from_le_bytes([bytes[4], bytes[5]]);
    let payload_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

    let mut hash = [0u8; 16];
    hash.copy_from_slice(&bytes[16..32]);

    Ok((format_version, payload_len, hash))
}

// ---------------------------------------------------------------------------
// Public encode/decode
// ---------------------------------------------------------------------------

pub(crate) fn encode(
    rule: &RuleCompilationResult,
    source_text: Option<&str>,
) -> Result<Vec<u8>, SerializeError> {
    let serialized = rule_to_serialized(rule, source_text);
    let payload = bincode::serde::encode_to_vec(&serialized, bincode::config::standard())?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    write_header(&mut buf, &payload);
    buf.extend_from_slice(&payload);
    Ok(buf)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<RuleCompilationResult, DeserializeError> {
    let (format_version, payload_len, stored_hash) = read_header(bytes)?;

    if format_version != FORMAT_VERSION {
        return Err(DeserializeError::IncompatibleVersion {
            blob: format_version,
            supported: FORMAT_VERSION,
        });
    }

    let payload_start = HEADER_SIZE;
    let payload_end = payload_start + payload_len as usize;
    if bytes.len() < payload_end {
        return Err(DeserializeError::LengthMismatch {
            expected: payload_len,
            actual: bytes.len() - HEADER_SIZE,
        });
    }
    let payload = &bytes[payload_start..payload_end];

    let computed_hash = blake3::hash(payload);
    if computed_hash.as_bytes()[..16] != stored_hash {
        return Err(DeserializeError::ChecksumMismatch);
    }

    let (serialized, _): (SerializedRule, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())?;

    serialized_to_rule(serialized)
}

impl RuleCompilationResult {
    /// Serialize this compiled rule to a byte vector.
    ///
    /// The optional `source_text` (typically the authored rule JSON) is
    /// hashed with BLAKE3 and embedded in the payload metadata.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`] if encoding fails.
    pub fn to_bytes(&self, source_text: Option<&str>) -> Result<Vec<u8>, SerializeError> {
        encode(self, source_text)
    }

    /// Deserialize a compiled rule from bytes produced by
    /// [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`] on format, integrity, or validation failure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DeserializeError> {
        decode(bytes)
    }

    /// # Errors
    ///
    /// Returns [`SerializeError`] on encoding or I/O failure.
    pub fn to_binary_file(
        &self,
        path: impl AsRef<std::path::Path>,
        source_text: Option<&str>,
    ) -> Result<(), SerializeError> {
        let bytes = self.to_bytes(source_text)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`DeserializeError`] on I/O, format, integrity, or validation failure.
    pub fn from_binary_file(path: impl AsRef<std::path::Path>) -> Result<Self, DeserializeError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GlobalVariable, ReferenceBinding, ReferenceKind};

    fn placeholder(kind: ReferenceKind) -> Placeholder {
        Placeholder::for_binding(&ReferenceBinding::new(kind, ValueType::Uint256))
    }

    #[test]
    fn placeholder_round_trip() {
        let placeholders = vec![
            placeholder(ReferenceKind::Argument(2)),
            placeholder(ReferenceKind::Tracker(4)),
            placeholder(ReferenceKind::ForeignCall(1)),
            placeholder(ReferenceKind::Global(GlobalVariable::BlockTimestamp)),
        ];
        let restored = deserialize_placeholders(serialize_placeholders(&placeholders)).unwrap();
        assert_eq!(restored, placeholders);
    }

    #[test]
    fn contradictory_placeholder_flags_rejected() {
        let ser = vec![SerializedPlaceholder {
            value_type: ValueType::Uint256.code(),
            reference_index: 0,
            flags: 0b11,
        }];
        assert!(matches!(
            deserialize_placeholders(ser),
            Err(DeserializeError::Validation(_))
        ));
    }

    #[test]
    fn expression_words_round_trip() {
        let set = InstructionSet::from_words(vec![U256::from(2u64), U256::MAX]);
        let raw = vec![RawDataEntry {
            text: "x".into(),
            position: 1,
            kind: RawDataKind::String,
        }];
        let (restored_set, restored_raw) =
            deserialize_expression(serialize_expression(&set, &raw)).unwrap();
        assert_eq!(restored_set, set);
        assert_eq!(restored_raw, raw);
    }

    #[test]
    fn effect_round_trip() {
        let effects = [
            Effect::Revert {
                message: "no".into(),
            },
            Effect::Event {
                tag: "Paid".into(),
                param: Some(EventParam::from_text("5")),
            },
            Effect::Event {
                tag: "Done".into(),
                param: None,
            },
        ];
        for effect in effects {
            assert_eq!(deserialize_effect(serialize_effect(&effect)).unwrap(), effect);
        }
    }

    #[test]
    fn unknown_event_type_rejected() {
        let ser = SerializedEffect::Event {
            tag: "Paid".into(),
            param: Some((99, Vec::new())),
        };
        assert!(matches!(
            deserialize_effect(ser),
            Err(DeserializeError::Validation(_))
        ));
    }

    #[test]
    fn header_layout() {
        let rule = RuleCompilationResult::default();
        let bytes = encode(&rule, None).unwrap();
        assert_eq!(&bytes[0..4], MAGIC);
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), FORMAT_VERSION);
        let payload_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);
        assert_eq!(bytes.len(), HEADER_SIZE + payload_len as usize);
    }

    #[test]
    fn metadata_mismatch_rejected() {
        let mut ser = rule_to_serialized(&RuleCompilationResult::default(), None);
        ser.metadata.effect_count = 3;
        assert!(matches!(
            serialized_to_rule(ser),
            Err(DeserializeError::Validation(_))
        ));
    }

    #[test]
    fn invalid_instruction_set_rejected() {
        // PLH 0 with an empty placeholder table
        let rule = RuleCompilationResult {
            condition_instruction_set: InstructionSet::from_words(vec![
                U256::from(2u64),
                U256::ZERO,
            ]),
            ..RuleCompilationResult::default()
        };
        let bytes = encode(&rule, None).unwrap();
        assert!(matches!(
            decode(&bytes),
            Err(DeserializeError::Validation(_))
        ));
    }
}
