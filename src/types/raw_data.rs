use ruint::aliases::U256;

use crate::abi::{self, AbiError};

/// Kind tag stored next to each out-of-band literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RawDataKind {
    String = 1,
    Bytes = 2,
}

impl RawDataKind {
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(RawDataKind::String),
            2 => Some(RawDataKind::Bytes),
            _ => None,
        }
    }
}

/// The original text of a non-numeric literal, keyed by the word offset of
/// its surrogate operand in the instruction stream.
///
/// Bytes literals keep their `0x`-prefixed hex text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawDataEntry {
    pub text: String,
    pub position: usize,
    pub kind: RawDataKind,
}

impl RawDataEntry {
    /// ABI encoding of the literal, as stored on-chain.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError::InvalidHex`] if a bytes entry holds malformed hex.
    pub fn encoded_value(&self) -> Result<Vec<u8>, AbiError> {
        match self.kind {
            RawDataKind::String => Ok(abi::encode_string(&self.text)),
            RawDataKind::Bytes => Ok(abi::encode_bytes(&abi::parse_hex(&self.text)?)),
        }
    }

    /// The instruction operand that replaces this literal.
    ///
    /// # Errors
    ///
    /// As for [`encoded_value`](Self::encoded_value).
    pub fn surrogate(&self) -> Result<U256, AbiError> {
        Ok(abi::literal_surrogate(&self.encoded_value()?))
    }
}

/// The side table in its on-chain form: three parallel arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDataTable {
    pub instruction_set_positions: Vec<u64>,
    pub argument_types: Vec<u8>,
    pub data_values: Vec<Vec<u8>>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RawDataError {
    #[error("raw data arrays have mismatched lengths ({positions}, {kinds}, {values})")]
    LengthMismatch {
        positions: usize,
        kinds: usize,
        values: usize,
    },

    #[error("unknown raw data kind tag {0}")]
    UnknownKind(u8),

    #[error("raw data position {0} does not fit an index")]
    PositionOverflow(u64),

    #[error(transparent)]
    Abi(#[from] AbiError),
}

impl RawDataTable {
    /// # Errors
    ///
    /// Fails if a bytes entry holds malformed hex.
    pub fn from_entries(entries: &[RawDataEntry]) -> Result<Self, RawDataError> {
        let mut table = Self::default();
        for entry in entries {
            table.instruction_set_positions.push(entry.position as u64);
            table.argument_types.push(entry.kind.code());
            table.data_values.push(entry.encoded_value()?);
        }
        Ok(table)
    }

    /// Decode the parallel arrays back into entries.
    ///
    /// # Errors
    ///
    /// Fails on mismatched array lengths, unknown kind tags or undecodable values.
    pub fn to_entries(&self) -> Result<Vec<RawDataEntry>, RawDataError> {
        let (positions, kinds, values) = (
            self.instruction_set_positions.len(),
            self.argument_types.len(),
            self.data_values.len(),
        );
        if positions != kinds || kinds != values {
            return Err(RawDataError::LengthMismatch {
                positions,
                kinds,
                values,
            });
        }
        self.instruction_set_positions
            .iter()
            .zip(&self.argument_types)
            .zip(&self.data_values)
            .map(|((&position, &kind), value)| {
                let kind = RawDataKind::from_code(kind).ok_or(RawDataError::UnknownKind(kind))?;
                let text = match kind {
                    RawDataKind::String => abi::decode_string(value)?,
                    RawDataKind::Bytes => format!("0x{}", hex::encode(abi::decode_bytes(value)?)),
                };
                Ok(RawDataEntry {
                    text,
                    position: usize::try_from(position)
                        .map_err(|_| RawDataError::PositionOverflow(position))?,
                    kind,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<RawDataEntry> {
        vec![
            RawDataEntry {
                text: "gold".into(),
                position: 3,
                kind: RawDataKind::String,
            },
            RawDataEntry {
                text: "0xbeef".into(),
                position: 9,
                kind: RawDataKind::Bytes,
            },
        ]
    }

    #[test]
    fn table_round_trip() {
        let table = RawDataTable::from_entries(&entries()).unwrap();
        assert_eq!(table.instruction_set_positions, [3, 9]);
        assert_eq!(table.argument_types, [1, 2]);
        assert_eq!(table.to_entries().unwrap(), entries());
    }

    #[test]
    fn mismatched_lengths() {
        let mut table = RawDataTable::from_entries(&entries()).unwrap();
        table.argument_types.pop();
        assert!(matches!(
            table.to_entries(),
            Err(RawDataError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn unknown_kind() {
        let mut table = RawDataTable::from_entries(&entries()).unwrap();
        table.argument_types[0] = 9;
        assert_eq!(table.to_entries(), Err(RawDataError::UnknownKind(9)));
    }

    #[test]
    fn surrogate_matches_string_hash() {
        let entry = &entries()[0];
        assert_eq!(
            entry.surrogate().unwrap(),
            abi::literal_surrogate(&abi::encode_string("gold"))
        );
    }
}
