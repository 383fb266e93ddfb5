use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::parse::{is_identifier, is_reserved};

use super::argument::{parse_signature, ArgumentBinding};
use super::error::{CompileError, NameTableError};
use super::value_type::ValueType;

/// A named on-chain object (foreign call) and the ID it was registered under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceEntry {
    pub name: String,
    pub id: u32,
    pub value_type: ValueType,
}

/// A tracker registered on-chain. Mapped trackers carry the type of their key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerEntry {
    pub name: String,
    pub id: u32,
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<ValueType>,
}

impl TrackerEntry {
    #[must_use]
    pub fn is_mapped(&self) -> bool {
        self.key_type.is_some()
    }
}

/// Reverse lookups used when turning placeholders back into names.
///
/// Implemented by [`NameTables`]; callers holding metadata elsewhere (for
/// example a contract read cache) can implement it directly.
pub trait NameResolver {
    fn foreign_call_name(&self, id: u32) -> Option<&str>;
    fn tracker_name(&self, id: u32) -> Option<&str>;
    fn argument_name(&self, index: u32) -> Option<&str>;

    /// Checked once before a decompile starts. Lookups must be unambiguous
    /// and every name must read back as an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`NameTableError`] describing the first bad entry.
    fn validate(&self) -> Result<(), NameTableError> {
        Ok(())
    }
}

/// The name→ID tables a single compile or decompile call resolves against.
///
/// # Example
///
/// ```
/// use rulecode::{NameTables, ValueType};
///
/// let tables = NameTables::from_signature("address to, uint256 value")
///     .unwrap()
///     .foreign_call("getScore", 1, ValueType::Uint256)
///     .tracker("balance", 2, ValueType::Uint256);
/// assert!(tables.find_tracker("balance").is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct NameTables {
    arguments: Vec<ArgumentBinding>,
    foreign_calls: Vec<ReferenceEntry>,
    trackers: Vec<TrackerEntry>,
}

impl NameTables {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the argument table of a calling-function signature.
    ///
    /// # Errors
    ///
    /// Propagates signature parsing errors from [`parse_signature`].
    pub fn from_signature(signature: &str) -> Result<Self, CompileError> {
        Ok(Self::new().arguments(parse_signature(signature)?))
    }

    #[must_use]
    pub fn arguments(mut self, arguments: Vec<ArgumentBinding>) -> Self {
        self.arguments = arguments;
        self
    }

    #[must_use]
    pub fn foreign_call(mut self, name: &str, id: u32, return_type: ValueType) -> Self {
        self.foreign_calls.push(ReferenceEntry {
            name: name.to_owned(),
            id,
            value_type: return_type,
        });
        self
    }

    #[must_use]
    pub fn tracker(mut self, name: &str, id: u32, value_type: ValueType) -> Self {
        self.trackers.push(TrackerEntry {
            name: name.to_owned(),
            id,
            value_type,
            key_type: None,
        });
        self
    }

    #[must_use]
    pub fn mapped_tracker(
        mut self,
        name: &str,
        id: u32,
        key_type: ValueType,
        value_type: ValueType,
    ) -> Self {
        self.trackers.push(TrackerEntry {
            name: name.to_owned(),
            id,
            value_type,
            key_type: Some(key_type),
        });
        self
    }

    #[must_use]
    pub fn with_foreign_calls(mut self, entries: &[ReferenceEntry]) -> Self {
        self.foreign_calls.extend_from_slice(entries);
        self
    }

    #[must_use]
    pub fn with_trackers(mut self, entries: &[TrackerEntry]) -> Self {
        self.trackers.extend_from_slice(entries);
        self
    }

    #[must_use]
    pub fn find_argument(&self, name: &str) -> Option<&ArgumentBinding> {
        self.arguments.iter().find(|a| a.name == name)
    }

    #[must_use]
    pub fn find_foreign_call(&self, name: &str) -> Option<&ReferenceEntry> {
        self.foreign_calls.iter().find(|e| e.name == name)
    }

    #[must_use]
    pub fn find_tracker(&self, name: &str) -> Option<&TrackerEntry> {
        self.trackers.iter().find(|e| e.name == name)
    }

    #[must_use]
    pub fn argument_list(&self) -> &[ArgumentBinding] {
        &self.arguments
    }
}

fn check_table<'a>(
    kind: &'static str,
    entries: impl Iterator<Item = (&'a str, u32)>,
    valid: impl Fn(&str) -> bool,
) -> Result<(), NameTableError> {
    let mut names = HashSet::new();
    let mut ids = HashSet::new();
    for (name, id) in entries {
        if !valid(name) {
            return Err(NameTableError::InvalidName {
                kind,
                name: name.to_owned(),
            });
        }
        if !names.insert(name) {
            return Err(NameTableError::DuplicateName {
                kind,
                name: name.to_owned(),
            });
        }
        if !ids.insert(id) {
            return Err(NameTableError::DuplicateId { kind, id });
        }
    }
    Ok(())
}

impl NameResolver for NameTables {
    fn foreign_call_name(&self, id: u32) -> Option<&str> {
        self.foreign_calls
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.name.as_str())
    }

    fn tracker_name(&self, id: u32) -> Option<&str> {
        self.trackers
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.name.as_str())
    }

    fn argument_name(&self, index: u32) -> Option<&str> {
        self.arguments
            .iter()
            .find(|a| a.index == index)
            .map(|a| a.name.as_str())
    }

    /// Bare argument names must also avoid the operator keywords.
    fn validate(&self) -> Result<(), NameTableError> {
        check_table(
            "argument",
            self.arguments.iter().map(|a| (a.name.as_str(), a.index)),
            |name| is_identifier(name) && !is_reserved(name),
        )?;
        check_table(
            "foreign call",
            self.foreign_calls.iter().map(|e| (e.name.as_str(), e.id)),
            is_identifier,
        )?;
        check_table(
            "tracker",
            self.trackers.iter().map(|e| (e.name.as_str(), e.id)),
            is_identifier,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> NameTables {
        NameTables::from_signature("address to, uint256 value")
            .unwrap()
            .foreign_call("getScore", 3, ValueType::Uint256)
            .tracker("balance", 1, ValueType::Uint256)
            .mapped_tracker("limits", 2, ValueType::Address, ValueType::Uint256)
    }

    #[test]
    fn forward_lookups() {
        let t = tables();
        assert_eq!(t.find_argument("value").unwrap().index, 1);
        assert_eq!(t.find_foreign_call("getScore").unwrap().id, 3);
        assert!(!t.find_tracker("balance").unwrap().is_mapped());
        assert!(t.find_tracker("limits").unwrap().is_mapped());
        assert!(t.find_tracker("missing").is_none());
    }

    #[test]
    fn reverse_lookups() {
        let t = tables();
        assert_eq!(t.argument_name(0), Some("to"));
        assert_eq!(t.foreign_call_name(3), Some("getScore"));
        assert_eq!(t.tracker_name(2), Some("limits"));
        assert_eq!(t.tracker_name(9), None);
    }

    #[test]
    fn argument_list_is_positional() {
        let t = tables();
        let names: Vec<_> = t.argument_list().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["to", "value"]);
    }

    #[test]
    fn well_formed_tables_validate() {
        assert_eq!(tables().validate(), Ok(()));
        assert_eq!(NameTables::new().validate(), Ok(()));
    }

    #[test]
    fn duplicate_tracker_name_is_rejected() {
        let t = tables().tracker("balance", 9, ValueType::Uint256);
        assert_eq!(
            t.validate(),
            Err(NameTableError::DuplicateName {
                kind: "tracker",
                name: "balance".into()
            })
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let t = tables().tracker("other", 1, ValueType::Uint256);
        assert_eq!(
            t.validate(),
            Err(NameTableError::DuplicateId {
                kind: "tracker",
                id: 1
            })
        );
        let t = tables().foreign_call("getOther", 3, ValueType::Bool);
        assert_eq!(
            t.validate(),
            Err(NameTableError::DuplicateId {
                kind: "foreign call",
                id: 3
            })
        );
    }

    #[test]
    fn same_id_in_different_tables_is_fine() {
        let t = NameTables::new()
            .tracker("balance", 1, ValueType::Uint256)
            .foreign_call("getScore", 1, ValueType::Uint256);
        assert_eq!(t.validate(), Ok(()));
    }

    #[test]
    fn names_must_be_identifiers() {
        let t = tables().tracker("my-tracker", 5, ValueType::Uint256);
        assert_eq!(
            t.validate(),
            Err(NameTableError::InvalidName {
                kind: "tracker",
                name: "my-tracker".into()
            })
        );
        let t = tables().foreign_call("", 6, ValueType::Uint256);
        assert!(matches!(
            t.validate(),
            Err(NameTableError::InvalidName { kind: "foreign call", .. })
        ));
    }

    #[test]
    fn argument_names_avoid_keywords() {
        let t = NameTables::new().arguments(vec![ArgumentBinding {
            name: "AND".into(),
            index: 0,
            value_type: ValueType::Uint256,
        }]);
        assert!(matches!(
            t.validate(),
            Err(NameTableError::InvalidName { kind: "argument", .. })
        ));
        // Trackers are always prefixed, so a keyword name still reads back.
        let t = NameTables::new().tracker("AND", 1, ValueType::Uint256);
        assert_eq!(t.validate(), Ok(()));
    }

    #[test]
    fn tracker_entry_json() {
        let entry: TrackerEntry =
            serde_json::from_str(r#"{"name":"balance","id":4,"valueType":"uint256"}"#).unwrap();
        assert_eq!(entry.key_type, None);
        assert_eq!(entry.id, 4);
    }
}
