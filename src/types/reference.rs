use std::fmt;

use super::value_type::ValueType;

/// Chain-provided values a rule can read without declaring them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalVariable {
    MsgSender,
    BlockTimestamp,
    MsgData,
    BlockNumber,
    TxOrigin,
}

impl GlobalVariable {
    pub const ALL: [GlobalVariable; 5] = [
        GlobalVariable::MsgSender,
        GlobalVariable::BlockTimestamp,
        GlobalVariable::MsgData,
        GlobalVariable::BlockNumber,
        GlobalVariable::TxOrigin,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            GlobalVariable::MsgSender => "msg.sender",
            GlobalVariable::BlockTimestamp => "block.timestamp",
            GlobalVariable::MsgData => "msg.data",
            GlobalVariable::BlockNumber => "block.number",
            GlobalVariable::TxOrigin => "tx.origin",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.name() == name)
    }

    #[must_use]
    pub fn value_type(self) -> ValueType {
        match self {
            GlobalVariable::MsgSender | GlobalVariable::TxOrigin => ValueType::Address,
            GlobalVariable::BlockTimestamp | GlobalVariable::BlockNumber => ValueType::Uint256,
            GlobalVariable::MsgData => ValueType::Bytes,
        }
    }

    /// Placeholder flag value; zero is reserved for "not a global".
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            GlobalVariable::MsgSender => 1,
            GlobalVariable::BlockTimestamp => 2,
            GlobalVariable::MsgData => 3,
            GlobalVariable::BlockNumber => 4,
            GlobalVariable::TxOrigin => 5,
        }
    }

    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.code() == code)
    }
}

impl fmt::Display for GlobalVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a referenced value comes from, with the index the engine uses to fetch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// Positional argument of the calling function.
    Argument(u32),
    /// Tracker ID.
    Tracker(u32),
    /// Foreign call ID.
    ForeignCall(u32),
    Global(GlobalVariable),
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Argument(index) => write!(f, "argument {index}"),
            ReferenceKind::Tracker(id) => write!(f, "tracker {id}"),
            ReferenceKind::ForeignCall(id) => write!(f, "foreign call {id}"),
            ReferenceKind::Global(global) => write!(f, "{global}"),
        }
    }
}

/// A reference that has been bound against the caller's name tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReferenceBinding {
    pub kind: ReferenceKind,
    pub value_type: ValueType,
}

impl ReferenceBinding {
    #[must_use]
    pub fn new(kind: ReferenceKind, value_type: ValueType) -> Self {
        Self { kind, value_type }
    }

    /// The tracker ID, if this binding refers to a tracker.
    #[must_use]
    pub fn tracker_id(&self) -> Option<u32> {
        match self.kind {
            ReferenceKind::Tracker(id) => Some(id),
            _ => None,
        }
    }
}
