use super::reference::{GlobalVariable, ReferenceBinding, ReferenceKind};
use super::value_type::ValueType;

/// An instruction operand the engine substitutes at evaluation time.
///
/// `reference_index` is the argument position, tracker ID or foreign call
/// ID depending on the flags; it is unused (zero) for global variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placeholder {
    pub value_type: ValueType,
    pub reference_index: u32,
    pub tracker: bool,
    pub foreign_call: bool,
    pub global: Option<GlobalVariable>,
}

impl Placeholder {
    #[must_use]
    pub fn for_binding(binding: &ReferenceBinding) -> Self {
        let mut placeholder = Self {
            value_type: binding.value_type,
            reference_index: 0,
            tracker: false,
            foreign_call: false,
            global: None,
        };
        match binding.kind {
            ReferenceKind::Argument(index) => placeholder.reference_index = index,
            ReferenceKind::Tracker(id) => {
                placeholder.reference_index = id;
                placeholder.tracker = true;
            }
            ReferenceKind::ForeignCall(id) => {
                placeholder.reference_index = id;
                placeholder.foreign_call = true;
            }
            ReferenceKind::Global(global) => placeholder.global = Some(global),
        }
        placeholder
    }

    /// The reference this placeholder stands for, or `None` if its flags
    /// contradict each other.
    #[must_use]
    pub fn kind(&self) -> Option<ReferenceKind> {
        match (self.foreign_call, self.tracker, self.global) {
            (true, false, None) => Some(ReferenceKind::ForeignCall(self.reference_index)),
            (false, true, None) => Some(ReferenceKind::Tracker(self.reference_index)),
            (false, false, Some(global)) => Some(ReferenceKind::Global(global)),
            (false, false, None) => Some(ReferenceKind::Argument(self.reference_index)),
            _ => None,
        }
    }

    /// Packed flag byte: bit 0 foreign call, bit 1 tracker, bits 2..5 the
    /// global variable code.
    #[must_use]
    pub fn flags(&self) -> u8 {
        u8::from(self.foreign_call)
            | (u8::from(self.tracker) << 1)
            | (self.global.map_or(0, GlobalVariable::code) << 2)
    }

    /// Inverse of [`flags`](Self::flags).
    #[must_use]
    pub fn from_flags(value_type: ValueType, reference_index: u32, flags: u8) -> Option<Self> {
        let global = match flags >> 2 {
            0 => None,
            code => Some(GlobalVariable::from_code(code)?),
        };
        Some(Self {
            value_type,
            reference_index,
            foreign_call: flags & 0b01 != 0,
            tracker: flags & 0b10 != 0,
            global,
        })
    }
}

/// Index of the placeholder for `binding`, appending one on first use.
pub(crate) fn intern(table: &mut Vec<Placeholder>, binding: &ReferenceBinding) -> usize {
    if let Some(index) = table.iter().position(|p| p.kind() == Some(binding.kind)) {
        return index;
    }
    table.push(Placeholder::for_binding(binding));
    table.len() - 1
}
