use super::effect::Effect;
use super::instruction::{InstructionError, InstructionSet};
use super::placeholder::Placeholder;
use super::raw_data::RawDataEntry;

/// A single compiled condition or effect expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledExpression {
    pub instruction_set: InstructionSet,
    pub placeholders: Vec<Placeholder>,
    pub raw_data: Vec<RawDataEntry>,
}

/// Every effect of a rule, sharing one placeholder table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledEffects {
    pub placeholders: Vec<Placeholder>,
    pub positive: Vec<Effect>,
    pub negative: Vec<Effect>,
}

/// Everything the contract-write layer commits for one rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleCompilationResult {
    pub condition_instruction_set: InstructionSet,
    pub condition_placeholders: Vec<Placeholder>,
    pub condition_raw_data: Vec<RawDataEntry>,
    pub effect_placeholders: Vec<Placeholder>,
    pub positive_effects: Vec<Effect>,
    pub negative_effects: Vec<Effect>,
}

impl RuleCompilationResult {
    #[must_use]
    pub fn new(condition: CompiledExpression, effects: CompiledEffects) -> Self {
        Self {
            condition_instruction_set: condition.instruction_set,
            condition_placeholders: condition.placeholders,
            condition_raw_data: condition.raw_data,
            effect_placeholders: effects.placeholders,
            positive_effects: effects.positive,
            negative_effects: effects.negative,
        }
    }

    /// Check placeholder bounds, slot ordering and raw data positions for the
    /// condition and every expression effect.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), InstructionError> {
        self.condition_instruction_set
            .validate(self.condition_placeholders.len(), &self.condition_raw_data)?;
        for (instruction_set, raw_data) in self.expression_effects() {
            instruction_set.validate(self.effect_placeholders.len(), raw_data)?;
        }
        Ok(())
    }

    /// Tracker IDs written by any effect, ascending and without repeats.
    ///
    /// # Errors
    ///
    /// Fails if an effect's instruction set cannot be decoded.
    pub fn trackers_updated(&self) -> Result<Vec<u32>, InstructionError> {
        let mut ids = Vec::new();
        for (instruction_set, _) in self.expression_effects() {
            for (_, instruction) in instruction_set.decode()? {
                if let Some(id) = instruction.written_tracker() {
                    ids.push(id);
                }
            }
        }
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    fn expression_effects(&self) -> impl Iterator<Item = (&InstructionSet, &[RawDataEntry])> {
        self.positive_effects
            .iter()
            .chain(&self.negative_effects)
            .filter_map(|effect| match effect {
                Effect::Expression {
                    instruction_set,
                    raw_data,
                } => Some((instruction_set, raw_data.as_slice())),
                _ => None,
            })
    }
}
