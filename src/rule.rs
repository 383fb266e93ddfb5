//! Whole-rule assembly: a condition plus its effects, compiled against one
//! calling function and the caller's foreign call and tracker registries.

use serde::{Deserialize, Serialize};

use crate::compile::compile_condition;
use crate::decompile::{decompile_effect, decompile_instructions};
use crate::effects::compile_effects;
use crate::error::RulecodeError;
use crate::types::{Effect, NameTables, ReferenceEntry, RuleCompilationResult, TrackerEntry};

/// A rule as authored: source text for the condition and each effect.
///
/// # Example
///
/// ```
/// use rulecode::RuleDefinition;
///
/// let rule = RuleDefinition::from_json(
///     r#"{
///         "condition": "value > 100",
///         "positiveEffects": ["emit Large"],
///         "callingFunction": "transfer(address to, uint256 value)"
///     }"#,
/// )
/// .unwrap();
/// assert!(rule.negative_effects.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDefinition {
    pub condition: String,
    #[serde(default)]
    pub positive_effects: Vec<String>,
    #[serde(default)]
    pub negative_effects: Vec<String>,
    /// Argument list of the function the rule guards, e.g.
    /// `transfer(address to, uint256 value)` or just `address to, uint256 value`.
    pub calling_function: String,
}

impl RuleDefinition {
    /// # Errors
    ///
    /// Returns [`RulecodeError::Json`] if `json` is not a rule document.
    pub fn from_json(json: &str) -> Result<Self, RulecodeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    ///
    /// Returns [`RulecodeError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, RulecodeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn name_tables(
    calling_function: &str,
    foreign_calls: &[ReferenceEntry],
    trackers: &[TrackerEntry],
) -> Result<NameTables, RulecodeError> {
    Ok(NameTables::from_signature(calling_function)?
        .with_foreign_calls(foreign_calls)
        .with_trackers(trackers))
}

/// Compile a rule's condition and effects.
///
/// # Errors
///
/// Returns the first [`CompileError`](crate::CompileError) raised by the
/// signature, the condition or any effect.
pub fn compile_rule(
    definition: &RuleDefinition,
    foreign_calls: &[ReferenceEntry],
    trackers: &[TrackerEntry],
) -> Result<RuleCompilationResult, RulecodeError> {
    let tables = name_tables(&definition.calling_function, foreign_calls, trackers)?;
    let condition = compile_condition(&definition.condition, &tables)?;
    let effects = compile_effects(
        &definition.positive_effects,
        &definition.negative_effects,
        &tables,
    )?;
    let compiled = RuleCompilationResult::new(condition, effects);

    tracing::debug!(
        condition_words = compiled.condition_instruction_set.len(),
        condition_placeholders = compiled.condition_placeholders.len(),
        raw_data = compiled.condition_raw_data.len(),
        positive_effects = compiled.positive_effects.len(),
        negative_effects = compiled.negative_effects.len(),
        effect_placeholders = compiled.effect_placeholders.len(),
        "compiled rule"
    );
    Ok(compiled)
}

/// Rebuild a [`RuleDefinition`] from its compiled form.
///
/// # Errors
///
/// Returns [`RulecodeError`] if `calling_function` does not parse or any
/// instruction set fails to decompile.
pub fn decompile_rule(
    compiled: &RuleCompilationResult,
    calling_function: &str,
    foreign_calls: &[ReferenceEntry],
    trackers: &[TrackerEntry],
) -> Result<RuleDefinition, RulecodeError> {
    let tables = name_tables(calling_function, foreign_calls, trackers)?;
    let condition = decompile_instructions(
        &compiled.condition_instruction_set,
        &compiled.condition_placeholders,
        &compiled.condition_raw_data,
        &tables,
    )?;
    let effects = |list: &[Effect]| {
        list.iter()
            .map(|effect| decompile_effect(effect, &compiled.effect_placeholders, &tables))
            .collect::<Result<Vec<_>, _>>()
    };
    let positive_effects = effects(&compiled.positive_effects)?;
    let negative_effects = effects(&compiled.negative_effects)?;

    tracing::debug!(
        positive_effects = positive_effects.len(),
        negative_effects = negative_effects.len(),
        "decompiled rule"
    );
    Ok(RuleDefinition {
        condition,
        positive_effects,
        negative_effects,
        calling_function: calling_function.to_owned(),
    })
}
