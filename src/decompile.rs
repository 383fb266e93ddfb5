//! Reconstructs condition and effect text from stored instruction sets.
//!
//! The decompiler replays the instruction stream once, building an
//! expression tree in each memory slot. Operands consume the slots they read,
//! so a well-formed set ends with exactly one live value (or with a single
//! tracker write-back as its last instruction).

use ruint::aliases::U256;

use crate::abi;
use crate::types::{
    AssignOp, CompiledExpression, DecompileError, Effect, Expr, Instruction, InstructionSet,
    NameResolver, Placeholder, RawDataEntry, RawDataKind, ReferenceKind, MAX_DEPTH,
};

/// Decompile a condition compiled by [`compile_condition`](crate::compile_condition).
///
/// # Errors
///
/// Returns [`DecompileError`] if the instruction set is malformed or refers
/// to IDs `names` cannot resolve.
pub fn decompile_condition<N: NameResolver + ?Sized>(
    compiled: &CompiledExpression,
    names: &N,
) -> Result<String, DecompileError> {
    decompile_instructions(
        &compiled.instruction_set,
        &compiled.placeholders,
        &compiled.raw_data,
        names,
    )
}

/// Render one effect back to effect syntax. `placeholders` is the rule's
/// shared effect placeholder table.
///
/// # Errors
///
/// As for [`decompile_instructions`], plus [`DecompileError::Abi`] for an
/// event parameter whose encoding does not match its type.
pub fn decompile_effect<N: NameResolver + ?Sized>(
    effect: &Effect,
    placeholders: &[Placeholder],
    names: &N,
) -> Result<String, DecompileError> {
    match effect {
        Effect::Revert { message } if message.is_empty() => Ok("revert()".to_owned()),
        Effect::Revert { message } => Ok(format!("revert(\"{message}\")")),
        Effect::Event { tag, param: None } => Ok(format!("emit {tag}")),
        Effect::Event {
            tag,
            param: Some(param),
        } => Ok(format!("emit {tag}, {}", param.to_text()?)),
        Effect::Expression {
            instruction_set,
            raw_data,
        } => decompile_instructions(instruction_set, placeholders, raw_data, names),
    }
}

/// Rebuild source text from an instruction set and its side tables.
///
/// # Errors
///
/// Returns [`DecompileError`] for undecodable or empty sets, slots read out
/// of order or twice, placeholder indices out of range, IDs missing from
/// `names`, write-backs that are not the final instruction, values nested
/// deeper than [`MAX_DEPTH`], and values that never fold into a single
/// result.
pub fn decompile_instructions<N: NameResolver + ?Sized>(
    instruction_set: &InstructionSet,
    placeholders: &[Placeholder],
    raw_data: &[RawDataEntry],
    names: &N,
) -> Result<String, DecompileError> {
    names.validate()?;
    let decoded = instruction_set.decode()?;
    let Some(last) = decoded.len().checked_sub(1) else {
        return Err(DecompileError::Empty);
    };
    let mut replay = Replay {
        slots: Vec::new(),
        placeholders,
        raw_data,
        surrogates: raw_data
            .iter()
            .map(RawDataEntry::surrogate)
            .collect::<Result<_, _>>()?,
        names,
    };

    for (i, (position, instruction)) in decoded.iter().enumerate() {
        let position = *position;
        if instruction.is_write_back() {
            if i != last {
                return Err(DecompileError::MisplacedWriteBack { position });
            }
            let text = replay.write_back(position, instruction)?;
            let count = replay.live();
            if count > 0 {
                return Err(DecompileError::DanglingValues { count });
            }
            return Ok(text);
        }
        let value = replay.value(position, instruction)?;
        replay.slots.push(Some(value));
    }

    let count = replay.live();
    if count > 1 {
        return Err(DecompileError::DanglingValues { count: count - 1 });
    }
    let result = replay
        .slots
        .pop()
        .flatten()
        .ok_or(DecompileError::DanglingValues { count })?;
    Ok(render_top(&result.expr))
}

/// A rebuilt subtree and its height.
struct Value {
    expr: Expr<String>,
    depth: usize,
}

struct Replay<'a, N: ?Sized> {
    slots: Vec<Option<Value>>,
    placeholders: &'a [Placeholder],
    raw_data: &'a [RawDataEntry],
    surrogates: Vec<U256>,
    names: &'a N,
}

impl<N: NameResolver + ?Sized> Replay<'_, N> {
    fn live(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    fn take(&mut self, position: usize, slot: usize) -> Result<Value, DecompileError> {
        self.slots
            .get_mut(slot)
            .and_then(Option::take)
            .ok_or(DecompileError::SlotUnavailable { position, slot })
    }

    fn value(
        &mut self,
        position: usize,
        instruction: &Instruction,
    ) -> Result<Value, DecompileError> {
        let (expr, depth) = match *instruction {
            Instruction::Literal(value) => (self.literal(position + 1, value)?, 1),
            Instruction::Placeholder { index } => (Expr::Ref(self.placeholder_name(index)?), 1),
            Instruction::MappedPlaceholder { index, key } => {
                let tracker = self.placeholder_name(index)?;
                let key = self.take(position, key)?;
                (
                    Expr::MappedTracker {
                        tracker,
                        key: Box::new(key.expr),
                    },
                    key.depth + 1,
                )
            }
            Instruction::Not { operand } => {
                let operand = self.take(position, operand)?;
                (Expr::Not(Box::new(operand.expr)), operand.depth + 1)
            }
            Instruction::Binary { op, left, right } => {
                let left = self.take(position, left)?;
                let right = self.take(position, right)?;
                let depth = 1 + left.depth.max(right.depth);
                (Expr::binary(op, left.expr, right.expr), depth)
            }
            Instruction::MappedAssign { .. }
            | Instruction::TrackerUpdate { .. }
            | Instruction::TrackerUpdateFromPlaceholder { .. } => {
                return Err(DecompileError::MisplacedWriteBack { position });
            }
        };
        if depth > MAX_DEPTH {
            return Err(DecompileError::TooDeep { position });
        }
        Ok(Value { expr, depth })
    }

    /// Raw data is matched by operand position first, then by surrogate for
    /// repeats of a literal recorded elsewhere in the set.
    fn literal(&self, operand: usize, value: U256) -> Result<Expr<String>, DecompileError> {
        let entry = self
            .raw_data
            .iter()
            .find(|entry| entry.position == operand)
            .or_else(|| {
                self.surrogates
                    .iter()
                    .position(|surrogate| *surrogate == value)
                    .map(|i| &self.raw_data[i])
            });
        match entry {
            None => Ok(Expr::Number(value)),
            Some(entry) => match entry.kind {
                RawDataKind::String => Ok(Expr::Text(entry.text.clone())),
                RawDataKind::Bytes => Ok(Expr::Bytes(abi::parse_hex(&entry.text)?)),
            },
        }
    }

    fn placeholder_name(&self, index: usize) -> Result<String, DecompileError> {
        let placeholder =
            self.placeholders
                .get(index)
                .ok_or(DecompileError::PlaceholderOutOfRange {
                    index,
                    len: self.placeholders.len(),
                })?;
        match placeholder
            .kind()
            .ok_or(DecompileError::InvalidPlaceholder { index })?
        {
            ReferenceKind::ForeignCall(id) => Ok(format!("FC:{}", self.foreign_call_name(id)?)),
            ReferenceKind::Tracker(id) => Ok(format!("TR:{}", self.tracker_name(id)?)),
            ReferenceKind::Argument(position) => self
                .names
                .argument_name(position)
                .map(str::to_owned)
                .ok_or(DecompileError::UnknownName {
                    kind: "argument",
                    id: position,
                }),
            ReferenceKind::Global(global) => Ok(global.name().to_owned()),
        }
    }

    fn tracker_name(&self, id: u32) -> Result<&str, DecompileError> {
        self.names
            .tracker_name(id)
            .ok_or(DecompileError::UnknownName {
                kind: "tracker",
                id,
            })
    }

    fn foreign_call_name(&self, id: u32) -> Result<&str, DecompileError> {
        self.names
            .foreign_call_name(id)
            .ok_or(DecompileError::UnknownName {
                kind: "foreign call",
                id,
            })
    }

    fn write_back(
        &mut self,
        position: usize,
        instruction: &Instruction,
    ) -> Result<String, DecompileError> {
        match *instruction {
            Instruction::TrackerUpdate { tracker_id, value } => {
                let value = self.take(position, value)?.expr;
                Ok(render_update(self.tracker_name(tracker_id)?, None, &value))
            }
            Instruction::TrackerUpdateFromPlaceholder { tracker_id, index } => {
                let value = Expr::Ref(self.placeholder_name(index)?);
                Ok(render_update(self.tracker_name(tracker_id)?, None, &value))
            }
            Instruction::MappedAssign {
                tracker_id,
                key,
                value,
            } => {
                let value = self.take(position, value)?.expr;
                let key = self.take(position, key)?.expr;
                Ok(render_update(
                    self.tracker_name(tracker_id)?,
                    Some(&key),
                    &value,
                ))
            }
            _ => Err(DecompileError::MisplacedWriteBack { position }),
        }
    }
}

// -- Rendering ----------------------------------------------------------------

/// Render without the parentheses a top-level logical group would carry.
fn render_top(expr: &Expr<String>) -> String {
    match expr {
        Expr::Binary { op, left, right } if op.is_logical() => {
            format!("{} {op} {}", render(left), render(right))
        }
        other => render(other),
    }
}

fn render(expr: &Expr<String>) -> String {
    match expr {
        Expr::Number(value) => value.to_string(),
        Expr::Text(text) => quote(text),
        Expr::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
        Expr::Ref(name) => name.clone(),
        Expr::MappedTracker { tracker, key } => format!("{tracker}({})", render_top(key)),
        Expr::Not(inner) => match inner.as_ref() {
            leaf if leaf.is_leaf() => format!("NOT {}", render(leaf)),
            Expr::Not(_) => format!("NOT {}", render(inner)),
            Expr::Binary { op, .. } if op.is_logical() => format!("NOT {}", render(inner)),
            other => format!("NOT ({})", render(other)),
        },
        Expr::Binary { op, left, right } if op.is_logical() => {
            format!("({} {op} {})", render(left), render(right))
        }
        Expr::Binary { op, left, right } => {
            let prec = op.precedence();
            let wrap_left = left.precedence() < prec
                || (op.is_comparison() && left.precedence() == prec);
            let wrap_right = right.precedence() <= prec;
            format!(
                "{} {op} {}",
                operand(left, wrap_left),
                operand(right, wrap_right)
            )
        }
    }
}

/// Logical groups already carry their own parentheses.
fn operand(expr: &Expr<String>, wrap: bool) -> String {
    let logical = matches!(expr, Expr::Binary { op, .. } if op.is_logical());
    if wrap && !logical {
        format!("({})", render(expr))
    } else {
        render(expr)
    }
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// `TRU:t op= rhs` when the value reads the same target, `TRU:t = value`
/// otherwise.
fn render_update(tracker: &str, key: Option<&Expr<String>>, value: &Expr<String>) -> String {
    let target_name = format!("TR:{tracker}");
    let target = match key {
        Some(key) => format!("TRU:{tracker}({})", render_top(key)),
        None => format!("TRU:{tracker}"),
    };
    if let Expr::Binary { op, left, right } = value {
        let reads_target = match (left.as_ref(), key) {
            (Expr::Ref(name), None) => *name == target_name,
            (
                Expr::MappedTracker {
                    tracker: name,
                    key: read_key,
                },
                Some(key),
            ) => *name == target_name && read_key.as_ref() == key,
            _ => false,
        };
        if let Some(assign) = AssignOp::from_binary(*op).filter(|_| reads_target) {
            return format!("{target} {assign} {}", render_top(right));
        }
    }
    format!("{target} = {}", render_top(value))
}
