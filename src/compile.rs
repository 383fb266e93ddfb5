use crate::abi;
use crate::parse::parse_condition;
use crate::resolve::resolve_expr;
use crate::types::{
    intern, AssignOp, CompileError, CompiledExpression, Expr, Instruction, InstructionSet,
    NameResolver, NameTables, Placeholder, RawDataEntry, RawDataKind, ReferenceBinding, Statement,
};

/// Compile a rule condition into an instruction set with its own
/// placeholder table.
///
/// # Errors
///
/// Returns [`CompileError`] if `tables` is ambiguous, the text does not
/// parse, or it references a name missing from `tables`.
///
/// # Example
///
/// ```
/// use rulecode::{compile_condition, NameTables, ValueType};
///
/// let tables = NameTables::new().tracker("balance", 1, ValueType::Uint256);
/// let compiled = compile_condition("TR:balance > 500", &tables).unwrap();
/// assert_eq!(compiled.placeholders.len(), 1);
/// assert_eq!(compiled.instruction_set.len(), 7);
/// ```
pub fn compile_condition(
    text: &str,
    tables: &NameTables,
) -> Result<CompiledExpression, CompileError> {
    tables.validate()?;
    let expr = resolve_expr(&parse_condition(text)?, tables)?;
    let mut placeholders = Vec::new();
    let mut compiler = Compiler::new(&mut placeholders);
    compiler.expr(&expr);
    let (instruction_set, raw_data) = compiler.finish();
    Ok(CompiledExpression {
        instruction_set,
        placeholders,
        raw_data,
    })
}

/// Per-call code generation state. The placeholder table is borrowed so that
/// every effect of a rule can share one.
pub(crate) struct Compiler<'p> {
    instruction_set: InstructionSet,
    next_slot: usize,
    raw_data: Vec<RawDataEntry>,
    placeholders: &'p mut Vec<Placeholder>,
}

impl<'p> Compiler<'p> {
    pub(crate) fn new(placeholders: &'p mut Vec<Placeholder>) -> Self {
        Self {
            instruction_set: InstructionSet::default(),
            next_slot: 0,
            raw_data: Vec::new(),
            placeholders,
        }
    }

    pub(crate) fn finish(self) -> (InstructionSet, Vec<RawDataEntry>) {
        (self.instruction_set, self.raw_data)
    }

    /// Append an instruction and return the word offset of its opcode.
    fn emit(&mut self, instruction: &Instruction) -> usize {
        if instruction.produces_value() {
            self.next_slot += 1;
        }
        self.instruction_set.push(instruction)
    }

    /// Append a value-producing instruction and return its slot.
    fn push_value(&mut self, instruction: &Instruction) -> usize {
        let slot = self.next_slot;
        self.emit(instruction);
        slot
    }

    /// Post-order walk; returns the slot holding the expression's value.
    pub(crate) fn expr(&mut self, expr: &Expr<ReferenceBinding>) -> usize {
        match expr {
            Expr::Number(value) => self.push_value(&Instruction::Literal(*value)),
            Expr::Text(text) => {
                self.raw_literal(text.clone(), RawDataKind::String, &abi::encode_string(text))
            }
            Expr::Bytes(bytes) => self.raw_literal(
                format!("0x{}", hex::encode(bytes)),
                RawDataKind::Bytes,
                &abi::encode_bytes(bytes),
            ),
            Expr::Ref(binding) => {
                let index = intern(self.placeholders, binding);
                self.push_value(&Instruction::Placeholder { index })
            }
            Expr::MappedTracker { tracker, key } => {
                let key = self.expr(key);
                let index = intern(self.placeholders, tracker);
                self.push_value(&Instruction::MappedPlaceholder { index, key })
            }
            Expr::Not(inner) => {
                let operand = self.expr(inner);
                self.push_value(&Instruction::Not { operand })
            }
            Expr::Binary { op, left, right } => {
                let left = self.expr(left);
                let right = self.expr(right);
                self.push_value(&Instruction::Binary {
                    op: *op,
                    left,
                    right,
                })
            }
        }
    }

    /// Push the keccak surrogate of a non-numeric literal and record its text
    /// the first time it appears in this instruction set.
    fn raw_literal(&mut self, text: String, kind: RawDataKind, encoded: &[u8]) -> usize {
        let slot = self.next_slot;
        let position = self.emit(&Instruction::Literal(abi::literal_surrogate(encoded)));
        if !self
            .raw_data
            .iter()
            .any(|entry| entry.kind == kind && entry.text == text)
        {
            self.raw_data.push(RawDataEntry {
                text,
                position: position + 1,
                kind,
            });
        }
        slot
    }

    pub(crate) fn statement(
        &mut self,
        statement: &Statement<ReferenceBinding>,
    ) -> Result<(), CompileError> {
        match statement {
            Statement::Expr(expr) => {
                self.expr(expr);
                Ok(())
            }
            Statement::TrackerUpdate {
                tracker,
                key,
                op,
                value,
            } => self.tracker_update(tracker, key.as_ref(), *op, value),
        }
    }

    fn tracker_update(
        &mut self,
        tracker: &ReferenceBinding,
        key: Option<&Expr<ReferenceBinding>>,
        op: AssignOp,
        value: &Expr<ReferenceBinding>,
    ) -> Result<(), CompileError> {
        let tracker_id = tracker
            .tracker_id()
            .ok_or_else(|| CompileError::UnresolvedReference {
                kind: "tracker",
                name: tracker.kind.to_string(),
            })?;

        // `TRU:t op= rhs` reads the current value: `TR:t op rhs`.
        let value = match op.binary() {
            Some(op) => {
                let current = match key {
                    Some(key) => Expr::MappedTracker {
                        tracker: *tracker,
                        key: Box::new(key.clone()),
                    },
                    None => Expr::Ref(*tracker),
                };
                Expr::binary(op, current, value.clone())
            }
            None => value.clone(),
        };

        match (key, &value) {
            (Some(key), _) => {
                let value = self.expr(&value);
                let key = self.expr(key);
                self.emit(&Instruction::MappedAssign {
                    tracker_id,
                    key,
                    value,
                });
            }
            (None, Expr::Ref(binding)) => {
                let index = intern(self.placeholders, binding);
                self.emit(&Instruction::TrackerUpdateFromPlaceholder { tracker_id, index });
            }
            (None, _) => {
                let value = self.expr(&value);
                self.emit(&Instruction::TrackerUpdate { tracker_id, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ruint::aliases::U256;

    use super::*;
    use crate::parse::parse_statement;
    use crate::resolve::resolve_statement;
    use crate::types::{BinaryOp, Opcode, ReferenceKind, ValueType};

    fn tables() -> NameTables {
        NameTables::from_signature("address to, uint256 value")
            .unwrap()
            .foreign_call("getScore", 3, ValueType::Uint256)
            .tracker("balance", 1, ValueType::Uint256)
            .mapped_tracker("limits", 2, ValueType::Address, ValueType::Uint256)
    }

    fn words(set: &InstructionSet) -> Vec<u64> {
        set.words().iter().map(|w| w.as_limbs()[0]).collect()
    }

    fn compile_statement(text: &str) -> (InstructionSet, Vec<Placeholder>) {
        let statement = resolve_statement(&parse_statement(text).unwrap(), &tables()).unwrap();
        let mut placeholders = Vec::new();
        let mut compiler = Compiler::new(&mut placeholders);
        compiler.statement(&statement).unwrap();
        let (set, _) = compiler.finish();
        (set, placeholders)
    }

    #[test]
    fn tracker_comparison_layout() {
        let compiled = compile_condition("TR:balance > 500", &tables()).unwrap();
        assert_eq!(words(&compiled.instruction_set), [2, 0, 0, 500, 10, 0, 1]);
        assert_eq!(compiled.placeholders.len(), 1);
        assert_eq!(
            compiled.placeholders[0].kind(),
            Some(ReferenceKind::Tracker(1))
        );
        assert!(compiled.raw_data.is_empty());
    }

    #[test]
    fn placeholders_are_deduplicated() {
        let compiled =
            compile_condition("TR:balance > 1 AND TR:balance < value", &tables()).unwrap();
        assert_eq!(compiled.placeholders.len(), 2);
        let decoded = compiled.instruction_set.decode().unwrap();
        let indices: Vec<usize> = decoded
            .iter()
            .filter_map(|(_, i)| match i {
                Instruction::Placeholder { index } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(indices, [0, 0, 1]);
    }

    #[test]
    fn scenario_instruction_counts() {
        let compiled =
            compile_condition("3 + 4 > 5 AND (1 == 1 AND 2 == 2)", &NameTables::new()).unwrap();
        let decoded = compiled.instruction_set.decode().unwrap();
        let count = |opcode: Opcode| decoded.iter().filter(|(_, i)| i.opcode() == opcode).count();
        assert_eq!(count(Opcode::Literal), 7);
        assert_eq!(count(Opcode::Add), 1);
        assert_eq!(count(Opcode::Gt) + count(Opcode::Eq), 3);
        assert_eq!(count(Opcode::And), 2);
        assert!(compiled.placeholders.is_empty());
        assert!(compiled.raw_data.is_empty());
    }

    #[test]
    fn string_literal_uses_surrogate() {
        let compiled = compile_condition("'gold' == 'gold'", &tables()).unwrap();
        assert_eq!(compiled.raw_data.len(), 1);
        let entry = &compiled.raw_data[0];
        assert_eq!(entry.text, "gold");
        assert_eq!(entry.position, 1);
        let surrogate = abi::literal_surrogate(&abi::encode_string("gold"));
        assert_eq!(compiled.instruction_set.words()[1], surrogate);
        assert_eq!(compiled.instruction_set.words()[3], surrogate);
        assert!(compiled
            .instruction_set
            .validate(0, &compiled.raw_data)
            .is_ok());
    }

    #[test]
    fn bytes_literal_entry() {
        let compiled = compile_condition("msg.data == 0xbeef", &tables()).unwrap();
        assert_eq!(compiled.raw_data.len(), 1);
        assert_eq!(compiled.raw_data[0].text, "0xbeef");
        assert_eq!(compiled.raw_data[0].kind, RawDataKind::Bytes);
        assert_eq!(compiled.raw_data[0].position, 3);
    }

    #[test]
    fn not_and_mapped_read() {
        let compiled = compile_condition("NOT TR:limits(to) > 5", &tables()).unwrap();
        assert_eq!(
            words(&compiled.instruction_set),
            [2, 0, 4, 1, 0, 0, 5, 10, 1, 2, 1, 3]
        );
        assert_eq!(
            compiled.placeholders[0].kind(),
            Some(ReferenceKind::Argument(0))
        );
        assert_eq!(
            compiled.placeholders[1].kind(),
            Some(ReferenceKind::Tracker(2))
        );
    }

    #[test]
    fn compound_update_reads_then_writes() {
        let (set, placeholders) = compile_statement("TRU:balance -= 1");
        assert_eq!(words(&set), [2, 0, 0, 1, 6, 0, 1, 17, 1, 2]);
        assert_eq!(placeholders.len(), 1);
    }

    #[test]
    fn plain_reference_update_uses_placeholder() {
        let (set, placeholders) = compile_statement("TRU:balance = value");
        assert_eq!(words(&set), [18, 1, 0]);
        assert_eq!(placeholders[0].kind(), Some(ReferenceKind::Argument(1)));
    }

    #[test]
    fn mapped_update_layout() {
        let (set, _) = compile_statement("TRU:limits(to) += 1");
        assert_eq!(
            words(&set),
            [2, 0, 4, 1, 0, 0, 1, 5, 1, 2, 2, 0, 3, 2, 4, 3]
        );
        assert!(set.validate(2, &[]).is_ok());
    }

    #[test]
    fn plain_expression_statement() {
        let (set, _) = compile_statement("value * 2");
        let decoded = set.decode().unwrap();
        assert_eq!(
            decoded.last().map(|(_, i)| *i),
            Some(Instruction::Binary {
                op: BinaryOp::Mul,
                left: 0,
                right: 1
            })
        );
    }

    #[test]
    fn compilation_is_deterministic() {
        let text = "FC:getScore(to) + 'x' > TR:balance OR NOT value == 0xbeef";
        let a = compile_condition(text, &tables()).unwrap();
        let b = compile_condition(text, &tables()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn address_literal_is_numeric() {
        let compiled = compile_condition(
            "to == 0x00000000000000000000000000000000000000aa",
            &tables(),
        )
        .unwrap();
        assert_eq!(compiled.instruction_set.words()[3], U256::from(0xaau64));
        assert!(compiled.raw_data.is_empty());
    }
}
