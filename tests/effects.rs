use rulecode::{
    compile_effect, compile_effects, decompile_effect, CompileError, Effect, Instruction,
    NameTables, ReferenceKind, ValueType,
};

fn tables() -> NameTables {
    NameTables::from_signature("address to, uint256 value")
        .unwrap()
        .tracker("bal", 4, ValueType::Uint256)
        .mapped_tracker("spent", 5, ValueType::Address, ValueType::Uint256)
}

fn compile(text: &str) -> Result<Effect, CompileError> {
    compile_effect(text, &tables(), &mut Vec::new())
}

#[test]
fn revert_message() {
    assert_eq!(
        compile("revert('x')").unwrap(),
        Effect::Revert {
            message: "x".into()
        }
    );
}

#[test]
fn emit_with_number() {
    let Effect::Event { tag, param } = compile("emit Foo, 5").unwrap() else {
        panic!("expected event");
    };
    assert_eq!(tag, "Foo");
    let param = param.unwrap();
    assert_eq!(param.value_type, ValueType::Uint256);
    assert_eq!(param.to_text().unwrap(), "5");
}

#[test]
fn emit_with_address() {
    let Effect::Event { param, .. } =
        compile("emit Sent, 0x1234567890abcdef1234567890abcdef12345678").unwrap()
    else {
        panic!("expected event");
    };
    let param = param.unwrap();
    assert_eq!(param.value_type, ValueType::Address);
    assert_eq!(
        param.to_text().unwrap(),
        "0x1234567890abcdef1234567890abcdef12345678"
    );
}

#[test]
fn tracker_update_writes_back_to_tracker() {
    let Effect::Expression {
        instruction_set, ..
    } = compile("TRU:bal -= 1").unwrap()
    else {
        panic!("expected expression");
    };
    let decoded = instruction_set.decode().unwrap();
    assert!(matches!(
        decoded.last(),
        Some((_, Instruction::TrackerUpdate { tracker_id: 4, .. }))
    ));
}

#[test]
fn mapped_update_writes_with_key() {
    let Effect::Expression {
        instruction_set, ..
    } = compile("TRU:spent(to) += value").unwrap()
    else {
        panic!("expected expression");
    };
    let decoded = instruction_set.decode().unwrap();
    assert!(matches!(
        decoded.last(),
        Some((_, Instruction::MappedAssign { tracker_id: 5, .. }))
    ));
}

#[test]
fn shared_placeholder_table_across_effects() {
    let compiled = compile_effects(
        &["TRU:bal += value", "emit Credited, 1"],
        &["TRU:bal -= value", "revert(\"denied\")"],
        &tables(),
    )
    .unwrap();
    let kinds: Vec<_> = compiled.placeholders.iter().map(|p| p.kind()).collect();
    assert_eq!(
        kinds,
        [
            Some(ReferenceKind::Tracker(4)),
            Some(ReferenceKind::Argument(1))
        ]
    );
    assert_eq!(compiled.positive.len(), 2);
    assert_eq!(compiled.negative.len(), 2);
}

#[test]
fn effects_decompile_to_their_source() {
    let sources = [
        "revert(\"denied\")",
        "revert()",
        "emit Credited",
        "emit Credited, 10",
        "TRU:bal += value",
        "TRU:bal = 0",
        "TRU:bal = value",
        "TRU:spent(to) -= 1",
    ];
    let compiled = compile_effects(&sources, &[] as &[&str], &tables()).unwrap();
    for (source, effect) in sources.iter().zip(&compiled.positive) {
        let text = decompile_effect(effect, &compiled.placeholders, &tables()).unwrap();
        assert_eq!(&text, source);
    }
}

#[test]
fn update_errors() {
    assert!(matches!(
        compile("TRU:missing += 1"),
        Err(CompileError::UnresolvedReference { .. })
    ));
    assert!(matches!(
        compile("TRU:spent += 1"),
        Err(CompileError::TrackerKeyMismatch { .. })
    ));
    assert!(matches!(
        compile("value + TRU:bal"),
        Err(CompileError::MisplacedTrackerUpdate { .. })
    ));
    assert_eq!(compile(" "), Err(CompileError::EmptyEffect));
}
