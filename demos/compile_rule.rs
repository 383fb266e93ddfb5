use rulecode::{
    compile_rule, decompile_rule, ReferenceEntry, RuleDefinition, TrackerEntry, ValueType,
};

fn main() {
    let rule = RuleDefinition::from_json(
        r#"{
            "condition": "FC:riskScore(to) < 50 AND value <= TR:limits(to)",
            "positiveEffects": ["TRU:limits(to) -= value", "emit Approved, 1"],
            "negativeEffects": ["revert(\"limit exceeded\")"],
            "callingFunction": "transfer(address to, uint256 value)"
        }"#,
    )
    .expect("invalid rule document");

    let foreign_calls = [ReferenceEntry {
        name: "riskScore".into(),
        id: 1,
        value_type: ValueType::Uint256,
    }];
    let trackers = [TrackerEntry {
        name: "limits".into(),
        id: 2,
        value_type: ValueType::Uint256,
        key_type: Some(ValueType::Address),
    }];

    let compiled =
        compile_rule(&rule, &foreign_calls, &trackers).expect("failed to compile rule");

    println!("Condition:");
    print!("{}", compiled.condition_instruction_set);
    println!("Placeholders: {:?}", compiled.condition_placeholders);
    println!(
        "Trackers updated: {:?}",
        compiled.trackers_updated().expect("undecodable effect")
    );

    let restored = decompile_rule(
        &compiled,
        &rule.calling_function,
        &foreign_calls,
        &trackers,
    )
    .expect("failed to decompile rule");

    println!();
    println!("{}", restored.to_json().expect("failed to serialize rule"));
}
