
use proptest::prelude::*;
use rulecode::{
    compile_condition, compile_effect, decompile_condition, decompile_effect,
    decompile_instructions, InstructionSet, Placeholder, ReferenceBinding, ReferenceKind,
    ValueType, MAX_DEPTH,
};
use ruint::aliases::U256;
use strategies::{arb_condition, arb_update, tables};

// ---------------------------------------------------------------------------
// Round-trip stability
//
// Decompiled text recompiles to exactly the instruction set, placeholder
// table and raw data it came from.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn condition_round_trip(text in arb_condition()) {
        let tables = tables();
        let first = compile_condition(&text, &tables).unwrap();
        let source = decompile_condition(&first, &tables).unwrap();
        let second = compile_condition(&source, &tables).unwrap();
        prop_assert_eq!(&first, &second, "{} -> {}", text, source);
    }

    #[test]
    fn decompiled_text_is_stable(text in arb_condition()) {
        let tables = tables();
        let once = decompile_condition(&compile_condition(&text, &tables).unwrap(), &tables).unwrap();
        let twice = decompile_condition(&compile_condition(&once, &tables).unwrap(), &tables).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn update_round_trip(text in arb_update()) {
        let tables = tables();
        let mut placeholders = Vec::new();
        let first = compile_effect(&text, &tables, &mut placeholders).unwrap();
        let source = decompile_effect(&first, &placeholders, &tables).unwrap();

        let mut again = Vec::new();
        let second = compile_effect(&source, &tables, &mut again).unwrap();
        prop_assert_eq!(&first, &second, "{} -> {}", text, source);
        prop_assert_eq!(placeholders, again);
    }
}

// ---------------------------------------------------------------------------
// Structural invariants of compiled output
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn compiled_output_validates(text in arb_condition()) {
        let compiled = compile_condition(&text, &tables()).unwrap();
        prop_assert!(compiled
            .instruction_set
            .validate(compiled.placeholders.len(), &compiled.raw_data)
            .is_ok());
    }

    #[test]
    fn placeholders_are_unique(text in arb_condition()) {
        let compiled = compile_condition(&text, &tables()).unwrap();
        let kinds: Vec<_> = compiled.placeholders.iter().map(Placeholder::kind).collect();
        for (i, kind) in kinds.iter().enumerate() {
            prop_assert!(kind.is_some());
            prop_assert!(!kinds[i + 1..].contains(kind));
        }
    }

    #[test]
    fn raw_data_is_unique(text in arb_condition()) {
        let compiled = compile_condition(&text, &tables()).unwrap();
        for (i, entry) in compiled.raw_data.iter().enumerate() {
            prop_assert!(compiled.raw_data[i + 1..].iter().all(|e| e.text != entry.text));
            prop_assert_eq!(
                compiled.instruction_set.words()[entry.position],
                entry.surrogate().unwrap()
            );
        }
    }

    #[test]
    fn compilation_is_deterministic(text in arb_condition()) {
        let tables = tables();
        prop_assert_eq!(
            compile_condition(&text, &tables).unwrap(),
            compile_condition(&text, &tables).unwrap()
        );
    }
}

// ---------------------------------------------------------------------------
// Robustness: arbitrary input never panics
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn compile_arbitrary_text(text in "[ -~]{0,48}") {
        let _ = compile_condition(&text, &tables());
        let _ = compile_effect(&text, &tables(), &mut Vec::new());
    }

    #[test]
    fn nesting_is_bounded(depth in 1_usize..600) {
        let text = format!("{}value > 1{}", "(".repeat(depth), ")".repeat(depth));
        let compiled = compile_condition(&text, &tables());
        prop_assert_eq!(compiled.is_ok(), depth <= MAX_DEPTH);
    }

    #[test]
    fn decompile_arbitrary_words(words in prop::collection::vec(0_u64..24, 0..32)) {
        let set = InstructionSet::from_words(words.into_iter().map(U256::from).collect());
        let placeholders = [
            Placeholder::for_binding(&ReferenceBinding::new(
                ReferenceKind::Argument(1),
                ValueType::Uint256,
            )),
            Placeholder::for_binding(&ReferenceBinding::new(
                ReferenceKind::Tracker(2),
                ValueType::Uint256,
            )),
        ];
        let _ = decompile_instructions(&set, &placeholders, &[], &tables());
    }
}
