use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rulecode::{
    compile_condition, compile_rule, parse_condition, NameTables, ReferenceEntry, RuleDefinition,
    TrackerEntry, ValueType,
};

/// Build a condition ANDing `n` comparisons over a handful of arguments, so
/// placeholders repeat and the dedup path is exercised.
fn build_condition(n: usize) -> String {
    let names = ["value", "TR:balance", "FC:score", "to"];
    (0..n)
        .map(|i| format!("{} + {i} > {}", names[i % names.len()], i * 3))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn tables() -> NameTables {
    NameTables::from_signature("address to, uint256 value")
        .unwrap()
        .foreign_call("score", 1, ValueType::Uint256)
        .tracker("balance", 2, ValueType::Uint256)
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for &n in &[5, 20, 50] {
        let text = build_condition(n);
        group.bench_function(&format!("{n}_terms"), |b| {
            b.iter(|| parse_condition(black_box(&text)).unwrap());
        });
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_condition");
    let tables = tables();

    for &n in &[5, 20, 50] {
        let text = build_condition(n);
        group.bench_function(&format!("{n}_terms"), |b| {
            b.iter(|| compile_condition(black_box(&text), &tables).unwrap());
        });
    }

    group.finish();
}

fn bench_rule(c: &mut Criterion) {
    let rule = RuleDefinition {
        condition: build_condition(10),
        positive_effects: vec!["TRU:balance -= value".into(), "emit Paid, 1".into()],
        negative_effects: vec!["revert(\"denied\")".into()],
        calling_function: "transfer(address to, uint256 value)".into(),
    };
    let foreign_calls: Vec<ReferenceEntry> = serde_json::from_str(
        r#"[{"name": "score", "id": 1, "valueType": "uint256"}]"#,
    )
    .unwrap();
    let trackers: Vec<TrackerEntry> = serde_json::from_str(
        r#"[{"name": "balance", "id": 2, "valueType": "uint256"}]"#,
    )
    .unwrap();

    c.bench_function("compile_rule", |b| {
        b.iter(|| black_box(compile_rule(black_box(&rule), &foreign_calls, &trackers).unwrap()));
    });
}

criterion_group!(benches, bench_parse, bench_compile, bench_rule);
criterion_main!(benches);
