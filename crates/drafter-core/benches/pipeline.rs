use drafter_core::storage::{ContentStore, MemoryStore, RedbStore};
use drafter_core::{
    materialize, Bindings, Content, DependencyGraph, Key, SectionKey, StalenessEvaluator, UnitKey,
};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use tempfile::TempDir;

fn populated_store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .append_version(Key::Brief, Content::Brief(Default::default()))
        .unwrap();
    for unit in UnitKey::ALL {
        store
            .append_version(Key::Unit(*unit), Content::text(format!("{} output", unit)))
            .unwrap();
    }
    for section in SectionKey::ALL {
        store
            .append_version(Key::Section(*section), Content::text(section.label()))
            .unwrap();
    }
    store
}

fn bench_redb_append(c: &mut Criterion) {
    c.bench_function("redb append version", |b| {
        b.iter_batched(
            || {
                let temp_dir = TempDir::new().unwrap();
                let store = RedbStore::open(temp_dir.path().join("bench.redb")).unwrap();
                (store, temp_dir)
            },
            |(store, _temp)| {
                store
                    .append_version(Key::Section(SectionKey::Claims), Content::text("1. 一种方法。"))
                    .unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_staleness_full_document(c: &mut Criterion) {
    let graph = DependencyGraph::standard().unwrap();
    let store = populated_store();
    store
        .append_version(Key::Brief, Content::Brief(Default::default()))
        .unwrap();

    c.bench_function("staleness of every section", |b| {
        b.iter(|| {
            let mut evaluator = StalenessEvaluator::new(&graph, &store);
            for section in SectionKey::ALL {
                evaluator.is_stale(Key::Section(*section)).unwrap();
            }
        });
    });
}

fn bench_materialize(c: &mut Criterion) {
    let template = "核心创新点：{core_inventive_concept}\n技术方案：{technical_solution_summary}\n示例：{\"a\": 1}";
    let bindings = Bindings::new()
        .with("core_inventive_concept", "多尺度边缘融合".repeat(50))
        .with("technical_solution_summary", "{not_a_placeholder}".repeat(50));

    c.bench_function("materialize template", |b| {
        b.iter(|| materialize(template, &bindings).unwrap());
    });
}

criterion_group!(
    benches,
    bench_redb_append,
    bench_staleness_full_document,
    bench_materialize,
);
criterion_main!(benches);
