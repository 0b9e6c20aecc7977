use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use recast_core::{apply, Buffer, EditTree, Region};

fn rename_fixture() -> String {
    let mut out = String::from("class RenameFixture {\n  void target() {}\n\n  void run() {\n");
    for _ in 0..2_000u32 {
        out.push_str("    target();\n");
    }
    out.push_str("  }\n}\n");
    out
}

fn rename_tree(text: &str) -> EditTree {
    let mut tree = EditTree::new(text.len());
    for (offset, _) in text.match_indices("target") {
        let id = tree.replace(Region::new(offset, "target".len()), "renamedTarget");
        tree.add(id).expect("occurrences never overlap");
    }
    tree
}

fn bench_apply(c: &mut Criterion) {
    let text = rename_fixture();
    let buffer = Buffer::from(text.as_str());

    c.bench_function("build_rename_tree", |b| {
        b.iter(|| rename_tree(black_box(&text)))
    });

    let tree = rename_tree(&text);
    c.bench_function("apply_rename_tree", |b| {
        b.iter(|| apply(black_box(&buffer), black_box(&tree)).expect("tree applies"))
    });

    let outcome = apply(&buffer, &tree).expect("tree applies");
    c.bench_function("remap_tail_region", |b| {
        let tail = Region::new(text.len() - 4, 4);
        b.iter(|| outcome.map.map(black_box(tail)).expect("tail is untouched"))
    });

    c.bench_function("apply_inverse", |b| {
        b.iter_batched(
            || outcome.map.inverse(&buffer).expect("inverse is well formed"),
            |inverse| apply(&outcome.buffer, &inverse).expect("inverse applies"),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_apply);
criterion_main!(benches);
