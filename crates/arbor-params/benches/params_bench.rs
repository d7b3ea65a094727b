use arbor_params::{BranchParameters, Parameters, TreeParameters};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn deep_tree() -> TreeParameters {
    let mut tree = TreeParameters::with_depth(0);
    for level in 0..64 {
        let branch = BranchParameters {
            inherit: level % 3 != 0,
            taper: level as f32 * 0.01,
            ..BranchParameters::default()
        };
        tree.add_branch(branch, None).unwrap();
    }
    tree
}

fn bench_effective_branches_64(c: &mut Criterion) {
    let tree = deep_tree();
    c.bench_function("effective_branches_64", |b| {
        b.iter(|| black_box(tree.effective_branches().len()));
    });
}

fn bench_tree_to_map(c: &mut Criterion) {
    let tree = TreeParameters::default();
    c.bench_function("tree_to_map", |b| {
        b.iter(|| black_box(tree.to_map()));
    });
}

fn bench_tree_from_map(c: &mut Criterion) {
    let map = deep_tree().to_map();
    c.bench_function("tree_from_map_64", |b| {
        b.iter(|| {
            let mut tree = TreeParameters::default();
            tree.from_map(black_box(&map)).unwrap();
            black_box(tree)
        });
    });
}

criterion_group!(benches, bench_effective_branches_64, bench_tree_to_map, bench_tree_from_map);
criterion_main!(benches);
