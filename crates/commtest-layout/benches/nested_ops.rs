use commtest_core::InputId;
use commtest_layout::nested::{self, LayoutPath, NestedAction};
use commtest_layout::{FieldErrors, ValueMap};
use commtest_model::{CellContent, CellInput, CellPosition, NestedTableLayout, ScalarType};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn deep_layout() -> NestedTableLayout {
    let mut leaf = NestedTableLayout::new(3, 3);
    for cell in &mut leaf.cells {
        cell.content = CellContent::Input(CellInput::of_type(ScalarType::Number));
    }
    let mut layout = leaf;
    for _ in 0..3 {
        let mut outer = NestedTableLayout::new(4, 4);
        for cell in &mut outer.cells {
            cell.content = CellContent::NestedTable {
                nested_table: Box::new(layout.clone()),
            };
        }
        layout = outer;
    }
    layout
}

fn bench_merge(c: &mut Criterion) {
    let grid = NestedTableLayout::new(40, 40);
    c.bench_function("nested_merge_40x40", |b| {
        b.iter(|| {
            nested::reduce(
                black_box(&grid),
                &LayoutPath::root(),
                NestedAction::Merge {
                    from: CellPosition::new(3, 5),
                    to: CellPosition::new(30, 32),
                },
            )
            .expect("merge")
        })
    });
}

fn bench_render(c: &mut Criterion) {
    let layout = deep_layout();
    let id = InputId::new("bench").expect("id");
    let values = ValueMap::new();
    let errors = FieldErrors::new();
    c.bench_function("nested_render_depth_4", |b| {
        b.iter(|| nested::render(black_box(&layout), &id, &values, &errors))
    });
}

criterion_group!(benches, bench_merge, bench_render);
criterion_main!(benches);
