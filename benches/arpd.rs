use bench_scripts::arpd::{compute_arpd, Instance, ReferenceTable, ResultTable};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn synthetic_tables(classes: usize, per_class: usize) -> (ReferenceTable, ResultTable, Vec<String>) {
    let mut results = String::from("name,time,quality\n");
    let mut instances = Vec::with_capacity(classes * per_class);
    for c in 0..classes {
        for i in 0..per_class {
            let name = format!("inst_{}_{}", c, i);
            let bk = 1000.0 + (c * per_class + i) as f64;
            results.push_str(&format!("{},{},{}\n", name, bk * 1.01, bk * 0.99));
            instances.push(Instance {
                name,
                bk_primal: bk,
                class_name: format!("class_{}", c),
            });
        }
    }
    let metrics = vec!["time".to_string(), "quality".to_string()];
    let reference = ReferenceTable::from_instances(instances);
    let results = ResultTable::from_reader(results.as_bytes(), &metrics).unwrap();
    (reference, results, metrics)
}

fn arpd_benchmark(c: &mut Criterion) {
    let (reference, results, metrics) = synthetic_tables(12, 10);
    c.bench_function("arpd 12x10", |b| {
        b.iter(|| compute_arpd(black_box(&reference), black_box(&results), &metrics).unwrap())
    });

    let (reference, results, metrics) = synthetic_tables(50, 100);
    c.bench_function("arpd 50x100", |b| {
        b.iter(|| compute_arpd(black_box(&reference), black_box(&results), &metrics).unwrap())
    });
}

criterion_group!(benches, arpd_benchmark);
criterion_main!(benches);
