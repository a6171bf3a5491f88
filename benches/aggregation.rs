use std::{fs, io::Cursor, path::PathBuf};

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tempfile::tempdir;
use variant_stats::{analysis, repair, summarize};

const HEADER: &str = "\
##fileformat=VCFv4.2
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele frequency\">
##INFO=<ID=CSQ,Number=.,Type=String,Description=\"Consequence annotations\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
";

const BASES: [&str; 4] = ["A", "C", "G", "T"];

fn synthetic_vcf(records: usize, delimiter: char) -> String {
    let mut content = String::from(HEADER);
    for i in 1..=records {
        let reference = BASES[i % 4];
        let alternate = BASES[(i + 1 + i / 7) % 4];
        let alternate = if alternate == reference { BASES[(i + 2) % 4] } else { alternate };
        let fields = [
            format!("{}", 1 + i % 22),
            i.to_string(),
            ".".to_string(),
            reference.to_string(),
            alternate.to_string(),
            format!("{}", 10 + i % 90),
            "PASS".to_string(),
            format!("DP={};AF=0.{};CSQ=x|missense_variant|y", i % 200, 1 + i % 9),
        ];
        content.push_str(&fields.join(&delimiter.to_string()));
        content.push('\n');
    }
    content
}

fn write_input(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn bench_summarize(c: &mut Criterion) {
    let mut group = c.benchmark_group("summarize");
    for size in [1_000usize, 100_000] {
        let values: Vec<f64> = (0..size).map(|i| ((i * 7919) % 1000) as f64).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &values, |b, values| {
            b.iter(|| summarize(black_box(values)));
        });
    }
    group.finish();
}

fn bench_repair_stream(c: &mut Criterion) {
    let spaced = synthetic_vcf(10_000, ' ');
    c.bench_function("repair_stream_10k", |b| {
        b.iter_batched(
            || Cursor::new(spaced.as_bytes()),
            |reader| {
                let mut out = Vec::with_capacity(spaced.len());
                repair::repair_stream(reader, &mut out).unwrap()
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_analyze(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let tabbed = write_input(&dir, "tabbed.vcf", &synthetic_vcf(10_000, '\t'));

    let mut group = c.benchmark_group("analyze");
    group.sample_size(20);
    group.bench_function("tabbed_10k", |b| {
        b.iter(|| analysis::analyze(black_box(&tabbed)).unwrap());
    });
    group.bench_function("spaced_10k", |b| {
        b.iter_batched(
            || {
                let path = write_input(&dir, "spaced.vcf", &synthetic_vcf(10_000, ' '));
                let _ = fs::remove_file(repair::repaired_path(&path));
                path
            },
            |path| analysis::analyze(&path).unwrap(),
            BatchSize::PerIteration,
        );
    });
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let inputs: Vec<PathBuf> = (0..8)
        .map(|i| write_input(&dir, &format!("input_{i}.vcf"), &synthetic_vcf(2_000, '\t')))
        .collect();

    let mut group = c.benchmark_group("analyze_batch");
    group.sample_size(10);
    for workers in [1usize, 4] {
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, &workers| {
            b.iter(|| analysis::analyze_batch(&inputs, workers).unwrap());
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_summarize,
    bench_repair_stream,
    bench_analyze,
    bench_batch
);
criterion_main!(benches);
