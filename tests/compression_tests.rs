use assert_fs::prelude::*;
use std::io::Write;
use std::path::PathBuf;
use variant_stats::{
    analysis, repair,
    sniff::{self, FormatKind},
};

const CALLS: &str = "\
##fileformat=VCFv4.2
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
1\t100\t.\tA\tG\t50\tPASS\tDP=10
1\t200\t.\tC\tA\t30\tPASS\tDP=20
";

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn create_compressed_file(dir: &assert_fs::TempDir, content: &str, layers: usize, filename: &str) -> PathBuf {
    let mut data = content.as_bytes().to_vec();
    for _ in 0..layers {
        data = gzip(&data);
    }
    let child = dir.child(filename);
    child.write_binary(&data).unwrap();
    child.path().to_path_buf()
}

#[test]
fn gzipped_vcf_is_read_in_place() {
    let temp = assert_fs::TempDir::new().unwrap();
    let input = create_compressed_file(&temp, CALLS, 1, "calls.vcf.gz");

    let sniffed = sniff::sniff(&input).unwrap();
    assert!(sniffed.compressed);
    assert_eq!(sniffed.kind, FormatKind::Tabular);

    let (outcome, report) = analysis::analyze_with_outcome(&input, None).unwrap();
    assert!(!outcome.repaired);
    assert_eq!(report.record_count(), 2);
    assert_eq!(report.raw().transitions, 1);
    assert_eq!(report.raw().transversions, 1);
}

#[test]
fn compressed_input_without_extension_is_sniffed_by_content() {
    let temp = assert_fs::TempDir::new().unwrap();
    let input = create_compressed_file(&temp, CALLS, 1, "upload.bin");

    let sniffed = sniff::sniff(&input).unwrap();
    assert!(sniffed.compressed);
    assert_eq!(sniffed.kind, FormatKind::Tabular);
    assert_eq!(analysis::analyze(&input).unwrap().record_count(), 2);
}

#[test]
fn double_gzip_is_peeled() {
    let temp = assert_fs::TempDir::new().unwrap();
    let input = create_compressed_file(&temp, CALLS, 2, "calls.vcf.gz");

    let report = analysis::analyze(&input).unwrap();
    assert_eq!(report.record_count(), 2);
}

#[test]
fn spaced_gzip_input_gets_plain_repaired_copy() {
    let temp = assert_fs::TempDir::new().unwrap();
    let input = create_compressed_file(&temp, &CALLS.replace('\t', " "), 1, "spaced.vcf.gz");

    let (outcome, report) = analysis::analyze_with_outcome(&input, None).unwrap();
    assert!(outcome.repaired);
    assert_eq!(report.record_count(), 2);

    let fixed = repair::repaired_path(&input);
    assert_eq!(outcome.path, fixed);
    let text = std::fs::read_to_string(&fixed).unwrap();
    assert_eq!(text, CALLS);
}
