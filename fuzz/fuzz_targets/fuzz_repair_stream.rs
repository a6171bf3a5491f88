#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut out = Vec::new();
    if let Ok(summary) = variant_stats::repair::repair_stream(Cursor::new(data), &mut out) {
        assert!(summary.rewritten() <= summary.lines);
        if summary.rewritten() == 0 {
            assert_eq!(out, data, "untouched input must be copied byte for byte");
        }
    }
});
