#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);

    for line in input.lines() {
        let Some((_, fixed)) = variant_stats::repair::repair_line(line) else {
            continue;
        };

        // A repaired line never needs a second pass.
        assert!(
            variant_stats::repair::repair_line(&fixed).is_none() || line.starts_with(char::is_whitespace),
            "repair is not idempotent for {line:?}"
        );
        assert!(!fixed.contains('\n'));
    }
});
