#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(rows) = level_config::parse_capture(data) {
        assert!(!rows.is_empty());
    }
});
