#![no_main]

use bulwark_core::config::parse_env_file;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        for (key, _) in parse_env_file(content) {
            assert!(!key.is_empty(), "empty keys must be skipped");
            assert!(!key.starts_with('#'), "comments must be skipped");
        }
    }
});
