#![no_main]

use bulwark_core::config::BulwarkConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        if let Ok(config) = BulwarkConfig::parse(content) {
            // 파싱에 성공한 설정은 검증과 폴더 설정 확정에서 패닉하지 않아야 한다
            let _ = config.validate();
            let _ = config.folder_settings();
        }
    }
});
