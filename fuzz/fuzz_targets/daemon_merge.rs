#![no_main]

use bulwark_core::config::DaemonConfig;
use bulwark_core::evaluate::evaluate_expected;
use bulwark_core::types::{Expected, FactValue, ProbeOutcome, Verdict};
use bulwark_docker::daemon::merge_settings;
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let Ok(Value::Object(current)) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    let desired = DaemonConfig::default().settings;
    let (merged, changed) = merge_settings(current.clone(), &desired);

    // 병합 결과는 항상 기대 설정을 만족한다
    let verdict = evaluate_expected(
        &Expected::Equals(FactValue::Structured(desired.clone())),
        &ProbeOutcome::Present(FactValue::Structured(merged.clone())),
    );
    assert_eq!(verdict, Verdict::Compliant);

    // 기대 목록에 없는 키는 보존된다
    for (key, value) in &current {
        if !desired.contains_key(key) {
            assert_eq!(merged.get(key), Some(value));
        }
    }

    // 두 번째 병합은 아무것도 바꾸지 않는다
    let (_, again) = merge_settings(merged, &desired);
    assert!(again.is_empty(), "merge must be idempotent, changed: {changed:?}");
});
