//! 차이 평가기 -- 기대 상태와 프로브 결과를 비교하여 판정을 생성합니다.
//!
//! # 판정 규칙
//! - `ProbeOutcome::Error` → `Unknown`
//! - 기대값 `Absent` + 실제 `Absent` → `Compliant`
//! - 기대값 `Absent` + 실제 `Present(v)` → `NonCompliant`
//! - 기대값 `Equals(e)` + 실제 `Absent` → `NonCompliant`
//! - 기대값 `Equals(e)` + 실제 `Present(v)` → `v`가 `e`를 만족하면 `Compliant`
//!
//! 구조화된 값은 추가 허용(additive-tolerant) 비교를 사용합니다.
//! 기대 집합의 모든 키가 같은 값으로 존재해야 하며, 실제 값에만 있는 키는 무시합니다.
//! 중첩된 값은 통째로 비교합니다.

use serde::Serialize;

use crate::fact::Descriptor;
use crate::types::{Expected, FactValue, Observed, ProbeOutcome, Verdict};

/// 디스크립터와 프로브 결과로부터 판정을 계산합니다.
pub fn evaluate(descriptor: &Descriptor, outcome: &ProbeOutcome) -> Verdict {
    evaluate_expected(&descriptor.expected, outcome)
}

/// 기대 상태와 프로브 결과로부터 판정을 계산합니다.
pub fn evaluate_expected(expected: &Expected, outcome: &ProbeOutcome) -> Verdict {
    match (expected, outcome) {
        (_, ProbeOutcome::Error(e)) => Verdict::Unknown {
            cause: e.to_string(),
        },
        (Expected::Absent, ProbeOutcome::Absent) => Verdict::Compliant,
        (Expected::Absent, ProbeOutcome::Present(actual)) => Verdict::NonCompliant {
            actual: Observed::Present(actual.clone()),
            expected: Expected::Absent,
        },
        (Expected::Equals(_), ProbeOutcome::Absent) => Verdict::NonCompliant {
            actual: Observed::Absent,
            expected: expected.clone(),
        },
        (Expected::Equals(want), ProbeOutcome::Present(actual)) => {
            if satisfies(want, actual) {
                Verdict::Compliant
            } else {
                Verdict::NonCompliant {
                    actual: Observed::Present(actual.clone()),
                    expected: expected.clone(),
                }
            }
        }
    }
}

/// 실제 값이 기대 값을 만족하는지 확인합니다.
pub fn satisfies(expected: &FactValue, actual: &FactValue) -> bool {
    match (expected, actual) {
        (FactValue::Structured(want), FactValue::Structured(have)) => want
            .iter()
            .all(|(key, value)| have.get(key) == Some(value)),
        (FactValue::List(want), FactValue::List(have)) => {
            let mut want: Vec<&String> = want.iter().collect();
            let mut have: Vec<&String> = have.iter().collect();
            want.sort();
            want.dedup();
            have.sort();
            have.dedup();
            want == have
        }
        (want, have) => want == have,
    }
}

/// 구조화된 값에서 일치하지 않는 키 하나
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyMismatch {
    /// 설정 키
    pub key: String,
    /// 실제 값 (없으면 `None`)
    pub actual: Option<serde_json::Value>,
    /// 기대 값
    pub expected: serde_json::Value,
}

/// 구조화된 기대값 중 만족되지 않은 키 목록을 키 순서대로 반환합니다.
///
/// 실제 값이 없거나 구조화된 값이 아니면 모든 기대 키가 불일치로 보고됩니다.
pub fn structured_mismatches(expected: &Expected, actual: &Observed) -> Vec<KeyMismatch> {
    let Expected::Equals(FactValue::Structured(want)) = expected else {
        return Vec::new();
    };
    let have = match actual {
        Observed::Present(FactValue::Structured(map)) => Some(map),
        _ => None,
    };
    want.iter()
        .filter_map(|(key, value)| {
            let current = have.and_then(|m| m.get(key));
            if current == Some(value) {
                None
            } else {
                Some(KeyMismatch {
                    key: key.clone(),
                    actual: current.cloned(),
                    expected: value.clone(),
                })
            }
        })
        .collect()
}
