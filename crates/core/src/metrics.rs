//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! CLI는 레코더를 설치하지 않으므로, 이 메트릭은 bulwark를 라이브러리로
//! 사용하는 애플리케이션이 레코더를 설치했을 때만 수집됩니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `bulwark_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! # 사용 예시
//!
//! ```ignore
//! use bulwark_core::metrics as m;
//!
//! metrics::counter!(m::FACTS_EVALUATED_TOTAL, m::LABEL_VERDICT => "compliant").increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 판정 레이블 키 (compliant, non_compliant, unknown)
pub const LABEL_VERDICT: &str = "verdict";

/// 결과 레이블 키 (applied, unchanged, failed, would_apply)
pub const LABEL_RESULT: &str = "result";

/// 도메인 레이블 키 (host, daemon, network, folders)
pub const LABEL_DOMAIN: &str = "domain";

/// 모드 레이블 키 (apply, check, dry-run)
pub const LABEL_MODE: &str = "mode";

// ─── 조정 엔진 메트릭 ──────────────────────────────────────────────

/// 평가된 팩트 수 (counter, label: verdict)
pub const FACTS_EVALUATED_TOTAL: &str = "bulwark_facts_evaluated_total";

/// 액션 처리 수 (counter, label: result)
pub const ACTIONS_TOTAL: &str = "bulwark_actions_total";

/// 실행 수 (counter, labels: domain, mode)
pub const RUNS_TOTAL: &str = "bulwark_runs_total";

/// 실행 소요 시간 (histogram, 초, label: domain)
pub const RUN_DURATION_SECONDS: &str = "bulwark_run_duration_seconds";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        FACTS_EVALUATED_TOTAL,
        "Total number of facts evaluated, by verdict before action"
    );
    describe_counter!(
        ACTIONS_TOTAL,
        "Total number of remediation actions, by result"
    );
    describe_counter!(RUNS_TOTAL, "Total number of reconciliation runs");
    describe_histogram!(
        RUN_DURATION_SECONDS,
        "Wall-clock duration of one reconciliation run in seconds"
    );
}
