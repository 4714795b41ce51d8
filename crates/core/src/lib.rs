//! # bulwark-core
//!
//! 선언적 규정 준수 조정(reconciliation) 엔진입니다.
//!
//! 도메인 드라이버가 [`Fact`]를 선언하면, [`Reconciler`]가 각 팩트의
//! 실제 상태를 프로브하고, 기대 상태와 비교하고, 모드에 따라 교정 액션을
//! 실행한 뒤, [`ReportSink`]에 결과를 기록합니다.
//!
//! ```text
//! RunMode → Reconciler ─┬→ Probe → evaluate() → Verdict
//!                       ├→ (Apply + NonCompliant) Action → re-evaluate
//!                       └→ ReportSink (file + interactive stream)
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod evaluate;
pub mod fact;
pub mod metrics;
pub mod mode;
pub mod reconciler;
pub mod report;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{
    ActionError, BulwarkError, CatalogError, ConfigError, PrivilegeError, ProbeError, ReportError,
    UsageError,
};

// 설정
pub use config::BulwarkConfig;

// 실행
pub use context::RunContext;
pub use mode::RunMode;
pub use reconciler::Reconciler;
pub use report::{Report, ReportSink, Summary, TagStyle};

// 팩트 모델
pub use evaluate::evaluate;
pub use fact::{Action, Descriptor, DynAction, DynProbe, Fact, FactCatalog, Probe, Verification};
pub use types::{
    ActionOutcome, ActionRecord, Confidence, Expected, FactId, FactRecord, FactValue, Observed,
    ProbeOutcome, Severity, Status, Verdict,
};
