//! 조정기 -- 팩트마다 프로브 → 평가 → (선택) 액션 → 기록을 수행합니다.
//!
//! # 팩트 단위 상태 전이
//! ```text
//! Pending → Evaluated ─┬─ Skipped ──────────────────┐
//!                      └─ Acting → Reevaluated ─────┴→ Recorded
//! ```
//!
//! - `Unknown` 판정은 어떤 모드에서도 액션으로 이어지지 않습니다.
//! - 액션이 없는 팩트의 불일치는 감사 전용 발견으로 기록됩니다.
//! - 액션 실패는 해당 팩트만 FAIL로 기록하고 다음 팩트를 계속 처리합니다.
//!
//! 팩트는 선언 순서대로 하나씩 처리되며 동시에 실행되지 않습니다.

use std::time::Instant;

use chrono::Utc;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::context::RunContext;
use crate::error::ReportError;
use crate::evaluate::evaluate;
use crate::fact::{DynAction, Fact, FactCatalog, Verification};
use crate::metrics as m;
use crate::mode::RunMode;
use crate::report::ReportSink;
use crate::types::{ActionRecord, FactRecord, Verdict};

/// 한 도메인의 팩트 카탈로그를 조정합니다.
pub struct Reconciler<'a> {
    ctx: &'a RunContext,
    domain: &'a str,
}

impl<'a> Reconciler<'a> {
    /// 새 조정기를 생성합니다.
    pub fn new(ctx: &'a RunContext, domain: &'a str) -> Self {
        Self { ctx, domain }
    }

    /// 카탈로그의 모든 팩트를 순서대로 처리하여 싱크에 기록합니다.
    ///
    /// 팩트 단위 실패(프로브/액션)는 기록될 뿐 전파되지 않습니다.
    /// 리포트 쓰기 실패만 에러로 반환됩니다.
    pub async fn run(&self, catalog: &FactCatalog, sink: &mut ReportSink) -> Result<(), ReportError> {
        let span = info_span!(
            "reconcile",
            run_id = %self.ctx.run_id,
            domain = self.domain,
            mode = %self.ctx.mode,
        );

        async {
            let started = Instant::now();
            info!(facts = catalog.len(), "reconciliation started");

            for fact in catalog.iter() {
                let record = self.reconcile_fact(fact).await;
                sink.record(record)?;
            }

            metrics::counter!(
                m::RUNS_TOTAL,
                m::LABEL_DOMAIN => self.domain.to_owned(),
                m::LABEL_MODE => self.ctx.mode.as_str()
            )
            .increment(1);
            metrics::histogram!(m::RUN_DURATION_SECONDS, m::LABEL_DOMAIN => self.domain.to_owned())
                .record(started.elapsed().as_secs_f64());

            let summary = sink.summary();
            info!(
                passed = summary.passed,
                failed = summary.failed,
                warnings = summary.warnings,
                applied = summary.applied,
                "reconciliation finished"
            );
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// 팩트 하나를 처리합니다.
    pub async fn reconcile_fact(&self, fact: &Fact) -> FactRecord {
        let descriptor = fact.descriptor();
        let probe = fact.probe();

        let outcome = probe.probe().await;
        let verdict_before = evaluate(descriptor, &outcome);
        metrics::counter!(m::FACTS_EVALUATED_TOTAL, m::LABEL_VERDICT => verdict_before.label())
            .increment(1);
        debug!(fact = %descriptor.id, verdict = verdict_before.label(), "fact evaluated");

        let (action, verdict_after) = match (&verdict_before, fact.action()) {
            (Verdict::NonCompliant { .. }, Some(action)) => match self.ctx.mode {
                RunMode::Apply => self.act(fact, action, &verdict_before).await,
                RunMode::DryRun => {
                    let description = action.describe();
                    info!(fact = %descriptor.id, action = %description, "would apply");
                    metrics::counter!(m::ACTIONS_TOTAL, m::LABEL_RESULT => "would_apply")
                        .increment(1);
                    (ActionRecord::WouldApply { description }, None)
                }
                RunMode::Check => (ActionRecord::NotAttempted, None),
            },
            (Verdict::NonCompliant { .. }, None) => {
                warn!(fact = %descriptor.id, "non-compliant audit-only fact, manual remediation required");
                (ActionRecord::NotAttempted, None)
            }
            (Verdict::Unknown { cause }, _) => {
                warn!(fact = %descriptor.id, cause = %cause, "probe failed, fact skipped");
                (ActionRecord::NotAttempted, None)
            }
            (Verdict::Compliant, _) => (ActionRecord::NotAttempted, None),
        };

        FactRecord {
            id: descriptor.id.clone(),
            section: descriptor.section.clone(),
            verdict_before,
            action,
            verdict_after,
            severity: descriptor.severity,
            confidence: probe.confidence(),
            audit_only: fact.action().is_none(),
            recorded_at: Utc::now(),
        }
    }

    async fn act(
        &self,
        fact: &Fact,
        action: &dyn DynAction,
        verdict_before: &Verdict,
    ) -> (ActionRecord, Option<Verdict>) {
        let descriptor = fact.descriptor();
        info!(fact = %descriptor.id, action = %action.describe(), "applying action");

        let result = action.execute(descriptor).await;
        let trusted = match (&result, descriptor.verification) {
            (_, Verification::Reprobe) => None,
            (Ok(outcome), Verification::TrustAction) if outcome.applied => Some(Verdict::Compliant),
            (_, Verification::TrustAction) => Some(verdict_before.clone()),
        };
        let verdict_after = match trusted {
            Some(verdict) => verdict,
            None => evaluate(descriptor, &fact.probe().probe().await),
        };

        let record = match result {
            Ok(outcome) => {
                let label = if outcome.applied { "applied" } else { "unchanged" };
                metrics::counter!(m::ACTIONS_TOTAL, m::LABEL_RESULT => label).increment(1);
                info!(
                    fact = %descriptor.id,
                    applied = outcome.applied,
                    detail = %outcome.detail,
                    verdict_after = verdict_after.label(),
                    "action completed"
                );
                ActionRecord::Applied { outcome }
            }
            Err(e) => {
                metrics::counter!(m::ACTIONS_TOTAL, m::LABEL_RESULT => "failed").increment(1);
                warn!(fact = %descriptor.id, error = %e, "action failed, continuing with remaining facts");
                ActionRecord::Failed {
                    error: e.to_string(),
                }
            }
        };
        (record, Some(verdict_after))
    }
}
