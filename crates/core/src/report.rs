//! 리포트 싱크 -- 팩트 기록을 순서대로 파일과 대화형 스트림에 기록합니다.
//!
//! 파일은 싱크 생성 시 잘라내고(truncate) 헤더를 기록하며,
//! 이후 섹션/기록마다 즉시 쓰고 flush 합니다. 실행 도중 중단되어도
//! 그때까지 처리된 팩트에 대해서는 유효한 리포트가 남습니다.
//!
//! # 형식
//! ```text
//! Docker Host Compliance Report - 2026-10-18 12:00:00
//! [INFO] Mode: apply
//!
//! === ACCOUNTS ===
//! [PASS] Docker group exists
//! [FAIL] Firewall enabled
//! [INFO]   actual: false, expected: true
//!
//! === SUMMARY ===
//! [INFO] 9 passed, 1 failed, 1 warnings, 1 actions applied
//! ```

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::context::RunContext;
use crate::error::ReportError;
use crate::evaluate::structured_mismatches;
use crate::mode::RunMode;
use crate::types::{ActionRecord, Confidence, FactRecord, Status, Verdict};

/// 대화형 스트림에서 상태 태그를 꾸미는 방식
///
/// 파일에는 항상 꾸미지 않은 태그가 기록됩니다.
pub trait TagStyle: Send {
    /// `[STATUS]` 태그를 출력용 문자열로 변환합니다.
    fn paint(&self, status: Status, tag: &str) -> String;
}

/// 꾸미지 않은 태그
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTags;

impl TagStyle for PlainTags {
    fn paint(&self, _status: Status, tag: &str) -> String {
        tag.to_owned()
    }
}

/// 리포트 한 줄
#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    /// 헤더, 빈 줄, 섹션 제목
    Raw(String),
    /// `[STATUS] text`
    Tagged { status: Status, text: String },
}

impl Line {
    fn plain(&self) -> String {
        match self {
            Self::Raw(s) => s.clone(),
            Self::Tagged { status, text } => format!("[{status}] {text}"),
        }
    }

    fn styled(&self, style: &dyn TagStyle) -> String {
        match self {
            Self::Raw(s) => s.clone(),
            Self::Tagged { status, text } => {
                let tag = format!("[{status}]");
                format!("{} {text}", style.paint(*status, &tag))
            }
        }
    }
}

/// 상태별 집계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// PASS 수
    pub passed: usize,
    /// FAIL 수
    pub failed: usize,
    /// WARN 수
    pub warnings: usize,
    /// 실제로 적용된 액션 수
    pub applied: usize,
}

impl Summary {
    fn count(&mut self, record: &FactRecord) {
        match record.status() {
            Status::Pass => self.passed += 1,
            Status::Fail => self.failed += 1,
            Status::Warn => self.warnings += 1,
            Status::Info | Status::Ok => {}
        }
        if matches!(&record.action, ActionRecord::Applied { outcome } if outcome.applied) {
            self.applied += 1;
        }
    }
}

/// 완료된 실행의 리포트
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// 도메인 제목
    pub title: String,
    /// 실행 식별자
    pub run_id: Uuid,
    /// 실행 모드
    pub mode: RunMode,
    /// 시작 시각
    pub started_at: DateTime<Utc>,
    /// 리포트 파일 경로 (메모리 싱크이면 `None`)
    pub path: Option<PathBuf>,
    /// 선언 순서대로의 팩트 기록
    pub records: Vec<FactRecord>,
    /// 집계
    pub summary: Summary,
    #[serde(skip)]
    text: String,
}

impl Report {
    /// 파일에 기록된 것과 같은 텍스트를 반환합니다.
    pub fn render(&self) -> &str {
        &self.text
    }

    /// FAIL 판정이 하나라도 있는지 여부
    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }
}

/// 리포트 싱크
pub struct ReportSink {
    title: String,
    run_id: Uuid,
    mode: RunMode,
    started_at: DateTime<Utc>,
    path: Option<PathBuf>,
    file: Option<File>,
    stream: Box<dyn Write + Send>,
    style: Box<dyn TagStyle>,
    lines: Vec<Line>,
    records: Vec<FactRecord>,
    current_section: Option<String>,
    summary: Summary,
}

impl ReportSink {
    /// 리포트 파일을 잘라내고 헤더를 기록합니다.
    ///
    /// 같은 경로에 대한 이전 실행의 내용은 남지 않습니다.
    pub fn create(
        path: impl AsRef<Path>,
        title: impl Into<String>,
        ctx: &RunContext,
        stream: Box<dyn Write + Send>,
        style: Box<dyn TagStyle>,
    ) -> Result<Self, ReportError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| ReportError::Open {
                path: path.display().to_string(),
                source,
            })?;
        let mut sink = Self::build(
            title.into(),
            ctx,
            Some(path.to_path_buf()),
            Some(file),
            stream,
            style,
        );
        sink.write_header()?;
        Ok(sink)
    }

    /// 파일 없이 메모리에만 기록하는 싱크를 생성합니다.
    pub fn in_memory(title: impl Into<String>, ctx: &RunContext) -> Self {
        let mut sink = Self::build(
            title.into(),
            ctx,
            None,
            None,
            Box::new(std::io::sink()),
            Box::new(PlainTags),
        );
        // 파일이 없으면 쓰기 실패가 발생하지 않음
        let _ = sink.write_header();
        sink
    }

    fn build(
        title: String,
        ctx: &RunContext,
        path: Option<PathBuf>,
        file: Option<File>,
        stream: Box<dyn Write + Send>,
        style: Box<dyn TagStyle>,
    ) -> Self {
        Self {
            title,
            run_id: ctx.run_id,
            mode: ctx.mode,
            started_at: ctx.started_at,
            path,
            file,
            stream,
            style,
            lines: Vec::new(),
            records: Vec::new(),
            current_section: None,
            summary: Summary::default(),
        }
    }

    fn write_header(&mut self) -> Result<(), ReportError> {
        let stamp = self
            .started_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S");
        let header = format!("{} Compliance Report - {stamp}", self.title);
        self.emit(vec![
            Line::Raw(header),
            Line::Tagged {
                status: Status::Info,
                text: format!("Mode: {}", self.mode),
            },
        ])
    }

    /// 섹션 제목을 기록합니다.
    ///
    /// 직전 섹션과 같으면 아무것도 기록하지 않습니다.
    pub fn section(&mut self, title: &str) -> Result<(), ReportError> {
        if self.current_section.as_deref() == Some(title) {
            return Ok(());
        }
        self.current_section = Some(title.to_owned());
        self.emit(vec![
            Line::Raw(String::new()),
            Line::Raw(format!("=== {title} ===")),
        ])
    }

    /// 팩트 기록을 추가합니다.
    pub fn record(&mut self, record: FactRecord) -> Result<(), ReportError> {
        self.section(&record.section.clone())?;
        let lines = record_lines(&record);
        self.summary.count(&record);
        self.records.push(record);
        self.emit(lines)
    }

    /// 지금까지 기록된 내용을 파일과 같은 텍스트로 렌더링합니다.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.plain());
            out.push('\n');
        }
        out
    }

    /// 지금까지의 기록 수
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 기록이 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 현재 집계
    pub fn summary(&self) -> Summary {
        self.summary
    }

    /// 요약을 기록하고 리포트를 완성합니다.
    pub fn finish(mut self) -> Result<Report, ReportError> {
        let s = self.summary;
        self.emit(vec![
            Line::Raw(String::new()),
            Line::Raw("=== SUMMARY ===".to_owned()),
            Line::Tagged {
                status: Status::Info,
                text: format!(
                    "{} passed, {} failed, {} warnings, {} actions applied",
                    s.passed, s.failed, s.warnings, s.applied
                ),
            },
        ])?;
        let text = self.render();
        Ok(Report {
            text,
            title: self.title,
            run_id: self.run_id,
            mode: self.mode,
            started_at: self.started_at,
            path: self.path,
            records: self.records,
            summary: self.summary,
        })
    }

    fn emit(&mut self, lines: Vec<Line>) -> Result<(), ReportError> {
        for line in lines {
            if let Some(file) = self.file.as_mut() {
                writeln!(file, "{}", line.plain())?;
            }
            if let Err(e) = writeln!(self.stream, "{}", line.styled(self.style.as_ref())) {
                tracing::debug!(error = %e, "interactive stream write failed");
            }
            self.lines.push(line);
        }
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        let _ = self.stream.flush();
        Ok(())
    }
}

impl std::fmt::Debug for ReportSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportSink")
            .field("title", &self.title)
            .field("path", &self.path)
            .field("records", &self.records.len())
            .finish()
    }
}

/// 팩트 기록 하나를 리포트 줄로 변환합니다.
fn record_lines(record: &FactRecord) -> Vec<Line> {
    let mut text = record.id.to_string();
    if record.confidence == Confidence::Heuristic {
        text.push_str(" (heuristic)");
    }
    let mut lines = vec![Line::Tagged {
        status: record.status(),
        text,
    }];
    let info = |text: String| Line::Tagged {
        status: Status::Info,
        text,
    };

    match &record.verdict_before {
        Verdict::Compliant => {}
        Verdict::Unknown { cause } => lines.push(info(format!("  unknown: {cause}"))),
        Verdict::NonCompliant { actual, expected } => {
            let mismatches = structured_mismatches(expected, actual);
            if mismatches.is_empty() {
                lines.push(info(format!("  actual: {actual}, expected: {expected}")));
            } else {
                for m in mismatches {
                    let current = m
                        .actual
                        .map_or_else(|| "missing".to_owned(), |v| v.to_string());
                    lines.push(info(format!(
                        "  {}: actual: {current}, expected: {}",
                        m.key, m.expected
                    )));
                }
            }
            if record.audit_only {
                lines.push(info("  audit only: manual remediation required".to_owned()));
            }
        }
    }

    match &record.action {
        ActionRecord::NotAttempted => {}
        ActionRecord::WouldApply { description } => {
            lines.push(info(format!("  would apply: {description}")));
        }
        ActionRecord::Applied { outcome } if outcome.applied => lines.push(Line::Tagged {
            status: Status::Ok,
            text: format!("  applied: {}", outcome.detail),
        }),
        ActionRecord::Applied { outcome } => {
            lines.push(info(format!("  not applied: {}", outcome.detail)));
        }
        ActionRecord::Failed { error } => lines.push(Line::Tagged {
            status: Status::Fail,
            text: format!("  action failed: {error}"),
        }),
    }

    if record.action_taken() {
        if let Some(after) = record.verdict_after.as_ref().filter(|v| !v.is_compliant()) {
            lines.push(info(format!("  after action: {}", verdict_text(after))));
        }
    }
    lines
}

fn verdict_text(verdict: &Verdict) -> String {
    match verdict {
        Verdict::Compliant => "compliant".to_owned(),
        Verdict::NonCompliant { actual, .. } => format!("still non-compliant (actual: {actual})"),
        Verdict::Unknown { cause } => format!("unknown ({cause})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActionOutcome, Expected, FactId, FactValue, Observed, Severity};

    fn ctx() -> RunContext {
        RunContext::with_uid(RunMode::Check, Some(0))
    }

    fn record(id: &str, section: &str, verdict: Verdict, action: ActionRecord) -> FactRecord {
        FactRecord {
            id: FactId::from(id),
            section: section.to_owned(),
            verdict_before: verdict,
            action,
            verdict_after: None,
            severity: Severity::Fail,
            confidence: Confidence::Authoritative,
            audit_only: false,
            recorded_at: Utc::now(),
        }
    }

    fn firewall_off() -> Verdict {
        Verdict::NonCompliant {
            actual: Observed::Present(FactValue::Bool(false)),
            expected: Expected::Equals(FactValue::Bool(true)),
        }
    }

    #[test]
    fn header_and_sections() {
        let mut sink = ReportSink::in_memory("Docker Host", &ctx());
        sink.record(record("a", "ACCOUNTS", Verdict::Compliant, ActionRecord::NotAttempted))
            .unwrap();
        sink.record(record("b", "ACCOUNTS", Verdict::Compliant, ActionRecord::NotAttempted))
            .unwrap();
        sink.record(record("c", "HOST SECURITY", Verdict::Compliant, ActionRecord::NotAttempted))
            .unwrap();
        let text = sink.render();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("Docker Host Compliance Report - "));
        assert_eq!(lines[1], "[INFO] Mode: check");
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "=== ACCOUNTS ===");
        assert_eq!(lines[4], "[PASS] a");
        assert_eq!(lines[5], "[PASS] b");
        assert_eq!(lines[7], "=== HOST SECURITY ===");
        assert_eq!(text.matches("=== ACCOUNTS ===").count(), 1);
    }

    #[test]
    fn non_compliant_detail_and_would_apply() {
        let mut sink = ReportSink::in_memory("Docker Host", &ctx());
        sink.record(record(
            "Firewall enabled",
            "HOST SECURITY",
            firewall_off(),
            ActionRecord::WouldApply {
                description: "ufw --force enable".to_owned(),
            },
        ))
        .unwrap();
        let text = sink.render();
        assert!(text.contains("[FAIL] Firewall enabled\n"));
        assert!(text.contains("[INFO]   actual: false, expected: true\n"));
        assert!(text.contains("[INFO]   would apply: ufw --force enable\n"));
    }

    #[test]
    fn applied_action_is_ok_line() {
        let mut sink = ReportSink::in_memory("Docker Host", &ctx());
        let mut r = record(
            "Firewall enabled",
            "HOST SECURITY",
            firewall_off(),
            ActionRecord::Applied {
                outcome: ActionOutcome::applied("enabled ufw"),
            },
        );
        r.verdict_after = Some(Verdict::Compliant);
        sink.record(r).unwrap();
        let text = sink.render();
        assert!(text.contains("[PASS] Firewall enabled\n"));
        assert!(text.contains("[OK]   applied: enabled ufw\n"));
        assert_eq!(sink.summary().applied, 1);
    }

    #[test]
    fn structured_mismatch_lists_keys() {
        let mut want = serde_json::Map::new();
        want.insert("icc".to_owned(), serde_json::json!(false));
        want.insert("live-restore".to_owned(), serde_json::json!(true));
        let mut have = serde_json::Map::new();
        have.insert("icc".to_owned(), serde_json::json!(true));
        have.insert("live-restore".to_owned(), serde_json::json!(true));
        let verdict = Verdict::NonCompliant {
            actual: Observed::Present(FactValue::Structured(have)),
            expected: Expected::Equals(FactValue::Structured(want)),
        };
        let mut sink = ReportSink::in_memory("Docker Daemon", &ctx());
        sink.record(record(
            "Docker daemon configuration",
            "DAEMON CONFIGURATION",
            verdict,
            ActionRecord::NotAttempted,
        ))
        .unwrap();
        let text = sink.render();
        assert!(text.contains("[INFO]   icc: actual: true, expected: false\n"));
        assert!(!text.contains("live-restore:"));
    }

    #[test]
    fn heuristic_and_audit_only_annotations() {
        let mut r = record(
            "Privileged containers",
            "RUNNING CONTAINER AUDIT",
            Verdict::NonCompliant {
                actual: Observed::Present(FactValue::List(vec!["web".to_owned()])),
                expected: Expected::Absent,
            },
            ActionRecord::NotAttempted,
        );
        r.confidence = Confidence::Heuristic;
        r.audit_only = true;
        let mut sink = ReportSink::in_memory("Docker Daemon", &ctx());
        sink.record(r).unwrap();
        let text = sink.render();
        assert!(text.contains("[FAIL] Privileged containers (heuristic)\n"));
        assert!(text.contains("[INFO]   actual: [web], expected: absent\n"));
        assert!(text.contains("audit only"));
    }

    #[test]
    fn summary_counts_statuses() {
        let mut sink = ReportSink::in_memory("Docker Host", &ctx());
        sink.record(record("a", "S", Verdict::Compliant, ActionRecord::NotAttempted))
            .unwrap();
        sink.record(record("b", "S", firewall_off(), ActionRecord::NotAttempted))
            .unwrap();
        sink.record(record(
            "c",
            "S",
            Verdict::Unknown {
                cause: "ufw missing".to_owned(),
            },
            ActionRecord::NotAttempted,
        ))
        .unwrap();
        let report = sink.finish().unwrap();
        assert_eq!(
            report.summary,
            Summary {
                passed: 1,
                failed: 1,
                warnings: 1,
                applied: 0
            }
        );
        assert!(report.has_failures());
        assert_eq!(report.records.len(), 3);
    }

    #[test]
    fn file_matches_render_and_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, "stale content from a previous run\n").unwrap();

        let mut sink = ReportSink::create(
            &path,
            "Docker Host",
            &ctx(),
            Box::new(std::io::sink()),
            Box::new(PlainTags),
        )
        .unwrap();
        sink.record(record("a", "S", Verdict::Compliant, ActionRecord::NotAttempted))
            .unwrap();

        // 기록 직후 파일에 반영되어 있어야 함
        let partial = std::fs::read_to_string(&path).unwrap();
        assert_eq!(partial, sink.render());
        assert!(!partial.contains("stale"));

        let rendered_before_finish = sink.render();
        let report = sink.finish().unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(&rendered_before_finish));
        assert!(content.ends_with("[INFO] 1 passed, 0 failed, 0 warnings, 0 actions applied\n"));
        assert_eq!(content, report.render());
        assert_eq!(report.path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn create_fails_for_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("report.txt");
        let err = ReportSink::create(
            &path,
            "Docker Host",
            &ctx(),
            Box::new(std::io::sink()),
            Box::new(PlainTags),
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::Open { .. }));
    }

    struct Brackets;

    impl TagStyle for Brackets {
        fn paint(&self, _status: Status, tag: &str) -> String {
            format!("<{tag}>")
        }
    }

    #[test]
    fn stream_is_styled_but_render_is_plain() {
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Shared(Arc<Mutex<Vec<u8>>>);

        impl Write for Shared {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let shared = Shared::default();
        let mut sink = ReportSink::create(
            dir.path().join("r.txt"),
            "Docker Host",
            &ctx(),
            Box::new(shared.clone()),
            Box::new(Brackets),
        )
        .unwrap();
        sink.record(record("a", "S", Verdict::Compliant, ActionRecord::NotAttempted))
            .unwrap();
        let streamed = String::from_utf8(shared.0.lock().unwrap().clone()).unwrap();
        assert!(streamed.contains("<[PASS]> a\n"));
        assert!(sink.render().contains("[PASS] a\n"));
    }
}
