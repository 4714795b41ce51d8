//! 도메인 타입 -- 팩트, 기대값, 프로브 결과, 판정, 기록
//!
//! 모든 상태 드라이버(호스트, Docker 데몬, 네트워크, 폴더)가 공유하는
//! 데이터 구조를 정의합니다.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProbeError;

/// 팩트 식별자
///
/// 하나의 관리 대상 속성을 가리키는 사람이 읽을 수 있는 이름입니다
/// (예: `"Firewall enabled"`). 한 번의 실행 안에서 유일해야 합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactId(String);

impl FactId {
    /// 새 식별자를 생성합니다.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 문자열 참조를 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FactId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for FactId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// 팩트 값
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FactValue {
    /// 참/거짓
    Bool(bool),
    /// 정수
    Integer(i64),
    /// 문자열
    Text(String),
    /// 순서 없는 문자열 집합 (위반 목록 등)
    List(Vec<String>),
    /// 구조화된 키-값 집합 (daemon.json 등)
    Structured(serde_json::Map<String, serde_json::Value>),
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
            Self::Structured(map) => {
                let json = serde_json::Value::Object(map.clone());
                write!(f, "{json}")
            }
        }
    }
}

/// 기대 상태
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Expected {
    /// 해당 값과 같아야 함
    Equals(FactValue),
    /// 존재하지 않아야 함
    Absent,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals(v) => write!(f, "{v}"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

/// 관측된 실제 상태
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Observed {
    /// 값이 존재함
    Present(FactValue),
    /// 존재하지 않음
    Absent,
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present(v) => write!(f, "{v}"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

/// 프로브 결과
///
/// 평가할 때마다 새로 생성되며 저장되지 않습니다.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// 값이 존재함
    Present(FactValue),
    /// 존재하지 않음
    Absent,
    /// 조회 실패
    Error(ProbeError),
}

impl ProbeOutcome {
    /// `Option`을 Present/Absent로 변환합니다.
    pub fn from_option(value: Option<FactValue>) -> Self {
        match value {
            Some(v) => Self::Present(v),
            None => Self::Absent,
        }
    }

    /// 위반 목록을 "비어 있으면 Absent" 규칙으로 변환합니다.
    pub fn from_findings(findings: Vec<String>) -> Self {
        if findings.is_empty() {
            Self::Absent
        } else {
            Self::Present(FactValue::List(findings))
        }
    }
}

impl From<Result<Option<FactValue>, ProbeError>> for ProbeOutcome {
    fn from(result: Result<Option<FactValue>, ProbeError>) -> Self {
        match result {
            Ok(value) => Self::from_option(value),
            Err(e) => Self::Error(e),
        }
    }
}

/// 프로브 신뢰도
///
/// 구조화된 출력에서 파싱한 결과는 `Authoritative`,
/// 사람이 읽는 텍스트를 추정 파싱한 결과는 `Heuristic`입니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// 구조화된 조회 결과
    #[default]
    Authoritative,
    /// 텍스트 추정 결과
    Heuristic,
}

/// 판정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// 기대 상태와 일치
    Compliant,
    /// 기대 상태와 불일치
    NonCompliant {
        /// 실제 상태
        actual: Observed,
        /// 기대 상태
        expected: Expected,
    },
    /// 프로브 실패로 판단 불가
    Unknown {
        /// 실패 원인
        cause: String,
    },
}

impl Verdict {
    /// 기대 상태와 일치하는지 여부
    pub fn is_compliant(&self) -> bool {
        matches!(self, Self::Compliant)
    }

    /// 기대 상태와 불일치하는지 여부
    pub fn is_non_compliant(&self) -> bool {
        matches!(self, Self::NonCompliant { .. })
    }

    /// 메트릭 레이블용 고정 이름
    pub fn label(&self) -> &'static str {
        match self {
            Self::Compliant => "compliant",
            Self::NonCompliant { .. } => "non_compliant",
            Self::Unknown { .. } => "unknown",
        }
    }
}

/// 불일치 시 리포트에 표시할 심각도
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// 규정 위반 (FAIL)
    #[default]
    Fail,
    /// 주의 필요 (WARN)
    Warn,
}

/// 리포트 상태 태그
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Fail,
    Warn,
    Info,
    Ok,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Ok => "OK",
        };
        f.write_str(s)
    }
}

/// 액션 실행 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// 실제로 변경이 일어났는지 여부
    pub applied: bool,
    /// 사람이 읽을 수 있는 설명
    pub detail: String,
}

impl ActionOutcome {
    /// 변경이 적용된 결과
    pub fn applied(detail: impl Into<String>) -> Self {
        Self {
            applied: true,
            detail: detail.into(),
        }
    }

    /// 변경이 필요 없었거나 수행하지 않은 결과
    pub fn unchanged(detail: impl Into<String>) -> Self {
        Self {
            applied: false,
            detail: detail.into(),
        }
    }
}

/// 팩트에 대해 수행된(또는 수행될) 액션 기록
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionRecord {
    /// 액션을 시도하지 않음
    NotAttempted,
    /// dry-run: 실행했을 액션 설명
    WouldApply { description: String },
    /// 액션 실행 완료
    Applied { outcome: ActionOutcome },
    /// 액션 실행 실패
    Failed { error: String },
}

/// 팩트 하나의 평가 기록
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRecord {
    /// 팩트 식별자
    pub id: FactId,
    /// 리포트 섹션 제목
    pub section: String,
    /// 액션 전 판정
    pub verdict_before: Verdict,
    /// 액션 기록
    pub action: ActionRecord,
    /// 액션 후 판정 (액션을 시도한 경우에만)
    pub verdict_after: Option<Verdict>,
    /// 불일치 시 심각도
    pub severity: Severity,
    /// 프로브 신뢰도
    pub confidence: Confidence,
    /// 자동 교정 액션이 없는 감사 전용 팩트 여부
    pub audit_only: bool,
    /// 기록 시각
    pub recorded_at: DateTime<Utc>,
}

impl FactRecord {
    /// 변경 액션을 실제로 시도했는지 여부
    pub fn action_taken(&self) -> bool {
        matches!(
            self.action,
            ActionRecord::Applied { .. } | ActionRecord::Failed { .. }
        )
    }

    /// 최종 판정 (액션 후 판정이 있으면 그것, 없으면 액션 전 판정)
    pub fn final_verdict(&self) -> &Verdict {
        self.verdict_after.as_ref().unwrap_or(&self.verdict_before)
    }

    /// 리포트 상태 태그를 계산합니다.
    pub fn status(&self) -> Status {
        if matches!(self.action, ActionRecord::Failed { .. }) {
            return Status::Fail;
        }
        match self.final_verdict() {
            Verdict::Compliant => Status::Pass,
            Verdict::NonCompliant { .. } => match self.severity {
                Severity::Fail => Status::Fail,
                Severity::Warn => Status::Warn,
            },
            Verdict::Unknown { .. } => Status::Warn,
        }
    }
}
