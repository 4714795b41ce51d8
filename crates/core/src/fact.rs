//! 팩트 선언 -- 기대 상태 디스크립터, 프로브/액션 trait, 팩트 카탈로그
//!
//! 상태 드라이버는 [`Probe`]와 [`Action`]을 구현하고,
//! [`FactCatalog`]에 [`Fact`]를 선언 순서대로 등록합니다.
//!
//! # 구성
//! ```text
//! Fact ─┬─ Descriptor (id, section, expected, verification, severity)
//!       ├─ Box<dyn DynProbe>
//!       └─ Option<Box<dyn DynAction>>   (None = 감사 전용)
//! ```

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::{ActionError, CatalogError};
use crate::types::{ActionOutcome, Confidence, Expected, FactId, FactValue, ProbeOutcome, Severity};

/// `Send` 가능한 boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 액션 실행 후 판정 방식
///
/// 서비스 재시작처럼 재조회가 의미 없는 경우에는 `TrustAction`을 사용합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    /// 액션 후 다시 프로브하여 판정 (권위 있는 방식)
    #[default]
    Reprobe,
    /// 액션의 성공 신호를 신뢰
    TrustAction,
}

/// 기대 상태 디스크립터
///
/// 실행 동안 변경되지 않으며, 정적 설정으로부터 한 번 생성됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    /// 팩트 식별자
    pub id: FactId,
    /// 리포트 섹션 제목
    pub section: String,
    /// 기대 상태
    pub expected: Expected,
    /// 액션 후 판정 방식
    pub verification: Verification,
    /// 불일치 시 리포트 심각도
    pub severity: Severity,
}

impl Descriptor {
    /// 값이 같아야 하는 디스크립터를 생성합니다.
    pub fn equals(section: impl Into<String>, id: impl Into<FactId>, value: FactValue) -> Self {
        Self {
            id: id.into(),
            section: section.into(),
            expected: Expected::Equals(value),
            verification: Verification::Reprobe,
            severity: Severity::Fail,
        }
    }

    /// 존재하지 않아야 하는 디스크립터를 생성합니다.
    pub fn absent(section: impl Into<String>, id: impl Into<FactId>) -> Self {
        Self {
            id: id.into(),
            section: section.into(),
            expected: Expected::Absent,
            verification: Verification::Reprobe,
            severity: Severity::Fail,
        }
    }

    /// 액션 후 판정 방식을 지정합니다.
    pub fn verification(mut self, verification: Verification) -> Self {
        self.verification = verification;
        self
    }

    /// 불일치를 WARN으로 보고하도록 지정합니다.
    pub fn warn_only(mut self) -> Self {
        self.severity = Severity::Warn;
        self
    }
}

/// 읽기 전용 상태 조회 trait
///
/// 시스템 상태를 변경해서는 안 되며, 모든 조회 실패는
/// `ProbeOutcome::Error`로 변환해야 합니다 (panic 금지).
pub trait Probe: Send + Sync {
    /// 프로브 결과의 신뢰도
    fn confidence(&self) -> Confidence {
        Confidence::Authoritative
    }

    /// 현재 상태를 조회합니다.
    fn probe(&self) -> impl Future<Output = ProbeOutcome> + Send;
}

/// 멱등 변경 액션 trait
///
/// 이미 기대 상태인 시스템에서 실행되어도 안전해야 합니다.
/// 예상 가능한 실패(이미 존재함 등)는 `Ok(ActionOutcome { applied: false, .. })`로,
/// 예상치 못한 실패(권한, I/O)는 `Err`로 보고합니다.
pub trait Action: Send + Sync {
    /// dry-run 리포트에 표시할 설명
    fn describe(&self) -> String;

    /// 액션을 실행합니다.
    fn execute(
        &self,
        descriptor: &Descriptor,
    ) -> impl Future<Output = Result<ActionOutcome, ActionError>> + Send;
}

/// dyn-compatible 프로브 trait
///
/// `Probe`는 RPITIT를 사용하므로 `dyn Probe`가 불가합니다.
pub trait DynProbe: Send + Sync {
    /// 프로브 결과의 신뢰도
    fn confidence(&self) -> Confidence;

    /// 현재 상태를 조회합니다.
    fn probe(&self) -> BoxFuture<'_, ProbeOutcome>;
}

impl<T: Probe> DynProbe for T {
    fn confidence(&self) -> Confidence {
        Probe::confidence(self)
    }

    fn probe(&self) -> BoxFuture<'_, ProbeOutcome> {
        Box::pin(Probe::probe(self))
    }
}

/// dyn-compatible 액션 trait
pub trait DynAction: Send + Sync {
    /// dry-run 리포트에 표시할 설명
    fn describe(&self) -> String;

    /// 액션을 실행합니다.
    fn execute<'a>(
        &'a self,
        descriptor: &'a Descriptor,
    ) -> BoxFuture<'a, Result<ActionOutcome, ActionError>>;
}

impl<T: Action> DynAction for T {
    fn describe(&self) -> String {
        Action::describe(self)
    }

    fn execute<'a>(
        &'a self,
        descriptor: &'a Descriptor,
    ) -> BoxFuture<'a, Result<ActionOutcome, ActionError>> {
        Box::pin(Action::execute(self, descriptor))
    }
}

/// 디스크립터 + 프로브 + (선택) 액션 묶음
pub struct Fact {
    descriptor: Descriptor,
    probe: Box<dyn DynProbe>,
    action: Option<Box<dyn DynAction>>,
}

impl Fact {
    /// 교정 액션이 있는 팩트를 생성합니다.
    pub fn new(descriptor: Descriptor, probe: impl Probe + 'static, action: impl Action + 'static) -> Self {
        Self {
            descriptor,
            probe: Box::new(probe),
            action: Some(Box::new(action)),
        }
    }

    /// 감사 전용 팩트를 생성합니다 (자동 교정하지 않음).
    pub fn audit_only(descriptor: Descriptor, probe: impl Probe + 'static) -> Self {
        Self {
            descriptor,
            probe: Box::new(probe),
            action: None,
        }
    }

    /// 디스크립터를 반환합니다.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// 프로브를 반환합니다.
    pub fn probe(&self) -> &dyn DynProbe {
        self.probe.as_ref()
    }

    /// 액션을 반환합니다 (감사 전용이면 `None`).
    pub fn action(&self) -> Option<&dyn DynAction> {
        self.action.as_deref()
    }
}

impl std::fmt::Debug for Fact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fact")
            .field("descriptor", &self.descriptor)
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

/// 선언 순서를 보존하는 팩트 목록
///
/// 같은 식별자를 두 번 등록할 수 없습니다.
#[derive(Debug, Default)]
pub struct FactCatalog {
    facts: Vec<Fact>,
}

impl FactCatalog {
    /// 빈 카탈로그를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 팩트를 등록합니다.
    pub fn register(&mut self, fact: Fact) -> Result<(), CatalogError> {
        let id = &fact.descriptor.id;
        if id.as_str().trim().is_empty() {
            return Err(CatalogError::EmptyIdentifier);
        }
        if self.facts.iter().any(|f| &f.descriptor.id == id) {
            return Err(CatalogError::DuplicateFact { id: id.to_string() });
        }
        self.facts.push(fact);
        Ok(())
    }

    /// 다른 카탈로그의 팩트를 이어 붙입니다.
    pub fn extend(&mut self, other: FactCatalog) -> Result<(), CatalogError> {
        for fact in other.facts {
            self.register(fact)?;
        }
        Ok(())
    }

    /// 등록된 팩트 수
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// 선언 순서대로 팩트를 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = &Fact> {
        self.facts.iter()
    }

    /// 식별자로 팩트를 조회합니다.
    pub fn get(&self, id: &str) -> Option<&Fact> {
        self.facts.iter().find(|f| f.descriptor.id.as_str() == id)
    }
}
