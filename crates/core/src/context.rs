//! 실행 컨텍스트 -- 실행마다 한 번 생성되어 모든 구성 요소에 전달됩니다.
//!
//! 전역 상태 대신 실행 식별자, 모드, 시작 시각, 유효 UID를
//! 명시적으로 들고 다닙니다.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::PrivilegeError;
use crate::mode::RunMode;

/// 한 번의 실행에 대한 컨텍스트
#[derive(Debug, Clone, Serialize)]
pub struct RunContext {
    /// 실행 식별자
    pub run_id: Uuid,
    /// 실행 모드
    pub mode: RunMode,
    /// 시작 시각
    pub started_at: DateTime<Utc>,
    /// 유효 UID (비 unix 플랫폼에서는 `None`)
    pub effective_uid: Option<u32>,
}

impl RunContext {
    /// 현재 프로세스 정보로 컨텍스트를 생성합니다.
    pub fn new(mode: RunMode) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode,
            started_at: Utc::now(),
            effective_uid: current_euid(),
        }
    }

    /// 유효 UID를 지정하여 컨텍스트를 생성합니다 (테스트용).
    pub fn with_uid(mode: RunMode, effective_uid: Option<u32>) -> Self {
        Self {
            effective_uid,
            ..Self::new(mode)
        }
    }

    /// root로 실행 중인지 여부
    pub fn is_root(&self) -> bool {
        self.effective_uid == Some(0)
    }

    /// 권한 선행 조건을 확인합니다.
    ///
    /// 시스템을 변경하는 모드(apply)는 root가 필요하고, check/dry-run은
    /// 권한 없이 실행됩니다. 어떤 팩트도 평가하기 전에 호출해야 합니다.
    pub fn require_privilege(&self, domain: &str) -> Result<(), PrivilegeError> {
        if self.mode.mutates() && !self.is_root() {
            return Err(PrivilegeError {
                domain: domain.to_owned(),
                mode: self.mode.to_string(),
                uid: self
                    .effective_uid
                    .map_or_else(|| "unknown".to_owned(), |uid| uid.to_string()),
            });
        }
        Ok(())
    }
}

#[cfg(unix)]
fn current_euid() -> Option<u32> {
    // SAFETY: geteuid는 항상 성공하며 부작용이 없습니다.
    Some(unsafe { libc::geteuid() })
}

#[cfg(not(unix))]
fn current_euid() -> Option<u32> {
    None
}
