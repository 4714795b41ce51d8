//! Docker 드라이버 에러 타입
//!
//! [`DockerGuardError`]는 Docker API 호출, daemon.json 조작, 재시작 명령
//! 실패를 표현합니다. 프로브/액션 경계에서 [`ProbeError`] / [`ActionError`]로
//! 변환되어 팩트 하나의 결과로만 기록됩니다.

use bulwark_core::error::{ActionError, ProbeError};
use bulwark_host::HostGuardError;

/// Docker 드라이버 도메인 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DockerGuardError {
    /// Docker API 호출 실패
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// Docker 소켓 연결 실패
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// daemon.json 내용 해석 실패
    #[error("invalid daemon config '{path}': {reason}")]
    DaemonConfig {
        /// 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 파일 접근 권한 없음
    #[error("permission denied: {path}")]
    PermissionDenied {
        /// 대상 경로
        path: String,
    },

    /// 그 외 파일 I/O 실패
    #[error("io error on '{path}': {reason}")]
    Io {
        /// 대상 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 외부 명령(데몬 재시작) 실패
    #[error(transparent)]
    Command(#[from] HostGuardError),
}

impl DockerGuardError {
    /// `std::io::Error`를 경로 정보와 함께 변환합니다.
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            Self::PermissionDenied { path }
        } else {
            Self::Io {
                path,
                reason: err.to_string(),
            }
        }
    }
}

impl From<DockerGuardError> for ProbeError {
    fn from(err: DockerGuardError) -> Self {
        match err {
            DockerGuardError::DockerApi(_) | DockerGuardError::DockerConnection(_) => {
                ProbeError::Backend(err.to_string())
            }
            DockerGuardError::DaemonConfig { .. } => ProbeError::Malformed(err.to_string()),
            DockerGuardError::PermissionDenied { path } => ProbeError::Io {
                path,
                reason: "permission denied".to_owned(),
            },
            DockerGuardError::Io { path, reason } => ProbeError::Io { path, reason },
            DockerGuardError::Command(inner) => inner.into(),
        }
    }
}

impl From<DockerGuardError> for ActionError {
    fn from(err: DockerGuardError) -> Self {
        match err {
            DockerGuardError::DockerApi(_)
            | DockerGuardError::DockerConnection(_)
            | DockerGuardError::DaemonConfig { .. } => ActionError::Backend(err.to_string()),
            DockerGuardError::PermissionDenied { path } => ActionError::Privilege(path),
            DockerGuardError::Io { path, reason } => ActionError::Io { path, reason },
            DockerGuardError::Command(inner) => inner.into(),
        }
    }
}
