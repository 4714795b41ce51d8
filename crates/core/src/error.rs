//! 에러 타입 -- 실행 중단 에러와 팩트 단위 에러 정의
//!
//! 실행 전체를 중단시키는 에러는 [`BulwarkError`]로 모입니다
//! (설정, 권한, 사용법, 카탈로그, 리포트).
//! [`ProbeError`]와 [`ActionError`]는 팩트 하나에 국한되며
//! 리포트에 기록될 뿐 실행을 중단시키지 않습니다.

/// Bulwark 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum BulwarkError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 권한 부족
    #[error("privilege error: {0}")]
    Privilege(#[from] PrivilegeError),

    /// 잘못된 실행 인자
    #[error("usage error: {0}")]
    Usage(#[from] UsageError),

    /// 팩트 카탈로그 구성 에러
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// 리포트 기록 에러
    #[error("report error: {0}")]
    Report(#[from] ReportError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파일을 읽을 수 없음 (권한, 인코딩)
    #[error("cannot read config file {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// 필수 키 누락
    #[error("missing required config key '{key}'")]
    MissingKey { key: String },
}

/// 권한 부족 에러
///
/// 어떤 팩트도 평가되기 전에 발생합니다.
#[derive(Debug, thiserror::Error)]
#[error("{domain} in {mode} mode must be run as root (effective uid: {uid})")]
pub struct PrivilegeError {
    /// 실행하려던 도메인
    pub domain: String,
    /// 실행 모드
    pub mode: String,
    /// 현재 유효 UID (알 수 없으면 "unknown")
    pub uid: String,
}

/// 잘못된 모드 인자
#[derive(Debug, thiserror::Error)]
#[error("invalid mode '{value}' (expected: apply, check, dry-run)")]
pub struct UsageError {
    /// 입력된 값
    pub value: String,
}

/// 팩트 카탈로그 에러
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// 동일한 식별자의 팩트가 이미 등록됨
    #[error("duplicate fact identifier: {id}")]
    DuplicateFact { id: String },

    /// 빈 식별자
    #[error("fact identifier cannot be empty")]
    EmptyIdentifier,
}

/// 리포트 기록 에러
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// 리포트 파일 열기 실패
    #[error("cannot open report '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 리포트 쓰기 실패
    #[error("cannot write report: {0}")]
    Write(#[from] std::io::Error),
}

/// 프로브 실패 원인
///
/// 조회 실패는 모두 이 타입으로 변환되어 `Unknown` 판정이 됩니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// 외부 명령 실행 실패 (바이너리 없음, 비정상 종료 등)
    #[error("command '{program}' failed: {reason}")]
    Command { program: String, reason: String },

    /// 파일 읽기 실패
    #[error("cannot read '{path}': {reason}")]
    Io { path: String, reason: String },

    /// 출력/파일 내용 해석 실패
    #[error("malformed data: {0}")]
    Malformed(String),

    /// 백엔드 API 실패 (Docker 데몬 등)
    #[error("backend error: {0}")]
    Backend(String),
}

/// 액션 실패 원인
///
/// 예상 가능한 실패(이미 존재함 등)는 에러가 아니라
/// `ActionOutcome { applied: false, .. }`로 보고해야 합니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// 권한 부족
    #[error("permission denied: {0}")]
    Privilege(String),

    /// 외부 명령 실패
    #[error("command '{program}' failed: {reason}")]
    Command { program: String, reason: String },

    /// 파일 쓰기 실패
    #[error("cannot write '{path}': {reason}")]
    Io { path: String, reason: String },

    /// 백엔드 API 실패
    #[error("backend error: {0}")]
    Backend(String),
}

impl ActionError {
    /// `std::io::Error`를 경로 정보와 함께 변환합니다.
    ///
    /// `PermissionDenied`는 [`ActionError::Privilege`]로 구분합니다.
    pub fn from_io(path: impl Into<String>, err: &std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            Self::Privilege(format!("{path}: {err}"))
        } else {
            Self::Io {
                path,
                reason: err.to_string(),
            }
        }
    }
}

impl ProbeError {
    /// `std::io::Error`를 경로 정보와 함께 변환합니다.
    pub fn from_io(path: impl Into<String>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_missing_key_names_the_key() {
        let err = ConfigError::MissingKey {
            key: "folders.server_root".to_owned(),
        };
        assert!(err.to_string().contains("folders.server_root"));
    }

    #[test]
    fn privilege_error_display() {
        let err = PrivilegeError {
            domain: "host".to_owned(),
            mode: "apply".to_owned(),
            uid: "1000".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("root"));
        assert!(msg.contains("apply"));
        assert!(msg.contains("1000"));
    }

    #[test]
    fn usage_error_lists_modes() {
        let err = UsageError {
            value: "--force".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("--force"));
        assert!(msg.contains("dry-run"));
    }

    #[test]
    fn action_error_from_permission_denied_is_privilege() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ActionError::from_io("/etc/subuid", &io);
        assert!(matches!(err, ActionError::Privilege(_)));
    }

    #[test]
    fn action_error_from_other_io_keeps_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ActionError::from_io("/etc/docker/daemon.json", &io);
        match err {
            ActionError::Io { path, .. } => assert_eq!(path, "/etc/docker/daemon.json"),
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn converts_into_bulwark_error() {
        let err: BulwarkError = CatalogError::EmptyIdentifier.into();
        assert!(matches!(err, BulwarkError::Catalog(_)));
        let err: BulwarkError = UsageError {
            value: "x".to_owned(),
        }
        .into();
        assert!(matches!(err, BulwarkError::Usage(_)));
    }
}
