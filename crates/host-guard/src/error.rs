//! 호스트 드라이버 에러 타입
//!
//! [`HostGuardError`]는 외부 명령 실행과 파일 조작 실패를 표현합니다.
//! 프로브에서는 [`ProbeError`]로, 액션에서는 [`ActionError`]로 변환되어
//! 팩트 하나의 결과로만 기록됩니다.

use bulwark_core::error::{ActionError, ProbeError};

/// 호스트 드라이버 도메인 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostGuardError {
    /// 프로세스 생성 실패 (바이너리 없음 등)
    #[error("cannot run '{program}': {reason}")]
    Spawn {
        /// 실행하려던 프로그램
        program: String,
        /// 실패 사유
        reason: String,
    },

    /// 허용되지 않은 종료 코드
    #[error("'{program}' exited with {code}: {stderr}")]
    Exit {
        /// 실행한 프로그램
        program: String,
        /// 종료 코드 (시그널로 종료되면 -1)
        code: i32,
        /// 표준 에러 출력 (앞뒤 공백 제거)
        stderr: String,
    },

    /// UTF-8이 아닌 출력
    #[error("'{program}' produced non-utf8 output")]
    NonUtf8 {
        /// 실행한 프로그램
        program: String,
    },

    /// 출력 해석 실패
    #[error("unexpected output from '{program}': {reason}")]
    Malformed {
        /// 실행한 프로그램
        program: String,
        /// 해석 실패 사유
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
}

impl HostGuardError {
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

impl From<HostGuardError> for ProbeError {
    fn from(err: HostGuardError) -> Self {
        match err {
            HostGuardError::Spawn { program, reason } => ProbeError::Command { program, reason },
            HostGuardError::Exit { ref program, .. } | HostGuardError::NonUtf8 { ref program } => {
                ProbeError::Command {
                    program: program.clone(),
                    reason: err.to_string(),
                }
            }
            HostGuardError::Malformed { .. } => ProbeError::Malformed(err.to_string()),
            HostGuardError::PermissionDenied { path } => ProbeError::Io {
                path,
                reason: "permission denied".to_owned(),
            },
            HostGuardError::Io { path, reason } => ProbeError::Io { path, reason },
        }
    }
}

impl From<HostGuardError> for ActionError {
    fn from(err: HostGuardError) -> Self {
        match err {
            HostGuardError::Spawn { program, reason } => ActionError::Command { program, reason },
            HostGuardError::Exit { ref program, .. }
            | HostGuardError::NonUtf8 { ref program }
            | HostGuardError::Malformed { ref program, .. } => ActionError::Command {
                program: program.clone(),
                reason: err.to_string(),
            },
            HostGuardError::PermissionDenied { path } => ActionError::Privilege(path),
            HostGuardError::Io { path, reason } => ActionError::Io { path, reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_error_display() {
        let err = HostGuardError::Exit {
            program: "groupadd".to_owned(),
            code: 10,
            stderr: "cannot lock /etc/group".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("groupadd"));
        assert!(msg.contains("10"));
        assert!(msg.contains("cannot lock"));
    }

    #[test]
    fn spawn_error_becomes_probe_command_error() {
        let err = HostGuardError::Spawn {
            program: "ufw".to_owned(),
            reason: "No such file or directory".to_owned(),
        };
        let probe: ProbeError = err.into();
        assert!(matches!(probe, ProbeError::Command { ref program, .. } if program == "ufw"));
    }

    #[test]
    fn malformed_becomes_probe_malformed() {
        let err = HostGuardError::Malformed {
            program: "passwd".to_owned(),
            reason: "empty output".to_owned(),
        };
        let probe: ProbeError = err.into();
        assert!(matches!(probe, ProbeError::Malformed(_)));
    }

    #[test]
    fn permission_denied_becomes_action_privilege() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = HostGuardError::io("/etc/subuid", &io);
        let action: ActionError = err.into();
        assert_eq!(action, ActionError::Privilege("/etc/subuid".to_owned()));
    }

    #[test]
    fn io_keeps_path_for_action() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let action: ActionError = HostGuardError::io("/etc/subgid", &io).into();
        assert!(matches!(action, ActionError::Io { ref path, .. } if path == "/etc/subgid"));
    }
}
