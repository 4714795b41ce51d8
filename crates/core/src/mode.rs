//! 실행 모드 -- apply / check / dry-run
//!
//! 한 번의 실행은 정확히 하나의 모드를 가지며,
//! 모드는 [`RunContext`](crate::context::RunContext)를 통해 조정기로 전달됩니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UsageError;

/// 실행 모드
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// 불일치를 교정한 뒤 전체 감사 결과를 기록 (기본값)
    #[default]
    Apply,
    /// 감사만 수행하며 어떤 변경도 하지 않음
    Check,
    /// apply와 같은 결정 경로를 따르되 변경 대신 설명만 기록
    DryRun,
}

impl RunMode {
    /// 이 모드에서 액션을 실행할 수 있는지 여부
    pub fn mutates(self) -> bool {
        matches!(self, Self::Apply)
    }

    /// CLI/리포트에 표시되는 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Apply => "apply",
            Self::Check => "check",
            Self::DryRun => "dry-run",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "apply" => Ok(Self::Apply),
            "check" => Ok(Self::Check),
            "dry-run" => Ok(Self::DryRun),
            other => Err(UsageError {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_modes() {
        assert_eq!("apply".parse::<RunMode>().unwrap(), RunMode::Apply);
        assert_eq!("check".parse::<RunMode>().unwrap(), RunMode::Check);
        assert_eq!("dry-run".parse::<RunMode>().unwrap(), RunMode::DryRun);
    }

    #[test]
    fn rejects_unknown_mode() {
        let err = "--force".parse::<RunMode>().unwrap_err();
        assert_eq!(err.value, "--force");
        assert!("Apply".parse::<RunMode>().is_err());
        assert!("dryrun".parse::<RunMode>().is_err());
    }

    #[test]
    fn default_is_apply() {
        assert_eq!(RunMode::default(), RunMode::Apply);
    }

    #[test]
    fn only_apply_mutates() {
        assert!(RunMode::Apply.mutates());
        assert!(!RunMode::Check.mutates());
        assert!(!RunMode::DryRun.mutates());
    }

    #[test]
    fn display_round_trips() {
        for mode in [RunMode::Apply, RunMode::Check, RunMode::DryRun] {
            assert_eq!(mode.to_string().parse::<RunMode>().unwrap(), mode);
        }
    }
}
