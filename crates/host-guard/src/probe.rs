//! 호스트 상태 프로브
//!
//! [`HostCheck`]는 조회할 호스트 속성을 나타내고, [`HostProbe`]는
//! 명령 실행기와 묶여 [`Probe`] trait을 구현합니다.
//! 모든 조회는 읽기 전용이며 실패는 `ProbeOutcome::Error`로 변환됩니다.

use std::collections::BTreeSet;
use std::sync::Arc;

use bulwark_core::error::ProbeError;
use bulwark_core::fact::Probe;
use bulwark_core::types::{Confidence, FactValue, ProbeOutcome};

use crate::command::{CommandRunner, args, run_checked};
use crate::error::HostGuardError;

/// 조회할 호스트 속성
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCheck {
    /// 그룹 존재 여부 (`getent group`)
    GroupExists { group: String },
    /// 사용자 존재 여부 (`id -u`)
    UserExists { user: String },
    /// 사용자의 그룹 소속 여부 (`id -nG`)
    UserInGroup { user: String, group: String },
    /// 파일에 특정 줄이 있는지 여부
    FileHasLine { path: String, line: String },
    /// 파일 전체 내용 (없으면 Absent)
    FileContent { path: String },
    /// root 계정 비밀번호 상태 필드 (`passwd -S root`)
    RootPasswordStatus,
    /// ufw 활성화 여부
    FirewallActive,
    /// ufw 허용 포트 집합 (`{"22": true, ...}`)
    FirewallAllowedPorts,
    /// systemd 유닛 실행 여부
    ServiceActive { unit: String },
    /// systemd 유닛 부팅 시 활성화 여부
    ServiceEnabled { unit: String },
}

/// 명령 실행기와 묶인 호스트 프로브
pub struct HostProbe<R> {
    check: HostCheck,
    runner: Arc<R>,
}

impl<R: CommandRunner> HostProbe<R> {
    /// 새 프로브를 생성합니다.
    pub fn new(check: HostCheck, runner: Arc<R>) -> Self {
        Self { check, runner }
    }

    /// 조회 대상
    pub fn check(&self) -> &HostCheck {
        &self.check
    }

    async fn query(&self) -> Result<Option<FactValue>, HostGuardError> {
        let runner = self.runner.as_ref();
        match &self.check {
            HostCheck::GroupExists { group } => {
                // getent: 0 = 있음, 2 = 없음
                let out = run_checked(runner, "getent", &args(&["group", group]), &[2]).await?;
                Ok(Some(FactValue::Bool(out.success())))
            }
            HostCheck::UserExists { user } => {
                let out = run_checked(runner, "id", &args(&["-u", user]), &[1]).await?;
                Ok(Some(FactValue::Bool(out.success())))
            }
            HostCheck::UserInGroup { user, group } => {
                let out = run_checked(runner, "id", &args(&["-nG", user]), &[1]).await?;
                let member = out.success() && out.stdout.split_whitespace().any(|g| g == group);
                Ok(Some(FactValue::Bool(member)))
            }
            HostCheck::FileHasLine { path, line } => {
                let found = read_optional(path)
                    .await?
                    .is_some_and(|content| content.lines().any(|l| l.trim() == line));
                Ok(Some(FactValue::Bool(found)))
            }
            HostCheck::FileContent { path } => {
                Ok(read_optional(path).await?.map(FactValue::Text))
            }
            HostCheck::RootPasswordStatus => {
                let out = run_checked(runner, "passwd", &args(&["-S", "root"]), &[]).await?;
                parse_passwd_status(&out.stdout).map(|s| Some(FactValue::Text(s)))
            }
            HostCheck::FirewallActive => {
                let out = run_checked(runner, "ufw", &args(&["status"]), &[]).await?;
                parse_ufw_active(&out.stdout).map(|active| Some(FactValue::Bool(active)))
            }
            HostCheck::FirewallAllowedPorts => {
                let out = run_checked(runner, "ufw", &args(&["status"]), &[]).await?;
                let map = parse_ufw_allowed_ports(&out.stdout)
                    .into_iter()
                    .map(|port| (port.to_string(), serde_json::Value::Bool(true)))
                    .collect();
                Ok(Some(FactValue::Structured(map)))
            }
            HostCheck::ServiceActive { unit } => {
                // is-active는 비활성 상태에서 0이 아닌 코드로 종료됨
                let out = runner.run("systemctl", &args(&["is-active", unit])).await?;
                Ok(Some(FactValue::Bool(out.stdout.trim() == "active")))
            }
            HostCheck::ServiceEnabled { unit } => {
                let out = runner.run("systemctl", &args(&["is-enabled", unit])).await?;
                Ok(Some(FactValue::Bool(out.stdout.trim() == "enabled")))
            }
        }
    }
}

impl<R: CommandRunner> Probe for HostProbe<R> {
    fn confidence(&self) -> Confidence {
        match self.check {
            HostCheck::FirewallAllowedPorts => Confidence::Heuristic,
            _ => Confidence::Authoritative,
        }
    }

    async fn probe(&self) -> ProbeOutcome {
        self.query().await.map_err(ProbeError::from).into()
    }
}

/// 파일을 읽습니다. 없으면 `None`을 반환합니다.
pub(crate) async fn read_optional(path: &str) -> Result<Option<String>, HostGuardError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(HostGuardError::io(path, &e)),
    }
}

/// `passwd -S root` 출력의 상태 필드(L, P, NP)를 추출합니다.
pub fn parse_passwd_status(stdout: &str) -> Result<String, HostGuardError> {
    stdout
        .split_whitespace()
        .nth(1)
        .map(str::to_owned)
        .ok_or_else(|| HostGuardError::Malformed {
            program: "passwd".to_owned(),
            reason: format!("missing status field in '{}'", stdout.trim()),
        })
}

/// `ufw status` 출력에서 활성화 여부를 추출합니다.
pub fn parse_ufw_active(stdout: &str) -> Result<bool, HostGuardError> {
    for line in stdout.lines() {
        match line.trim() {
            "Status: active" => return Ok(true),
            "Status: inactive" => return Ok(false),
            _ => {}
        }
    }
    Err(HostGuardError::Malformed {
        program: "ufw".to_owned(),
        reason: "no 'Status:' line".to_owned(),
    })
}

/// `ufw status` 규칙 표에서 ALLOW 된 포트를 추출합니다.
///
/// `22`, `22/tcp`, `80,443/tcp`, `22 (v6)` 형식을 인식하며,
/// 서비스 이름(`OpenSSH`)이나 범위(`6000:6007/tcp`)는 무시합니다.
pub fn parse_ufw_allowed_ports(stdout: &str) -> BTreeSet<u16> {
    let mut ports = BTreeSet::new();
    let mut in_rules = false;
    for line in stdout.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            in_rules = true;
            continue;
        }
        if !in_rules || trimmed.is_empty() {
            continue;
        }
        let mut tokens = trimmed.split_whitespace();
        let Some(target) = tokens.next() else {
            continue;
        };
        let allowed = tokens.any(|t| t == "ALLOW");
        if !allowed {
            continue;
        }
        let spec = target.split('/').next().unwrap_or(target);
        for part in spec.split(',') {
            if let Ok(port) = part.parse::<u16>() {
                ports.insert(port);
            }
        }
    }
    ports
}
