//! 실행 중 컨테이너 감사
//!
//! 자동 교정 없이 위반 컨테이너 목록만 보고합니다.
//! 컨테이너를 중지하거나 재시작하지 않습니다.

use std::sync::Arc;

use bulwark_core::fact::Probe;
use bulwark_core::types::{FactValue, ProbeOutcome};

use crate::docker::{ContainerDetails, DockerClient};

/// 컨테이너에 마운트되면 안 되는 호스트 경로
pub const DANGEROUS_MOUNTS: [&str; 2] = ["/", "/var/run/docker.sock"];

/// 감사 항목
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerAudit {
    /// privileged 모드로 실행 중인 컨테이너
    Privileged,
    /// 위험한 호스트 경로를 마운트한 컨테이너
    DangerousMounts,
    /// 현재 사용자로 Docker API에 접근 가능한지 여부
    ApiReachable,
}

/// privileged 컨테이너 이름
pub fn privileged_containers(containers: &[ContainerDetails]) -> Vec<String> {
    containers
        .iter()
        .filter(|c| c.privileged)
        .map(|c| c.name.clone())
        .collect()
}

/// `이름: 경로` 형식의 위험 마운트 목록
pub fn dangerous_mounts(containers: &[ContainerDetails]) -> Vec<String> {
    containers
        .iter()
        .flat_map(|c| {
            c.mount_sources
                .iter()
                .filter(|src| DANGEROUS_MOUNTS.contains(&src.as_str()))
                .map(move |src| format!("{}: {src}", c.name))
        })
        .collect()
}

/// 컨테이너 감사 프로브
pub struct ContainerAuditProbe<D> {
    audit: ContainerAudit,
    client: Arc<D>,
}

impl<D: DockerClient> ContainerAuditProbe<D> {
    pub fn new(audit: ContainerAudit, client: Arc<D>) -> Self {
        Self { audit, client }
    }
}

impl<D: DockerClient> Probe for ContainerAuditProbe<D> {
    async fn probe(&self) -> ProbeOutcome {
        if self.audit == ContainerAudit::ApiReachable {
            // 연결 실패는 접근 불가로 판정
            let reachable = self.client.ping().await.is_ok();
            return ProbeOutcome::Present(FactValue::Bool(reachable));
        }
        let containers = match self.client.running_containers().await {
            Ok(containers) => containers,
            Err(e) => return ProbeOutcome::Error(e.into()),
        };
        let findings = match self.audit {
            ContainerAudit::Privileged => privileged_containers(&containers),
            ContainerAudit::DangerousMounts => dangerous_mounts(&containers),
            ContainerAudit::ApiReachable => Vec::new(),
        };
        ProbeOutcome::from_findings(findings)
    }
}
