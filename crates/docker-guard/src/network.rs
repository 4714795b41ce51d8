//! Docker 네트워크 토폴로지
//!
//! 관리 대상 네트워크는 없으면 생성합니다. 이미 존재하지만 internal 플래그가
//! 다른 네트워크는 삭제하지 않고 충돌로 보고합니다.
//! 컨테이너의 네트워크 사용은 감사만 합니다.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{info, warn};

use bulwark_core::error::ActionError;
use bulwark_core::fact::{Action, Descriptor, Probe};
use bulwark_core::types::{ActionOutcome, FactValue, ProbeOutcome};

use crate::docker::{ContainerDetails, DockerClient};

/// 네트워크 팩트의 기대값 (`{"internal": bool}`)
pub fn network_shape(internal: bool) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("internal".to_owned(), Value::Bool(internal));
    map
}

/// 네트워크 존재 및 internal 플래그 프로브
pub struct NetworkProbe<D> {
    name: String,
    client: Arc<D>,
}

impl<D: DockerClient> NetworkProbe<D> {
    pub fn new(name: impl Into<String>, client: Arc<D>) -> Self {
        Self {
            name: name.into(),
            client,
        }
    }
}

impl<D: DockerClient> Probe for NetworkProbe<D> {
    async fn probe(&self) -> ProbeOutcome {
        match self.client.inspect_network(&self.name).await {
            Ok(Some(info)) => ProbeOutcome::Present(FactValue::Structured(network_shape(info.internal))),
            Ok(None) => ProbeOutcome::Absent,
            Err(e) => ProbeOutcome::Error(e.into()),
        }
    }
}

/// 네트워크 생성 액션
pub struct CreateNetwork<D> {
    name: String,
    internal: bool,
    client: Arc<D>,
}

impl<D: DockerClient> CreateNetwork<D> {
    pub fn new(name: impl Into<String>, internal: bool, client: Arc<D>) -> Self {
        Self {
            name: name.into(),
            internal,
            client,
        }
    }
}

impl<D: DockerClient> Action for CreateNetwork<D> {
    fn describe(&self) -> String {
        if self.internal {
            format!("docker network create --internal {}", self.name)
        } else {
            format!("docker network create {}", self.name)
        }
    }

    async fn execute(&self, _descriptor: &Descriptor) -> Result<ActionOutcome, ActionError> {
        if let Some(existing) = self.client.inspect_network(&self.name).await? {
            if existing.internal == self.internal {
                return Ok(ActionOutcome::unchanged(format!(
                    "network {} already exists",
                    self.name
                )));
            }
            warn!(
                network = %self.name,
                actual = existing.internal,
                expected = self.internal,
                "network exists with conflicting internal flag"
            );
            return Ok(ActionOutcome::unchanged(format!(
                "network {} exists with internal={} (expected {}); not recreated",
                self.name, existing.internal, self.internal
            )));
        }
        self.client.create_network(&self.name, self.internal).await?;
        info!(network = %self.name, internal = self.internal, "network created");
        Ok(ActionOutcome::applied(self.describe()))
    }
}

/// 컨테이너 네트워크 감사 항목
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkAudit {
    /// 네트워크가 없는 컨테이너
    WithoutNetwork,
    /// 둘 이상의 네트워크에 연결된 컨테이너
    MultipleNetworks,
    /// 관리 대상이 아닌 네트워크를 쓰는 컨테이너
    UnmanagedNetworks,
    /// 공개 네트워크에 연결된 프록시 외 컨테이너
    NonProxyOnPublic,
}

/// 감사 기준
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPolicy {
    /// 관리 대상 네트워크 이름
    pub managed: Vec<String>,
    /// 공개 네트워크 이름
    pub public_network: String,
    /// 공개 네트워크에 허용되는 프록시 컨테이너 이름 (소문자 비교)
    pub proxy_containers: Vec<String>,
}

impl NetworkPolicy {
    /// 감사 항목별 위반 목록을 계산합니다.
    pub fn findings(&self, audit: NetworkAudit, containers: &[ContainerDetails]) -> Vec<String> {
        match audit {
            NetworkAudit::WithoutNetwork => containers
                .iter()
                .filter(|c| c.networks.is_empty())
                .map(|c| c.name.clone())
                .collect(),
            NetworkAudit::MultipleNetworks => containers
                .iter()
                .filter(|c| c.networks.len() > 1)
                .map(|c| format!("{}: {}", c.name, c.networks.join(", ")))
                .collect(),
            NetworkAudit::UnmanagedNetworks => containers
                .iter()
                .flat_map(|c| {
                    c.networks
                        .iter()
                        .filter(|n| !self.managed.contains(n))
                        .map(move |n| format!("{}: {n}", c.name))
                })
                .collect(),
            NetworkAudit::NonProxyOnPublic => containers
                .iter()
                .filter(|c| c.networks.contains(&self.public_network))
                .filter(|c| {
                    let name = c.name.to_lowercase();
                    !self.proxy_containers.iter().any(|p| p.to_lowercase() == name)
                })
                .map(|c| c.name.clone())
                .collect(),
        }
    }
}

/// 컨테이너 네트워크 감사 프로브
pub struct NetworkAuditProbe<D> {
    audit: NetworkAudit,
    policy: Arc<NetworkPolicy>,
    client: Arc<D>,
}

impl<D: DockerClient> NetworkAuditProbe<D> {
    pub fn new(audit: NetworkAudit, policy: Arc<NetworkPolicy>, client: Arc<D>) -> Self {
        Self {
            audit,
            policy,
            client,
        }
    }
}

impl<D: DockerClient> Probe for NetworkAuditProbe<D> {
    async fn probe(&self) -> ProbeOutcome {
        match self.client.running_containers().await {
            Ok(containers) => {
                ProbeOutcome::from_findings(self.policy.findings(self.audit, &containers))
            }
            Err(e) => ProbeOutcome::Error(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::mock::{MockDockerClient, container};

    fn policy() -> NetworkPolicy {
        NetworkPolicy {
            managed: vec![
                "frontend_net".to_owned(),
                "backend_net".to_owned(),
                "monitoring_net".to_owned(),
            ],
            public_network: "frontend_net".to_owned(),
            proxy_containers: vec!["traefik".to_owned(), "nginx".to_owned()],
        }
    }

    fn containers() -> Vec<ContainerDetails> {
        vec![
            container("Traefik", &["backend_net", "frontend_net"]),
            container("api", &["backend_net", "frontend_net"]),
            container("db", &["backend_net"]),
            container("scratch", &[]),
            container("legacy", &["bridge"]),
        ]
    }

    #[test]
    fn findings_per_audit() {
        let p = policy();
        let c = containers();
        assert_eq!(p.findings(NetworkAudit::WithoutNetwork, &c), vec!["scratch"]);
        assert_eq!(
            p.findings(NetworkAudit::MultipleNetworks, &c),
            vec![
                "Traefik: backend_net, frontend_net",
                "api: backend_net, frontend_net"
            ]
        );
        assert_eq!(
            p.findings(NetworkAudit::UnmanagedNetworks, &c),
            vec!["legacy: bridge"]
        );
        // 프록시 이름은 대소문자 구분 없이 비교
        assert_eq!(p.findings(NetworkAudit::NonProxyOnPublic, &c), vec!["api"]);
    }

    #[tokio::test]
    async fn missing_network_is_absent_then_created() {
        let client = Arc::new(MockDockerClient::new());
        let probe = NetworkProbe::new("backend_net", client.clone());
        assert_eq!(probe.probe().await, ProbeOutcome::Absent);

        let action = CreateNetwork::new("backend_net", true, client.clone());
        assert_eq!(action.describe(), "docker network create --internal backend_net");
        let d = Descriptor::equals(
            "NETWORK CONFIGURATION",
            "Network backend_net",
            FactValue::Structured(network_shape(true)),
        );
        let outcome = action.execute(&d).await.unwrap();
        assert!(outcome.applied);
        assert_eq!(
            probe.probe().await,
            ProbeOutcome::Present(FactValue::Structured(network_shape(true)))
        );
    }

    #[tokio::test]
    async fn conflicting_network_is_never_recreated() {
        let client = Arc::new(MockDockerClient::new().with_network("backend_net", false));
        let action = CreateNetwork::new("backend_net", true, client.clone());
        let d = Descriptor::equals(
            "NETWORK CONFIGURATION",
            "Network backend_net",
            FactValue::Structured(network_shape(true)),
        );
        let outcome = action.execute(&d).await.unwrap();
        assert!(!outcome.applied);
        assert!(outcome.detail.contains("internal=false"));
        assert!(client.created().is_empty());
    }

    #[tokio::test]
    async fn matching_network_is_left_alone() {
        let client = Arc::new(MockDockerClient::new().with_network("backend_net", true));
        let action = CreateNetwork::new("backend_net", true, client.clone());
        let d = Descriptor::equals(
            "NETWORK CONFIGURATION",
            "Network backend_net",
            FactValue::Structured(network_shape(true)),
        );
        let outcome = action.execute(&d).await.unwrap();
        assert!(!outcome.applied);
        assert_eq!(outcome.detail, "network backend_net already exists");
        assert!(!outcome.detail.contains("expected"));
        assert!(client.created().is_empty());
    }

    #[tokio::test]
    async fn audit_probe_reports_findings() {
        let mut mock = MockDockerClient::new();
        for c in containers() {
            mock = mock.with_container(c);
        }
        let probe = NetworkAuditProbe::new(
            NetworkAudit::WithoutNetwork,
            Arc::new(policy()),
            Arc::new(mock),
        );
        assert_eq!(
            probe.probe().await,
            ProbeOutcome::Present(FactValue::List(vec!["scratch".to_owned()]))
        );
    }
}
