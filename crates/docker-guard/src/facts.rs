//! Docker 도메인 팩트 카탈로그
//!
//! - 데몬: daemon.json, 실행 중 컨테이너 감사, Docker API 접근 감사
//! - 네트워크: 관리 대상 네트워크, 컨테이너 네트워크 감사

use std::sync::Arc;

use bulwark_core::config::{DaemonConfig, NetworkConfig};
use bulwark_core::error::CatalogError;
use bulwark_core::fact::{Descriptor, Fact, FactCatalog};
use bulwark_core::types::FactValue;
use bulwark_host::CommandRunner;

use crate::containers::{ContainerAudit, ContainerAuditProbe};
use crate::daemon::{DaemonJsonAction, DaemonJsonProbe};
use crate::docker::DockerClient;
use crate::network::{
    CreateNetwork, NetworkAudit, NetworkAuditProbe, NetworkPolicy, NetworkProbe, network_shape,
};

/// 데몬 리포트 제목
pub const DAEMON_TITLE: &str = "Docker Daemon";
/// 네트워크 리포트 제목
pub const NETWORK_TITLE: &str = "Docker Network";

const DAEMON_CONFIGURATION: &str = "DAEMON CONFIGURATION";
const CONTAINER_AUDIT: &str = "RUNNING CONTAINER AUDIT";
const ROOT_ACCESS_AUDIT: &str = "ROOT DOCKER ACCESS AUDIT";
const NETWORK_CONFIGURATION: &str = "NETWORK CONFIGURATION";
const CONTAINER_NETWORK_AUDIT: &str = "CONTAINER NETWORK AUDIT";

/// 데몬 도메인 카탈로그를 생성합니다.
pub fn daemon_catalog<D: DockerClient, R: CommandRunner>(
    config: &DaemonConfig,
    client: Arc<D>,
    runner: Arc<R>,
) -> Result<FactCatalog, CatalogError> {
    let mut catalog = FactCatalog::new();
    catalog.register(Fact::new(
        Descriptor::equals(
            DAEMON_CONFIGURATION,
            "Docker daemon configuration",
            FactValue::Structured(config.settings.clone()),
        ),
        DaemonJsonProbe::new(&config.daemon_json),
        DaemonJsonAction::new(
            &config.daemon_json,
            config.settings.clone(),
            config.restart_command.clone(),
            runner,
        ),
    ))?;

    for (id, audit) in [
        ("Privileged containers", ContainerAudit::Privileged),
        ("Dangerous host mounts", ContainerAudit::DangerousMounts),
    ] {
        catalog.register(Fact::audit_only(
            Descriptor::absent(CONTAINER_AUDIT, id),
            ContainerAuditProbe::new(audit, client.clone()),
        ))?;
    }

    catalog.register(Fact::audit_only(
        Descriptor::equals(
            ROOT_ACCESS_AUDIT,
            "Docker API usable by invoking user",
            FactValue::Bool(false),
        )
        .warn_only(),
        ContainerAuditProbe::new(ContainerAudit::ApiReachable, client),
    ))?;
    Ok(catalog)
}

/// 네트워크 도메인 카탈로그를 생성합니다.
pub fn network_catalog<D: DockerClient>(
    config: &NetworkConfig,
    client: Arc<D>,
) -> Result<FactCatalog, CatalogError> {
    let mut catalog = FactCatalog::new();
    for net in &config.networks {
        catalog.register(Fact::new(
            Descriptor::equals(
                NETWORK_CONFIGURATION,
                format!("Network {}", net.name),
                FactValue::Structured(network_shape(net.internal)),
            ),
            NetworkProbe::new(&net.name, client.clone()),
            CreateNetwork::new(&net.name, net.internal, client.clone()),
        ))?;
    }

    let policy = Arc::new(NetworkPolicy {
        managed: config.managed_names(),
        public_network: config.public_network.clone(),
        proxy_containers: config.proxy_containers.clone(),
    });
    let audits = [
        ("Containers without network".to_owned(), NetworkAudit::WithoutNetwork),
        ("Containers on multiple networks".to_owned(), NetworkAudit::MultipleNetworks),
        ("Containers on unmanaged networks".to_owned(), NetworkAudit::UnmanagedNetworks),
        (
            format!("Non-proxy containers on {}", config.public_network),
            NetworkAudit::NonProxyOnPublic,
        ),
    ];
    for (id, audit) in audits {
        catalog.register(Fact::audit_only(
            Descriptor::absent(CONTAINER_NETWORK_AUDIT, id).warn_only(),
            NetworkAuditProbe::new(audit, policy.clone(), client.clone()),
        ))?;
    }
    Ok(catalog)
}
