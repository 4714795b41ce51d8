//! Docker API abstraction for testability.
//!
//! The [`DockerClient`] trait abstracts the bollard Docker API, allowing
//! production code to use [`BollardDockerClient`] while tests use `MockDockerClient`.
//!
//! ```text
//!   daemon / network facts
//!            │
//!            ▼
//!     ┌─────────────┐
//!     │DockerClient │ (trait)
//!     └─────────────┘
//!        │       │
//!        ▼       ▼
//!    Bollard    Mock
//!        │
//!        ▼
//!   Docker Daemon
//! ```
//!
//! Only read operations and network creation are exposed. Containers are
//! never stopped, restarted or disconnected.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::error::DockerGuardError;

/// 실행 중인 컨테이너의 감사용 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerDetails {
    /// 컨테이너 ID
    pub id: String,
    /// 이름 (앞의 `/` 제거)
    pub name: String,
    /// privileged 모드 여부
    pub privileged: bool,
    /// 마운트 소스 경로
    pub mount_sources: Vec<String>,
    /// 연결된 네트워크 이름
    pub networks: Vec<String>,
}

/// Docker 네트워크 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkInfo {
    /// 네트워크 이름
    pub name: String,
    /// internal 플래그
    pub internal: bool,
    /// 드라이버
    pub driver: String,
}

/// Validates a container ID before it is passed to the API.
///
/// Docker container IDs are 64-character hex strings (or shorter prefix forms).
fn validate_container_id(id: &str) -> Result<(), DockerGuardError> {
    if id.is_empty() || id.len() > 64 {
        return Err(DockerGuardError::DockerApi(format!(
            "invalid container ID: length {} (must be 1-64)",
            id.len()
        )));
    }
    if !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(DockerGuardError::DockerApi(
            "invalid container ID: contains non-hex characters".to_owned(),
        ));
    }
    Ok(())
}

/// Trait abstracting Docker API operations.
///
/// # Error Handling
///
/// - **404 on network inspect**: returned as `Ok(None)`
/// - **Connection errors**: `DockerGuardError::DockerConnection`
/// - **Other API failures**: `DockerGuardError::DockerApi`
pub trait DockerClient: Send + Sync + 'static {
    /// Checks Docker daemon connectivity.
    fn ping(&self) -> impl Future<Output = Result<(), DockerGuardError>> + Send;

    /// Lists running containers with their privileged flag, mounts and networks.
    fn running_containers(
        &self,
    ) -> impl Future<Output = Result<Vec<ContainerDetails>, DockerGuardError>> + Send;

    /// Inspects a network by name. A missing network is `Ok(None)`.
    fn inspect_network(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<NetworkInfo>, DockerGuardError>> + Send;

    /// Creates a bridge network.
    fn create_network(
        &self,
        name: &str,
        internal: bool,
    ) -> impl Future<Output = Result<(), DockerGuardError>> + Send;
}

/// Production Docker client implementation using `bollard`.
///
/// Communicates with the Docker daemon via a Unix socket.
/// Connection timeout is 120 seconds; the API version is negotiated by default.
/// A client that failed to connect is still usable: every call returns the
/// connection error, so Docker facts degrade to unknown instead of aborting the run.
pub struct BollardDockerClient {
    docker: Result<Arc<bollard::Docker>, DockerGuardError>,
}

impl BollardDockerClient {
    /// Connects to Docker using a specific socket path.
    ///
    /// # Errors
    ///
    /// Returns `DockerGuardError::DockerConnection` if the client cannot be built.
    pub fn connect_with_socket(socket_path: &str) -> Result<Self, DockerGuardError> {
        let client = Self::new(socket_path);
        client.docker()?;
        Ok(client)
    }

    /// Builds a client, deferring any connection error to the first call.
    pub fn new(socket_path: &str) -> Self {
        let docker =
            bollard::Docker::connect_with_socket(socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map(Arc::new)
                .map_err(|e| {
                    DockerGuardError::DockerConnection(format!(
                        "failed to connect to docker at {socket_path}: {e}"
                    ))
                });
        Self { docker }
    }

    fn docker(&self) -> Result<&bollard::Docker, DockerGuardError> {
        self.docker.as_deref().map_err(Clone::clone)
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, DockerGuardError> {
        validate_container_id(id)?;

        let details = self
            .docker()?
            .inspect_container(id, None)
            .await
            .map_err(|e| DockerGuardError::DockerApi(format!("inspect container failed: {e}")))?;

        let name = details
            .name
            .map(|n| n.trim_start_matches('/').to_owned())
            .unwrap_or_default();
        let privileged = details
            .host_config
            .and_then(|h| h.privileged)
            .unwrap_or(false);
        let mount_sources = details
            .mounts
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| m.source)
            .collect();
        let mut networks: Vec<String> = details
            .network_settings
            .and_then(|s| s.networks)
            .map(|n| n.into_keys().collect())
            .unwrap_or_default();
        networks.sort();

        Ok(ContainerDetails {
            id: id.to_owned(),
            name,
            privileged,
            mount_sources,
            networks,
        })
    }
}

fn is_not_found(err: &bollard::errors::Error) -> bool {
    matches!(
        err,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

impl DockerClient for BollardDockerClient {
    async fn ping(&self) -> Result<(), DockerGuardError> {
        self.docker()?
            .ping()
            .await
            .map_err(|e| DockerGuardError::DockerConnection(format!("ping failed: {e}")))?;
        Ok(())
    }

    async fn running_containers(&self) -> Result<Vec<ContainerDetails>, DockerGuardError> {
        use bollard::container::ListContainersOptions;

        let options = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };
        let containers = self
            .docker()?
            .list_containers(Some(options))
            .await
            .map_err(|e| DockerGuardError::DockerApi(format!("list containers failed: {e}")))?;

        let mut result = Vec::with_capacity(containers.len());
        for container in containers {
            let Some(id) = container.id else {
                continue;
            };
            result.push(self.inspect_container(&id).await?);
        }
        debug!(count = result.len(), "listed running containers");
        Ok(result)
    }

    async fn inspect_network(&self, name: &str) -> Result<Option<NetworkInfo>, DockerGuardError> {
        use bollard::network::InspectNetworkOptions;

        match self
            .docker()?
            .inspect_network(name, None::<InspectNetworkOptions<String>>)
            .await
        {
            Ok(network) => Ok(Some(NetworkInfo {
                name: network.name.unwrap_or_else(|| name.to_owned()),
                internal: network.internal.unwrap_or(false),
                driver: network.driver.unwrap_or_default(),
            })),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(DockerGuardError::DockerApi(format!(
                "inspect network '{name}' failed: {e}"
            ))),
        }
    }

    async fn create_network(&self, name: &str, internal: bool) -> Result<(), DockerGuardError> {
        use bollard::network::CreateNetworkOptions;

        let options = CreateNetworkOptions {
            name: name.to_owned(),
            driver: "bridge".to_owned(),
            internal,
            ..Default::default()
        };
        self.docker()?
            .create_network(options)
            .await
            .map_err(|e| DockerGuardError::DockerApi(format!("create network '{name}' failed: {e}")))?;
        Ok(())
    }
}

// --- 테스트용 Mock ---
