//! # bulwark-docker
//!
//! Docker 데몬 설정, 실행 중 컨테이너 감사, 네트워크 토폴로지 상태 드라이버입니다.
//!
//! # Module Structure
//!
//! - [`docker`]: Docker API abstraction (`DockerClient` trait, `BollardDockerClient`)
//! - [`daemon`]: daemon.json probe and merge action
//! - [`containers`]: running container audits (privileged, dangerous mounts, API access)
//! - [`network`]: network probe/creation and container network audits
//! - [`facts`]: domain catalogs (`daemon_catalog`, `network_catalog`)
//! - [`error`]: domain error types (`DockerGuardError`)
//!
//! # Architecture
//!
//! ```text
//! DaemonConfig  ──> daemon_catalog()  ─┐
//!                                      ├──> FactCatalog ──> Reconciler
//! NetworkConfig ──> network_catalog() ─┘         │
//!                                          DockerClient (bollard)
//! ```

pub mod containers;
pub mod daemon;
pub mod docker;
pub mod error;
pub mod facts;
pub mod network;

// --- Public API Re-exports ---

pub use docker::{BollardDockerClient, ContainerDetails, DockerClient, NetworkInfo};
pub use error::DockerGuardError;
pub use facts::{DAEMON_TITLE, NETWORK_TITLE, daemon_catalog, network_catalog};
