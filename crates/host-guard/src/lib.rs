//! # bulwark-host
//!
//! 호스트 OS와 서버 폴더 구조를 위한 상태 드라이버입니다.
//!
//! # Module Structure
//!
//! - [`command`]: 외부 명령 실행 추상화 (`CommandRunner`, `SystemCommandRunner`)
//! - [`probe`]: 호스트 상태 조회 (`HostCheck`, `HostProbe`)
//! - [`action`]: 호스트 교정 단계 (`Step`, `HostAction`)
//! - [`facts`]: 호스트 팩트 카탈로그 (`host_catalog`)
//! - [`folders`]: 폴더 구조 팩트 카탈로그 (`folder_catalog`)
//! - [`error`]: 도메인 에러 타입 (`HostGuardError`)

pub mod action;
pub mod command;
pub mod error;
pub mod facts;
pub mod folders;
pub mod probe;

// --- Public API Re-exports ---

pub use action::{HostAction, Step};
pub use command::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use error::HostGuardError;
pub use facts::{HOST_TITLE, host_catalog};
pub use folders::{FOLDERS_TITLE, folder_catalog};
pub use probe::{HostCheck, HostProbe};
