//! Docker 데몬 설정 (daemon.json)
//!
//! 프로브는 daemon.json을 구조화된 값으로 읽고, 액션은 기대 키를 현재 내용 위에
//! 병합한 뒤 데몬을 재시작합니다. 기대 목록에 없는 기존 키는 보존됩니다.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::info;

use bulwark_core::error::ActionError;
use bulwark_core::fact::{Action, Descriptor, Probe};
use bulwark_core::types::{ActionOutcome, FactValue, ProbeOutcome};
use bulwark_host::CommandRunner;
use bulwark_host::command::run_checked;

use crate::error::DockerGuardError;

/// daemon.json을 읽습니다. 파일이 없으면 `None`을 반환합니다.
pub async fn read_daemon_json(path: &str) -> Result<Option<Map<String, Value>>, DockerGuardError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(DockerGuardError::io(path, &e)),
    };
    if content.trim().is_empty() {
        return Ok(Some(Map::new()));
    }
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(_) => Err(DockerGuardError::DaemonConfig {
            path: path.to_owned(),
            reason: "top-level value is not an object".to_owned(),
        }),
        Err(e) => Err(DockerGuardError::DaemonConfig {
            path: path.to_owned(),
            reason: e.to_string(),
        }),
    }
}

/// 기대 키를 현재 설정 위에 병합합니다.
///
/// 최상위 키 단위로 교체하며 중첩 객체(`log-opts` 등)는 통째로 덮어씁니다.
/// 반환값의 두 번째 요소는 값이 바뀐 키 목록입니다.
pub fn merge_settings(
    current: Map<String, Value>,
    desired: &Map<String, Value>,
) -> (Map<String, Value>, Vec<String>) {
    let mut merged = current;
    let mut changed = Vec::new();
    for (key, value) in desired {
        if merged.get(key) != Some(value) {
            merged.insert(key.clone(), value.clone());
            changed.push(key.clone());
        }
    }
    (merged, changed)
}

/// daemon.json 프로브
pub struct DaemonJsonProbe {
    path: String,
}

impl DaemonJsonProbe {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Probe for DaemonJsonProbe {
    async fn probe(&self) -> ProbeOutcome {
        match read_daemon_json(&self.path).await {
            Ok(Some(map)) => ProbeOutcome::Present(FactValue::Structured(map)),
            Ok(None) => ProbeOutcome::Absent,
            Err(e) => ProbeOutcome::Error(e.into()),
        }
    }
}

/// daemon.json 병합 + 데몬 재시작 액션
pub struct DaemonJsonAction<R> {
    path: String,
    settings: Map<String, Value>,
    restart_command: Vec<String>,
    runner: Arc<R>,
}

impl<R: CommandRunner> DaemonJsonAction<R> {
    pub fn new(
        path: impl Into<String>,
        settings: Map<String, Value>,
        restart_command: Vec<String>,
        runner: Arc<R>,
    ) -> Self {
        Self {
            path: path.into(),
            settings,
            restart_command,
            runner,
        }
    }

    async fn apply(&self) -> Result<Vec<String>, DockerGuardError> {
        let current = read_daemon_json(&self.path).await?.unwrap_or_default();
        let (merged, changed) = merge_settings(current, &self.settings);
        if changed.is_empty() {
            return Ok(changed);
        }

        let mut content = serde_json::to_string_pretty(&Value::Object(merged)).map_err(|e| {
            DockerGuardError::DaemonConfig {
                path: self.path.clone(),
                reason: e.to_string(),
            }
        })?;
        content.push('\n');
        if let Some(parent) = std::path::Path::new(&self.path).parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DockerGuardError::io(parent.display().to_string(), &e))?;
        }
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| DockerGuardError::io(&self.path, &e))?;
        info!(path = %self.path, ?changed, "daemon.json updated");

        if let Some((program, args)) = self.restart_command.split_first() {
            run_checked(self.runner.as_ref(), program, args, &[]).await?;
            info!(command = %self.restart_command.join(" "), "docker daemon restarted");
        }
        Ok(changed)
    }
}

impl<R: CommandRunner> Action for DaemonJsonAction<R> {
    fn describe(&self) -> String {
        let keys: Vec<&str> = self.settings.keys().map(String::as_str).collect();
        format!(
            "merge {} into {}; {}",
            keys.join(", "),
            self.path,
            self.restart_command.join(" ")
        )
    }

    async fn execute(&self, _descriptor: &Descriptor) -> Result<ActionOutcome, ActionError> {
        let changed = self.apply().await?;
        if changed.is_empty() {
            Ok(ActionOutcome::unchanged("daemon.json already up to date"))
        } else {
            Ok(ActionOutcome::applied(format!(
                "updated {} in {}; {}",
                changed.join(", "),
                self.path,
                self.restart_command.join(" ")
            )))
        }
    }
}
