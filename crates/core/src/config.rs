//! 설정 관리 -- bulwark.toml 파싱 및 런타임 설정
//!
//! [`BulwarkConfig`]는 모든 도메인의 기대 상태 파라미터를 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`BULWARK_HOST_DOCKER_USER=deploy` 형식)
//! 3. `folders.env_file` (`SERVER_ROOT`, `PUID`, `PGID`)
//! 4. 설정 파일 (`bulwark.toml`)
//! 5. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), bulwark_core::error::BulwarkError> {
//! use bulwark_core::config::BulwarkConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = BulwarkConfig::load("bulwark.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = BulwarkConfig::parse("[host]\ndocker_user = \"deploy\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{BulwarkError, ConfigError};

/// 기본 설정 파일 경로
pub const DEFAULT_CONFIG_PATH: &str = "/etc/bulwark/bulwark.toml";

/// Bulwark 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulwarkConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 호스트 OS 설정
    #[serde(default)]
    pub host: HostConfig,
    /// Docker 데몬 설정
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Docker 네트워크 설정
    #[serde(default)]
    pub network: NetworkConfig,
    /// 폴더 구조 설정 (선택)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folders: Option<FoldersConfig>,
}

impl BulwarkConfig {
    /// TOML 파일에서 설정을 로드하고 env 파일, 환경변수 오버라이드를 적용한 뒤 검증합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, BulwarkError> {
        let mut config = Self::from_file(path).await?;
        config.finish_loading().await?;
        Ok(config)
    }

    /// 파일 없이 기본값에서 시작하여 오버라이드와 검증을 적용합니다.
    pub async fn load_defaults() -> Result<Self, BulwarkError> {
        let mut config = Self::default();
        config.finish_loading().await?;
        Ok(config)
    }

    async fn finish_loading(&mut self) -> Result<(), BulwarkError> {
        self.apply_env_overrides()?;
        self.apply_env_file().await?;
        self.validate()?;
        Ok(())
    }

    /// TOML 파일에서 설정을 로드합니다 (오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, BulwarkError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BulwarkError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                BulwarkError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        info!(path = %path.display(), "configuration file loaded");
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseFailed {
            reason: e.to_string(),
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `BULWARK_{SECTION}_{FIELD}`
    /// 예: `BULWARK_HOST_DOCKER_USER=deploy`
    ///
    /// 숫자 값을 해석할 수 없으면 해당 필드를 담은 `InvalidValue`를 반환합니다.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        // General
        override_string(&mut self.general.log_level, "BULWARK_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "BULWARK_GENERAL_LOG_FORMAT");
        override_string(
            &mut self.general.docker_socket,
            "BULWARK_GENERAL_DOCKER_SOCKET",
        );

        // Host
        override_string(&mut self.host.docker_user, "BULWARK_HOST_DOCKER_USER");
        override_string(&mut self.host.docker_group, "BULWARK_HOST_DOCKER_GROUP");
        override_string(&mut self.host.remap_user, "BULWARK_HOST_REMAP_USER");
        override_u32(
            &mut self.host.subid_start,
            "BULWARK_HOST_SUBID_START",
            "host.subid_start",
        )?;
        override_u32(
            &mut self.host.subid_count,
            "BULWARK_HOST_SUBID_COUNT",
            "host.subid_count",
        )?;
        override_ports(
            &mut self.host.allowed_ports,
            "BULWARK_HOST_ALLOWED_PORTS",
            "host.allowed_ports",
        )?;
        override_string(&mut self.host.report_file, "BULWARK_HOST_REPORT_FILE");

        // Daemon
        override_string(&mut self.daemon.daemon_json, "BULWARK_DAEMON_DAEMON_JSON");
        override_csv(
            &mut self.daemon.restart_command,
            "BULWARK_DAEMON_RESTART_COMMAND",
        );
        override_string(&mut self.daemon.report_file, "BULWARK_DAEMON_REPORT_FILE");

        // Network
        override_string(
            &mut self.network.public_network,
            "BULWARK_NETWORK_PUBLIC_NETWORK",
        );
        override_csv(
            &mut self.network.proxy_containers,
            "BULWARK_NETWORK_PROXY_CONTAINERS",
        );
        override_string(&mut self.network.report_file, "BULWARK_NETWORK_REPORT_FILE");

        // Folders: 오버라이드가 있으면 섹션을 생성
        let folder_keys = [
            "BULWARK_FOLDERS_SERVER_ROOT",
            "BULWARK_FOLDERS_PUID",
            "BULWARK_FOLDERS_PGID",
            "BULWARK_FOLDERS_ENV_FILE",
            "BULWARK_FOLDERS_REPORT_FILE",
        ];
        if self.folders.is_none() && folder_keys.iter().any(|k| std::env::var(k).is_ok()) {
            self.folders = Some(FoldersConfig::default());
        }
        if let Some(folders) = self.folders.as_mut() {
            override_opt_string(&mut folders.server_root, "BULWARK_FOLDERS_SERVER_ROOT");
            override_opt_u32(&mut folders.puid, "BULWARK_FOLDERS_PUID", "folders.puid")?;
            override_opt_u32(&mut folders.pgid, "BULWARK_FOLDERS_PGID", "folders.pgid")?;
            override_opt_string(&mut folders.env_file, "BULWARK_FOLDERS_ENV_FILE");
            override_string(&mut folders.report_file, "BULWARK_FOLDERS_REPORT_FILE");
        }
        Ok(())
    }

    /// `folders.env_file`에서 비어 있는 `server_root`/`puid`/`pgid`를 채웁니다.
    ///
    /// 파일이 지정되었는데 없으면 `FileNotFound`, 읽을 수 없으면
    /// (권한, UTF-8 아님) `ReadFailed`를 반환합니다.
    pub async fn apply_env_file(&mut self) -> Result<(), ConfigError> {
        let Some(folders) = self.folders.as_mut() else {
            return Ok(());
        };
        let Some(env_file) = folders.env_file.clone() else {
            return Ok(());
        };
        let content = tokio::fs::read_to_string(&env_file)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                    path: env_file.clone(),
                },
                _ => ConfigError::ReadFailed {
                    path: env_file.clone(),
                    reason: e.to_string(),
                },
            })?;
        let vars = parse_env_file(&content);
        info!(path = %env_file, keys = vars.len(), "env file loaded");

        if folders.server_root.is_none() {
            folders.server_root = vars.get("SERVER_ROOT").cloned();
        }
        if folders.puid.is_none() {
            folders.puid = env_file_id(&vars, "PUID", &env_file)?;
        }
        if folders.pgid.is_none() {
            folders.pgid = env_file_id(&vars, "PGID", &env_file)?;
        }
        Ok(())
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.general.docker_socket.is_empty() {
            return Err(invalid("general.docker_socket", "must not be empty"));
        }

        self.host.validate()?;
        self.daemon.validate()?;
        self.network.validate()?;
        if let Some(folders) = &self.folders {
            folders.validate()?;
        }
        Ok(())
    }

    /// 폴더 도메인에 필요한 값을 확정합니다.
    ///
    /// `folders` 섹션이 없거나 필수 값이 빠져 있으면 키 이름을 담은 에러를 반환합니다.
    pub fn folder_settings(&self) -> Result<FolderSettings, ConfigError> {
        let folders = self.folders.as_ref().ok_or_else(|| ConfigError::MissingKey {
            key: "folders.server_root".to_owned(),
        })?;
        let missing = |key: &str, env_key: &str| match &folders.env_file {
            Some(file) => ConfigError::MissingKey {
                key: format!("{env_key} (in {file})"),
            },
            None => ConfigError::MissingKey {
                key: format!("folders.{key}"),
            },
        };
        let server_root = folders
            .server_root
            .clone()
            .ok_or_else(|| missing("server_root", "SERVER_ROOT"))?;
        let puid = folders.puid.ok_or_else(|| missing("puid", "PUID"))?;
        let pgid = folders.pgid.ok_or_else(|| missing("pgid", "PGID"))?;
        Ok(FolderSettings {
            server_root: PathBuf::from(server_root),
            puid,
            pgid,
            structure: folders.structure.clone(),
            placeholders: folders.placeholders.clone(),
            secrets_dir: folders.secrets_dir.clone(),
            report_file: folders.report_file.clone(),
        })
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// Docker 데몬 소켓 경로
    pub docker_socket: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            docker_socket: "/var/run/docker.sock".to_owned(),
        }
    }
}

/// 호스트 OS 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Docker 운영 계정
    pub docker_user: String,
    /// Docker 소켓 그룹
    pub docker_group: String,
    /// user namespace remap 계정
    pub remap_user: String,
    /// subuid/subgid 시작 값
    pub subid_start: u32,
    /// subuid/subgid 범위 크기
    pub subid_count: u32,
    /// 방화벽에서 허용할 TCP 포트
    pub allowed_ports: Vec<u16>,
    /// `/etc/subuid` 경로
    pub subuid_path: String,
    /// `/etc/subgid` 경로
    pub subgid_path: String,
    /// journald 설정 파일 경로
    pub journald_conf: String,
    /// docker.service override 파일 경로
    pub docker_override_path: String,
    /// dockerd 바이너리 경로
    pub docker_binary: String,
    /// 리포트 파일 경로
    pub report_file: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            docker_user: "doc_user".to_owned(),
            docker_group: "doc_group".to_owned(),
            remap_user: "dockremap".to_owned(),
            subid_start: 100_000,
            subid_count: 65_536,
            allowed_ports: vec![22, 80, 443],
            subuid_path: "/etc/subuid".to_owned(),
            subgid_path: "/etc/subgid".to_owned(),
            journald_conf: "/etc/systemd/journald.conf".to_owned(),
            docker_override_path: "/etc/systemd/system/docker.service.d/override.conf"
                .to_owned(),
            docker_binary: "/usr/bin/dockerd".to_owned(),
            report_file: "/var/log/docker-host-compliance.txt".to_owned(),
        }
    }
}

impl HostConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        validate_account_name("host.docker_user", &self.docker_user)?;
        validate_account_name("host.docker_group", &self.docker_group)?;
        validate_account_name("host.remap_user", &self.remap_user)?;
        if self.subid_count == 0 {
            return Err(invalid("host.subid_count", "must be greater than 0"));
        }
        if self.subid_start.checked_add(self.subid_count).is_none() {
            return Err(invalid(
                "host.subid_count",
                "subid_start + subid_count overflows u32",
            ));
        }
        if self.allowed_ports.contains(&0) {
            return Err(invalid("host.allowed_ports", "port 0 is not allowed"));
        }
        for (field, value) in [
            ("host.subuid_path", &self.subuid_path),
            ("host.subgid_path", &self.subgid_path),
            ("host.journald_conf", &self.journald_conf),
            ("host.docker_override_path", &self.docker_override_path),
            ("host.docker_binary", &self.docker_binary),
        ] {
            validate_absolute(field, value)?;
        }
        validate_report_file("host.report_file", &self.report_file)
    }
}

/// Docker 데몬 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// daemon.json 경로
    pub daemon_json: String,
    /// daemon.json에 있어야 하는 키와 값
    pub settings: serde_json::Map<String, serde_json::Value>,
    /// 설정 변경 후 실행할 재시작 명령 (셸 없이 실행)
    pub restart_command: Vec<String>,
    /// 리포트 파일 경로
    pub report_file: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        let mut settings = serde_json::Map::new();
        settings.insert("userns-remap".to_owned(), "default".into());
        settings.insert("icc".to_owned(), false.into());
        settings.insert("live-restore".to_owned(), true.into());
        settings.insert("no-new-privileges".to_owned(), true.into());
        settings.insert("log-driver".to_owned(), "json-file".into());
        settings.insert(
            "log-opts".to_owned(),
            serde_json::json!({"max-size": "10m", "max-file": "3"}),
        );
        Self {
            daemon_json: "/etc/docker/daemon.json".to_owned(),
            settings,
            restart_command: vec![
                "systemctl".to_owned(),
                "restart".to_owned(),
                "docker".to_owned(),
            ],
            report_file: "/var/log/docker-daemon-compliance.txt".to_owned(),
        }
    }
}

impl DaemonConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        validate_absolute("daemon.daemon_json", &self.daemon_json)?;
        if self.settings.is_empty() {
            return Err(invalid("daemon.settings", "must declare at least one key"));
        }
        if self.settings.values().any(serde_json::Value::is_null) {
            return Err(invalid("daemon.settings", "values must not be null"));
        }
        if self.restart_command.first().is_none_or(|p| p.trim().is_empty()) {
            return Err(invalid("daemon.restart_command", "must name a program"));
        }
        validate_report_file("daemon.report_file", &self.report_file)
    }
}

/// 관리 대상 Docker 네트워크 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// 네트워크 이름
    pub name: String,
    /// 외부와 격리된(internal) 네트워크인지 여부
    #[serde(default)]
    pub internal: bool,
    /// 설명
    #[serde(default)]
    pub description: String,
}

impl NetworkSpec {
    fn new(name: &str, internal: bool, description: &str) -> Self {
        Self {
            name: name.to_owned(),
            internal,
            description: description.to_owned(),
        }
    }
}

/// Docker 네트워크 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// 있어야 하는 네트워크 목록
    pub networks: Vec<NetworkSpec>,
    /// 프록시만 연결되어야 하는 공개 네트워크
    pub public_network: String,
    /// 공개 네트워크에 연결될 수 있는 프록시 컨테이너 이름
    pub proxy_containers: Vec<String>,
    /// 리포트 파일 경로
    pub report_file: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            networks: vec![
                NetworkSpec::new("frontend_net", false, "Public-facing proxy network"),
                NetworkSpec::new("backend_net", true, "Internal application network"),
                NetworkSpec::new("monitoring_net", true, "Internal monitoring network"),
            ],
            public_network: "frontend_net".to_owned(),
            proxy_containers: vec![
                "traefik".to_owned(),
                "nginx".to_owned(),
                "caddy".to_owned(),
            ],
            report_file: "/var/log/docker-network-compliance.txt".to_owned(),
        }
    }
}

impl NetworkConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for net in &self.networks {
            if net.name.is_empty()
                || !net
                    .name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            {
                return Err(invalid(
                    "network.networks",
                    format!("invalid network name '{}'", net.name),
                ));
            }
            if !seen.insert(net.name.as_str()) {
                return Err(invalid(
                    "network.networks",
                    format!("duplicate network '{}'", net.name),
                ));
            }
        }
        if !seen.contains(self.public_network.as_str()) {
            return Err(invalid(
                "network.public_network",
                format!("'{}' is not a declared network", self.public_network),
            ));
        }
        validate_report_file("network.report_file", &self.report_file)
    }

    /// 선언된 네트워크 이름 목록
    pub fn managed_names(&self) -> Vec<String> {
        self.networks.iter().map(|n| n.name.clone()).collect()
    }
}

/// 폴더 구조 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FoldersConfig {
    /// 관리 대상 루트 디렉토리
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_root: Option<String>,
    /// 트리 소유자 UID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub puid: Option<u32>,
    /// 트리 소유 그룹 GID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pgid: Option<u32>,
    /// `SERVER_ROOT`/`PUID`/`PGID`를 담은 KEY=VALUE 파일
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_file: Option<String>,
    /// 루트 아래에 있어야 하는 디렉토리 (상대 경로)
    pub structure: Vec<String>,
    /// 있어야 하는 빈 파일 (상대 경로)
    pub placeholders: Vec<String>,
    /// root 전용으로 잠글 디렉토리 (상대 경로)
    pub secrets_dir: String,
    /// 리포트 파일 경로
    pub report_file: String,
}

impl Default for FoldersConfig {
    fn default() -> Self {
        Self {
            server_root: None,
            puid: None,
            pgid: None,
            env_file: None,
            structure: [
                "apps",
                "secrets",
                "networks",
                "backups/snapshots",
                "backups/databases",
                "backups/restore",
                "scripts",
                "logs/docker",
            ]
            .iter()
            .map(|s| (*s).to_owned())
            .collect(),
            placeholders: vec![
                "compose.yaml".to_owned(),
                "networks/docker-networks.yaml".to_owned(),
            ],
            secrets_dir: "secrets".to_owned(),
            report_file: "/var/log/docker-folder-compliance.txt".to_owned(),
        }
    }
}

impl FoldersConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(root) = &self.server_root {
            validate_absolute("folders.server_root", root)?;
        }
        for entry in self.structure.iter().chain(&self.placeholders) {
            validate_relative("folders.structure", entry)?;
        }
        validate_relative("folders.secrets_dir", &self.secrets_dir)?;
        validate_report_file("folders.report_file", &self.report_file)
    }
}

/// 확정된 폴더 도메인 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderSettings {
    /// 관리 대상 루트 디렉토리
    pub server_root: PathBuf,
    /// 트리 소유자 UID
    pub puid: u32,
    /// 트리 소유 그룹 GID
    pub pgid: u32,
    /// 루트 아래 디렉토리
    pub structure: Vec<String>,
    /// 빈 파일
    pub placeholders: Vec<String>,
    /// root 전용 디렉토리
    pub secrets_dir: String,
    /// 리포트 파일 경로
    pub report_file: String,
}

// --- 검증 헬퍼 ---

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
}

/// useradd/groupadd가 허용하는 이름 규칙
fn validate_account_name(field: &str, name: &str) -> Result<(), ConfigError> {
    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    let rest_ok = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-'));
    if !first_ok || !rest_ok || name.len() > 32 {
        return Err(invalid(
            field,
            format!("'{name}' is not a valid account name"),
        ));
    }
    Ok(())
}

fn validate_absolute(field: &str, path: &str) -> Result<(), ConfigError> {
    if !Path::new(path).is_absolute() {
        return Err(invalid(field, format!("'{path}' must be an absolute path")));
    }
    Ok(())
}

fn validate_relative(field: &str, path: &str) -> Result<(), ConfigError> {
    let p = Path::new(path);
    let escapes = p
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if path.is_empty() || escapes {
        return Err(invalid(
            field,
            format!("'{path}' must be a relative path inside server_root"),
        ));
    }
    Ok(())
}

fn validate_report_file(field: &str, path: &str) -> Result<(), ConfigError> {
    if path.trim().is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    Ok(())
}

// --- env 파일 ---

/// `KEY=VALUE` 형식의 env 파일을 파싱합니다.
///
/// 빈 줄, `#`으로 시작하는 줄, 키가 빈 줄은 무시하고, 값의 앞뒤 공백을 제거합니다.
pub fn parse_env_file(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

fn env_file_id(
    vars: &HashMap<String, String>,
    key: &str,
    file: &str,
) -> Result<Option<u32>, ConfigError> {
    match vars.get(key) {
        None => Ok(None),
        Some(raw) => raw.parse::<u32>().map(Some).map_err(|_| ConfigError::InvalidValue {
            field: format!("{key} (in {file})"),
            reason: format!("'{raw}' is not a numeric id"),
        }),
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_opt_string(target: &mut Option<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = Some(val);
    }
}

fn override_u32(target: &mut u32, env_key: &str, field: &str) -> Result<(), ConfigError> {
    if let Ok(val) = std::env::var(env_key) {
        *target = parse_env_u32(&val, env_key, field)?;
    }
    Ok(())
}

fn override_opt_u32(
    target: &mut Option<u32>,
    env_key: &str,
    field: &str,
) -> Result<(), ConfigError> {
    if let Ok(val) = std::env::var(env_key) {
        *target = Some(parse_env_u32(&val, env_key, field)?);
    }
    Ok(())
}

fn parse_env_u32(val: &str, env_key: &str, field: &str) -> Result<u32, ConfigError> {
    val.trim()
        .parse::<u32>()
        .map_err(|_| invalid(field, format!("{env_key}='{val}' is not an unsigned integer")))
}

fn override_ports(target: &mut Vec<u16>, env_key: &str, field: &str) -> Result<(), ConfigError> {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|port| {
                port.parse::<u16>()
                    .map_err(|_| invalid(field, format!("{env_key}: '{port}' is not a valid port")))
            })
            .collect::<Result<_, _>>()?;
    }
    Ok(())
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split(',').map(|s| s.trim().to_owned()).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_production_values() {
        let config = BulwarkConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.host.docker_user, "doc_user");
        assert_eq!(config.host.docker_group, "doc_group");
        assert_eq!(config.host.subid_start, 100_000);
        assert_eq!(config.host.subid_count, 65_536);
        assert_eq!(config.host.allowed_ports, vec![22, 80, 443]);
        assert_eq!(config.daemon.settings["userns-remap"], "default");
        assert_eq!(config.network.networks.len(), 3);
        assert!(config.folders.is_none());
    }

    #[test]
    fn default_config_passes_validation() {
        BulwarkConfig::default().validate().unwrap();
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = BulwarkConfig::parse("").unwrap();
        assert_eq!(config.host.remap_user, "dockremap");
        assert_eq!(config.network.public_network, "frontend_net");
    }

    #[test]
    fn parse_partial_toml_merges_with_defaults() {
        let toml = r#"
[host]
docker_user = "deploy"
allowed_ports = [22, 8443]

[daemon.settings]
icc = false
"#;
        let config = BulwarkConfig::parse(toml).unwrap();
        assert_eq!(config.host.docker_user, "deploy");
        assert_eq!(config.host.docker_group, "doc_group");
        assert_eq!(config.host.allowed_ports, vec![22, 8443]);
        // 테이블을 지정하면 기본 키 전체를 대체함
        assert_eq!(config.daemon.settings.len(), 1);
    }

    #[test]
    fn parse_networks_and_folders() {
        let toml = r#"
[network]
public_network = "edge"

[[network.networks]]
name = "edge"

[[network.networks]]
name = "db"
internal = true

[folders]
server_root = "/srv/stack"
puid = 1000
pgid = 1000
"#;
        let config = BulwarkConfig::parse(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.network.managed_names(), vec!["edge", "db"]);
        assert!(config.network.networks[1].internal);
        let folders = config.folder_settings().unwrap();
        assert_eq!(folders.server_root, PathBuf::from("/srv/stack"));
        assert_eq!(folders.structure.len(), 8);
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let err = BulwarkConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed { .. }));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = BulwarkConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("general.log_level"));
    }

    #[test]
    fn validate_rejects_shell_metacharacters_in_account() {
        let mut config = BulwarkConfig::default();
        config.host.docker_user = "root; rm -rf /".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("host.docker_user"));
    }

    #[test]
    fn validate_rejects_undeclared_public_network() {
        let mut config = BulwarkConfig::default();
        config.network.public_network = "dmz".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("network.public_network"));
    }

    #[test]
    fn validate_rejects_duplicate_network() {
        let mut config = BulwarkConfig::default();
        config
            .network
            .networks
            .push(NetworkSpec::new("backend_net", false, ""));
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_escaping_structure_entry() {
        let mut config = BulwarkConfig::default();
        let mut folders = FoldersConfig::default();
        folders.structure.push("../etc".to_owned());
        config.folders = Some(folders);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("folders.structure"));
    }

    #[test]
    fn validate_rejects_empty_restart_command() {
        let mut config = BulwarkConfig::default();
        config.daemon.restart_command.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("daemon.restart_command"));
    }

    #[test]
    fn folder_settings_without_section_names_key() {
        let err = BulwarkConfig::default().folder_settings().unwrap_err();
        match err {
            ConfigError::MissingKey { key } => assert_eq!(key, "folders.server_root"),
            other => panic!("expected MissingKey, got {other:?}"),
        }
    }

    #[test]
    fn folder_settings_missing_puid_names_key() {
        let mut config = BulwarkConfig::default();
        config.folders = Some(FoldersConfig {
            server_root: Some("/srv".to_owned()),
            ..FoldersConfig::default()
        });
        let err = config.folder_settings().unwrap_err();
        assert!(err.to_string().contains("folders.puid"));
    }

    #[test]
    fn parse_env_file_skips_comments_and_blank_lines() {
        let vars = parse_env_file("# stack\n\nSERVER_ROOT = /srv/stack\nPUID=1000\nPGID=1000\nnot a pair\n");
        assert_eq!(vars.get("SERVER_ROOT").map(String::as_str), Some("/srv/stack"));
        assert_eq!(vars.get("PUID").map(String::as_str), Some("1000"));
        assert_eq!(vars.len(), 3);
    }

    #[tokio::test]
    async fn env_file_fills_folder_values() {
        let dir = tempfile::tempdir().unwrap();
        let env = dir.path().join(".env");
        std::fs::write(&env, "SERVER_ROOT=/srv/stack\nPUID=1001\nPGID=1002\n").unwrap();
        let mut config = BulwarkConfig::default();
        config.folders = Some(FoldersConfig {
            env_file: Some(env.display().to_string()),
            ..FoldersConfig::default()
        });
        config.apply_env_file().await.unwrap();
        let settings = config.folder_settings().unwrap();
        assert_eq!(settings.puid, 1001);
        assert_eq!(settings.pgid, 1002);
    }

    #[tokio::test]
    async fn env_file_missing_key_names_key_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let env = dir.path().join(".env");
        std::fs::write(&env, "SERVER_ROOT=/srv/stack\nPUID=1001\n").unwrap();
        let mut config = BulwarkConfig::default();
        config.folders = Some(FoldersConfig {
            env_file: Some(env.display().to_string()),
            ..FoldersConfig::default()
        });
        config.apply_env_file().await.unwrap();
        let err = config.folder_settings().unwrap_err().to_string();
        assert!(err.contains("PGID"));
        assert!(err.contains(".env"));
    }

    #[tokio::test]
    async fn env_file_not_found() {
        let mut config = BulwarkConfig::default();
        config.folders = Some(FoldersConfig {
            env_file: Some("/nonexistent/.env".to_owned()),
            ..FoldersConfig::default()
        });
        let err = config.apply_env_file().await.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = BulwarkConfig::from_file("/nonexistent/bulwark.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BulwarkError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn serialize_round_trips_through_toml() {
        let config = BulwarkConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = BulwarkConfig::parse(&text).unwrap();
        assert_eq!(parsed.daemon.settings, config.daemon.settings);
        assert_eq!(parsed.network.networks, config.network.networks);
    }

    #[test]
    #[serial_test::serial]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_BULWARK_STR", "overridden") };
        override_string(&mut val, "TEST_BULWARK_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_BULWARK_STR") };
    }

    #[test]
    #[serial_test::serial]
    fn env_override_ports_rejects_invalid() {
        let mut ports = vec![22];
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_BULWARK_PORTS", "22, 80,99999") };
        let err = override_ports(&mut ports, "TEST_BULWARK_PORTS", "host.allowed_ports")
            .unwrap_err();
        assert!(matches!(
            &err,
            ConfigError::InvalidValue { field, .. } if field == "host.allowed_ports"
        ));
        assert!(err.to_string().contains("99999"));
        assert_eq!(ports, vec![22]);
        unsafe { std::env::set_var("TEST_BULWARK_PORTS", "22, 8080") };
        override_ports(&mut ports, "TEST_BULWARK_PORTS", "host.allowed_ports").unwrap();
        assert_eq!(ports, vec![22, 8080]);
        unsafe { std::env::remove_var("TEST_BULWARK_PORTS") };
    }

    #[test]
    #[serial_test::serial]
    fn env_override_creates_folders_section() {
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("BULWARK_FOLDERS_SERVER_ROOT", "/srv/env") };
        let mut config = BulwarkConfig::default();
        let result = config.apply_env_overrides();
        unsafe { std::env::remove_var("BULWARK_FOLDERS_SERVER_ROOT") };
        result.unwrap();
        let folders = config.folders.expect("folders section created");
        assert_eq!(folders.server_root.as_deref(), Some("/srv/env"));
    }

    #[test]
    #[serial_test::serial]
    fn env_override_subid_start_rejects_garbage() {
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("BULWARK_HOST_SUBID_START", "abc") };
        let mut config = BulwarkConfig::default();
        let result = config.apply_env_overrides();
        unsafe { std::env::remove_var("BULWARK_HOST_SUBID_START") };
        let err = result.unwrap_err();
        assert!(matches!(
            &err,
            ConfigError::InvalidValue { field, .. } if field == "host.subid_start"
        ));
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    #[serial_test::serial]
    fn env_override_opt_u32_parses_and_rejects() {
        let mut puid = Some(1000);
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("TEST_BULWARK_PUID", "1005") };
        override_opt_u32(&mut puid, "TEST_BULWARK_PUID", "folders.puid").unwrap();
        assert_eq!(puid, Some(1005));
        unsafe { std::env::set_var("TEST_BULWARK_PUID", "-1") };
        let err = override_opt_u32(&mut puid, "TEST_BULWARK_PUID", "folders.puid").unwrap_err();
        assert!(err.to_string().contains("folders.puid"));
        assert_eq!(puid, Some(1005));
        unsafe { std::env::remove_var("TEST_BULWARK_PUID") };
    }
}
