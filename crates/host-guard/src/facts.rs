//! 호스트 도메인 팩트 카탈로그
//!
//! [`HostConfig`]로부터 계정, Docker 서비스, 호스트 보안 팩트를
//! 리포트에 표시될 순서대로 선언합니다.

use std::sync::Arc;

use bulwark_core::config::HostConfig;
use bulwark_core::error::CatalogError;
use bulwark_core::fact::{Descriptor, Fact, FactCatalog, Verification};
use bulwark_core::types::FactValue;

use crate::action::{HostAction, Step};
use crate::command::CommandRunner;
use crate::probe::{HostCheck, HostProbe};

/// 리포트 제목
pub const HOST_TITLE: &str = "Docker Host";

const ACCOUNTS: &str = "ACCOUNTS";
const DOCKER_SERVICE: &str = "DOCKER SERVICE";
const HOST_SECURITY: &str = "HOST SECURITY";

/// docker.service override 파일의 기대 내용
pub fn docker_override_content(docker_binary: &str, docker_group: &str) -> String {
    format!("[Service]\nExecStart=\nExecStart={docker_binary} --group={docker_group}\n")
}

/// subuid/subgid 항목
pub fn subid_entry(config: &HostConfig) -> String {
    format!(
        "{}:{}:{}",
        config.remap_user, config.subid_start, config.subid_count
    )
}

struct Builder<R> {
    runner: Arc<R>,
    catalog: FactCatalog,
}

impl<R: CommandRunner> Builder<R> {
    fn fact(
        &mut self,
        descriptor: Descriptor,
        check: HostCheck,
        steps: Vec<Step>,
    ) -> Result<(), CatalogError> {
        self.catalog.register(Fact::new(
            descriptor,
            HostProbe::new(check, self.runner.clone()),
            HostAction::new(steps, self.runner.clone()),
        ))
    }
}

fn must_be_true(section: &str, id: &str) -> Descriptor {
    Descriptor::equals(section, id, FactValue::Bool(true))
}

/// 호스트 도메인 카탈로그를 생성합니다.
pub fn host_catalog<R: CommandRunner>(
    config: &HostConfig,
    runner: Arc<R>,
) -> Result<FactCatalog, CatalogError> {
    let mut b = Builder {
        runner,
        catalog: FactCatalog::new(),
    };
    let user = config.docker_user.as_str();
    let group = config.docker_group.as_str();
    let remap = config.remap_user.as_str();

    // --- ACCOUNTS ---
    b.fact(
        must_be_true(ACCOUNTS, "Docker group exists"),
        HostCheck::GroupExists {
            group: group.to_owned(),
        },
        // 9 = 이미 존재함
        vec![Step::run("groupadd", &[group]).tolerate(9)],
    )?;
    b.fact(
        must_be_true(ACCOUNTS, "Docker user exists"),
        HostCheck::UserExists {
            user: user.to_owned(),
        },
        vec![Step::run("useradd", &["-m", "-s", "/bin/bash", user]).tolerate(9)],
    )?;
    b.fact(
        must_be_true(ACCOUNTS, "Docker user in docker group"),
        HostCheck::UserInGroup {
            user: user.to_owned(),
            group: group.to_owned(),
        },
        vec![Step::run("usermod", &["-aG", group, user])],
    )?;
    b.fact(
        must_be_true(ACCOUNTS, &format!("Remap user ({remap}) exists")),
        HostCheck::UserExists {
            user: remap.to_owned(),
        },
        vec![Step::run(
            "adduser",
            &["--system", "--no-create-home", "--group", remap],
        )],
    )?;
    let entry = subid_entry(config);
    for (id, path) in [
        ("Subuid configured", &config.subuid_path),
        ("Subgid configured", &config.subgid_path),
    ] {
        b.fact(
            must_be_true(ACCOUNTS, id),
            HostCheck::FileHasLine {
                path: path.clone(),
                line: entry.clone(),
            },
            vec![Step::AppendLine {
                path: path.clone(),
                line: entry.clone(),
            }],
        )?;
    }

    // --- DOCKER SERVICE ---
    let override_content = docker_override_content(&config.docker_binary, group);
    b.fact(
        Descriptor::equals(
            DOCKER_SERVICE,
            "Docker service group override",
            FactValue::Text(override_content.clone()),
        ),
        HostCheck::FileContent {
            path: config.docker_override_path.clone(),
        },
        vec![
            Step::WriteFile {
                path: config.docker_override_path.clone(),
                content: override_content,
            },
            Step::run("systemctl", &["daemon-reexec"]),
        ],
    )?;

    // --- HOST SECURITY ---
    b.fact(
        Descriptor::equals(
            HOST_SECURITY,
            "Root login disabled",
            FactValue::Text("L".to_owned()),
        ),
        HostCheck::RootPasswordStatus,
        vec![Step::run("passwd", &["-l", "root"])],
    )?;

    let port_strings: Vec<String> = config.allowed_ports.iter().map(u16::to_string).collect();
    let allow_steps: Vec<Step> = port_strings
        .iter()
        .map(|p| Step::run("ufw", &["allow", p.as_str()]))
        .collect();
    let mut enable_steps = vec![
        Step::run("ufw", &["default", "deny", "incoming"]),
        Step::run("ufw", &["default", "allow", "outgoing"]),
    ];
    enable_steps.extend(allow_steps.iter().cloned());
    enable_steps.push(Step::run("ufw", &["--force", "enable"]));
    b.fact(
        must_be_true(HOST_SECURITY, "Firewall enabled"),
        HostCheck::FirewallActive,
        enable_steps,
    )?;

    if !port_strings.is_empty() {
        let expected_ports = port_strings
            .iter()
            .map(|p| (p.clone(), serde_json::Value::Bool(true)))
            .collect();
        b.fact(
            Descriptor::equals(
                HOST_SECURITY,
                "Firewall allows required ports",
                FactValue::Structured(expected_ports),
            ),
            HostCheck::FirewallAllowedPorts,
            allow_steps,
        )?;
    }

    b.fact(
        must_be_true(HOST_SECURITY, "Fail2ban running"),
        HostCheck::ServiceActive {
            unit: "fail2ban".to_owned(),
        },
        vec![Step::run("systemctl", &["enable", "--now", "fail2ban"])],
    )?;
    b.fact(
        must_be_true(HOST_SECURITY, "Auto updates enabled"),
        HostCheck::ServiceEnabled {
            unit: "unattended-upgrades".to_owned(),
        },
        vec![Step::run(
            "systemctl",
            &["enable", "--now", "unattended-upgrades"],
        )],
    )?;
    // journald 재시작 직후의 재조회는 의미가 없으므로 액션 결과를 신뢰
    b.fact(
        must_be_true(HOST_SECURITY, "Persistent journal storage")
            .verification(Verification::TrustAction),
        HostCheck::FileHasLine {
            path: config.journald_conf.clone(),
            line: "Storage=persistent".to_owned(),
        },
        vec![
            Step::AppendLine {
                path: config.journald_conf.clone(),
                line: "Storage=persistent".to_owned(),
            },
            Step::run("systemctl", &["restart", "systemd-journald"]),
        ],
    )?;

    Ok(b.catalog)
}
