//! `bulwark host|daemon|network|folders|all` command handler
//!
//! Each domain run follows the same lifecycle:
//! privilege check → catalog → report file (truncate) → reconcile → finish.
//! A domain-level abort stops `all` before the next domain starts.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use bulwark_core::config::BulwarkConfig;
use bulwark_core::{FactCatalog, Reconciler, Report, ReportSink, RunContext};
use bulwark_docker::{
    BollardDockerClient, DAEMON_TITLE, DockerClient, NETWORK_TITLE, daemon_catalog,
    network_catalog,
};
use bulwark_host::{
    CommandRunner, FOLDERS_TITLE, HOST_TITLE, SystemCommandRunner, folder_catalog, host_catalog,
};

use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Reconciliation domains in `all` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Host,
    Daemon,
    Network,
    Folders,
}

impl Domain {
    /// Domain name used in logs, metrics and privilege errors.
    pub fn name(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Daemon => "daemon",
            Self::Network => "network",
            Self::Folders => "folders",
        }
    }

    /// Report title.
    pub fn title(self) -> &'static str {
        match self {
            Self::Host => HOST_TITLE,
            Self::Daemon => DAEMON_TITLE,
            Self::Network => NETWORK_TITLE,
            Self::Folders => FOLDERS_TITLE,
        }
    }

    /// Domains run by `bulwark all`: folders only when configured.
    pub fn sequence(config: &BulwarkConfig) -> Vec<Self> {
        let mut domains = vec![Self::Host, Self::Daemon, Self::Network];
        if config.folders.is_some() {
            domains.push(Self::Folders);
        }
        domains
    }
}

/// Probe/action backends shared by every domain of a run.
pub struct Backends<R, D> {
    pub runner: Arc<R>,
    pub docker: Arc<D>,
}

impl Backends<SystemCommandRunner, BollardDockerClient> {
    /// Real command runner and Docker client from configuration.
    pub fn system(config: &BulwarkConfig) -> Self {
        Self {
            runner: Arc::new(SystemCommandRunner),
            docker: Arc::new(BollardDockerClient::new(&config.general.docker_socket)),
        }
    }
}

impl<R: CommandRunner, D: DockerClient> Backends<R, D> {
    /// Build the domain's fact catalog and default report path.
    fn catalog(
        &self,
        domain: Domain,
        config: &BulwarkConfig,
    ) -> Result<(FactCatalog, PathBuf), CliError> {
        let built = match domain {
            Domain::Host => (
                host_catalog(&config.host, self.runner.clone())?,
                PathBuf::from(&config.host.report_file),
            ),
            Domain::Daemon => (
                daemon_catalog(&config.daemon, self.docker.clone(), self.runner.clone())?,
                PathBuf::from(&config.daemon.report_file),
            ),
            Domain::Network => (
                network_catalog(&config.network, self.docker.clone())?,
                PathBuf::from(&config.network.report_file),
            ),
            Domain::Folders => {
                let settings = config.folder_settings()?;
                (
                    folder_catalog(&settings)?,
                    PathBuf::from(&settings.report_file),
                )
            }
        };
        Ok(built)
    }
}

/// Run one domain and return its finished report.
///
/// # Errors
///
/// Aborts with `Privilege`, `Config`, `Catalog` or `Report` before any fact
/// is evaluated; per-fact failures only show up inside the report.
pub async fn run_domain<R: CommandRunner, D: DockerClient>(
    domain: Domain,
    config: &BulwarkConfig,
    ctx: &RunContext,
    backends: &Backends<R, D>,
    report_override: Option<&Path>,
    writer: &OutputWriter,
) -> Result<Report, CliError> {
    ctx.require_privilege(domain.name())?;

    let (catalog, default_path) = backends.catalog(domain, config)?;
    let path = report_override.map_or(default_path, Path::to_path_buf);

    info!(
        domain = domain.name(),
        mode = %ctx.mode,
        facts = catalog.len(),
        report = %path.display(),
        "starting domain run"
    );

    let (stream, style) = writer.report_stream();
    let mut sink = ReportSink::create(&path, domain.title(), ctx, stream, style)?;
    Reconciler::new(ctx, domain.name())
        .run(&catalog, &mut sink)
        .await?;
    Ok(sink.finish()?)
}

/// Run the given domains in order, stopping at the first abort.
pub async fn run_domains<R: CommandRunner, D: DockerClient>(
    domains: &[Domain],
    config: &BulwarkConfig,
    ctx: &RunContext,
    backends: &Backends<R, D>,
    report_override: Option<&Path>,
    writer: &OutputWriter,
) -> Result<Vec<Report>, CliError> {
    if report_override.is_some() && domains.len() > 1 {
        return Err(CliError::Usage(
            "--report applies to single-domain commands only".to_owned(),
        ));
    }
    let mut reports = Vec::with_capacity(domains.len());
    for &domain in domains {
        reports.push(run_domain(domain, config, ctx, backends, report_override, writer).await?);
    }
    Ok(reports)
}

/// Execute a domain command with real backends and render the outcome.
///
/// Returns `CliError::Findings` when any report contains a FAIL line.
pub async fn execute(
    domains: &[Domain],
    config: &BulwarkConfig,
    ctx: &RunContext,
    report_override: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let backends = Backends::system(config);
    let reports = run_domains(domains, config, ctx, &backends, report_override, writer).await?;
    let outcome = RunOutcome { reports };
    writer.render(&outcome)?;
    outcome.into_result()
}

/// Completed reports of one invocation.
#[derive(Debug, serde::Serialize)]
#[serde(transparent)]
pub struct RunOutcome {
    pub reports: Vec<Report>,
}

impl RunOutcome {
    /// Total FAIL lines across all reports.
    pub fn failed(&self) -> usize {
        self.reports.iter().map(|r| r.summary.failed).sum()
    }

    /// Map findings to the process result.
    pub fn into_result(self) -> Result<(), CliError> {
        match self.failed() {
            0 => Ok(()),
            failed => Err(CliError::Findings { failed }),
        }
    }
}

impl Render for RunOutcome {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        // 리포트 본문은 실행 중 이미 스트리밍됨
        writeln!(w)?;
        for report in &self.reports {
            let path = report
                .path
                .as_ref()
                .map_or_else(|| "(memory)".to_owned(), |p| p.display().to_string());
            let verdict = if report.has_failures() {
                "NON-COMPLIANT".red().bold()
            } else {
                "COMPLIANT".green().bold()
            };
            writeln!(w, "{}: {} (report: {})", report.title.bold(), verdict, path)?;
        }
        Ok(())
    }
}
