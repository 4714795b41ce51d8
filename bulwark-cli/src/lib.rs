//! # bulwark-cli
//!
//! `bulwark` 바이너리의 라이브러리 부분입니다. 통합 테스트에서 명령 핸들러를
//! 직접 호출할 수 있도록 모듈을 공개합니다.
//!
//! ```text
//! Cli::parse() → run() ─┬→ config validate|show
//!                       └→ load config → init_tracing → RunContext → commands::run
//! ```

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;

use bulwark_core::RunContext;
use bulwark_core::config::GeneralConfig;

use crate::cli::{Cli, Commands};
use crate::commands::run::Domain;
use crate::error::CliError;
use crate::output::OutputWriter;

/// Dispatch a parsed command line.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);

    let single = match cli.command {
        Commands::Config(args) => {
            if cli.report.is_some() {
                return Err(CliError::Usage(
                    "--report is not accepted by config commands".to_owned(),
                ));
            }
            logging::init_tracing(&GeneralConfig::default(), cli.log_level.as_deref())?;
            return commands::config::execute(args, cli.config.as_deref(), &writer).await;
        }
        Commands::Host => Some(Domain::Host),
        Commands::Daemon => Some(Domain::Daemon),
        Commands::Network => Some(Domain::Network),
        Commands::Folders => Some(Domain::Folders),
        Commands::All => None,
    };

    let loaded = commands::load_config(cli.config.as_deref()).await?;
    logging::init_tracing(&loaded.config.general, cli.log_level.as_deref())?;
    tracing::info!(source = %loaded.source, mode = %cli.mode, "configuration loaded");

    let domains = single.map_or_else(|| Domain::sequence(&loaded.config), |d| vec![d]);
    let ctx = RunContext::new(cli.mode);
    commands::run::execute(
        &domains,
        &loaded.config,
        &ctx,
        cli.report.as_deref(),
        &writer,
    )
    .await
}
