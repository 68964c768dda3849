//! Command dispatch

use std::future::Future;
use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::CommandFactory;
use tokio::io::AsyncReadExt;
use tracing::{debug, instrument, warn};

use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output::{self, TerminalStatus};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub async fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Submit {
            file,
            output,
            print_tree,
        }) => submit(cli, file.as_deref(), output.as_deref(), *print_tree).await,
        Some(Commands::Sample) => sample(cli).await,
        Some(Commands::Config { command }) => config(cli, command),
        Some(Commands::Completion { shell }) => {
            clap_complete::generate(*shell, &mut Cli::command(), "astviz", &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage("no command given, see `astviz --help`".into())),
    }
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    Ok(Settings::load(cli.config.as_deref())?)
}

fn container(settings: Settings) -> CliResult<ServiceContainer> {
    Ok(ServiceContainer::new(settings, Some(Arc::new(TerminalStatus)))?)
}

async fn read_source(file: &Path) -> CliResult<String> {
    if file == Path::new("-") {
        let mut source = String::new();
        tokio::io::stdin()
            .read_to_string(&mut source)
            .await
            .map_err(|e| InfraError::io("read stdin", e))?;
        return Ok(source);
    }
    tokio::fs::read_to_string(file)
        .await
        .map_err(|e| InfraError::io(format!("read {}", file.display()), e).into())
}

#[instrument(skip(cli))]
async fn submit(cli: &Cli, file: Option<&Path>, output: Option<&Path>, print_tree: bool) -> CliResult<()> {
    let mut settings = load_settings(cli)?;
    if let Some(path) = output {
        settings.render.output = path.to_path_buf();
    }
    let services = container(settings)?;

    let source = match file {
        Some(path) => read_source(path).await?,
        // unavailable sample leaves the input empty
        None => services.sample.load().await.unwrap_or_default(),
    };

    let submission = services.controller.submit(&source);
    tokio::pin!(submission);
    let finished = tokio::select! {
        result = &mut submission => Some(result),
        _ = interrupted(tokio::signal::ctrl_c()) => None,
    };
    let result = match finished {
        Some(result) => result,
        None => {
            // let the run observe the cancellation and unwind
            services.controller.cancel();
            submission.await
        }
    };
    let rendered = result?;
    debug!(
        "submit: generation {}, trace entries {}",
        rendered.generation,
        rendered.trace.entry_count()
    );

    output::action("Wrote", &services.settings.render.output.display());
    if print_tree {
        output::info(&rendered.tree.to_termtree());
    }
    Ok(())
}

/// Resolves when the user interrupts. Never resolves if the signal handler
/// cannot be installed, so the run is left to finish on its own.
async fn interrupted(signal: impl Future<Output = io::Result<()>>) {
    match signal.await {
        Ok(()) => debug!("interrupted"),
        Err(e) => {
            warn!("cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

async fn sample(cli: &Cli) -> CliResult<()> {
    let services = container(load_settings(cli)?)?;
    match services.sample.load().await {
        Some(code) => output::info(&code),
        None => output::warning("no sample source available"),
    }
    Ok(())
}

fn config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            output::header("Config files (lowest to highest precedence)");
            let global = global_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(no config directory)".into());
            output::action("global", &global);
            let local = cli.config.clone().unwrap_or_else(local_config_path);
            output::action("local", &local.display());
            output::action("env", "ASTVIZ_<SECTION>__<KEY>");
        }
    }
    Ok(())
}
