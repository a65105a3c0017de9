//! `streampilot`: trigger-driven supervisor for a single stream process.

mod indicator;
mod logging;
mod trigger;

use clap::{Parser, Subcommand};
use colored::Colorize;
use sp_core::command::{supervisor_dir, CommandRunner, ScriptRunner};
use sp_core::config::load_config;
use sp_core::hardware::StatusIndicator;
use sp_core::process::{ProcessProbe, RecordStore, SysinfoProbe};
use sp_core::shutdown::ShutdownSignal;
use sp_core::state::machine::StateMachine;
use sp_core::supervisor::Supervisor;
use sp_protocol::config_models::SupervisorConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "streampilot",
    version,
    about = "Supervises a single stream process toggled by a trigger event"
)]
struct Cli {
    /// Configuration file (default: ./streampilot.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the supervisor (default when no subcommand is given)
    Run,
    /// Print the resolved configuration and exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Run) {
        Command::CheckConfig => {
            print_config(&config);
            Ok(())
        }
        Command::Run => run(config).await,
    }
}

async fn run(config: SupervisorConfig) -> color_eyre::Result<()> {
    let _log_guard = logging::init(&config.log_file)?;
    info!(
        "Stream supervisor starting (stream '{}', command {})",
        config.process_name,
        config.command_path.display()
    );

    let shutdown = ShutdownSignal::new();
    trigger::install_termination_handlers(&shutdown)?;
    let press_source = trigger::signal_press_source()?;

    let records = RecordStore::new(&config.record_file);
    let probe: Arc<dyn ProcessProbe> = Arc::new(SysinfoProbe::new(config.process_name.clone()));
    let runner: Arc<dyn CommandRunner> =
        Arc::new(ScriptRunner::new(&config.command_path, supervisor_dir()));
    let indicator: Arc<dyn StatusIndicator> =
        Arc::new(indicator::FileIndicator::new(indicator_state_path(&config)));

    let machine = Arc::new(StateMachine::new(
        config.clone(),
        runner,
        probe.clone(),
        records.clone(),
        indicator,
        shutdown.clone(),
    ));

    let supervisor = Supervisor::new(
        &config,
        machine,
        probe,
        records,
        Box::new(press_source),
        shutdown,
    );

    supervisor.run().await?;
    info!("Stream supervisor stopped");
    Ok(())
}

/// The indicator state file lives next to the log so an operator can read
/// the believed stream state without hardware attached.
fn indicator_state_path(config: &SupervisorConfig) -> PathBuf {
    match config.log_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join("indicator.state"),
        _ => PathBuf::from("indicator.state"),
    }
}

fn print_config(config: &SupervisorConfig) {
    println!("{}", "Resolved configuration:".bold());
    println!("  log_file = {}", config.log_file.display());
    println!("  record_file = {}", config.record_file.display());
    println!("  trigger_channel = {}", config.trigger_channel);
    println!("  indicator_channel = {}", config.indicator_channel);
    println!("  command_path = {}", config.command_path.display());
    println!("  process_name = {}", config.process_name);
    println!("  peer_host = {}", config.peer_host);
    println!("  peer_port = {}", config.peer_port);
    println!("  health_interval_secs = {}", config.health_interval_secs);
    println!("  connect_timeout_secs = {}", config.connect_timeout_secs);
    println!("  max_start_attempts = {}", config.max_start_attempts);
    println!("  start_timeout_secs = {}", config.start_timeout_secs);
    println!(
        "  start_poll_interval_secs = {}",
        config.start_poll_interval_secs
    );
    println!(
        "  start_poll_timeout_secs = {}",
        config.start_poll_timeout_secs
    );
    println!("  stop_timeout_secs = {}", config.stop_timeout_secs);
    println!(
        "  stop_poll_interval_secs = {}",
        config.stop_poll_interval_secs
    );
    println!("  stop_poll_timeout_secs = {}", config.stop_poll_timeout_secs);
    println!("  stuck_interval_secs = {}", config.stuck_interval_secs);
    println!("  stuck_timeout_secs = {}", config.stuck_timeout_secs);
    println!("  debounce_window_ms = {}", config.debounce_window_ms);
    println!(
        "  resource_threshold_pct = {}",
        config.resource_threshold_pct
    );
    println!("  shutdown_grace_secs = {}", config.shutdown_grace_secs);
}
