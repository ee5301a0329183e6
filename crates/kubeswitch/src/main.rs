//! kubeswitch
//!
//! Pick a kubeconfig from every configured store and print the path of a
//! session-scoped copy:
//!
//! ```text
//! export KUBECONFIG=$(kubeswitch)
//! ```

use clap::{Parser, Subcommand};
use cli::error::HelpfulError;
use cli::hooks::HooksArgs;
use cli::switch::SwitchArgs;
use kubeswitch_logging::LogConfig;
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "kubeswitch", version, about = "Discover kubeconfigs and switch the active one")]
struct Cli {
    #[command(flatten)]
    switch: SwitchArgs,

    /// Path to switch-config.yaml (default: ~/.kube/switch-config.yaml)
    #[arg(long, global = true)]
    config_path: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Remove every materialized kubeconfig and print the count
    Clean,

    /// Run configured hooks whose interval has elapsed
    Hooks(HooksArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let picker_mode = cli.command.is_none();
    let _log_guard = kubeswitch_logging::init_logging(LogConfig {
        app_name: "kubeswitch",
        verbose: cli.verbose,
        picker_mode,
    });

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("ERROR: failed to start async runtime: {}", err);
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run_command(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<HelpfulError>() {
                Some(helpful) => eprint!("{}", helpful),
                None => eprintln!("ERROR: {:#}", err),
            }
            ExitCode::from(1)
        }
    }
}

async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli::config_path(cli.config_path.as_deref());
    tracing::debug!("Using config file {}", config_path.display());

    match &cli.command {
        None => cli::switch::run(&cli.switch, &config_path).await,
        Some(Commands::Clean) => cli::clean::run(),
        Some(Commands::Hooks(args)) => cli::hooks::run(args, &config_path).await,
    }
}
