//! `hooks`: run configured hooks that are due.

use super::error::HelpfulError;
use clap::Args;
use kubeswitch::config::{HookOptions, HookSettings};
use kubeswitch::hooks::{CommandExecutor, HookRun, HookScheduler, HookStateStore};
use kubeswitch::{Environment, SwitchConfig};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Args)]
pub struct HooksArgs {
    /// Only evaluate this hook
    #[arg(long)]
    pub hook_name: Option<String>,

    /// Run regardless of the configured interval (off by default)
    #[arg(long)]
    pub run_immediately: bool,

    /// Directory holding the hook state file
    #[arg(long)]
    pub state_directory: Option<PathBuf>,
}

pub async fn run(args: &HooksArgs, config_path: &Path) -> anyhow::Result<()> {
    let env = Environment::from_process();
    let config = SwitchConfig::load(config_path)
        .map_err(|e| HelpfulError::configuration(&e, config_path))?;
    let options = HookOptions {
        hook_name: args.hook_name.clone(),
        run_immediately: args.run_immediately,
        state_directory: args.state_directory.clone(),
    };
    let settings = HookSettings::resolve(&options, &config, &env)
        .map_err(|e| HelpfulError::configuration(&e, config_path))?;

    if settings.hooks.is_empty() {
        tracing::info!("No hooks configured in {}", config_path.display());
        return Ok(());
    }

    let scheduler = HookScheduler::new(HookStateStore::new(&settings.state_dir), CommandExecutor);
    let runs = scheduler
        .run(&settings.hooks, settings.run_immediately)
        .await
        .map_err(|e| HelpfulError::hook_state(&e))?;

    for run in &runs {
        match run {
            HookRun::Skipped { name, next_due_at } => {
                eprintln!("{}: not due until {}", name, next_due_at)
            }
            HookRun::Ran { name, result: Ok(()), .. } => eprintln!("{}: ok", name),
            HookRun::Ran { name, result: Err(e), .. } => eprintln!("{}: failed ({})", name, e),
        }
    }

    let failed: Vec<String> = runs
        .iter()
        .filter(|r| r.failed())
        .map(|r| r.name().to_string())
        .collect();
    if !failed.is_empty() {
        return Err(HelpfulError::hooks_failed(&failed).into());
    }
    Ok(())
}
