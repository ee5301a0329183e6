//! Default command: pick a kubeconfig and print the materialized path.

use super::error::HelpfulError;
use super::picker::TerminalPicker;
use clap::Args;
use kubeswitch::store::DefaultStoreFactory;
use kubeswitch::{run_switch, Environment, SwitchConfig, SwitchOptions, SwitchOutcome, SwitchSettings};
use std::path::Path;

#[derive(Debug, Clone, Args)]
pub struct SwitchArgs {
    /// Additional search root (directory, file or Vault key prefix)
    #[arg(long)]
    pub kubeconfig_path: Option<String>,

    /// Store of --kubeconfig-path: filesystem or vault
    #[arg(long, default_value = "filesystem")]
    pub store: String,

    /// Glob matched against kubeconfig file or secret names [default: config]
    #[arg(long)]
    pub kubeconfig_name: Option<String>,

    /// Show a preview of the highlighted kubeconfig
    #[arg(long, default_value = "true", action = clap::ArgAction::Set)]
    pub show_preview: bool,

    /// Vault API address (overrides VAULT_ADDR and the config file)
    #[arg(long)]
    pub vault_api_address: Option<String>,
}

impl SwitchArgs {
    pub fn to_options(&self) -> SwitchOptions {
        SwitchOptions {
            kubeconfig_path: self.kubeconfig_path.clone(),
            store: self.store.clone(),
            kubeconfig_name: self.kubeconfig_name.clone(),
            show_preview: self.show_preview,
            vault_api_address: self.vault_api_address.clone(),
        }
    }
}

pub async fn run(args: &SwitchArgs, config_path: &Path) -> anyhow::Result<()> {
    let env = Environment::from_process();
    let config = SwitchConfig::load(config_path)
        .map_err(|e| HelpfulError::configuration(&e, config_path))?;
    let settings = SwitchSettings::resolve(&args.to_options(), &config, &env)
        .map_err(|e| HelpfulError::configuration(&e, config_path))?;

    for spec in &settings.path_specs {
        tracing::debug!(path_spec = %spec, filter = %spec.name_filter, "Searching");
    }

    let factory = DefaultStoreFactory::new(settings.vault.clone());
    let mut picker = TerminalPicker::new();

    match run_switch(&settings, Box::new(factory), &mut picker).await {
        Ok(SwitchOutcome::Switched { active, warnings }) => {
            if !warnings.is_empty() {
                eprintln!(
                    "WARNING: {} configured path(s) could not be searched; run with --verbose for details",
                    warnings.len()
                );
            }
            println!("{}", active.temp_file_path.display());
            Ok(())
        }
        Ok(SwitchOutcome::Aborted) => Ok(()),
        Err(err) => Err(HelpfulError::switch(err, config_path).into()),
    }
}
