//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use kubeswitch::hooks::HookStateError;
use kubeswitch::{ConfigurationError, DiscoveryError, SwitchError};
use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(mut self, suggestions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    pub fn configuration(err: &ConfigurationError, config_path: &Path) -> Self {
        let base = Self::new(err.to_string());
        match err {
            ConfigurationError::Read { .. } | ConfigurationError::Parse { .. } => base
                .with_context(format!("Loading {}", config_path.display()))
                .with_suggestions([
                    format!("TRY: Check the file: cat {}", config_path.display()),
                    "TRY: Point at another file with --config-path".to_string(),
                ]),
            ConfigurationError::UnknownStoreKind(_) => {
                base.with_suggestion("TRY: Use 'filesystem' or 'vault' as the store")
            }
            ConfigurationError::InvalidNameFilter { .. } => base.with_suggestions([
                "TRY: Patterns support '*' and '?', e.g. --kubeconfig-name '*.yaml'",
                "TRY: Quote the pattern so the shell does not expand it",
            ]),
            ConfigurationError::MissingVaultAddress => base.with_suggestions([
                "TRY: export VAULT_ADDR=https://vault.example.com:8200",
                "TRY: Pass --vault-api-address",
                "TRY: Set vaultAPIAddress in the config file",
            ]),
            ConfigurationError::MissingVaultToken { .. } => base.with_suggestions([
                "TRY: vault login",
                "TRY: export VAULT_TOKEN=<token>",
            ]),
            ConfigurationError::InvalidHook { .. } | ConfigurationError::UnknownHook(_) => base
                .with_context(format!("Hooks are configured in {}", config_path.display()))
                .with_suggestion("TRY: Check the 'hooks' section of the config file"),
            ConfigurationError::EmptyLocation(_)
            | ConfigurationError::NoHomeDirectory
            | ConfigurationError::VaultClient(_) => base,
        }
    }

    pub fn no_candidates(errors: &[DiscoveryError]) -> Self {
        let mut err = Self::new("No kubeconfig files found");
        if errors.is_empty() {
            err = err.with_context("Every configured path was searched without a match");
        } else {
            let causes: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            err = err.with_context(causes.join("; "));
        }
        err.with_suggestions([
            "TRY: Check --kubeconfig-path and the kubeconfigPaths in the config file",
            "TRY: Widen the name filter, e.g. --kubeconfig-name '*'",
            "TRY: Run with --verbose to see which paths were searched",
        ])
    }

    pub fn switch(err: SwitchError, config_path: &Path) -> Self {
        match err {
            SwitchError::Configuration(e) => Self::configuration(&e, config_path),
            SwitchError::NoCandidates { errors } => Self::no_candidates(&errors),
            SwitchError::Fetch(e) => Self::new(format!("Cannot load kubeconfig '{}'", e.id))
                .with_context(e.cause)
                .with_suggestion("TRY: Check that the file or secret still exists and is readable"),
            SwitchError::Materialize(e) => Self::new("Cannot write the selected kubeconfig")
                .with_context(e.to_string())
                .with_suggestion("TRY: Check permissions of the kubeswitch home (KUBESWITCH_HOME or ~/.kube)"),
            SwitchError::Picker(e) => Self::new("Interactive selection failed")
                .with_context(e.to_string())
                .with_suggestion("TRY: Run from an interactive terminal"),
        }
    }

    pub fn hook_state(err: &HookStateError) -> Self {
        Self::new("Cannot persist hook state")
            .with_context(err.to_string())
            .with_suggestion("TRY: Choose another directory with --state-directory")
    }

    pub fn hooks_failed(failed: &[String]) -> Self {
        Self::new(format!("{} hook(s) failed: {}", failed.len(), failed.join(", ")))
            .with_suggestion("TRY: Run with --verbose to see hook output")
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}
