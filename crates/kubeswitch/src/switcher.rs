//! The switch flow: registry → discovery → selection → fetch → materialize.

use crate::config::SwitchSettings;
use crate::discovery::{Discovery, Picker, Previewer, Selection};
use crate::error::{DiscoveryError, Result, SwitchError};
use crate::materialize::{ActiveSwitch, Materializer};
use crate::store::{StoreFactory, StoreRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// `warnings` are the PathSpecs that failed to enumerate while others
    /// still produced the candidate that was picked.
    Switched {
        active: ActiveSwitch,
        warnings: Vec<DiscoveryError>,
    },
    /// Operator aborted selection; nothing was written.
    Aborted,
}

pub async fn run_switch(
    settings: &SwitchSettings,
    factory: Box<dyn StoreFactory>,
    picker: &mut dyn Picker,
) -> Result<SwitchOutcome> {
    let mut registry = StoreRegistry::new(factory);
    registry.register_all(settings.path_specs.iter().cloned())?;

    let (candidates, warnings) = Discovery::discover(&registry).await.into_candidates()?;

    let selection = {
        let mut previewer = Previewer::new(&registry, settings.show_preview);
        picker
            .select(&candidates, &mut previewer)
            .await
            .map_err(SwitchError::Picker)?
    };

    let candidate = match selection {
        Selection::Selected(candidate) => candidate,
        Selection::Aborted => {
            tracing::info!("Selection aborted");
            return Ok(SwitchOutcome::Aborted);
        }
    };

    let kubeconfig = registry.fetch(&candidate).await?;
    let active = Materializer::new(&settings.tmp_dir)
        .materialize_candidate(&candidate, &kubeconfig.content)?;
    Ok(SwitchOutcome::Switched { active, warnings })
}
