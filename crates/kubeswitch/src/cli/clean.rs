//! `clean`: remove every materialized kubeconfig.

use super::error::HelpfulError;
use kubeswitch::Materializer;

pub fn run() -> anyhow::Result<()> {
    let materializer = Materializer::new(kubeswitch::paths::switch_tmp_dir());
    let removed = materializer.clean().map_err(|e| {
        HelpfulError::new("Cannot clean materialized kubeconfigs")
            .with_context(e.to_string())
            .with_suggestion(format!(
                "TRY: Check permissions: ls -la {}",
                materializer.dir().display()
            ))
    })?;
    println!("{}", removed);
    Ok(())
}
