use std::path::Path;

use anyhow::Result;
use triage_config::TriageConfig;
use triage_store::Store;

/// `triage init setup`: create the data directory layout (§6 "Persisted
/// state layout") and write a default config file if one doesn't exist yet.
pub(crate) async fn run_setup(config_path: &Path, config: &TriageConfig) -> Result<()> {
    let data_dir = Path::new(&config.store.data_dir);
    std::fs::create_dir_all(data_dir.join("logs"))?;
    std::fs::create_dir_all(data_dir.join("briefs"))?;
    Store::open(data_dir)?;

    if !config_path.exists() {
        config.save_to(config_path)?;
        println!("wrote default config to {}", config_path.display());
    }

    println!("initialized triage store at {}", data_dir.display());
    Ok(())
}
