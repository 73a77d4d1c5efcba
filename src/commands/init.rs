use anyhow::Result;
use std::path::PathBuf;
use warcsift::config::{Config, DEFAULT_CONFIG_FILE};

pub fn init_config(path: PathBuf, force: bool) -> Result<()> {
    let config_path = path.join(DEFAULT_CONFIG_FILE);
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    std::fs::create_dir_all(&path)?;
    let content = format!("# warcsift configuration\n\n{}", Config::default().to_toml()?);
    std::fs::write(&config_path, content)?;

    println!("Created configuration at {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Pick a crawl and groups under [corpus]");
    println!("  2. Optionally set [filter] bloom_filter and scoring_models");
    println!("  3. Run: warcsift create");
    Ok(())
}
