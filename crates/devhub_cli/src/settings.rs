use anyhow::{bail, Context, Result};
use colored::Colorize;
use devhub_core::{paths, Config};

pub fn show(config: &Config) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    println!(
        "{} {}",
        "token store:".dimmed(),
        config.token_store_path().display()
    );
    Ok(())
}

pub fn init(config: &Config, force: bool) -> Result<()> {
    let path = paths::config_json_path();
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    paths::ensure_devhub_dir().context("Failed to create ~/.devhub")?;
    let contents = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("{} {}", "Wrote".green(), path.display());
    Ok(())
}
