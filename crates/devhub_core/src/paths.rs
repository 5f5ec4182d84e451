use std::path::PathBuf;

/// DevHub home directory (~/.devhub)
pub fn devhub_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
        .join(".devhub")
}

/// Path of the JSON configuration file
pub fn config_json_path() -> PathBuf {
    devhub_dir().join("config.json")
}

/// Default location of the persisted token pair
pub fn token_store_path() -> PathBuf {
    devhub_dir().join("tokens.json")
}

/// Make sure the DevHub home directory exists
pub fn ensure_devhub_dir() -> std::io::Result<PathBuf> {
    let dir = devhub_dir();
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
