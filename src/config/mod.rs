mod server;

use std::path::Path;

pub use server::ServerConfig;

use crate::error::{Error, Result};

pub const CONFIG_FILE_NAME: &str = "stockyard.toml";

/// Loads `stockyard.toml` from the data directory, falling back to defaults
/// when the file does not exist. `data_dir` always wins over the file's value.
pub fn load(data_dir: &Path) -> Result<ServerConfig> {
    let path = data_dir.join(CONFIG_FILE_NAME);

    let mut config = if path.exists() {
        let content = std::fs::read_to_string(&path)?;
        toml::from_str::<ServerConfig>(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?
    } else {
        ServerConfig::default()
    };

    config.data_dir = data_dir.to_path_buf();
    Ok(config)
}
