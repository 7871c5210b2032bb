mod admin;
mod commands;
mod info;

pub use admin::{run_init, run_seed_invites};
pub use commands::AdminCommands;
pub use info::run_info;

use std::path::Path;

use crate::config;
use crate::store::SqliteStore;

/// Initialize store from data directory, checking it exists
pub fn init_store(data_dir: &str) -> anyhow::Result<SqliteStore> {
    let config = config::load(Path::new(data_dir))?;
    let db_path = config.db_path();

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'stockyard admin init' first.",
            db_path.display()
        );
    }

    SqliteStore::new(&db_path).map_err(Into::into)
}
