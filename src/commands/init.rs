//! Init command - write the default config and create the database

use crate::config::Config;
use crate::db::Store;
use crate::error::{Error, Result};
use std::path::PathBuf;
use tracing::info;

/// Initialize configuration and database under the base directory
pub async fn cmd_init(base_dir: Option<PathBuf>, force: bool) -> Result<Config> {
    let config = Config::with_base_dir(base_dir);

    if config.is_initialized() && !force {
        return Err(Error::AlreadyInitialized(
            config.paths.base_dir.display().to_string(),
        ));
    }

    config.validate()?;
    config.save()?;

    // Opening the store creates the database file and schema
    let store = Store::connect(&config).await?;
    store.close().await;

    info!(base_dir = %config.paths.base_dir.display(), "Initialized portalsync");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_config_and_database() {
        let tmp = TempDir::new().unwrap();
        let config = cmd_init(Some(tmp.path().to_path_buf()), false).await.unwrap();

        assert!(config.paths.config_file.exists());
        assert!(config.paths.db_file.exists());

        let store = Store::connect(&config).await.unwrap();
        assert!(store.is_initialized().await.unwrap());
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let tmp = TempDir::new().unwrap();
        cmd_init(Some(tmp.path().to_path_buf()), false).await.unwrap();

        let err = cmd_init(Some(tmp.path().to_path_buf()), false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyInitialized(_)));

        // --force allows reinitialization
        cmd_init(Some(tmp.path().to_path_buf()), true).await.unwrap();
    }
}
