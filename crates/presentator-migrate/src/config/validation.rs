//! Configuration validation.

use super::Config;
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Target validation
    if config.target.data_dir.as_os_str().is_empty() {
        return Err(MigrateError::Config("target.data_dir is required".into()));
    }
    let database = config.target.database_path();
    if !database.is_file() {
        return Err(MigrateError::Config(format!(
            "target database {} does not exist",
            database.display()
        )));
    }

    // Source validation
    if config.source.connection.trim().is_empty() {
        return Err(MigrateError::Config("source.connection is required".into()));
    }
    if let Some(0) = config.source.max_connections {
        return Err(MigrateError::Config(
            "source.max_connections must be at least 1".into(),
        ));
    }

    // Storage validation
    match (&config.storage.local, &config.storage.s3) {
        (None, None) => {
            return Err(MigrateError::Config(
                "either storage.local or storage.s3 must be set".into(),
            ));
        }
        (Some(_), Some(_)) => {
            return Err(MigrateError::Config(
                "only one of storage.local or storage.s3 can be set".into(),
            ));
        }
        (Some(local), None) if local.as_os_str().is_empty() => {
            return Err(MigrateError::Config("storage.local cannot be empty".into()));
        }
        (None, Some(s3)) if s3.bucket.is_empty() => {
            return Err(MigrateError::Config("storage.s3.bucket is required".into()));
        }
        _ => {}
    }

    // Migration config validation - only check if explicitly set
    if let Some(0) = config.migration.page_size {
        return Err(MigrateError::Config(
            "migration.page_size must be at least 1".into(),
        ));
    }
    if let Some(0) = config.migration.blob_concurrency {
        return Err(MigrateError::Config(
            "migration.blob_concurrency must be at least 1".into(),
        ));
    }

    Ok(())
}
