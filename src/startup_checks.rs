use crate::{
    Config, DEFAULT_AUTH_SECRET,
    auth::{UserDatabase, UserDatabaseError, generate_secret},
    posts::StoreError,
};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create data directory: {0}")]
    DataDirectoryCreationFailed(#[source] std::io::Error),

    #[error("User database could not be read: {0}")]
    UsersDatabaseUnreadable(#[source] UserDatabaseError),

    #[error("User database does not exist: {0}")]
    UsersDatabaseMissing(String),

    #[error("Post store could not be opened: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Auth secret is still the default value")]
    DefaultAuthSecret,
}

impl StartupCheckError {
    /// Critical failures stop the server; the rest are reported and ignored.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            StartupCheckError::DataDirectoryCreationFailed(_)
                | StartupCheckError::UsersDatabaseUnreadable(_)
                | StartupCheckError::StoreUnavailable(_)
        )
    }
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    if let Some(data_file) = &config.storage.data_file {
        match data_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) if !dir.exists() => {
                info!("Data directory does not exist, creating: {:?}", dir);
                if let Err(e) = tokio::fs::create_dir_all(dir).await {
                    error!("Failed to create data directory {:?}: {}", dir, e);
                    errors.push(StartupCheckError::DataDirectoryCreationFailed(e));
                }
            }
            _ => info!("Posts will be stored in {:?}", data_file),
        }
    } else {
        warn!("No data file configured, posts will be lost on shutdown");
    }

    let users_path = &config.users.database;
    if !users_path.exists() {
        warn!("User database does not exist: {:?}", users_path);
        errors.push(StartupCheckError::UsersDatabaseMissing(
            users_path.display().to_string(),
        ));
    } else {
        match UserDatabase::read(users_path).await {
            Ok(db) if db.is_empty() => {
                warn!("User database {:?} has no users", users_path)
            }
            Ok(db) => info!("User database has {} users", db.len()),
            Err(e) => {
                error!("User database {:?} is not readable: {}", users_path, e);
                errors.push(StartupCheckError::UsersDatabaseUnreadable(e));
            }
        }
    }

    if config.app.auth_secret == DEFAULT_AUTH_SECRET {
        warn!(
            "app.auth_secret is the default value; set it to something like {}",
            generate_secret()
        );
        errors.push(StartupCheckError::DefaultAuthSecret);
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}
