//! Admin command - platform administrator accounts.
//!
//! Admins are never created over HTTP; signup only produces store owners.

use std::sync::Arc;

use crate::cli::args::{AdminAction, AdminArgs};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::{Cache, Database, Persistence};
use crate::services::{AuthService, Authenticator};

/// Execute the admin command
pub async fn execute(args: AdminArgs, config: Config) -> AppResult<()> {
    match args.action {
        AdminAction::Create {
            email,
            password,
            name,
        } => {
            let db = Database::connect(&config)
                .await
                .map_err(|e| AppError::internal(format!("Database connection failed: {}", e)))?;
            let cache = Cache::connect(&config)
                .await
                .map_err(|e| AppError::internal(format!("Redis connection failed: {}", e)))?;

            let auth = Authenticator::new(
                Arc::new(Persistence::new(db.get_connection())),
                Arc::new(cache),
                config,
            );
            let admin = auth.create_admin(email, password, name).await?;

            tracing::info!(admin_id = %admin.id, "Platform admin created");
            println!("Created admin {} ({})", admin.email, admin.id);
        }
    }

    Ok(())
}
