pub mod entities;
pub mod error;
pub mod models;
pub mod schema;
pub mod services;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;
use tracing::{error, info, warn};

/// Connects to the database, retrying a fixed number of times with a fixed
/// delay between attempts. Each attempt must also answer a ping.
pub async fn connect_with_retry(
    database_url: &str,
    max_connections: u32,
    retries: u32,
    retry_interval: Duration,
) -> Result<DatabaseConnection, DbErr> {
    let mut last_err = DbErr::Custom("no connection attempt was made".to_string());

    for attempt in 1..=retries {
        let mut opt = ConnectOptions::new(database_url.to_owned());
        opt.max_connections(max_connections).sqlx_logging(false);

        let result = match Database::connect(opt).await {
            Ok(db) => db.ping().await.map(|_| db),
            Err(e) => Err(e),
        };

        match result {
            Ok(db) => {
                info!(attempt, "Connected to the database.");
                return Ok(db);
            }
            Err(e) => {
                warn!(attempt, retries, error = %e, "Database is not reachable yet.");
                last_err = e;
                if attempt < retries {
                    tokio::time::sleep(retry_interval).await;
                }
            }
        }
    }

    error!(retries, "Giving up on the database connection.");
    Err(last_err)
}
