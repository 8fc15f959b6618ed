use crate::config::DatabaseConfig;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use tracing::info;

/// Opens the MySQL pool described by `config`.
///
/// Establishing the pool acquires a connection, so an unreachable or
/// misconfigured server fails here rather than on the first request.
pub async fn connect(config: &DatabaseConfig) -> Result<MySqlPool, sqlx::Error> {
    let options = connect_options(config);

    info!(
        "Connecting to MySQL at {}:{} (database: {})",
        config.host, config.port, config.name
    );

    let pool = MySqlPoolOptions::new()
        .max_connections(config.pool_size)
        .connect_with(options)
        .await?;

    info!("Database connection established");
    Ok(pool)
}

fn connect_options(config: &DatabaseConfig) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.name)
}
