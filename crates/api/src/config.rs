//! Server configuration, read from the environment once at startup.

/// Runtime configuration for the API server.
///
/// - `HOST` / `PORT` — bind address (defaults `0.0.0.0:3000`)
/// - `DATABASE_URL` — PostgreSQL connection string; when unset the
///   server runs on the seeded in-memory store
/// - `RUST_LOG` — tracing filter, consumed directly by the subscriber
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
}

impl Config {
    pub const DEFAULT_HOST: &'static str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 3000;

    /// Reads the configuration from environment variables.
    ///
    /// Unset or unparsable values fall back to the defaults; an invalid
    /// `PORT` is treated as absent rather than an error.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| Self::DEFAULT_HOST.to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(Self::DEFAULT_PORT),
            database_url: std::env::var("DATABASE_URL").ok(),
        }
    }

    /// The `host:port` pair the listener binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
