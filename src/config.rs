use std::env;

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub public_base_url: String,
    pub max_payload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let database_url = match env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                // Start anyway so health checks can report the state instead
                // of a crash loop.
                tracing::warn!(
                    "DATABASE_URL is not set — falling back to sqlite:wishcraft.db. \
                     Set it explicitly for production deployments."
                );
                "sqlite:wishcraft.db".to_string()
            }
        };

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8787);

        Self {
            port,
            database_url,
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{port}")),
            max_payload_bytes: env::var("MAX_PAYLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(52_428_800), // 50 MiB, media arrives base64-encoded in JSON
        }
    }
}
