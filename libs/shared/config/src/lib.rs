use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            database_path: env::var("CLINIC_DATABASE_PATH")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_DATABASE_PATH not set, using ./clinic.db");
                    "clinic.db".to_string()
                }),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(|| {
                    warn!("PORT not set or invalid, using 3000");
                    3000
                }),
        };

        config
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: "clinic.db".to_string(),
            port: 3000,
        }
    }
}
