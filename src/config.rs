use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://circdesk.db?mode=rwc".to_string());

        Self {
            database_url,
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(Vec::new),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    // Environment variables are process-global, so these run serialized.
    fn clear_env() {
        unsafe {
            env::remove_var("DATABASE_URL");
            env::remove_var("PORT");
            env::remove_var("CORS_ALLOWED_ORIGINS");
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        clear_env();

        let config = Config::from_env();
        assert_eq!(config.database_url, "sqlite://circdesk.db?mode=rwc");
        assert_eq!(config.port, 8080);
        assert!(config.cors_allowed_origins.is_empty());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        unsafe {
            env::set_var("DATABASE_URL", "sqlite::memory:");
            env::set_var("PORT", "3000");
        }

        let config = Config::from_env();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.port, 3000);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_unparseable_port_falls_back() {
        clear_env();
        unsafe { env::set_var("PORT", "not-a-port") };

        let config = Config::from_env();
        assert_eq!(config.port, 8080);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_cors_origins_are_split_and_trimmed() {
        clear_env();
        unsafe {
            env::set_var(
                "CORS_ALLOWED_ORIGINS",
                " http://localhost:5173 ,https://library.example.edu",
            )
        };

        let config = Config::from_env();
        assert_eq!(
            config.cors_allowed_origins,
            vec![
                "http://localhost:5173".to_string(),
                "https://library.example.edu".to_string()
            ]
        );

        clear_env();
    }
}
