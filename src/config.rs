use secrecy::Secret;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    // Key used to sign and authenticate QR payloads
    pub signing_key: Secret<String>,

    // Optional webhook the notifier posts card events to
    pub notify_webhook_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Ok(Self {
            database_url: config.get("database_url")?,
            host: config.get("host").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: config.get("port")?,

            signing_key: Secret::new(config.get("signing_key")?),

            notify_webhook_url: config.get("notify_webhook_url").ok(),
        })
    }
}
