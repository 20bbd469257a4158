use anyhow::Context;

// ============================================================================
// Configuration
// ============================================================================
//
// Everything comes from the environment, loaded once at startup. A local
// `.env` file is honored when present.

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub kafka_brokers: String,
    pub kafka_topic: String,
    pub kafka_group_id: String,
    pub http_addr: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            kafka_brokers: required("KAFKA_BROKERS")?,
            kafka_topic: required("KAFKA_TOPIC")?,
            kafka_group_id: required("KAFKA_GROUP_ID")?,
            http_addr: std::env::var("HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:8081".into()),
        })
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("missing required environment variable {name}"))
}
