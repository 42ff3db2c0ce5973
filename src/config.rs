use serde::Deserialize;

/// Connection settings for the downstream Jenkins instance.
#[derive(Debug, Clone, Deserialize)]
pub struct JenkinsConfig {
    pub base_url: String,
    pub user: String,
    pub api_token: String,
    pub job: String,
    /// Pre-shared job trigger token, appended as `?token=...` when set.
    pub trigger_token: Option<String>,
}

/// Process-wide configuration, read from the environment once at startup
/// and handed to the store and trigger client constructors. Request
/// handling never consults the environment.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub jenkins: JenkinsConfig,
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    // The Jenkins API token is the one secret we cannot run without; a
    // missing value must stop startup, not surface at the first trigger.
    let api_token = std::env::var("JENKINS_API_TOKEN").unwrap_or_default();
    if api_token.is_empty() {
        anyhow::bail!("JENKINS_API_TOKEN is not set; refusing to start without Jenkins credentials");
    }

    Ok(Config {
        port: std::env::var("APPROVAL_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5000),
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:approvals.db".into()),
        jenkins: JenkinsConfig {
            base_url: std::env::var("JENKINS_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8080".into()),
            user: std::env::var("JENKINS_USER").unwrap_or_else(|_| "admin".into()),
            api_token,
            job: std::env::var("JENKINS_JOB")
                .unwrap_or_else(|_| "ssl-automation-deploy".into()),
            trigger_token: std::env::var("JENKINS_TRIGGER_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
        },
    })
}
