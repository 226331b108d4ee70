//! Connection provider
//!
//! Fetches the database secret once and opens the one connection a process uses
//! for its whole lifetime. Failure here is fatal at start-up; nothing retries.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use sqlx::{ConnectOptions, PgConnection};
use tracing::{info, instrument};

use super::{DbError, DbResult};

/// Default Postgres port when the secret does not carry one
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Default connect timeout in seconds
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Where the secret JSON is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecretSourceKind {
    /// AWS Secrets Manager
    #[default]
    Aws,
    /// Environment variable named like the secret, for local runs
    Env,
}

impl FromStr for SecretSourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aws" | "secretsmanager" => Ok(SecretSourceKind::Aws),
            "env" => Ok(SecretSourceKind::Env),
            _ => Err(format!("Invalid secret source: {}. Valid options: aws, env", s)),
        }
    }
}

/// Connection provider settings
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub secret_name: String,
    pub secret_source: SecretSourceKind,
    /// Used when the secret has no `port`
    pub port: u16,
    pub connect_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn from_env() -> DbResult<Self> {
        let secret_name = std::env::var("SECRET_NAME")
            .map_err(|_| DbError::config("SECRET_NAME not set"))?;

        let secret_source = match std::env::var("SECRET_SOURCE") {
            Ok(value) => value.parse().map_err(DbError::Config)?,
            Err(_) => SecretSourceKind::default(),
        };

        let port = std::env::var("DB_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DB_PORT);

        let connect_timeout_secs = std::env::var("DB_CONNECT_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DB_CONNECT_TIMEOUT_SECS);

        Ok(Self {
            secret_name,
            secret_source,
            port,
            connect_timeout_secs,
        })
    }
}

/// Credentials stored in the secret: `{host, dbname, username, password}`
#[derive(Clone, Deserialize)]
pub struct DbSecret {
    pub host: String,
    pub dbname: String,
    pub username: String,
    pub password: String,
    /// Number or numeric string; anything else is ignored in favour of `DB_PORT`
    #[serde(default, deserialize_with = "lenient_port")]
    pub port: Option<u16>,
}

fn lenient_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

impl DbSecret {
    pub fn from_json(raw: &str) -> DbResult<Self> {
        serde_json::from_str(raw).map_err(|e| DbError::secret(format!("malformed secret: {}", e)))
    }

    pub fn connect_options(&self, default_port: u16) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port.unwrap_or(default_port))
            .database(&self.dbname)
            .username(&self.username)
            .password(&self.password)
    }
}

impl fmt::Debug for DbSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbSecret")
            .field("host", &self.host)
            .field("dbname", &self.dbname)
            .field("username", &self.username)
            .field("password", &"***")
            .field("port", &self.port)
            .finish()
    }
}

/// A store the secret string can be fetched from by name
#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn fetch(&self, name: &str) -> DbResult<String>;
}

/// Secrets Manager client using the default AWS configuration chain
pub struct SecretsManagerSource {
    client: aws_sdk_secretsmanager::Client,
}

impl SecretsManagerSource {
    pub async fn from_env() -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self {
            client: aws_sdk_secretsmanager::Client::new(&config),
        }
    }
}

#[async_trait]
impl SecretSource for SecretsManagerSource {
    #[instrument(skip(self))]
    async fn fetch(&self, name: &str) -> DbResult<String> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(|e| {
                DbError::secret(format!(
                    "failed to fetch '{}': {}",
                    name,
                    aws_sdk_secretsmanager::error::DisplayErrorContext(&e)
                ))
            })?;

        output
            .secret_string()
            .map(str::to_owned)
            .ok_or_else(|| DbError::secret(format!("secret '{}' has no string value", name)))
    }
}

/// Reads the secret JSON from the environment variable called `name`
pub struct EnvSecretSource;

#[async_trait]
impl SecretSource for EnvSecretSource {
    async fn fetch(&self, name: &str) -> DbResult<String> {
        std::env::var(name).map_err(|_| DbError::secret(format!("environment variable '{}' not set", name)))
    }
}

/// Fetch credentials from the configured store and open the process connection
pub async fn connect(config: &DatabaseConfig) -> DbResult<PgConnection> {
    match config.secret_source {
        SecretSourceKind::Aws => connect_with(&SecretsManagerSource::from_env().await, config).await,
        SecretSourceKind::Env => connect_with(&EnvSecretSource, config).await,
    }
}

/// Open the process connection with credentials from `source`
pub async fn connect_with(source: &dyn SecretSource, config: &DatabaseConfig) -> DbResult<PgConnection> {
    let secret = DbSecret::from_json(&source.fetch(&config.secret_name).await?)?;
    let options = secret.connect_options(config.port);

    let conn = tokio::time::timeout(Duration::from_secs(config.connect_timeout_secs), options.connect())
        .await
        .map_err(|_| {
            DbError::config(format!(
                "connecting to {} timed out after {}s",
                secret.host, config.connect_timeout_secs
            ))
        })??;

    info!(
        host = %secret.host,
        database = %secret.dbname,
        "Database connection established"
    );

    Ok(conn)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const SECRET: &str = r#"{
        "host": "db.internal",
        "dbname": "statbase",
        "username": "loader",
        "password": "hunter2",
        "engine": "postgres"
    }"#;

    struct FixedSecret(&'static str);

    #[async_trait]
    impl SecretSource for FixedSecret {
        async fn fetch(&self, _name: &str) -> DbResult<String> {
            Ok(self.0.to_string())
        }
    }

    fn config() -> DatabaseConfig {
        DatabaseConfig {
            secret_name: "statbase/db".to_string(),
            secret_source: SecretSourceKind::Env,
            port: DEFAULT_DB_PORT,
            connect_timeout_secs: 1,
        }
    }

    #[test]
    fn test_secret_parsing() {
        let secret = DbSecret::from_json(SECRET).unwrap();
        assert_eq!(secret.host, "db.internal");
        assert_eq!(secret.dbname, "statbase");
        assert_eq!(secret.port, None);

        let options = secret.connect_options(6543);
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_database(), Some("statbase"));
    }

    #[test]
    fn test_secret_port_accepts_number_or_string() {
        let base = r#""host": "h", "dbname": "d", "username": "u", "password": "p""#;

        let secret = DbSecret::from_json(&format!("{{{}, \"port\": \"5433\"}}", base)).unwrap();
        assert_eq!(secret.port, Some(5433));

        let secret = DbSecret::from_json(&format!("{{{}, \"port\": 5434}}", base)).unwrap();
        assert_eq!(secret.port, Some(5434));

        let secret = DbSecret::from_json(&format!("{{{}, \"port\": \"default\"}}", base)).unwrap();
        assert_eq!(secret.port, None);
        assert_eq!(secret.connect_options(DEFAULT_DB_PORT).get_port(), DEFAULT_DB_PORT);
    }

    #[test]
    fn test_secret_debug_hides_password() {
        let secret = DbSecret::from_json(SECRET).unwrap();
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("loader"));
    }

    #[test]
    fn test_secret_missing_field() {
        let err = DbSecret::from_json(r#"{"host": "h", "dbname": "d"}"#).unwrap_err();
        assert!(matches!(err, DbError::Secret(_)));
    }

    #[test]
    fn test_secret_source_kind_from_str() {
        assert_eq!("aws".parse::<SecretSourceKind>().unwrap(), SecretSourceKind::Aws);
        assert_eq!("ENV".parse::<SecretSourceKind>().unwrap(), SecretSourceKind::Env);
        assert!("vault".parse::<SecretSourceKind>().is_err());
    }

    #[tokio::test]
    async fn test_connect_with_malformed_secret_fails_before_connecting() {
        let err = connect_with(&FixedSecret("not json"), &config()).await.unwrap_err();
        assert!(matches!(err, DbError::Secret(_)));
    }

    #[tokio::test]
    async fn test_env_secret_source_missing_variable() {
        let err = EnvSecretSource
            .fetch("STATBASE_TEST_SECRET_THAT_IS_NOT_SET")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("STATBASE_TEST_SECRET_THAT_IS_NOT_SET"));
    }
}
