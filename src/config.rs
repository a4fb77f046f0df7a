use sqlx::postgres::PgConnectOptions;
use std::{env, fmt, str::FromStr, time::Duration};

/// How the tasks service decides that a caller holds a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Compare the `session_id` cookie against the known session value.
    CookieSession,
    /// Forward an `Authorization: Bearer` token to the auth service over gRPC.
    RemoteToken,
}

impl FromStr for AuthMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "cookie" => Ok(AuthMode::CookieSession),
            "remote" => Ok(AuthMode::RemoteToken),
            other => Err(ConfigError::Invalid("AUTH_MODE", other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseDriver {
    Postgres,
    Memory,
}

impl FromStr for DatabaseDriver {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "postgres" => Ok(DatabaseDriver::Postgres),
            "memory" => Ok(DatabaseDriver::Memory),
            other => Err(ConfigError::Invalid("DB_DRIVER", other.to_string())),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    /// Variable name and the rejected value.
    Invalid(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Invalid(key, value) => write!(f, "invalid value for {}: {:?}", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub driver: DatabaseDriver,
    /// Takes precedence over the individual parts when set.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        match &self.url {
            Some(url) => PgConnectOptions::from_str(url),
            None => Ok(PgConnectOptions::new()
                .host(&self.host)
                .port(self.port)
                .username(&self.user)
                .password(&self.password)
                .database(&self.name)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TasksConfig {
    pub host: String,
    pub port: u16,
    pub auth_grpc_addr: String,
    pub auth_mode: AuthMode,
    pub auth_timeout: Duration,
    pub log_level: String,
    pub cors_allowed_origin: Option<String>,
    pub db: DatabaseConfig,
}

impl TasksConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset or empty keys take their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        Ok(Self {
            host: vars.string("TASKS_HOST", "0.0.0.0"),
            port: vars.parse("TASKS_PORT", 8082)?,
            auth_grpc_addr: vars.string("AUTH_GRPC_ADDR", "localhost:50051"),
            auth_mode: vars.parse("AUTH_MODE", AuthMode::CookieSession)?,
            auth_timeout: Duration::from_millis(vars.parse("AUTH_TIMEOUT_MS", 2000)?),
            log_level: vars.string("LOG_LEVEL", "info"),
            cors_allowed_origin: vars.get("CORS_ALLOWED_ORIGIN"),
            db: DatabaseConfig {
                driver: vars.parse("DB_DRIVER", DatabaseDriver::Postgres)?,
                url: vars.get("DATABASE_URL"),
                host: vars.string("DB_HOST", "localhost"),
                port: vars.parse("DB_PORT", 5432)?,
                user: vars.string("DB_USER", "tasks_user"),
                password: vars.string("DB_PASSWORD", "tasks_pass"),
                name: vars.string("DB_NAME", "tasks_db"),
            },
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Endpoint URI for the tonic channel.
    pub fn auth_endpoint(&self) -> String {
        if self.auth_grpc_addr.contains("://") {
            self.auth_grpc_addr.clone()
        } else {
            format!("http://{}", self.auth_grpc_addr)
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub host: String,
    pub http_port: u16,
    pub grpc_port: u16,
    pub log_level: String,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        Ok(Self {
            host: vars.string("AUTH_HOST", "0.0.0.0"),
            http_port: vars.parse("AUTH_HTTP_PORT", 8081)?,
            grpc_port: vars.parse("AUTH_GRPC_PORT", 50051)?,
            log_level: vars.string("LOG_LEVEL", "info"),
        })
    }

    pub fn grpc_addr(&self) -> String {
        format!("{}:{}", self.host, self.grpc_port)
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(key) {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid(key, value.clone())),
            None => Ok(default),
        }
    }
}
