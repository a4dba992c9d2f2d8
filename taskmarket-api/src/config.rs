/// Configuration for the API server
///
/// Loaded from environment variables (and a `.env` file in development).
///
/// # Environment Variables
///
/// - `API_HOST`: host to bind to (default: 0.0.0.0)
/// - `API_PORT`: port to bind to (default: 8080)
/// - `CORS_ORIGINS`: comma-separated allowed origins (default: `*`)
/// - `PRODUCTION`: enables HSTS (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `JWT_SECRET`: HS256 signing key, at least 32 characters (required)
/// - `JWT_TTL_HOURS`: token lifetime, 1 to 8760 (default: 24)
/// - `UPLOAD_DIR`: File Store root (default: ./uploads)
/// - `MAX_UPLOAD_BYTES`: per-file upload limit (default: 5 MiB)
/// - `OTP_TTL_MINUTES`: verification code lifetime, 1 to 1440 (default: 15)
/// - `OTP_WEBHOOK_URL`: mail relay endpoint; codes are only logged when unset
/// - `PURGE_INTERVAL_SECS`: how often stale codes and revocations are deleted (default: 3600)
///
/// # Example
///
/// ```no_run
/// use taskmarket_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf, str::FromStr};

use taskmarket_shared::{auth::jwt::DEFAULT_TTL_HOURS, infra::otp::DEFAULT_OTP_TTL_MINUTES};

/// Minimum JWT secret length in bytes
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Default per-file upload limit
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Longest accepted token lifetime (one year)
pub const MAX_TTL_HOURS: i64 = 24 * 365;

/// Longest accepted verification code lifetime (one day)
pub const MAX_OTP_TTL_MINUTES: i64 = 24 * 60;

/// Default period of the stale row purge
pub const DEFAULT_PURGE_INTERVAL_SECS: u64 = 3600;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,

    pub database: DatabaseConfig,

    pub jwt: JwtConfig,

    pub uploads: UploadConfig,

    pub otp: OtpConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,

    pub port: u16,

    /// Allowed CORS origins; `*` means permissive
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS on)
    pub production: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    pub max_connections: u32,

    /// Seconds between purges of expired codes and revocations
    pub purge_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// HS256 signing secret
    ///
    /// Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,

    pub ttl_hours: i64,
}

/// Document upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Root directory of the local File Store
    pub dir: PathBuf,

    /// Largest accepted file, in bytes
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpConfig {
    pub ttl_minutes: i64,

    /// Relay endpoint receiving codes as JSON
    pub webhook_url: Option<String>,
}

fn parse_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} is invalid: {}", name, e)),
        Err(_) => Ok(default),
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    env::var(name).map_err(|_| anyhow::anyhow!("{} environment variable is required", name))
}

/// Splits a comma-separated origin list, dropping blanks
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing, a value does not
    /// parse, or `JWT_SECRET` is shorter than [`MIN_JWT_SECRET_LENGTH`].
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = required("JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            anyhow::bail!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            );
        }

        let config = Self {
            api: ApiConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_or("API_PORT", 8080)?,
                cors_origins: parse_origins(
                    &env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()),
                ),
                production: parse_or("PRODUCTION", false)?,
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
                purge_interval_secs: parse_or("PURGE_INTERVAL_SECS", DEFAULT_PURGE_INTERVAL_SECS)?,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                ttl_hours: parse_or("JWT_TTL_HOURS", DEFAULT_TTL_HOURS)?,
            },
            uploads: UploadConfig {
                dir: PathBuf::from(env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string())),
                max_bytes: parse_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            },
            otp: OtpConfig {
                ttl_minutes: parse_or("OTP_TTL_MINUTES", DEFAULT_OTP_TTL_MINUTES)?,
                webhook_url: env::var("OTP_WEBHOOK_URL").ok().filter(|url| !url.trim().is_empty()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks the numeric settings are within their accepted ranges
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(1..=MAX_TTL_HOURS).contains(&self.jwt.ttl_hours) {
            anyhow::bail!("JWT_TTL_HOURS must be between 1 and {}", MAX_TTL_HOURS);
        }

        if !(1..=MAX_OTP_TTL_MINUTES).contains(&self.otp.ttl_minutes) {
            anyhow::bail!("OTP_TTL_MINUTES must be between 1 and {}", MAX_OTP_TTL_MINUTES);
        }

        if self.uploads.max_bytes == 0 {
            anyhow::bail!("MAX_UPLOAD_BYTES must be positive");
        }

        if self.database.purge_interval_secs == 0 {
            anyhow::bail!("PURGE_INTERVAL_SECS must be positive");
        }

        Ok(())
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Whether CORS allows any origin
    pub fn cors_permissive(&self) -> bool {
        self.api.cors_origins.iter().any(|origin| origin == "*")
    }

    /// Configuration for tests and local tooling
    pub fn for_testing(jwt_secret: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 1,
                purge_interval_secs: DEFAULT_PURGE_INTERVAL_SECS,
            },
            jwt: JwtConfig {
                secret: jwt_secret.into(),
                ttl_hours: DEFAULT_TTL_HOURS,
            },
            uploads: UploadConfig {
                dir: env::temp_dir().join("taskmarket-uploads"),
                max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            otp: OtpConfig {
                ttl_minutes: DEFAULT_OTP_TTL_MINUTES,
                webhook_url: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address() {
        let mut config = Config::for_testing("test-secret-key-at-least-32-bytes-long");
        config.api.port = 8080;

        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("https://a.example, https://b.example,,"),
            ["https://a.example", "https://b.example"]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn test_cors_permissive() {
        let mut config = Config::for_testing("test-secret-key-at-least-32-bytes-long");
        assert!(config.cors_permissive());

        config.api.cors_origins = vec!["https://taskmarket.example".to_string()];
        assert!(!config.cors_permissive());
    }

    #[test]
    fn test_validate_bounds_lifetimes() {
        let mut config = Config::for_testing("test-secret-key-at-least-32-bytes-long");
        assert!(config.validate().is_ok());

        config.jwt.ttl_hours = i64::MAX;
        assert!(config.validate().is_err());

        config.jwt.ttl_hours = 0;
        assert!(config.validate().is_err());

        config.jwt.ttl_hours = MAX_TTL_HOURS;
        assert!(config.validate().is_ok());

        config.otp.ttl_minutes = MAX_OTP_TTL_MINUTES + 1;
        assert!(config.validate().is_err());

        config.otp.ttl_minutes = -5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let mut config = Config::for_testing("test-secret-key-at-least-32-bytes-long");
        config.uploads.max_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = Config::for_testing("test-secret-key-at-least-32-bytes-long");
        config.database.purge_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_secret_not_serialized() {
        let config = Config::for_testing("test-secret-key-at-least-32-bytes-long");
        let json = serde_json::to_value(&config).unwrap();
        assert!(json["jwt"].get("secret").is_none());
    }
}
