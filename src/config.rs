use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

use crate::identity::IdentityConfig;
use crate::services::batch_delete::MAX_GROUP_SIZE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// First superadmin, created at startup when no admin exists yet. Its id is
/// the value callers send in the admin header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub admin_id: String,
    pub login_id: String,
    pub display_name: String,
}

impl BootstrapAdmin {
    /// `None` when `admin_id` is blank. Login and display name fall back to
    /// the id.
    pub fn new(admin_id: &str, login_id: Option<&str>, display_name: Option<&str>) -> Option<Self> {
        let admin_id = admin_id.trim();
        if admin_id.is_empty() {
            return None;
        }
        let or_id = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(admin_id)
                .to_string()
        };

        Some(Self {
            admin_id: admin_id.to_string(),
            login_id: or_id(login_id),
            display_name: or_id(display_name),
        })
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub batch_group_size: usize,
    /// `None` runs with the local account client.
    pub identity: Option<IdentityConfig>,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl AppConfig {
    /// Reads `.env` when present, then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://academy.db?mode=rwc".to_string());
        let bind_addr = parsed("ACADEMY_BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?;
        let max_connections = parsed("ACADEMY_DB_MAX_CONNECTIONS", 5u32)?;
        let batch_group_size =
            parsed("ACADEMY_BATCH_GROUP_SIZE", MAX_GROUP_SIZE)?.clamp(1, MAX_GROUP_SIZE);

        let identity = match (env::var("IDENTITY_BASE_URL"), env::var("IDENTITY_API_TOKEN")) {
            (Ok(base_url), Ok(api_token)) if !base_url.trim().is_empty() => Some(IdentityConfig {
                base_url: base_url.trim().to_string(),
                api_token,
            }),
            _ => None,
        };

        let bootstrap_admin = env::var("ACADEMY_BOOTSTRAP_ADMIN").ok().and_then(|id| {
            BootstrapAdmin::new(
                &id,
                env::var("ACADEMY_BOOTSTRAP_LOGIN").ok().as_deref(),
                env::var("ACADEMY_BOOTSTRAP_NAME").ok().as_deref(),
            )
        });

        Ok(Self {
            database_url,
            bind_addr,
            max_connections,
            batch_group_size,
            identity,
            bootstrap_admin,
        })
    }
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_admin_defaults_to_id() {
        assert_eq!(BootstrapAdmin::new("  ", None, None), None);

        let seed = BootstrapAdmin::new(" owner ", None, Some(" ")).unwrap();
        assert_eq!(seed.admin_id, "owner");
        assert_eq!(seed.login_id, "owner");
        assert_eq!(seed.display_name, "owner");

        let seed = BootstrapAdmin::new("owner", Some("owner@academy.test"), Some("Owner")).unwrap();
        assert_eq!(seed.login_id, "owner@academy.test");
        assert_eq!(seed.display_name, "Owner");
    }
}
