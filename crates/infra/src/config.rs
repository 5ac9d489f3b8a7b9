//! Process configuration, read from the environment.
//!
//! | variable | default |
//! |---|---|
//! | `GATEHOUSE_BIND_ADDR` | `0.0.0.0:8080` |
//! | `JWT_SECRET` | insecure dev secret (logged) |
//! | `DATABASE_URL` | unset: in-memory directory |
//! | `GATEHOUSE_AREAS_FILE` | unset: built-in presets |
//! | `GATEHOUSE_SESSION_TIMEOUT_MS` | `5000` |

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use gatehouse_auth::{AreaConfig, AreaRegistry};
use gatehouse_core::DomainError;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEV_JWT_SECRET: &str = "dev-secret";
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed area list: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid area: {0}")]
    Area(#[from] DomainError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub database_url: Option<String>,
    pub areas_file: Option<PathBuf>,
    pub session_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup (the environment, or a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr: SocketAddr = non_empty("GATEHOUSE_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                key: "GATEHOUSE_BIND_ADDR",
                reason: e.to_string(),
            })?;

        let jwt_secret = non_empty("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let session_timeout = match non_empty("GATEHOUSE_SESSION_TIMEOUT_MS") {
            Some(raw) => {
                let ms: u64 = raw.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                    key: "GATEHOUSE_SESSION_TIMEOUT_MS",
                    reason: e.to_string(),
                })?;
                if ms == 0 {
                    return Err(ConfigError::Invalid {
                        key: "GATEHOUSE_SESSION_TIMEOUT_MS",
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Duration::from_millis(ms)
            }
            None => Duration::from_millis(DEFAULT_SESSION_TIMEOUT_MS),
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            database_url: non_empty("DATABASE_URL"),
            areas_file: non_empty("GATEHOUSE_AREAS_FILE").map(PathBuf::from),
            session_timeout,
        })
    }

    /// The configured areas: the file if one is set, the presets otherwise.
    pub fn areas(&self) -> Result<AreaRegistry, ConfigError> {
        match &self.areas_file {
            Some(path) => load_areas(path),
            None => Ok(AreaRegistry::presets()),
        }
    }
}

pub fn load_areas(path: &Path) -> Result<AreaRegistry, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_areas(&raw)
}

/// Parse a JSON array of area definitions and validate them as a set.
pub fn parse_areas(json: &str) -> Result<AreaRegistry, ConfigError> {
    let areas: Vec<AreaConfig> = serde_json::from_str(json)?;
    Ok(AreaRegistry::new(areas)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.bind_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(settings.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(settings.database_url, None);
        assert_eq!(settings.areas_file, None);
        assert_eq!(settings.session_timeout, Duration::from_secs(5));
        assert_eq!(settings.areas().unwrap().len(), AreaRegistry::presets().len());
    }

    #[test]
    fn values_are_read_from_lookup() {
        let settings = Settings::from_lookup(lookup(&[
            ("GATEHOUSE_BIND_ADDR", "127.0.0.1:9000"),
            ("JWT_SECRET", "s3cret"),
            ("DATABASE_URL", "postgres://localhost/gatehouse"),
            ("GATEHOUSE_SESSION_TIMEOUT_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(settings.bind_addr.port(), 9000);
        assert_eq!(settings.jwt_secret, "s3cret");
        assert_eq!(settings.database_url.as_deref(), Some("postgres://localhost/gatehouse"));
        assert_eq!(settings.session_timeout, Duration::from_millis(250));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let settings = Settings::from_lookup(lookup(&[("DATABASE_URL", "  "), ("JWT_SECRET", "")])).unwrap();
        assert_eq!(settings.database_url, None);
        assert_eq!(settings.jwt_secret, DEV_JWT_SECRET);
    }

    #[test]
    fn bad_values_are_errors_not_panics() {
        let err = Settings::from_lookup(lookup(&[("GATEHOUSE_BIND_ADDR", "not-an-addr")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "GATEHOUSE_BIND_ADDR", .. }));

        let err = Settings::from_lookup(lookup(&[("GATEHOUSE_SESSION_TIMEOUT_MS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "GATEHOUSE_SESSION_TIMEOUT_MS", .. }));

        let err = Settings::from_lookup(lookup(&[("GATEHOUSE_SESSION_TIMEOUT_MS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn parses_area_definitions() {
        let registry = parse_areas(
            r#"[
                {
                    "name": "reports",
                    "requirement": { "kind": "site_roles", "any_of": ["admin", "analyst"] },
                    "login_route": "/reports/login"
                },
                {
                    "name": "partners",
                    "requirement": { "kind": "portal_profile", "role": "partner" },
                    "login_route": "/portal/login",
                    "denial": "lateral",
                    "missing_fact_marker": "error=unauthorized",
                    "landing_routes": { "client": "/portal/client/dashboard" }
                }
            ]"#,
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        let partners = registry.get("partners").unwrap();
        assert_eq!(partners.denied_redirect().to, "/portal/login?error=unauthorized");
        assert_eq!(partners.deactivated_notice.title, "Account Deactivated");
    }

    #[test]
    fn invalid_area_definitions_are_rejected() {
        assert!(matches!(parse_areas("{"), Err(ConfigError::Parse(_))));

        let err = parse_areas(
            r#"[{ "name": "x", "requirement": { "kind": "agent_profile" }, "login_route": "login" }]"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Area(_)));

        let dup = r#"[
            { "name": "crm", "requirement": { "kind": "agent_profile" }, "login_route": "/crm/login" },
            { "name": "crm", "requirement": { "kind": "agent_profile" }, "login_route": "/crm/login" }
        ]"#;
        assert!(matches!(parse_areas(dup), Err(ConfigError::Area(_))));
    }

    #[test]
    fn missing_areas_file_is_an_io_error() {
        let settings = Settings::from_lookup(lookup(&[("GATEHOUSE_AREAS_FILE", "/nonexistent/areas.json")])).unwrap();
        assert!(matches!(settings.areas(), Err(ConfigError::Io { .. })));
    }
}
