use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use crate::config::EnvironmentProvider;
use crate::config::errors::ConfigError;
use crate::services::ErrorPolicy;

const DEFAULT_DATABASE_URL: &str = "sqlite://auth.db?mode=rwc";
const DEFAULT_AUDIT_DATABASE_URL: &str = "sqlite://audit.db?mode=rwc";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;

/// Bootstrap settings for infrastructure and guard policy
pub struct BootstrapSettings {
    database_url: String,
    audit_database_url: String,
    server_host: String,
    server_port: u16,
    allowlist_error_policy: ErrorPolicy,
    allowlist_trust_private: bool,
    trusted_proxies: Vec<IpAddr>,
}

impl BootstrapSettings {
    /// Load bootstrap settings from the given environment provider
    ///
    /// Every setting has a default; only malformed values are errors.
    pub fn from_env_provider(env_provider: Arc<dyn EnvironmentProvider + Send + Sync>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            env_provider
                .get_var(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let database_url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let audit_database_url =
            get("AUDIT_DATABASE_URL").unwrap_or_else(|| DEFAULT_AUDIT_DATABASE_URL.to_string());

        let server_host = match get("HOST") {
            Some(host) => parse_host(&host)?,
            None => DEFAULT_HOST.to_string(),
        };

        let server_port = match get("PORT") {
            Some(port) => parse_port(&port)?,
            None => DEFAULT_PORT,
        };

        let allowlist_error_policy = match get("ALLOWLIST_ON_ERROR") {
            Some(policy) => policy
                .parse::<ErrorPolicy>()
                .map_err(|e| ConfigError::invalid_setting("ALLOWLIST_ON_ERROR", e.to_string()))?,
            None => ErrorPolicy::default(),
        };

        let allowlist_trust_private = match get("ALLOWLIST_TRUST_PRIVATE") {
            Some(value) => parse_bool(&value, "ALLOWLIST_TRUST_PRIVATE")?,
            None => true,
        };

        let trusted_proxies = match get("TRUSTED_PROXIES") {
            Some(value) => parse_ip_list(&value, "TRUSTED_PROXIES")?,
            None => Vec::new(),
        };

        Ok(Self {
            database_url,
            audit_database_url,
            server_host,
            server_port,
            allowlist_error_policy,
            allowlist_trust_private,
            trusted_proxies,
        })
    }

    /// Convenience method that uses the system environment provider
    pub fn from_env() -> Result<Self, ConfigError> {
        use crate::config::SystemEnvironment;
        Self::from_env_provider(Arc::new(SystemEnvironment))
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn audit_database_url(&self) -> &str {
        &self.audit_database_url
    }

    pub fn server_host(&self) -> &str {
        &self.server_host
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn allowlist_error_policy(&self) -> ErrorPolicy {
        self.allowlist_error_policy
    }

    pub fn allowlist_trust_private(&self) -> bool {
        self.allowlist_trust_private
    }

    /// Peers whose `X-Forwarded-For` / `X-Real-IP` headers are believed
    pub fn trusted_proxies(&self) -> &[IpAddr] {
        &self.trusted_proxies
    }
}

fn parse_host(value: &str) -> Result<String, ConfigError> {
    if value == "localhost" || value.parse::<IpAddr>().is_ok() {
        Ok(value.to_string())
    } else {
        Err(ConfigError::invalid_setting(
            "HOST",
            format!("'{}' is not an IP address or localhost", value),
        ))
    }
}

fn parse_port(value: &str) -> Result<u16, ConfigError> {
    match value.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ConfigError::invalid_setting(
            "PORT",
            format!("'{}' is not a port between 1 and 65535", value),
        )),
    }
}

fn parse_ip_list(value: &str, setting_name: &str) -> Result<Vec<IpAddr>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<IpAddr>()
                .map(|ip| ip.to_canonical())
                .map_err(|_| ConfigError::invalid_setting(setting_name, format!("'{}' is not an IP address", entry)))
        })
        .collect()
}

fn parse_bool(value: &str, setting_name: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid_setting(
            setting_name,
            format!("'{}' is not a boolean", value),
        )),
    }
}

impl fmt::Debug for BootstrapSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapSettings")
            .field("database_url", &self.database_url)
            .field("audit_database_url", &self.audit_database_url)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("allowlist_error_policy", &self.allowlist_error_policy)
            .field("allowlist_trust_private", &self.allowlist_trust_private)
            .field("trusted_proxies", &self.trusted_proxies)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MockEnvironment;

    fn settings(vars: &[(&str, &str)]) -> Result<BootstrapSettings, ConfigError> {
        BootstrapSettings::from_env_provider(Arc::new(MockEnvironment::empty().with_vars(vars)))
    }

    #[test]
    fn test_bootstrap_settings_with_all_vars() {
        let settings = settings(&[
            ("DATABASE_URL", "sqlite://test.db"),
            ("AUDIT_DATABASE_URL", "sqlite://test-audit.db"),
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("ALLOWLIST_ON_ERROR", "deny"),
            ("ALLOWLIST_TRUST_PRIVATE", "false"),
        ])
        .unwrap();

        assert_eq!(settings.database_url(), "sqlite://test.db");
        assert_eq!(settings.audit_database_url(), "sqlite://test-audit.db");
        assert_eq!(settings.server_address(), "127.0.0.1:8080");
        assert_eq!(settings.allowlist_error_policy(), ErrorPolicy::DenyOnError);
        assert!(!settings.allowlist_trust_private());
    }

    #[test]
    fn test_bootstrap_settings_with_defaults() {
        let settings = settings(&[]).unwrap();

        assert_eq!(settings.database_url(), DEFAULT_DATABASE_URL);
        assert_eq!(settings.audit_database_url(), DEFAULT_AUDIT_DATABASE_URL);
        assert_eq!(settings.server_address(), "0.0.0.0:3000");
        assert_eq!(settings.allowlist_error_policy(), ErrorPolicy::AllowOnError);
        assert!(settings.allowlist_trust_private());
        assert!(settings.trusted_proxies().is_empty());
    }

    #[test]
    fn test_trusted_proxies_are_parsed() {
        let settings = settings(&[("TRUSTED_PROXIES", "10.0.0.2, ::ffff:10.0.0.3,,::1")]).unwrap();
        let expected: Vec<IpAddr> = vec![
            "10.0.0.2".parse().unwrap(),
            "10.0.0.3".parse().unwrap(),
            "::1".parse().unwrap(),
        ];
        assert_eq!(settings.trusted_proxies(), expected.as_slice());

        let err = settings_err("TRUSTED_PROXIES", "10.0.0.2,proxy.local");
        assert!(matches!(err, ConfigError::InvalidSetting { ref setting_name, .. } if setting_name == "TRUSTED_PROXIES"));
    }

    fn settings_err(name: &str, value: &str) -> ConfigError {
        settings(&[(name, value)]).unwrap_err()
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        for port in ["0", "70000", "http"] {
            let err = settings(&[("PORT", port)]).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidSetting { ref setting_name, .. } if setting_name == "PORT"));
        }
    }

    #[test]
    fn test_invalid_host_is_rejected() {
        assert!(settings(&[("HOST", "not a host")]).is_err());
        assert!(settings(&[("HOST", "localhost")]).is_ok());
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let err = settings(&[("ALLOWLIST_ON_ERROR", "sometimes")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { ref setting_name, .. } if setting_name == "ALLOWLIST_ON_ERROR"));
        assert!(settings(&[("ALLOWLIST_TRUST_PRIVATE", "maybe")]).is_err());
    }
}
