use std::fmt;
use std::sync::Arc;

use crate::config::errors::ConfigError;
use crate::config::{EnvironmentProvider, SystemEnvironment};

const JWT_SECRET_VAR: &str = "JWT_SECRET";
const PASSWORD_PEPPER_VAR: &str = "PASSWORD_PEPPER";
const JWT_SECRET_MIN_LENGTH: usize = 32;
const PASSWORD_PEPPER_MIN_LENGTH: usize = 16;

/// Centralized manager for application secrets
pub struct SecretManager {
    jwt_secret: String,
    password_pepper: String,
}

impl SecretManager {
    /// Load and validate all secrets from the process environment
    ///
    /// # Errors
    /// Returns `ConfigError` if any required secret is missing or too short
    pub fn init() -> Result<Self, ConfigError> {
        Self::from_env_provider(Arc::new(SystemEnvironment))
    }

    pub fn from_env_provider(env_provider: Arc<dyn EnvironmentProvider + Send + Sync>) -> Result<Self, ConfigError> {
        let jwt_secret = load_secret(env_provider.as_ref(), JWT_SECRET_VAR, JWT_SECRET_MIN_LENGTH)?;
        let password_pepper =
            load_secret(env_provider.as_ref(), PASSWORD_PEPPER_VAR, PASSWORD_PEPPER_MIN_LENGTH)?;

        Ok(Self {
            jwt_secret,
            password_pepper,
        })
    }

    /// Build from literal values, skipping validation
    pub fn from_values(jwt_secret: impl Into<String>, password_pepper: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            password_pepper: password_pepper.into(),
        }
    }

    /// Get the JWT signing secret
    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    /// Get the pepper for password hashing
    pub fn password_pepper(&self) -> &str {
        &self.password_pepper
    }
}

fn load_secret(env: &(dyn EnvironmentProvider + Send + Sync), name: &str, min_length: usize) -> Result<String, ConfigError> {
    let value = env
        .get_var(name)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingSecret {
            name: name.to_string(),
        })?;

    if value.len() < min_length {
        return Err(ConfigError::SecretTooShort {
            name: name.to_string(),
            expected: min_length,
            actual: value.len(),
        });
    }

    Ok(value)
}

impl fmt::Debug for SecretManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretManager")
            .field("jwt_secret", &"<redacted>")
            .field("password_pepper", &"<redacted>")
            .finish()
    }
}

impl fmt::Display for SecretManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretManager {{ secrets_loaded: 2 }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MockEnvironment;

    const VALID_JWT: &str = "test-secret-key-minimum-32-characters-long";
    const VALID_PEPPER: &str = "test-pepper-for-unit-tests";

    fn load(vars: &[(&str, &str)]) -> Result<SecretManager, ConfigError> {
        SecretManager::from_env_provider(Arc::new(MockEnvironment::empty().with_vars(vars)))
    }

    #[test]
    fn test_loads_valid_secrets() {
        let manager = load(&[(JWT_SECRET_VAR, VALID_JWT), (PASSWORD_PEPPER_VAR, VALID_PEPPER)]).unwrap();

        assert_eq!(manager.jwt_secret(), VALID_JWT);
        assert_eq!(manager.password_pepper(), VALID_PEPPER);
    }

    #[test]
    fn test_missing_secret() {
        let err = load(&[(JWT_SECRET_VAR, VALID_JWT)]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret { ref name } if name == PASSWORD_PEPPER_VAR));
    }

    #[test]
    fn test_short_secret() {
        let err = load(&[(JWT_SECRET_VAR, "short"), (PASSWORD_PEPPER_VAR, VALID_PEPPER)]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::SecretTooShort { expected: 32, actual: 5, .. }
        ));
    }

    #[test]
    fn test_debug_output_is_redacted() {
        let manager = SecretManager::from_values(VALID_JWT, VALID_PEPPER);
        let debug = format!("{:?}", manager);

        assert!(!debug.contains(VALID_JWT));
        assert!(!debug.contains(VALID_PEPPER));
        assert!(debug.contains("<redacted>"));
    }
}
