use thiserror::Error;

/// Failures while loading settings and secrets at startup
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Required secret '{name}' is missing")]
    MissingSecret { name: String },

    #[error("Secret '{name}' must be at least {expected} characters, got {actual}")]
    SecretTooShort {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid setting '{setting_name}': {reason}")]
    InvalidSetting { setting_name: String, reason: String },
}

impl ConfigError {
    pub fn invalid_setting(setting_name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            setting_name: setting_name.to_string(),
            reason: reason.into(),
        }
    }
}
