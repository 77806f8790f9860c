use std::fmt;

/// Surface a guarded operation was invoked from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestSource {
    /// Admin HTTP endpoint
    API,

    /// Operator command line
    CLI,

    /// Background housekeeping
    System,
}

impl RequestSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::API => "api",
            Self::CLI => "cli",
            Self::System => "system",
        }
    }
}

impl fmt::Display for RequestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
