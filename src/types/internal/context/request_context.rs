use std::net::IpAddr;

use crate::types::internal::auth::Claims;
use crate::types::internal::context::{RequestId, RequestSource};

/// Per-request identity and client metadata
///
/// Built once at the edge (API handler or CLI command) and passed explicitly
/// to every guard and to the audit recorder. Nothing downstream reads
/// identity from anywhere else.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub actor_id: String,
    pub ip_address: Option<IpAddr>,
    pub user_agent: Option<String>,
    pub request_id: RequestId,
    pub authenticated: bool,
    pub claims: Option<Claims>,
    pub source: RequestSource,
}

impl RequestContext {
    /// Unauthenticated API context; identity is attached with `with_auth`
    pub fn new() -> Self {
        Self {
            actor_id: "unknown".to_owned(),
            ip_address: None,
            user_agent: None,
            request_id: RequestId::new(),
            authenticated: false,
            claims: None,
            source: RequestSource::API,
        }
    }

    /// Context for CLI-initiated operations
    pub fn for_cli(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            source: RequestSource::CLI,
            ..Self::new()
        }
    }

    /// Context for automated housekeeping
    pub fn for_system() -> Self {
        Self {
            actor_id: "system".to_owned(),
            source: RequestSource::System,
            ..Self::new()
        }
    }

    /// Set the ip_address
    pub fn with_ip_address(mut self, ip_address: IpAddr) -> Self {
        self.ip_address = Some(ip_address);
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set authentication state with claims; the actor becomes the token subject
    pub fn with_auth(mut self, claims: Claims) -> Self {
        self.authenticated = true;
        self.actor_id = claims.sub.clone();
        self.claims = Some(claims);
        self
    }

    /// Set the actor_id
    pub fn with_actor_id(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = actor_id.into();
        self
    }

    /// Role from the validated token, if any
    pub fn role(&self) -> Option<&str> {
        self.claims.as_ref().map(|c| c.role.as_str())
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_auth_sets_actor_from_subject() {
        let claims = Claims {
            sub: "admin-7".to_string(),
            role: "admin".to_string(),
            exp: 0,
            iat: 0,
            jti: None,
        };

        let ctx = RequestContext::new()
            .with_ip_address("10.0.0.7".parse().unwrap())
            .with_auth(claims);

        assert!(ctx.authenticated);
        assert_eq!(ctx.actor_id, "admin-7");
        assert_eq!(ctx.role(), Some("admin"));
        assert_eq!(ctx.ip_address, Some("10.0.0.7".parse().unwrap()));
    }

    #[test]
    fn test_system_context_is_unauthenticated() {
        let ctx = RequestContext::for_system();
        assert!(!ctx.authenticated);
        assert_eq!(ctx.actor_id, "system");
        assert_eq!(ctx.source, RequestSource::System);
        assert_eq!(ctx.role(), None);
    }
}
