use poem::Request;
use poem_openapi::SecurityScheme;
use poem_openapi::auth::Bearer;
use serde::Deserialize;
use std::net::IpAddr;
use std::sync::Arc;

use crate::app_data::AppData;
use crate::errors::AdminError;
use crate::providers::TokenProvider;
use crate::services::{CsrfService, IpAllowlistService, Permission, PermissionOracle};
use crate::types::internal::context::RequestContext;

pub const CSRF_HEADER: &str = "X-CSRF-Token";
pub const CSRF_QUERY_PARAM: &str = "csrf_token";

/// JWT Bearer token authentication
#[derive(SecurityScheme)]
#[oai(ty = "bearer", bearer_format = "JWT")]
pub struct BearerAuth(pub Bearer);

/// Client IP for `req`
///
/// The socket peer is the client unless it is one of `trusted_proxies`. For a
/// trusted peer the nearest untrusted hop in `X-Forwarded-For` wins, then
/// `X-Real-IP`, then the peer itself. Addresses are canonicalized so an
/// IPv4-mapped IPv6 peer compares equal to its IPv4 form.
pub fn extract_ip_address(req: &Request, trusted_proxies: &[IpAddr]) -> Option<IpAddr> {
    let peer = req.remote_addr().as_socket_addr().map(|addr| addr.ip().to_canonical())?;
    if !trusted_proxies.contains(&peer) {
        return Some(peer);
    }

    if let Some(forwarded) = req.header("X-Forwarded-For") {
        let hops: Option<Vec<IpAddr>> = forwarded
            .split(',')
            .map(|hop| hop.trim().parse::<IpAddr>().ok().map(|ip| ip.to_canonical()))
            .collect();
        // A malformed chain is ignored as a whole
        if let Some(hops) = hops {
            if let Some(client) = hops.into_iter().rev().find(|hop| !trusted_proxies.contains(hop)) {
                return Some(client);
            }
        }
    }

    if let Some(real_ip) = req.header("X-Real-IP") {
        if let Ok(ip) = real_ip.trim().parse::<IpAddr>() {
            return Some(ip.to_canonical());
        }
    }

    Some(peer)
}

pub fn extract_user_agent(req: &Request) -> Option<String> {
    req.header("User-Agent").map(str::to_string)
}

#[derive(Deserialize)]
struct CsrfQuery {
    csrf_token: Option<String>,
}

/// CSRF token from the `X-CSRF-Token` header, falling back to the `csrf_token` query parameter
pub fn extract_csrf_token(req: &Request) -> Option<String> {
    if let Some(token) = req.header(CSRF_HEADER).filter(|t| !t.is_empty()) {
        return Some(token.to_string());
    }

    req.params::<CsrfQuery>()
        .ok()
        .and_then(|query| query.csrf_token)
        .filter(|t| !t.is_empty())
}

/// Runs the admin request checks in order: bearer token, CSRF for
/// state-changing methods, IP allowlist, then permission
pub struct AdminGuard {
    token_provider: Arc<TokenProvider>,
    csrf_service: Arc<CsrfService>,
    allowlist_service: Arc<IpAllowlistService>,
    permissions: Arc<dyn PermissionOracle>,
    trusted_proxies: Vec<IpAddr>,
}

impl AdminGuard {
    pub fn new(
        token_provider: Arc<TokenProvider>,
        csrf_service: Arc<CsrfService>,
        allowlist_service: Arc<IpAllowlistService>,
        permissions: Arc<dyn PermissionOracle>,
    ) -> Self {
        Self {
            token_provider,
            csrf_service,
            allowlist_service,
            permissions,
            trusted_proxies: Vec::new(),
        }
    }

    /// Believe forwarding headers from these peers
    pub fn with_trusted_proxies(mut self, trusted_proxies: Vec<IpAddr>) -> Self {
        self.trusted_proxies = trusted_proxies;
        self
    }

    pub fn from_app_data(app_data: &AppData) -> Self {
        Self::new(
            app_data.token_provider.clone(),
            app_data.csrf_service.clone(),
            app_data.allowlist_service.clone(),
            app_data.permissions.clone(),
        )
        .with_trusted_proxies(app_data.guard_policy.trusted_proxies.clone())
    }

    /// Full check chain for an admin endpoint
    ///
    /// # Returns
    /// The authenticated request context to pass on to services and the audit recorder
    pub async fn authorize(
        &self,
        req: &Request,
        auth: &BearerAuth,
        permission: Permission,
    ) -> Result<RequestContext, AdminError> {
        let ctx = self.authenticate(req, auth)?;

        if CsrfService::requires_verification(req.method()) {
            self.verify_csrf(req, &ctx).await?;
        }
        self.check_source(&ctx).await?;
        self.check_permission(&ctx, permission)?;

        Ok(ctx)
    }

    /// Validate the bearer token and build the request context
    pub fn authenticate(&self, req: &Request, auth: &BearerAuth) -> Result<RequestContext, AdminError> {
        let claims = self.token_provider.validate_jwt(&auth.0.token).map_err(|e| {
            tracing::debug!("Bearer token rejected: {}", e);
            AdminError::unauthorized()
        })?;

        let mut ctx = RequestContext::new().with_auth(claims);
        if let Some(ip) = extract_ip_address(req, &self.trusted_proxies) {
            ctx = ctx.with_ip_address(ip);
        }
        if let Some(user_agent) = extract_user_agent(req) {
            ctx = ctx.with_user_agent(user_agent);
        }

        Ok(ctx)
    }

    pub async fn verify_csrf(&self, req: &Request, ctx: &RequestContext) -> Result<(), AdminError> {
        let Some(token) = extract_csrf_token(req) else {
            tracing::warn!(actor = %ctx.actor_id, request_id = %ctx.request_id, "CSRF token missing");
            return Err(AdminError::csrf_rejected());
        };

        if self.csrf_service.verify(&token, &ctx.actor_id).await {
            Ok(())
        } else {
            Err(AdminError::csrf_rejected())
        }
    }

    /// Reject sources outside the allowlist; an unknown source address is rejected
    pub async fn check_source(&self, ctx: &RequestContext) -> Result<(), AdminError> {
        let Some(ip) = ctx.ip_address else {
            tracing::warn!(actor = %ctx.actor_id, "Admin request without a resolvable source address");
            return Err(AdminError::ip_not_allowed());
        };

        if self.allowlist_service.is_allowed(ip).await {
            Ok(())
        } else {
            tracing::warn!(actor = %ctx.actor_id, %ip, "Admin request from address outside allowlist");
            Err(AdminError::ip_not_allowed())
        }
    }

    pub fn check_permission(&self, ctx: &RequestContext, permission: Permission) -> Result<(), AdminError> {
        let role = ctx.role().unwrap_or_default();
        if self.permissions.has_permission(role, permission) {
            Ok(())
        } else {
            tracing::warn!(actor = %ctx.actor_id, role, %permission, "Permission denied");
            Err(AdminError::permission_denied(permission.as_str()))
        }
    }
}
