use poem::Request;
use poem_openapi::param::{Path, Query};
use poem_openapi::payload::Json;
use poem_openapi::{OpenApi, Tags};
use std::net::IpAddr;
use std::sync::Arc;

use crate::api::helpers::{AdminGuard, BearerAuth};
use crate::errors::AdminError;
use crate::services::{IpAllowlistService, Permission};
use crate::types::dto::allowlist::{
    AddAllowlistRequest, AllowlistEntryDto, AllowlistResponse, RemoveAllowlistResponse,
};

/// Admin IP allowlist management
pub struct AllowlistApi {
    guard: Arc<AdminGuard>,
    allowlist_service: Arc<IpAllowlistService>,
}

impl AllowlistApi {
    pub fn new(guard: Arc<AdminGuard>, allowlist_service: Arc<IpAllowlistService>) -> Self {
        Self {
            guard,
            allowlist_service,
        }
    }
}

#[derive(Tags)]
enum AllowlistTags {
    /// IP allowlist entries
    Allowlist,
}

fn parse_ip(value: &str) -> Result<IpAddr, AdminError> {
    value
        .trim()
        .parse::<IpAddr>()
        .map(|ip| ip.to_canonical())
        .map_err(|_| AdminError::validation_failed("ip_address", format!("'{}' is not an IP address", value)))
}

#[OpenApi]
impl AllowlistApi {
    /// List allowlist entries
    #[oai(path = "/admin/allowlist", method = "get", tag = "AllowlistTags::Allowlist")]
    async fn list(
        &self,
        req: &Request,
        auth: BearerAuth,
        include_inactive: Query<Option<bool>>,
    ) -> Result<Json<AllowlistResponse>, AdminError> {
        self.guard.authorize(req, &auth, Permission::AllowlistView).await?;

        let entries = self
            .allowlist_service
            .list(include_inactive.0.unwrap_or(false))
            .await?;

        Ok(Json(AllowlistResponse {
            entries: entries.into_iter().map(AllowlistEntryDto::from).collect(),
        }))
    }

    /// Add or reactivate an entry
    #[oai(path = "/admin/allowlist", method = "post", tag = "AllowlistTags::Allowlist")]
    async fn add(
        &self,
        req: &Request,
        auth: BearerAuth,
        body: Json<AddAllowlistRequest>,
    ) -> Result<Json<AllowlistEntryDto>, AdminError> {
        let ctx = self.guard.authorize(req, &auth, Permission::AllowlistManage).await?;

        let body = body.0;
        let ip = parse_ip(&body.ip_address)?;
        let entry = self
            .allowlist_service
            .add(&ctx, ip, body.description, body.expires_at)
            .await?;

        Ok(Json(entry.into()))
    }

    /// Deactivate an entry
    #[oai(path = "/admin/allowlist/:ip", method = "delete", tag = "AllowlistTags::Allowlist")]
    async fn remove(
        &self,
        req: &Request,
        auth: BearerAuth,
        ip: Path<String>,
    ) -> Result<Json<RemoveAllowlistResponse>, AdminError> {
        let ctx = self.guard.authorize(req, &auth, Permission::AllowlistManage).await?;

        let parsed = parse_ip(&ip.0)?;
        if !self.allowlist_service.remove(&ctx, parsed).await? {
            return Err(AdminError::not_found("Allowlist entry", parsed));
        }

        Ok(Json(RemoveAllowlistResponse {
            ip_address: parsed.to_string(),
            removed: true,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::helpers::CSRF_HEADER;
    use crate::app_data::AppData;
    use crate::test::utils::{peer_request, setup_test_app_data};
    use poem::http::Method;
    use poem_openapi::auth::Bearer;

    const ADMIN_IP: &str = "203.0.113.5";

    async fn setup() -> (AppData, AllowlistApi) {
        let app_data = setup_test_app_data().await;
        app_data
            .ip_allowlist_store
            .upsert(ADMIN_IP, None, "seed", None, chrono::Utc::now().timestamp())
            .await
            .unwrap();

        let api = AllowlistApi::new(
            Arc::new(AdminGuard::from_app_data(&app_data)),
            app_data.allowlist_service.clone(),
        );
        (app_data, api)
    }

    fn auth(app_data: &AppData) -> BearerAuth {
        let (token, _) = app_data.token_provider.generate_jwt("admin-1", "admin").unwrap();
        BearerAuth(Bearer { token })
    }

    /// State-changing request carrying a fresh CSRF token
    async fn mutation(app_data: &AppData, method: Method) -> Request {
        let issued = app_data.csrf_service.generate("admin-1").await.unwrap();
        peer_request(ADMIN_IP, method, "/api/admin/allowlist", &[(CSRF_HEADER, issued.token.as_str())])
    }

    #[tokio::test]
    async fn test_add_then_list() {
        let (app_data, api) = setup().await;

        let added = api
            .add(
                &mutation(&app_data, Method::POST).await,
                auth(&app_data),
                Json(AddAllowlistRequest {
                    ip_address: " 198.51.100.7 ".to_string(),
                    description: Some("vpn exit".to_string()),
                    expires_at: None,
                }),
            )
            .await
            .unwrap();
        assert_eq!(added.0.ip_address, "198.51.100.7");
        assert_eq!(added.0.added_by, "admin-1");

        let listed = api
            .list(
                &peer_request(ADMIN_IP, Method::GET, "/api/admin/allowlist", &[]),
                auth(&app_data),
                Query(None),
            )
            .await
            .unwrap();
        let ips: Vec<&str> = listed.0.entries.iter().map(|e| e.ip_address.as_str()).collect();
        assert_eq!(ips, vec!["198.51.100.7", ADMIN_IP]);
    }

    #[tokio::test]
    async fn test_add_rejects_malformed_ip() {
        let (app_data, api) = setup().await;

        let result = api
            .add(
                &mutation(&app_data, Method::POST).await,
                auth(&app_data),
                Json(AddAllowlistRequest {
                    ip_address: "300.1.1.1".to_string(),
                    description: None,
                    expires_at: None,
                }),
            )
            .await;

        assert!(matches!(result, Err(AdminError::ValidationFailed(_))));
    }

    #[tokio::test]
    async fn test_remove_unknown_entry_is_not_found() {
        let (app_data, api) = setup().await;

        let result = api
            .remove(
                &mutation(&app_data, Method::DELETE).await,
                auth(&app_data),
                Path("192.0.2.99".to_string()),
            )
            .await;

        assert!(matches!(result, Err(AdminError::NotFound(_))));
    }
}
