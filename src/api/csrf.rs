use poem::Request;
use poem_openapi::payload::Json;
use poem_openapi::{OpenApi, Tags};
use std::sync::Arc;

use crate::api::helpers::{AdminGuard, BearerAuth};
use crate::errors::AdminError;
use crate::services::CsrfService;
use crate::types::dto::csrf::CsrfTokenResponse;

/// Anti-forgery token issuance
pub struct CsrfApi {
    guard: Arc<AdminGuard>,
    csrf_service: Arc<CsrfService>,
}

impl CsrfApi {
    pub fn new(guard: Arc<AdminGuard>, csrf_service: Arc<CsrfService>) -> Self {
        Self { guard, csrf_service }
    }
}

#[derive(Tags)]
enum CsrfTags {
    /// CSRF token lifecycle
    Csrf,
}

#[OpenApi]
impl CsrfApi {
    /// Issue a single-use CSRF token bound to the caller
    ///
    /// The token is valid for one hour and must accompany the next
    /// POST, PUT, PATCH or DELETE admin request.
    #[oai(path = "/admin/csrf-token", method = "post", tag = "CsrfTags::Csrf")]
    async fn issue_token(&self, req: &Request, auth: BearerAuth) -> Result<Json<CsrfTokenResponse>, AdminError> {
        let ctx = self.guard.authenticate(req, &auth)?;
        self.guard.check_source(&ctx).await?;

        let issued = self.csrf_service.generate(&ctx.actor_id).await?;
        Ok(Json(issued.into()))
    }
}
