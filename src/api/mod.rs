// API layer - HTTP endpoints
pub mod allowlist;
pub mod audit;
pub mod csrf;
pub mod health;
pub mod helpers;

use poem::{EndpointExt, Route, middleware::Tracing};
use poem_openapi::OpenApiService;
use std::sync::Arc;

pub use allowlist::AllowlistApi;
pub use audit::AuditApi;
pub use csrf::CsrfApi;
pub use health::HealthApi;
pub use helpers::{AdminGuard, BearerAuth};

use crate::app_data::AppData;

/// Every OpenAPI service mounted under `/api`
pub type ApiServices = (HealthApi, AuditApi, CsrfApi, AllowlistApi);

/// Assemble the API services from shared application data
pub fn build_api(app_data: &AppData) -> ApiServices {
    let guard = Arc::new(AdminGuard::from_app_data(app_data));

    (
        HealthApi::new(app_data.audit_recorder.clone()),
        AuditApi::new(
            guard.clone(),
            app_data.audit_query.clone(),
            app_data.investigation.clone(),
            app_data.audit_recorder.clone(),
        ),
        CsrfApi::new(guard.clone(), app_data.csrf_service.clone()),
        AllowlistApi::new(guard, app_data.allowlist_service.clone()),
    )
}

/// Routes: `/api` for the endpoints, `/swagger` for the UI
pub fn build_routes(app_data: &AppData, server_url: &str) -> impl poem::Endpoint + use<> {
    let api_service = OpenApiService::new(build_api(app_data), "Admin Trust API", env!("CARGO_PKG_VERSION"))
        .server(server_url);
    let ui = api_service.swagger_ui();

    Route::new()
        .nest("/api", api_service)
        .nest("/swagger", ui)
        .with(Tracing)
}
