use crate::app_data::AppData;
use crate::types::internal::context::RequestContext;

/// Counts from one housekeeping sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub csrf_tokens_removed: u64,
    pub allowlist_entries_deactivated: u64,
}

/// Run every expiry sweep once
///
/// Sweeps are idempotent and never fail; storage errors are logged and
/// reported as zero.
pub async fn run_cleanup(app_data: &AppData) -> CleanupReport {
    let ctx = RequestContext::for_system();
    let report = CleanupReport {
        csrf_tokens_removed: app_data.csrf_service.cleanup_expired().await,
        allowlist_entries_deactivated: app_data.allowlist_service.cleanup_expired().await,
    };

    println!("Expired CSRF tokens removed: {}", report.csrf_tokens_removed);
    println!(
        "Expired allowlist entries deactivated: {}",
        report.allowlist_entries_deactivated
    );
    tracing::info!(
        actor = %ctx.actor_id,
        source = %ctx.source,
        csrf_tokens_removed = report.csrf_tokens_removed,
        allowlist_entries_deactivated = report.allowlist_entries_deactivated,
        "Cleanup sweep finished"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::utils::setup_test_app_data;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_sweep_reports_expired_rows_once() {
        let app_data = setup_test_app_data().await;
        let past = (Utc::now() - Duration::minutes(5)).timestamp();
        app_data
            .ip_allowlist_store
            .upsert("198.51.100.30", None, "seed", Some(past), past - 60)
            .await
            .unwrap();

        let first = run_cleanup(&app_data).await;
        assert_eq!(first.allowlist_entries_deactivated, 1);

        let second = run_cleanup(&app_data).await;
        assert_eq!(
            second,
            CleanupReport {
                csrf_tokens_removed: 0,
                allowlist_entries_deactivated: 0,
            }
        );
    }
}
