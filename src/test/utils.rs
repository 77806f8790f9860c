// Test utilities for unit tests
// Only compiled when running tests

use migration::{AuditMigrator, AuthMigrator, MigratorTrait};
use poem::http::Method;
use poem::http::uri::Scheme;
use poem::web::{LocalAddr, RemoteAddr};
use poem::{Addr, Body, Request, RequestParts};
use sea_orm::{Database, DatabaseConnection};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::app_data::{AppData, GuardPolicy};
use crate::config::{DatabaseConnections, SecretManager};
use crate::providers::CryptoProvider;

pub const TEST_PEPPER: &str = "test-pepper-for-unit-tests";
pub const TEST_JWT_SECRET: &str = "test-secret-key-minimum-32-characters-long";

/// In-memory auth database with migrations applied
pub async fn setup_test_auth_db() -> DatabaseConnection {
    let db = setup_unmigrated_db().await;
    AuthMigrator::up(&db, None)
        .await
        .expect("Failed to run auth migrations");
    db
}

/// In-memory audit database with migrations applied
pub async fn setup_test_audit_db() -> DatabaseConnection {
    let db = setup_unmigrated_db().await;
    AuditMigrator::up(&db, None)
        .await
        .expect("Failed to run audit migrations");
    db
}

/// In-memory database without any tables
///
/// Every query against it fails, which exercises storage-fault paths.
pub async fn setup_unmigrated_db() -> DatabaseConnection {
    Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database")
}

pub fn test_crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(CryptoProvider::new(TEST_PEPPER))
}

/// Fully wired application on fresh in-memory databases
///
/// Private ranges are not trusted, so allowlist checks always hit the store.
pub async fn setup_test_app_data() -> AppData {
    let connections = DatabaseConnections {
        auth: setup_test_auth_db().await,
        audit: setup_test_audit_db().await,
    };
    let secret_manager = Arc::new(SecretManager::from_values(TEST_JWT_SECRET, TEST_PEPPER));
    let policy = GuardPolicy {
        allowlist_trust_private: false,
        ..GuardPolicy::default()
    };

    AppData::init(connections, secret_manager, policy)
}

/// Request that arrived over a socket connection from `peer`
pub fn peer_request(peer: &str, method: Method, uri: &str, headers: &[(&str, &str)]) -> Request {
    let mut builder = poem::http::Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let (parts, ()) = builder.body(()).expect("Failed to build test request").into_parts();

    let peer: IpAddr = peer.parse().expect("Invalid test peer address");
    let parts = RequestParts::from((
        parts,
        LocalAddr(Addr::default()),
        RemoteAddr(Addr::SocketAddr(SocketAddr::new(peer, 40_000))),
        Scheme::HTTP,
    ));
    Request::from_parts(parts, Body::empty())
}
