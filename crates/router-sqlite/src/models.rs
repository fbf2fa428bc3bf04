use routerdb_core::{CertDigest, CertificateId, RouteId};
use rusqlite::types::Type;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Route row as written before certificates moved into their own table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRoute {
    pub parent_ref: String,
    pub service: String,
    pub domain: String,
    pub legacy_tls_cert: Option<String>,
    pub legacy_tls_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub parent_ref: String,
    pub service: String,
    pub domain: String,
    pub path: String,
    pub sticky: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    pub id: CertificateId,
    pub cert: String,
    pub key: String,
    pub cert_sha256: CertDigest,
    pub created_at: String,
}

/// A route joined with its effective certificate, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteView {
    #[serde(flatten)]
    pub route: Route,
    pub certificate: Option<Certificate>,
}

/// Certificate listing without key material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateSummary {
    pub id: CertificateId,
    pub cert_sha256: CertDigest,
    pub created_at: String,
    pub route_count: i64,
}

/// Inline certificate columns of a pre-migration route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyRoute {
    pub id: RouteId,
    pub tls_cert: Option<String>,
    pub tls_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    HttpRoutes,
    TcpRoutes,
    RouteEvents,
    Certificates,
    RouteCertificates,
    SchemaMigrations,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::HttpRoutes => "http_routes",
            Table::TcpRoutes => "tcp_routes",
            Table::RouteEvents => "route_events",
            Table::Certificates => "certificates",
            Table::RouteCertificates => "route_certificates",
            Table::SchemaMigrations => "schema_migrations",
        }
    }
}

pub(crate) fn digest_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<CertDigest> {
    let s: String = row.get(idx)?;
    s.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
