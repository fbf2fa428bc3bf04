//! Moves inline route certificates into the deduplicated certificate store.

use crate::{get_or_create_certificate, link_route_certificate, LegacyRoute, MigrateError};
use rusqlite::Connection;
use serde::Serialize;
use tls_certs::NormalizedCert;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupStats {
    pub routes_scanned: usize,
    pub certificates_created: usize,
    pub certificates_reused: usize,
    pub links_created: usize,
    pub routes_skipped: usize,
}

/// Every HTTP route's inline certificate columns, by ascending id.
pub fn legacy_routes(conn: &Connection) -> Result<Vec<LegacyRoute>, MigrateError> {
    let mut stmt = conn.prepare("SELECT id, tls_cert, tls_key FROM http_routes ORDER BY id ASC")?;
    let rows = stmt.query_map([], |r| {
        Ok(LegacyRoute { id: r.get(0)?, tls_cert: r.get(1)?, tls_key: r.get(2)? })
    })?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// One pass over all legacy routes. Routes missing either the certificate
/// or the key get no link.
pub fn dedup_route_certificates(conn: &Connection) -> Result<DedupStats, MigrateError> {
    let mut stats = DedupStats::default();
    for route in legacy_routes(conn)? {
        stats.routes_scanned += 1;
        let Some(cert) = NormalizedCert::from_legacy(route.tls_cert.as_deref(), route.tls_key.as_deref()) else {
            tracing::debug!(route_id = route.id, "route has no certificate");
            stats.routes_skipped += 1;
            continue;
        };
        let stored = get_or_create_certificate(conn, &cert)?;
        if stored.created {
            stats.certificates_created += 1;
        } else {
            stats.certificates_reused += 1;
        }
        link_route_certificate(conn, route.id, stored.id)?;
        stats.links_created += 1;
    }
    Ok(stats)
}

pub(crate) fn migrate_tls_objects(conn: &Connection) -> Result<(), MigrateError> {
    let stats = dedup_route_certificates(conn)?;
    tracing::info!(
        routes = stats.routes_scanned,
        created = stats.certificates_created,
        reused = stats.certificates_reused,
        links = stats.links_created,
        skipped = stats.routes_skipped,
        "migrated route certificates"
    );
    Ok(())
}
