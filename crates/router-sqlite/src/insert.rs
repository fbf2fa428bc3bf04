use crate::{Db, MigrateError, NewRoute};
use routerdb_core::{CertificateId, RouteId};
use rusqlite::{params, Connection, OptionalExtension};
use tls_certs::NormalizedCert;

/// Result of [`get_or_create_certificate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredCertificate {
    pub id: CertificateId,
    pub created: bool,
}

/// Insert-or-get keyed by the body digest. Existing rows are never modified.
///
/// Must run inside the caller's transaction; concurrent writers are not
/// supported.
pub fn get_or_create_certificate(conn: &Connection, cert: &NormalizedCert) -> Result<StoredCertificate, MigrateError> {
    let digest = cert.digest();
    let existing = conn
        .query_row(
            "SELECT id, cert, key FROM certificates WHERE cert_sha256=?",
            [digest.as_str()],
            |r| Ok((r.get::<_, CertificateId>(0)?, r.get::<_, String>(1)?, r.get::<_, String>(2)?)),
        )
        .optional()?;
    if let Some((id, body, key)) = existing {
        if body != cert.cert {
            return Err(MigrateError::IntegrityViolation { digest, existing: id });
        }
        if key != cert.key {
            tracing::warn!(certificate_id = id, digest = %digest, "stored certificate has a different key; keeping stored row");
        }
        return Ok(StoredCertificate { id, created: false });
    }
    conn.execute(
        "INSERT INTO certificates(cert, key, cert_sha256) VALUES (?,?,?)",
        params![cert.cert, cert.key, digest.as_str()],
    )?;
    Ok(StoredCertificate { id: conn.last_insert_rowid(), created: true })
}

/// Point a route at a certificate. A route holds at most one link.
pub fn link_route_certificate(conn: &Connection, route_id: RouteId, certificate_id: CertificateId) -> Result<(), MigrateError> {
    conn.execute(
        "INSERT INTO route_certificates(http_route_id, certificate_id) VALUES (?,?)",
        params![route_id, certificate_id],
    )?;
    Ok(())
}

impl Db {
    /// Insert a route with inline certificate columns, as written before
    /// the certificate store existed.
    pub fn insert_legacy_route(&self, route: &NewRoute) -> Result<RouteId, MigrateError> {
        self.conn.execute(
            "INSERT INTO http_routes(parent_ref, service, domain, tls_cert, tls_key) VALUES (?,?,?,?,?)",
            params![route.parent_ref, route.service, route.domain, route.legacy_tls_cert, route.legacy_tls_key],
        )?;
        Ok(self.conn.last_insert_rowid())
    }
}
