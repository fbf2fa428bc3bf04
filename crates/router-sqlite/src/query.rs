use crate::models::digest_at;
use crate::{Certificate, CertificateSummary, Db, MigrateError, Route, RouteView, Table};
use routerdb_core::{CertificateId, RouteId};
use rusqlite::{OptionalExtension, Row};

const ROUTE_VIEW_SELECT: &str = "
    SELECT r.id, r.parent_ref, r.service, r.domain, r.path, r.sticky, r.created_at,
           c.id, c.cert, c.key, c.cert_sha256, c.created_at
    FROM http_routes AS r
    LEFT OUTER JOIN route_certificates AS rc ON rc.http_route_id = r.id
    LEFT OUTER JOIN certificates AS c ON rc.certificate_id = c.id";

fn route_view_from_row(row: &Row<'_>) -> rusqlite::Result<RouteView> {
    let route = Route {
        id: row.get(0)?,
        parent_ref: row.get(1)?,
        service: row.get(2)?,
        domain: row.get(3)?,
        path: row.get(4)?,
        sticky: row.get(5)?,
        created_at: row.get(6)?,
    };
    let certificate = match row.get::<_, Option<CertificateId>>(7)? {
        Some(id) => Some(Certificate {
            id,
            cert: row.get(8)?,
            key: row.get(9)?,
            cert_sha256: digest_at(row, 10)?,
            created_at: row.get(11)?,
        }),
        None => None,
    };
    Ok(RouteView { route, certificate })
}

impl Db {
    pub fn table_exists(&self, name: &str) -> Result<bool, MigrateError> {
        let cnt: i64 = self.conn.query_row(
            "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name=?",
            [name],
            |r| r.get(0),
        )?;
        Ok(cnt > 0)
    }

    pub fn count(&self, table: Table) -> Result<i64, MigrateError> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        Ok(self.conn.query_row(&sql, [], |r| r.get(0))?)
    }

    /// A route with its effective certificate. `None` if the route does not exist.
    pub fn route_view(&self, route_id: RouteId) -> Result<Option<RouteView>, MigrateError> {
        let sql = format!("{ROUTE_VIEW_SELECT} WHERE r.id = ?");
        Ok(self.conn.query_row(&sql, [route_id], route_view_from_row).optional()?)
    }

    pub fn list_route_views(&self) -> Result<Vec<RouteView>, MigrateError> {
        let sql = format!("{ROUTE_VIEW_SELECT} ORDER BY r.id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], route_view_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Effective certificate of a route; `None` means none is configured.
    pub fn route_certificate(&self, route_id: RouteId) -> Result<Option<Certificate>, MigrateError> {
        Ok(self.route_view(route_id)?.and_then(|v| v.certificate))
    }

    pub fn list_certificates(&self) -> Result<Vec<CertificateSummary>, MigrateError> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.cert_sha256, c.created_at, COUNT(rc.http_route_id)
             FROM certificates AS c
             LEFT OUTER JOIN route_certificates AS rc ON rc.certificate_id = c.id
             GROUP BY c.id
             ORDER BY c.id ASC",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok(CertificateSummary {
                id: r.get(0)?,
                cert_sha256: digest_at(r, 1)?,
                created_at: r.get(2)?,
                route_count: r.get(3)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}
