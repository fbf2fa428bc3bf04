use router_sqlite::{
    current_version, dedup_route_certificates, router_ledger, Db, ErrorKind, Ledger, MigrateError,
    Migration, NewRoute, Runner, StepState, Table,
};
use tls_certs::cert_sha256;

fn pem(label: &str, i: usize) -> String {
    format!("-----BEGIN {label}-----\nMIIB{i:04}migrationtest{i}\nAbCdEf{i}==\n-----END {label}-----")
}

fn route(i: usize, cert: Option<String>, key: Option<String>) -> NewRoute {
    NewRoute {
        parent_ref: format!("some/parent/ref/{i}"),
        service: format!("migrationtest{i}.example.org"),
        domain: format!("migrationtest{i}.example.org"),
        legacy_tls_cert: cert,
        legacy_tls_key: key,
    }
}

/// Seeds the five-route fixture at version 4. Returns route ids and the
/// (cert, key) each route should resolve to.
fn seed_legacy_routes(db: &mut Db) -> Vec<(i64, Option<(String, String)>)> {
    let ledger = router_ledger().unwrap();
    Runner::new(&ledger).migrate_to(&mut db.conn, 4).unwrap();

    let mut out = Vec::new();
    for i in 0..3 {
        let (cert, key) = (pem("CERTIFICATE", i), pem("EC PRIVATE KEY", i));
        let id = db.insert_legacy_route(&route(i, Some(cert.clone()), Some(key.clone()))).unwrap();
        out.push((id, Some((cert, key))));
    }

    // same cert as the previous route, with surrounding whitespace
    let (cert, key) = (pem("CERTIFICATE", 2), pem("EC PRIVATE KEY", 2));
    let padded = route(
        3,
        Some(format!("  \n\n  \n {cert}   \n   \n   ")),
        Some(format!("    \n   {key}   \n   \n  ")),
    );
    let id = db.insert_legacy_route(&padded).unwrap();
    out.push((id, Some((cert, key))));

    let id = db.insert_legacy_route(&route(4, None, None)).unwrap();
    out.push((id, None));
    out
}

#[test]
fn migrate_tls_objects() {
    let mut db = Db::open_in_memory().unwrap();
    let routes = seed_legacy_routes(&mut db);
    assert!(!db.table_exists("certificates").unwrap());

    let ledger = router_ledger().unwrap();
    let report = Runner::new(&ledger).migrate_to(&mut db.conn, 5).unwrap();
    assert_eq!(report.applied, vec![5]);
    assert_eq!(report.already_committed, vec![1, 2, 3, 4]);
    assert_eq!(current_version(&db.conn).unwrap(), 5);

    for (i, (id, expected)) in routes.iter().enumerate() {
        let view = db.route_view(*id).unwrap().unwrap();
        assert_eq!(view.route.parent_ref, format!("some/parent/ref/{i}"));
        assert_eq!(view.route.service, format!("migrationtest{i}.example.org"));
        assert_eq!(view.route.domain, format!("migrationtest{i}.example.org"));
        match expected {
            None => assert!(view.certificate.is_none()),
            Some((cert, key)) => {
                let c = view.certificate.unwrap();
                assert_eq!(&c.cert, cert);
                assert_eq!(&c.key, key);
                assert_eq!(c.cert_sha256, cert_sha256(cert));
            }
        }
    }

    assert_eq!(db.count(Table::Certificates).unwrap(), 3);
    assert_eq!(db.count(Table::HttpRoutes).unwrap(), 5);
    assert_eq!(db.count(Table::RouteCertificates).unwrap(), 4);

    let shared_a = db.route_certificate(routes[2].0).unwrap().unwrap();
    let shared_b = db.route_certificate(routes[3].0).unwrap().unwrap();
    assert_eq!(shared_a.id, shared_b.id);
    assert!(db.route_certificate(routes[4].0).unwrap().is_none());
}

#[test]
fn stored_digest_is_sha256_of_trimmed_body() {
    let mut db = Db::open_in_memory().unwrap();
    seed_legacy_routes(&mut db);
    db.migrate(&router_ledger().unwrap()).unwrap();

    let mut stmt = db.conn.prepare("SELECT cert, cert_sha256 FROM certificates").unwrap();
    let rows = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))
        .unwrap();
    for row in rows {
        let (cert, digest) = row.unwrap();
        assert_eq!(cert, cert.trim());
        assert_eq!(digest, cert_sha256(&cert).to_string());
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, digest.to_lowercase());
    }

    let summaries = db.list_certificates().unwrap();
    let counts: Vec<i64> = summaries.iter().map(|s| s.route_count).collect();
    assert_eq!(counts, vec![1, 1, 2]);
}

#[test]
fn reapplying_does_not_duplicate_certificates() {
    let mut db = Db::open_in_memory().unwrap();
    seed_legacy_routes(&mut db);
    let ledger = router_ledger().unwrap();
    Runner::new(&ledger).apply(&mut db.conn, 4, 5).unwrap();

    let mut runner = Runner::new(&ledger);
    let report = runner.apply(&mut db.conn, 4, 5).unwrap();
    assert!(report.applied.is_empty());
    assert_eq!(report.already_committed, vec![5]);
    assert_eq!(runner.state(4), Some(StepState::Committed));

    let report = db.migrate(&ledger).unwrap();
    assert!(report.applied.is_empty());
    assert_eq!(db.count(Table::Certificates).unwrap(), 3);
    assert_eq!(db.count(Table::RouteCertificates).unwrap(), 4);
    assert_eq!(db.count(Table::SchemaMigrations).unwrap(), 5);
}

#[test]
fn routes_with_partial_material_get_no_certificate() {
    let mut db = Db::open_in_memory().unwrap();
    let ledger = router_ledger().unwrap();
    Runner::new(&ledger).migrate_to(&mut db.conn, 4).unwrap();
    let cert_only = db.insert_legacy_route(&route(0, Some(pem("CERTIFICATE", 0)), None)).unwrap();
    let key_only = db.insert_legacy_route(&route(1, None, Some(pem("EC PRIVATE KEY", 1)))).unwrap();
    let blank = db.insert_legacy_route(&route(2, Some("  \n ".into()), Some("\t".into()))).unwrap();
    db.migrate(&ledger).unwrap();

    for id in [cert_only, key_only, blank] {
        let view = db.route_view(id).unwrap().unwrap();
        assert!(view.certificate.is_none());
    }
    assert_eq!(db.count(Table::Certificates).unwrap(), 0);
    assert_eq!(db.count(Table::RouteCertificates).unwrap(), 0);
    assert!(db.route_view(9999).unwrap().is_none());
}

#[test]
fn same_body_with_different_key_keeps_first_row() {
    let mut db = Db::open_in_memory().unwrap();
    let ledger = router_ledger().unwrap();
    Runner::new(&ledger).migrate_to(&mut db.conn, 4).unwrap();
    let cert = pem("CERTIFICATE", 7);
    let first = db.insert_legacy_route(&route(0, Some(cert.clone()), Some("key-one".into()))).unwrap();
    let second = db.insert_legacy_route(&route(1, Some(cert.clone()), Some("key-two".into()))).unwrap();
    db.migrate(&ledger).unwrap();

    assert_eq!(db.count(Table::Certificates).unwrap(), 1);
    let a = db.route_certificate(first).unwrap().unwrap();
    let b = db.route_certificate(second).unwrap().unwrap();
    assert_eq!(a.id, b.id);
    assert_eq!(b.key, "key-one");
}

fn dedup_step(conn: &rusqlite::Connection) -> Result<(), MigrateError> {
    dedup_route_certificates(conn).map(|_| ())
}

#[test]
fn digest_collision_aborts_the_whole_step() {
    let mut conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE http_routes (id INTEGER PRIMARY KEY AUTOINCREMENT, tls_cert TEXT, tls_key TEXT);
         CREATE TABLE certificates (id INTEGER PRIMARY KEY AUTOINCREMENT, cert TEXT NOT NULL, key TEXT NOT NULL,
           cert_sha256 TEXT NOT NULL UNIQUE, created_at TEXT NOT NULL DEFAULT 'x');
         CREATE TABLE route_certificates (http_route_id INTEGER PRIMARY KEY, certificate_id INTEGER NOT NULL);",
    )
    .unwrap();
    let (good, bad) = (pem("CERTIFICATE", 1), pem("CERTIFICATE", 2));
    let poisoned = cert_sha256(&bad);
    conn.execute(
        "INSERT INTO certificates(cert, key, cert_sha256) VALUES ('other', 'k', ?)",
        [poisoned.as_str()],
    )
    .unwrap();
    conn.execute("INSERT INTO http_routes(tls_cert, tls_key) VALUES (?, 'k1')", [&good]).unwrap();
    conn.execute("INSERT INTO http_routes(tls_cert, tls_key) VALUES (?, 'k2')", [&bad]).unwrap();

    let ledger = Ledger::new(vec![Migration::new(1, "dedup").func(dedup_step)]).unwrap();
    let mut runner = Runner::new(&ledger);
    let err = runner.migrate_all(&mut conn).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IntegrityViolation);
    match err {
        MigrateError::IntegrityViolation { digest, existing } => {
            assert_eq!(digest, poisoned);
            assert_eq!(existing, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(runner.state(0), Some(StepState::Failed));
    assert_eq!(current_version(&conn).unwrap(), 0);

    // the first route's certificate and link were rolled back with the step
    let certs: i64 = conn.query_row("SELECT COUNT(*) FROM certificates", [], |r| r.get(0)).unwrap();
    let links: i64 = conn.query_row("SELECT COUNT(*) FROM route_certificates", [], |r| r.get(0)).unwrap();
    assert_eq!((certs, links), (1, 0));
}

#[test]
fn file_backed_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("router.db");
    let ids = {
        let mut db = Db::open(&path).unwrap();
        let ids = seed_legacy_routes(&mut db);
        db.migrate(&router_ledger().unwrap()).unwrap();
        ids
    };

    let mut db = Db::open(&path).unwrap();
    assert_eq!(current_version(&db.conn).unwrap(), 5);
    let report = db.migrate(&router_ledger().unwrap()).unwrap();
    assert!(report.applied.is_empty());
    assert!(db.route_certificate(ids[0].0).unwrap().is_some());
    assert!(db.route_certificate(ids[4].0).unwrap().is_none());
}
