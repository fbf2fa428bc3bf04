pub const LEDGER_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version         INTEGER PRIMARY KEY,
  name            TEXT NOT NULL,
  run_id          TEXT NOT NULL,
  applied_at      TEXT NOT NULL
);
"#;

pub const MIG_0001_HTTP_ROUTES: &str = r#"
CREATE TABLE http_routes (
  id              INTEGER PRIMARY KEY AUTOINCREMENT,
  parent_ref      TEXT NOT NULL,
  service         TEXT NOT NULL,
  domain          TEXT NOT NULL,
  tls_cert        TEXT,
  tls_key         TEXT,
  created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
  updated_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE UNIQUE INDEX idx_http_routes_domain ON http_routes(domain);
CREATE INDEX idx_http_routes_parent_ref ON http_routes(parent_ref);
"#;

pub const MIG_0002_TCP_ROUTES: &str = r#"
CREATE TABLE tcp_routes (
  id              INTEGER PRIMARY KEY AUTOINCREMENT,
  parent_ref      TEXT NOT NULL,
  service         TEXT NOT NULL,
  port            INTEGER NOT NULL UNIQUE CHECK (port BETWEEN 1 AND 65535),
  created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
  updated_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE INDEX idx_tcp_routes_parent_ref ON tcp_routes(parent_ref);
"#;

pub const MIG_0003_ROUTE_EVENTS: &str = r#"
CREATE TABLE route_events (
  event_id        INTEGER PRIMARY KEY AUTOINCREMENT,
  object_type     TEXT NOT NULL CHECK (object_type IN ('http_route','tcp_route')),
  object_id       INTEGER NOT NULL,
  op              TEXT NOT NULL CHECK (op IN ('create','update','delete')),
  created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE TRIGGER http_routes_created AFTER INSERT ON http_routes
BEGIN
  INSERT INTO route_events(object_type, object_id, op) VALUES ('http_route', NEW.id, 'create');
END;

CREATE TRIGGER http_routes_deleted AFTER DELETE ON http_routes
BEGIN
  INSERT INTO route_events(object_type, object_id, op) VALUES ('http_route', OLD.id, 'delete');
END;

CREATE TRIGGER tcp_routes_created AFTER INSERT ON tcp_routes
BEGIN
  INSERT INTO route_events(object_type, object_id, op) VALUES ('tcp_route', NEW.id, 'create');
END;

CREATE TRIGGER tcp_routes_deleted AFTER DELETE ON tcp_routes
BEGIN
  INSERT INTO route_events(object_type, object_id, op) VALUES ('tcp_route', OLD.id, 'delete');
END;

CREATE INDEX idx_route_events_object ON route_events(object_type, object_id);
"#;

pub const MIG_0004_HTTP_PATHS: &str = r#"
ALTER TABLE http_routes ADD COLUMN path TEXT NOT NULL DEFAULT '/';
ALTER TABLE http_routes ADD COLUMN sticky INTEGER NOT NULL DEFAULT 0 CHECK (sticky IN (0,1));

DROP INDEX idx_http_routes_domain;
CREATE UNIQUE INDEX idx_http_routes_domain_path ON http_routes(domain, path);
"#;

pub const MIG_0005_TLS_OBJECTS: &str = r#"
CREATE TABLE certificates (
  id              INTEGER PRIMARY KEY AUTOINCREMENT,
  cert            TEXT NOT NULL,
  key             TEXT NOT NULL,
  cert_sha256     TEXT NOT NULL UNIQUE CHECK (length(cert_sha256) = 64),
  created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE TABLE route_certificates (
  http_route_id   INTEGER PRIMARY KEY REFERENCES http_routes(id) ON DELETE CASCADE,
  certificate_id  INTEGER NOT NULL REFERENCES certificates(id) ON DELETE RESTRICT
);

CREATE INDEX idx_route_certificates_cert ON route_certificates(certificate_id);
"#;
