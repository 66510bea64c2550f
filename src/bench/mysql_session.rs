use mysql::{prelude::Queryable, Conn, OptsBuilder, Row, Value};
use tracing::{debug, info};

use crate::bench::config::DbConfig;
use crate::bench::session::{ResultSet, SqlSession};
use crate::error::{Error, Result};

/// `SqlSession` over one synchronous MySQL connection.
/// The connection is closed when the session is dropped.
pub struct MySqlSession {
    conn: Conn,
    database: String,
}

impl MySqlSession {
    #[tracing::instrument(level = "info", skip_all, fields(host = %cfg.host, port = cfg.port, db = %cfg.database))]
    pub fn connect(cfg: &DbConfig) -> Result<Self> {
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(cfg.host.clone()))
            .tcp_port(cfg.port)
            .user(Some(cfg.user.clone()))
            .pass(Some(cfg.password.clone()))
            .db_name(Some(cfg.database.clone()));

        let conn = Conn::new(opts).map_err(|e| Error::Connection(e.to_string()))?;
        info!("connected");
        Ok(Self {
            conn,
            database: cfg.database.clone(),
        })
    }
}

impl Drop for MySqlSession {
    fn drop(&mut self) {
        debug!(db = %self.database, "closing connection");
    }
}

/// Server-reported and decoding errors belong to the query; the rest mean
/// the connection is unusable.
fn classify(sql: &str, err: mysql::Error) -> Error {
    match err {
        mysql::Error::MySqlError(_)
        | mysql::Error::FromValueError(_)
        | mysql::Error::FromRowError(_) => Error::query(first_line(sql), err),
        other => Error::Connection(other.to_string()),
    }
}

fn first_line(sql: &str) -> String {
    sql.trim().lines().next().unwrap_or_default().trim().to_string()
}

impl SqlSession for MySqlSession {
    fn fetch(&mut self, sql: &str) -> Result<ResultSet> {
        let mut result = self.conn.query_iter(sql).map_err(|e| classify(sql, e))?;
        let columns: Vec<String> = result
            .columns()
            .as_ref()
            .iter()
            .map(|c| c.name_str().into_owned())
            .collect();

        let mut rows = Vec::new();
        for row in result.by_ref() {
            let row: Row = row.map_err(|e| classify(sql, e))?;
            let cells = (0..row.len())
                .map(|i| row.as_ref(i).map(render_value).unwrap_or_default())
                .collect();
            rows.push(cells);
        }
        Ok(ResultSet::new(columns, rows))
    }

    fn has_fulltext_index(&mut self, table: &str, column: &str) -> Result<bool> {
        let sql = "SELECT COUNT(*) \
                   FROM information_schema.statistics \
                   WHERE table_schema = ? \
                     AND table_name = ? \
                     AND index_type = 'FULLTEXT' \
                     AND column_name = ?";
        let n: Option<u64> = self
            .conn
            .exec_first(
                sql,
                (self.database.clone(), table.to_string(), column.to_string()),
            )
            .map_err(|e| classify(sql, e))?;
        Ok(n.unwrap_or(0) > 0)
    }
}

/// Text form of a column value, as a CSV cell.
pub fn render_value(v: &Value) -> String {
    match v {
        Value::NULL => String::new(),
        Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        Value::Int(i) => i.to_string(),
        Value::UInt(u) => u.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Double(d) => d.to_string(),
        Value::Date(y, mo, d, h, mi, s, us) => {
            let mut out = format!("{:04}-{:02}-{:02} {:02}:{:02}:{:02}", y, mo, d, h, mi, s);
            if *us > 0 {
                out.push_str(&format!(".{:06}", us));
            }
            out
        }
        Value::Time(neg, days, h, mi, s, us) => {
            let hours = *days * 24 + u32::from(*h);
            let sign = if *neg { "-" } else { "" };
            let mut out = format!("{}{:02}:{:02}:{:02}", sign, hours, mi, s);
            if *us > 0 {
                out.push_str(&format!(".{:06}", us));
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&Value::NULL), "");
        assert_eq!(render_value(&Value::Bytes(b"BRONX".to_vec())), "BRONX");
        assert_eq!(render_value(&Value::Int(-4)), "-4");
        assert_eq!(render_value(&Value::UInt(42)), "42");
        assert_eq!(
            render_value(&Value::Date(2024, 1, 2, 3, 4, 5, 0)),
            "2024-01-02 03:04:05"
        );
        assert_eq!(
            render_value(&Value::Date(2024, 1, 2, 3, 4, 5, 120)),
            "2024-01-02 03:04:05.000120"
        );
        assert_eq!(
            render_value(&Value::Time(true, 1, 2, 3, 4, 0)),
            "-26:03:04"
        );
    }

    #[test]
    fn test_classify_server_error_is_query() {
        let err = mysql::Error::MySqlError(mysql::MySqlError {
            state: "42S02".into(),
            message: "Table 'nyc311_db.nyc311' doesn't exist".into(),
            code: 1146,
        });
        match classify("\n  SELECT COUNT(*) AS count\n  FROM nyc311", err) {
            Error::Query { query, message } => {
                assert_eq!(query, "SELECT COUNT(*) AS count");
                assert!(message.contains("doesn't exist"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_classify_transport_errors_are_connection() {
        let io = mysql::Error::IoError(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert!(matches!(classify("SELECT 1", io), Error::Connection(_)));

        let driver = mysql::Error::DriverError(mysql::DriverError::PacketOutOfSync);
        assert!(matches!(classify("SELECT 1", driver), Error::Connection(_)));
    }

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("\n   SELECT 1\n FROM t"), "SELECT 1");
        assert_eq!(first_line(""), "");
    }
}
