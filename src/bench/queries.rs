use serde::{Deserialize, Serialize};
use std::fmt;

/// Table every benchmark query reads.
pub const TABLE: &str = "nyc311";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Scalar,
    FullText,
}

/// How a query was actually executed.
///
/// Full-text queries run as `FullText` when the column carries a full-text
/// index and fall back to `Like` otherwise; scalar queries are `Plain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Plain,
    FullText,
    Like,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Scalar => "scalar",
            Category::FullText => "fulltext",
        }
    }
}

impl QueryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryMode::Plain => "plain",
            QueryMode::FullText => "fulltext",
            QueryMode::Like => "like",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Scalar {
        sql: &'static str,
    },
    FullText {
        /// Column probed for a full-text index
        column: &'static str,
        fulltext_sql: &'static str,
        like_sql: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryDef {
    pub name: &'static str,
    pub kind: QueryKind,
}

impl QueryDef {
    pub fn category(&self) -> Category {
        match self.kind {
            QueryKind::Scalar { .. } => Category::Scalar,
            QueryKind::FullText { .. } => Category::FullText,
        }
    }

    /// SQL to run in `mode`. Scalar queries ignore the mode.
    pub fn sql(&self, mode: QueryMode) -> &'static str {
        match (self.kind, mode) {
            (QueryKind::Scalar { sql }, _) => sql,
            (QueryKind::FullText { fulltext_sql, .. }, QueryMode::FullText) => fulltext_sql,
            (QueryKind::FullText { like_sql, .. }, _) => like_sql,
        }
    }

    /// File stem for this query's evidence; full-text queries carry the mode
    /// so `like` and `fulltext` runs never share a file.
    pub fn artifact_name(&self, mode: QueryMode) -> String {
        match self.kind {
            QueryKind::Scalar { .. } => self.name.to_string(),
            QueryKind::FullText { .. } => format!("{}_{}", self.name, mode),
        }
    }
}

pub const SCALAR_QUERIES: &[QueryDef] = &[
    QueryDef {
        name: "Q1_counts_per_borough_30d",
        kind: QueryKind::Scalar {
            sql: "SELECT borough, COUNT(*) AS cnt
                  FROM nyc311
                  WHERE created_date >= NOW() - INTERVAL 30 DAY
                  GROUP BY borough
                  ORDER BY cnt DESC",
        },
    },
    QueryDef {
        name: "Q2_top_complaint_types",
        kind: QueryKind::Scalar {
            sql: "SELECT complaint_type, COUNT(*) AS cnt
                  FROM nyc311
                  GROUP BY complaint_type
                  ORDER BY cnt DESC
                  LIMIT 10",
        },
    },
    QueryDef {
        name: "Q3_avg_close_hours_by_borough",
        kind: QueryKind::Scalar {
            sql: "SELECT borough,
                         ROUND(AVG(TIMESTAMPDIFF(HOUR, created_date, closed_date)), 2) AS avg_hours
                  FROM nyc311
                  WHERE closed_date IS NOT NULL
                  GROUP BY borough
                  ORDER BY avg_hours DESC",
        },
    },
    QueryDef {
        name: "Q4_open_by_zip",
        kind: QueryKind::Scalar {
            sql: "SELECT incident_zip, COUNT(*) AS cnt
                  FROM nyc311
                  WHERE status <> 'Closed'
                  GROUP BY incident_zip
                  ORDER BY cnt DESC
                  LIMIT 25",
        },
    },
];

pub const FULLTEXT_QUERIES: &[QueryDef] = &[
    QueryDef {
        name: "FT1_noise",
        kind: QueryKind::FullText {
            column: "descriptor",
            fulltext_sql: "SELECT COUNT(*) AS count
                           FROM nyc311
                           WHERE MATCH(descriptor) AGAINST('+noise +music' IN BOOLEAN MODE)",
            like_sql: "SELECT COUNT(*) AS count
                       FROM nyc311
                       WHERE (descriptor LIKE '%noise%' OR descriptor LIKE '%music%')",
        },
    },
    QueryDef {
        name: "FT2_heat",
        kind: QueryKind::FullText {
            column: "descriptor",
            fulltext_sql: "SELECT complaint_type, COUNT(*) AS cnt
                           FROM nyc311
                           WHERE MATCH(descriptor) AGAINST('heat' IN BOOLEAN MODE)
                           GROUP BY complaint_type
                           ORDER BY cnt DESC",
            like_sql: "SELECT complaint_type, COUNT(*) AS cnt
                       FROM nyc311
                       WHERE descriptor LIKE '%heat%'
                       GROUP BY complaint_type
                       ORDER BY cnt DESC",
        },
    },
    QueryDef {
        name: "FT3_inspected",
        kind: QueryKind::FullText {
            column: "resolution_description",
            fulltext_sql: "SELECT borough, COUNT(*) AS cnt
                           FROM nyc311
                           WHERE MATCH(resolution_description) AGAINST('inspected' IN BOOLEAN MODE)
                           GROUP BY borough
                           ORDER BY cnt DESC",
            like_sql: "SELECT borough, COUNT(*) AS cnt
                       FROM nyc311
                       WHERE resolution_description LIKE '%inspected%'
                       GROUP BY borough
                       ORDER BY cnt DESC",
        },
    },
];

/// Both batteries in execution order: scalar first, then full-text.
pub fn battery() -> impl Iterator<Item = &'static QueryDef> {
    SCALAR_QUERIES.iter().chain(FULLTEXT_QUERIES.iter())
}
