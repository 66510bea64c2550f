use crate::error::Result;

/// A fully materialised result: column names plus every row as text.
/// SQL NULL is rendered as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The single connection a benchmark run owns.
///
/// Implementations must return only after the whole result set has been
/// read, so that timing `fetch` measures issue-to-last-row.
pub trait SqlSession {
    /// Run `sql` and collect its full result set.
    fn fetch(&mut self, sql: &str) -> Result<ResultSet>;

    /// Whether a full-text index covers `table.column` in the current schema.
    fn has_fulltext_index(&mut self, table: &str, column: &str) -> Result<bool>;
}

impl<S: SqlSession + ?Sized> SqlSession for &mut S {
    fn fetch(&mut self, sql: &str) -> Result<ResultSet> {
        (**self).fetch(sql)
    }

    fn has_fulltext_index(&mut self, table: &str, column: &str) -> Result<bool> {
        (**self).has_fulltext_index(table, column)
    }
}
