//! Plain in-memory tables. `Table` is the tabular exchange format for both
//! loading (primary gene table, metadata side tables) and the read surface
//! (organism/cluster/gene tables, summary statistics); `MetaTable` stores the
//! metadata columns attached to one entity dimension.

use std::collections::HashMap;

use crate::error::{PanError, Result};

/// An ordered set of named string columns with row-major data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends one row; its width must match the column count.
    pub fn push_row<I, S>(&mut self, row: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let row: Vec<String> = row.into_iter().map(Into::into).collect();
        if row.len() != self.columns.len() {
            return Err(PanError::ShapeMismatch(format!(
                "row has {} fields but the table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, i: usize) -> &[String] {
        &self.rows[i]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Resolves the first matching column among `aliases` (e.g. `org` vs
    /// `organism`), for inputs that may use either spelling.
    pub fn first_column_index(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|a| self.column_index(a))
    }
}

/// One metadata column; `None` marks rows the source table had no entry for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetaColumn {
    pub name: String,
    pub values: Vec<Option<String>>,
}

/// Metadata columns for one entity dimension, row-aligned with that
/// dimension's registry order (or ledger order, for genes).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetaTable {
    n_rows: usize,
    columns: Vec<MetaColumn>,
}

impl MetaTable {
    pub fn with_rows(n_rows: usize) -> Self {
        Self {
            n_rows,
            columns: Vec::new(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn columns(&self) -> &[MetaColumn] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, column: &str, row: usize) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.name == column)?
            .values
            .get(row)?
            .as_deref()
    }

    /// Adds a column, replacing any existing column of the same name.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<Option<String>>) -> Result<()> {
        if values.len() != self.n_rows {
            return Err(PanError::ShapeMismatch(format!(
                "metadata column has {} values but the dimension has {} rows",
                values.len(),
                self.n_rows
            )));
        }
        let name = name.into();
        self.columns.retain(|c| c.name != name);
        self.columns.push(MetaColumn { name, values });
        Ok(())
    }

    /// Left-joins `incoming` onto this dimension: `keys` holds the canonical
    /// row keys in dimension order, and the join key column of `incoming` is
    /// resolved via `key_aliases`. Rows of `keys` with no match are
    /// null-filled; incoming rows whose key matches nothing are ignored.
    /// A missing key column or a duplicated key value is a shape mismatch.
    pub fn left_join(&mut self, keys: &[String], incoming: &Table, key_aliases: &[&str]) -> Result<()> {
        debug_assert_eq!(keys.len(), self.n_rows);
        let key_col = incoming.first_column_index(key_aliases).ok_or_else(|| {
            PanError::ShapeMismatch(format!(
                "join key column '{}' not found in metadata table",
                key_aliases.join("|")
            ))
        })?;

        let mut by_key: HashMap<&str, usize> = HashMap::with_capacity(incoming.n_rows());
        for (r, row) in incoming.rows().enumerate() {
            if by_key.insert(row[key_col].as_str(), r).is_some() {
                return Err(PanError::ShapeMismatch(format!(
                    "join key '{}' appears more than once in metadata table",
                    row[key_col]
                )));
            }
        }

        for (ci, cname) in incoming.columns().iter().enumerate() {
            if ci == key_col {
                continue;
            }
            let values: Vec<Option<String>> = keys
                .iter()
                .map(|k| by_key.get(k.as_str()).map(|&r| incoming.row(r)[ci].clone()))
                .collect();
            self.push_column(cname.clone(), values)?;
        }
        Ok(())
    }
}
