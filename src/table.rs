//! The in-memory record table every pipeline stage reads and rewrites.
//!
//! Storage is column-major: stages mostly add, drop or rewrite whole columns,
//! and column order is meaningful (tag columns are "everything after
//! `Serviço`", real engagement sits right after `Manifestações`).

use std::fmt;

use serde::Serialize;

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Text(String),
    Number(f64),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Lenient numeric view: numbers pass through, numeric text is parsed,
    /// anything else counts as zero.
    pub fn to_number_or_zero(&self) -> f64 {
        let n = match self {
            Value::Number(n) => *n,
            Value::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            Value::Null => 0.0,
        };
        if n.is_finite() { n } else { 0.0 }
    }

    /// Text rendering used when values are concatenated into strings.
    /// Null renders as an empty string.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Column {
            name: name.into(),
            values,
        }
    }

    pub fn is_all_null(&self) -> bool {
        self.values.iter().all(Value::is_null)
    }
}

/// Ordered set of named columns sharing one height.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    columns: Vec<Column>,
    height: usize,
}

impl Table {
    pub fn new(height: usize) -> Self {
        Table {
            columns: Vec::new(),
            height,
        }
    }

    /// Builds a table from columns that must all have the same length.
    pub fn from_columns(columns: Vec<Column>) -> Self {
        let height = columns.first().map(|c| c.values.len()).unwrap_or(0);
        debug_assert!(columns.iter().all(|c| c.values.len() == height));
        Table { columns, height }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Vec<Value>> {
        self.columns
            .iter_mut()
            .find(|c| c.name == name)
            .map(|c| &mut c.values)
    }

    /// Cell lookup; a missing column reads as null.
    pub fn cell(&self, row: usize, name: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.column(name)
            .and_then(|values| values.get(row))
            .unwrap_or(&NULL)
    }

    /// Assigns a column: replaced in place when the name exists, appended
    /// otherwise.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.height);
        match self.column_mut(name) {
            Some(existing) => *existing = values,
            None => self.columns.push(Column::new(name, values)),
        }
    }

    /// Inserts a new column at `index` (clamped to the width). An existing
    /// column of the same name is removed first.
    pub fn insert_column(&mut self, index: usize, name: &str, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.height);
        self.drop_column(name);
        let index = index.min(self.columns.len());
        self.columns.insert(index, Column::new(name, values));
    }

    pub fn drop_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.position(name)?;
        Some(self.columns.remove(idx))
    }

    /// Renames `from` in place; returns false when there is no such column.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.columns.iter_mut().find(|c| c.name == from) {
            Some(column) => {
                column.name = to.to_string();
                true
            }
            None => false,
        }
    }

    pub fn retain_columns<F: FnMut(&Column) -> bool>(&mut self, f: F) {
        self.columns.retain(f);
    }

    pub fn for_each_value_mut<F: FnMut(&mut Value)>(&mut self, mut f: F) {
        for column in &mut self.columns {
            column.values.iter_mut().for_each(&mut f);
        }
    }

    /// Appends the columns of `other`, aligned by row position. Names that
    /// already exist get a numeric suffix.
    pub fn append_columns(&mut self, other: Table) {
        debug_assert!(other.columns.is_empty() || other.height == self.height);
        for column in other.columns {
            let name = unique_name(&column.name, |n| self.contains(n));
            self.columns.push(Column::new(name, column.values));
        }
    }

    /// Row `i` as a vector of references in column order.
    pub fn row(&self, i: usize) -> Vec<&Value> {
        self.columns.iter().map(|c| &c.values[i]).collect()
    }
}

/// `base`, `base.1`, `base.2`… whichever is first not taken.
pub(crate) fn unique_name<F: Fn(&str) -> bool>(base: &str, taken: F) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (1..)
        .map(|i| format!("{base}.{i}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}
