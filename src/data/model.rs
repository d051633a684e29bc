use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Reserved attributes
// ---------------------------------------------------------------------------

/// Attribute keys that describe the device or the file itself.  Every other
/// attribute in a table is a free-form user variable.
pub const RESERVED_ATTRIBUTES: &[&str] = &[
    "Length",
    "Width",
    "Thickness",
    "FPP Separation",
    "Dielectric Thickness",
    "Dielectric Permittivity",
    "Name",
    "Type",
];

/// Whether `key` is one of the [`RESERVED_ATTRIBUTES`].
pub fn is_reserved_attribute(key: &str) -> bool {
    RESERVED_ATTRIBUTES.contains(&key)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("table has no column named '{0}'")]
    MissingColumn(String),
    #[error("column index {index} out of range ({width} columns)")]
    ColumnOutOfRange { index: usize, width: usize },
    #[error("row {row} has {found} values but the table has {expected} columns")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}

// ---------------------------------------------------------------------------
// ColumnId – a column handle resolved once against a table layout
// ---------------------------------------------------------------------------

/// Strongly-typed handle to a column.  Resolve it once with
/// [`DataTable::column`] and reuse it for every row access; sub-tables
/// produced by filtering or grouping keep the same layout, so a handle
/// resolved on the parent stays valid for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnId(usize);

// ---------------------------------------------------------------------------
// Row – borrowed view of one table row
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    values: &'a [f64],
}

impl<'a> Row<'a> {
    /// Value of the given column in this row.
    pub fn get(&self, column: ColumnId) -> f64 {
        self.values[column.0]
    }

    pub fn values(&self) -> &'a [f64] {
        self.values
    }
}

// ---------------------------------------------------------------------------
// DataTable – the captured sweep
// ---------------------------------------------------------------------------

/// An ordered sequence of rows over named numeric columns plus a
/// string-keyed attribute map.
///
/// The analyses never mutate a table; every filtering or grouping operation
/// returns a new table that shares the column layout and attributes of its
/// parent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataTable {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
    attributes: BTreeMap<String, String>,
}

impl DataTable {
    /// Empty table with the given column layout.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Build a table from complete rows, checking every row's width.
    pub fn from_rows<I, S>(columns: I, rows: Vec<Vec<f64>>) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Same layout and attributes as `self`, no rows.
    pub fn empty_like(&self) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: Vec::new(),
            attributes: self.attributes.clone(),
        }
    }

    pub fn push_row(&mut self, row: Vec<f64>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    // -- Layout --

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Resolve a column handle by name.
    pub fn column(&self, name: &str) -> Result<ColumnId, TableError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(ColumnId)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Resolve a column handle by position.
    pub fn column_at(&self, index: usize) -> Result<ColumnId, TableError> {
        if index < self.columns.len() {
            Ok(ColumnId(index))
        } else {
            Err(TableError::ColumnOutOfRange {
                index,
                width: self.columns.len(),
            })
        }
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, column: ColumnId) -> Vec<f64> {
        self.rows.iter().map(|r| r[column.0]).collect()
    }

    // -- Rows --

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|values| Row { values })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        self.rows.iter().map(|values| Row { values })
    }

    /// New table holding the rows at `indices`, in the given order.
    pub fn select(&self, indices: &[usize]) -> Self {
        let mut out = self.empty_like();
        out.rows = indices.iter().map(|&i| self.rows[i].clone()).collect();
        out
    }

    /// Append all rows of `other`.  Both tables must share a layout.
    pub fn extend_from(&mut self, other: &DataTable) -> Result<(), TableError> {
        for row in &other.rows {
            self.push_row(row.clone())?;
        }
        Ok(())
    }

    // -- Attributes --

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Attribute parsed as a number, `None` when absent or not numeric.
    pub fn attribute_f64(&self, key: &str) -> Option<f64> {
        self.attribute(key).and_then(|v| v.trim().parse::<f64>().ok())
    }

    /// Free-form attributes, i.e. everything that is not reserved.
    pub fn user_attributes(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.attributes
            .iter()
            .filter(|(k, _)| !is_reserved_attribute(k))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for DataTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows × {} columns [{}]",
            self.rows.len(),
            self.columns.len(),
            self.columns.join(", ")
        )
    }
}

// ---------------------------------------------------------------------------
// CurveKind – which measurement family a table holds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CurveKind {
    /// Drain current vs. drain voltage at fixed gate voltages.
    Output,
    /// Drain current vs. gate voltage at fixed drain voltages.
    Transfer,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown curve type '{0}' (expected output or transfer)")]
pub struct UnknownCurveKind(pub String);

impl std::str::FromStr for CurveKind {
    type Err = UnknownCurveKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "output" => Ok(CurveKind::Output),
            "transfer" => Ok(CurveKind::Transfer),
            _ => Err(UnknownCurveKind(s.to_string())),
        }
    }
}

impl fmt::Display for CurveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurveKind::Output => write!(f, "Output"),
            CurveKind::Transfer => write!(f, "Transfer"),
        }
    }
}

impl DataTable {
    /// Curve kind declared by the `Type` attribute, if any.
    pub fn curve_kind(&self) -> Option<Result<CurveKind, UnknownCurveKind>> {
        self.attribute("Type").map(str::parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataTable {
        DataTable::from_rows(
            ["a", "b"],
            vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]],
        )
        .unwrap()
        .with_attribute("Name", "Dev")
        .with_attribute("Operator", "kim")
    }

    #[test]
    fn resolves_columns_by_name_and_index() {
        let t = sample();
        let b = t.column("b").unwrap();
        assert_eq!(b, t.column_at(1).unwrap());
        assert_eq!(t.column_values(b), vec![10.0, 20.0, 30.0]);
        assert_eq!(t.column("c"), Err(TableError::MissingColumn("c".into())));
        assert!(t.column_at(2).is_err());
    }

    #[test]
    fn rejects_rows_of_wrong_width() {
        let mut t = DataTable::new(["a", "b"]);
        let err = t.push_row(vec![1.0]).unwrap_err();
        assert_eq!(
            err,
            TableError::RowWidth {
                row: 0,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn select_keeps_layout_and_attributes() {
        let t = sample();
        let s = t.select(&[2, 0]);
        assert_eq!(s.len(), 2);
        assert_eq!(s.row(0).unwrap().values(), &[3.0, 30.0]);
        assert_eq!(s.attribute("Name"), Some("Dev"));
        assert_eq!(s.column_names(), t.column_names());
    }

    #[test]
    fn user_attributes_skip_reserved_keys() {
        let t = sample();
        let user: Vec<_> = t.user_attributes().collect();
        assert_eq!(user, vec![("Operator", "kim")]);
    }

    #[test]
    fn curve_kind_from_type_attribute() {
        let t = DataTable::new(["a"]).with_attribute("Type", "Transfer");
        assert_eq!(t.curve_kind(), Some(Ok(CurveKind::Transfer)));
        let t = DataTable::new(["a"]).with_attribute("Type", "sweep");
        assert!(matches!(t.curve_kind(), Some(Err(_))));
        assert_eq!(DataTable::new(["a"]).curve_kind(), None);
    }
}
