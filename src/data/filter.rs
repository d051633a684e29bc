use std::collections::HashMap;

use super::model::{ColumnId, DataTable, Row};

// ---------------------------------------------------------------------------
// Row predicates and grouping
// ---------------------------------------------------------------------------

/// One group produced by [`DataTable::split`]: every row whose column held
/// exactly `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub value: f64,
    pub table: DataTable,
}

/// Hash key for exact float equality.  `-0.0` and `0.0` compare equal, so
/// they share a key.
fn exact_key(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

impl DataTable {
    /// Rows for which `predicate` holds, in table order.
    pub fn filter<F>(&self, predicate: F) -> DataTable
    where
        F: Fn(&Row<'_>) -> bool,
    {
        let indices: Vec<usize> = self
            .rows()
            .enumerate()
            .filter(|(_, row)| predicate(row))
            .map(|(i, _)| i)
            .collect();
        self.select(&indices)
    }

    /// Group rows by the exact stored value of `column`.
    ///
    /// Groups appear in order of first occurrence and every group keeps the
    /// table order of its rows.  Values are compared as stored: these are
    /// programmed set-points, not noisy readings.
    pub fn split(&self, column: ColumnId) -> Vec<Group> {
        let mut slots: HashMap<u64, usize> = HashMap::new();
        let mut order: Vec<(f64, Vec<usize>)> = Vec::new();

        for (i, row) in self.rows().enumerate() {
            let value = row.get(column);
            let slot = *slots.entry(exact_key(value)).or_insert_with(|| {
                order.push((value, Vec::new()));
                order.len() - 1
            });
            order[slot].1.push(i);
        }

        order
            .into_iter()
            .map(|(value, indices)| Group {
                value,
                table: self.select(&indices),
            })
            .collect()
    }

    /// Distinct values of `column`, ascending.
    pub fn unique(&self, column: ColumnId) -> Vec<f64> {
        let mut values = self.column_values(column);
        values.sort_by(f64::total_cmp);
        values.dedup_by(|a, b| a == b);
        values
    }

    /// Row minimising `key`.  Rows whose key is NaN never win.
    pub fn min_by_key<F>(&self, key: F) -> Option<Row<'_>>
    where
        F: Fn(&Row<'_>) -> f64,
    {
        self.rows()
            .map(|row| (key(&row), row))
            .filter(|(k, _)| !k.is_nan())
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, row)| row)
    }

    /// Row maximising `key`.  Rows whose key is NaN never win.
    pub fn max_by_key<F>(&self, key: F) -> Option<Row<'_>>
    where
        F: Fn(&Row<'_>) -> f64,
    {
        self.rows()
            .map(|row| (key(&row), row))
            .filter(|(k, _)| !k.is_nan())
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, row)| row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> DataTable {
        DataTable::from_rows(
            ["v", "i"],
            vec![
                vec![-20.0, 1.0],
                vec![0.0, 2.0],
                vec![-20.0, 3.0],
                vec![-0.0, 4.0],
                vec![-60.0, 5.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn split_preserves_first_occurrence_order() {
        let t = table();
        let v = t.column("v").unwrap();
        let i = t.column("i").unwrap();
        let groups = t.split(v);
        let values: Vec<f64> = groups.iter().map(|g| g.value).collect();
        assert_eq!(values, vec![-20.0, 0.0, -60.0]);
        assert_eq!(groups[0].table.column_values(i), vec![1.0, 3.0]);
        // signed zeros share a group
        assert_eq!(groups[1].table.column_values(i), vec![2.0, 4.0]);
    }

    #[test]
    fn unique_is_ascending_and_deduplicated() {
        let t = table();
        let v = t.column("v").unwrap();
        assert_eq!(t.unique(v), vec![-60.0, -20.0, 0.0]);
    }

    #[test]
    fn filter_and_extremes() {
        let t = table();
        let v = t.column("v").unwrap();
        let i = t.column("i").unwrap();
        let neg = t.filter(|r| r.get(v) < 0.0);
        assert_eq!(neg.column_values(i), vec![1.0, 3.0, 5.0]);

        let min = t.min_by_key(|r| r.get(v).abs()).unwrap();
        assert_eq!(min.get(i), 2.0);
        let max = t.max_by_key(|r| r.get(v).abs()).unwrap();
        assert_eq!(max.get(v), -60.0);
        assert!(DataTable::new(["v"]).min_by_key(|_| 0.0).is_none());
    }
}
