use std::fmt;

use serde::Serialize;

use crate::data::model::{ColumnId, DataTable};

// ---------------------------------------------------------------------------
// Sweep direction convention
// ---------------------------------------------------------------------------

/// Decides whether a sample continues the forward leg of a two-way sweep.
///
/// The split is only as good as this assumption about how the sweep was
/// generated: with the wrong order, forward and backward labels silently
/// swap.
pub trait SweepOrder {
    /// `true` while `current` still belongs to the forward leg that
    /// `previous` was part of.
    fn continues_forward(&self, previous: f64, current: f64) -> bool;
}

/// Sweeps generated high → low, then back low → high.  A sample is forward
/// while it is strictly below its predecessor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HighToLow;

impl SweepOrder for HighToLow {
    fn continues_forward(&self, previous: f64, current: f64) -> bool {
        current < previous
    }
}

/// Sweeps generated low → high, then back high → low.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LowToHigh;

impl SweepOrder for LowToHigh {
    fn continues_forward(&self, previous: f64, current: f64) -> bool {
        current > previous
    }
}

impl<O: SweepOrder + ?Sized> SweepOrder for &O {
    fn continues_forward(&self, previous: f64, current: f64) -> bool {
        (**self).continues_forward(previous, current)
    }
}

// ---------------------------------------------------------------------------
// Legs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepDirection {
    Forward,
    Backward,
}

impl fmt::Display for SweepDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepDirection::Forward => write!(f, "forward"),
            SweepDirection::Backward => write!(f, "backward"),
        }
    }
}

/// The two legs of a round-trip sweep.  Either may be empty.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepLegs {
    pub forward: DataTable,
    pub backward: DataTable,
}

impl SweepLegs {
    /// Both legs tagged with their direction, forward first.
    pub fn iter(&self) -> impl Iterator<Item = (SweepDirection, &DataTable)> + '_ {
        [
            (SweepDirection::Forward, &self.forward),
            (SweepDirection::Backward, &self.backward),
        ]
        .into_iter()
    }
}

/// Index of the first backward row, i.e. the first row whose value does not
/// continue the forward leg.  The first row is always forward.
fn turnaround<O, I>(values: I, order: &O) -> Option<usize>
where
    O: SweepOrder + ?Sized,
    I: IntoIterator<Item = f64>,
{
    let mut previous: Option<f64> = None;
    for (i, value) in values.into_iter().enumerate() {
        if let Some(prev) = previous {
            if !order.continues_forward(prev, value) {
                return Some(i);
            }
        }
        previous = Some(value);
    }
    None
}

/// Split `table` into forward and backward legs, monitoring `column`.
pub fn split_sweep<O>(table: &DataTable, column: ColumnId, order: &O) -> SweepLegs
where
    O: SweepOrder + ?Sized,
{
    let cut = turnaround(table.rows().map(|r| r.get(column)), order).unwrap_or(table.len());
    let forward: Vec<usize> = (0..cut).collect();
    let backward: Vec<usize> = (cut..table.len()).collect();
    SweepLegs {
        forward: table.select(&forward),
        backward: table.select(&backward),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sweep(values: &[f64]) -> DataTable {
        DataTable::from_rows(["v"], values.iter().map(|&v| vec![v]).collect()).unwrap()
    }

    fn legs_of(values: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let t = sweep(values);
        let v = t.column("v").unwrap();
        let legs = split_sweep(&t, v, &HighToLow);
        (legs.forward.column_values(v), legs.backward.column_values(v))
    }

    #[test]
    fn round_trip_sweep_splits_at_turnaround() {
        let (fwd, bwd) = legs_of(&[0.0, -10.0, -20.0, -30.0, -20.0, -10.0, 0.0]);
        assert_eq!(fwd, vec![0.0, -10.0, -20.0, -30.0]);
        assert_eq!(bwd, vec![-20.0, -10.0, 0.0]);
    }

    #[test]
    fn repeated_value_starts_backward_leg() {
        let (fwd, bwd) = legs_of(&[0.0, -10.0, -10.0, 0.0]);
        assert_eq!(fwd, vec![0.0, -10.0]);
        assert_eq!(bwd, vec![-10.0, 0.0]);
    }

    #[test]
    fn everything_after_turnaround_is_backward() {
        // a second decrease after the turnaround does not reopen the forward leg
        let (fwd, bwd) = legs_of(&[5.0, 3.0, 4.0, 2.0, 1.0]);
        assert_eq!(fwd, vec![5.0, 3.0]);
        assert_eq!(bwd, vec![4.0, 2.0, 1.0]);
    }

    #[test]
    fn single_and_empty_inputs() {
        assert_eq!(legs_of(&[1.0]), (vec![1.0], vec![]));
        assert_eq!(legs_of(&[]), (vec![], vec![]));
    }

    #[test]
    fn leg_sizes_sum_to_input() {
        let inputs: [&[f64]; 4] = [
            &[3.0, 2.0, 1.0, 2.0, 3.0],
            &[1.0, 2.0, 3.0],
            &[3.0, 2.0, 1.0],
            &[0.0, -1.0, -1.0, -1.0],
        ];
        for input in inputs {
            let (fwd, bwd) = legs_of(input);
            assert_eq!(fwd.len() + bwd.len(), input.len());
            assert_eq!(fwd[0], input[0]);
        }
    }

    #[test]
    fn low_to_high_order_inverts_labels() {
        let t = sweep(&[0.0, 10.0, 20.0, 10.0, 0.0]);
        let v = t.column("v").unwrap();
        let legs = split_sweep(&t, v, &LowToHigh);
        assert_eq!(legs.forward.column_values(v), vec![0.0, 10.0, 20.0]);
        assert_eq!(legs.backward.column_values(v), vec![10.0, 0.0]);
    }
}
