use log::trace;

use crate::data::filter::Group;
use crate::data::model::{ColumnId, DataTable, TableError};

use super::sweep::{SweepLegs, SweepOrder, split_sweep};

/// Group rows by a fixed (programmed) voltage column.
///
/// Groups come back in table order; rows inside a group keep table order.
pub fn group_by_fixed(table: &DataTable, column: ColumnId) -> Vec<Group> {
    let groups = table.split(column);
    trace!("{} rows → {} fixed-voltage groups", table.len(), groups.len());
    groups
}

/// Split every `fixed` group of `table` into sweep legs along `monitored`,
/// then reassemble all forward legs and all backward legs in group order.
pub fn split_within_groups<O>(
    table: &DataTable,
    fixed: ColumnId,
    monitored: ColumnId,
    order: &O,
) -> Result<SweepLegs, TableError>
where
    O: SweepOrder + ?Sized,
{
    let mut forward = table.empty_like();
    let mut backward = table.empty_like();

    for group in group_by_fixed(table, fixed) {
        let legs = split_sweep(&group.table, monitored, order);
        forward.extend_from(&legs.forward)?;
        backward.extend_from(&legs.backward)?;
    }

    Ok(SweepLegs { forward, backward })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::sweep::HighToLow;

    #[test]
    fn legs_are_split_inside_each_group() {
        // two gate groups, each sweeping drain 0 → -2 → 0
        let mut rows = Vec::new();
        for vg in [-10.0, -20.0] {
            for vd in [0.0, -1.0, -2.0, -1.0, 0.0] {
                rows.push(vec![vd, vg]);
            }
        }
        let t = DataTable::from_rows(["vd", "vg"], rows).unwrap();
        let vd = t.column("vd").unwrap();
        let vg = t.column("vg").unwrap();

        let legs = split_within_groups(&t, vg, vd, &HighToLow).unwrap();
        assert_eq!(
            legs.forward.column_values(vd),
            vec![0.0, -1.0, -2.0, 0.0, -1.0, -2.0]
        );
        assert_eq!(
            legs.forward.column_values(vg),
            vec![-10.0, -10.0, -10.0, -20.0, -20.0, -20.0]
        );
        assert_eq!(legs.backward.column_values(vd), vec![-1.0, 0.0, -1.0, 0.0]);
    }
}
