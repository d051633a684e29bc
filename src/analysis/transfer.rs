use log::{debug, warn};

use crate::data::filter::Group;
use crate::data::model::{DataTable, TableError};

use super::derivative::{CubicSpline, Differentiable};
use super::geometry::Geometry;
use super::group::group_by_fixed;
use super::mobility::{MobilityModel, Regime};
use super::result::{AnalysisResult, AnalysisWarning, MobilityPoint};
use super::sweep::{HighToLow, SweepOrder, split_sweep};
use super::{CurveAnalysis, TransportColumns};

// ---------------------------------------------------------------------------
// TransferMobility
// ---------------------------------------------------------------------------

/// Mobility from transfer curves (drain current vs. gate voltage, one trace
/// per drain voltage).
///
/// The regime is chosen once per drain-voltage trace and applies to both of
/// its legs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferMobility<O = HighToLow> {
    order: O,
}

impl TransferMobility {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Regime of one drain-voltage trace.
pub fn trace_regime(group: &Group, columns: TransportColumns) -> Regime {
    let max_abs_vg = group
        .table
        .rows()
        .map(|r| r.get(columns.gate).abs())
        .fold(0.0, f64::max);
    Regime::select(group.value, max_abs_vg)
}

impl<O: SweepOrder> TransferMobility<O> {
    pub fn with_order(order: O) -> Self {
        Self { order }
    }

    fn accumulate(
        &self,
        groups: &[Group],
        columns: TransportColumns,
        model: &MobilityModel,
        result: &mut AnalysisResult,
    ) -> Result<(), AnalysisWarning> {
        for group in groups {
            let vsd = group.value;
            let regime = trace_regime(group, columns);
            let gate_voltages = group.table.unique(columns.gate);
            let legs = split_sweep(&group.table, columns.gate, &self.order);
            debug!("VSD={vsd}: {regime:?} regime, {} gate voltages", gate_voltages.len());

            for (direction, leg) in legs.iter() {
                if leg.len() < 2 {
                    debug!("{direction} VSD={vsd}: {} row(s), skipped", leg.len());
                    continue;
                }

                let current = match regime {
                    Regime::Linear => columns.abs_current(leg),
                    Regime::Saturation => columns.sqrt_current(leg),
                };
                let fit = CubicSpline::fit(&leg.column_values(columns.gate), &current).map_err(
                    |source| AnalysisWarning::FitFailed {
                        direction,
                        fixed_voltage: vsd,
                        source,
                    },
                )?;

                let series = result.series_mut(direction);
                for &gate_voltage in &gate_voltages {
                    series.push(MobilityPoint {
                        gate_voltage,
                        drain_voltage: vsd,
                        mobility: model.in_regime(regime, fit.derivative(gate_voltage), vsd),
                    });
                }
            }
        }
        Ok(())
    }
}

impl<O: SweepOrder> CurveAnalysis for TransferMobility<O> {
    fn analyze(
        &self,
        table: &DataTable,
        geometry: &Geometry,
    ) -> Result<AnalysisResult, TableError> {
        let columns = TransportColumns::resolve(table)?;
        let model = MobilityModel::new(*geometry);
        let groups = group_by_fixed(table, columns.drain);

        let mut result = AnalysisResult::default();
        if let Err(warning) = self.accumulate(&groups, columns, &model, &mut result) {
            warn!("transfer mobility stopped early: {warning}");
            result.warnings.push(warning);
        }
        Ok(result)
    }
}
