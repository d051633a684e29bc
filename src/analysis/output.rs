use log::{debug, warn};

use crate::data::model::{DataTable, TableError};

use super::derivative::{CubicSpline, Differentiable, FitError};
use super::geometry::Geometry;
use super::group::{group_by_fixed, split_within_groups};
use super::mobility::MobilityModel;
use super::result::{AnalysisResult, AnalysisWarning, MobilityPoint};
use super::sweep::{HighToLow, SweepLegs, SweepOrder};
use super::{CurveAnalysis, TransportColumns};

// ---------------------------------------------------------------------------
// OutputMobility
// ---------------------------------------------------------------------------

/// Mobility from output curves (drain current vs. drain voltage, one trace
/// per gate voltage).
///
/// Drain-voltage sweeps are split into legs inside each gate-voltage trace.
/// Each leg is then regrouped by drain voltage and, per drain voltage, the
/// current is fitted against gate voltage.  Both regime formulas are
/// evaluated and the larger value is reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputMobility<O = HighToLow> {
    order: O,
}

impl OutputMobility {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<O: SweepOrder> OutputMobility<O> {
    /// Use a different sweep direction convention.
    pub fn with_order(order: O) -> Self {
        Self { order }
    }

    fn accumulate(
        &self,
        legs: &SweepLegs,
        columns: TransportColumns,
        model: &MobilityModel,
        result: &mut AnalysisResult,
    ) -> Result<(), AnalysisWarning> {
        for (direction, leg) in legs.iter() {
            for group in group_by_fixed(leg, columns.drain) {
                let vsd = group.value;
                if group.table.len() < 2 {
                    debug!("{direction} VSD={vsd}: {} row(s), skipped", group.table.len());
                    continue;
                }

                let fail = |source: FitError| AnalysisWarning::FitFailed {
                    direction,
                    fixed_voltage: vsd,
                    source,
                };
                let vg = group.table.column_values(columns.gate);
                let linear = CubicSpline::fit(&vg, &columns.abs_current(&group.table))
                    .map_err(fail)?;
                let saturation = CubicSpline::fit(&vg, &columns.sqrt_current(&group.table))
                    .map_err(fail)?;

                let series = result.series_mut(direction);
                for gate_voltage in group.table.unique(columns.gate) {
                    let lin = model.linear(linear.derivative(gate_voltage), vsd);
                    let sat = model.saturation(saturation.derivative(gate_voltage));
                    series.push(MobilityPoint {
                        gate_voltage,
                        drain_voltage: vsd,
                        mobility: larger(lin, sat),
                    });
                }
            }
        }
        Ok(())
    }
}

/// The larger of the two regime values.  A NaN linear value wins, so a
/// point whose linear formula is undefined (VSD = 0) gets dropped.
fn larger(linear: f64, saturation: f64) -> f64 {
    if saturation > linear {
        saturation
    } else {
        linear
    }
}

impl<O: SweepOrder> CurveAnalysis for OutputMobility<O> {
    fn analyze(
        &self,
        table: &DataTable,
        geometry: &Geometry,
    ) -> Result<AnalysisResult, TableError> {
        let columns = TransportColumns::resolve(table)?;
        let model = MobilityModel::new(*geometry);
        let legs = split_within_groups(table, columns.gate, columns.drain, &self.order)?;
        debug!(
            "output curve: {} forward / {} backward rows",
            legs.forward.len(),
            legs.backward.len()
        );

        let mut result = AnalysisResult::default();
        if let Err(warning) = self.accumulate(&legs, columns, &model, &mut result) {
            warn!("output mobility stopped early: {warning}");
            result.warnings.push(warning);
        }
        Ok(result)
    }
}
