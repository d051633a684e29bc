use log::{debug, warn};
use serde::Serialize;

use crate::data::model::{DataTable, TableError};

use super::derivative::{CubicSpline, Differentiable};
use super::geometry::Geometry;
use super::mobility::{MobilityModel, Regime};
use super::result::AnalysisWarning;
use super::sweep::{HighToLow, SweepDirection, SweepLegs, SweepOrder, split_sweep};
use super::TransportColumns;

/// One row of the summary: the four canonical traces at one gate voltage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryRow {
    pub gate_voltage: f64,
    pub linear_forward: f64,
    pub linear_backward: f64,
    pub saturation_forward: f64,
    pub saturation_backward: f64,
}

// ---------------------------------------------------------------------------
// TransferSummary
// ---------------------------------------------------------------------------

/// Linear and saturation mobility, forward and backward, from the smallest
/// and largest drain voltage of a transfer measurement.
///
/// Every gate voltage of the table gets a row.  A trace whose leg has fewer
/// than two samples, or whose fit failed, reads `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferSummary {
    drain_lin: Option<f64>,
    drain_sat: Option<f64>,
    rows: Vec<SummaryRow>,
    warnings: Vec<AnalysisWarning>,
}

/// Fitted legs for one drain voltage.
struct LegFits {
    forward: Option<CubicSpline>,
    backward: Option<CubicSpline>,
}

impl TransferSummary {
    pub fn new(table: &DataTable, geometry: &Geometry) -> Result<Self, TableError> {
        Self::with_order(table, geometry, &HighToLow)
    }

    pub fn with_order<O>(
        table: &DataTable,
        geometry: &Geometry,
        order: &O,
    ) -> Result<Self, TableError>
    where
        O: SweepOrder + ?Sized,
    {
        let columns = TransportColumns::resolve(table)?;
        let model = MobilityModel::new(*geometry);
        let mut warnings = Vec::new();

        let drain_lin = table
            .min_by_key(|r| r.get(columns.drain).abs())
            .map(|r| r.get(columns.drain));
        let drain_sat = table
            .max_by_key(|r| r.get(columns.drain).abs())
            .map(|r| r.get(columns.drain));
        let (Some(lin), Some(sat)) = (drain_lin, drain_sat) else {
            return Ok(Self {
                drain_lin,
                drain_sat,
                rows: Vec::new(),
                warnings,
            });
        };
        debug!("summary: linear trace at VSD={lin}, saturation trace at VSD={sat}");

        let legs_at = |vsd: f64| {
            let rows = table.filter(|r| r.get(columns.drain) == vsd);
            split_sweep(&rows, columns.gate, order)
        };
        let lin_fits = fit_legs(&legs_at(lin), lin, Regime::Linear, columns, &mut warnings);
        let sat_fits = fit_legs(&legs_at(sat), sat, Regime::Saturation, columns, &mut warnings);

        let evaluate = |fit: &Option<CubicSpline>, regime: Regime, vsd: f64, vg: f64| {
            fit.as_ref()
                .map(|f| model.in_regime(regime, f.derivative(vg), vsd))
                .filter(|m| m.is_finite())
                .unwrap_or(0.0)
        };

        let rows = table
            .unique(columns.gate)
            .into_iter()
            .map(|vg| SummaryRow {
                gate_voltage: vg,
                linear_forward: evaluate(&lin_fits.forward, Regime::Linear, lin, vg),
                linear_backward: evaluate(&lin_fits.backward, Regime::Linear, lin, vg),
                saturation_forward: evaluate(&sat_fits.forward, Regime::Saturation, sat, vg),
                saturation_backward: evaluate(&sat_fits.backward, Regime::Saturation, sat, vg),
            })
            .collect();

        Ok(Self {
            drain_lin,
            drain_sat,
            rows,
            warnings,
        })
    }

    /// Drain voltage with the smallest magnitude.
    pub fn drain_lin(&self) -> Option<f64> {
        self.drain_lin
    }

    /// Drain voltage with the largest magnitude.
    pub fn drain_sat(&self) -> Option<f64> {
        self.drain_sat
    }

    /// Rows in ascending gate voltage.
    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn warnings(&self) -> &[AnalysisWarning] {
        &self.warnings
    }

    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Largest saturation mobility over both legs.
    pub fn peak_saturation(&self) -> Option<f64> {
        self.rows
            .iter()
            .flat_map(|r| [r.saturation_forward, r.saturation_backward])
            .max_by(f64::total_cmp)
    }
}

fn fit_legs(
    legs: &SweepLegs,
    vsd: f64,
    regime: Regime,
    columns: TransportColumns,
    warnings: &mut Vec<AnalysisWarning>,
) -> LegFits {
    let mut fit = |leg: &DataTable, direction: SweepDirection| {
        if leg.len() < 2 {
            return None;
        }
        let current = match regime {
            Regime::Linear => columns.abs_current(leg),
            Regime::Saturation => columns.sqrt_current(leg),
        };
        match CubicSpline::fit(&leg.column_values(columns.gate), &current) {
            Ok(spline) => Some(spline),
            Err(source) => {
                let warning = AnalysisWarning::FitFailed {
                    direction,
                    fixed_voltage: vsd,
                    source,
                };
                warn!("summary trace unavailable: {warning}");
                warnings.push(warning);
                None
            }
        }
    };

    let mut fits = legs.iter().map(|(direction, leg)| fit(leg, direction));
    LegFits {
        forward: fits.next().flatten(),
        backward: fits.next().flatten(),
    }
}
