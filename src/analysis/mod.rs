//! Mobility extraction from output and transfer sweeps.
//!
//! Pipeline:
//! ```text
//!   DataTable ──▶ group / sweep split ──▶ CubicSpline ──▶ MobilityModel
//!                                                             │
//!                                                             ▼
//!                                     AnalysisResult { forward, backward, warnings }
//! ```
//!
//! Every analysis is a pure function of the table and the geometry.  Cache
//! a result with [`MemoizedAnalysis`] when it is needed more than once.

pub mod derivative;
pub mod geometry;
pub mod group;
pub mod mobility;
pub mod output;
pub mod result;
pub mod summary;
pub mod sweep;
pub mod transfer;

use crate::data::model::{ColumnId, DataTable, TableError};

use geometry::Geometry;
use result::AnalysisResult;

/// Programmed drain (source-drain) voltage.
pub const DRAIN_VOLTAGE: &str = "Set-SD-voltage";
/// Programmed gate (source-gate) voltage.
pub const GATE_VOLTAGE: &str = "Set-SG-voltage";
/// Measured drain current.
pub const DRAIN_CURRENT: &str = "SD current";

// ---------------------------------------------------------------------------
// Column handles shared by all analyses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportColumns {
    pub drain: ColumnId,
    pub gate: ColumnId,
    pub current: ColumnId,
}

impl TransportColumns {
    pub fn resolve(table: &DataTable) -> Result<Self, TableError> {
        Ok(Self {
            drain: table.column(DRAIN_VOLTAGE)?,
            gate: table.column(GATE_VOLTAGE)?,
            current: table.column(DRAIN_CURRENT)?,
        })
    }

    /// |I| for every row of `table`.
    pub fn abs_current(&self, table: &DataTable) -> Vec<f64> {
        table.rows().map(|r| r.get(self.current).abs()).collect()
    }

    /// √|I| for every row of `table`.
    pub fn sqrt_current(&self, table: &DataTable) -> Vec<f64> {
        table
            .rows()
            .map(|r| r.get(self.current).abs().sqrt())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// CurveAnalysis
// ---------------------------------------------------------------------------

/// Turns one captured sweep into forward and backward mobility series.
pub trait CurveAnalysis {
    /// Run the analysis.  Fails only when the table lacks a required
    /// column; numerical trouble is reported through the result's warnings.
    fn analyze(&self, table: &DataTable, geometry: &Geometry)
        -> Result<AnalysisResult, TableError>;
}

/// Caller-held cache around a [`CurveAnalysis`].
pub struct MemoizedAnalysis<'a, A> {
    analysis: A,
    table: &'a DataTable,
    geometry: Geometry,
    cached: Option<AnalysisResult>,
}

impl<'a, A: CurveAnalysis> MemoizedAnalysis<'a, A> {
    pub fn new(analysis: A, table: &'a DataTable, geometry: Geometry) -> Self {
        Self {
            analysis,
            table,
            geometry,
            cached: None,
        }
    }

    /// Whether a result has been computed.
    pub fn is_computed(&self) -> bool {
        self.cached.is_some()
    }

    /// Cached result, computing it on first use.
    pub fn get(&mut self) -> Result<&AnalysisResult, TableError> {
        let result = match self.cached.take() {
            Some(result) => result,
            None => self.analysis.analyze(self.table, &self.geometry)?,
        };
        Ok(self.cached.insert(result))
    }

    /// Recompute and replace the cached result.
    pub fn refresh(&mut self) -> Result<&AnalysisResult, TableError> {
        let result = self.analysis.analyze(self.table, &self.geometry)?;
        Ok(self.cached.insert(result))
    }
}
