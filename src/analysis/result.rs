use serde::Serialize;
use thiserror::Error;

use super::derivative::FitError;
use super::sweep::SweepDirection;

// ---------------------------------------------------------------------------
// Points and series
// ---------------------------------------------------------------------------

/// One extracted mobility value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MobilityPoint {
    /// Independent variable (V).
    pub gate_voltage: f64,
    /// Fixed drain voltage of the group the point came from (V).
    pub drain_voltage: f64,
    /// Mobility (cm²/V·s).
    pub mobility: f64,
}

/// Mobility points for one sweep direction.  Only finite values get in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MobilitySeries {
    points: Vec<MobilityPoint>,
}

impl MobilitySeries {
    /// Append a point unless its mobility is NaN or infinite.  Returns
    /// whether the point was kept.
    pub fn push(&mut self, point: MobilityPoint) -> bool {
        if point.mobility.is_finite() {
            self.points.push(point);
            true
        } else {
            false
        }
    }

    pub fn points(&self) -> &[MobilityPoint] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MobilityPoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point with the largest mobility.
    pub fn peak(&self) -> Option<&MobilityPoint> {
        self.points
            .iter()
            .max_by(|a, b| a.mobility.total_cmp(&b.mobility))
    }
}

impl<'a> IntoIterator for &'a MobilitySeries {
    type Item = &'a MobilityPoint;
    type IntoIter = std::slice::Iter<'a, MobilityPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Why a result is degraded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisWarning {
    #[error("{direction} fit at fixed {fixed_voltage} V failed: {source}")]
    FitFailed {
        direction: SweepDirection,
        fixed_voltage: f64,
        source: FitError,
    },
}

// ---------------------------------------------------------------------------
// AnalysisResult
// ---------------------------------------------------------------------------

/// Output of one curve analysis.
///
/// A failed fit stops the analysis; the points gathered before it are kept
/// and the failure is listed in `warnings`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub forward: MobilitySeries,
    pub backward: MobilitySeries,
    #[serde(serialize_with = "serialize_warnings")]
    pub warnings: Vec<AnalysisWarning>,
}

fn serialize_warnings<S>(warnings: &[AnalysisWarning], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(warnings.iter().map(ToString::to_string))
}

impl AnalysisResult {
    /// Whether the analysis ran to the end without a failed fit.
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn series(&self, direction: SweepDirection) -> &MobilitySeries {
        match direction {
            SweepDirection::Forward => &self.forward,
            SweepDirection::Backward => &self.backward,
        }
    }

    pub fn series_mut(&mut self, direction: SweepDirection) -> &mut MobilitySeries {
        match direction {
            SweepDirection::Forward => &mut self.forward,
            SweepDirection::Backward => &mut self.backward,
        }
    }
}
