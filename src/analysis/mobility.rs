use super::geometry::Geometry;

/// m²/V·s → cm²/V·s.
pub const CM2_PER_M2: f64 = 1e4;

// ---------------------------------------------------------------------------
// Operating regime
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Regime {
    Linear,
    Saturation,
}

impl Regime {
    /// Linear when the drain voltage magnitude is strictly below the largest
    /// gate voltage magnitude, saturation otherwise (ties go to saturation).
    pub fn select(drain_voltage: f64, max_abs_gate_voltage: f64) -> Self {
        if drain_voltage.abs() < max_abs_gate_voltage {
            Regime::Linear
        } else {
            Regime::Saturation
        }
    }
}

// ---------------------------------------------------------------------------
// MobilityModel
// ---------------------------------------------------------------------------

/// Gradual-channel mobility formulas for one device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MobilityModel {
    geometry: Geometry,
    capacitance: f64,
}

impl MobilityModel {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            capacitance: geometry.capacitance(),
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Linear-regime mobility in cm²/V·s from d|I|/dVG at drain voltage `vsd`.
    ///
    /// Not finite when `vsd` is zero; callers drop such values.
    pub fn linear(&self, di_dvg: f64, vsd: f64) -> f64 {
        let g = &self.geometry;
        CM2_PER_M2 * (g.length() / (self.capacitance * g.width()) * (di_dvg / vsd)).abs()
    }

    /// Saturation-regime mobility in cm²/V·s from d√|I|/dVG.
    pub fn saturation(&self, dsqrt_i_dvg: f64) -> f64 {
        let g = &self.geometry;
        CM2_PER_M2 * 2.0 * dsqrt_i_dvg.powi(2) * g.length() / (g.width() * self.capacitance)
    }

    /// Mobility for `regime` from the matching derivative.
    pub fn in_regime(&self, regime: Regime, derivative: f64, vsd: f64) -> f64 {
        match regime {
            Regime::Linear => self.linear(derivative, vsd),
            Regime::Saturation => self.saturation(derivative),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn model() -> MobilityModel {
        MobilityModel::new(Geometry::new(20e-6, 1000e-6, 2.05, 480e-9).unwrap())
    }

    #[test]
    fn linear_mobility_reference_value() {
        let m = model();
        let c = m.geometry().capacitance();
        let expected = 1e4 * (20e-6 / (c * 1000e-6) * (1e-7 / 60.0)).abs();
        assert_relative_eq!(m.linear(1.0e-7, 60.0), expected);
        assert_relative_eq!(m.linear(1.0e-7, 60.0), 8.815e-3, max_relative = 1e-3);
        // sign of the drain voltage and slope does not matter
        assert_relative_eq!(m.linear(-1.0e-7, 60.0), m.linear(1.0e-7, -60.0));
    }

    #[test]
    fn saturation_mobility_reference_value() {
        let m = model();
        let c = m.geometry().capacitance();
        let d = 3.0e-4;
        assert_relative_eq!(m.saturation(d), 1e4 * 2.0 * d * d * 20e-6 / (1000e-6 * c));
        assert_relative_eq!(m.saturation(-d), m.saturation(d));
    }

    #[test]
    fn zero_drain_voltage_is_not_finite() {
        assert!(!model().linear(1e-7, 0.0).is_finite());
    }

    #[test]
    fn regime_ties_favour_saturation() {
        assert_eq!(Regime::select(-10.0, 60.0), Regime::Linear);
        assert_eq!(Regime::select(-60.0, 60.0), Regime::Saturation);
        assert_eq!(Regime::select(60.0, 60.0), Regime::Saturation);
        assert_eq!(Regime::select(-80.0, 60.0), Regime::Saturation);
    }
}
