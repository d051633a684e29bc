use thiserror::Error;

use crate::data::model::DataTable;

/// Vacuum permittivity in F/m.
pub const VACUUM_PERMITTIVITY: f64 = 8.854187817e-12;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("{name} must be a positive finite number, got {value}")]
    NotPositive { name: &'static str, value: f64 },
    #[error("geometry attribute '{0}' is missing or not numeric")]
    MissingAttribute(&'static str),
}

// ---------------------------------------------------------------------------
// Geometry – channel and dielectric dimensions
// ---------------------------------------------------------------------------

/// Device geometry in SI units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    /// Channel length L (m).
    length: f64,
    /// Channel width W (m).
    width: f64,
    /// Dielectric relative permittivity εr.
    permittivity: f64,
    /// Dielectric thickness t (m).
    thickness: f64,
}

fn positive(name: &'static str, value: f64) -> Result<f64, GeometryError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(GeometryError::NotPositive { name, value })
    }
}

impl Geometry {
    pub fn new(
        length: f64,
        width: f64,
        permittivity: f64,
        thickness: f64,
    ) -> Result<Self, GeometryError> {
        Ok(Self {
            length: positive("length", length)?,
            width: positive("width", width)?,
            permittivity: positive("permittivity", permittivity)?,
            thickness: positive("thickness", thickness)?,
        })
    }

    /// Read the geometry from a table's reserved attributes
    /// (`Length`, `Width`, `Dielectric Permittivity`, `Dielectric Thickness`).
    pub fn from_attributes(table: &DataTable) -> Result<Self, GeometryError> {
        let read = |key: &'static str| {
            table
                .attribute_f64(key)
                .ok_or(GeometryError::MissingAttribute(key))
        };
        Self::new(
            read("Length")?,
            read("Width")?,
            read("Dielectric Permittivity")?,
            read("Dielectric Thickness")?,
        )
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn permittivity(&self) -> f64 {
        self.permittivity
    }

    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    /// Areal capacitance of the dielectric, C = εr·ε0/t (F/m²).
    pub fn capacitance(&self) -> f64 {
        self.permittivity * VACUUM_PERMITTIVITY / self.thickness
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn areal_capacitance() {
        let g = Geometry::new(20e-6, 1000e-6, 2.05, 480e-9).unwrap();
        assert_relative_eq!(g.capacitance(), 3.78148e-5, max_relative = 1e-5);
    }

    #[test]
    fn rejects_non_positive_dimensions() {
        assert_eq!(
            Geometry::new(0.0, 1e-3, 2.0, 1e-7),
            Err(GeometryError::NotPositive {
                name: "length",
                value: 0.0
            })
        );
        assert!(Geometry::new(1e-5, -1e-3, 2.0, 1e-7).is_err());
        assert!(Geometry::new(1e-5, 1e-3, f64::NAN, 1e-7).is_err());
        assert!(Geometry::new(1e-5, 1e-3, 2.0, f64::INFINITY).is_err());
    }

    #[test]
    fn reads_reserved_attributes() {
        let table = DataTable::new(["x"])
            .with_attribute("Length", "2e-5")
            .with_attribute("Width", "1e-3")
            .with_attribute("Dielectric Permittivity", "2.05")
            .with_attribute("Dielectric Thickness", "4.8e-7");
        let g = Geometry::from_attributes(&table).unwrap();
        assert_eq!(g.length(), 2e-5);
        assert_eq!(g.thickness(), 4.8e-7);

        let partial = DataTable::new(["x"]).with_attribute("Length", "2e-5");
        assert_eq!(
            Geometry::from_attributes(&partial),
            Err(GeometryError::MissingAttribute("Width"))
        );
    }
}
