//! Field-effect transistor mobility extraction.
//!
//! Turns captured output and transfer sweeps into forward/backward
//! mobility-vs-gate-voltage series, and organizes a device's curve files by
//! temperature.

pub mod analysis;
pub mod archive;
pub mod data;
pub mod export;

pub use analysis::geometry::Geometry;
pub use analysis::output::OutputMobility;
pub use analysis::result::{AnalysisResult, MobilityPoint, MobilitySeries};
pub use analysis::summary::TransferSummary;
pub use analysis::transfer::TransferMobility;
pub use analysis::{CurveAnalysis, MemoizedAnalysis};
pub use archive::{MeasurementArchive, Temperature};
pub use data::model::{CurveKind, DataTable};
