use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use regex::Regex;
use thiserror::Error;

use crate::data::loader::load_csv;
use crate::data::model::{CurveKind, DataTable};

// ---------------------------------------------------------------------------
// Temperature – the archive's index
// ---------------------------------------------------------------------------

/// Temperature tag of a curve file.  Files without a temperature token are
/// [`Temperature::Untagged`], which sorts before every measured temperature.
#[derive(Debug, Clone, Copy)]
pub enum Temperature {
    Untagged,
    Kelvin(f64),
}

// -- Manual Eq/Ord so we can key BTreeMaps by Temperature --

impl PartialEq for Temperature {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Temperature {}

impl PartialOrd for Temperature {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Temperature {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self, other) {
            (Temperature::Untagged, Temperature::Untagged) => Ordering::Equal,
            (Temperature::Untagged, Temperature::Kelvin(_)) => Ordering::Less,
            (Temperature::Kelvin(_), Temperature::Untagged) => Ordering::Greater,
            (Temperature::Kelvin(a), Temperature::Kelvin(b)) => a.total_cmp(b),
        }
    }
}

impl Temperature {
    /// Numeric value for tables and plots; untagged reads as `-1`.
    pub fn kelvin_or_sentinel(&self) -> f64 {
        match self {
            Temperature::Untagged => -1.0,
            Temperature::Kelvin(k) => *k,
        }
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Temperature::Untagged => write!(f, "untagged"),
            Temperature::Kelvin(k) => write!(f, "{k}K"),
        }
    }
}

// ---------------------------------------------------------------------------
// File name convention: {Name}[-{Temperature}K]-{Output|Transfer}.csv
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CurveFileName {
    pub device: String,
    pub temperature: Temperature,
    pub kind: CurveKind,
}

/// Matcher for one device's curve file names.
#[derive(Debug, Clone)]
pub struct CurveFilePattern {
    device: String,
    regex: Regex,
}

impl CurveFilePattern {
    pub fn new(device: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!(
            r"^{}(?:-(?P<temp>[0-9]+(?:\.[0-9]+)?)K)?-(?P<kind>Output|Transfer)\.csv$",
            regex::escape(device)
        ))?;
        Ok(Self {
            device: device.to_string(),
            regex,
        })
    }

    /// Parse a bare file name (no directory part).
    pub fn parse(&self, file_name: &str) -> Option<CurveFileName> {
        let caps = self.regex.captures(file_name)?;
        let temperature = match caps.name("temp") {
            Some(t) => Temperature::Kelvin(t.as_str().parse().ok()?),
            None => Temperature::Untagged,
        };
        let kind = caps.name("kind")?.as_str().parse().ok()?;
        Some(CurveFileName {
            device: self.device.clone(),
            temperature,
            kind,
        })
    }
}

/// One-off parse of `file_name` against `device`'s naming convention.
pub fn parse_curve_filename(device: &str, file_name: &str) -> Option<CurveFileName> {
    CurveFilePattern::new(device).ok()?.parse(file_name)
}

/// Canonical file name for a curve.
pub fn curve_filename(device: &str, temperature: Temperature, kind: CurveKind) -> String {
    match temperature {
        Temperature::Untagged => format!("{device}-{kind}.csv"),
        Temperature::Kelvin(k) => format!("{device}-{k}K-{kind}.csv"),
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArchiveError {
    #[error("no {kind} curve at {temperature}")]
    CurveNotFound {
        kind: CurveKind,
        temperature: Temperature,
    },
    #[error("attribute '{0}' is not set")]
    AttributeNotFound(String),
}

// ---------------------------------------------------------------------------
// MeasurementArchive
// ---------------------------------------------------------------------------

/// What the archive holds at one temperature.
#[derive(Debug, Clone, Copy)]
pub struct TemperaturePoint<'a> {
    pub temperature: Temperature,
    pub output: Option<&'a DataTable>,
    pub transfer: Option<&'a DataTable>,
}

/// All curve files of one device in one directory, indexed by temperature.
#[derive(Debug, Clone)]
pub struct MeasurementArchive {
    name: String,
    directory: PathBuf,
    temperatures: Vec<Temperature>,
    output: BTreeMap<Temperature, DataTable>,
    transfer: BTreeMap<Temperature, DataTable>,
    attributes: BTreeMap<String, String>,
}

impl MeasurementArchive {
    /// Scan `directory` for `name`'s curve files and load them all.
    ///
    /// A file that matches the naming convention but cannot be parsed fails
    /// the whole archive.
    pub fn open(name: &str, directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref();
        let pattern = CurveFilePattern::new(name)
            .with_context(|| format!("building file pattern for device '{name}'"))?;

        let mut found: BTreeMap<(Temperature, CurveKind), PathBuf> = BTreeMap::new();
        let entries = std::fs::read_dir(directory)
            .with_context(|| format!("reading directory {}", directory.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("listing {}", directory.display()))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some(parsed) = pattern.parse(file_name) else {
                continue;
            };
            debug!("{file_name}: {} curve at {}", parsed.kind, parsed.temperature);

            // "10K" and "10.0K" name the same curve; keep the lexically first
            let key = (parsed.temperature, parsed.kind);
            let path = entry.path();
            let kept = match found.get(&key) {
                Some(existing) => {
                    let (kept, ignored) = if path < *existing {
                        (path, existing.clone())
                    } else {
                        (existing.clone(), path)
                    };
                    warn!(
                        "{}: another {} curve at {}, using {}",
                        ignored.display(),
                        parsed.kind,
                        parsed.temperature,
                        kept.display()
                    );
                    kept
                }
                None => path,
            };
            found.insert(key, kept);
        }

        let temperatures: BTreeSet<Temperature> = found.keys().map(|(t, _)| *t).collect();
        let mut output = BTreeMap::new();
        let mut transfer = BTreeMap::new();
        for &temperature in &temperatures {
            for kind in [CurveKind::Output, CurveKind::Transfer] {
                let Some(path) = found.get(&(temperature, kind)) else {
                    continue;
                };
                let table = load_checked(path, kind)?;
                match kind {
                    CurveKind::Output => output.insert(temperature, table),
                    CurveKind::Transfer => transfer.insert(temperature, table),
                };
            }
        }

        info!(
            "{name}: {} temperature(s), {} output / {} transfer curve(s) in {}",
            temperatures.len(),
            output.len(),
            transfer.len(),
            directory.display()
        );

        Ok(Self {
            name: name.to_string(),
            directory: directory.to_path_buf(),
            temperatures: temperatures.into_iter().collect(),
            output,
            transfer,
            attributes: BTreeMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Temperatures with at least one curve, ascending, untagged first.
    pub fn temperatures(&self) -> &[Temperature] {
        &self.temperatures
    }

    // -- Curves --

    pub fn has_output_curve(&self, temperature: Temperature) -> bool {
        self.output.contains_key(&temperature)
    }

    pub fn has_transfer_curve(&self, temperature: Temperature) -> bool {
        self.transfer.contains_key(&temperature)
    }

    pub fn output_curve(&self, temperature: Temperature) -> Result<&DataTable, ArchiveError> {
        self.output
            .get(&temperature)
            .ok_or(ArchiveError::CurveNotFound {
                kind: CurveKind::Output,
                temperature,
            })
    }

    pub fn transfer_curve(&self, temperature: Temperature) -> Result<&DataTable, ArchiveError> {
        self.transfer
            .get(&temperature)
            .ok_or(ArchiveError::CurveNotFound {
                kind: CurveKind::Transfer,
                temperature,
            })
    }

    /// Every temperature with whatever curves exist there, ascending.
    pub fn iter(&self) -> impl Iterator<Item = TemperaturePoint<'_>> + '_ {
        self.temperatures.iter().map(|&temperature| TemperaturePoint {
            temperature,
            output: self.output.get(&temperature),
            transfer: self.transfer.get(&temperature),
        })
    }

    // -- Attributes --

    pub fn attribute(&self, key: &str) -> Result<&str, ArchiveError> {
        self.attributes
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ArchiveError::AttributeNotFound(key.to_string()))
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }
}

/// Load a curve file; the file name decides the kind, a disagreeing `Type`
/// attribute is only reported.
fn load_checked(path: &Path, kind: CurveKind) -> Result<DataTable> {
    let table = load_csv(path).with_context(|| format!("loading {kind} curve"))?;
    match table.curve_kind() {
        Some(Ok(declared)) if declared != kind => warn!(
            "{}: Type attribute says {declared}, file name says {kind}",
            path.display()
        ),
        Some(Err(e)) => warn!("{}: {e}", path.display()),
        _ => {}
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_and_untagged_names() {
        assert_eq!(
            parse_curve_filename("Dev", "Dev-10K-Output.csv"),
            Some(CurveFileName {
                device: "Dev".into(),
                temperature: Temperature::Kelvin(10.0),
                kind: CurveKind::Output,
            })
        );
        assert_eq!(
            parse_curve_filename("Dev", "Dev-Transfer.csv").map(|c| (c.temperature, c.kind)),
            Some((Temperature::Untagged, CurveKind::Transfer))
        );
        assert_eq!(
            parse_curve_filename("Dev", "Dev-77.5K-Transfer.csv").map(|c| c.temperature),
            Some(Temperature::Kelvin(77.5))
        );
    }

    #[test]
    fn rejects_other_names() {
        for name in [
            "Dev-10K-Output.txt",
            "Dev2-10K-Output.csv",
            "Dev-10-Output.csv",
            "Dev-10K-output.csv",
            "xDev-Output.csv",
            "Dev-10K-Output.csv.bak",
        ] {
            assert_eq!(parse_curve_filename("Dev", name), None, "{name}");
        }
    }

    #[test]
    fn device_name_is_matched_literally() {
        assert!(parse_curve_filename("D.v+1", "D.v+1-Output.csv").is_some());
        assert!(parse_curve_filename("D.v+1", "Dxvv1-Output.csv").is_none());
    }

    #[test]
    fn untagged_sorts_first() {
        let mut temps = vec![
            Temperature::Kelvin(300.0),
            Temperature::Untagged,
            Temperature::Kelvin(10.0),
        ];
        temps.sort();
        assert_eq!(
            temps,
            vec![
                Temperature::Untagged,
                Temperature::Kelvin(10.0),
                Temperature::Kelvin(300.0)
            ]
        );
        assert_eq!(Temperature::Untagged.kelvin_or_sentinel(), -1.0);
    }

    #[test]
    fn equality_agrees_with_ordering() {
        use std::cmp::Ordering;
        let pairs = [
            (Temperature::Kelvin(0.0), Temperature::Kelvin(-0.0)),
            (Temperature::Kelvin(f64::NAN), Temperature::Kelvin(f64::NAN)),
            (Temperature::Kelvin(10.0), Temperature::Kelvin(10.0)),
            (Temperature::Untagged, Temperature::Kelvin(0.0)),
        ];
        for (a, b) in pairs {
            assert_eq!(a == b, a.cmp(&b) == Ordering::Equal, "{a:?} vs {b:?}");
        }
        assert_eq!(Temperature::Kelvin(10.0), Temperature::Kelvin(10.0));
    }

    #[test]
    fn filename_round_trip() {
        for t in [Temperature::Untagged, Temperature::Kelvin(150.0)] {
            let name = curve_filename("Dev", t, CurveKind::Transfer);
            let parsed = parse_curve_filename("Dev", &name).unwrap();
            assert_eq!(parsed.temperature, t);
            assert_eq!(parsed.kind, CurveKind::Transfer);
        }
    }
}
