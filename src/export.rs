use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::analysis::result::{AnalysisResult, MobilityPoint};
use crate::analysis::summary::{SummaryRow, TransferSummary};
use crate::analysis::sweep::SweepDirection;

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SeriesRecord {
    direction: SweepDirection,
    gate_voltage: f64,
    drain_voltage: f64,
    mobility: f64,
}

impl SeriesRecord {
    fn new(direction: SweepDirection, point: &MobilityPoint) -> Self {
        Self {
            direction,
            gate_voltage: point.gate_voltage,
            drain_voltage: point.drain_voltage,
            mobility: point.mobility,
        }
    }
}

/// Both series as one CSV table with a `direction` column.
pub fn write_result_csv<W: Write>(result: &AnalysisResult, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for direction in [SweepDirection::Forward, SweepDirection::Backward] {
        for point in result.series(direction) {
            writer
                .serialize(SeriesRecord::new(direction, point))
                .context("writing mobility row")?;
        }
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

/// Summary rows as CSV, one row per gate voltage.
pub fn write_summary_csv<W: Write>(summary: &TransferSummary, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for row in summary.rows() {
        writer.serialize(row).context("writing summary row")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

pub fn write_result_json<W: Write>(result: &AnalysisResult, out: W) -> Result<()> {
    serde_json::to_writer_pretty(out, result).context("serializing mobility result")
}

#[derive(Serialize)]
struct SummaryDocument<'a> {
    drain_lin: Option<f64>,
    drain_sat: Option<f64>,
    rows: &'a [SummaryRow],
    warnings: Vec<String>,
}

pub fn write_summary_json<W: Write>(summary: &TransferSummary, out: W) -> Result<()> {
    let doc = SummaryDocument {
        drain_lin: summary.drain_lin(),
        drain_sat: summary.drain_sat(),
        rows: summary.rows(),
        warnings: summary.warnings().iter().map(ToString::to_string).collect(),
    };
    serde_json::to_writer_pretty(out, &doc).context("serializing transfer summary")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_csv_has_direction_column() {
        let mut result = AnalysisResult::default();
        result.forward.push(MobilityPoint {
            gate_voltage: -10.0,
            drain_voltage: -60.0,
            mobility: 0.5,
        });
        result.backward.push(MobilityPoint {
            gate_voltage: -20.0,
            drain_voltage: -60.0,
            mobility: 0.25,
        });

        let mut buf = Vec::new();
        write_result_csv(&result, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "direction,gate_voltage,drain_voltage,mobility");
        assert_eq!(lines[1], "forward,-10.0,-60.0,0.5");
        assert_eq!(lines[2], "backward,-20.0,-60.0,0.25");
    }

    #[test]
    fn result_json_lists_both_series() {
        let result = AnalysisResult::default();
        let mut buf = Vec::new();
        write_result_json(&result, &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["forward"], serde_json::json!([]));
        assert_eq!(value["backward"], serde_json::json!([]));
        assert_eq!(value["warnings"], serde_json::json!([]));
    }
}
