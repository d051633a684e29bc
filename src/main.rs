use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, warn};

use fet_mobility::analysis::sweep::SweepDirection;
use fet_mobility::data::loader::load_file;
use fet_mobility::export::{
    write_result_csv, write_result_json, write_summary_csv, write_summary_json,
};
use fet_mobility::{
    CurveAnalysis, CurveKind, DataTable, Geometry, MeasurementArchive, OutputMobility,
    TransferMobility, TransferSummary,
};

/// fet-mobility: carrier mobility from FET output and transfer sweeps
#[derive(Parser, Debug)]
#[command(name = "fet-mobility")]
#[command(version)]
#[command(
    about = "Extract field-effect mobility from output and transfer sweeps",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Forward and backward mobility series of one output or transfer table
    Mobility {
        /// Sweep table (.csv or .parquet)
        file: PathBuf,

        /// Curve kind; read from the table's Type attribute when omitted
        #[arg(long, value_enum)]
        kind: Option<KindArg>,

        #[command(flatten)]
        geometry: GeometryArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Linear/saturation summary of one transfer table
    Summary {
        /// Transfer table (.csv or .parquet)
        file: PathBuf,

        #[command(flatten)]
        geometry: GeometryArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// List a device's curves by temperature
    Archive {
        /// Device name as used in the file names
        name: String,

        /// Directory holding the curve files
        directory: PathBuf,

        /// Also report the peak saturation mobility of every transfer curve
        #[arg(long)]
        summary: bool,

        #[command(flatten)]
        geometry: GeometryArgs,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Output,
    Transfer,
}

impl From<KindArg> for CurveKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Output => CurveKind::Output,
            KindArg::Transfer => CurveKind::Transfer,
        }
    }
}

/// Geometry overrides; anything not given is read from the table attributes.
#[derive(Args, Debug, Clone, Copy)]
struct GeometryArgs {
    /// Channel length in m
    #[arg(long)]
    length: Option<f64>,

    /// Channel width in m
    #[arg(long)]
    width: Option<f64>,

    /// Dielectric thickness in m
    #[arg(long)]
    thickness: Option<f64>,

    /// Dielectric relative permittivity
    #[arg(long)]
    permittivity: Option<f64>,
}

impl GeometryArgs {
    fn resolve(&self, table: &DataTable) -> Result<Geometry> {
        let pick = |flag: Option<f64>, key: &str, name: &str| {
            flag.or_else(|| table.attribute_f64(key)).with_context(|| {
                format!("{name} unknown: pass --{name} or set the '{key}' attribute")
            })
        };
        let geometry = Geometry::new(
            pick(self.length, "Length", "length")?,
            pick(self.width, "Width", "width")?,
            pick(self.permittivity, "Dielectric Permittivity", "permittivity")?,
            pick(self.thickness, "Dielectric Thickness", "thickness")?,
        )?;
        Ok(geometry)
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Csv,
    Json,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Csv)]
    format: Format,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl OutputArgs {
    fn writer(&self) -> Result<Box<dyn Write>> {
        Ok(match &self.output {
            Some(path) => Box::new(BufWriter::new(
                File::create(path).with_context(|| format!("creating {}", path.display()))?,
            )),
            None => Box::new(io::stdout().lock()),
        })
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Mobility {
            file,
            kind,
            geometry,
            output,
        } => {
            let table = load_file(&file)?;
            let kind = match kind {
                Some(kind) => CurveKind::from(kind),
                None => match table.curve_kind() {
                    Some(kind) => kind?,
                    None => bail!("{}: no Type attribute, pass --kind", file.display()),
                },
            };
            let geometry = geometry.resolve(&table)?;
            info!("{}: {kind} curve, {table}", file.display());

            let result = match kind {
                CurveKind::Output => OutputMobility::new().analyze(&table, &geometry)?,
                CurveKind::Transfer => TransferMobility::new().analyze(&table, &geometry)?,
            };
            for direction in [SweepDirection::Forward, SweepDirection::Backward] {
                if let Some(peak) = result.series(direction).peak() {
                    info!(
                        "{direction} peak: {:.4e} cm²/V·s at VG={} V, VSD={} V",
                        peak.mobility, peak.gate_voltage, peak.drain_voltage
                    );
                }
            }
            if !result.is_complete() {
                warn!("result is partial ({} warning(s))", result.warnings.len());
            }

            let mut out = output.writer()?;
            match output.format {
                Format::Csv => write_result_csv(&result, &mut out)?,
                Format::Json => write_result_json(&result, &mut out)?,
            }
            out.flush()?;
        }
        Command::Summary {
            file,
            geometry,
            output,
        } => {
            let table = load_file(&file)?;
            let geometry = geometry.resolve(&table)?;
            let summary = TransferSummary::new(&table, &geometry)?;

            let mut out = output.writer()?;
            match output.format {
                Format::Csv => write_summary_csv(&summary, &mut out)?,
                Format::Json => write_summary_json(&summary, &mut out)?,
            }
            out.flush()?;
        }
        Command::Archive {
            name,
            directory,
            summary,
            geometry,
        } => {
            let archive = MeasurementArchive::open(&name, &directory)?;
            let mut out = io::stdout().lock();
            for point in archive.iter() {
                let mark = |present: bool| if present { "yes" } else { "-" };
                write!(
                    out,
                    "{:>10}  output: {:<3}  transfer: {:<3}",
                    point.temperature.to_string(),
                    mark(point.output.is_some()),
                    mark(point.transfer.is_some())
                )?;
                if let (true, Some(table)) = (summary, point.transfer) {
                    let geometry = geometry.resolve(table)?;
                    match TransferSummary::new(table, &geometry)?.peak_saturation() {
                        Some(peak) => write!(out, "  peak μ_sat: {peak:.4e} cm²/V·s")?,
                        None => write!(out, "  peak μ_sat: n/a")?,
                    }
                }
                writeln!(out)?;
            }
        }
    }

    Ok(())
}
