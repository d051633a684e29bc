use std::path::PathBuf;

use anyhow::{Context, Result};

use fet_mobility::Geometry;
use fet_mobility::analysis::{DRAIN_CURRENT, DRAIN_VOLTAGE, GATE_VOLTAGE};
use fet_mobility::archive::{Temperature, curve_filename};
use fet_mobility::data::loader::{save_csv, save_parquet};
use fet_mobility::data::model::{CurveKind, DataTable};

const DEVICE: &str = "Sample";
const THRESHOLD: f64 = -5.0;
/// Threshold shift on the return leg (V), i.e. the hysteresis.
const HYSTERESIS: f64 = -1.5;

/// Square-law p-type transistor, mobility in m²/V·s.
fn drain_current(geometry: &Geometry, mobility: f64, vg: f64, vd: f64, vt: f64) -> f64 {
    let k = mobility * geometry.capacitance() * geometry.width() / geometry.length();
    let overdrive = vg - vt;
    if overdrive >= 0.0 {
        return -1e-12;
    }
    if vd.abs() < overdrive.abs() {
        -k * (overdrive * vd - vd * vd / 2.0).abs()
    } else {
        -k / 2.0 * overdrive * overdrive
    }
}

/// Round-trip sweep 0 → `end` → 0 in `step` increments, turnaround sampled once.
fn round_trip(end: f64, step: f64) -> Vec<f64> {
    let n = (end / step).abs().round() as usize;
    let step = step.abs() * end.signum();
    let down = (0..=n).map(|i| i as f64 * step);
    let back = (0..n).rev().map(|i| i as f64 * step);
    down.chain(back).collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    /// Multiplicative noise factor around 1.
    fn jitter(&mut self, relative: f64) -> f64 {
        let u = (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        1.0 + relative * (2.0 * u - 1.0)
    }
}

fn with_geometry(
    table: DataTable,
    geometry: &Geometry,
    kind: CurveKind,
    temperature: Temperature,
) -> DataTable {
    let table = table
        .with_attribute("Name", DEVICE)
        .with_attribute("Type", kind.to_string().to_lowercase())
        .with_attribute("Length", geometry.length().to_string())
        .with_attribute("Width", geometry.width().to_string())
        .with_attribute("Dielectric Thickness", geometry.thickness().to_string())
        .with_attribute("Dielectric Permittivity", geometry.permittivity().to_string());
    match temperature {
        Temperature::Kelvin(k) => table.with_attribute("Temperature", k.to_string()),
        Temperature::Untagged => table,
    }
}

fn transfer_curve(geometry: &Geometry, mobility: f64, rng: &mut SimpleRng) -> Result<DataTable> {
    let mut table = DataTable::new([DRAIN_VOLTAGE, GATE_VOLTAGE, DRAIN_CURRENT]);
    for vd in [-5.0, -60.0] {
        let sweep = round_trip(-60.0, 2.0);
        let turn = sweep.len() / 2;
        for (i, &vg) in sweep.iter().enumerate() {
            let vt = if i > turn { THRESHOLD + HYSTERESIS } else { THRESHOLD };
            let current = drain_current(geometry, mobility, vg, vd, vt) * rng.jitter(0.002);
            table.push_row(vec![vd, vg, current])?;
        }
    }
    Ok(table)
}

fn output_curve(geometry: &Geometry, mobility: f64, rng: &mut SimpleRng) -> Result<DataTable> {
    let mut table = DataTable::new([DRAIN_VOLTAGE, GATE_VOLTAGE, DRAIN_CURRENT]);
    for vg in [-20.0, -30.0, -40.0, -50.0, -60.0] {
        let sweep = round_trip(-60.0, 5.0);
        let turn = sweep.len() / 2;
        for (i, &vd) in sweep.iter().enumerate() {
            let vt = if i > turn { THRESHOLD + HYSTERESIS } else { THRESHOLD };
            let current = drain_current(geometry, mobility, vg, vd, vt) * rng.jitter(0.002);
            table.push_row(vec![vd, vg, current])?;
        }
    }
    Ok(table)
}

fn main() -> Result<()> {
    let dir = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| "sample_data".into()));
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let geometry = Geometry::new(20e-6, 1000e-6, 2.05, 480e-9)?;
    let mut rng = SimpleRng::new(42);

    // room temperature without a tag, then a cooling series
    let temperatures = [
        Temperature::Untagged,
        Temperature::Kelvin(100.0),
        Temperature::Kelvin(200.0),
        Temperature::Kelvin(300.0),
    ];

    let mut written = 0;
    for temperature in temperatures {
        // thermally activated hopping: mobility drops as the device cools
        let kelvin = match temperature {
            Temperature::Untagged => 295.0,
            Temperature::Kelvin(k) => k,
        };
        let mobility = 1e-5 * (-30.0 * (1.0 / kelvin - 1.0 / 300.0)).exp();

        let output = with_geometry(
            output_curve(&geometry, mobility, &mut rng)?,
            &geometry,
            CurveKind::Output,
            temperature,
        );
        let transfer = with_geometry(
            transfer_curve(&geometry, mobility, &mut rng)?,
            &geometry,
            CurveKind::Transfer,
            temperature,
        );

        save_csv(&output, &dir.join(curve_filename(DEVICE, temperature, CurveKind::Output)))?;
        save_csv(&transfer, &dir.join(curve_filename(DEVICE, temperature, CurveKind::Transfer)))?;
        written += 2;

        if temperature == Temperature::Untagged {
            save_parquet(&transfer, &dir.join(format!("{DEVICE}-Transfer.parquet")))?;
            written += 1;
        }
    }

    println!("Wrote {written} curve files for device '{DEVICE}' to {}", dir.display());
    Ok(())
}
