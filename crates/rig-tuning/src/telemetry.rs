//! CSV telemetry for tuning runs.
//!
//! Each scenario has its own snapshot type and column schema. Output goes to
//! any [`TelemetryOutput`], so the same rows can land on stdout, in a file,
//! or in memory for tests.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use glam::Vec3;
use vehicle_rig::StabilizeOutcome;

/// Default telemetry file path.
pub const TELEMETRY_PATH: &str = "telemetry.csv";

/// Trait for telemetry output destinations.
pub trait TelemetryOutput: Send + Sync {
    /// Write the CSV header.
    fn write_header(&mut self, header: &str);
    /// Write a data row.
    fn write_row(&mut self, row: &str);
}

/// Stdout output.
pub struct StdoutTelemetryOutput;

impl TelemetryOutput for StdoutTelemetryOutput {
    fn write_header(&mut self, header: &str) {
        println!("{header}");
    }

    fn write_row(&mut self, row: &str) {
        println!("{row}");
    }
}

/// File output. The file is truncated whenever a header is written.
pub struct FileTelemetryOutput {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileTelemetryOutput {
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            writer: None,
        }
    }

    fn write_line(&mut self, line: &str) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        if let Err(error) = writeln!(writer, "{line}") {
            tracing::warn!("Failed to write telemetry to {}: {error}", self.path.display());
            self.writer = None;
        }
    }
}

impl Default for FileTelemetryOutput {
    fn default() -> Self {
        Self::new(TELEMETRY_PATH)
    }
}

impl TelemetryOutput for FileTelemetryOutput {
    fn write_header(&mut self, header: &str) {
        match File::create(&self.path) {
            Ok(file) => {
                tracing::debug!("Writing telemetry to {}", self.path.display());
                self.writer = Some(BufWriter::new(file));
                self.write_line(header);
            }
            Err(error) => {
                tracing::warn!("Failed to create {}: {error}", self.path.display());
                self.writer = None;
            }
        }
    }

    fn write_row(&mut self, row: &str) {
        self.write_line(row);
    }
}

impl Drop for FileTelemetryOutput {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.as_mut()
            && let Err(error) = writer.flush()
        {
            tracing::warn!("Failed to flush {}: {error}", self.path.display());
        }
    }
}

/// In-memory output, mostly for tests.
#[derive(Default)]
pub struct MemoryTelemetryOutput {
    pub header: Option<String>,
    pub rows: Vec<String>,
}

impl TelemetryOutput for MemoryTelemetryOutput {
    fn write_header(&mut self, header: &str) {
        self.header = Some(header.to_owned());
        self.rows.clear();
    }

    fn write_row(&mut self, row: &str) {
        self.rows.push(row.to_owned());
    }
}

/// Discards everything.
pub struct NullTelemetryOutput;

impl TelemetryOutput for NullTelemetryOutput {
    fn write_header(&mut self, _header: &str) {}

    fn write_row(&mut self, _row: &str) {}
}

/// Define a CSV schema for a snapshot type.
///
/// Generates a header writer and a row writer from one column list, keeping
/// names and formats in sync.
macro_rules! define_telemetry {
    (
        $snapshot_ty:ty => $reset_fn:ident, $emit_fn:ident;
        columns: { $( $name:ident : $fmt:literal ),* $(,)? },
        prelude: |$snapshot:ident| { $( $prelude:stmt );* $(;)? },
        row_values: { $( $val:expr ),* $(,)? }
    ) => {
        /// Write the CSV header to `output`.
        pub fn $reset_fn(output: &mut dyn TelemetryOutput) {
            let header = concat!( $( stringify!($name), "," ),* );
            output.write_header(header.trim_end_matches(','));
        }

        /// Write one CSV row to `output`.
        pub fn $emit_fn($snapshot: &$snapshot_ty, output: &mut dyn TelemetryOutput) {
            $( $prelude )*

            let line = format!( concat!( $( $fmt, "," ),* ), $( $val ),* );
            output.write_row(line.trim_end_matches(','));
        }
    };
}

/// State of the chase scenario after one frame.
pub struct ChaseSnapshot {
    pub elapsed: f32,
    pub target: Vec3,
    pub camera: Vec3,
    pub look: Vec3,
    pub range: f32,
    pub preferred_range: f32,
    pub y_tangent: f32,
    pub xray: bool,
    pub obstructed: bool,
}

define_telemetry! {
    ChaseSnapshot => reset_chase_telemetry, emit_chase_telemetry;
    columns: {
        t: "{:.4}",
        target_x: "{:.3}",
        target_y: "{:.3}",
        target_z: "{:.3}",
        cam_x: "{:.3}",
        cam_y: "{:.3}",
        cam_z: "{:.3}",
        bearing_deg: "{:.2}",
        elevation_deg: "{:.2}",
        range: "{:.3}",
        preferred: "{:.3}",
        y_tangent: "{:.4}",
        xray: "{}",
        obstructed: "{}",
    },
    prelude: |s| {
        let bearing = s.look.x.atan2(s.look.z);
        let elevation = (-s.look.y).clamp(-1.0, 1.0).asin();
    },
    row_values: {
        s.elapsed,
        s.target.x,
        s.target.y,
        s.target.z,
        s.camera.x,
        s.camera.y,
        s.camera.z,
        bearing.to_degrees(),
        elevation.to_degrees(),
        s.range,
        s.preferred_range,
        s.y_tangent,
        u8::from(s.xray),
        u8::from(s.obstructed),
    }
}

/// State of the lean scenario after one physics step.
pub struct LeanSnapshot {
    pub elapsed: f32,
    pub position: Vec3,
    pub speed: f32,
    pub yaw_rate: f32,
    pub roll: f32,
    pub roll_rate: f32,
    pub balanced_lean: f32,
    pub roll_error_sine: f32,
    pub outcome: StabilizeOutcome,
    pub forward: Vec3,
    pub fallen: bool,
}

define_telemetry! {
    LeanSnapshot => reset_lean_telemetry, emit_lean_telemetry;
    columns: {
        t: "{:.4}",
        pos_x: "{:.3}",
        pos_z: "{:.3}",
        speed: "{:.2}",
        yaw_rate: "{:.3}",
        roll_deg: "{:.3}",
        roll_rate: "{:.4}",
        balanced_deg: "{:.3}",
        error_sin: "{:.5}",
        outcome: "{}",
        impulse: "{:.4}",
        fallen: "{}",
    },
    prelude: |s| {
        let outcome = match s.outcome {
            StabilizeOutcome::Disabled => "disabled",
            StabilizeOutcome::Applied(_) => "applied",
            StabilizeOutcome::DegenerateAxis => "degenerate",
            StabilizeOutcome::NonFiniteImpulse => "non_finite",
        };
        let impulse = s.outcome.impulse().map_or(0.0, |impulse| impulse.dot(s.forward));
    },
    row_values: {
        s.elapsed,
        s.position.x,
        s.position.z,
        s.speed,
        s.yaw_rate,
        s.roll.to_degrees(),
        s.roll_rate,
        s.balanced_lean.to_degrees(),
        s.roll_error_sine,
        outcome,
        impulse,
        u8::from(s.fallen),
    }
}
