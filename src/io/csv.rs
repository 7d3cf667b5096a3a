use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::dynamics::{BodyId, BodyState, StateVector};
use crate::error::SimResult;

pub const HEADER: &str = "time,r_p,theta_p,v_p,omega_p,r_m,theta_m,v_m,omega_m,x_p,y_p,x_m,y_m";

/// Write a trajectory as CSV.
///
/// Columns: time, the eight state components in state-vector order, then
/// the Cartesian position of the planet and of Mercury. The writer is
/// flushed every `batch_steps` rows and once more at the end.
pub fn write_trajectory<W: Write>(
    writer: &mut W,
    trajectory: &[StateVector],
    dt: f64,
    batch_steps: usize,
) -> SimResult<()> {
    let batch = batch_steps.max(1);
    writeln!(writer, "{HEADER}")?;

    for (i, y) in trajectory.iter().enumerate() {
        let p = BodyState::of(y, BodyId::Planet).position();
        let m = BodyState::of(y, BodyId::Mercury).position();
        write!(writer, "{:.9}", i as f64 * dt)?;
        for v in y.iter() {
            write!(writer, ",{v:.12e}")?;
        }
        writeln!(writer, ",{:.12e},{:.12e},{:.12e},{:.12e}", p.x, p.y, m.x, m.y)?;

        if (i + 1) % batch == 0 {
            writer.flush()?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Write a trajectory to a CSV file at the given path.
pub fn write_trajectory_file<P: AsRef<Path>>(
    path: P,
    trajectory: &[StateVector],
    dt: f64,
    batch_steps: usize,
) -> SimResult<()> {
    let mut file = BufWriter::new(File::create(path)?);
    write_trajectory(&mut file, trajectory, dt, batch_steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn two_rows() -> Vec<StateVector> {
        vec![
            StateVector::from([5.0, PI, 0.0, 0.05, 0.3, 0.0, 0.0, 20.0]),
            StateVector::from([5.0, PI + 0.05, 0.0, 0.05, 0.3, 0.2, 0.1, 20.0]),
        ]
    }

    #[test]
    fn csv_output_has_header_and_rows() {
        let mut buf = Vec::new();
        write_trajectory(&mut buf, &two_rows(), 0.01, 1000).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], HEADER);
        assert_eq!(lines.len(), 3); // header + 2 data rows
        assert_eq!(lines[1].split(',').count(), 13);
        assert!(lines[2].starts_with("0.010000000,"));

        let cols: Vec<f64> = lines[1].split(',').map(|c| c.parse().unwrap()).collect();
        assert!((cols[9] + 5.0).abs() < 1e-9); // planet x at theta = pi
        assert!((cols[11] - 0.3).abs() < 1e-12); // mercury x at theta = 0
    }

    /// Counts flushes so the batching can be observed.
    struct Flushes {
        rows: Vec<u8>,
        flushes: usize,
    }

    impl Write for Flushes {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.rows.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn flushes_once_per_batch() {
        let traj: Vec<StateVector> = (0..10).map(|_| two_rows()[0]).collect();
        let mut out = Flushes { rows: Vec::new(), flushes: 0 };
        write_trajectory(&mut out, &traj, 1.0, 4).unwrap();
        // After rows 4 and 8, plus the final flush.
        assert_eq!(out.flushes, 3);
        assert_eq!(String::from_utf8(out.rows).unwrap().lines().count(), 11);
    }

    #[test]
    fn writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traj.csv");
        write_trajectory_file(&path, &two_rows(), 0.5, 1).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
    }
}
