// export.rs - CSV rows for downstream plotting

use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;

use crate::error::Result;
use crate::histogram::Comparison;
use crate::sweep::SweepPoint;

fn opt(x: Option<f64>) -> String {
    x.map(|v| v.to_string()).unwrap_or_default()
}

/// One row per bin: `length, theory, empirical, observed, expected, ratio`.
/// `ratio` is left empty where the theory is zero.
pub fn write_comparison<W: Write>(writer: W, comparison: &Comparison) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(["length", "theory", "empirical", "observed", "expected", "ratio"])?;
    let ratio = comparison.ratio();
    for i in 0..comparison.lengths.len() {
        wtr.write_record(&[
            comparison.lengths[i].to_string(),
            comparison.theoretical_probs[i].to_string(),
            comparison.empirical_probs[i].to_string(),
            comparison.observed_counts[i].to_string(),
            comparison.expected_counts[i].to_string(),
            opt(ratio[i]),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// One row per force.
pub fn write_sweep<W: Write>(writer: W, points: &[SweepPoint]) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record([
        "force",
        "chi_squared",
        "reduced_chi_squared",
        "p_value",
        "ess",
        "ess_fraction",
        "mean_length",
        "std_length",
        "theory_mean_length",
        "closed_form_mean_length",
    ])?;
    for p in points {
        wtr.write_record(&[
            p.force.to_string(),
            p.chi_squared.to_string(),
            p.reduced_chi_squared.to_string(),
            p.p_value.to_string(),
            p.effective_sample_size.to_string(),
            p.ess_fraction.to_string(),
            p.mean_length.to_string(),
            p.std_length.to_string(),
            p.theory_mean_length.to_string(),
            p.closed_form_mean_length.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_comparison_to_path<P: AsRef<Path>>(path: P, comparison: &Comparison) -> Result<()> {
    write_comparison(std::fs::File::create(path)?, comparison)
}

pub fn write_sweep_to_path<P: AsRef<Path>>(path: P, points: &[SweepPoint]) -> Result<()> {
    write_sweep(std::fs::File::create(path)?, points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::HistogramComparator;

    #[test]
    fn comparison_csv_has_header_and_one_row_per_bin() {
        let cmp = HistogramComparator::new(&[-1.0, 1.0], &[0.0, 1.0])
            .unwrap()
            .compare(&[1.0, 1.0, -1.0], None, 3)
            .unwrap();
        let mut buf = Vec::new();
        write_comparison(&mut buf, &cmp).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "length,theory,empirical,observed,expected,ratio");
        assert!(lines[1].ends_with(','), "zero-theory bin has no ratio: {}", lines[1]);
    }
}
