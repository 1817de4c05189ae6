//! Rubber band Monte Carlo driver.
//!
//! `histogram` compares one force against the exact distribution,
//! `sweep` repeats that over a grid of forces. Both write CSV for plotting.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use rubberband::export::{write_comparison_to_path, write_sweep_to_path};
use rubberband::sweep::{concat_grids, hooke_fit, linspace, run_single, sweep, GridSegment};
use rubberband::theory::mean_length_hooke;
use rubberband::SimulationConfig;

#[derive(Parser)]
#[command(version, about = "Freely-jointed rubber band: sampling, reweighting and exact comparison")]
struct Cli {
    /// tracing verbosity
    #[arg(long, default_value = "info", global = true)]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Command,
}

/// Overrides layered on top of `SimulationConfig::default()`.
#[derive(Args, Debug)]
struct Common {
    /// Bond count N
    #[arg(short = 'n', long, default_value_t = 100)]
    bonds: usize,

    /// Bond length a
    #[arg(short = 'a', long, default_value_t = 1.0)]
    bond_length: f64,

    /// Inverse temperature β
    #[arg(long, default_value_t = 1.0)]
    beta: f64,

    /// Ensemble size M
    #[arg(short = 'm', long, default_value_t = 10_000)]
    chains: usize,

    /// Sample bonds from the tilted distribution instead of reweighting
    #[arg(long)]
    biased: bool,

    #[arg(long, default_value_t = 12345)]
    seed: u64,
}

impl Common {
    fn config(&self, forces: Vec<f64>) -> SimulationConfig {
        SimulationConfig {
            n_bonds: self.bonds,
            bond_length: self.bond_length,
            forces,
            inverse_temperature: self.beta,
            n_chains: self.chains,
            biased: self.biased,
            seed: self.seed,
            ..SimulationConfig::default()
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Histogram one ensemble at a single force
    Histogram {
        #[command(flatten)]
        common: Common,

        #[arg(short, long, default_value_t = 0.0, allow_hyphen_values = true)]
        force: f64,

        /// Generate chains on all cores with per-block streams
        #[arg(long)]
        parallel: bool,

        #[arg(short, long, default_value = "histogram.csv")]
        output: PathBuf,
    },
    /// Repeat the comparison over evenly spaced forces
    Sweep {
        #[command(flatten)]
        common: Common,

        #[arg(long, default_value_t = 0.0001, allow_hyphen_values = true)]
        f_min: f64,

        #[arg(long, default_value_t = 0.5, allow_hyphen_values = true)]
        f_max: f64,

        #[arg(long, default_value_t = 50)]
        points: usize,

        /// Grid piece START:STOP:COUNT; repeat to concatenate. Replaces --f-min/--f-max/--points
        #[arg(long = "segment", value_name = "START:STOP:COUNT", allow_hyphen_values = true)]
        segments: Vec<GridSegment>,

        /// Leading fraction of the sweep used for the Hooke fit (biased sweeps)
        #[arg(long, default_value_t = 1.0 / 16.0)]
        fit_fraction: f64,

        #[arg(short, long, default_value = "sweep.csv")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .init();

    match cli.command {
        Command::Histogram { common, force, parallel, output } => {
            let cfg = SimulationConfig { parallel, ..common.config(vec![force]) };
            info!(?cfg, "histogram run");

            let analysis = run_single(&cfg)?;
            let p = analysis.point;
            info!(
                force = p.force,
                reduced_chi_squared = p.reduced_chi_squared,
                p_value = p.p_value,
                ess = p.effective_sample_size,
                mean_length = p.mean_length,
                theory_mean_length = p.theory_mean_length,
                "comparison done"
            );
            if analysis.comparison.excluded_bins > 0 {
                warn!(
                    excluded = analysis.comparison.excluded_bins,
                    "bins with zero theoretical probability were left out of chi-squared"
                );
            }
            write_comparison_to_path(&output, &analysis.comparison)?;
            info!(path = %output.display(), "histogram written");
        }
        Command::Sweep { common, f_min, f_max, points, segments, fit_fraction, output } => {
            let forces = if segments.is_empty() {
                linspace(f_min, f_max, points)
            } else {
                concat_grids(&segments)
            };
            let cfg = common.config(forces);
            info!(?cfg, "sweep run");

            let bar = ProgressBar::new(cfg.forces.len() as u64);
            bar.set_style(ProgressStyle::with_template(
                " {bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}]",
            )?);
            let rows = sweep(&cfg, |_| bar.inc(1))?;
            bar.finish();

            if cfg.biased {
                let fit = hooke_fit(&rows, fit_fraction)?;
                info!(
                    slope = fit.slope,
                    intercept = fit.intercept,
                    residual = fit.residual,
                    expected_slope = mean_length_hooke(cfg.n_bonds, cfg.bond_length, 1.0, cfg.inverse_temperature),
                    "small-force fit of <L>(f)"
                );
            }
            write_sweep_to_path(&output, &rows)?;
            info!(path = %output.display(), rows = rows.len(), "sweep written");
        }
    }
    Ok(())
}
