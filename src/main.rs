use std::fs;
use std::path::PathBuf;

use clap::Parser;
use slog::{info, warn};

use insulation_aging::calibration::{calibrate, Calibration};
use insulation_aging::config::CalibrationConfig;
use insulation_aging::experiment::Experiment;
use insulation_aging::export::{plot_file_name, write_table_to_path};
use insulation_aging::logging;
use insulation_aging::table::ErrorTable;
use insulation_aging::Result;

/// Calibrate the conductivity aging model against two experiments
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Experiment JSON file for the first sample
    #[arg(long)]
    first: PathBuf,
    /// Experiment JSON file for the second sample
    #[arg(long)]
    second: PathBuf,
    /// TOML calibration settings; defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory to write the measured-versus-estimated CSV files into
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Suppress per-generation progress
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let logger = logging::terminal();

    let mut config = match &cli.config {
        Some(path) => CalibrationConfig::from_file(path)?,
        None => CalibrationConfig::default(),
    };
    if cli.quiet {
        config.search.display_progress = false;
    }

    let first = Experiment::from_file(&cli.first)?;
    let second = Experiment::from_file(&cli.second)?;
    info!(logger, "experiments loaded";
        "first" => &first.sample_name,
        "second" => &second.sample_name
    );

    let calibration = calibrate(first.error_table()?, second.error_table()?, &config, &logger);
    if !calibration.fit.is_feasible() {
        warn!(logger, "calibration did not find a feasible parameter set");
    }

    report("sample01", &first, &calibration.first, &calibration);
    report("sample02", &second, &calibration.second, &calibration);

    if let Some(dir) = &cli.output_dir {
        fs::create_dir_all(dir)?;
        for (label, experiment, table) in [
            ("sample01", &first, &calibration.first),
            ("sample02", &second, &calibration.second),
        ] {
            let path = dir.join(plot_file_name(label, &experiment.sample_name));
            write_table_to_path(table, &path)?;
            info!(logger, "plot data written"; "path" => %path.display());
        }
    }

    Ok(())
}

fn report(label: &str, experiment: &Experiment, table: &ErrorTable, calibration: &Calibration) {
    let params = &calibration.fit.parameters;
    println!("{label} condition: {}", experiment.sample_name);
    println!(
        "  {:.1} °C exposure, long term converged value Lconv: {:.4} W/(m·K)",
        table.temperature(),
        table.converged_conductivity(params)
    );
    println!("  λgas: {:.4} W/(m·K)", params.gas_conductivity.value());
    println!("  E:    {:.1} J/mol", params.activation_energy.value());
    println!("  k₀:   {:.6}", params.rate_prefactor.value());
    println!("  score: {:.3e}", calibration.fit.score);
}
