use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::experiment::SECONDS_PER_DAY;
use crate::table::ErrorTable;
use crate::Result;

/// One line of the measured-versus-estimated plot data
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PlotRow {
    #[serde(rename = "Elapsed Days")]
    pub elapsed_days: f64,
    #[serde(rename = "Actual Conductivity (W/(m·K))")]
    pub measured: f64,
    #[serde(rename = "Estimated Conductivity (W/(m·K))")]
    pub predicted: f64,
}

impl PlotRow {
    #[must_use]
    pub fn rows(table: &ErrorTable) -> Vec<Self> {
        table
            .rows()
            .iter()
            .map(|row| Self {
                elapsed_days: row.elapsed_seconds / SECONDS_PER_DAY,
                measured: row.measured,
                predicted: row.predicted,
            })
            .collect()
    }
}

/// Write the plot data of an evaluated table as CSV with a header line
///
/// # Errors
/// Returns an error if a row cannot be written.
pub fn write_table<W: io::Write>(table: &ErrorTable, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in PlotRow::rows(table) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn write_table_to_path(table: &ErrorTable, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_table(table, file)
}

/// File name for the plot data of a sample, safe for any sample name
#[must_use]
pub fn plot_file_name(label: &str, sample_name: &str) -> String {
    let sample: String = sample_name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("plot_data_{label}_{sample}.csv")
}

#[cfg(test)]
mod tests {
    use super::{plot_file_name, write_table, write_table_to_path, PlotRow};
    use crate::parameters::{ParameterSet, ScaleFactors};
    use crate::table::{ErrorTable, Measurement};
    use crate::Result;

    fn evaluated_table() -> ErrorTable {
        let mut table = ErrorTable::new(
            50.0,
            &[
                Measurement::new(0.0, 0.0210),
                Measurement::new(43_200.0, 0.0215),
                Measurement::new(86_400.0 * 10.0, 0.0240),
            ],
        )
        .unwrap();
        table.evaluate(&ParameterSet::from_raw([50.0, 350.0, 97.5], &ScaleFactors::default()));
        table
    }

    #[test]
    fn csv_holds_header_and_one_line_per_row() -> Result<()> {
        let table = evaluated_table();
        let mut buffer = Vec::new();
        write_table(&table, &mut buffer)?;

        let text = String::from_utf8(buffer)?;
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Elapsed Days,Actual Conductivity (W/(m·K)),Estimated Conductivity (W/(m·K))")
        );
        assert_eq!(lines.count(), 3);
        Ok(())
    }

    #[test]
    fn written_files_read_back_as_plot_rows() -> Result<()> {
        let tmp_dir = tempdir::TempDir::new("written_files_read_back_as_plot_rows")?;
        let path = tmp_dir.path().join(plot_file_name("sample01", "PIR board"));
        let table = evaluated_table();
        write_table_to_path(&table, &path)?;

        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_path(&path)?;
        let read = rdr
            .deserialize()
            .collect::<std::result::Result<Vec<PlotRow>, _>>()?;

        assert_eq!(read.len(), 3);
        approx::assert_relative_eq!(read[1].elapsed_days, 0.5);
        for (row, expected) in read.iter().zip(table.rows()) {
            approx::assert_relative_eq!(row.measured, expected.measured);
            approx::assert_relative_eq!(row.predicted, expected.predicted, max_relative = 1e-12);
        }
        Ok(())
    }

    #[test]
    fn file_names_replace_unsafe_characters() {
        assert_eq!(
            plot_file_name("sample02", "XPS 50mm/dry"),
            "plot_data_sample02_XPS_50mm_dry.csv"
        );
    }
}
