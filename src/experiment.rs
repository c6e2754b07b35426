use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::table::{ErrorTable, Measurement};
use crate::Result;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// A dated conductivity measurement as recorded in the lab
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct MeasurementRecord {
    #[serde(default)]
    pub id: u32,
    pub measurement_date: NaiveDateTime,
    /// Whole days since the first measurement of the experiment
    #[serde(default)]
    pub elapsed_days: i64,
    /// Thermal conductivity in W/(m·K)
    pub thermal_conductivity: f64,
    /// Rise in conductivity since the first measurement
    #[serde(default)]
    pub thermal_conductivity_increase: f64,
}

impl MeasurementRecord {
    #[must_use]
    pub const fn new(measurement_date: NaiveDateTime, thermal_conductivity: f64) -> Self {
        Self {
            id: 0,
            measurement_date,
            elapsed_days: 0,
            thermal_conductivity,
            thermal_conductivity_increase: 0.0,
        }
    }
}

/// One aging experiment: a sample exposed at a fixed temperature and measured repeatedly
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Experiment {
    pub id: String,
    pub sample_name: String,
    pub thickness_mm: f64,
    pub initial_density: f64,
    /// Exposure temperature in °C
    pub temperature: f64,
    pub humidity_memo: String,
    pub measurements: Vec<MeasurementRecord>,
}

impl Experiment {
    #[must_use]
    pub fn new(
        sample_name: impl Into<String>,
        thickness_mm: f64,
        initial_density: f64,
        temperature: f64,
    ) -> Self {
        Self {
            sample_name: sample_name.into(),
            thickness_mm,
            initial_density,
            temperature,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_humidity_memo(mut self, memo: impl Into<String>) -> Self {
        self.humidity_memo = memo.into();
        self
    }

    /// Append measurements, deriving elapsed days and conductivity increase relative to the
    /// first measurement of the experiment
    ///
    /// Elapsed days are whole days, truncated towards zero. Ids continue from the last stored
    /// measurement.
    pub fn add_measurements(&mut self, records: impl IntoIterator<Item = MeasurementRecord>) {
        for mut record in records {
            record.id = self.measurements.last().map_or(1, |last| last.id + 1);
            match self.measurements.first() {
                Some(first) => {
                    record.elapsed_days = (record.measurement_date - first.measurement_date).num_days();
                    record.thermal_conductivity_increase =
                        record.thermal_conductivity - first.thermal_conductivity;
                }
                None => {
                    record.elapsed_days = 0;
                    record.thermal_conductivity_increase = 0.0;
                }
            }
            self.measurements.push(record);
        }
    }

    /// Measurements as elapsed seconds and conductivity
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn measurements(&self) -> Vec<Measurement> {
        self.measurements
            .iter()
            .map(|record| {
                Measurement::new(
                    record.elapsed_days as f64 * SECONDS_PER_DAY,
                    record.thermal_conductivity,
                )
            })
            .collect()
    }

    /// # Errors
    /// Returns a [`ValidationError`] if the experiment cannot be fitted, see [`ErrorTable::new`].
    pub fn error_table(&self) -> std::result::Result<ErrorTable, ValidationError> {
        ErrorTable::new(self.temperature, &self.measurements())
    }

    /// Read an experiment from a JSON file
    ///
    /// # Errors
    /// Returns an error if the file is missing or does not hold an experiment.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(format!("experiment file {} not found", path.display()).into());
        }
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write the experiment to `path` as indented JSON
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use tempdir::TempDir;

    use super::{Experiment, MeasurementRecord, SECONDS_PER_DAY};
    use crate::error::ValidationError;
    use crate::Result;

    fn date(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    fn experiment() -> Experiment {
        let mut experiment = Experiment::new("PIR board", 50.0, 32.0, 23.0).with_humidity_memo("dry");
        experiment.add_measurements([
            MeasurementRecord::new(date(2024, 1, 10, 9), 0.0210),
            MeasurementRecord::new(date(2024, 2, 9, 17), 0.0228),
            MeasurementRecord::new(date(2024, 7, 5, 8), 0.0260),
        ]);
        experiment
    }

    #[test]
    fn elapsed_days_are_truncated_whole_days() {
        let experiment = experiment();
        let days: Vec<i64> = experiment.measurements.iter().map(|m| m.elapsed_days).collect();
        // 30 days and 8 hours, then 176 days and 23 hours
        assert_eq!(days, vec![0, 30, 176]);

        let ids: Vec<u32> = experiment.measurements.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn increases_are_relative_to_the_first_measurement() {
        let mut experiment = experiment();
        experiment.add_measurements([MeasurementRecord::new(date(2024, 9, 1, 9), 0.0265)]);

        let last = experiment.measurements.last().unwrap();
        approx::assert_relative_eq!(last.thermal_conductivity_increase, 0.0055, max_relative = 1e-9);
        assert_eq!(last.elapsed_days, 235);
        approx::assert_relative_eq!(experiment.measurements[0].thermal_conductivity_increase, 0.0);
    }

    #[test]
    fn tables_are_built_in_elapsed_seconds() -> Result<()> {
        let table = experiment().error_table()?;
        approx::assert_relative_eq!(table.temperature(), 23.0);
        approx::assert_relative_eq!(table.duration(), 176.0 * SECONDS_PER_DAY);
        approx::assert_relative_eq!(table.baseline(), 0.0210);
        Ok(())
    }

    #[test]
    fn same_day_measurements_cannot_be_fitted() {
        let mut experiment = Experiment::new("EPS", 30.0, 20.0, 50.0);
        experiment.add_measurements([
            MeasurementRecord::new(date(2024, 1, 10, 9), 0.0330),
            MeasurementRecord::new(date(2024, 1, 10, 18), 0.0331),
        ]);
        assert!(matches!(
            experiment.error_table(),
            Err(ValidationError::NotIncreasing { index: 1, .. })
        ));
    }

    #[test]
    fn experiments_round_trip_through_json_files() -> Result<()> {
        let tmp_dir = TempDir::new("experiments_round_trip_through_json_files")?;
        let path = tmp_dir.path().join("sample01.json");

        let experiment = experiment();
        experiment.to_file(&path)?;
        assert_eq!(Experiment::from_file(&path)?, experiment);
        Ok(())
    }

    #[test]
    fn missing_fields_take_defaults() -> Result<()> {
        let experiment: Experiment = serde_json::from_str(
            r#"{
                "sample_name": "XPS",
                "temperature": 70.0,
                "measurements": [
                    {"measurement_date": "2024-01-10T09:00:00", "thermal_conductivity": 0.029},
                    {"measurement_date": "2024-03-10T09:00:00", "elapsed_days": 60, "thermal_conductivity": 0.031}
                ]
            }"#,
        )?;
        assert_eq!(experiment.id, "");
        assert_eq!(experiment.measurements[1].elapsed_days, 60);
        approx::assert_relative_eq!(experiment.thickness_mm, 0.0);
        Ok(())
    }

    #[test]
    fn missing_files_are_reported() {
        let result = Experiment::from_file(std::path::Path::new("/definitely/not/here.json"));
        assert!(result.is_err());
    }
}
