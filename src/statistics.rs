use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use console::Style;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

/// One named output value produced at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct OutputVariable {
    pub name: String,
    pub value: Value,
}

impl OutputVariable {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        OutputVariable {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for OutputVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, field(&self.value))
    }
}

/// Sink for the output variables of a finished run.
pub trait StatisticsBackend {
    fn write_data(&self, data: &BTreeMap<String, OutputVariable>);
}

/// Appends output variables as one CSV row per run to
/// `<report_dir>/statistics.csv`, writing the header when the file is empty.
pub struct CsvStatisticsBackend {
    report_dir: PathBuf,
}

impl CsvStatisticsBackend {
    pub fn new(report_dir: impl Into<PathBuf>) -> Self {
        CsvStatisticsBackend {
            report_dir: report_dir.into(),
        }
    }

    fn ensure_report_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.report_dir)
    }

    fn try_write(&self, data: &BTreeMap<String, OutputVariable>) -> std::io::Result<()> {
        self.ensure_report_dir()?;
        let output_file = self.report_dir.join("statistics.csv");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&output_file)?;
        if file.metadata()?.len() == 0 {
            writeln!(file, "{}", csv_header(data))?;
        }
        writeln!(file, "{}", csv_row(data))?;
        Ok(())
    }

    pub fn output_path(&self) -> PathBuf {
        self.report_dir.join("statistics.csv")
    }
}

impl StatisticsBackend for CsvStatisticsBackend {
    /// An unusable report dir is fatal: without it no run can ever be
    /// recorded. Write-time IO errors only cost the current row and are
    /// logged instead.
    fn write_data(&self, data: &BTreeMap<String, OutputVariable>) {
        if let Err(error) = self.ensure_report_dir() {
            error!(dir = %self.report_dir.display(), %error, "cannot create report dir");
            panic!(
                "cannot create report dir {}: {error}",
                self.report_dir.display()
            );
        }
        if let Err(error) = self.try_write(data) {
            warn!(dir = %self.report_dir.display(), %error, "error while writing statistics");
        }
    }
}

fn csv_header(data: &BTreeMap<String, OutputVariable>) -> String {
    data.keys().cloned().collect::<Vec<_>>().join(",")
}

fn csv_row(data: &BTreeMap<String, OutputVariable>) -> String {
    data.values()
        .map(|v| field(&v.value))
        .collect::<Vec<_>>()
        .join(",")
}

// Strings are written bare; everything else uses its JSON rendering.
fn field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Prints every output variable as a styled `key: value` line.
pub struct ConsoleStatisticsBackend;

impl StatisticsBackend for ConsoleStatisticsBackend {
    fn write_data(&self, data: &BTreeMap<String, OutputVariable>) {
        let key_style = Style::new().cyan().bold();
        for (key, variable) in data {
            println!("{}: {}", key_style.apply_to(key), field(&variable.value));
        }
    }
}

/// Write the statistics file under `report_dir`, creating the directory if
/// needed. Errors if the directory cannot be created.
pub fn write_csv(report_dir: &Path, data: &BTreeMap<String, OutputVariable>) -> std::io::Result<()> {
    CsvStatisticsBackend::new(report_dir).try_write(data)
}
