//! Console output for bigtest.

use colored::*;
use grouper_planner::MemoryLevel;
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::error::BenchResult;

/// Output format for listing commands
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// One enumerated memory level.
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct LevelRow {
    #[tabled(rename = "Tables")]
    pub tables: u64,
    #[tabled(rename = "Bytes")]
    pub bytes: u64,
}

impl From<MemoryLevel> for LevelRow {
    fn from(level: MemoryLevel) -> Self {
        Self {
            tables: level.table_count,
            bytes: level.bytes,
        }
    }
}

/// Print a vector of items in the specified format
pub fn print_output<T: Serialize + Tabled>(data: Vec<T>, format: OutputFormat) -> BenchResult<()> {
    match format {
        OutputFormat::Table => {
            if data.is_empty() {
                println!("{}", "No levels".dimmed());
            } else {
                println!("{}", Table::new(data));
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&data)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&data)?),
    }
    Ok(())
}

/// Print a single item in the specified format
pub fn print_single<T: Serialize>(data: &T, format: OutputFormat) -> BenchResult<()> {
    match format {
        OutputFormat::Table | OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?)
        }
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(data)?),
    }
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// `D days H hours M minutes S seconds`, fractional seconds dropped.
pub fn format_duration(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds().max(0);
    let (mins, seconds) = (secs / 60, secs % 60);
    let (hrs, minutes) = (mins / 60, mins % 60);
    let (days, hours) = (hrs / 24, hrs % 24);
    format!(
        "{} days {} hours {} minutes {} seconds",
        days, hours, minutes, seconds
    )
}
