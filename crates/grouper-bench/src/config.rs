//! Configuration for bigtest

use std::path::PathBuf;

use grouper_planner::{MemSteps, SweepPlan, SweepSettings, GB};
use serde::{Deserialize, Serialize};

use crate::error::{BenchError, BenchResult};

/// Main bench configuration
///
/// The step fields mirror the step files used for fixed-grid sweeps:
///
/// ```yaml
/// bit_steps: [32, 64, 104]
/// rule_steps: [1000, 10000]
/// mem_steps: [100000, 1000000, 10000000]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Pattern widths to sweep
    #[serde(default)]
    pub bit_steps: Vec<u64>,

    /// Rule counts to sweep
    #[serde(default)]
    pub rule_steps: Vec<u64>,

    /// Fixed memory budgets; every enumerated level when absent
    #[serde(default)]
    pub mem_steps: Option<Vec<u64>>,

    /// Classifier executable
    #[serde(default = "default_program")]
    pub program: String,

    /// Packets per measurement, in thousands
    #[serde(default = "default_data_size")]
    pub data_size: u64,

    /// Directory for generated rule and packet files
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Per-measurement timeout in seconds, 0 to wait forever
    #[serde(default = "default_measure_timeout")]
    pub measure_timeout_secs: u64,

    /// Ceiling for enumerated memory levels, in bytes
    #[serde(default = "default_max_space")]
    pub max_space: u64,

    /// Largest `(bits + 1) * rules` rule file worth generating
    #[serde(default = "default_practical_limit")]
    pub practical_limit: u64,

    /// Nominal packet size for the bandwidth column
    #[serde(default = "default_packet_size")]
    pub packet_size_bytes: u64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            bit_steps: Vec::new(),
            rule_steps: Vec::new(),
            mem_steps: None,
            program: default_program(),
            data_size: default_data_size(),
            work_dir: default_work_dir(),
            measure_timeout_secs: default_measure_timeout(),
            max_space: default_max_space(),
            practical_limit: default_practical_limit(),
            packet_size_bytes: default_packet_size(),
        }
    }
}

// Default value helpers
fn default_program() -> String {
    "./grouper".to_string()
}

fn default_data_size() -> u64 {
    100
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_measure_timeout() -> u64 {
    0
}

fn default_max_space() -> u64 {
    2 * GB
}

fn default_practical_limit() -> u64 {
    3 * GB / 2
}

fn default_packet_size() -> u64 {
    1500
}

impl BenchConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `GROUPER_*` environment variables.
    ///
    /// List fields read from the environment are comma separated, e.g.
    /// `GROUPER_BIT_STEPS=32,64`.
    pub fn load(path: Option<&str>) -> BenchResult<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&BenchConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("GROUPER")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("bit_steps")
                .with_list_parse_key("rule_steps")
                .with_list_parse_key("mem_steps")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Planner settings derived from this configuration.
    pub fn sweep_settings(&self) -> SweepSettings {
        SweepSettings::default()
            .with_max_space(self.max_space)
            .with_practical_limit(self.practical_limit)
            .with_data_kilo_packets(self.data_size)
            .with_packet_size_bytes(self.packet_size_bytes)
    }

    /// The fixed-grid plan described by the step fields.
    pub fn step_plan(&self) -> BenchResult<SweepPlan> {
        if self.bit_steps.is_empty() || self.rule_steps.is_empty() {
            return Err(BenchError::Config(
                "a step file with bit_steps and rule_steps is required unless running all tests"
                    .into(),
            ));
        }
        let mem_steps = match &self.mem_steps {
            Some(steps) => MemSteps::Explicit(steps.clone()),
            None => MemSteps::All,
        };
        let plan = SweepPlan::new(self.bit_steps.clone(), self.rule_steps.clone(), mem_steps);
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> BenchResult<()> {
        if self.data_size == 0 {
            return Err(BenchError::Config("data size must be at least 1".into()));
        }
        if self.program.trim().is_empty() {
            return Err(BenchError::Config("program must not be empty".into()));
        }
        Ok(())
    }
}
