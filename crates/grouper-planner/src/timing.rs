//! Timing records from the measurement collaborator and the throughput
//! figures derived from them.

use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, PlannerResult};

const MICROS_PER_SEC: f64 = 1_000_000.0;

/// Timing record as reported by the classifier, before validation.
///
/// Every field is optional here; [`TimingRecord::try_from`] rejects a
/// record with any field missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTimingRecord {
    pub read: Option<u64>,
    pub build: Option<u64>,
    pub cpu_process: Option<u64>,
    pub real_process: Option<u64>,
    pub total: Option<u64>,
}

/// Validated timing record, all values in microseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingRecord {
    pub read_micros: u64,
    pub build_micros: u64,
    pub cpu_process_micros: u64,
    pub real_process_micros: u64,
    pub total_micros: u64,
}

impl TryFrom<RawTimingRecord> for TimingRecord {
    type Error = PlannerError;

    fn try_from(raw: RawTimingRecord) -> PlannerResult<Self> {
        let mut missing = Vec::new();
        let mut take = |value: Option<u64>, name: &'static str| {
            value.unwrap_or_else(|| {
                missing.push(name);
                0
            })
        };

        let record = TimingRecord {
            read_micros: take(raw.read, "read"),
            build_micros: take(raw.build, "build"),
            cpu_process_micros: take(raw.cpu_process, "cpu_process"),
            real_process_micros: take(raw.real_process, "real_process"),
            total_micros: take(raw.total, "total"),
        };

        if missing.is_empty() {
            Ok(record)
        } else {
            Err(PlannerError::ExternalCollaborator(format!(
                "timing record is missing field(s): {}",
                missing.join(", ")
            )))
        }
    }
}

/// Parameters needed to turn CPU time into throughput.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throughput {
    /// Packets pushed through the classifier per run.
    pub packets: u64,
    /// Nominal packet size used for the bandwidth figure.
    pub packet_size_bytes: u64,
}

impl Throughput {
    pub fn new(packets: u64, packet_size_bytes: u64) -> Self {
        Self {
            packets,
            packet_size_bytes,
        }
    }
}

/// Quantised result columns for one measured configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimingSummary {
    /// Kilobytes per second over the process phase.
    pub kbps: u64,
    /// Patterns (packets) per second over the process phase.
    pub pps: u64,
    pub build_secs: f64,
    pub read_secs: f64,
    pub total_secs: f64,
    pub cpu_process_secs: f64,
    pub real_process_secs: f64,
    /// Command line of the run that produced these numbers.
    pub command: String,
}

impl TimingSummary {
    /// Derive the result columns from a validated timing record.
    ///
    /// A zero CPU process time cannot be turned into a rate and is
    /// reported as [`PlannerError::MeasurementBelowResolution`].
    pub fn derive(
        record: &TimingRecord,
        bits: u64,
        throughput: Throughput,
        command: impl Into<String>,
    ) -> PlannerResult<Self> {
        if record.cpu_process_micros == 0 {
            return Err(PlannerError::MeasurementBelowResolution {
                bits,
                packets: throughput.packets,
            });
        }

        let cpu_secs = micros_to_secs(record.cpu_process_micros);
        let packets = throughput.packets as f64;
        let pps = packets / cpu_secs;
        let kbps = (throughput.packet_size_bytes as f64 * packets / 1000.0) / cpu_secs;

        Ok(Self {
            kbps: kbps.round() as u64,
            pps: pps.round() as u64,
            build_secs: quantize4(micros_to_secs(record.build_micros)),
            read_secs: quantize4(micros_to_secs(record.read_micros)),
            total_secs: quantize4(micros_to_secs(record.total_micros)),
            cpu_process_secs: quantize4(cpu_secs),
            real_process_secs: quantize4(micros_to_secs(record.real_process_micros)),
            command: command.into(),
        })
    }
}

fn micros_to_secs(micros: u64) -> f64 {
    micros as f64 / MICROS_PER_SEC
}

/// Round to the nearest ten-thousandth.
fn quantize4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_raw() -> RawTimingRecord {
        RawTimingRecord {
            read: Some(1_500),
            build: Some(250_000),
            cpu_process: Some(2_000_000),
            real_process: Some(2_100_000),
            total: Some(2_400_000),
        }
    }

    #[test]
    fn complete_raw_record_validates() {
        let record = TimingRecord::try_from(full_raw()).unwrap();
        assert_eq!(record.cpu_process_micros, 2_000_000);
        assert_eq!(record.total_micros, 2_400_000);
    }

    #[test]
    fn missing_fields_are_named() {
        let raw = RawTimingRecord {
            build: None,
            total: None,
            ..full_raw()
        };
        let err = TimingRecord::try_from(raw).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("build"));
        assert!(msg.contains("total"));
        assert!(!msg.contains("read,"));
    }

    #[test]
    fn derive_rates_from_cpu_time() {
        let record = TimingRecord::try_from(full_raw()).unwrap();
        let summary =
            TimingSummary::derive(&record, 104, Throughput::new(100_000, 1500), "cmd").unwrap();
        // 100k packets over 2 s
        assert_eq!(summary.pps, 50_000);
        // 1500 * 100k / 1000 / 2, in kilobytes
        assert_eq!(summary.kbps, 75_000);
        assert_eq!(summary.build_secs, 0.25);
        assert_eq!(summary.read_secs, 0.0015);
        assert_eq!(summary.command, "cmd");
    }

    #[test]
    fn seconds_are_quantised() {
        let record = TimingRecord {
            read_micros: 123_456,
            build_micros: 123_456,
            cpu_process_micros: 123_456,
            real_process_micros: 123_456,
            total_micros: 456_789,
        };
        let summary =
            TimingSummary::derive(&record, 8, Throughput::new(1000, 1500), "").unwrap();
        assert_eq!(summary.read_secs, 0.1235);
        assert_eq!(summary.total_secs, 0.4568);
    }

    #[test]
    fn zero_cpu_time_is_below_resolution() {
        let record = TimingRecord {
            cpu_process_micros: 0,
            ..TimingRecord::try_from(full_raw()).unwrap()
        };
        let err =
            TimingSummary::derive(&record, 40, Throughput::new(100_000, 1500), "").unwrap_err();
        assert!(matches!(
            err,
            PlannerError::MeasurementBelowResolution {
                bits: 40,
                packets: 100_000
            }
        ));
    }
}
