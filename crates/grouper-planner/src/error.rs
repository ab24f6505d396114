//! Error types for the sweep planner.

use thiserror::Error;

/// Errors that can occur while planning or driving a sweep.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// The measurement collaborator produced no usable timing record.
    #[error("external collaborator failure: {0}")]
    ExternalCollaborator(String),

    /// Measured CPU time rounded to zero at the current packet count.
    #[error(
        "cpu time below timer resolution for {bits} bits at {packets} packets; \
         increase the number of packets and try again"
    )]
    MeasurementBelowResolution { bits: u64, packets: u64 },

    /// A rule or data fixture could not be produced.
    #[error("fixture error: {0}")]
    Fixture(String),

    /// The result sink rejected a row.
    #[error("result sink error: {0}")]
    Sink(String),

    /// The sweep parameters are unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl PlannerError {
    /// Whether this error only ends the current bit-length, not the sweep.
    pub fn is_bit_length_fatal(&self) -> bool {
        matches!(self, PlannerError::MeasurementBelowResolution { .. })
    }
}

/// Result type for planner operations.
pub type PlannerResult<T> = Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_resolution_mentions_packets() {
        let e = PlannerError::MeasurementBelowResolution {
            bits: 40,
            packets: 100_000,
        };
        let s = e.to_string();
        assert!(s.contains("40 bits"));
        assert!(s.contains("100000 packets"));
        assert!(e.is_bit_length_fatal());
    }

    #[test]
    fn collaborator_failure_is_not_bit_length_scoped() {
        let e = PlannerError::ExternalCollaborator("missing field 'build'".into());
        assert!(e.to_string().contains("missing field 'build'"));
        assert!(!e.is_bit_length_fatal());
    }
}
