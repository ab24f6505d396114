//! Subprocess measurement of the classifier.
//!
//! The classifier is run as
//! `<program> <memory allowed> <rule file> <data file> <null device>`
//! and reports its timings, in microseconds, as a dictionary literal on
//! its own line:
//!
//! ```text
//! { 'read' : 1520, 'build' : 88213, 'cpu_process' : 412000, 'real_process' : 415872, 'total' : 506114 }
//! ```

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use grouper_planner::measure::NULL_DEVICE;
use grouper_planner::{
    classifier_command_line, MeasureRequest, Measurer, PlannerError, PlannerResult,
    RawTimingRecord, TimingRecord,
};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs the classifier binary once per measurement.
#[derive(Debug, Clone)]
pub struct SubprocessMeasurer {
    program: String,
    timeout: Option<Duration>,
}

impl SubprocessMeasurer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kill runs that take longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run once and return stdout followed by stderr.
    fn run(&self, request: &MeasureRequest<'_>) -> PlannerResult<String> {
        let mut child = Command::new(&self.program)
            .arg(request.configuration.memory_budget.to_string())
            .arg(request.rule_fixture)
            .arg(request.data_fixture)
            .arg(NULL_DEVICE)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| collaborator(format!("failed to start {}: {}", self.program, e)))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let mut guard = ChildGuard::new(child);
        let status = guard.wait(self.timeout)?;

        let mut output = collect(stdout);
        output.push_str(&collect(stderr));

        if !status.success() {
            return Err(collaborator(format!(
                "{} exited with {}: {}",
                self.program,
                status,
                last_line(&output)
            )));
        }
        Ok(output)
    }
}

impl Measurer for SubprocessMeasurer {
    fn measure(&mut self, request: &MeasureRequest<'_>) -> PlannerResult<TimingRecord> {
        let output = self.run(request)?;
        debug!(bytes = output.len(), "Classifier finished");
        parse_timing_output(&output)
    }

    fn command_line(&self, request: &MeasureRequest<'_>) -> String {
        classifier_command_line(&self.program, request)
    }

    fn name(&self) -> &str {
        "subprocess"
    }
}

// ── Parsing ─────────────────────────────────────────────────────────

/// Parse the last line of `output` that starts with `{`.
pub fn parse_timing_output(output: &str) -> PlannerResult<TimingRecord> {
    let line = output
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with('{'))
        .ok_or_else(|| {
            collaborator(format!(
                "no timing record in classifier output: {}",
                last_line(output)
            ))
        })?;
    parse_timing_line(line)
}

/// Parse one timing dictionary; single quotes are accepted.
pub fn parse_timing_line(line: &str) -> PlannerResult<TimingRecord> {
    let json = line.replace('\'', "\"");
    let raw: RawTimingRecord = serde_json::from_str(&json)
        .map_err(|e| collaborator(format!("malformed timing record {:?}: {}", line, e)))?;
    TimingRecord::try_from(raw)
}

fn collaborator(message: String) -> PlannerError {
    PlannerError::ExternalCollaborator(message)
}

fn last_line(output: &str) -> &str {
    output
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("<no output>")
}

// ── Process handling ────────────────────────────────────────────────

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

/// Kills the child if it is still running when dropped.
struct ChildGuard {
    child: Option<Child>,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self { child: Some(child) }
    }

    fn wait(&mut self, timeout: Option<Duration>) -> PlannerResult<ExitStatus> {
        let child = self
            .child
            .as_mut()
            .ok_or_else(|| collaborator("classifier already reaped".into()))?;
        let deadline = timeout.map(|t| Instant::now() + t);

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => match deadline {
                    Some(deadline) if Instant::now() >= deadline => {
                        return Err(collaborator(format!(
                            "classifier timed out after {:?}",
                            timeout.unwrap_or_default()
                        )));
                    }
                    _ => std::thread::sleep(POLL_INTERVAL),
                },
                Err(e) => return Err(collaborator(format!("failed to wait for classifier: {}", e))),
            }
        };

        self.child = None;
        Ok(status)
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Ok(None) = child.try_wait() {
                warn!(pid = child.id(), "Killing classifier");
                let _ = child.kill();
            }
            let _ = child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str =
        "{ 'read' : 1520, 'build' : 88213, 'cpu_process' : 412000, 'real_process' : 415872, 'total' : 506114 }";

    #[test]
    fn parses_single_quoted_record() {
        let record = parse_timing_line(RECORD).unwrap();
        assert_eq!(record.read_micros, 1520);
        assert_eq!(record.build_micros, 88213);
        assert_eq!(record.cpu_process_micros, 412_000);
        assert_eq!(record.real_process_micros, 415_872);
        assert_eq!(record.total_micros, 506_114);
    }

    #[test]
    fn uses_last_record_line() {
        let output = format!(
            "Reading policy...\n{{ 'read' : 1 }}\nBuilding 20 tables\n  {}\ndone\n",
            RECORD
        );
        let record = parse_timing_output(&output).unwrap();
        assert_eq!(record.total_micros, 506_114);
    }

    #[test]
    fn missing_fields_are_named() {
        let err = parse_timing_line("{ 'read' : 1, 'build' : 2, 'total' : 3 }").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("cpu_process"));
        assert!(message.contains("real_process"));
        assert!(!message.contains("build"));
    }

    #[test]
    fn non_numeric_field_is_rejected() {
        let line = RECORD.replace("1520", "'fast'");
        assert!(matches!(
            parse_timing_line(&line),
            Err(PlannerError::ExternalCollaborator(_))
        ));
    }

    #[test]
    fn output_without_record_is_rejected() {
        let err = parse_timing_output("Segmentation fault\n").unwrap_err();
        assert!(err.to_string().contains("Segmentation fault"));
        assert!(parse_timing_output("").is_err());
    }

    #[test]
    fn spawn_failure_is_a_collaborator_error() {
        let mut measurer = SubprocessMeasurer::new("/nonexistent/grouper");
        let request = request();
        assert!(matches!(
            measurer.measure(&request.as_request()),
            Err(PlannerError::ExternalCollaborator(_))
        ));
    }

    #[test]
    fn command_line_matches_invocation() {
        let measurer = SubprocessMeasurer::new("./grouper");
        let request = request();
        assert_eq!(
            measurer.command_line(&request.as_request()),
            format!("./grouper 10000 40bx1000rules.pol 100Kpackets.bin {}", NULL_DEVICE)
        );
    }

    struct OwnedRequest {
        rule: std::path::PathBuf,
        data: std::path::PathBuf,
    }

    impl OwnedRequest {
        fn as_request(&self) -> MeasureRequest<'_> {
            MeasureRequest {
                configuration: grouper_planner::Configuration::new(40, 1000, 10_000),
                level: grouper_planner::MemoryLevel::new(20, 10_000),
                rule_fixture: &self.rule,
                data_fixture: &self.data,
            }
        }
    }

    fn request() -> OwnedRequest {
        OwnedRequest {
            rule: "40bx1000rules.pol".into(),
            data: "100Kpackets.bin".into(),
        }
    }

    #[cfg(unix)]
    #[test]
    fn runs_classifier_scripts() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let script = |name: &str, body: &str| {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().into_owned()
        };
        let request = request();

        // record on stderr, chatter on stdout
        let ok = script(
            "ok.sh",
            &format!("echo \"building for $1 bytes\"\necho \"{}\" >&2", RECORD),
        );
        let record = SubprocessMeasurer::new(ok)
            .measure(&request.as_request())
            .unwrap();
        assert_eq!(record.cpu_process_micros, 412_000);

        let failing = script("fail.sh", "echo 'out of memory' >&2\nexit 3");
        let err = SubprocessMeasurer::new(failing)
            .measure(&request.as_request())
            .unwrap_err();
        assert!(err.to_string().contains("out of memory"));

        let slow = script("slow.sh", "exec sleep 5");
        let started = Instant::now();
        let err = SubprocessMeasurer::new(slow)
            .with_timeout(Duration::from_millis(200))
            .measure(&request.as_request())
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
