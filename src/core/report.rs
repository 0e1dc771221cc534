/// Report definitions: where a format is rendered to and how often.
///
/// A [`Report`] owns a parsed template, an emission interval and a sink.
/// A [`ReportSet`] drives several reports from the same simulation loop,
/// built via `ReportSet::builder()`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, trace, warn};

use super::ast::Template;
use super::eval::EvalError;
use super::parser::TemplateError;
use crate::schema::snapshot::Snapshot;

/// `strftime` layout of the header timestamp.
const TIMESTAMP_FORMAT: &str = "%d/%m/%y %H:%M:%S";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("invalid format for {destination}: {source}")]
    Format {
        destination: Destination,
        source: TemplateError,
    },
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
    #[error("could not open output file {path:?} for writing: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Where emitted lines go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
    /// Standard output. No header is written.
    Console,
    /// A file, truncated on open and started with a header.
    File(PathBuf),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Console => f.write_str("console"),
            Destination::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// One report as written in a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSpec {
    pub destination: Destination,
    /// Simulation time between emissions. Negative emits on every update.
    pub interval: f64,
    pub format: String,
}

/// A RON report configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub reports: Vec<ReportSpec>,
}

impl ReportConfig {
    pub fn load_from_ron(path: &Path) -> Result<ReportConfig, ReportError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<ReportConfig, ReportError> {
        Ok(ron::from_str(input)?)
    }
}

/// A parsed format bound to a sink and an emission schedule.
pub struct Report<W: Write> {
    destination: Destination,
    format: String,
    template: Template,
    interval: f64,
    last_emit: f64,
    first_run: bool,
    sink: W,
}

impl<W: Write> Report<W> {
    /// Parse `format` and bind it to `sink`. Nothing is written yet.
    pub fn new(
        destination: Destination,
        format: &str,
        interval: f64,
        sink: W,
    ) -> Result<Self, ReportError> {
        let template = Template::parse(format).map_err(|source| ReportError::Format {
            destination: destination.clone(),
            source,
        })?;
        Ok(Self {
            destination,
            format: format.to_string(),
            template,
            interval,
            last_emit: 0.0,
            first_run: true,
            sink,
        })
    }

    /// Write the four-line file header.
    pub fn write_header(&mut self) -> Result<(), ReportError> {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT);
        writeln!(self.sink, "# filename: {}", self.destination)?;
        writeln!(self.sink, "# timestamp: {}", timestamp)?;
        writeln!(self.sink, "# output timing: {}", self.interval)?;
        writeln!(self.sink, "# format: {}", self.format)?;
        self.sink.flush()?;
        Ok(())
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Whether an update at simulation time `time` emits a line.
    pub fn is_due(&self, time: f64) -> bool {
        self.first_run || self.interval < 0.0 || time - self.last_emit >= self.interval
    }

    /// Emit a line if due. Returns whether a line was written.
    ///
    /// A failed evaluation writes nothing and leaves the schedule as it was.
    pub fn update<S: Snapshot + ?Sized>(&mut self, snapshot: &S) -> Result<bool, ReportError> {
        let time = snapshot.time();
        if !self.is_due(time) {
            return Ok(false);
        }

        let line = match self.template.evaluate(snapshot) {
            Ok(line) => line,
            Err(e) => {
                warn!("report {} failed at t={}: {}", self.destination, time, e);
                return Err(e.into());
            }
        };
        writeln!(self.sink, "{}", line)?;
        self.sink.flush()?;
        trace!("report {} emitted at t={}", self.destination, time);

        self.last_emit = time;
        self.first_run = false;
        Ok(true)
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

/// Reports updated together, in insertion order.
pub struct ReportSet<W: Write = Box<dyn Write>> {
    reports: Vec<Report<W>>,
}

impl<W: Write> Default for ReportSet<W> {
    fn default() -> Self {
        Self {
            reports: Vec::new(),
        }
    }
}

impl<W: Write> ReportSet<W> {
    pub fn push(&mut self, report: Report<W>) {
        self.reports.push(report);
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn reports(&self) -> &[Report<W>] {
        &self.reports
    }

    /// Update every report. Stops at the first failure.
    ///
    /// Returns how many reports emitted a line.
    pub fn update<S: Snapshot + ?Sized>(&mut self, snapshot: &S) -> Result<usize, ReportError> {
        let mut emitted = 0;
        for report in &mut self.reports {
            if report.update(snapshot)? {
                emitted += 1;
            }
        }
        Ok(emitted)
    }

    pub fn into_reports(self) -> Vec<Report<W>> {
        self.reports
    }
}

impl ReportSet {
    pub fn builder() -> ReportSetBuilder {
        ReportSetBuilder::default()
    }
}

/// Collects report definitions, then opens every destination at once.
#[derive(Debug, Default)]
pub struct ReportSetBuilder {
    config_paths: Vec<PathBuf>,
    specs: Vec<ReportSpec>,
}

impl ReportSetBuilder {
    /// Add every report from a RON config file.
    pub fn config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_paths.push(path.into());
        self
    }

    pub fn report(mut self, spec: ReportSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Parse every format, then open the destinations.
    ///
    /// Formats are checked before any file is touched, so a bad format
    /// never truncates an existing output file.
    pub fn build(self) -> Result<ReportSet, ReportError> {
        let mut specs = Vec::new();
        for path in &self.config_paths {
            specs.extend(ReportConfig::load_from_ron(path)?.reports);
        }
        specs.extend(self.specs);

        for spec in &specs {
            Template::parse(&spec.format).map_err(|source| ReportError::Format {
                destination: spec.destination.clone(),
                source,
            })?;
        }

        let mut set = ReportSet::default();
        for spec in specs {
            set.push(open(spec)?);
        }
        Ok(set)
    }
}

fn open(spec: ReportSpec) -> Result<Report<Box<dyn Write>>, ReportError> {
    let sink: Box<dyn Write> = match &spec.destination {
        Destination::Console => Box::new(std::io::stdout()),
        Destination::File(path) => {
            let file = File::create(path).map_err(|source| ReportError::Open {
                path: path.clone(),
                source,
            })?;
            Box::new(BufWriter::new(file))
        }
    };

    let with_header = matches!(spec.destination, Destination::File(_));
    let mut report = Report::new(spec.destination, &spec.format, spec.interval, sink)?;
    if with_header {
        report.write_header()?;
    }
    info!(
        "opened report {} (interval {}, format {:?})",
        report.destination(),
        report.interval,
        report.format()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::particle::{Particle, ParticleId};
    use crate::schema::snapshot::SimulationState;
    use crate::schema::vector::Vec3;

    fn state(time: f64) -> SimulationState {
        SimulationState {
            name: "pair".to_string(),
            time,
            primary: Some(ParticleId(1)),
            particles: vec![
                Particle::new(ParticleId(1), "star", 1.0),
                Particle::new(ParticleId(2), "planet", 1e-3)
                    .at(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)),
            ],
            ..SimulationState::default()
        }
    }

    fn console(format: &str, interval: f64) -> Report<Vec<u8>> {
        Report::new(Destination::Console, format, interval, Vec::new()).unwrap()
    }

    fn lines(report: Report<Vec<u8>>) -> Vec<String> {
        String::from_utf8(report.into_inner())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn first_update_always_emits() {
        let mut report = console("#st", 10.0);
        assert!(report.update(&state(0.5)).unwrap());
        assert_eq!(lines(report), vec!["0.5"]);
    }

    #[test]
    fn interval_gates_emission() {
        let mut report = console("#st", 1.0);
        let mut emitted = Vec::new();
        for t in [0.0, 0.5, 1.0, 1.5, 2.5] {
            emitted.push(report.update(&state(t)).unwrap());
        }
        assert_eq!(emitted, vec![true, false, true, false, true]);
        assert_eq!(lines(report), vec!["0.0", "1.0", "2.5"]);
    }

    #[test]
    fn negative_interval_emits_every_update() {
        let mut report = console("#st", -1.0);
        for t in [0.0, 0.0, 0.1] {
            assert!(report.update(&state(t)).unwrap());
        }
        assert_eq!(lines(report).len(), 3);
    }

    #[test]
    fn is_due_after_first_run() {
        let mut report = console("#st", 2.0);
        assert!(report.is_due(100.0));
        report.update(&state(1.0)).unwrap();
        assert!(!report.is_due(2.5));
        assert!(report.is_due(3.0));
    }

    #[test]
    fn bad_format_names_destination() {
        let err = Report::new(
            Destination::File("out.dat".into()),
            "#pa",
            1.0,
            Vec::new(),
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            ReportError::Format {
                source: TemplateError::InvalidTagContext { .. },
                ..
            }
        ));
        assert!(err.to_string().contains("out.dat"));
    }

    #[test]
    fn failed_evaluation_writes_nothing() {
        let mut report = console("#sc:#am", -1.0);
        let empty = SimulationState::default();
        assert!(matches!(
            report.update(&empty),
            Err(ReportError::Eval(EvalError::EmptyAggregate { .. }))
        ));
        assert!(report.into_inner().is_empty());
    }

    #[test]
    fn header_has_four_lines() {
        let mut report = Report::new(
            Destination::File("orbits.dat".into()),
            "#st, #sc",
            0.25,
            Vec::new(),
        )
        .unwrap();
        report.write_header().unwrap();
        report.update(&state(0.0)).unwrap();
        let out = lines(report);
        assert_eq!(out.len(), 5);
        assert_eq!(out[0], "# filename: orbits.dat");
        assert!(out[1].starts_with("# timestamp: "));
        assert_eq!(out[2], "# output timing: 0.25");
        assert_eq!(out[3], "# format: #st, #sc");
        assert_eq!(out[4], "0.0, 2");
    }

    #[test]
    fn set_updates_in_order_and_counts() {
        let mut set: ReportSet<Vec<u8>> = ReportSet::default();
        set.push(console("#st", 1.0));
        set.push(console("#sn", -1.0));
        assert_eq!(set.update(&state(0.0)).unwrap(), 2);
        assert_eq!(set.update(&state(0.5)).unwrap(), 1);
        let reports = set.into_reports();
        assert_eq!(reports.len(), 2);
    }

    #[test]
    fn set_stops_at_first_failure() {
        let mut set: ReportSet<Vec<u8>> = ReportSet::default();
        set.push(console("#am", -1.0));
        set.push(console("#st", -1.0));
        assert!(set.update(&SimulationState::default()).is_err());
        let reports = set.into_reports();
        assert!(reports[1].sink.is_empty());
    }

    #[test]
    fn parse_config() {
        let config = ReportConfig::parse_ron(
            r##"(
                reports: [
                    (destination: Console, interval: 1.5, format: "#st"),
                    (destination: File("full_info.dat"), interval: -1.0, format: "{#pa,}"),
                ],
            )"##,
        )
        .unwrap();
        assert_eq!(config.reports.len(), 2);
        assert_eq!(config.reports[0].destination, Destination::Console);
        assert_eq!(
            config.reports[1].destination,
            Destination::File(PathBuf::from("full_info.dat"))
        );
    }

    #[test]
    fn builder_rejects_bad_format_before_opening_files() {
        let path = std::env::temp_dir().join("orbit_report_untouched.dat");
        let _ = std::fs::remove_file(&path);
        let result = ReportSet::builder()
            .report(ReportSpec {
                destination: Destination::File(path.clone()),
                interval: 1.0,
                format: "#st".to_string(),
            })
            .report(ReportSpec {
                destination: Destination::Console,
                interval: 1.0,
                format: "#sq".to_string(),
            })
            .build();
        assert!(matches!(result, Err(ReportError::Format { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn builder_writes_file_reports() {
        let path = std::env::temp_dir().join("orbit_report_builder.dat");
        let mut set = ReportSet::builder()
            .report(ReportSpec {
                destination: Destination::File(path.clone()),
                interval: -1.0,
                format: "#st #sc".to_string(),
            })
            .build()
            .unwrap();
        set.update(&state(3.0)).unwrap();
        drop(set);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[4], "3.0 2");
        let _ = std::fs::remove_file(&path);
    }
}
