//! Periodic acquisition core.
//!
//! [`AcquisitionLoop`] owns the instrument, the rolling buffer, the timer and
//! the current [`Session`]. The UI drives it from its own frame loop through
//! [`AcquisitionLoop::poll`] and listens on the [`LoopEvent`] channel; the loop
//! never calls back into the UI.
//!
//! Every successful start opens a new session, so the first reading after a
//! stop/start pair is at elapsed time zero. A failed tick (instrument or file
//! error) ends the session and is reported as [`LoopEvent::Error`].
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use log::{error, info, warn};
use thiserror::Error;

use crate::buffer::RollingBuffer;
use crate::drivers::{InstrumentError, InstrumentSource};
use crate::recorder::{FileSinkError, OutputSink};
use crate::timer::PeriodicTimer;
use crate::types::{LoopEvent, PollInterval, Reading};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("no readout interval selected")]
    MissingInterval,
    #[error("unknown readout interval {0:?}")]
    UnknownInterval(String),
}

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    FileSink(#[from] FileSinkError),
    #[error(transparent)]
    Instrument(#[from] InstrumentError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquisitionState {
    Idle,
    Running,
}

/// What the caller selected when pressing start.
#[derive(Clone, Debug, Default)]
pub struct StartRequest {
    /// `None` or an empty path means no output file.
    pub output: Option<PathBuf>,
    pub interval: Option<PollInterval>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StartOutcome {
    /// Where readings are written, after collision renaming.
    pub output: Option<PathBuf>,
    pub interval: PollInterval,
    pub already_running: bool,
}

/// One run between start and stop.
#[derive(Debug)]
pub struct Session {
    origin: Option<f64>,
    interval: PollInterval,
    sink: Option<OutputSink>,
    ticks: u64,
}

impl Session {
    fn new(interval: PollInterval, sink: Option<OutputSink>) -> Self {
        Self {
            origin: None,
            interval,
            sink,
            ticks: 0,
        }
    }

    pub fn origin(&self) -> Option<f64> {
        self.origin
    }

    pub fn interval(&self) -> PollInterval {
        self.interval
    }

    pub fn output(&self) -> Option<&Path> {
        self.sink.as_ref().map(OutputSink::path)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

pub struct AcquisitionLoop<S: InstrumentSource> {
    source: S,
    buffer: RollingBuffer,
    timer: PeriodicTimer,
    session: Option<Session>,
    events: Sender<LoopEvent>,
}

impl<S: InstrumentSource> AcquisitionLoop<S> {
    pub fn new(source: S, capacity: usize, events: Sender<LoopEvent>) -> Self {
        Self {
            source,
            buffer: RollingBuffer::new(capacity),
            timer: PeriodicTimer::default(),
            session: None,
            events,
        }
    }

    pub fn state(&self) -> AcquisitionState {
        if self.session.is_some() {
            AcquisitionState::Running
        } else {
            AcquisitionState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Output path and interval selectors must stay untouched while this is true.
    pub fn inputs_locked(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn readings(&self) -> &RollingBuffer {
        &self.buffer
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Passes range and resolution on to the instrument.
    pub fn configure(&mut self, max_range: f64, resolution: f64) -> Result<(), AcquisitionError> {
        self.source.configure(max_range, resolution)?;
        Ok(())
    }

    pub fn start(&mut self, request: StartRequest) -> Result<StartOutcome, AcquisitionError> {
        self.start_at(request, Instant::now())
    }

    pub fn start_at(
        &mut self,
        request: StartRequest,
        now: Instant,
    ) -> Result<StartOutcome, AcquisitionError> {
        if let Some(session) = &self.session {
            return Ok(StartOutcome {
                output: session.output().map(|p| p.to_path_buf()),
                interval: session.interval,
                already_running: true,
            });
        }
        let interval = request.interval.ok_or(ConfigurationError::MissingInterval)?;
        let sink = match request.output.filter(|p| !p.as_os_str().is_empty()) {
            Some(path) => Some(OutputSink::create(&path)?),
            None => {
                warn!("No output file selected");
                None
            }
        };
        let output = sink.as_ref().map(|s| s.path().to_path_buf());
        self.session = Some(Session::new(interval, sink));
        self.buffer.clear();
        self.timer.arm(interval.period(), now);
        self.emit(LoopEvent::InputsLocked(true));
        self.emit(LoopEvent::Started {
            output: output.clone(),
            interval,
        });
        info!("Acquisition started ({interval})");
        Ok(StartOutcome {
            output,
            interval,
            already_running: false,
        })
    }

    pub fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if let Some(period) = self.timer.period() {
            info!(
                "Acquisition stopped after {} readings every {:?}",
                session.ticks, period
            );
        }
        self.timer.disarm();
        self.emit(LoopEvent::InputsLocked(false));
        self.emit(LoopEvent::Stopped);
    }

    /// Stops a running session before the process exits.
    pub fn shutdown(&mut self) {
        self.stop();
        info!("bye!");
    }

    /// Runs one tick if the timer is due at `now`.
    pub fn poll(&mut self, now: Instant) -> Result<Option<Reading>, AcquisitionError> {
        if !self.timer.is_armed() {
            return Ok(None);
        }
        if self.timer.fire_if_due(now) {
            self.tick()
        } else {
            Ok(None)
        }
    }

    pub fn time_until_next_tick(&self, now: Instant) -> Option<Duration> {
        self.timer.time_until_due(now)
    }

    /// Takes one reading. Does nothing while idle; any failure ends the session.
    pub fn tick(&mut self) -> Result<Option<Reading>, AcquisitionError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };
        match acquire(&mut self.source, session, &mut self.buffer) {
            Ok(reading) => {
                info!("reading {:.6}:{:.6}", reading.elapsed, reading.value);
                self.emit(LoopEvent::Reading(reading));
                Ok(Some(reading))
            }
            Err(e) => {
                error!("Acquisition aborted: {e}");
                self.stop();
                self.emit(LoopEvent::Error(e.to_string()));
                Err(e)
            }
        }
    }

    fn emit(&self, event: LoopEvent) {
        // receiver gone means the UI is shutting down
        self.events.send(event).ok();
    }
}

fn acquire<S: InstrumentSource>(
    source: &mut S,
    session: &mut Session,
    buffer: &mut RollingBuffer,
) -> Result<Reading, AcquisitionError> {
    let sample = source.sample()?;
    let origin = *session.origin.get_or_insert(sample.timestamp);
    let reading = Reading::from_sample(sample, origin);
    if let Some(sink) = &session.sink {
        sink.append(&reading)?;
    }
    session.ticks += 1;
    buffer.push(reading);
    Ok(reading)
}
