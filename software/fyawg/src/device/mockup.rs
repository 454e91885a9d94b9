//! In-memory instrument that records every command it receives.
//!
//! The command log and the fault list are shared between the connector and
//! every handle it opens, so they can be inspected or changed after the
//! handle has been moved into a driver.

use std::collections::BTreeSet;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use fyawg_shared::{FY3200S_CHANNELS, Waveform};

use super::{Connector, DeviceChannel, DeviceError, DeviceHandle};

/// What a command was addressed to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Target {
    Instrument,
    Channel(usize),
}

/// A single setting written to the instrument
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Setting {
    Output(bool),
    Frequency(f64),
    Waveform(Waveform),
    Amplitude(f64),
    Offset(f64),
    Phase(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub time: DateTime<Utc>,
    pub target: Target,
    pub setting: Setting,
}

/// Shared record of accepted commands
#[derive(Debug, Clone, Default)]
pub struct CommandLog(Arc<Mutex<Vec<Command>>>);

impl CommandLog {
    fn lock(&self) -> MutexGuard<'_, Vec<Command>> {
        // A panicking test thread must not hide the log from the others
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, target: Target, setting: Setting) {
        self.lock().push(Command {
            time: Utc::now(),
            target,
            setting,
        });
    }

    /// Every accepted command, oldest first
    pub fn commands(&self) -> Vec<Command> {
        self.lock().clone()
    }

    /// Accepted commands without timestamps, oldest first
    pub fn settings(&self) -> Vec<(Target, Setting)> {
        self.lock().iter().map(|c| (c.target, c.setting)).collect()
    }

    /// Most recent command sent to `target`
    pub fn last(&self, target: Target) -> Option<Setting> {
        self.lock()
            .iter()
            .rev()
            .find(|c| c.target == target)
            .map(|c| c.setting)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[derive(Debug, Clone, Default)]
struct Faults(Arc<Mutex<BTreeSet<usize>>>);

impl Faults {
    fn lock(&self) -> MutexGuard<'_, BTreeSet<usize>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Opens `MockupDevice` handles
#[derive(Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct MockupConnector {
    identity: String,
    channels: usize,

    // Shared with every opened handle
    #[serde(skip)]
    log: CommandLog,
    #[serde(skip)]
    faults: Faults,
    #[serde(skip)]
    open_handles: Arc<AtomicUsize>,
}

impl Default for MockupConnector {
    fn default() -> Self {
        Self::new("FY3200S", FY3200S_CHANNELS)
    }
}

impl MockupConnector {
    pub fn new(identity: &str, channels: usize) -> Self {
        Self {
            identity: identity.to_owned(),
            channels,
            log: CommandLog::default(),
            faults: Faults::default(),
            open_handles: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle to the record of commands accepted by any device from this connector
    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }

    /// Make every subsequent write to a channel fail with an I/O error
    pub fn fail_channel(&self, number: usize) {
        self.faults.lock().insert(number);
    }

    /// Undo `fail_channel`
    pub fn heal_channel(&self, number: usize) {
        self.faults.lock().remove(&number);
    }

    /// Number of handles that have been opened and not yet closed
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    /// A connector sharing this one's log, faults, and handle count
    pub fn share(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            channels: self.channels,
            log: self.log.clone(),
            faults: self.faults.clone(),
            open_handles: Arc::clone(&self.open_handles),
        }
    }
}

#[typetag::serde]
impl Connector for MockupConnector {
    fn connect(&self, port: &str) -> Result<Box<dyn DeviceHandle>, DeviceError> {
        let closed = Arc::new(AtomicBool::new(false));
        let channels = (1..=self.channels)
            .map(|number| MockupChannel {
                number,
                log: self.log.clone(),
                faults: self.faults.clone(),
                closed: Arc::clone(&closed),
            })
            .collect();

        self.open_handles.fetch_add(1, Ordering::SeqCst);
        info!("Opened mockup {} on `{port}`", self.identity);

        Ok(Box::new(MockupDevice {
            identity: self.identity.clone(),
            channels,
            log: self.log.clone(),
            open_handles: Arc::clone(&self.open_handles),
            closed,
        }))
    }
}

#[derive(Debug)]
pub struct MockupDevice {
    identity: String,
    channels: Vec<MockupChannel>,
    log: CommandLog,
    open_handles: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

fn port_closed() -> DeviceError {
    io::Error::new(io::ErrorKind::NotConnected, "port is closed").into()
}

impl DeviceHandle for MockupDevice {
    fn identity(&mut self) -> Result<String, DeviceError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(port_closed());
        }
        Ok(self.identity.clone())
    }

    fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn channel(&mut self, number: usize) -> Option<&mut dyn DeviceChannel> {
        let slot = number.checked_sub(1)?;
        self.channels
            .get_mut(slot)
            .map(|ch| ch as &mut dyn DeviceChannel)
    }

    fn phase(&mut self, degrees: f64) -> Result<(), DeviceError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(port_closed());
        }
        self.log.push(Target::Instrument, Setting::Phase(degrees));
        Ok(())
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.open_handles.fetch_sub(1, Ordering::SeqCst);
            info!("Closed mockup {}", self.identity);
        }
        Ok(())
    }
}

#[derive(Debug)]
struct MockupChannel {
    number: usize,
    log: CommandLog,
    faults: Faults,
    closed: Arc<AtomicBool>,
}

impl MockupChannel {
    fn write(&mut self, setting: Setting) -> Result<(), DeviceError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(port_closed());
        }
        if self.faults.lock().contains(&self.number) {
            let msg = format!("write to channel {} failed", self.number);
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, msg).into());
        }

        self.log.push(Target::Channel(self.number), setting);
        Ok(())
    }
}

impl DeviceChannel for MockupChannel {
    fn enable_output(&mut self, on: bool) -> Result<(), DeviceError> {
        self.write(Setting::Output(on))
    }

    fn frequency(&mut self, centihertz: f64) -> Result<(), DeviceError> {
        self.write(Setting::Frequency(centihertz))
    }

    fn waveform(&mut self, kind: Waveform) -> Result<(), DeviceError> {
        self.write(Setting::Waveform(kind))
    }

    fn amplitude(&mut self, volts: f64) -> Result<(), DeviceError> {
        self.write(Setting::Amplitude(volts))
    }

    fn offset(&mut self, volts: f64) -> Result<(), DeviceError> {
        self.write(Setting::Offset(volts))
    }
}
