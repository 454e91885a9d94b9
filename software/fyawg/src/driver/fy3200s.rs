//! FeelTech FY3200S dual-channel function generator.
//!
//! Amplitude and offset are requested as the voltage the caller wants to see
//! across the load. The generator's 50 Ohm source impedance and the load form
//! a voltage divider, so each channel's request is divided by that channel's
//! divider coefficient before it is programmed. With a Hi-Z load the
//! coefficient is 1 and values are sent unchanged.

use std::time::Duration;

use tracing::{debug, info, warn};

use fyawg_shared::channels::{resolve, resolve_channel};
use fyawg_shared::phase::normalize_phase;
use fyawg_shared::{
    Channel, ChannelTable, FY3200S_BAUD_RATE, FY3200S_CHANNELS, FY3200S_TIMEOUT_MS, LoadImpedance,
    Waveform,
};

use super::Awg;
use crate::config::DriverConfig;
use crate::device::{Connector, DeviceChannel, DeviceError, DeviceHandle};
use crate::error::AwgError;

const N: usize = FY3200S_CHANNELS;

type Ch = Channel<N>;

/// FY3200S driver state for one instrument
#[derive(Debug)]
pub struct Fy3200s {
    // Connection settings. Baud rate and timeout are not used by the hardware.
    port: String,
    baud_rate: u32,
    timeout: Duration,
    force_sine: bool,

    connector: Box<dyn Connector>,
    device: Option<Box<dyn DeviceHandle>>,

    loads: ChannelTable<LoadImpedance, N>,
    output_on: ChannelTable<bool, N>,
}

impl Fy3200s {
    pub const SHORT_NAME: &'static str = "fy3200s";

    /// A disconnected driver with a 50 Ohm load assumed on every channel.
    pub fn new(port: &str, connector: Box<dyn Connector>) -> Self {
        Self {
            port: port.to_owned(),
            baud_rate: FY3200S_BAUD_RATE,
            timeout: Duration::from_millis(FY3200S_TIMEOUT_MS),
            force_sine: false,

            connector,
            device: None,

            loads: ChannelTable::default(),
            output_on: ChannelTable::splat(false),
        }
    }

    /// Build from a config, applying any configured loads.
    pub fn from_config(config: DriverConfig) -> Result<Self, AwgError> {
        if config.driver != Self::SHORT_NAME {
            return Err(AwgError::Config(format!(
                "driver `{}` cannot be built as {}",
                config.driver,
                Self::SHORT_NAME
            )));
        }
        if config.load_impedance.len() > N {
            return Err(AwgError::Config(format!(
                "{} load impedances given for {N} channels",
                config.load_impedance.len()
            )));
        }

        let mut awg = Self::new(&config.port, config.connector)
            .with_baud_rate(config.baud_rate)
            .with_timeout(Duration::from_millis(config.timeout_ms))
            .with_force_sine(config.force_sine);

        for (number, z) in (1..).zip(config.load_impedance) {
            awg.set_load_impedance(number, z)?;
        }

        Ok(awg)
    }

    pub(crate) fn boxed(config: DriverConfig) -> Result<Box<dyn Awg>, AwgError> {
        Ok(Box::new(Self::from_config(config)?))
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Program a sine wave whatever waveform is requested,
    /// as older revisions of this driver did.
    pub fn with_force_sine(mut self, force_sine: bool) -> Self {
        self.force_sine = force_sine;
        self
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    fn device(&mut self) -> Result<&mut (dyn DeviceHandle + 'static), AwgError> {
        self.device.as_deref_mut().ok_or(AwgError::NotConnected)
    }
}

/// Resolve `selector` and run `op` on each addressed channel, lowest first.
///
/// Stops at the first failure; channels already written stay written.
fn for_each_channel<F>(
    device: &mut Option<Box<dyn DeviceHandle>>,
    selector: i64,
    mut op: F,
) -> Result<(), AwgError>
where
    F: FnMut(Ch, &mut dyn DeviceChannel) -> Result<(), DeviceError>,
{
    let channels = resolve::<N>(Some(selector))?;
    let device = device.as_deref_mut().ok_or(AwgError::NotConnected)?;

    for ch in channels {
        let handle = device
            .channel(ch.number())
            .ok_or(DeviceError::NoSuchChannel(ch.number()))?;
        if let Err(e) = op(ch, handle) {
            warn!("Write to {ch} failed: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

impl Awg for Fy3200s {
    fn short_name(&self) -> &'static str {
        Self::SHORT_NAME
    }

    fn channel_count(&self) -> usize {
        N
    }

    fn initialize(&mut self) -> Result<(), AwgError> {
        self.output_on = ChannelTable::splat(false);
        self.connect()?;
        self.enable_output(0, false)
    }

    fn connect(&mut self) -> Result<(), AwgError> {
        if self.device.is_some() {
            self.disconnect()?;
        }

        info!(
            "Connecting to {} on `{}` ({} baud, timeout {:?}; both ignored by hardware)",
            Self::SHORT_NAME,
            self.port,
            self.baud_rate,
            self.timeout
        );
        let mut device = self.connector.connect(&self.port)?;

        let found = device.channel_count();
        if found != N {
            if let Err(e) = device.close() {
                warn!("Failed to close mismatched device on `{}`: {e}", self.port);
            }
            return Err(AwgError::ChannelCountMismatch { expected: N, found });
        }

        self.device = Some(device);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), AwgError> {
        self.output_on = ChannelTable::splat(false);
        if let Some(mut device) = self.device.take() {
            device.close()?;
            info!("Disconnected from `{}`", self.port);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.device.is_some()
    }

    fn get_id(&mut self) -> Result<String, AwgError> {
        Ok(self.device()?.identity()?)
    }

    fn enable_output(&mut self, selector: i64, on: bool) -> Result<(), AwgError> {
        for_each_channel(&mut self.device, selector, |ch, handle| {
            debug!("{ch} output {}", if on { "on" } else { "off" });
            handle.enable_output(on)?;
            self.output_on[ch] = on;
            Ok(())
        })
    }

    fn set_frequency(&mut self, selector: i64, centihertz: f64) -> Result<(), AwgError> {
        for_each_channel(&mut self.device, selector, |ch, handle| {
            debug!("{ch} frequency {centihertz} cHz");
            handle.frequency(centihertz)
        })
    }

    fn set_phase(&mut self, degrees: f64) -> Result<(), AwgError> {
        if !degrees.is_finite() {
            return Err(AwgError::InvalidValue {
                what: "phase",
                value: degrees,
            });
        }

        let phase = normalize_phase(degrees);
        debug!("Phase {degrees} deg, sending {phase} deg");
        Ok(self.device()?.phase(phase)?)
    }

    fn set_wave_type(&mut self, selector: i64, kind: Waveform) -> Result<(), AwgError> {
        let kind = if self.force_sine { Waveform::Sine } else { kind };
        for_each_channel(&mut self.device, selector, |ch, handle| {
            debug!("{ch} waveform {kind}");
            handle.waveform(kind)
        })
    }

    fn set_amplitude(&mut self, selector: i64, volts: f64) -> Result<(), AwgError> {
        let loads = self.loads;
        for_each_channel(&mut self.device, selector, |ch, handle| {
            let programmed = loads[ch].compensate(volts);
            debug!("{ch} amplitude {volts} V into {}, sending {programmed} V", loads[ch]);
            handle.amplitude(programmed)
        })
    }

    fn set_offset(&mut self, selector: i64, volts: f64) -> Result<(), AwgError> {
        let loads = self.loads;
        for_each_channel(&mut self.device, selector, |ch, handle| {
            let programmed = loads[ch].compensate(volts);
            debug!("{ch} offset {volts} V into {}, sending {programmed} V", loads[ch]);
            handle.offset(programmed)
        })
    }

    fn set_load_impedance(&mut self, channel: i64, z: LoadImpedance) -> Result<(), AwgError> {
        let ch = resolve_channel::<N>(Some(channel))?;
        let z = match z {
            LoadImpedance::Ohms(ohms) => LoadImpedance::ohms(ohms)?,
            LoadImpedance::HighZ => LoadImpedance::HighZ,
        };

        self.loads[ch] = z;
        debug!("{ch} load {z}, coefficient {}", z.coefficient());
        Ok(())
    }

    fn load_impedance(&self, channel: i64) -> Result<LoadImpedance, AwgError> {
        Ok(self.loads[resolve_channel::<N>(Some(channel))?])
    }

    fn coefficient(&self, channel: i64) -> Result<f64, AwgError> {
        Ok(self.load_impedance(channel)?.coefficient())
    }

    fn output_enabled(&self, channel: i64) -> Result<bool, AwgError> {
        Ok(self.output_on[resolve_channel::<N>(Some(channel))?])
    }
}

impl Drop for Fy3200s {
    fn drop(&mut self) {
        if let Some(mut device) = self.device.take()
            && let Err(e) = device.close()
        {
            warn!("Failed to close `{}` on drop: {e}", self.port);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{CommandLog, MockupConnector, Setting, Target};
    use approx::assert_relative_eq;

    /// Connected driver plus the mockup it talks to
    fn connected() -> (Fy3200s, MockupConnector) {
        let connector = MockupConnector::default();
        let mut awg = Fy3200s::new("/dev/ttyUSB0", Box::new(connector.share()));
        awg.connect().unwrap();
        (awg, connector)
    }

    fn last(log: &CommandLog, channel: usize) -> Option<Setting> {
        log.last(Target::Channel(channel))
    }

    fn amplitude(log: &CommandLog, channel: usize) -> f64 {
        match last(log, channel) {
            Some(Setting::Amplitude(v)) => v,
            other => panic!("expected amplitude on channel {channel}, got {other:?}"),
        }
    }

    #[test]
    fn default_load_is_fifty_ohms_on_every_channel() {
        let (awg, _) = connected();
        for ch in 1..=2 {
            assert_eq!(awg.load_impedance(ch).unwrap(), LoadImpedance::Ohms(50.0));
            assert_eq!(awg.coefficient(ch).unwrap(), 0.5);
        }
    }

    #[test]
    fn amplitude_is_compensated_per_load() {
        let (mut awg, mock) = connected();
        let log = mock.log();

        // 50 Ohm default: twice the requested voltage
        awg.set_amplitude(1, 1.0).unwrap();
        assert_eq!(amplitude(&log, 1), 2.0);

        // Hi-Z: no correction
        awg.set_load_impedance(1, LoadImpedance::HighZ).unwrap();
        assert_eq!(awg.coefficient(1).unwrap(), 1.0);
        awg.set_amplitude(1, 1.0).unwrap();
        assert_eq!(amplitude(&log, 1), 1.0);

        // Channel 2 is untouched throughout
        assert_eq!(awg.coefficient(2).unwrap(), 0.5);
        assert_eq!(last(&log, 2), None);
    }

    #[test]
    fn arbitrary_load_scales_by_inverse_coefficient() {
        let (mut awg, mock) = connected();
        awg.set_load_impedance(2, LoadImpedance::Ohms(600.0)).unwrap();

        let c = awg.coefficient(2).unwrap();
        assert_relative_eq!(c, 600.0 / 650.0);

        awg.set_amplitude(2, 0.3).unwrap();
        assert_relative_eq!(amplitude(&mock.log(), 2), 0.3 / c);
    }

    #[test]
    fn all_channels_use_their_own_coefficient() {
        let (mut awg, mock) = connected();
        awg.set_load_impedance(2, LoadImpedance::HighZ).unwrap();
        awg.set_offset(0, -0.5).unwrap();

        assert_eq!(
            mock.log().settings(),
            vec![
                (Target::Channel(1), Setting::Offset(-1.0)),
                (Target::Channel(2), Setting::Offset(-0.5)),
            ]
        );
    }

    #[test]
    fn selector_zero_writes_lowest_channel_first() {
        let (mut awg, mock) = connected();
        awg.set_frequency(0, 100_000.0).unwrap();
        awg.set_wave_type(0, Waveform::Triangle).unwrap();

        assert_eq!(
            mock.log().settings(),
            vec![
                (Target::Channel(1), Setting::Frequency(100_000.0)),
                (Target::Channel(2), Setting::Frequency(100_000.0)),
                (Target::Channel(1), Setting::Waveform(Waveform::Triangle)),
                (Target::Channel(2), Setting::Waveform(Waveform::Triangle)),
            ]
        );
    }

    #[test]
    fn specific_selector_writes_one_channel() {
        let (mut awg, mock) = connected();
        awg.set_frequency(2, 100.0).unwrap();

        assert_eq!(
            mock.log().settings(),
            vec![(Target::Channel(2), Setting::Frequency(100.0))]
        );
    }

    #[test]
    fn invalid_selector_is_rejected_by_every_command() {
        let (mut awg, mock) = connected();

        for s in [-1, 3, 42] {
            let results = [
                awg.enable_output(s, true),
                awg.set_frequency(s, 100.0),
                awg.set_wave_type(s, Waveform::Sine),
                awg.set_amplitude(s, 1.0),
                awg.set_offset(s, 0.0),
                awg.set_load_impedance(s, LoadImpedance::HighZ),
            ];
            for r in results {
                assert!(matches!(r, Err(AwgError::InvalidChannel(_))), "{s}: {r:?}");
            }
        }
        assert!(mock.log().is_empty());
    }

    #[test]
    fn load_impedance_needs_a_specific_channel() {
        let (mut awg, _) = connected();
        let err = awg.set_load_impedance(0, LoadImpedance::HighZ).unwrap_err();
        assert!(matches!(err, AwgError::InvalidChannel(_)));
        assert_eq!(err.to_string(), "invalid channel 0: channel must be in 1..2");
        assert_eq!(awg.coefficient(1).unwrap(), 0.5);
        assert_eq!(awg.coefficient(2).unwrap(), 0.5);
    }

    #[test]
    fn non_physical_load_is_rejected_and_ignored() {
        let (mut awg, _) = connected();
        let err = awg.set_load_impedance(1, LoadImpedance::Ohms(-5.0)).unwrap_err();
        assert!(matches!(err, AwgError::InvalidImpedance(_)));
        assert_eq!(awg.load_impedance(1).unwrap(), LoadImpedance::Ohms(50.0));
    }

    #[test]
    fn load_impedance_works_while_disconnected() {
        let mut awg = Fy3200s::new("mock", Box::new(MockupConnector::default()));
        awg.set_load_impedance(1, LoadImpedance::HighZ).unwrap();
        assert_eq!(awg.coefficient(1).unwrap(), 1.0);
    }

    #[test]
    fn negative_phase_is_wrapped() {
        let (mut awg, mock) = connected();
        let log = mock.log();

        for (requested, sent) in [(-30.0, 330.0), (-370.0, 350.0), (400.0, 400.0), (90.0, 90.0)] {
            awg.set_phase(requested).unwrap();
            assert_eq!(log.last(Target::Instrument), Some(Setting::Phase(sent)));
        }
    }

    #[test]
    fn non_finite_phase_is_rejected() {
        let (mut awg, mock) = connected();
        for phase in [f64::NAN, f64::NEG_INFINITY, f64::INFINITY] {
            assert!(matches!(
                awg.set_phase(phase),
                Err(AwgError::InvalidValue { what: "phase", .. })
            ));
        }
        assert!(mock.log().is_empty());
    }

    #[test]
    fn waveform_is_threaded_through_unless_forced() {
        let (mut awg, mock) = connected();
        awg.set_wave_type(1, Waveform::Square).unwrap();
        assert_eq!(
            mock.log().last(Target::Channel(1)),
            Some(Setting::Waveform(Waveform::Square))
        );

        let connector = MockupConnector::default();
        let mut forced = Fy3200s::new("mock", Box::new(connector.share())).with_force_sine(true);
        forced.connect().unwrap();
        forced.set_wave_type(1, Waveform::Square).unwrap();
        assert_eq!(
            connector.log().last(Target::Channel(1)),
            Some(Setting::Waveform(Waveform::Sine))
        );
    }

    #[test]
    fn commands_need_a_connection() {
        let mut awg = Fy3200s::new("mock", Box::new(MockupConnector::default()));
        assert!(matches!(awg.set_amplitude(1, 1.0), Err(AwgError::NotConnected)));
        assert!(matches!(awg.set_phase(10.0), Err(AwgError::NotConnected)));
        assert!(matches!(awg.get_id(), Err(AwgError::NotConnected)));
    }

    #[test]
    fn failure_on_later_channel_keeps_earlier_write() {
        let (mut awg, mock) = connected();
        mock.fail_channel(2);

        let err = awg.set_amplitude(0, 0.5).unwrap_err();
        assert!(matches!(err, AwgError::Transport(DeviceError::Io(_))));
        assert_eq!(
            mock.log().settings(),
            vec![(Target::Channel(1), Setting::Amplitude(1.0))]
        );
    }

    #[test]
    fn initialize_switches_outputs_off() {
        let connector = MockupConnector::default();
        let mut awg = Fy3200s::new("mock", Box::new(connector.share()));
        awg.initialize().unwrap();

        assert!(awg.is_connected());
        assert_eq!(
            connector.log().settings(),
            vec![
                (Target::Channel(1), Setting::Output(false)),
                (Target::Channel(2), Setting::Output(false)),
            ]
        );

        awg.enable_output(2, true).unwrap();
        assert!(!awg.output_enabled(1).unwrap());
        assert!(awg.output_enabled(2).unwrap());
    }

    #[test]
    fn output_state_only_records_successful_writes() {
        let (mut awg, mock) = connected();
        mock.fail_channel(2);

        assert!(awg.enable_output(0, true).is_err());
        assert!(awg.output_enabled(1).unwrap());
        assert!(!awg.output_enabled(2).unwrap());
    }

    #[test]
    fn disconnect_releases_the_handle() {
        let (mut awg, mock) = connected();
        awg.enable_output(1, true).unwrap();
        assert_eq!(mock.open_handles(), 1);

        awg.disconnect().unwrap();
        assert_eq!(mock.open_handles(), 0);
        assert!(!awg.is_connected());
        assert!(!awg.output_enabled(1).unwrap());

        // Second disconnect is a no-op
        awg.disconnect().unwrap();
    }

    #[test]
    fn reconnect_closes_previous_handle() {
        let (mut awg, mock) = connected();
        awg.connect().unwrap();
        assert_eq!(mock.open_handles(), 1);
    }

    #[test]
    fn drop_releases_the_handle() {
        let (awg, mock) = connected();
        drop(awg);
        assert_eq!(mock.open_handles(), 0);
    }

    #[test]
    fn wrong_channel_count_is_refused() {
        let connector = MockupConnector::new("FY6900", 3);
        let mut awg = Fy3200s::new("mock", Box::new(connector.share()));

        let err = awg.connect().unwrap_err();
        assert!(matches!(
            err,
            AwgError::ChannelCountMismatch {
                expected: 2,
                found: 3
            }
        ));
        assert!(!awg.is_connected());
        assert_eq!(connector.open_handles(), 0);
    }

    #[test]
    fn config_loads_are_applied() {
        let mut config = DriverConfig::new("mock", Box::new(MockupConnector::default()));
        config.load_impedance = vec![LoadImpedance::HighZ, LoadImpedance::Ohms(75.0)];

        let awg = Fy3200s::from_config(config).unwrap();
        assert_eq!(awg.coefficient(1).unwrap(), 1.0);
        assert_relative_eq!(awg.coefficient(2).unwrap(), 0.6);
    }

    #[test]
    fn config_with_too_many_loads_is_refused() {
        let mut config = DriverConfig::new("mock", Box::new(MockupConnector::default()));
        config.load_impedance = vec![LoadImpedance::HighZ; 3];

        assert!(matches!(
            Fy3200s::from_config(config),
            Err(AwgError::Config(_))
        ));
    }
}
