//! Frequency hopper implementation.

use crate::config::HopperConfig;
use crate::error::{ConfigError, HopError};
use crate::lcg::Lcg;
use crate::timer::{OutputTimer, TimerSetting};
use crate::transport::Transport;
use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// The frequency hopper. This struct encapsulates the hop sequence generator together with
/// the hardware it drives.
///
/// One [`hop()`](#method.hop) picks the next frequency from the generator, programs the
/// output timer, reports the frequency over the link and then holds the status line high for
/// the dwell time and low for the gap time.
///
/// The sequence only depends on the seed. A receiver seeded the same way follows the same
/// hops, and so does anybody else who knows the seed.
///
/// # Examples
/// ```ignore
/// let config = HopperConfig::default().seed(0xC0FFEE);
/// let mut hopper = FrequencyHopper::new(tim2, led, delay, config)?;
/// loop {
///     let frequency = hopper.hop(&mut uart)?;
/// }
/// ```
#[derive(Debug)]
pub struct FrequencyHopper<TIM, P, D> {
    timer: TIM,
    // Status indicator, high during the dwell window
    status: P,
    delay: D,
    lcg: Lcg,
    config: HopperConfig,
    current: Option<u64>,
}

impl<TIM, P, D, TimerErr, PinErr> FrequencyHopper<TIM, P, D>
where
    TIM: OutputTimer<Error = TimerErr>,
    P: OutputPin<Error = PinErr>,
    D: DelayNs,
{
    /// Creates a new hopper with given config.
    ///
    /// Fails if the output stage cannot produce both edges of the configured band inside the
    /// band and within the tolerance, so an impossible setup is caught at startup instead of
    /// on the first hop. No hardware is touched here.
    pub fn new(timer: TIM, status: P, delay: D, config: HopperConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(FrequencyHopper {
            timer,
            status,
            delay,
            lcg: Lcg::new(config.seed),
            config,
            current: None,
        })
    }

    /// Advances the generator and returns its raw output.
    pub fn next_lcg_value(&mut self) -> u32 {
        self.lcg.next_value()
    }

    /// Advances the generator and maps its output into the hop band.
    ///
    /// # Examples
    /// ```ignore
    /// let mut hopper = FrequencyHopper::new(timer, led, delay, HopperConfig::default())?;
    /// // 300 MHz + (48271 * 123456789 mod (2^31 - 1))
    /// assert_eq!(hopper.next_frequency(), 415_541_394);
    /// ```
    pub fn next_frequency(&mut self) -> u64 {
        let raw = self.next_lcg_value();
        self.config.band.map(raw)
    }

    /// Programs the output timer for `frequency` and starts it.
    ///
    /// The timer is left untouched if the frequency is outside the band or cannot be
    /// produced with the configured clock and synthesizer, see
    /// [`HopperConfig::timer_setting()`].
    pub fn program_output(
        &mut self,
        frequency: u64,
    ) -> Result<TimerSetting, HopError<TimerErr, Infallible, PinErr>> {
        let setting = self.config.timer_setting(frequency).map_err(|e| {
            error!("frequency {} Hz unachievable", frequency);
            HopError::Unachievable(e)
        })?;
        self.timer.program(setting).map_err(HopError::Timer)?;
        self.current = Some(frequency);
        trace!(
            "timer programmed: psc {} arr {}",
            setting.prescaler(),
            setting.reload()
        );
        Ok(setting)
    }

    /// Performs one hop and returns the new frequency.
    ///
    /// The frequency is reported over `link` as a raw 8 byte little-endian integer.
    pub fn hop<T: Transport>(
        &mut self,
        link: &mut T,
    ) -> Result<u64, HopError<TimerErr, T::Error, PinErr>> {
        let frequency = self.next_frequency();
        self.program_output(frequency).map_err(HopError::widen)?;
        link.send(&frequency.to_le_bytes()).map_err(|e| {
            error!("failed to report {} Hz", frequency);
            HopError::Serial(e)
        })?;
        debug!("hopped to {} Hz", frequency);

        self.status.set_high().map_err(|e| {
            error!("status line stuck low");
            HopError::Pin(e)
        })?;
        self.delay.delay_ms(self.config.dwell_ms);
        self.status.set_low().map_err(|e| {
            error!("status line stuck high");
            HopError::Pin(e)
        })?;
        self.delay.delay_ms(self.config.gap_ms);

        Ok(frequency)
    }

    /// Stops the output timer and turns the status line off.
    pub fn stop(&mut self) -> Result<(), HopError<TimerErr, Infallible, PinErr>> {
        self.timer.disable().map_err(HopError::Timer)?;
        self.status.set_low().map_err(HopError::Pin)?;
        self.current = None;
        Ok(())
    }

    /// Frequency the output is currently programmed to.
    pub fn current_frequency(&self) -> Option<u64> {
        self.current
    }

    /// Hopper configuration.
    pub fn config(&self) -> &HopperConfig {
        &self.config
    }

    /// Returns the timer, status pin and delay.
    pub fn release(self) -> (TIM, P, D) {
        (self.timer, self.status, self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FrequencyBand;
    use crate::error::TimerError;
    use crate::lcg::Lcg;
    use crate::transport::tests::ScriptedLink;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use embedded_hal_mock::eh1::MockError;
    use std::io::ErrorKind;

    #[derive(Debug, Default)]
    struct RecordingTimer {
        settings: Vec<TimerSetting>,
        running: bool,
    }

    impl OutputTimer for RecordingTimer {
        type Error = Infallible;

        fn program(&mut self, setting: TimerSetting) -> Result<(), Infallible> {
            self.settings.push(setting);
            self.running = true;
            Ok(())
        }

        fn disable(&mut self) -> Result<(), Infallible> {
            self.running = false;
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct CountingDelay {
        ms: Vec<u32>,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, _ns: u32) {}

        fn delay_ms(&mut self, ms: u32) {
            self.ms.push(ms);
        }
    }

    fn blink(hops: usize) -> Vec<PinTransaction> {
        (0..hops)
            .flat_map(|_| {
                [
                    PinTransaction::set(PinState::High),
                    PinTransaction::set(PinState::Low),
                ]
            })
            .collect()
    }

    fn hopper(config: HopperConfig) -> FrequencyHopper<RecordingTimer, PinMock, NoopDelay> {
        FrequencyHopper::new(
            RecordingTimer::default(),
            PinMock::new(&[]),
            NoopDelay,
            config,
        )
        .unwrap()
    }

    fn done(h: FrequencyHopper<RecordingTimer, PinMock, NoopDelay>) {
        let (_, mut pin, _) = h.release();
        pin.done();
    }

    #[test]
    fn first_frequency_from_default_seed() {
        let mut h = hopper(HopperConfig::default());
        let raw = (48_271u64 * 123_456_789) % 2_147_483_647;
        assert_eq!(h.next_frequency(), 300_000_000 + raw);
        assert_eq!(raw, 115_541_394);
        done(h);
    }

    #[test]
    fn same_seed_same_hops() {
        let mut a = hopper(HopperConfig::default().seed(7));
        let mut b = hopper(HopperConfig::default().seed(7));
        let hops_a: Vec<u8> = (0..500)
            .flat_map(|_| a.next_frequency().to_le_bytes())
            .collect();
        let hops_b: Vec<u8> = (0..500)
            .flat_map(|_| b.next_frequency().to_le_bytes())
            .collect();
        assert_eq!(hops_a, hops_b);
        done(a);
        done(b);
    }

    #[test]
    fn frequencies_stay_in_band_without_wrapping() {
        let mut h = hopper(HopperConfig::default());
        let mut reference = Lcg::default();
        for _ in 0..10_000 {
            let f = h.next_frequency();
            assert!((300_000_000..=5_799_999_999).contains(&f));
            // The band is wider than any generator output, nothing may be folded back.
            assert_eq!(f, 300_000_000 + u64::from(reference.next_value()));
        }
        done(h);
    }

    #[test]
    fn band_wider_than_32_bits() {
        // With 32-bit arithmetic the width wraps to 1_205_032_704 and this lands at
        // 1_094_967_296 Hz.
        let band = FrequencyBand::default();
        assert_eq!(band.map(2_000_000_000), 2_300_000_000);
    }

    #[test]
    fn hop_programs_reports_and_blinks() {
        let pin = PinMock::new(&blink(3));
        let mut h = FrequencyHopper::new(
            RecordingTimer::default(),
            pin,
            CountingDelay::default(),
            HopperConfig::default().dwell_ms(30).gap_ms(20),
        )
        .unwrap();
        let mut link = ScriptedLink::default();

        let hops: Vec<u64> = (0..3).map(|_| h.hop(&mut link).unwrap()).collect();
        assert_eq!(h.current_frequency(), Some(hops[2]));

        let (timer, mut pin, delay) = h.release();
        pin.done();
        assert_eq!(timer.settings.len(), 3);
        assert!(timer.running);
        assert_eq!(delay.ms, [30, 20, 30, 20, 30, 20]);

        let reported: Vec<u64> = link
            .sent
            .iter()
            .map(|b| u64::from_le_bytes(b.as_slice().try_into().unwrap()))
            .collect();
        assert_eq!(reported, hops);
    }

    #[test]
    fn program_output_matches_timer_math() {
        let mut h = hopper(HopperConfig::default());
        let setting = h.program_output(2_400_000_000).unwrap();
        // 2.4 GHz / 100_000 = 24 kHz reference from an 84 MHz timer clock.
        assert_eq!(setting.prescaler(), 0);
        assert_eq!(setting.reload(), 3499);
        assert_eq!(h.current_frequency(), Some(2_400_000_000));
        done(h);
    }

    #[test]
    fn unachievable_frequency_is_rejected() {
        let mut h = hopper(HopperConfig::default());
        assert!(matches!(
            h.program_output(6_000_000_000),
            Err(HopError::Unachievable(TimerError::OutOfBand))
        ));
        assert!(matches!(
            h.program_output(0),
            Err(HopError::Unachievable(TimerError::OutOfBand))
        ));

        let (timer, mut pin, _) = h.release();
        pin.done();
        assert!(timer.settings.is_empty());
    }

    #[test]
    fn unreachable_band_fails_at_startup() {
        // Direct drive from the timer clock cannot reach the band at all.
        let config = HopperConfig::default().synth_multiplier(1);
        let mut pin = PinMock::new(&[]);
        let result = FrequencyHopper::new(RecordingTimer::default(), pin.clone(), NoopDelay, config);
        let err = result.map(|_| ()).unwrap_err();
        assert_eq!(err, ConfigError::UnreachableBand(TimerError::FrequencyTooHigh));
        pin.done();
    }

    #[test]
    fn stop_disables_output() {
        let pin = PinMock::new(&[PinTransaction::set(PinState::Low)]);
        let mut h = FrequencyHopper::new(
            RecordingTimer::default(),
            pin,
            NoopDelay,
            HopperConfig::default(),
        )
        .unwrap();
        h.program_output(1_000_000_000).unwrap();
        h.stop().unwrap();
        assert_eq!(h.current_frequency(), None);

        let (timer, mut pin, _) = h.release();
        pin.done();
        assert!(!timer.running);
    }

    #[test]
    fn top_of_band_stays_in_band() {
        let mut h = hopper(HopperConfig::default());
        let setting = h.program_output(5_799_999_999).unwrap();
        let config = h.config();
        let synthesized = setting.synthesized_hz(config.timer_clock_hz, config.synth_multiplier);
        assert_eq!(synthesized, 5_797_101_449);
        assert!(config.frequency_band().contains(synthesized));
        done(h);
    }

    #[test]
    fn imprecise_frequency_leaves_timer_alone() {
        // Both edges come out exact, 415_541_394 Hz is 20 ppm off at best.
        let band = FrequencyBand::new(300_000_000, 1_000_000_001).unwrap();
        let mut h = hopper(HopperConfig::default().band(band).tolerance_ppm(0));
        assert!(matches!(
            h.program_output(415_541_394),
            Err(HopError::Unachievable(TimerError::Imprecise))
        ));
        assert_eq!(h.current_frequency(), None);

        let (timer, mut pin, _) = h.release();
        pin.done();
        assert!(timer.settings.is_empty());
    }

    struct DeadLink;

    impl Transport for DeadLink {
        type Error = &'static str;

        fn send(&mut self, _: &[u8]) -> Result<(), Self::Error> {
            Err("uart fault")
        }

        fn receive(&mut self, _: u32) -> Result<Option<u8>, Self::Error> {
            unreachable!()
        }
    }

    #[test]
    fn report_failure_skips_dwell() {
        let mut h = FrequencyHopper::new(
            RecordingTimer::default(),
            PinMock::new(&[]),
            CountingDelay::default(),
            HopperConfig::default(),
        )
        .unwrap();
        assert_eq!(h.hop(&mut DeadLink), Err(HopError::Serial("uart fault")));

        let (timer, mut pin, delay) = h.release();
        pin.done();
        // The output was already retuned when the report failed.
        assert_eq!(timer.settings.len(), 1);
        assert!(delay.ms.is_empty());
    }

    #[test]
    fn status_pin_failure_is_returned() {
        let fault = MockError::Io(ErrorKind::NotConnected);
        let pin = PinMock::new(&[PinTransaction::set(PinState::High).with_error(fault.clone())]);
        let mut h = FrequencyHopper::new(
            RecordingTimer::default(),
            pin,
            CountingDelay::default(),
            HopperConfig::default(),
        )
        .unwrap();
        let mut link = ScriptedLink::default();
        assert_eq!(h.hop(&mut link), Err(HopError::Pin(fault)));

        let (_, mut pin, delay) = h.release();
        pin.done();
        assert_eq!(link.sent.len(), 1);
        assert!(delay.ms.is_empty());
    }
}
