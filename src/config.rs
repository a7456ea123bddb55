//! Different structs and values for configuration of the link, the hopper and the platform.

use crate::error::{ConfigError, TimerError};
use crate::lcg::DEFAULT_SEED;
use crate::timer::{TimerLimits, TimerSetting};

/// Configuration of the DSSS acknowledgment handshake.
///
/// # Examples
/// ```rust
/// use spread_hop::config::LinkConfig;
///
/// let config = LinkConfig::default().ack_timeout_ms(250).max_retries(3);
/// assert_eq!(config.max_attempts(), 4);
/// ```
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkConfig {
    pub(crate) ack_timeout_ms: u32,
    pub(crate) max_retries: u8,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: 1000,
            max_retries: 5,
        }
    }
}

impl LinkConfig {
    /// Time to wait for the acknowledgment byte after every frame.
    pub fn ack_timeout_ms(mut self, timeout: u32) -> Self {
        self.ack_timeout_ms = timeout;
        self
    }

    /// Number of retransmissions after the first attempt before giving up.
    pub fn max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    /// Total number of times a frame may be sent, the first attempt included.
    pub fn max_attempts(&self) -> u16 {
        u16::from(self.max_retries) + 1
    }

    /// Acknowledgment timeout in milliseconds.
    pub fn timeout(&self) -> u32 {
        self.ack_timeout_ms
    }
}

/// Range of RF frequencies the hopper picks from.
///
/// `low` is inclusive, `high` exclusive.
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrequencyBand {
    low: u64,
    high: u64,
}

impl FrequencyBand {
    /// 300 MHz up to 5.8 GHz.
    pub const UHF_TO_C: FrequencyBand = FrequencyBand {
        low: 300_000_000,
        high: 5_800_000_000,
    };

    /// Creates a band from `low` (inclusive) to `high` (exclusive), in Hz.
    pub fn new(low: u64, high: u64) -> Result<Self, ConfigError> {
        if high <= low {
            return Err(ConfigError::EmptyBand);
        }
        Ok(FrequencyBand { low, high })
    }

    /// Lowest frequency of the band.
    pub fn low(&self) -> u64 {
        self.low
    }

    /// Highest frequency of the band.
    pub fn high(&self) -> u64 {
        self.high - 1
    }

    /// Width of the band in Hz.
    pub fn width(&self) -> u64 {
        self.high - self.low
    }

    /// Returns `true` if `frequency` lies inside the band.
    pub fn contains(&self, frequency: u64) -> bool {
        (self.low..self.high).contains(&frequency)
    }

    /// Maps a raw generator value into the band: `low + raw mod width`.
    ///
    /// The width does not fit in 32 bits for the default band, so this is done in `u64`.
    pub fn map(&self, raw: u32) -> u64 {
        self.low + u64::from(raw) % self.width()
    }
}

impl Default for FrequencyBand {
    fn default() -> Self {
        Self::UHF_TO_C
    }
}

/// Configuration of the frequency hopper.
///
/// The output stage is a timer feeding an external synthesizer. The timer period is a whole
/// number of clock ticks, so every hop frequency is only approximated; a hop is refused when
/// the synthesized frequency leaves the band or misses the requested one by more than
/// `tolerance_ppm`.
///
/// # Examples
/// ```rust
/// use spread_hop::config::HopperConfig;
///
/// let config = HopperConfig::default().seed(42).dwell_ms(20).gap_ms(20);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HopperConfig {
    pub(crate) seed: u32,
    pub(crate) band: FrequencyBand,
    pub(crate) dwell_ms: u32,
    pub(crate) gap_ms: u32,
    pub(crate) timer_clock_hz: u32,
    pub(crate) synth_multiplier: u32,
    pub(crate) timer_limits: TimerLimits,
    pub(crate) tolerance_ppm: u32,
}

impl Default for HopperConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            band: FrequencyBand::default(),
            dwell_ms: 100,
            gap_ms: 100,
            // TIM2 sits on APB1, see `ClockConfig::apb1_timer_hz`.
            timer_clock_hz: 84_000_000,
            // 3 kHz to 58 kHz reference, at least 1448 ticks per period.
            synth_multiplier: 100_000,
            timer_limits: TimerLimits::TIMER_32,
            tolerance_ppm: 1000,
        }
    }
}

impl HopperConfig {
    /// Seed of the hop sequence.
    pub fn seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    /// Band the frequencies are drawn from.
    pub fn band(mut self, band: FrequencyBand) -> Self {
        self.band = band;
        self
    }

    /// Time the status line stays high after a hop.
    pub fn dwell_ms(mut self, dwell: u32) -> Self {
        self.dwell_ms = dwell;
        self
    }

    /// Time the status line stays low before the next hop.
    pub fn gap_ms(mut self, gap: u32) -> Self {
        self.gap_ms = gap;
        self
    }

    /// Input clock of the output timer.
    pub fn timer_clock_hz(mut self, clock: u32) -> Self {
        self.timer_clock_hz = clock;
        self
    }

    /// Multiplication factor of the external synthesizer. 1 means the timer output is used
    /// directly. A value of 0 is treated as 1.
    pub fn synth_multiplier(mut self, multiplier: u32) -> Self {
        self.synth_multiplier = multiplier.max(1);
        self
    }

    /// Register widths of the output timer.
    pub fn timer_limits(mut self, limits: TimerLimits) -> Self {
        self.timer_limits = limits;
        self
    }

    /// Largest accepted distance between a hop frequency and the frequency actually
    /// synthesized, in parts per million.
    pub fn tolerance_ppm(mut self, tolerance: u32) -> Self {
        self.tolerance_ppm = tolerance;
        self
    }

    /// Returns the configured band.
    pub fn frequency_band(&self) -> FrequencyBand {
        self.band
    }

    /// Computes the timer setting for `frequency` with this configuration.
    ///
    /// Of the two periods around the exact one, the closer one whose synthesized frequency
    /// stays in the band is picked. Fails with [`TimerError::OutOfBand`] if `frequency` or
    /// every candidate output lies outside the band, and with [`TimerError::Imprecise`] if
    /// no candidate is within the tolerance.
    pub fn timer_setting(&self, frequency: u64) -> Result<TimerSetting, TimerError> {
        if !self.band.contains(frequency) {
            return Err(TimerError::OutOfBand);
        }
        if frequency == 0 {
            return Err(TimerError::ZeroFrequency);
        }
        let clock = self.timer_clock_hz;
        let multiplier = self.synth_multiplier;
        let deviation = |s: &TimerSetting| s.deviation_ppm(clock, multiplier, frequency);
        let shorter = u64::from(clock) * u64::from(multiplier) / frequency;

        let mut best = Err(TimerError::OutOfBand);
        // The shorter period runs at or above `frequency`, the longer one at or below.
        for ticks in [shorter, shorter + 1] {
            let candidate = TimerSetting::from_ticks(ticks, self.timer_limits).and_then(|s| {
                if !self.band.contains(s.synthesized_hz(clock, multiplier)) {
                    Err(TimerError::OutOfBand)
                } else if deviation(&s) > u64::from(self.tolerance_ppm) {
                    Err(TimerError::Imprecise)
                } else {
                    Ok(s)
                }
            });
            best = match (best, candidate) {
                (Ok(a), Ok(b)) => Ok(if deviation(&b) < deviation(&a) { b } else { a }),
                (Ok(a), Err(_)) => Ok(a),
                (Err(TimerError::Imprecise), Err(_)) => Err(TimerError::Imprecise),
                (Err(_), candidate) => candidate,
            };
        }
        best
    }

    /// Checks that both band edges can be produced by the output timer within the band and
    /// the tolerance.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timer_setting(self.band.low())
            .and(self.timer_setting(self.band.high()))
            .map(|_| ())
            .map_err(ConfigError::UnreachableBand)
    }
}

/// Clock tree of an STM32F4 class device: HSE crystal through the main PLL.
///
/// Defaults give a 168 MHz system clock from an 8 MHz crystal.
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    pub(crate) hse_hz: u32,
    pub(crate) pll_m: u32,
    pub(crate) pll_n: u32,
    pub(crate) pll_p: u32,
    pub(crate) pll_q: u32,
    pub(crate) ahb_div: u32,
    pub(crate) apb1_div: u32,
    pub(crate) apb2_div: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            hse_hz: 8_000_000,
            pll_m: 8,
            pll_n: 336,
            pll_p: 2,
            pll_q: 7,
            ahb_div: 1,
            apb1_div: 4,
            apb2_div: 2,
        }
    }
}

impl ClockConfig {
    const MAX_SYSCLK: u32 = 168_000_000;
    const MAX_PCLK1: u32 = 42_000_000;
    const MAX_PCLK2: u32 = 84_000_000;

    /// Frequency of the external crystal.
    pub fn hse_hz(mut self, hse: u32) -> Self {
        self.hse_hz = hse;
        self
    }

    /// PLL input divider, multiplier and output dividers.
    pub fn pll(mut self, m: u32, n: u32, p: u32, q: u32) -> Self {
        self.pll_m = m;
        self.pll_n = n;
        self.pll_p = p;
        self.pll_q = q;
        self
    }

    /// AHB, APB1 and APB2 prescalers.
    pub fn bus_dividers(mut self, ahb: u32, apb1: u32, apb2: u32) -> Self {
        self.ahb_div = ahb;
        self.apb1_div = apb1;
        self.apb2_div = apb2;
        self
    }

    /// PLL input divider.
    pub fn m(&self) -> u32 {
        self.pll_m
    }

    /// PLL multiplier.
    pub fn n(&self) -> u32 {
        self.pll_n
    }

    /// PLL system clock divider.
    pub fn p(&self) -> u32 {
        self.pll_p
    }

    /// PLL 48 MHz domain divider.
    pub fn q(&self) -> u32 {
        self.pll_q
    }

    /// VCO output frequency.
    pub fn vco_hz(&self) -> u64 {
        u64::from(self.hse_hz) / u64::from(self.pll_m.max(1)) * u64::from(self.pll_n)
    }

    /// System clock.
    pub fn sysclk_hz(&self) -> u32 {
        (self.vco_hz() / u64::from(self.pll_p.max(1))) as u32
    }

    /// AHB clock.
    pub fn hclk_hz(&self) -> u32 {
        self.sysclk_hz() / self.ahb_div.max(1)
    }

    /// APB1 peripheral clock, feeds USART2.
    pub fn pclk1_hz(&self) -> u32 {
        self.hclk_hz() / self.apb1_div.max(1)
    }

    /// APB2 peripheral clock.
    pub fn pclk2_hz(&self) -> u32 {
        self.hclk_hz() / self.apb2_div.max(1)
    }

    /// Clock of the timers on APB1. Doubled whenever the APB1 prescaler is not 1.
    pub fn apb1_timer_hz(&self) -> u32 {
        if self.apb1_div == 1 {
            self.pclk1_hz()
        } else {
            self.pclk1_hz() * 2
        }
    }

    /// Checks the PLL factors and resulting clocks against the device limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(2..=63).contains(&self.pll_m)
            || !(50..=432).contains(&self.pll_n)
            || ![2, 4, 6, 8].contains(&self.pll_p)
            || !(2..=15).contains(&self.pll_q)
            || ![1, 2, 4, 8, 16, 64, 128, 256, 512].contains(&self.ahb_div)
            || ![1, 2, 4, 8, 16].contains(&self.apb1_div)
            || ![1, 2, 4, 8, 16].contains(&self.apb2_div)
        {
            return Err(ConfigError::PllOutOfRange);
        }
        let vco_in = self.hse_hz / self.pll_m;
        if !(1_000_000..=2_000_000).contains(&vco_in) {
            return Err(ConfigError::PllOutOfRange);
        }
        if !(100_000_000..=432_000_000).contains(&self.vco_hz()) {
            return Err(ConfigError::PllOutOfRange);
        }
        if self.sysclk_hz() > Self::MAX_SYSCLK
            || self.pclk1_hz() > Self::MAX_PCLK1
            || self.pclk2_hz() > Self::MAX_PCLK2
        {
            return Err(ConfigError::ClockTooFast);
        }
        Ok(())
    }
}

/// Number of stop bits.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    /// 1 stop bit
    One,
    /// 2 stop bits
    Two,
}

/// Parity mode.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    /// No parity bit
    None,
    /// Even parity
    Even,
    /// Odd parity
    Odd,
}

/// Serial line settings, 9600 8N1 without flow control by default.
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    pub(crate) baud_rate: u32,
    pub(crate) stop_bits: StopBits,
    pub(crate) parity: Parity,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            stop_bits: StopBits::One,
            parity: Parity::None,
        }
    }
}

impl UartConfig {
    /// Baud rate.
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Number of stop bits.
    pub fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    /// Parity mode.
    pub fn parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Returns the configured baud rate.
    pub fn baud(&self) -> u32 {
        self.baud_rate
    }

    /// Baud rate register value for 16x oversampling, rounded to the nearest divider.
    ///
    /// # Examples
    /// ```rust
    /// use spread_hop::config::UartConfig;
    ///
    /// // 42 MHz APB1 clock.
    /// assert_eq!(UartConfig::default().brr(42_000_000), Ok(4375));
    /// ```
    pub fn brr(&self, pclk_hz: u32) -> Result<u16, ConfigError> {
        if self.baud_rate == 0 {
            return Err(ConfigError::InvalidBaudRate);
        }
        let div = (pclk_hz + self.baud_rate / 2) / self.baud_rate;
        match u16::try_from(div) {
            Ok(div) if div >= 16 => Ok(div),
            _ => Err(ConfigError::InvalidBaudRate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_clock_tree() {
        let clocks = ClockConfig::default();
        assert_eq!(clocks.validate(), Ok(()));
        assert_eq!(clocks.vco_hz(), 336_000_000);
        assert_eq!(clocks.sysclk_hz(), 168_000_000);
        assert_eq!(clocks.pclk1_hz(), 42_000_000);
        assert_eq!(clocks.pclk2_hz(), 84_000_000);
        assert_eq!(clocks.apb1_timer_hz(), HopperConfig::default().timer_clock_hz);
    }

    #[test]
    fn clock_limits() {
        let overclocked = ClockConfig::default().pll(8, 400, 2, 7);
        assert_eq!(overclocked.validate(), Err(ConfigError::ClockTooFast));

        let bad_p = ClockConfig::default().pll(8, 336, 3, 7);
        assert_eq!(bad_p.validate(), Err(ConfigError::PllOutOfRange));

        let fast_apb1 = ClockConfig::default().bus_dividers(1, 2, 2);
        assert_eq!(fast_apb1.validate(), Err(ConfigError::ClockTooFast));
    }

    #[test]
    fn band_mapping_uses_wide_arithmetic() {
        let band = FrequencyBand::default();
        assert_eq!(band.width(), 5_500_000_000);
        assert!(band.width() > u64::from(u32::MAX));
        assert_eq!(band.map(0), 300_000_000);
        assert_eq!(band.map(2_147_483_646), 2_447_483_646);
        assert!(band.contains(band.map(u32::MAX)));
        assert_eq!(band.high(), 5_799_999_999);
    }

    #[test]
    fn narrow_band_wraps() {
        let band = FrequencyBand::new(2_400_000_000, 2_400_000_100).unwrap();
        assert_eq!(band.map(250), 2_400_000_050);
        assert_eq!(FrequencyBand::new(5, 5), Err(ConfigError::EmptyBand));
    }

    #[test]
    fn default_hopper_config_reaches_band() {
        assert_eq!(HopperConfig::default().validate(), Ok(()));

        // Without a synthesizer the timer cannot go above half its clock.
        let direct = HopperConfig::default().synth_multiplier(1);
        assert_eq!(
            direct.validate(),
            Err(ConfigError::UnreachableBand(TimerError::FrequencyTooHigh))
        );
    }

    #[test]
    fn band_edges_synthesize_inside_band() {
        let config = HopperConfig::default();
        let (clock, multiplier) = (config.timer_clock_hz, config.synth_multiplier);
        let band = config.frequency_band();

        let low = config.timer_setting(band.low()).unwrap();
        assert_eq!(low.synthesized_hz(clock, multiplier), 300_000_000);

        // 1448 ticks would give 5_801_104_972 Hz, above the band.
        let high = config.timer_setting(band.high()).unwrap();
        assert_eq!(high.period_ticks(), 1449);
        assert_eq!(high.synthesized_hz(clock, multiplier), 5_797_101_449);
        assert!(band.contains(high.synthesized_hz(clock, multiplier)));
        assert!(high.deviation_ppm(clock, multiplier, band.high()) <= 1000);
    }

    #[test]
    fn hop_frequency_within_tolerance() {
        let config = HopperConfig::default();
        let (clock, multiplier) = (config.timer_clock_hz, config.synth_multiplier);
        let s = config.timer_setting(2_447_483_646).unwrap();
        assert_eq!(s.period_ticks(), 3432);
        assert_eq!(s.synthesized_hz(clock, multiplier), 2_447_552_448);
        assert_eq!(s.deviation_ppm(clock, multiplier, 2_447_483_646), 28);

        assert_eq!(config.timer_setting(5_800_000_000), Err(TimerError::OutOfBand));
        assert_eq!(config.timer_setting(0), Err(TimerError::OutOfBand));
    }

    #[test]
    fn coarse_synthesizer_fails_validation() {
        // A 1000x synthesizer leaves 14 or 15 ticks at the top: 6.0 GHz or 5.6 GHz.
        let coarse = HopperConfig::default().synth_multiplier(1000);
        assert_eq!(
            coarse.timer_setting(5_799_999_999),
            Err(TimerError::Imprecise)
        );
        assert_eq!(
            coarse.validate(),
            Err(ConfigError::UnreachableBand(TimerError::Imprecise))
        );

        // Tolerating 3.5% accepts the lower one, never the one above the band.
        let loose = coarse.tolerance_ppm(35_000);
        assert_eq!(loose.validate(), Ok(()));
        let s = loose.timer_setting(5_799_999_999).unwrap();
        assert_eq!(s.synthesized_hz(84_000_000, 1000), 5_600_000_000);

        // The top edge needs 500 ppm even with the default synthesizer.
        let tight = HopperConfig::default().tolerance_ppm(100);
        assert_eq!(
            tight.validate(),
            Err(ConfigError::UnreachableBand(TimerError::Imprecise))
        );
    }

    #[test]
    fn uart_divider() {
        assert_eq!(UartConfig::default().brr(16_000_000), Ok(1667));
        assert_eq!(
            UartConfig::default().baud_rate(0).brr(42_000_000),
            Err(ConfigError::InvalidBaudRate)
        );
        assert_eq!(
            UartConfig::default().baud_rate(300).brr(42_000_000),
            Err(ConfigError::InvalidBaudRate)
        );
    }

    #[test]
    fn link_defaults() {
        let link = LinkConfig::default();
        assert_eq!(link.timeout(), 1000);
        assert_eq!(link.max_attempts(), 6);
        // Every retry count is honoured, 255 retries included.
        assert_eq!(LinkConfig::default().max_retries(u8::MAX).max_attempts(), 256);
    }
}
