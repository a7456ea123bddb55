//! Output timer programming.
//!
//! The output stage is a hardware timer in toggle/PWM mode. Its output frequency is
//!
//! ```text
//! f_out = f_clock / ((prescaler + 1) * (reload + 1))
//! ```
//!
//! Above a few MHz the timer cannot follow the RF frequency directly, so it drives the
//! reference input of an external PLL synthesizer which multiplies it by a fixed factor.

use crate::error::TimerError;

/// Register widths of the output timer.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerLimits {
    pub(crate) max_prescaler: u32,
    pub(crate) max_reload: u32,
}

impl TimerLimits {
    /// 16-bit prescaler with a 32-bit auto-reload register, as on TIM2 and TIM5.
    pub const TIMER_32: TimerLimits = TimerLimits {
        max_prescaler: u16::MAX as u32,
        max_reload: u32::MAX,
    };
    /// 16-bit prescaler with a 16-bit auto-reload register.
    pub const TIMER_16: TimerLimits = TimerLimits {
        max_prescaler: u16::MAX as u32,
        max_reload: u16::MAX as u32,
    };

    /// Creates custom limits.
    pub const fn new(max_prescaler: u32, max_reload: u32) -> Self {
        TimerLimits {
            max_prescaler,
            max_reload,
        }
    }

    /// Largest prescaler register value.
    pub fn max_prescaler(&self) -> u32 {
        self.max_prescaler
    }

    /// Largest auto-reload register value.
    pub fn max_reload(&self) -> u32 {
        self.max_reload
    }
}

impl Default for TimerLimits {
    fn default() -> Self {
        Self::TIMER_32
    }
}

/// Prescaler and auto-reload values for one output frequency.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerSetting {
    prescaler: u32,
    reload: u32,
}

impl TimerSetting {
    /// Computes the register values that make the timer run at `frequency_hz`.
    ///
    /// The period is rounded to the nearest timer clock tick and the smallest prescaler is
    /// chosen so the reload value keeps the best resolution. Fails instead of wrapping when
    /// the frequency cannot be reached:
    /// * the timer needs at least two clock ticks per period,
    /// * the prescaler must fit in `limits`.
    ///
    /// # Examples
    /// ```rust
    /// use spread_hop::timer::{TimerLimits, TimerSetting};
    ///
    /// let s = TimerSetting::compute(84_000_000, 1_000, TimerLimits::TIMER_16).unwrap();
    /// assert_eq!((s.prescaler(), s.reload()), (1, 41_999));
    /// ```
    pub fn compute(
        clock_hz: u32,
        frequency_hz: u64,
        limits: TimerLimits,
    ) -> Result<Self, TimerError> {
        if frequency_hz == 0 {
            return Err(TimerError::ZeroFrequency);
        }
        let clock = u64::from(clock_hz);
        Self::from_ticks((clock + frequency_hz / 2) / frequency_hz, limits)
    }

    /// Splits a period of `ticks` timer clock cycles into prescaler and reload values.
    ///
    /// Periods longer than one reload span are spread over the prescaler, which can round
    /// the period to a multiple of the prescaler division.
    pub fn from_ticks(ticks: u64, limits: TimerLimits) -> Result<Self, TimerError> {
        if ticks < 2 {
            return Err(TimerError::FrequencyTooHigh);
        }

        let span = u64::from(limits.max_reload) + 1;
        let divider = ticks.div_ceil(span);
        if divider - 1 > u64::from(limits.max_prescaler) {
            return Err(TimerError::FrequencyTooLow);
        }
        // Never exceeds `span` since `ticks <= divider * span`.
        let reload = (ticks + divider / 2) / divider - 1;
        if reload == 0 {
            return Err(TimerError::FrequencyTooHigh);
        }

        Ok(TimerSetting {
            prescaler: (divider - 1) as u32,
            reload: reload as u32,
        })
    }

    /// Computes the setting for an RF frequency produced by an external synthesizer which
    /// multiplies the timer output by `multiplier`.
    ///
    /// The period is derived from the RF frequency directly, so no precision is lost to an
    /// intermediate reference frequency. Use [`synthesized_hz()`](#method.synthesized_hz) or
    /// [`deviation_ppm()`](#method.deviation_ppm) to check what comes out.
    pub fn for_synthesizer(
        clock_hz: u32,
        rf_hz: u64,
        multiplier: u32,
        limits: TimerLimits,
    ) -> Result<Self, TimerError> {
        if rf_hz == 0 {
            return Err(TimerError::ZeroFrequency);
        }
        let cycles = synthesizer_cycles(clock_hz, multiplier);
        Self::from_ticks((cycles + rf_hz / 2) / rf_hz, limits)
    }

    /// Prescaler register value.
    pub fn prescaler(&self) -> u32 {
        self.prescaler
    }

    /// Auto-reload register value.
    pub fn reload(&self) -> u32 {
        self.reload
    }

    /// Length of one output period in timer clock ticks.
    pub fn period_ticks(&self) -> u64 {
        (u64::from(self.prescaler) + 1) * (u64::from(self.reload) + 1)
    }

    /// Frequency the timer will actually run at.
    pub fn output_hz(&self, clock_hz: u32) -> u64 {
        u64::from(clock_hz) / self.period_ticks()
    }

    /// RF frequency a synthesizer with `multiplier` produces from this setting, rounded to the
    /// nearest Hz.
    pub fn synthesized_hz(&self, clock_hz: u32, multiplier: u32) -> u64 {
        let ticks = self.period_ticks();
        (synthesizer_cycles(clock_hz, multiplier) + ticks / 2) / ticks
    }

    /// Distance between the synthesized frequency and `target_hz`, in parts per million of
    /// the target.
    pub fn deviation_ppm(&self, clock_hz: u32, multiplier: u32, target_hz: u64) -> u64 {
        let actual = self.synthesized_hz(clock_hz, multiplier);
        actual.abs_diff(target_hz) * 1_000_000 / target_hz.max(1)
    }
}

// Timer clock cycles per second, scaled by the synthesizer multiplier.
fn synthesizer_cycles(clock_hz: u32, multiplier: u32) -> u64 {
    u64::from(clock_hz) * u64::from(multiplier.max(1))
}

/// A hardware timer driving the output stage.
pub trait OutputTimer {
    /// Peripheral error type.
    type Error;

    /// Writes the prescaler and auto-reload registers and starts the counter.
    fn program(&mut self, setting: TimerSetting) -> Result<(), Self::Error>;

    /// Stops the counter.
    fn disable(&mut self) -> Result<(), Self::Error>;
}

impl<T: OutputTimer + ?Sized> OutputTimer for &mut T {
    type Error = T::Error;

    fn program(&mut self, setting: TimerSetting) -> Result<(), Self::Error> {
        T::program(self, setting)
    }

    fn disable(&mut self) -> Result<(), Self::Error> {
        T::disable(self)
    }
}
