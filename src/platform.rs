//! Board bring-up.
//!
//! The radio logic never touches registers itself. A board support layer implements
//! [`Platform`] and [`bring_up()`] drives it through the steps in a fixed order:
//! clock tree, GPIO alternate functions, UART, output timer.
//!
//! Waiting on hardware ready flags (HSE, PLL lock) is allowed to spin without a timeout inside
//! the [`Platform`] methods, nothing else can run before the clocks are up anyway.

use crate::config::{ClockConfig, UartConfig};
use crate::error::BringUpError;

/// Hardware capabilities needed by this crate.
pub trait Platform {
    /// Error type of the board layer.
    type Error;

    /// Starts the crystal and PLL and switches the system clock over.
    fn configure_clock(&mut self, clocks: &ClockConfig) -> Result<(), Self::Error>;

    /// Sets up the status LED output and the UART alternate functions.
    fn configure_gpio(&mut self) -> Result<(), Self::Error>;

    /// Enables the UART with the given settings and baud rate register value.
    fn configure_uart(&mut self, uart: &UartConfig, brr: u16) -> Result<(), Self::Error>;

    /// Enables the clock of the output timer. The timer is started by
    /// [`OutputTimer::program()`](crate::timer::OutputTimer::program).
    fn configure_timer(&mut self, timer_clock_hz: u32) -> Result<(), Self::Error>;
}

impl<P: Platform + ?Sized> Platform for &mut P {
    type Error = P::Error;

    fn configure_clock(&mut self, clocks: &ClockConfig) -> Result<(), Self::Error> {
        P::configure_clock(self, clocks)
    }

    fn configure_gpio(&mut self) -> Result<(), Self::Error> {
        P::configure_gpio(self)
    }

    fn configure_uart(&mut self, uart: &UartConfig, brr: u16) -> Result<(), Self::Error> {
        P::configure_uart(self, uart, brr)
    }

    fn configure_timer(&mut self, timer_clock_hz: u32) -> Result<(), Self::Error> {
        P::configure_timer(self, timer_clock_hz)
    }
}

/// Everything [`bring_up()`] needs to know about the board.
#[derive(Copy, Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoardConfig {
    pub(crate) clocks: ClockConfig,
    pub(crate) uart: UartConfig,
}

impl BoardConfig {
    /// Clock tree configuration.
    pub fn clocks(mut self, clocks: ClockConfig) -> Self {
        self.clocks = clocks;
        self
    }

    /// Serial line configuration.
    pub fn uart(mut self, uart: UartConfig) -> Self {
        self.uart = uart;
        self
    }
}

/// Bus frequencies after bring-up.
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Clocks {
    sysclk: u32,
    pclk1: u32,
    pclk2: u32,
    apb1_timer: u32,
}

impl Clocks {
    /// System clock.
    pub fn sysclk_hz(&self) -> u32 {
        self.sysclk
    }

    /// APB1 peripheral clock.
    pub fn pclk1_hz(&self) -> u32 {
        self.pclk1
    }

    /// APB2 peripheral clock.
    pub fn pclk2_hz(&self) -> u32 {
        self.pclk2
    }

    /// Clock of the APB1 timers, use it for
    /// [`HopperConfig::timer_clock_hz()`](crate::config::HopperConfig::timer_clock_hz).
    pub fn apb1_timer_hz(&self) -> u32 {
        self.apb1_timer
    }
}

/// Brings the board up.
///
/// The configuration is checked before any hardware is touched. A failing step aborts the
/// bring-up; the remaining steps are not run.
///
/// # Examples
/// ```ignore
/// let clocks = spread_hop::bring_up(&mut board, &BoardConfig::default())?;
/// let config = HopperConfig::default().timer_clock_hz(clocks.apb1_timer_hz());
/// ```
pub fn bring_up<P: Platform>(
    platform: &mut P,
    config: &BoardConfig,
) -> Result<Clocks, BringUpError<P::Error>> {
    let clocks = &config.clocks;
    clocks.validate()?;
    let brr = config.uart.brr(clocks.pclk1_hz())?;

    platform.configure_clock(clocks).map_err(|e| {
        error!("clock configuration failed");
        BringUpError::Clock(e)
    })?;
    platform.configure_gpio().map_err(|e| {
        error!("GPIO configuration failed");
        BringUpError::Gpio(e)
    })?;
    platform.configure_uart(&config.uart, brr).map_err(|e| {
        error!("UART configuration failed");
        BringUpError::Uart(e)
    })?;
    platform.configure_timer(clocks.apb1_timer_hz()).map_err(|e| {
        error!("timer configuration failed");
        BringUpError::Timer(e)
    })?;

    info!(
        "platform up: sysclk {} Hz, {} baud",
        clocks.sysclk_hz(),
        config.uart.baud()
    );
    Ok(Clocks {
        sysclk: clocks.sysclk_hz(),
        pclk1: clocks.pclk1_hz(),
        pclk2: clocks.pclk2_hz(),
        apb1_timer: clocks.apb1_timer_hz(),
    })
}
