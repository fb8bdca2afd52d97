//! Measurement configuration: power mode, oversampling, filtering and
//! standby timing, with the register field codes the chip expects.

/// Power mode of the measurement engine.
///
/// In `Normal` mode the chip cycles between measurement and standby on its
/// own. `Forced` performs a single conversion and falls back to sleep, which
/// suits low-rate battery applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Mode {
    /// No measurements, lowest power draw.
    Sleep = 0,
    /// One conversion per trigger, then back to sleep.
    Forced = 1,
    /// Continuous measurement with the configured standby period.
    #[default]
    Normal = 3,
}

/// Oversampling settings for the temperature, pressure and humidity channels.
///
/// Higher rates reduce noise through in-hardware averaging but lengthen the
/// measurement and raise power consumption per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Oversampling {
    /// No measurement. Disables the channel entirely.
    Skipped = 0,
    /// 1x oversampling.
    #[default]
    X1 = 1,
    /// 2x oversampling.
    X2 = 2,
    /// 4x oversampling.
    X4 = 3,
    /// 8x oversampling.
    X8 = 4,
    /// 16x oversampling. Maximum precision, longest conversion.
    X16 = 5,
}

/// Coefficient of the IIR (Infinite Impulse Response) filter.
///
/// The filter smooths short-term disturbances in the pressure and
/// temperature readings (a slammed door, a gust of wind). Humidity is not
/// filtered by the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum IIRFilter {
    /// Filter disabled.
    #[default]
    Off = 0,
    Coeff2 = 1,
    Coeff4 = 2,
    Coeff8 = 3,
    Coeff16 = 4,
}

/// Standby period between measurement cycles in `Normal` mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StandbyTime {
    /// 0.5 ms.
    Ms0_5 = 0,
    /// 62.5 ms.
    Ms62_5 = 1,
    /// 125 ms.
    Ms125 = 2,
    /// 250 ms.
    #[default]
    Ms250 = 3,
    /// 500 ms.
    Ms500 = 4,
    /// 1000 ms.
    Ms1000 = 5,
    /// 2000 ms on the BMP280. The BME280 repurposes this code as 10 ms.
    Ms2000 = 6,
    /// 4000 ms on the BMP280. The BME280 repurposes this code as 20 ms.
    Ms4000 = 7,
}

/// Complete measurement configuration applied during [`init`].
///
/// The default profile matches a slow ambient-monitoring setup: continuous
/// mode, 250 ms standby, filter off, temperature at standard (4x)
/// oversampling and the pressure and humidity channels skipped.
///
/// [`init`]: crate::Bmx280::init
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Power mode written during initialization.
    pub mode: Mode,
    /// IIR filter coefficient for pressure and temperature.
    pub filter: IIRFilter,
    /// Standby period between cycles in `Normal` mode.
    pub standby: StandbyTime,
    /// Oversampling for the temperature channel.
    pub temp_osrs: Oversampling,
    /// Oversampling for the pressure channel.
    pub pres_osrs: Oversampling,
    /// Oversampling for the humidity channel. Ignored on a BMP280.
    pub hum_osrs: Oversampling,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mode: Mode::Normal,
            filter: IIRFilter::Off,
            standby: StandbyTime::Ms250,
            temp_osrs: Oversampling::X4,
            pres_osrs: Oversampling::Skipped,
            hum_osrs: Oversampling::Skipped,
        }
    }
}

impl Config {
    /// `config` register (0xF5): standby code in bits 7:5, filter in 4:2.
    pub(crate) fn config_byte(&self) -> u8 {
        ((self.standby as u8) << 5) | ((self.filter as u8) << 2)
    }

    /// `ctrl_meas` register (0xF4): osrs_t in bits 7:5, osrs_p in 4:2,
    /// mode in 1:0.
    pub(crate) fn ctrl_meas_byte(&self) -> u8 {
        ((self.temp_osrs as u8) << 5) | ((self.pres_osrs as u8) << 2) | self.mode as u8
    }

    /// `ctrl_hum` register (0xF2): osrs_h in bits 2:0. BME280 only; the
    /// chip latches it on the next `ctrl_meas` write.
    pub(crate) fn ctrl_hum_byte(&self) -> u8 {
        self.hum_osrs as u8
    }
}

/// Fluent builder for a [`Config`], starting from the default profile.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the power mode.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Sets the IIR filter coefficient.
    pub fn iir_filter(mut self, filter: IIRFilter) -> Self {
        self.config.filter = filter;
        self
    }

    /// Sets the standby period for `Normal` mode.
    pub fn standby_time(mut self, standby: StandbyTime) -> Self {
        self.config.standby = standby;
        self
    }

    /// Sets the temperature oversampling.
    pub fn temp_oversampling(mut self, os: Oversampling) -> Self {
        self.config.temp_osrs = os;
        self
    }

    /// Sets the pressure oversampling.
    pub fn pres_oversampling(mut self, os: Oversampling) -> Self {
        self.config.pres_osrs = os;
        self
    }

    /// Sets the humidity oversampling. Has no effect on a BMP280.
    pub fn hum_oversampling(mut self, os: Oversampling) -> Self {
        self.config.hum_osrs = os;
        self
    }

    /// Finalizes the builder and returns the `Config`.
    pub fn build(self) -> Config {
        self.config
    }
}
