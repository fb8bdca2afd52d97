//! # BMP280 / BME280 environmental sensor driver
//!
//! A `no_std` driver for the Bosch BMP280 barometric pressure and
//! temperature sensor and its humidity-measuring sibling, the BME280,
//! attached over I2C.
//!
//! The two parts share a register map; [`Bmx280::init`] probes the identity
//! register and unlocks the humidity channel when a BME280 answers.
//!
//! ## Features
//! - **Bus-agnostic**: works with any [`embedded_hal`] 1.x I2C implementation.
//! - **Fixed-point arithmetic**: no FPU required; compensation follows the
//!   manufacturer's integer reference formulas bit for bit.
//! - **Modes**: continuous (normal) and one-shot (forced) measurement with
//!   configurable oversampling, IIR filtering and standby time.
//!
//! ## Units
//! - **Temperature**: Centigrade (°C * 100) -> 2350 = 23.50 °C
//! - **Pressure**: Pascal (Pa) -> 101325 = 1013.25 hPa
//! - **Humidity**: Q22.10 (%RH * 1024) -> 47293 = 46.18 %

#![cfg_attr(not(test), no_std)]

mod calc;
mod settings;

pub use settings::{Config, ConfigBuilder, IIRFilter, Mode, Oversampling, StandbyTime};

use embedded_hal::{delay::DelayNs, i2c};

/// Primary I2C address (SDO pulled low).
pub const PRIMARY_ADDRESS: u8 = 0x76;
/// Secondary I2C address (SDO pulled high).
pub const SECONDARY_ADDRESS: u8 = 0x77;

const BMP280_CHIP_ID: u8 = 0x58;
const BME280_CHIP_ID: u8 = 0x60;

const RESET_CMD: u8 = 0xB6;
/// Settle time after a soft reset before the calibration memory is read.
const RESET_SETTLE_MS: u32 = 100;
/// `status` bit 3, set while a conversion is running.
const STATUS_MEASURING: u8 = 1 << 3;

/// Register map shared by both variants; the humidity registers exist only
/// on the BME280.
mod reg {
    pub const ID: u8 = 0xD0;
    pub const RESET: u8 = 0xE0;
    pub const CTRL_HUM: u8 = 0xF2;
    pub const STATUS: u8 = 0xF3;
    pub const CTRL_MEAS: u8 = 0xF4;
    pub const CONFIG: u8 = 0xF5;
    pub const PRESS_MSB: u8 = 0xF7;
    pub const TEMP_MSB: u8 = 0xFA;
}

/// Layout of the factory calibration memory.
mod calib_mem {
    /// Temperature and pressure words at 0x88.
    pub const TP_ADDR: u8 = 0x88;
    pub const TP_LEN: usize = 24;
    /// Reading two extra bytes stretches the block to `dig_h1` at 0xA1.
    pub const TP_H1_LEN: usize = 26;
    /// Remaining humidity words at 0xE1.
    pub const HUM_ADDR: u8 = 0xE1;
    pub const HUM_LEN: usize = 7;
}

/// Error types for the BMP280/BME280 driver.
pub mod error {
    /// Errors that can occur during communication or configuration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum Bmx280Error<E> {
        /// Underlying I2C read or write failed.
        Transport(E),
        /// The identity register could not be read or holds an unknown
        /// chip id.
        IdentityMismatch,
        /// The factory calibration memory could not be read.
        CalibrationRead(E),
        /// Humidity was requested from a chip without a humidity channel.
        HumidityUnsupported,
    }

    /// Result type alias for driver operations.
    pub type Result<T, E> = core::result::Result<T, Bmx280Error<E>>;
}

/// Chip variant reported by the identity register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Chip {
    /// Pressure and temperature part, id 0x58.
    Bmp280,
    /// Pressure, temperature and humidity part, id 0x60.
    Bme280,
}

impl Chip {
    fn from_id(id: u8) -> Option<Self> {
        match id {
            BMP280_CHIP_ID => Some(Chip::Bmp280),
            BME280_CHIP_ID => Some(Chip::Bme280),
            _ => None,
        }
    }

    /// Only the BME280 carries the humidity channel.
    pub fn has_humidity(self) -> bool {
        matches!(self, Chip::Bme280)
    }
}

/// Represents temperature in Centigrade (degrees Celsius * 100).
///
/// Use the `.split()` method to format the value without floating point.
///
/// # Example
/// A value of `2350` represents **23.50 °C**.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Temperature(pub i32);

impl Temperature {
    /// Splits the fixed-point value into integral (degrees) and fractional
    /// (hundredths) parts. Below zero both parts carry the sign.
    ///
    /// # Example
    /// ```rust
    /// use bmx280_driver::Temperature;
    /// let temp = Temperature(2350);
    /// assert_eq!(temp.split(), (23, 50)); // Represents 23.50 °C
    /// assert_eq!(Temperature(-512).split(), (-5, -12));
    /// ```
    pub fn split(&self) -> (i32, i32) {
        (self.0 / 100, self.0 % 100)
    }
}

/// Represents atmospheric pressure in Pascal (Pa).
///
/// # Example
/// A value of `101325` represents **101325 Pa** (or 1013.25 hPa).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pressure(pub u32);

impl Pressure {
    /// Converts the Pascal value to Hectopascal (hPa) and splits it into
    /// integral and fractional parts.
    ///
    /// # Example
    /// ```rust
    /// use bmx280_driver::Pressure;
    /// let pres = Pressure(101325);
    /// assert_eq!(pres.as_hpa(), (1013, 25)); // Represents 1013.25 hPa
    /// ```
    pub fn as_hpa(&self) -> (u32, u32) {
        (self.0 / 100, self.0 % 100)
    }
}

/// Represents relative humidity in Q22.10 fixed point (%RH * 1024).
///
/// # Example
/// A value of `47293` represents **46.18 %RH**.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Humidity(pub u32);

impl Humidity {
    /// Splits the fixed-point value into integral (percent) and fractional
    /// (thousandths) parts.
    ///
    /// # Example
    /// ```rust
    /// use bmx280_driver::Humidity;
    /// let hum = Humidity(50619);
    /// assert_eq!(hum.split(), (49, 432)); // Represents 49.432 %
    /// ```
    pub fn split(&self) -> (u32, u32) {
        (self.0 >> 10, ((self.0 & 0x3FF) * 1000) >> 10)
    }
}

/// Compensated measurement result in physical units.
///
/// `hum` is `None` on a BMP280 and whenever the humidity channel is
/// configured as [`Oversampling::Skipped`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    /// Temperature data.
    pub temp: Temperature,
    /// Atmospheric pressure data.
    pub pres: Pressure,
    /// Relative humidity data, when the chip and configuration provide it.
    pub hum: Option<Humidity>,
}

/// Factory-fused calibration words read from the chip.
///
/// Unique to every individual die and consumed by the compensation
/// formulas. The humidity words stay zeroed on a BMP280.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,
    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    pub dig_p9: i16,
    pub dig_h1: u8,
    pub dig_h2: i16,
    pub dig_h3: u8,
    pub dig_h4: i16,
    pub dig_h5: i16,
    pub dig_h6: i8,
}

/// Intermediate output of the temperature compensation.
///
/// `t_fine` is the high resolution value the pressure and humidity
/// formulas consume.
#[derive(Debug, Copy, Clone, Default)]
pub(crate) struct CalcTemp {
    pub(crate) t_fine: i32,
    pub(crate) temp_comp: i32,
}

/// The BMP280/BME280 driver.
///
/// Construct with [`Bmx280::new`], then call [`Bmx280::init`] once the bus
/// is up. The chip variant is detected during init; afterwards the handle
/// can be re-initialized at any time, for example after a sensor power
/// cycle.
#[derive(Debug)]
pub struct Bmx280<I2C> {
    i2c: I2C,
    address: u8,
    chip: Option<Chip>,
    calib: Calibration,
    config: Config,
}

impl<I2C, E> Bmx280<I2C>
where
    I2C: i2c::I2c<Error = E>,
{
    /// Creates a new driver instance. Does not communicate with the sensor
    /// yet.
    ///
    /// # Arguments
    /// * `i2c` - The I2C bus object.
    /// * `address` - The sensor address, [`PRIMARY_ADDRESS`] or
    ///   [`SECONDARY_ADDRESS`].
    pub fn new(i2c: I2C, address: u8) -> Self {
        Bmx280 {
            i2c,
            address,
            chip: None,
            calib: Calibration::default(),
            config: Config::default(),
        }
    }

    /// Probes, resets and configures the sensor.
    ///
    /// The sequence is: identify the chip, soft-reset it, wait for the
    /// reset to settle, load the factory calibration and write the
    /// measurement configuration. On a BME280 the humidity oversampling is
    /// written first because the chip latches it on the `ctrl_meas` write.
    ///
    /// # Errors
    /// [`IdentityMismatch`] when the identity register cannot be read or
    /// reports an unknown part, [`CalibrationRead`] when the calibration
    /// memory cannot be read, [`Transport`] for any other bus failure. A
    /// failed init leaves the handle reusable; call `init` again to retry.
    ///
    /// [`IdentityMismatch`]: error::Bmx280Error::IdentityMismatch
    /// [`CalibrationRead`]: error::Bmx280Error::CalibrationRead
    /// [`Transport`]: error::Bmx280Error::Transport
    pub fn init(&mut self, delay: &mut impl DelayNs, config: &Config) -> error::Result<(), E> {
        self.config = *config;
        self.chip = None;

        let id = self
            .read_reg_byte(reg::ID)
            .map_err(|_| error::Bmx280Error::IdentityMismatch)?;
        let chip = Chip::from_id(id).ok_or(error::Bmx280Error::IdentityMismatch)?;

        self.reset()?;
        delay.delay_ms(RESET_SETTLE_MS);

        self.calib = self
            .load_calibration(chip)
            .map_err(error::Bmx280Error::CalibrationRead)?;

        if chip.has_humidity() {
            let ctrl_hum = self.config.ctrl_hum_byte();
            self.write_reg(&[reg::CTRL_HUM, ctrl_hum])?;
        }
        let config_byte = self.config.config_byte();
        self.write_reg(&[reg::CONFIG, config_byte])?;
        let ctrl_meas = self.config.ctrl_meas_byte();
        self.write_reg(&[reg::CTRL_MEAS, ctrl_meas])?;

        self.chip = Some(chip);
        Ok(())
    }

    /// Variant detected by the last successful [`init`], `None` beforehand.
    ///
    /// [`init`]: Bmx280::init
    pub fn chip(&self) -> Option<Chip> {
        self.chip
    }

    /// Latest temperature sample.
    pub fn read_temperature(&mut self) -> error::Result<Temperature, E> {
        let mut buffer = [0u8; 3];
        self.read_into(reg::TEMP_MSB, &mut buffer)?;

        let temp = self.calib.compensate_temperature(adc_20bit(&buffer));
        Ok(Temperature(temp.temp_comp))
    }

    /// Latest pressure sample.
    ///
    /// Temperature is read in the same burst because its `t_fine`
    /// intermediate feeds the pressure compensation.
    pub fn read_pressure(&mut self) -> error::Result<Pressure, E> {
        let mut buffer = [0u8; 6];
        self.read_into(reg::PRESS_MSB, &mut buffer)?;

        let temp = self.calib.compensate_temperature(adc_20bit(&buffer[3..6]));
        let pres = self.calib.compensate_pressure(adc_20bit(&buffer[0..3]), temp.t_fine);
        Ok(Pressure(pres))
    }

    /// Latest humidity sample.
    ///
    /// # Errors
    /// [`HumidityUnsupported`] on a BMP280 or an uninitialized handle; no
    /// bus traffic happens in that case.
    ///
    /// [`HumidityUnsupported`]: error::Bmx280Error::HumidityUnsupported
    pub fn read_humidity(&mut self) -> error::Result<Humidity, E> {
        if self.chip != Some(Chip::Bme280) {
            return Err(error::Bmx280Error::HumidityUnsupported);
        }

        let mut buffer = [0u8; 5];
        self.read_into(reg::TEMP_MSB, &mut buffer)?;

        let temp = self.calib.compensate_temperature(adc_20bit(&buffer[0..3]));
        let hum = self.calib.compensate_humidity(adc_16bit(&buffer[3..5]), temp.t_fine);
        Ok(Humidity(hum))
    }

    /// Reads every available channel in a single burst.
    ///
    /// The burst covers 6 bytes on a BMP280 and 8 on a BME280, so all
    /// values belong to the same measurement cycle.
    pub fn read_measurement(&mut self) -> error::Result<Measurement, E> {
        let with_hum = self.chip == Some(Chip::Bme280);
        let len = if with_hum { 8 } else { 6 };

        let mut buffer = [0u8; 8];
        self.read_into(reg::PRESS_MSB, &mut buffer[..len])?;

        let temp = self.calib.compensate_temperature(adc_20bit(&buffer[3..6]));
        let pres = self.calib.compensate_pressure(adc_20bit(&buffer[0..3]), temp.t_fine);
        let hum = if with_hum && self.config.hum_osrs != Oversampling::Skipped {
            let hum = self.calib.compensate_humidity(adc_16bit(&buffer[6..8]), temp.t_fine);
            Some(Humidity(hum))
        } else {
            None
        };

        Ok(Measurement {
            temp: Temperature(temp.temp_comp),
            pres: Pressure(pres),
            hum,
        })
    }

    /// Triggers a single conversion from sleep.
    ///
    /// Rewrites only the mode bits of `ctrl_meas`, keeping the configured
    /// oversampling. The chip falls back to sleep when the conversion
    /// finishes; poll [`is_measuring`] before reading.
    ///
    /// [`is_measuring`]: Bmx280::is_measuring
    pub fn force_measurement(&mut self) -> error::Result<(), E> {
        let register = self.read_reg_byte(reg::CTRL_MEAS)?;
        self.write_reg(&[reg::CTRL_MEAS, (register & 0xFC) | Mode::Forced as u8])
    }

    /// Whether a conversion is currently running.
    pub fn is_measuring(&mut self) -> error::Result<bool, E> {
        Ok(self.read_reg_byte(reg::STATUS)? & STATUS_MEASURING != 0)
    }

    /// Releases the bus handle.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Soft-resets the chip. All registers fall back to their power-on
    /// defaults, so the configuration must be rewritten afterwards.
    fn reset(&mut self) -> error::Result<(), E> {
        self.write_reg(&[reg::RESET, RESET_CMD])
    }

    /// Reads the factory calibration blocks for the detected variant.
    fn load_calibration(&mut self, chip: Chip) -> Result<Calibration, E> {
        match chip {
            Chip::Bmp280 => {
                let mut block = [0u8; calib_mem::TP_LEN];
                self.i2c
                    .write_read(self.address, &[calib_mem::TP_ADDR], &mut block)?;

                Ok(Calibration::parse_tp_block(&block))
            }
            Chip::Bme280 => {
                let mut block = [0u8; calib_mem::TP_H1_LEN];
                self.i2c
                    .write_read(self.address, &[calib_mem::TP_ADDR], &mut block)?;
                let mut hum_block = [0u8; calib_mem::HUM_LEN];
                self.i2c
                    .write_read(self.address, &[calib_mem::HUM_ADDR], &mut hum_block)?;

                let mut calib = Calibration::parse_tp_block(&block);
                calib.parse_hum_block(block[calib_mem::TP_H1_LEN - 1], &hum_block);
                Ok(calib)
            }
        }
    }

    /// Reads data from a starting register address into a provided buffer.
    ///
    /// Consecutive registers auto-increment, so one transaction yields a
    /// consistent multi-byte sample.
    fn read_into(&mut self, reg_address: u8, buffer: &mut [u8]) -> error::Result<(), E> {
        self.i2c
            .write_read(self.address, &[reg_address], buffer)
            .map_err(error::Bmx280Error::Transport)
    }

    /// Reads a single byte from a specific register address.
    fn read_reg_byte(&mut self, reg_address: u8) -> error::Result<u8, E> {
        let mut buffer = [0];
        self.i2c
            .write_read(self.address, &[reg_address], &mut buffer)
            .map_err(error::Bmx280Error::Transport)?;

        Ok(buffer[0])
    }

    /// Writes a byte slice (typically `[Register, Value]`) to the sensor.
    fn write_reg(&mut self, data: &[u8]) -> error::Result<(), E> {
        self.i2c
            .write(self.address, data)
            .map_err(error::Bmx280Error::Transport)
    }
}

/// Reassembles a 20-bit ADC word from its three registers; the low nibble
/// of the last byte pads the unused resolution.
fn adc_20bit(bytes: &[u8]) -> i32 {
    (((bytes[0] as u32) << 12) | ((bytes[1] as u32) << 4) | ((bytes[2] as u32) >> 4)) as i32
}

/// Reassembles the 16-bit humidity word, big-endian on the wire.
fn adc_16bit(bytes: &[u8]) -> i32 {
    (((bytes[0] as u32) << 8) | (bytes[1] as u32)) as i32
}
