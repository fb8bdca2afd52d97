//! Calibration decoding and integer compensation.
//!
//! The formulas follow the manufacturer's fixed-point reference
//! implementation bit for bit; none of them touch the bus, so they can be
//! checked against the published worked examples on the host.

use crate::{CalcTemp, Calibration};

/// Clamp ceiling of the humidity formula, 100.0 %RH before the final shift.
const HUM_MAX: i32 = 419_430_400;

impl Calibration {
    /// Decodes the temperature and pressure words from the block at 0x88.
    ///
    /// All words are little-endian; `dig_t1` and `dig_p1` are unsigned,
    /// the rest are two's complement. Humidity words stay zeroed.
    pub(crate) fn parse_tp_block(block: &[u8]) -> Self {
        Calibration {
            dig_t1: u16::from_le_bytes([block[0], block[1]]),
            dig_t2: i16::from_le_bytes([block[2], block[3]]),
            dig_t3: i16::from_le_bytes([block[4], block[5]]),
            dig_p1: u16::from_le_bytes([block[6], block[7]]),
            dig_p2: i16::from_le_bytes([block[8], block[9]]),
            dig_p3: i16::from_le_bytes([block[10], block[11]]),
            dig_p4: i16::from_le_bytes([block[12], block[13]]),
            dig_p5: i16::from_le_bytes([block[14], block[15]]),
            dig_p6: i16::from_le_bytes([block[16], block[17]]),
            dig_p7: i16::from_le_bytes([block[18], block[19]]),
            dig_p8: i16::from_le_bytes([block[20], block[21]]),
            dig_p9: i16::from_le_bytes([block[22], block[23]]),
            ..Calibration::default()
        }
    }

    /// Decodes the humidity words: `dig_h1` sits apart at 0xA1, the block
    /// at 0xE1 holds the rest. `dig_h4` and `dig_h5` are 12-bit signed
    /// values sharing the nibbles of byte 0xE5.
    pub(crate) fn parse_hum_block(&mut self, dig_h1: u8, block: &[u8]) {
        self.dig_h1 = dig_h1;
        self.dig_h2 = i16::from_le_bytes([block[0], block[1]]);
        self.dig_h3 = block[2];
        self.dig_h4 = ((block[3] as i8 as i16) << 4) | (block[4] & 0x0F) as i16;
        self.dig_h5 = ((block[5] as i8 as i16) << 4) | (block[4] >> 4) as i16;
        self.dig_h6 = block[6] as i8;
    }

    /// Compensates a raw 20-bit temperature reading.
    ///
    /// Returns the value in centi-degrees Celsius together with `t_fine`,
    /// the high resolution intermediate the pressure and humidity formulas
    /// consume. Right shifts on `i32` are arithmetic, which the sub-zero
    /// range relies on.
    pub(crate) fn compensate_temperature(&self, adc_t: i32) -> CalcTemp {
        let dig_t1 = self.dig_t1 as i32;

        let var1 = (((adc_t >> 3) - (dig_t1 << 1)) * (self.dig_t2 as i32)) >> 11;
        let var2 = (adc_t >> 4) - dig_t1;
        let var3 = (((var2 * var2) >> 12) * (self.dig_t3 as i32)) >> 14;
        let t_fine = var1 + var3;

        CalcTemp {
            t_fine,
            temp_comp: (t_fine * 5 + 128) >> 8,
        }
    }

    /// Compensates a raw 20-bit pressure reading into Pascal.
    ///
    /// 32-bit variant of the reference formula; `t_fine` comes from
    /// [`compensate_temperature`]. Returns 0 when the divisor term
    /// collapses to zero, which would otherwise trap.
    ///
    /// [`compensate_temperature`]: Calibration::compensate_temperature
    pub(crate) fn compensate_pressure(&self, adc_p: i32, t_fine: i32) -> u32 {
        let var1 = (t_fine >> 1) - 64_000;

        let mut var2 = (((var1 >> 2) * (var1 >> 2)) >> 11) * (self.dig_p6 as i32);
        var2 += (var1 * (self.dig_p5 as i32)) << 1;
        var2 = (var2 >> 2) + ((self.dig_p4 as i32) << 16);

        let squared = ((var1 >> 2) * (var1 >> 2)) >> 13;
        let mut var1 =
            (((self.dig_p3 as i32) * squared) >> 3) + (((self.dig_p2 as i32) * var1) >> 1);
        var1 >>= 18;
        var1 = ((32_768 + var1) * (self.dig_p1 as i32)) >> 15;

        if var1 == 0 {
            return 0;
        }

        let mut p = ((1_048_576 - adc_p) - (var2 >> 12)) as u32 * 3125;
        if p < 0x8000_0000 {
            p = (p << 1) / var1 as u32;
        } else {
            p = p / var1 as u32 * 2;
        }

        let var1 = ((self.dig_p9 as i32) * ((((p as i32) >> 3) * ((p as i32) >> 3)) >> 13)) >> 12;
        let var2 = (((p as i32) >> 2) * (self.dig_p8 as i32)) >> 13;

        ((p as i32) + ((var1 + var2 + self.dig_p7 as i32) >> 4)) as u32
    }

    /// Compensates a raw 16-bit humidity reading into Q22.10 %RH
    /// (value / 1024 = percent). Requires the words read by
    /// [`parse_hum_block`], so BME280 only.
    ///
    /// [`parse_hum_block`]: Calibration::parse_hum_block
    pub(crate) fn compensate_humidity(&self, adc_h: i32, t_fine: i32) -> u32 {
        let var1 = t_fine - 76_800;

        let var2 =
            (((adc_h << 14) - ((self.dig_h4 as i32) << 20) - (self.dig_h5 as i32) * var1)
                + 16_384)
                >> 15;
        let var3 = (var1 * (self.dig_h6 as i32)) >> 10;
        let var4 = ((var1 * (self.dig_h3 as i32)) >> 11) + 32_768;
        let var5 = ((((var3 * var4) >> 10) + 2_097_152) * (self.dig_h2 as i32) + 8_192) >> 14;

        let hum = var2 * var5;
        let hum = hum - (((((hum >> 15) * (hum >> 15)) >> 7) * (self.dig_h1 as i32)) >> 4);

        (hum.clamp(0, HUM_MAX) >> 12) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Worked-example coefficients from the manufacturer documentation.
    fn reference_calibration() -> Calibration {
        Calibration {
            dig_t1: 27504,
            dig_t2: 26435,
            dig_t3: -1000,
            dig_p1: 36477,
            dig_p2: -10685,
            dig_p3: 3024,
            dig_p4: 2855,
            dig_p5: 140,
            dig_p6: -7,
            dig_p7: 15500,
            dig_p8: -14600,
            dig_p9: 6000,
            dig_h1: 75,
            dig_h2: 363,
            dig_h3: 0,
            dig_h4: 329,
            dig_h5: 50,
            dig_h6: 30,
        }
    }

    #[test]
    fn tp_block_decodes_per_word_signedness() {
        let block: [u8; 24] = [
            0x10, 0x6B, 0x43, 0x67, 0x18, 0xFC, // dig_t1..dig_t3
            0x7D, 0x8E, 0x43, 0xD6, 0xD0, 0x0B, // dig_p1..dig_p3
            0x27, 0x0B, 0x8C, 0x00, 0xF9, 0xFF, // dig_p4..dig_p6
            0x8C, 0x3C, 0xF8, 0xC6, 0x70, 0x17, // dig_p7..dig_p9
        ];
        let calib = Calibration::parse_tp_block(&block);

        assert_eq!(calib.dig_t1, 27408);
        assert_eq!(calib.dig_t2, 26435);
        assert_eq!(calib.dig_t3, -1000);
        assert_eq!(calib.dig_p1, 36477);
        assert_eq!(calib.dig_p2, -10685);
        assert_eq!(calib.dig_p3, 3024);
        assert_eq!(calib.dig_p4, 2855);
        assert_eq!(calib.dig_p5, 140);
        assert_eq!(calib.dig_p6, -7);
        assert_eq!(calib.dig_p7, 15500);
        assert_eq!(calib.dig_p8, -14600);
        assert_eq!(calib.dig_p9, 6000);

        // Humidity words untouched until parse_hum_block runs.
        assert_eq!(calib.dig_h1, 0);
        assert_eq!(calib.dig_h2, 0);
    }

    #[test]
    fn hum_block_unpacks_shared_nibbles() {
        let mut calib = Calibration::default();
        calib.parse_hum_block(0x4B, &[0x6B, 0x01, 0x00, 0x14, 0x29, 0x03, 0x1E]);

        assert_eq!(calib.dig_h1, 75);
        assert_eq!(calib.dig_h2, 363);
        assert_eq!(calib.dig_h3, 0);
        assert_eq!(calib.dig_h4, 329);
        assert_eq!(calib.dig_h5, 50);
        assert_eq!(calib.dig_h6, 30);
    }

    #[test]
    fn hum_block_sign_extends_split_words() {
        let mut calib = Calibration::default();
        // 0xE4 = 0x80 drives dig_h4 negative, 0xE6 = 0xFF drives dig_h5
        // negative, both through the 12-bit packing.
        calib.parse_hum_block(0, &[0x00, 0x00, 0x00, 0x80, 0xF1, 0xFF, 0x80]);

        assert_eq!(calib.dig_h4, -2047);
        assert_eq!(calib.dig_h5, -1);
        assert_eq!(calib.dig_h6, -128);
    }

    #[test]
    fn temperature_matches_worked_example() {
        let calib = reference_calibration();
        let temp = calib.compensate_temperature(519888);

        assert_eq!(temp.t_fine, 128422);
        assert_eq!(temp.temp_comp, 2508); // 25.08 °C
    }

    #[test]
    fn temperature_below_zero_keeps_sign() {
        let calib = reference_calibration();
        let temp = calib.compensate_temperature(350000);

        assert_eq!(temp.t_fine, -145789);
        assert_eq!(temp.temp_comp, -2847); // -28.47 °C
    }

    #[test]
    fn pressure_matches_worked_example() {
        let calib = reference_calibration();

        assert_eq!(calib.compensate_pressure(415148, 128422), 100656); // Pa
    }

    #[test]
    fn pressure_covers_high_magnitude_branch() {
        let calib = reference_calibration();

        // Low enough ADC count to push the scaled intermediate past 2^31.
        assert_eq!(calib.compensate_pressure(300000, 128422), 120601);
    }

    #[test]
    fn pressure_guards_zero_divisor() {
        let calib = Calibration {
            dig_p1: 0,
            ..reference_calibration()
        };

        assert_eq!(calib.compensate_pressure(415148, 128422), 0);
    }

    #[test]
    fn humidity_matches_reference_vectors() {
        let calib = reference_calibration();

        assert_eq!(calib.compensate_humidity(30000, 128422), 50619); // 49.43 %
        assert_eq!(calib.compensate_humidity(32768, 128422), 66416); // 64.86 %
        assert_eq!(calib.compensate_humidity(25000, 128422), 21901); // 21.39 %
    }

    #[test]
    fn humidity_clamps_to_physical_range() {
        let calib = reference_calibration();

        assert_eq!(calib.compensate_humidity(0, 128422), 0);
        // Saturated ADC with a hot t_fine lands on the 100.0 % ceiling.
        assert_eq!(calib.compensate_humidity(65535, 300000), 102400);
    }
}
