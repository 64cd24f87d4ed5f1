//! ADC to charge and energy conversion.

use crate::{Error, Result};

/// Full-scale ADC range (8-bit dataword).
pub const ADC_COUNTS: f64 = 256.0;
/// Front-end gain, mV per ke-.
pub const GAIN_MV_PER_KE: f64 = 4.0;
/// Mean ionization energy per electron, MeV.
pub const W_ION_MEV: f64 = 23.6e-6;

/// Per-channel ADC calibration resolved for one hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelCalibration {
    pub vref_mv: f64,
    pub vcm_mv: f64,
    pub pedestal_mv: f64,
}

impl ChannelCalibration {
    #[must_use]
    pub fn new(vref_mv: f64, vcm_mv: f64, pedestal_mv: f64) -> Self {
        Self {
            vref_mv,
            vcm_mv,
            pedestal_mv,
        }
    }

    /// Charge in ke- for a dataword on this channel.
    #[inline]
    #[must_use]
    pub fn charge(&self, dataword: u8) -> f64 {
        charge_from_dataword(f64::from(dataword), self.vref_mv, self.vcm_mv, self.pedestal_mv)
    }
}

/// Converts an ADC dataword to charge above pedestal, in ke-.
///
/// The code is mapped linearly onto `[vcm, vref]`, the pedestal is subtracted
/// and the result divided by the 4 mV/ke- gain.
#[inline]
#[must_use]
pub fn charge_from_dataword(dataword: f64, vref_mv: f64, vcm_mv: f64, pedestal_mv: f64) -> f64 {
    (dataword / ADC_COUNTS * (vref_mv - vcm_mv) + vcm_mv - pedestal_mv) / GAIN_MV_PER_KE
}

/// Inverse of [`charge_from_dataword`].
#[inline]
#[must_use]
pub fn dataword_from_charge(charge_ke: f64, vref_mv: f64, vcm_mv: f64, pedestal_mv: f64) -> f64 {
    (charge_ke * GAIN_MV_PER_KE - vcm_mv + pedestal_mv) * ADC_COUNTS / (vref_mv - vcm_mv)
}

/// Deposited energy in MeV for a charge in ke-.
///
/// Uses a fixed W-value; electron lifetime attenuation is not corrected.
#[inline]
#[must_use]
pub fn energy_from_charge(charge_ke: f64) -> f64 {
    charge_ke * W_ION_MEV
}

/// Row-wise [`charge_from_dataword`] over equal-length columns.
///
/// # Errors
/// Returns [`Error::ColumnLengthMismatch`] if a calibration column differs
/// in length from `datawords`.
pub fn charges_from_datawords(
    datawords: &[u8],
    vref_mv: &[f64],
    vcm_mv: &[f64],
    pedestal_mv: &[f64],
) -> Result<Vec<f64>> {
    let expected = datawords.len();
    for (column, actual) in [
        ("vref_mv", vref_mv.len()),
        ("vcm_mv", vcm_mv.len()),
        ("pedestal_mv", pedestal_mv.len()),
    ] {
        if actual != expected {
            return Err(Error::ColumnLengthMismatch {
                column,
                expected,
                actual,
            });
        }
    }
    Ok(datawords
        .iter()
        .zip(vref_mv)
        .zip(vcm_mv)
        .zip(pedestal_mv)
        .map(|(((&dw, &vref), &vcm), &ped)| charge_from_dataword(f64::from(dw), vref, vcm, ped))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_channel_midscale() {
        let q = charge_from_dataword(128.0, 1300.0, 288.0, 580.0);
        assert_relative_eq!(q, 53.5);
        assert_relative_eq!(energy_from_charge(q), 53.5 * 23.6e-6);
    }

    #[test]
    fn test_zero_dataword_is_vcm_above_pedestal() {
        let q = charge_from_dataword(0.0, 1300.0, 288.0, 580.0);
        assert_relative_eq!(q, (288.0 - 580.0) / 4.0);
    }

    #[test]
    fn test_linear_in_dataword() {
        let q0 = charge_from_dataword(0.0, 1300.0, 288.0, 580.0);
        let q1 = charge_from_dataword(1.0, 1300.0, 288.0, 580.0);
        let q200 = charge_from_dataword(200.0, 1300.0, 288.0, 580.0);
        assert_relative_eq!(q200 - q0, 200.0 * (q1 - q0), epsilon = 1e-9);
    }

    #[test]
    fn test_inverse_recovers_dataword() {
        for dw in [0_u8, 1, 77, 128, 255] {
            let q = charge_from_dataword(f64::from(dw), 1250.0, 300.0, 600.0);
            let back = dataword_from_charge(q, 1250.0, 300.0, 600.0);
            assert_relative_eq!(back, f64::from(dw), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_columnar_matches_scalar() {
        let cal = ChannelCalibration::new(1300.0, 288.0, 600.0);
        let q = charges_from_datawords(&[128, 10], &[1300.0; 2], &[288.0; 2], &[580.0, 600.0])
            .unwrap();
        assert_relative_eq!(q[0], 53.5);
        assert_relative_eq!(q[1], cal.charge(10));
    }

    #[test]
    fn test_columnar_length_mismatch_is_an_error() {
        let err = charges_from_datawords(&[1, 2], &[1300.0], &[288.0; 2], &[580.0; 2]).unwrap_err();
        assert!(matches!(
            err,
            Error::ColumnLengthMismatch {
                column: "vref_mv",
                expected: 2,
                actual: 1
            }
        ));

        let err = charges_from_datawords(&[1], &[1300.0], &[288.0], &[]).unwrap_err();
        assert!(matches!(
            err,
            Error::ColumnLengthMismatch {
                column: "pedestal_mv",
                ..
            }
        ));
        assert!(charges_from_datawords(&[], &[], &[], &[]).unwrap().is_empty());
    }
}
