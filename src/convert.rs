//! Sensor conversion for resistive-temperature channels
//!
//! Pure, stateless functions mapping a raw channel voltage to a
//! temperature in °C for the two supported sensor models. The raw value
//! is the voltage across the sensor while it is driven by a known
//! excitation current, so the resistance is recovered first and the
//! sensor model is inverted from there.
//!
//! # Sensor models
//!
//! - **Thermistor**: 4-coefficient Steinhart–Hart. Undefined for
//!   non-positive resistance (the logarithm has no real value), which is
//!   surfaced as [`DaqError::Domain`].
//! - **PT1000**: an inverted polynomial approximation. The term under the
//!   square root is clamped with an absolute value, so the function is
//!   total over finite inputs. Outside the sensor's calibrated range this
//!   silently yields a plausible-looking but physically meaningless
//!   number; the tolerance is intentional and kept (see DESIGN.md), the
//!   approximation is NOT an exact inverse of the RTD curve.
//!
//! Callers that need a sentinel instead of an error (e.g. the telemetry
//! store) substitute `f64::NAN`, which downstream consumers already treat
//! as a gap.

use crate::error::{DaqError, Result};
use crate::types::{CurrentSource, SensorKind};

/// Steinhart–Hart coefficients for the supported thermistor
const A_THERM: f64 = 3.354016e-3;
const B_THERM: f64 = 2.909670e-4;
const C_THERM: f64 = 1.632136e-6;
const D_THERM: f64 = 7.192200e-8;

/// Thermistor reference resistance in ohms
const THERM_R_REF: f64 = 1000.0;

/// Recover the sensor resistance in ohms from a measured voltage
///
/// The instrument may report the drop with either sign depending on
/// wiring, so the magnitude is used.
pub fn resistance(volts: f64, current: CurrentSource) -> f64 {
    volts.abs() / current.amps()
}

/// Convert a raw voltage to °C for the given sensor model
pub fn convert(volts: f64, current: CurrentSource, sensor: SensorKind) -> Result<f64> {
    let r = resistance(volts, current);
    match sensor {
        SensorKind::Thermistor => thermistor_celsius(r),
        SensorKind::Pt1000 => Ok(pt1000_celsius(r)),
    }
}

/// Invert the 4-coefficient Steinhart–Hart model for a thermistor
///
/// Fails with [`DaqError::Domain`] when `r <= 0`, where `ln(r / 1000)`
/// is undefined.
pub fn thermistor_celsius(r: f64) -> Result<f64> {
    if r <= 0.0 {
        return Err(DaqError::Domain(format!(
            "thermistor resistance must be positive, got {r}"
        )));
    }
    let ln_r = (r / THERM_R_REF).ln();
    let t_kelvin =
        1.0 / (A_THERM + B_THERM * ln_r + C_THERM * ln_r.powi(2) + D_THERM * ln_r.powi(3));
    Ok(t_kelvin - 273.15)
}

/// Invert the PT1000 polynomial approximation
///
/// The absolute value under the square root guards against a negative
/// domain for out-of-range resistances; the result is then an
/// approximation, not a physically exact inverse.
pub fn pt1000_celsius(r: f64) -> f64 {
    -0.287154 * (159_861_899.0 - 21_000.0 * r).abs().sqrt() + 3383.81
}
