//! Transmission (resonator) and stabilization (damper) operators.
//!
//! Both are stateless per call: they read their own parameters and mutate
//! only the cells they are handed.

use serde::{Deserialize, Serialize};

use crate::config::{
    ResonatorConfig, COEF_SUM_TOLERANCE, DAMPING_COEF, REFERENCE_WAVELENGTH_NM,
};
use crate::error::{MeshError, MeshResult};
use crate::simulation::cell::Cell;

/// Kind of wave carried by the resonator. Reported, not used numerically.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveType {
    PhotonA,
    PhotonB,
    #[default]
    Sinusoidal,
}

/// Wavelength-modulated coupling from a source cell to a target cell.
///
/// Invariants, checked at construction and on every adjustment:
/// `T + R = 1` within `COEF_SUM_TOLERANCE`, and `lambda` finite and > 0.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ResonatorRecord")]
pub struct Resonator {
    #[serde(rename = "T")]
    transmission: f64,
    #[serde(rename = "R")]
    reflection: f64,
    lambda: f64,
    wave_type: WaveType,
}

/// Unvalidated wire form of a resonator
#[derive(Deserialize)]
struct ResonatorRecord {
    #[serde(rename = "T")]
    transmission: f64,
    #[serde(rename = "R")]
    reflection: f64,
    lambda: f64,
    #[serde(default)]
    wave_type: WaveType,
}

impl TryFrom<ResonatorRecord> for Resonator {
    type Error = MeshError;

    fn try_from(record: ResonatorRecord) -> MeshResult<Self> {
        Resonator::new(
            record.transmission,
            record.reflection,
            record.lambda,
            record.wave_type,
        )
    }
}

impl Resonator {
    pub fn new(
        transmission: f64,
        reflection: f64,
        lambda: f64,
        wave_type: WaveType,
    ) -> MeshResult<Self> {
        validate_coefficients(transmission, reflection)?;
        validate_wavelength(lambda)?;
        Ok(Self {
            transmission,
            reflection,
            lambda,
            wave_type,
        })
    }

    pub fn from_config(config: &ResonatorConfig) -> MeshResult<Self> {
        Self::new(
            config.transmission,
            config.reflection,
            config.lambda_nm,
            config.wave_type,
        )
    }

    pub fn transmission(&self) -> f64 {
        self.transmission
    }

    pub fn reflection(&self) -> f64 {
        self.reflection
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn wave_type(&self) -> WaveType {
        self.wave_type
    }

    /// Reference wavelength over the configured wavelength
    pub fn wavelength_factor(&self) -> f64 {
        REFERENCE_WAVELENGTH_NM / self.lambda
    }

    /// Replace T and R. On error the current coefficients are kept.
    pub fn set_coefficients(&mut self, transmission: f64, reflection: f64) -> MeshResult<()> {
        validate_coefficients(transmission, reflection)?;
        self.transmission = transmission;
        self.reflection = reflection;
        Ok(())
    }

    /// Replace lambda. On error the current wavelength is kept.
    pub fn set_wavelength(&mut self, lambda: f64) -> MeshResult<()> {
        validate_wavelength(lambda)?;
        self.lambda = lambda;
        Ok(())
    }

    /// Move energy from `source` into `target`.
    ///
    /// `target.amplitude += T * (500 / lambda) * source.amplitude * (1 + source.q)`,
    /// then `source.amplitude *= R`. A negative `q` may shrink or flip the
    /// transmitted amount.
    pub fn transmit(&self, source: &mut Cell, target: &mut Cell) {
        let modulator = 1.0 + source.q();
        let transmitted =
            self.transmission * self.wavelength_factor() * source.amplitude * modulator;
        target.amplitude += transmitted;
        source.amplitude *= self.reflection;
    }
}

impl Default for Resonator {
    fn default() -> Self {
        let config = ResonatorConfig::default();
        Self {
            transmission: config.transmission,
            reflection: config.reflection,
            lambda: config.lambda_nm,
            wave_type: config.wave_type,
        }
    }
}

fn validate_coefficients(transmission: f64, reflection: f64) -> MeshResult<()> {
    let sum = transmission + reflection;
    if !sum.is_finite() || (sum - 1.0).abs() > COEF_SUM_TOLERANCE {
        return Err(MeshError::CoefficientSum {
            t: transmission,
            r: reflection,
        });
    }
    Ok(())
}

fn validate_wavelength(lambda: f64) -> MeshResult<()> {
    if !(lambda.is_finite() && lambda > 0.0) {
        return Err(MeshError::InvalidWavelength(lambda));
    }
    Ok(())
}

/// Geometric amplitude decay: removes a fixed fraction per application.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Damper {
    coef: f64,
}

impl Damper {
    pub fn new(coef: f64) -> MeshResult<Self> {
        if !(0.0..=1.0).contains(&coef) {
            return Err(MeshError::InvalidDamping(coef));
        }
        Ok(Self { coef })
    }

    pub fn coef(&self) -> f64 {
        self.coef
    }

    pub fn stabilize(&self, cell: &mut Cell) {
        cell.amplitude -= self.coef * cell.amplitude;
    }
}

impl Default for Damper {
    fn default() -> Self {
        Self {
            coef: DAMPING_COEF,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_transmission_reference_case() {
        let resonator = Resonator::new(0.6, 0.4, 600.0, WaveType::Sinusoidal).unwrap();
        let mut a = Cell::with_state(0, 0, 1.0, 0.0, 0.1);
        let mut b = Cell::new(0, 0);

        resonator.transmit(&mut a, &mut b);

        assert!((resonator.wavelength_factor() - 500.0 / 600.0).abs() < EPS);
        assert!((b.amplitude - 0.55).abs() < 1e-9, "got {}", b.amplitude);
        assert!((a.amplitude - 0.4).abs() < EPS);
    }

    #[test]
    fn test_transmission_is_directional() {
        let resonator = Resonator::default();
        let mut a = Cell::with_state(0, 0, 1.0, 0.0, 0.0);
        let mut b = Cell::with_state(0, 0, 0.0, 0.0, 0.0);
        resonator.transmit(&mut b, &mut a);
        assert_eq!(a.amplitude, 1.0);
        assert_eq!(b.amplitude, 0.0);
    }

    #[test]
    fn test_transmission_monotone_for_non_negative_inputs() {
        let resonator = Resonator::new(0.7, 0.3, 450.0, WaveType::PhotonA).unwrap();
        for &(amp, q, target) in &[(0.0, 0.0, 0.0), (2.5, 0.3, -1.0), (0.1, 4.0, 3.0)] {
            let mut a = Cell::with_state(0, 0, amp, 0.0, q);
            let mut b = Cell::with_state(0, 0, target, 0.0, 0.0);
            resonator.transmit(&mut a, &mut b);
            assert!(b.amplitude >= target);
            assert_eq!(a.amplitude, 0.3 * amp);
        }
    }

    #[test]
    fn test_negative_q_flips_transmission() {
        let resonator = Resonator::default();
        let mut a = Cell::with_state(0, 0, 1.0, 0.0, -2.0);
        let mut b = Cell::new(0, 0);
        resonator.transmit(&mut a, &mut b);
        assert!(b.amplitude < 0.0);
    }

    #[test]
    fn test_coefficients_must_sum_to_one() {
        assert!(matches!(
            Resonator::new(0.6, 0.5, 600.0, WaveType::Sinusoidal),
            Err(MeshError::CoefficientSum { .. })
        ));
        assert!(Resonator::new(0.6, 0.4 + 5e-7, 600.0, WaveType::Sinusoidal).is_ok());
        assert!(Resonator::new(f64::NAN, 0.4, 600.0, WaveType::Sinusoidal).is_err());
    }

    #[test]
    fn test_rejected_adjustment_keeps_coefficients() {
        let mut resonator = Resonator::default();
        assert!(resonator.set_coefficients(0.9, 0.2).is_err());
        assert_eq!(resonator.transmission(), 0.6);
        assert_eq!(resonator.reflection(), 0.4);

        resonator.set_coefficients(0.75, 0.25).unwrap();
        assert_eq!(resonator.transmission(), 0.75);
        assert_eq!(resonator.reflection(), 0.25);
    }

    #[test]
    fn test_non_positive_wavelength_rejected() {
        for lambda in [0.0, -600.0, f64::INFINITY, f64::NAN] {
            assert!(matches!(
                Resonator::new(0.6, 0.4, lambda, WaveType::Sinusoidal),
                Err(MeshError::InvalidWavelength(_))
            ));
        }
        let mut resonator = Resonator::default();
        assert!(resonator.set_wavelength(0.0).is_err());
        assert_eq!(resonator.lambda(), 600.0);
        resonator.set_wavelength(500.0).unwrap();
        assert_eq!(resonator.wavelength_factor(), 1.0);
    }

    #[test]
    fn test_damper_reference_case() {
        let damper = Damper::new(0.3).unwrap();
        let mut cell = Cell::with_state(0, 0, 0.55, 0.0, 0.0);
        damper.stabilize(&mut cell);
        assert!((cell.amplitude - 0.385).abs() < 1e-9);
    }

    #[test]
    fn test_damper_shrinks_magnitude() {
        let damper = Damper::default();
        for amp in [1.0, -3.0, 1e-9, -0.2] {
            let mut cell = Cell::with_state(0, 0, amp, 0.0, 0.0);
            damper.stabilize(&mut cell);
            assert!(cell.amplitude.abs() < amp.abs());
            assert_eq!(cell.amplitude.signum(), amp.signum());
        }
    }

    #[test]
    fn test_damper_zero_is_fixed_point() {
        let damper = Damper::default();
        let mut cell = Cell::new(0, 0);
        for _ in 0..10 {
            damper.stabilize(&mut cell);
            assert_eq!(cell.amplitude, 0.0);
        }
    }

    #[test]
    fn test_damper_range() {
        assert!(Damper::new(-0.1).is_err());
        assert!(Damper::new(1.5).is_err());
        assert!(Damper::new(f64::NAN).is_err());
        assert!(Damper::new(0.0).is_ok());
    }

    #[test]
    fn test_resonator_document_keys() {
        let value = serde_json::to_value(Resonator::default()).unwrap();
        assert_eq!(value["T"], 0.6);
        assert_eq!(value["R"], 0.4);
        assert_eq!(value["lambda"], 600.0);
        assert_eq!(value["wave_type"], "sinusoidal");
    }

    #[test]
    fn test_document_parse_is_validated() {
        let ok: Resonator =
            serde_json::from_str(r#"{"T": 0.5, "R": 0.5, "lambda": 700.0, "wave_type": "photon_b"}"#)
                .unwrap();
        assert_eq!(ok.wave_type(), WaveType::PhotonB);
        assert!(serde_json::from_str::<Resonator>(r#"{"T": 0.5, "R": 0.6, "lambda": 700.0}"#).is_err());
        assert!(serde_json::from_str::<Resonator>(r#"{"T": 0.5, "R": 0.5, "lambda": 0.0}"#).is_err());
    }
}
