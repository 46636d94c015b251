//! Symbol alphabets and their spin encoding
//!
//! Every alphabet here is square and amplitude modulated, so each real
//! dimension of a symbol is an odd integer level that can be written as a
//! weighted sum of spins:
//!
//! ```text
//! BPSK / QPSK : a = s0                   a ∈ {±1}
//! 16-QAM      : a = 2·s0 + s1            a ∈ {±1, ±3}
//! 64-QAM      : a = 4·s0 + 2·s1 + s2     a ∈ {±1, ±3, ±5, ±7}
//! ```
//!
//! BPSK is real-only: one spin per transmitter. The other alphabets use the
//! real-valued system `[Re v; Im v]`, and spin `k·n_real + i` carries bit
//! `k` of real amplitude `i`.

use std::fmt;
use std::str::FromStr;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::matrix::ChannelMatrix;

/// Supported modulations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Modulation {
    #[default]
    #[serde(rename = "BPSK")]
    Bpsk,
    #[serde(rename = "QPSK")]
    Qpsk,
    #[serde(rename = "16QAM")]
    Qam16,
    #[serde(rename = "64QAM")]
    Qam64,
}

impl Modulation {
    pub const ALL: [Modulation; 4] = [
        Modulation::Bpsk,
        Modulation::Qpsk,
        Modulation::Qam16,
        Modulation::Qam64,
    ];

    /// Bits (spins) per real dimension.
    pub fn bits_per_dimension(&self) -> usize {
        match self {
            Modulation::Bpsk | Modulation::Qpsk => 1,
            Modulation::Qam16 => 2,
            Modulation::Qam64 => 3,
        }
    }

    /// True when symbols carry an imaginary component.
    pub fn is_complex(&self) -> bool {
        !matches!(self, Modulation::Bpsk)
    }

    pub fn bits_per_symbol(&self) -> usize {
        if self.is_complex() {
            2 * self.bits_per_dimension()
        } else {
            1
        }
    }

    /// Number of real dimensions for `num_transmitters` symbols.
    pub fn real_dimensions(&self, num_transmitters: usize) -> usize {
        if self.is_complex() {
            2 * num_transmitters
        } else {
            num_transmitters
        }
    }

    /// Number of spins needed to encode `num_transmitters` symbols.
    pub fn num_spins(&self, num_transmitters: usize) -> usize {
        self.real_dimensions(num_transmitters) * self.bits_per_dimension()
    }

    /// Largest amplitude level per real dimension.
    pub fn max_level(&self) -> i32 {
        (1 << self.bits_per_dimension()) - 1
    }

    /// Odd amplitude levels of one real dimension, ascending.
    pub fn levels(&self) -> Vec<f64> {
        let max = self.max_level();
        (-max..=max).step_by(2).map(f64::from).collect()
    }

    /// All constellation points (unnormalised).
    pub fn constellation(&self) -> Vec<Complex64> {
        let levels = self.levels();
        if !self.is_complex() {
            return levels.into_iter().map(|l| Complex64::new(l, 0.0)).collect();
        }
        levels
            .iter()
            .flat_map(|&re| levels.iter().map(move |&im| Complex64::new(re, im)))
            .collect()
    }

    /// Mean symbol energy over the constellation.
    pub fn average_energy(&self) -> f64 {
        let points = self.constellation();
        points.iter().map(|p| p.norm_sqr()).sum::<f64>() / points.len() as f64
    }

    /// Nearest amplitude level for one real dimension.
    ///
    /// Returns `None` when `value` sits exactly on a decision boundary
    /// (including 0), leaving the tie-break to the caller.
    pub fn slice_level(&self, value: f64) -> Option<f64> {
        let max = f64::from(self.max_level());
        // Boundaries are the even integers between odd levels.
        if value.abs() < max && value % 2.0 == 0.0 {
            return None;
        }
        Some((2.0 * (value / 2.0).floor() + 1.0).clamp(-max, max))
    }

    /// Amplitude matrix `A` mapping spins to real amplitudes (`a = A·s`).
    pub fn amplitude_matrix(&self, n_real: usize) -> ChannelMatrix {
        let b = self.bits_per_dimension();
        let mut a = ChannelMatrix::zeros(n_real, n_real * b);
        for k in 0..b {
            let weight = f64::from(1u32 << (b - 1 - k));
            for i in 0..n_real {
                a.set(i, k * n_real + i, Complex64::new(weight, 0.0));
            }
        }
        a
    }

    /// Decode a spin assignment into transmitted symbols.
    pub fn spins_to_symbols(&self, spins: &[i8], num_transmitters: usize) -> Result<Vec<Complex64>> {
        let expected = self.num_spins(num_transmitters);
        if spins.len() != expected {
            return Err(Error::shape("Modulation::spins_to_symbols", expected, spins.len()));
        }
        let n_real = self.real_dimensions(num_transmitters);
        let b = self.bits_per_dimension();
        let mut amplitudes = vec![0.0; n_real];
        for (idx, &s) in spins.iter().enumerate() {
            if s != 1 && s != -1 {
                return Err(Error::InvalidSample { variable: idx, value: s });
            }
            let (k, i) = (idx / n_real, idx % n_real);
            amplitudes[i] += f64::from(1u32 << (b - 1 - k)) * f64::from(s);
        }
        Ok(if self.is_complex() {
            (0..num_transmitters)
                .map(|t| Complex64::new(amplitudes[t], amplitudes[t + num_transmitters]))
                .collect()
        } else {
            amplitudes.into_iter().map(|a| Complex64::new(a, 0.0)).collect()
        })
    }

    /// Encode transmitted symbols as spins; inverse of [`Self::spins_to_symbols`].
    pub fn symbols_to_spins(&self, symbols: &[Complex64]) -> Result<Vec<i8>> {
        let amplitudes: Vec<f64> = if self.is_complex() {
            symbols.iter().map(|z| z.re).chain(symbols.iter().map(|z| z.im)).collect()
        } else {
            if let Some(z) = symbols.iter().find(|z| z.im != 0.0) {
                return Err(Error::InvalidInput(format!("BPSK symbol {} has an imaginary part", z)));
            }
            symbols.iter().map(|z| z.re).collect()
        };

        let n_real = amplitudes.len();
        let b = self.bits_per_dimension();
        let mut spins = vec![0i8; n_real * b];
        for (i, &a) in amplitudes.iter().enumerate() {
            if !a.is_finite() {
                return Err(Error::InvalidInput(format!("non-finite amplitude {}", a)));
            }
            let mut remaining = a;
            for k in 0..b {
                let weight = f64::from(1u32 << (b - 1 - k));
                let s: i8 = if remaining > 0.0 { 1 } else { -1 };
                spins[k * n_real + i] = s;
                remaining -= weight * f64::from(s);
            }
            if remaining.abs() > 1e-9 {
                return Err(Error::InvalidInput(format!(
                    "amplitude {} is not a {} level",
                    a, self
                )));
            }
        }
        Ok(spins)
    }
}

impl fmt::Display for Modulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Modulation::Bpsk => "BPSK",
            Modulation::Qpsk => "QPSK",
            Modulation::Qam16 => "16QAM",
            Modulation::Qam64 => "64QAM",
        };
        f.write_str(name)
    }
}

impl FromStr for Modulation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().replace('-', "").as_str() {
            "BPSK" => Ok(Modulation::Bpsk),
            "QPSK" => Ok(Modulation::Qpsk),
            "16QAM" | "QAM16" => Ok(Modulation::Qam16),
            "64QAM" | "QAM64" => Ok(Modulation::Qam64),
            _ => Err(Error::UnsupportedModulation(s.to_string())),
        }
    }
}
