//! # Binary Quadratic Model
//!
//! Objective over spin (`±1`) or binary (`0/1`) variables:
//!
//! ```text
//! E(v) = offset + Σ_i a_i v_i + Σ_{i<j} b_ij v_i v_j
//! ```
//!
//! Quadratic biases are stored once per unordered pair under the key
//! `(min(i, j), max(i, j))`, so lookups are symmetric by construction.
//!
//! ## Example
//!
//! ```rust
//! use comp_core::bqm::{BinaryQuadraticModel, Vartype};
//!
//! let mut bqm = BinaryQuadraticModel::new(2, Vartype::Spin);
//! bqm.add_linear(0, -1.0).unwrap();
//! bqm.add_quadratic(1, 0, 0.5).unwrap();
//! assert_eq!(bqm.quadratic(0, 1), bqm.quadratic(1, 0));
//! assert_eq!(bqm.energy(&[1, -1]).unwrap(), -1.5);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Variable domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Vartype {
    /// `{-1, +1}`
    Spin,
    /// `{0, 1}`
    Binary,
}

impl Vartype {
    pub fn contains(&self, value: i8) -> bool {
        match self {
            Vartype::Spin => value == -1 || value == 1,
            Vartype::Binary => value == 0 || value == 1,
        }
    }

    /// The two admissible values, low first.
    pub fn values(&self) -> [i8; 2] {
        match self {
            Vartype::Spin => [-1, 1],
            Vartype::Binary => [0, 1],
        }
    }
}

impl fmt::Display for Vartype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vartype::Spin => f.write_str("SPIN"),
            Vartype::Binary => f.write_str("BINARY"),
        }
    }
}

/// One pairwise coupling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub u: usize,
    pub v: usize,
    pub bias: f64,
}

/// Dense-indexed binary quadratic model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BqmRepr", into = "BqmRepr")]
pub struct BinaryQuadraticModel {
    vartype: Vartype,
    linear: Vec<f64>,
    quadratic: BTreeMap<(usize, usize), f64>,
    offset: f64,
}

impl BinaryQuadraticModel {
    /// Model over `num_variables` variables with all biases zero.
    pub fn new(num_variables: usize, vartype: Vartype) -> Self {
        Self {
            vartype,
            linear: vec![0.0; num_variables],
            quadratic: BTreeMap::new(),
            offset: 0.0,
        }
    }

    /// Build a SPIN model from Ising fields and couplings.
    pub fn from_ising<I>(h: Vec<f64>, j: I, offset: f64) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let mut bqm = Self {
            vartype: Vartype::Spin,
            linear: h,
            quadratic: BTreeMap::new(),
            offset,
        };
        for (u, v, bias) in j {
            bqm.add_quadratic(u, v, bias)?;
        }
        Ok(bqm)
    }

    pub fn vartype(&self) -> Vartype {
        self.vartype
    }

    pub fn num_variables(&self) -> usize {
        self.linear.len()
    }

    /// Number of stored (nonzero or explicitly added) couplings.
    pub fn num_interactions(&self) -> usize {
        self.quadratic.len()
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn linear(&self, i: usize) -> f64 {
        self.linear.get(i).copied().unwrap_or(0.0)
    }

    pub fn linear_biases(&self) -> &[f64] {
        &self.linear
    }

    /// Coupling between `i` and `j`; symmetric, 0 when absent or `i == j`.
    pub fn quadratic(&self, i: usize, j: usize) -> f64 {
        if i == j {
            return 0.0;
        }
        self.quadratic.get(&key(i, j)).copied().unwrap_or(0.0)
    }

    /// Iterate couplings with `u < v`.
    pub fn interactions(&self) -> impl Iterator<Item = Interaction> + '_ {
        self.quadratic
            .iter()
            .map(|(&(u, v), &bias)| Interaction { u, v, bias })
    }

    pub fn add_linear(&mut self, i: usize, bias: f64) -> Result<()> {
        self.check_index(i)?;
        self.linear[i] += bias;
        Ok(())
    }

    /// Accumulate a coupling. A self-coupling `i == i` is folded into the
    /// offset for spins (`s² = 1`) and into the linear bias for binaries
    /// (`x² = x`).
    pub fn add_quadratic(&mut self, i: usize, j: usize, bias: f64) -> Result<()> {
        self.check_index(i)?;
        self.check_index(j)?;
        if i == j {
            match self.vartype {
                Vartype::Spin => self.offset += bias,
                Vartype::Binary => self.linear[i] += bias,
            }
            return Ok(());
        }
        *self.quadratic.entry(key(i, j)).or_insert(0.0) += bias;
        Ok(())
    }

    pub fn add_offset(&mut self, bias: f64) {
        self.offset += bias;
    }

    /// Objective value of one sample.
    pub fn energy(&self, sample: &[i8]) -> Result<f64> {
        if sample.len() != self.num_variables() {
            return Err(Error::shape("BinaryQuadraticModel::energy", self.num_variables(), sample.len()));
        }
        if let Some((variable, &value)) = sample
            .iter()
            .enumerate()
            .find(|(_, v)| !self.vartype.contains(**v))
        {
            return Err(Error::InvalidSample { variable, value });
        }
        Ok(self.energy_unchecked(sample))
    }

    pub(crate) fn energy_unchecked(&self, sample: &[i8]) -> f64 {
        let linear: f64 = self
            .linear
            .iter()
            .zip(sample)
            .map(|(a, &v)| a * f64::from(v))
            .sum();
        let quadratic: f64 = self
            .quadratic
            .iter()
            .map(|(&(u, v), b)| b * f64::from(sample[u]) * f64::from(sample[v]))
            .sum();
        self.offset + linear + quadratic
    }

    /// Copy of this model in the requested vartype. Energies of
    /// corresponding samples (`s = 2x - 1`) are identical.
    pub fn change_vartype(&self, vartype: Vartype) -> Self {
        match (self.vartype, vartype) {
            (Vartype::Spin, Vartype::Binary) => self.spin_to_binary(),
            (Vartype::Binary, Vartype::Spin) => self.binary_to_spin(),
            _ => self.clone(),
        }
    }

    pub fn to_spin(&self) -> Self {
        self.change_vartype(Vartype::Spin)
    }

    pub fn to_binary(&self) -> Self {
        self.change_vartype(Vartype::Binary)
    }

    fn spin_to_binary(&self) -> Self {
        let mut linear: Vec<f64> = self.linear.iter().map(|h| 2.0 * h).collect();
        let mut offset = self.offset - self.linear.iter().sum::<f64>();
        let mut quadratic = BTreeMap::new();
        for (&(u, v), &j) in &self.quadratic {
            quadratic.insert((u, v), 4.0 * j);
            linear[u] -= 2.0 * j;
            linear[v] -= 2.0 * j;
            offset += j;
        }
        Self { vartype: Vartype::Binary, linear, quadratic, offset }
    }

    fn binary_to_spin(&self) -> Self {
        let mut linear: Vec<f64> = self.linear.iter().map(|a| a / 2.0).collect();
        let mut offset = self.offset + self.linear.iter().sum::<f64>() / 2.0;
        let mut quadratic = BTreeMap::new();
        for (&(u, v), &q) in &self.quadratic {
            quadratic.insert((u, v), q / 4.0);
            linear[u] += q / 4.0;
            linear[v] += q / 4.0;
            offset += q / 4.0;
        }
        Self { vartype: Vartype::Spin, linear, quadratic, offset }
    }

    /// Symmetric dense coefficient matrix: linear biases on the diagonal,
    /// each coupling split evenly over `(i, j)` and `(j, i)`.
    ///
    /// For a BINARY model `xᵀQx + offset` reproduces the energy.
    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        let n = self.num_variables();
        let mut q = vec![vec![0.0; n]; n];
        for (i, &a) in self.linear.iter().enumerate() {
            q[i][i] = a;
        }
        for (&(u, v), &b) in &self.quadratic {
            q[u][v] = b / 2.0;
            q[v][u] = b / 2.0;
        }
        q
    }

    /// Multiply every bias and the offset by `factor`.
    pub fn scale(&mut self, factor: f64) {
        self.linear.iter_mut().for_each(|a| *a *= factor);
        self.quadratic.values_mut().for_each(|b| *b *= factor);
        self.offset *= factor;
    }

    /// Per-variable neighbour lists, used by samplers for O(degree) updates.
    pub fn adjacency(&self) -> Vec<Vec<(usize, f64)>> {
        let mut adj = vec![Vec::new(); self.num_variables()];
        for (&(u, v), &b) in &self.quadratic {
            adj[u].push((v, b));
            adj[v].push((u, b));
        }
        adj
    }

    fn check_index(&self, i: usize) -> Result<()> {
        if i >= self.num_variables() {
            return Err(Error::InvalidParameter(format!(
                "variable {} out of range for model with {} variables",
                i,
                self.num_variables()
            )));
        }
        Ok(())
    }
}

fn key(i: usize, j: usize) -> (usize, usize) {
    if i < j {
        (i, j)
    } else {
        (j, i)
    }
}

/// Serialised form: couplings as a flat list.
#[derive(Serialize, Deserialize)]
struct BqmRepr {
    vartype: Vartype,
    linear: Vec<f64>,
    quadratic: Vec<Interaction>,
    offset: f64,
}

impl From<BinaryQuadraticModel> for BqmRepr {
    fn from(bqm: BinaryQuadraticModel) -> Self {
        let quadratic = bqm.interactions().collect();
        Self {
            vartype: bqm.vartype,
            linear: bqm.linear,
            quadratic,
            offset: bqm.offset,
        }
    }
}

impl TryFrom<BqmRepr> for BinaryQuadraticModel {
    type Error = Error;

    fn try_from(repr: BqmRepr) -> Result<Self> {
        let mut bqm = Self {
            vartype: repr.vartype,
            linear: repr.linear,
            quadratic: BTreeMap::new(),
            offset: repr.offset,
        };
        for Interaction { u, v, bias } in repr.quadratic {
            bqm.add_quadratic(u, v, bias)?;
        }
        Ok(bqm)
    }
}
