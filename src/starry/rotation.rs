//! # Rotation of spherical-harmonic maps
//!
//! A rigid rotation never mixes degrees, so it acts on a coefficient vector as
//! a block-diagonal matrix with one `(2l+1)×(2l+1)` block `D_l` per degree
//! (the real Wigner-D matrices).
//!
//! ## Construction
//!
//! Each block is obtained from the action of the rotation on a fixed set of
//! sample directions `qᵢ`:
//!
//! ```text
//! B_l[i, m] = Y_lm(qᵢ)          (depends on l only, pseudo-inverse cached)
//! C_l[i, m] = Y_lm(Rᵀ qᵢ)
//! D_l       = B_l⁺ · C_l
//! ```
//!
//! Because the degree-`l` subspace is invariant under rotations, `C_l = B_l D_l`
//! holds exactly and the least-squares solve recovers `D_l` to round-off.
//!
//! Spin about the map pole is a rotation about `z` and needs no table: the
//! `(m, −m)` pairs mix with `cos mα` and `sin mα` ([`spin_coefficients`]).
use nalgebra::{DMatrix, DVector, Rotation3, Vector3};

use crate::{
    keplight_errors::KeplightError,
    starry::ylm::{evaluate, Monomial},
};

const PSEUDO_INVERSE_EPS: f64 = 1e-12;

/// Quasi-uniform directions on the unit sphere (Fibonacci lattice).
pub fn fibonacci_sphere(count: usize) -> Vec<Vector3<f64>> {
    let golden_angle = std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
    (0..count)
        .map(|i| {
            let z = 1.0 - (2.0 * i as f64 + 1.0) / count as f64;
            let radius = (1.0 - z * z).sqrt();
            let (sin_phi, cos_phi) = (golden_angle * i as f64).sin_cos();
            Vector3::new(radius * cos_phi, radius * sin_phi, z)
        })
        .collect()
}

/// Cached sampling tables shared by every rotation of a given `l_max`.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationSampler {
    points: Vec<Vector3<f64>>,
    pseudo_inverses: Vec<DMatrix<f64>>,
}

impl RotationSampler {
    pub fn new(table: &[Vec<Monomial>], l_max: usize) -> Result<Self, KeplightError> {
        let points = fibonacci_sphere(2 * (2 * l_max + 1) + 8);
        let pseudo_inverses = (0..=l_max)
            .map(|l| {
                let samples = degree_samples(table, l, points.iter().copied());
                samples.pseudo_inverse(PSEUDO_INVERSE_EPS).map_err(|err| {
                    KeplightError::SingularBasisTransform(format!(
                        "rotation samples for degree {l}: {err}"
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            points,
            pseudo_inverses,
        })
    }

    pub fn l_max(&self) -> usize {
        self.pseudo_inverses.len() - 1
    }

    /// Operator of the map rotation `I'(v) = I(Rᵀ v)`.
    pub fn operator(&self, table: &[Vec<Monomial>], rotation: &Rotation3<f64>) -> RotationOperator {
        let inverse = rotation.inverse();
        let blocks = self
            .pseudo_inverses
            .iter()
            .enumerate()
            .map(|(l, pinv)| {
                let rotated = degree_samples(table, l, self.points.iter().map(|q| inverse * q));
                pinv * rotated
            })
            .collect();
        RotationOperator { blocks }
    }
}

/// `Y_lm(qᵢ)` for one degree, one row per direction.
fn degree_samples<I>(table: &[Vec<Monomial>], l: usize, points: I) -> DMatrix<f64>
where
    I: Iterator<Item = Vector3<f64>>,
{
    let offset = l * l;
    let width = 2 * l + 1;
    let rows: Vec<Vec<f64>> = points
        .map(|q| {
            table[offset..offset + width]
                .iter()
                .map(|poly| evaluate(poly, &q))
                .collect()
        })
        .collect();
    DMatrix::from_fn(rows.len(), width, |i, m| rows[i][m])
}

/// Block-diagonal rotation of a coefficient vector.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationOperator {
    blocks: Vec<DMatrix<f64>>,
}

impl RotationOperator {
    pub fn identity(l_max: usize) -> Self {
        Self {
            blocks: (0..=l_max)
                .map(|l| DMatrix::identity(2 * l + 1, 2 * l + 1))
                .collect(),
        }
    }

    pub fn l_max(&self) -> usize {
        self.blocks.len() - 1
    }

    pub fn block(&self, l: usize) -> Option<&DMatrix<f64>> {
        self.blocks.get(l)
    }

    /// Rotate a coefficient vector of degree up to `l_max`; higher degrees are left unchanged.
    pub fn apply(&self, coefficients: &DVector<f64>) -> DVector<f64> {
        let mut rotated = coefficients.clone();
        for (l, block) in self.blocks.iter().enumerate() {
            let offset = l * l;
            let width = 2 * l + 1;
            if offset + width > coefficients.len() {
                break;
            }
            let segment = block * coefficients.rows(offset, width);
            rotated.rows_mut(offset, width).copy_from(&segment);
        }
        rotated
    }

    /// `self ∘ other`: apply `other` first.
    pub fn compose(&self, other: &RotationOperator) -> RotationOperator {
        RotationOperator {
            blocks: self
                .blocks
                .iter()
                .zip(&other.blocks)
                .map(|(a, b)| a * b)
                .collect(),
        }
    }
}

/// Rotate the map by `angle` about its `+z` pole.
pub fn spin_coefficients(coefficients: &DVector<f64>, angle: f64) -> DVector<f64> {
    let mut spun = coefficients.clone();
    let degrees = (coefficients.len() as f64).sqrt() as usize;
    for l in 1..degrees {
        let center = l * l + l;
        for m in 1..=l {
            let (sin_ma, cos_ma) = (m as f64 * angle).sin_cos();
            let c = coefficients[center + m];
            let s = coefficients[center - m];
            spun[center + m] = c * cos_ma - s * sin_ma;
            spun[center - m] = c * sin_ma + s * cos_ma;
        }
    }
    spun
}

#[cfg(test)]
mod rotation_test {
    use super::*;
    use crate::starry::ylm::{basis_size, ylm_index, ylm_table};
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    fn unit(l_max: usize, l: usize, m: i64) -> DVector<f64> {
        let mut v = DVector::zeros(basis_size(l_max));
        v[ylm_index(l, m)] = 1.0;
        v
    }

    #[test]
    fn test_quarter_turn_about_x() {
        let l_max = 3;
        let table = ylm_table(l_max);
        let sampler = RotationSampler::new(&table, l_max).unwrap();
        let rotation = Rotation3::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2);
        let operator = sampler.operator(&table, &rotation);
        let rotated = operator.apply(&unit(l_max, 1, 0));
        assert_abs_diff_eq!(rotated, unit(l_max, 1, -1), epsilon = 1e-12);
    }

    #[test]
    fn test_blocks_are_orthogonal() {
        let l_max = 6;
        let table = ylm_table(l_max);
        let sampler = RotationSampler::new(&table, l_max).unwrap();
        let rotation = Rotation3::from_euler_angles(0.3, -1.1, 2.2);
        let operator = sampler.operator(&table, &rotation);
        for l in 0..=l_max {
            let block = operator.block(l).unwrap();
            let product = block.transpose() * block;
            assert_abs_diff_eq!(
                product,
                DMatrix::<f64>::identity(2 * l + 1, 2 * l + 1),
                epsilon = 1e-10
            );
        }
    }

    #[test]
    fn test_rotated_map_matches_rotated_directions() {
        let l_max = 4;
        let table = ylm_table(l_max);
        let sampler = RotationSampler::new(&table, l_max).unwrap();
        let rotation = Rotation3::from_euler_angles(-0.4, 0.9, 0.25);
        let operator = sampler.operator(&table, &rotation);

        let coefficients = DVector::from_fn(basis_size(l_max), |n, _| (n as f64 * 0.37).sin());
        let rotated = operator.apply(&coefficients);
        let map = |c: &DVector<f64>, v: &Vector3<f64>| -> f64 {
            table.iter().zip(c.iter()).map(|(p, c)| c * evaluate(p, v)).sum()
        };
        for v in fibonacci_sphere(15) {
            assert_abs_diff_eq!(
                map(&rotated, &v),
                map(&coefficients, &(rotation.inverse() * v)),
                epsilon = 1e-11
            );
        }
    }

    #[test]
    fn test_spin_matches_rotation_about_pole() {
        let l_max = 5;
        let table = ylm_table(l_max);
        let sampler = RotationSampler::new(&table, l_max).unwrap();
        let angle = 0.83;
        let operator = sampler.operator(&table, &Rotation3::from_axis_angle(&Vector3::z_axis(), angle));
        let coefficients = DVector::from_fn(basis_size(l_max), |n, _| 1.0 / (n as f64 + 1.0));
        assert_abs_diff_eq!(
            spin_coefficients(&coefficients, angle),
            operator.apply(&coefficients),
            epsilon = 1e-11
        );
    }

    #[test]
    fn test_compose() {
        let l_max = 3;
        let table = ylm_table(l_max);
        let sampler = RotationSampler::new(&table, l_max).unwrap();
        let a = Rotation3::from_axis_angle(&Vector3::x_axis(), 0.4);
        let b = Rotation3::from_axis_angle(&Vector3::y_axis(), -0.7);
        let composed = sampler.operator(&table, &a).compose(&sampler.operator(&table, &b));
        let direct = sampler.operator(&table, &(a * b));
        for l in 0..=l_max {
            assert_abs_diff_eq!(
                composed.block(l).unwrap(),
                direct.block(l).unwrap(),
                epsilon = 1e-11
            );
        }
        let identity = RotationOperator::identity(l_max);
        let v = DVector::from_fn(basis_size(l_max), |n, _| n as f64);
        assert_eq!(identity.apply(&v), v);
    }
}
