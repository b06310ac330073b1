//! Shared vector helpers.

use crate::error::{Error, Result};

#[inline]
pub(crate) fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[inline]
pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Euclidean distance accumulated in `f64`.
#[inline]
pub(crate) fn euclidean_f64(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Scale `v` to unit L2 norm. Zero vectors are left untouched.
pub(crate) fn normalize_in_place(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v {
            *x /= norm;
        }
    }
}

/// Copy rows into owned vectors, checking that every row has the same non-zero dimension.
pub(crate) fn to_matrix<V: AsRef<[f32]>>(rows: &[V]) -> Result<Vec<Vec<f32>>> {
    let first = rows.first().ok_or(Error::EmptyInput)?;
    let d = first.as_ref().len();
    if d == 0 {
        return Err(Error::InvalidParameter {
            name: "dimension",
            message: "must be at least 1",
        });
    }
    rows.iter()
        .map(|row| {
            let row = row.as_ref();
            if row.len() == d {
                Ok(row.to_vec())
            } else {
                Err(Error::DimensionMismatch {
                    expected: d,
                    found: row.len(),
                })
            }
        })
        .collect()
}
