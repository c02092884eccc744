//! Interpolation within a small regular grid of pixel centres.
//!
//! Values are indexed `[row, col]`, with `ys[row]` and `xs[col]` giving the
//! node coordinates. Coordinates must be strictly monotonic along each axis.
//!
//! The polynomial modes interpolate along each axis with a Lagrange polynomial
//! through the nodes closest to the point (2 for linear, 4 for cubic, 6 for
//! quintic), falling back to fewer nodes near the edge of the neighbourhood.
//! Every mode but `Mean` returns the node value exactly when the point is on
//! a node.
//!
//! Between nodes the results are tensor-product values. They are not those of
//! scattered-data interpolators that triangulate the neighbourhood (such as
//! `scipy.interpolate.griddata`): a linear result here is bilinear, not
//! piecewise planar, and the cubic modes differ likewise.

use std::str::FromStr;

use ndarray::ArrayView2;

use crate::errors::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpMode {
    /// Mean of the non-NaN neighbourhood values.
    Mean,
    #[default]
    Linear,
    Cubic,
    Quintic,
    Nearest,
}

impl InterpMode {
    /// Number of nodes used along each axis by the polynomial modes.
    fn nodes(&self) -> usize {
        match self {
            InterpMode::Linear => 2,
            InterpMode::Cubic => 4,
            InterpMode::Quintic => 6,
            InterpMode::Mean | InterpMode::Nearest => 1,
        }
    }
}

impl FromStr for InterpMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mean" => Ok(InterpMode::Mean),
            "linear" => Ok(InterpMode::Linear),
            "cubic" => Ok(InterpMode::Cubic),
            "quintic" => Ok(InterpMode::Quintic),
            "nearest" => Ok(InterpMode::Nearest),
            _ => Err(Error::InvalidMode {
                what: "interpolation mode",
                value: s.to_string(),
                expected: "mean, linear, cubic, quintic, nearest",
            }),
        }
    }
}

/// Interpolate `values` at `(x, y)`.
pub fn interpolate(
    xs: &[f64],
    ys: &[f64],
    values: ArrayView2<'_, f64>,
    x: f64,
    y: f64,
    mode: InterpMode,
) -> Result<f64> {
    if values.dim() != (ys.len(), xs.len()) {
        return Err(Error::ShapeMismatch {
            expected: vec![ys.len(), xs.len()],
            actual: values.shape().to_vec(),
        });
    }
    if values.is_empty() {
        return Err(Error::BadArgument("empty neighbourhood".to_string()));
    }

    match mode {
        InterpMode::Mean => {
            let valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
            if valid.is_empty() {
                return Err(Error::BadArgument("no valid value in neighbourhood".to_string()));
            }
            Ok(valid.iter().sum::<f64>() / valid.len() as f64)
        }
        InterpMode::Nearest => {
            let col = nearest_node(xs, x);
            let row = nearest_node(ys, y);
            Ok(values[[row, col]])
        }
        _ => {
            check_inside(xs, x, "x")?;
            check_inside(ys, y, "y")?;
            let (col0, wx) = lagrange_weights(xs, x, mode.nodes());
            let (row0, wy) = lagrange_weights(ys, y, mode.nodes());
            let mut sum = 0.0;
            for (i, wy) in wy.iter().enumerate().filter(|(_, w)| **w != 0.0) {
                for (j, wx) in wx.iter().enumerate().filter(|(_, w)| **w != 0.0) {
                    sum += wy * wx * values[[row0 + i, col0 + j]];
                }
            }
            Ok(sum)
        }
    }
}

fn nearest_node(nodes: &[f64], v: f64) -> usize {
    let mut best = 0;
    for (i, node) in nodes.iter().enumerate() {
        if (node - v).abs() < (nodes[best] - v).abs() {
            best = i;
        }
    }
    best
}

fn check_inside(nodes: &[f64], v: f64, axis: &str) -> Result<()> {
    let (lo, hi) = match (nodes.first(), nodes.last()) {
        (Some(&a), Some(&b)) => (a.min(b), a.max(b)),
        _ => return Err(Error::BadArgument("empty neighbourhood".to_string())),
    };
    if !(lo..=hi).contains(&v) {
        return Err(Error::BadArgument(format!(
            "{axis}={v} is outside of the neighbourhood [{lo}, {hi}]"
        )));
    }
    Ok(())
}

/// First node index and Lagrange weights of the `k` nodes closest to `v`.
fn lagrange_weights(nodes: &[f64], v: f64, k: usize) -> (usize, Vec<f64>) {
    let n = nodes.len();
    let k = k.min(n).max(1);
    // index of the interval holding v, nodes may be descending
    let ascending = n < 2 || nodes[1] > nodes[0];
    let below = nodes
        .iter()
        .take_while(|&&node| if ascending { node <= v } else { node >= v })
        .count()
        .saturating_sub(1);
    let start = (below as isize - (k as isize / 2 - 1)).clamp(0, (n - k) as isize) as usize;
    let window = &nodes[start..start + k];

    if let Some(hit) = window.iter().position(|&node| node == v) {
        let mut weights = vec![0.0; k];
        weights[hit] = 1.0;
        return (start, weights);
    }
    let weights = (0..k)
        .map(|i| {
            (0..k)
                .filter(|&j| j != i)
                .map(|j| (v - window[j]) / (window[i] - window[j]))
                .product()
        })
        .collect();
    (start, weights)
}
