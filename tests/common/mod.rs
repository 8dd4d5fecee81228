//! Helpers shared by the integration tests
#![allow(dead_code)]
use bempp_nystrom::traits::LinearOperator;
use bempp_nystrom::types::Result;

/// `A + shift I` for a square operator
pub struct Shifted<'a, Op: LinearOperator<T = f64>> {
    pub operator: &'a Op,
    pub shift: f64,
}

impl<Op: LinearOperator<T = f64>> LinearOperator for Shifted<'_, Op> {
    type T = f64;

    fn shape(&self) -> [usize; 2] {
        self.operator.shape()
    }

    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<()> {
        self.operator.apply(x, y)?;
        for (yi, xi) in y.iter_mut().zip(x) {
            *yi += self.shift * xi;
        }
        Ok(())
    }
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Solve `A x = b` by GMRES restarted every `restart` iterations.
///
/// Returns the solution and the number of iterations, or `None` if the
/// relative residual did not fall below `tolerance` in `max_iterations`.
pub fn gmres<Op: LinearOperator<T = f64>>(
    operator: &Op,
    b: &[f64],
    tolerance: f64,
    restart: usize,
    max_iterations: usize,
) -> Option<(Vec<f64>, usize)> {
    let n = b.len();
    let b_norm = norm(b);
    let mut x = vec![0.0; n];
    if b_norm == 0.0 {
        return Some((x, 0));
    }
    let mut iterations = 0;

    while iterations < max_iterations {
        let mut r = operator.apply_vec(&x).ok()?;
        for (ri, bi) in r.iter_mut().zip(b) {
            *ri = bi - *ri;
        }
        let beta = norm(&r);
        if beta <= tolerance * b_norm {
            return Some((x, iterations));
        }

        let mut basis = vec![r.iter().map(|v| v / beta).collect::<Vec<_>>()];
        let mut h = vec![vec![0.0; restart]; restart + 1];
        let mut cs = vec![0.0; restart];
        let mut sn = vec![0.0; restart];
        let mut g = vec![0.0; restart + 1];
        g[0] = beta;

        let mut k = 0;
        while k < restart && iterations < max_iterations {
            let mut w = operator.apply_vec(&basis[k]).ok()?;
            for (i, v) in basis.iter().enumerate() {
                h[i][k] = dot(&w, v);
                for (wj, vj) in w.iter_mut().zip(v) {
                    *wj -= h[i][k] * vj;
                }
            }
            h[k + 1][k] = norm(&w);

            for i in 0..k {
                let t = cs[i] * h[i][k] + sn[i] * h[i + 1][k];
                h[i + 1][k] = -sn[i] * h[i][k] + cs[i] * h[i + 1][k];
                h[i][k] = t;
            }
            let d = (h[k][k] * h[k][k] + h[k + 1][k] * h[k + 1][k]).sqrt();
            cs[k] = h[k][k] / d;
            sn[k] = h[k + 1][k] / d;
            h[k][k] = d;
            h[k + 1][k] = 0.0;
            g[k + 1] = -sn[k] * g[k];
            g[k] *= cs[k];

            let next = normalized(&w);
            basis.push(next);
            iterations += 1;
            k += 1;
            if g[k].abs() <= tolerance * b_norm {
                break;
            }
        }

        let mut y = vec![0.0; k];
        for i in (0..k).rev() {
            y[i] = (g[i] - (i + 1..k).map(|j| h[i][j] * y[j]).sum::<f64>()) / h[i][i];
        }
        for (v, yi) in basis.iter().zip(&y) {
            for (xj, vj) in x.iter_mut().zip(v) {
                *xj += yi * vj;
            }
        }
        if g[k].abs() <= tolerance * b_norm {
            return Some((x, iterations));
        }
    }
    None
}

fn normalized(w: &[f64]) -> Vec<f64> {
    let size = norm(w);
    if size == 0.0 {
        vec![0.0; w.len()]
    } else {
        w.iter().map(|v| v / size).collect()
    }
}

/// Relative difference in the 2-norm
pub fn relative_difference(a: &[f64], b: &[f64]) -> f64 {
    let diff = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>();
    (diff / dot(b, b)).sqrt()
}
