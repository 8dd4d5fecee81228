//! Adaptive cross approximation
use crate::dense::{mult, mult_add_into};
use crate::types::RlstArray;
use num::{Float, Zero};
use rlst::{rlst_dynamic_array2, RandomAccessMut, RlstScalar, Shape};

/// A block stored as `U V` with `U` of shape `m x k` and `V` of shape `k x n`
pub struct LowRankBlock<T: RlstScalar> {
    u: RlstArray<T, 2>,
    v: RlstArray<T, 2>,
}

impl<T: RlstScalar> LowRankBlock<T> {
    /// Create from the columns of `U` and the rows of `V`
    fn from_vectors(nrows: usize, ncols: usize, us: &[Vec<T>], vs: &[Vec<T>]) -> Self {
        let rank = us.len();
        let mut u = rlst_dynamic_array2!(T, [nrows, rank]);
        let mut v = rlst_dynamic_array2!(T, [rank, ncols]);
        for (l, (ul, vl)) in us.iter().zip(vs).enumerate() {
            for (i, value) in ul.iter().enumerate() {
                *u.get_mut([i, l]).unwrap() = *value;
            }
            for (j, value) in vl.iter().enumerate() {
                *v.get_mut([l, j]).unwrap() = *value;
            }
        }
        Self { u, v }
    }

    /// Rank of the block
    pub fn rank(&self) -> usize {
        self.u.shape()[1]
    }

    /// Shape of the block
    pub fn shape(&self) -> [usize; 2] {
        [self.u.shape()[0], self.v.shape()[1]]
    }

    /// Number of stored scalars
    pub fn storage(&self) -> usize {
        self.rank() * (self.u.shape()[0] + self.v.shape()[1])
    }

    /// `y += U V x`
    pub fn apply(&self, x: &[T], y: &mut [T]) {
        let tmp = mult(&self.v, x);
        mult_add_into(&self.u, &tmp, y);
    }
}

fn dot<T: RlstScalar>(a: &[T], b: &[T]) -> T {
    a.iter()
        .zip(b)
        .fold(T::zero(), |acc, (x, y)| acc + x.conj() * *y)
}

fn norm_squared<T: RlstScalar>(a: &[T]) -> T::Real {
    a.iter()
        .fold(<T::Real as Zero>::zero(), |acc, x| acc + x.square())
}

/// Adaptive cross approximation of an `nrows x ncols` block with partial pivoting.
///
/// Rows and columns of the block are computed on demand by `row` and `column`.
/// Cross terms are added until `|u_k| |v_k| <= tolerance |S_k|`, where `S_k`
/// is the current approximation whose Frobenius norm is updated
/// incrementally. Rows that vanish are skipped.
///
/// Returns the estimate of the relative error reached if the rank budget runs out first.
pub fn aca<T: RlstScalar>(
    nrows: usize,
    ncols: usize,
    row: impl Fn(usize, &mut [T]),
    column: impl Fn(usize, &mut [T]),
    tolerance: T::Real,
    max_rank: usize,
) -> Result<LowRankBlock<T>, T::Real> {
    let mut us: Vec<Vec<T>> = vec![];
    let mut vs: Vec<Vec<T>> = vec![];
    let mut used = vec![false; nrows];
    let mut approx_norm_squared = <T::Real as Zero>::zero();
    let mut r = vec![T::zero(); ncols];
    let mut c = vec![T::zero(); nrows];
    let mut pivot_row = 0;
    let mut estimate = <T::Real as Float>::infinity();

    while us.len() < max_rank {
        used[pivot_row] = true;
        row(pivot_row, &mut r);
        for (ul, vl) in us.iter().zip(&vs) {
            let factor = ul[pivot_row];
            for (rj, vj) in r.iter_mut().zip(vl) {
                *rj -= factor * *vj;
            }
        }
        let (pivot_col, pivot_abs) = r
            .iter()
            .map(|x| x.abs())
            .enumerate()
            .fold((0, <T::Real as Zero>::zero()), |best, (j, a)| {
                if a > best.1 {
                    (j, a)
                } else {
                    best
                }
            });

        if pivot_abs == <T::Real as Zero>::zero() {
            // The residual row vanishes: try an unused row
            match used.iter().position(|u| !u) {
                Some(next) => {
                    pivot_row = next;
                    continue;
                }
                None => {
                    estimate = <T::Real as Zero>::zero();
                    break;
                }
            }
        }

        let pivot = r[pivot_col];
        let v = r.iter().map(|x| *x / pivot).collect::<Vec<_>>();
        column(pivot_col, &mut c);
        for (ul, vl) in us.iter().zip(&vs) {
            let factor = vl[pivot_col];
            for (ci, ui) in c.iter_mut().zip(ul) {
                *ci -= factor * *ui;
            }
        }
        let u = c.clone();

        let u_norm_squared = norm_squared(&u);
        let v_norm_squared = norm_squared(&v);
        let mut cross = <T::Real as Zero>::zero();
        for (ul, vl) in us.iter().zip(&vs) {
            cross += (dot(ul, &u) * dot(vl, &v)).re();
        }
        approx_norm_squared += cross + cross + u_norm_squared * v_norm_squared;
        let update = Float::sqrt(u_norm_squared * v_norm_squared);
        let approx_norm = Float::sqrt(Float::abs(approx_norm_squared));

        us.push(u);
        vs.push(v);

        estimate = if approx_norm > <T::Real as Zero>::zero() {
            update / approx_norm
        } else {
            <T::Real as Zero>::zero()
        };
        if estimate <= tolerance {
            break;
        }

        // Next pivot row: the largest entry of the new column among unused rows
        let last = &us[us.len() - 1];
        match (0..nrows).filter(|i| !used[*i]).fold(None, |best, i| {
            let a = last[i].abs();
            match best {
                Some((_, b)) if b >= a => best,
                _ => Some((i, a)),
            }
        }) {
            Some((i, _)) => pivot_row = i,
            None => {
                estimate = <T::Real as Zero>::zero();
                break;
            }
        }
    }

    if estimate <= tolerance {
        Ok(LowRankBlock::from_vectors(nrows, ncols, &us, &vs))
    } else {
        Err(estimate)
    }
}
