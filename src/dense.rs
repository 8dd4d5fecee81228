//! Products with dense rlst matrices
use crate::types::RlstArray;
use rlst::{
    rlst_array_from_slice1, rlst_array_from_slice_mut1, MultInto, RlstScalar, Shape, TransMode,
};

/// Compute `y += A x`
pub(crate) fn mult_add_into<T: RlstScalar>(a: &RlstArray<T, 2>, x: &[T], y: &mut [T]) {
    let [m, n] = a.shape();
    debug_assert!(x.len() == n && y.len() == m);
    if m == 0 || n == 0 {
        return;
    }
    let x = rlst_array_from_slice1!(x, [n]);
    let y = rlst_array_from_slice_mut1!(y, [m]);
    y.mult_into(
        TransMode::NoTrans,
        TransMode::NoTrans,
        T::one(),
        a.view(),
        x,
        T::one(),
    );
}

/// Compute `A x` into a new vector
pub(crate) fn mult<T: RlstScalar>(a: &RlstArray<T, 2>, x: &[T]) -> Vec<T> {
    let mut y = vec![T::zero(); a.shape()[0]];
    mult_add_into(a, x, &mut y);
    y
}

#[cfg(test)]
mod test {
    extern crate blas_src;
    extern crate lapack_src;

    use super::*;
    use rlst::{c64, rlst_dynamic_array2, RandomAccessMut};

    #[test]
    fn test_mult_add_into() {
        let mut a = rlst_dynamic_array2!(f64, [2, 3]);
        for (index, value) in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0].iter().enumerate() {
            *a.get_mut([index % 2, index / 2]).unwrap() = *value;
        }
        let mut y = vec![1.0, 1.0];
        mult_add_into(&a, &[1.0, 0.0, 2.0], &mut y);
        // Columns are (1, 2), (3, 4), (5, 6)
        assert_eq!(y, vec![12.0, 15.0]);
        assert_eq!(mult(&a, &[0.0, 1.0, 0.0]), vec![3.0, 4.0]);
    }

    #[test]
    fn test_complex_product() {
        let mut a = rlst_dynamic_array2!(c64, [1, 2]);
        *a.get_mut([0, 0]).unwrap() = c64::new(0.0, 1.0);
        *a.get_mut([0, 1]).unwrap() = c64::new(2.0, 0.0);
        let y = mult(&a, &[c64::new(1.0, 1.0), c64::new(0.0, 1.0)]);
        assert_eq!(y, vec![c64::new(-1.0, 3.0)]);
    }

    #[test]
    fn test_empty_matrix() {
        let a = rlst_dynamic_array2!(f64, [3, 0]);
        let mut y = vec![1.0; 3];
        mult_add_into(&a, &[], &mut y);
        assert_eq!(y, vec![1.0; 3]);
    }
}
