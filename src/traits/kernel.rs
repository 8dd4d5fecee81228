//! Kernels
use crate::types::{RealScalar, SingularEvaluation, Singularity, ValueShape};
use num::Zero;
use rlst::RlstScalar;

/// Fundamental solution of a PDE.
///
/// Values are stored row-major: a tensor kernel with `d` components writes
/// entry `(i, j)` to `result[i * d + j]`. Fluxes have one more index, the
/// direction `k` in space, and store component `c` of the value in
/// `result[c * space_dimension + k]`. For scalar kernels the flux is the
/// gradient; for Stokes kernels it is the stress tensor whose contraction with
/// a normal gives the double layer.
///
/// All evaluations are pure and may be called concurrently. They return
/// [SingularEvaluation] when target and source coincide.
pub trait Kernel: Sync {
    /// Scalar type of the values
    type T: RlstScalar<Real = Self::Real> + Send + Sync;
    /// Type of coordinates
    type Real: RealScalar;

    /// Dimension of the physical space
    fn space_dimension(&self) -> usize;

    /// Shape of a single value
    fn value_shape(&self) -> ValueShape;

    /// Singularity of the value at coincident points
    fn singularity(&self) -> Singularity;

    /// Evaluate the kernel at target x due to source y
    fn evaluate(
        &self,
        target: &[Self::Real],
        source: &[Self::Real],
        result: &mut [Self::T],
    ) -> Result<(), SingularEvaluation>;

    /// Evaluate the flux with respect to the source point
    fn evaluate_source_flux(
        &self,
        target: &[Self::Real],
        source: &[Self::Real],
        result: &mut [Self::T],
    ) -> Result<(), SingularEvaluation>;

    /// Evaluate the flux with respect to the target point
    fn evaluate_target_flux(
        &self,
        target: &[Self::Real],
        source: &[Self::Real],
        result: &mut [Self::T],
    ) -> Result<(), SingularEvaluation>;

    /// Evaluate the derivative in the direction of a normal at the source point
    fn evaluate_source_normal_derivative(
        &self,
        target: &[Self::Real],
        source: &[Self::Real],
        normal: &[Self::Real],
        result: &mut [Self::T],
    ) -> Result<(), SingularEvaluation> {
        let dim = self.space_dimension();
        let mut flux = [<Self::T as Zero>::zero(); 27];
        let size = self.value_shape().size();
        self.evaluate_source_flux(target, source, &mut flux[..size * dim])?;
        contract(&flux[..size * dim], normal, &mut result[..size]);
        Ok(())
    }

    /// Evaluate the derivative in the direction of a normal at the target point
    fn evaluate_target_normal_derivative(
        &self,
        target: &[Self::Real],
        source: &[Self::Real],
        normal: &[Self::Real],
        result: &mut [Self::T],
    ) -> Result<(), SingularEvaluation> {
        let dim = self.space_dimension();
        let mut flux = [<Self::T as Zero>::zero(); 27];
        let size = self.value_shape().size();
        self.evaluate_target_flux(target, source, &mut flux[..size * dim])?;
        contract(&flux[..size * dim], normal, &mut result[..size]);
        Ok(())
    }

    /// Can this kernel be used with interpolation based far-field expansions?
    fn supports_expansion(&self) -> bool {
        true
    }

    /// The value on a smooth closed boundary of the double layer potential of the constant density.
    ///
    /// For tensor kernels the value is a multiple of the identity. `None` if the
    /// kernel has no such identity.
    fn double_layer_identity(&self) -> Option<Self::T> {
        None
    }
}

/// Contract the trailing index of a flux with a normal
fn contract<T: RlstScalar>(flux: &[T], normal: &[T::Real], result: &mut [T]) {
    let dim = normal.len();
    for (r, f) in result.iter_mut().zip(flux.chunks_exact(dim)) {
        *r = f
            .iter()
            .zip(normal)
            .fold(T::zero(), |acc, (v, n)| acc + v.mul_real(*n));
    }
}

/// A boundary layer operator built from a kernel.
///
/// The value for a pair of points may depend on normals at both points. Layer
/// kernels are resolved statically when an operator is assembled.
///
/// For far-field expansions every layer kernel factorises as
/// `L(n_x) H(x, y) R(n_y)` where `H` is smooth away from `x = y` and depends
/// only on the positions. `H` has [LayerKernel::expansion_shape] rows and
/// columns; `L` and `R` are small matrices that only depend on one normal.
/// All three are stored row-major.
pub trait LayerKernel: Sync {
    /// Scalar type of the values
    type T: RlstScalar<Real = Self::Real> + Send + Sync;
    /// Type of coordinates
    type Real: RealScalar;

    /// Dimension of the physical space
    fn space_dimension(&self) -> usize;

    /// Shape of a single value
    fn value_shape(&self) -> ValueShape;

    /// Singularity of the value at coincident points
    fn singularity(&self) -> Singularity;

    /// Does the value depend on the normal at the target?
    fn uses_target_normal(&self) -> bool;

    /// Evaluate the operator kernel for one pair of points
    fn evaluate(
        &self,
        target: &[Self::Real],
        target_normal: &[Self::Real],
        source: &[Self::Real],
        source_normal: &[Self::Real],
        result: &mut [Self::T],
    ) -> Result<(), SingularEvaluation>;

    /// Value of this operator applied to the constant density on a smooth closed boundary.
    fn double_layer_identity(&self) -> Option<Self::T> {
        None
    }

    /// Does the underlying kernel support far-field expansions?
    fn supports_expansion(&self) -> bool;

    /// Number of rows and columns of `H`
    fn expansion_shape(&self) -> [usize; 2];

    /// Evaluate `H(x, y)`
    fn evaluate_expansion(
        &self,
        target: &[Self::Real],
        source: &[Self::Real],
        result: &mut [Self::T],
    ) -> Result<(), SingularEvaluation>;

    /// Evaluate `L(n_x)`, a `components x rows` matrix
    fn expansion_left(&self, target_normal: &[Self::Real], result: &mut [Self::T]);

    /// Evaluate `R(n_y)`, a `cols x components` matrix
    fn expansion_right(&self, source_normal: &[Self::Real], result: &mut [Self::T]);
}
