//---------------------------------------------------------------------------//
// Copyright (c) 2017-2024 Ismael Gutiérrez González. All rights reserved.
//
// This file is part of the Rusted NIF Manager (RNIF) project,
// which can be found here: https://github.com/Frodo45127/rnif.
//
// This file is licensed under the MIT license, which can be found here:
// https://github.com/Frodo45127/rnif/blob/master/LICENSE.
//---------------------------------------------------------------------------//

//! Module with the linear-algebra extensions used by scene-graph transforms.
//!
//! Matrices follow the row-vector convention of the format: a point transforms as
//! `v' = v * M`, an affine 4x4 keeps its rotation in the upper-left 3x3 and its
//! translation in the fourth row, and transforms compose left-to-right
//! (`local * parent`).

use float_eq::float_eq;
use nalgebra::{Matrix3, Matrix4, Quaternion, Vector3};

use crate::error::{Result, RNifError};


/// Tolerance used for all floating point comparisons in the lib.
pub const EPSILON: f32 = 1e-4;

//---------------------------------------------------------------------------//
//                            Trait Definitions
//---------------------------------------------------------------------------//

/// Extensions over a 3x3 matrix for the rotation/scale checks the format needs.
pub trait Matrix33Ext {

    /// This function checks if the matrix is the identity, within [`EPSILON`].
    fn is_identity_eps(&self) -> bool;

    /// This function checks if the matrix is a rotation (orthogonal, determinant one), within [`EPSILON`].
    fn is_rotation(&self) -> bool;

    /// This function checks if the matrix is a uniform positive scale times a rotation, within [`EPSILON`].
    fn is_scale_rotation(&self) -> bool;

    /// This function returns the uniform scale of the matrix, as the signed cube root of its determinant.
    fn uniform_scale(&self) -> f32;

    /// This function decomposes the matrix into `(scale, rotation)`.
    ///
    /// It fails if the matrix is not a scale-rotation.
    fn scale_rotation(&self) -> Result<(f32, Matrix3<f32>)>;

    /// This function compares two matrices component-wise, within [`EPSILON`].
    fn approx_eq(&self, other: &Self) -> bool;
}

/// Extensions over a 4x4 affine matrix in row-vector convention.
pub trait Matrix44Ext {

    /// This function checks if the matrix is the identity, within [`EPSILON`].
    fn is_identity_eps(&self) -> bool;

    /// This function returns the upper-left 3x3 submatrix.
    fn matrix_33(&self) -> Matrix3<f32>;

    /// This function returns the translation row of the matrix.
    fn translation(&self) -> Vector3<f32>;

    /// This function builds an affine matrix from a scale, a rotation and a translation.
    fn from_scale_rotation_translation(scale: f32, rotation: &Matrix3<f32>, translation: &Vector3<f32>) -> Self;

    /// This function decomposes the matrix into `(scale, rotation, translation)`.
    ///
    /// It fails if the upper-left 3x3 submatrix is not a scale-rotation.
    fn scale_rotation_translation(&self) -> Result<(f32, Matrix3<f32>, Vector3<f32>)>;

    /// This function inverts the matrix assuming it's affine (`[[A, 0], [t, 1]]` with `A` a scale-rotation).
    ///
    /// It fails if the upper-left 3x3 submatrix is not a scale-rotation. For general
    /// matrices, use [`inverse_full`](Self::inverse_full) instead.
    fn inverse_fast(&self) -> Result<Matrix4<f32>>;

    /// This function inverts the matrix by Gaussian elimination, for matrices the fast path cannot handle.
    fn inverse_full(&self) -> Result<Matrix4<f32>>;

    /// This function compares two matrices component-wise, within [`EPSILON`].
    fn approx_eq(&self, other: &Self) -> bool;
}

/// Extensions over a quaternion, stored by the format in `(w, x, y, z)` order.
pub trait QuaternionExt {

    /// This function builds the rotation matrix equivalent to this quaternion.
    ///
    /// It fails if the quaternion is not of unit length, within [`EPSILON`].
    fn to_rotation(&self) -> Result<Matrix3<f32>>;

    /// This function builds the quaternion equivalent to a rotation matrix.
    fn from_rotation(rotation: &Matrix3<f32>) -> Result<Self> where Self: Sized;
}

//---------------------------------------------------------------------------//
//                              Implementations
//---------------------------------------------------------------------------//

impl Matrix33Ext for Matrix3<f32> {

    fn is_identity_eps(&self) -> bool {
        self.approx_eq(&Matrix3::identity())
    }

    fn is_rotation(&self) -> bool {
        (self * self.transpose()).is_identity_eps() && float_eq!(self.determinant(), 1.0, abs <= EPSILON)
    }

    fn is_scale_rotation(&self) -> bool {
        let scale = self.uniform_scale();
        if scale < EPSILON {
            return false;
        }

        (self / scale).is_rotation()
    }

    fn uniform_scale(&self) -> f32 {
        self.determinant().cbrt()
    }

    fn scale_rotation(&self) -> Result<(f32, Matrix3<f32>)> {
        if !self.is_scale_rotation() {
            return Err(RNifError::MathNotAScaleRotation);
        }

        let scale = self.uniform_scale();
        Ok((scale, self / scale))
    }

    fn approx_eq(&self, other: &Self) -> bool {
        self.iter().zip(other.iter()).all(|(a, b)| float_eq!(*a, *b, abs <= EPSILON))
    }
}

impl Matrix44Ext for Matrix4<f32> {

    fn is_identity_eps(&self) -> bool {
        self.approx_eq(&Matrix4::identity())
    }

    fn matrix_33(&self) -> Matrix3<f32> {
        self.fixed_view::<3, 3>(0, 0).into_owned()
    }

    fn translation(&self) -> Vector3<f32> {
        Vector3::new(self[(3, 0)], self[(3, 1)], self[(3, 2)])
    }

    fn from_scale_rotation_translation(scale: f32, rotation: &Matrix3<f32>, translation: &Vector3<f32>) -> Self {
        let mut matrix = Matrix4::identity();
        matrix.fixed_view_mut::<3, 3>(0, 0).copy_from(&(rotation * scale));
        matrix[(3, 0)] = translation.x;
        matrix[(3, 1)] = translation.y;
        matrix[(3, 2)] = translation.z;
        matrix
    }

    fn scale_rotation_translation(&self) -> Result<(f32, Matrix3<f32>, Vector3<f32>)> {
        let (scale, rotation) = self.matrix_33().scale_rotation()?;
        Ok((scale, rotation, self.translation()))
    }

    fn inverse_fast(&self) -> Result<Matrix4<f32>> {
        let (scale, rotation, translation) = self.scale_rotation_translation()?;

        // For an affine matrix, the inverse is [[A^-1, 0], [-t * A^-1, 1]],
        // with A^-1 being the transposed rotation over the scale.
        let inverse_33 = rotation.transpose() / scale;
        let inverse_translation = -(row_times_matrix(&translation, &inverse_33));
        Ok(Matrix4::from_scale_rotation_translation(scale.recip(), &rotation.transpose(), &inverse_translation))
    }

    fn inverse_full(&self) -> Result<Matrix4<f32>> {
        self.try_inverse().ok_or(RNifError::MathNotInvertible)
    }

    fn approx_eq(&self, other: &Self) -> bool {
        self.iter().zip(other.iter()).all(|(a, b)| float_eq!(*a, *b, abs <= EPSILON))
    }
}

impl QuaternionExt for Quaternion<f32> {

    fn to_rotation(&self) -> Result<Matrix3<f32>> {
        if !float_eq!(self.norm(), 1.0, abs <= EPSILON) {
            return Err(RNifError::MathNotAScaleRotation);
        }

        let (w, x, y, z) = (self.w, self.i, self.j, self.k);
        Ok(Matrix3::new(
            1.0 - 2.0 * (y * y + z * z), 2.0 * (x * y - z * w), 2.0 * (x * z + y * w),
            2.0 * (x * y + z * w), 1.0 - 2.0 * (x * x + z * z), 2.0 * (y * z - x * w),
            2.0 * (x * z - y * w), 2.0 * (y * z + x * w), 1.0 - 2.0 * (x * x + y * y),
        ).transpose())
    }

    fn from_rotation(rotation: &Matrix3<f32>) -> Result<Self> {
        if !rotation.is_rotation() {
            return Err(RNifError::MathNotAScaleRotation);
        }

        // Shepperd's method, branching on the largest diagonal term.
        let m = rotation.transpose();
        let trace = m[(0, 0)] + m[(1, 1)] + m[(2, 2)];
        let quat = if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Quaternion::new(s / 4.0, (m[(2, 1)] - m[(1, 2)]) / s, (m[(0, 2)] - m[(2, 0)]) / s, (m[(1, 0)] - m[(0, 1)]) / s)
        } else if m[(0, 0)] > m[(1, 1)] && m[(0, 0)] > m[(2, 2)] {
            let s = (1.0 + m[(0, 0)] - m[(1, 1)] - m[(2, 2)]).sqrt() * 2.0;
            Quaternion::new((m[(2, 1)] - m[(1, 2)]) / s, s / 4.0, (m[(0, 1)] + m[(1, 0)]) / s, (m[(0, 2)] + m[(2, 0)]) / s)
        } else if m[(1, 1)] > m[(2, 2)] {
            let s = (1.0 + m[(1, 1)] - m[(0, 0)] - m[(2, 2)]).sqrt() * 2.0;
            Quaternion::new((m[(0, 2)] - m[(2, 0)]) / s, (m[(0, 1)] + m[(1, 0)]) / s, s / 4.0, (m[(1, 2)] + m[(2, 1)]) / s)
        } else {
            let s = (1.0 + m[(2, 2)] - m[(0, 0)] - m[(1, 1)]).sqrt() * 2.0;
            Quaternion::new((m[(1, 0)] - m[(0, 1)]) / s, (m[(0, 2)] + m[(2, 0)]) / s, (m[(1, 2)] + m[(2, 1)]) / s, s / 4.0)
        };

        Ok(quat)
    }
}

/// This function multiplies a row vector by a matrix, in the row-vector convention.
pub fn row_times_matrix(row: &Vector3<f32>, matrix: &Matrix3<f32>) -> Vector3<f32> {
    matrix.transpose() * row
}
