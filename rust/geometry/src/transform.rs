// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Placement transforms
//!
//! A [`TransformData`] is one resolved placement: its matrix plus a weak
//! reference to the placement entity that produced it. Two transforms are the
//! same only if they were produced by the same live entity; matrices are never
//! compared, so numerically equal but distinct placements stay distinct.

use ifc_shape_core::{same_entity, EntityRef, WeakEntityRef};
use nalgebra::{Matrix4, Vector3};
use std::rc::Rc;

/// Tolerance used for identity-matrix detection
const IDENTITY_EPS: f64 = 1e-12;

/// One coordinate-system placement
#[derive(Debug, Clone)]
pub struct TransformData {
    pub matrix: Matrix4<f64>,
    pub placement_entity: Option<WeakEntityRef>,
    /// Tag of the placement entity, -1 if none
    pub placement_tag: i32,
}

impl TransformData {
    pub fn new(matrix: Matrix4<f64>, placement_entity: Option<WeakEntityRef>, placement_tag: i32) -> Self {
        Self {
            matrix,
            placement_entity,
            placement_tag,
        }
    }

    /// Transform resolved from a live placement entity
    pub fn from_entity(matrix: Matrix4<f64>, entity: &EntityRef) -> Self {
        Self::new(matrix, Some(Rc::downgrade(entity)), entity.tag())
    }

    /// Transform with no entity behind it; never equal to any other transform
    pub fn anonymous(matrix: Matrix4<f64>) -> Self {
        Self::new(matrix, None, -1)
    }

    /// Live placement entity, if any
    pub fn placement(&self) -> Option<EntityRef> {
        self.placement_entity.as_ref().and_then(|w| w.upgrade())
    }

    /// True iff both transforms reference the same live placement entity
    pub fn is_same_transform(&self, other: &TransformData) -> bool {
        match (self.placement(), other.placement()) {
            (Some(a), Some(b)) => same_entity(&a, &b),
            _ => false,
        }
    }
}

/// Check whether a matrix is the identity within a small tolerance
pub fn is_matrix_identity(matrix: &Matrix4<f64>) -> bool {
    matrix
        .iter()
        .zip(Matrix4::<f64>::identity().iter())
        .all(|(a, b)| (a - b).abs() <= IDENTITY_EPS)
}

/// True if the matrix changes handedness (e.g. mirroring).
///
/// Sign of the triple product of the first three column vectors.
pub fn flips_handedness(matrix: &Matrix4<f64>) -> bool {
    let c0 = Vector3::new(matrix[(0, 0)], matrix[(1, 0)], matrix[(2, 0)]);
    let c1 = Vector3::new(matrix[(0, 1)], matrix[(1, 1)], matrix[(2, 1)]);
    let c2 = Vector3::new(matrix[(0, 2)], matrix[(1, 2)], matrix[(2, 2)]);
    c0.cross(&c1).dot(&c2) < 0.0
}

/// `target = matrix_to_append * target`
#[inline]
pub fn premult_matrix(matrix_to_append: &Matrix4<f64>, target: &mut Matrix4<f64>) {
    *target = matrix_to_append * *target;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifc_shape_core::GenericEntity;

    #[test]
    fn test_same_transform_by_entity_identity() {
        let placement = GenericEntity::new(10, "IFCLOCALPLACEMENT", vec![]).into_ref();
        let other = GenericEntity::new(10, "IFCLOCALPLACEMENT", vec![]).into_ref();

        let a = TransformData::from_entity(Matrix4::identity(), &placement);
        let b = TransformData::from_entity(Matrix4::new_scaling(2.0), &placement);
        let c = TransformData::from_entity(Matrix4::identity(), &other);

        // same entity, different matrices
        assert!(a.is_same_transform(&b));
        // equal matrices and tags, distinct entities
        assert!(!a.is_same_transform(&c));
    }

    #[test]
    fn test_transform_without_entity_never_equal() {
        let a = TransformData::anonymous(Matrix4::identity());
        let b = a.clone();
        assert!(!a.is_same_transform(&b));
        assert_eq!(a.placement_tag, -1);
    }

    #[test]
    fn test_expired_entity_never_equal() {
        let placement = GenericEntity::new(3, "IFCLOCALPLACEMENT", vec![]).into_ref();
        let a = TransformData::from_entity(Matrix4::identity(), &placement);
        let b = a.clone();
        assert!(a.is_same_transform(&b));

        drop(placement);
        assert!(!a.is_same_transform(&b));
    }

    #[test]
    fn test_identity_and_handedness() {
        assert!(is_matrix_identity(&Matrix4::identity()));
        assert!(!is_matrix_identity(&Matrix4::new_translation(&Vector3::new(0.0, 0.0, 1e-3))));

        let mirror = Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, 1.0, 1.0));
        assert!(flips_handedness(&mirror));
        assert!(!flips_handedness(&Matrix4::new_scaling(3.0)));

        let mut target = Matrix4::new_scaling(2.0);
        premult_matrix(&Matrix4::new_translation(&Vector3::new(1.0, 0.0, 0.0)), &mut target);
        assert_eq!(target[(0, 3)], 1.0);
        assert_eq!(target[(0, 0)], 2.0);
    }
}
