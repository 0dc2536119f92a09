// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis-aligned bounding boxes in f64 precision

use nalgebra::{Matrix4, Point3, Vector3};

/// Axis-aligned bounding box; starts empty and grows by union
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl BoundingBox {
    /// Create new box initialized to the empty state
    pub fn new() -> Self {
        Self {
            min: Point3::new(f64::MAX, f64::MAX, f64::MAX),
            max: Point3::new(f64::MIN, f64::MIN, f64::MIN),
        }
    }

    /// Zero-extent box around a single point
    pub fn from_point(point: Point3<f64>) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Self {
        let mut bbox = Self::new();
        for p in points {
            bbox.expand(p);
        }
        bbox
    }

    /// Check if no point has been added yet
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand box to include a point
    #[inline]
    pub fn expand(&mut self, p: &Point3<f64>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Grow to include `other`; empty boxes are ignored
    #[inline]
    pub fn union(&mut self, other: &BoundingBox) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = *other;
            return;
        }
        self.expand(&other.min);
        self.expand(&other.max);
    }

    /// Center of the box (origin if empty)
    pub fn center(&self) -> Point3<f64> {
        if self.is_empty() {
            return Point3::origin();
        }
        Point3::from((self.min.coords + self.max.coords) * 0.5)
    }

    /// Half size along each axis (zero if empty)
    pub fn extent(&self) -> Vector3<f64> {
        if self.is_empty() {
            return Vector3::zeros();
        }
        (self.max - self.min) * 0.5
    }

    /// Move the box so its center lands on `matrix * center`, keeping the extent.
    ///
    /// Only exact for translation-only matrices; rotated placements keep the
    /// local extent.
    pub fn relocated(&self, matrix: &Matrix4<f64>) -> Self {
        if self.is_empty() {
            return *self;
        }
        let center = matrix.transform_point(&self.center());
        let extent = self.extent();
        Self {
            min: center - extent,
            max: center + extent,
        }
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new()
    }
}
