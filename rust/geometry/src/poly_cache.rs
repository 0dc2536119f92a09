// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tolerance-aware vertex deduplication
//!
//! [`PolyInputCache3D`] hands out vertex indices for a [`PolyhedronData`]
//! being built, reusing an existing index when a point lies within `eps` of
//! one already added. Lookup goes through three chained ordered maps
//! (x → y → z). On every level the nearest key at or above the query and the
//! key just below it are compared, and the closer one is taken if it is within
//! `eps`. Unlike a fixed grid this has no cell-boundary artifacts.

use crate::input::PolyhedronData;
use crate::settings::EPS_MERGE_DISABLED;
use nalgebra::{Point2, Point3};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Totally ordered f64 map key
#[derive(Debug, Clone, Copy)]
struct CoordKey(f64);

impl PartialEq for CoordKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CoordKey {}

impl PartialOrd for CoordKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CoordKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

type ZMap = BTreeMap<CoordKey, usize>;
type YMap = BTreeMap<CoordKey, ZMap>;
type XMap = BTreeMap<CoordKey, YMap>;

/// Nearest key to `value` among the lower bound and its predecessor, if within `eps`.
///
/// Equidistant candidates resolve to the predecessor on every level.
fn nearest_key<V>(map: &BTreeMap<CoordKey, V>, value: f64, eps: f64) -> Option<CoordKey> {
    let low = map.range(CoordKey(value)..).next().map(|(k, _)| *k);
    let prev = map.range(..CoordKey(value)).next_back().map(|(k, _)| *k);

    let best = match (prev, low) {
        (None, None) => return None,
        (Some(p), None) => p,
        (None, Some(l)) => l,
        (Some(p), Some(l)) => {
            if (value - p.0).abs() <= (l.0 - value).abs() {
                p
            } else {
                l
            }
        }
    };
    if (best.0 - value).abs() <= eps {
        Some(best)
    } else {
        None
    }
}

/// Vertex cache feeding a [`PolyhedronData`]
#[derive(Debug, Clone)]
pub struct PolyInputCache3D {
    eps: f64,
    poly_data: PolyhedronData,
    existing_vertices: XMap,
}

impl PolyInputCache3D {
    /// Create a cache; `eps <= 1e-16` disables merging
    pub fn new(eps: f64) -> Self {
        Self {
            eps,
            poly_data: PolyhedronData::new(),
            existing_vertices: XMap::new(),
        }
    }

    #[inline]
    pub fn eps(&self) -> f64 {
        self.eps
    }

    /// Index of `point`, reusing a vertex within `eps`
    pub fn add_point(&mut self, point: &Point3<f64>) -> usize {
        self.add_point_inner(point, None)
    }

    /// Like [`add_point`](Self::add_point); the uv is stored only for new vertices
    pub fn add_point_with_uv(&mut self, point: &Point3<f64>, uv: &Point2<f64>) -> usize {
        self.add_point_inner(point, Some(uv))
    }

    fn add_point_inner(&mut self, point: &Point3<f64>, uv: Option<&Point2<f64>>) -> usize {
        let eps = self.eps;
        let poly = &mut self.poly_data;

        if eps <= EPS_MERGE_DISABLED {
            return push_vertex(poly, point, uv);
        }

        let Some(kx) = nearest_key(&self.existing_vertices, point.x, eps) else {
            let index = push_vertex(poly, point, uv);
            self.existing_vertices
                .entry(CoordKey(point.x))
                .or_default()
                .entry(CoordKey(point.y))
                .or_default()
                .insert(CoordKey(point.z), index);
            return index;
        };
        let Some(map_yz) = self.existing_vertices.get_mut(&kx) else {
            return push_vertex(poly, point, uv);
        };

        let Some(ky) = nearest_key(map_yz, point.y, eps) else {
            let index = push_vertex(poly, point, uv);
            map_yz
                .entry(CoordKey(point.y))
                .or_default()
                .insert(CoordKey(point.z), index);
            return index;
        };
        let Some(map_z) = map_yz.get_mut(&ky) else {
            return push_vertex(poly, point, uv);
        };

        if let Some(kz) = nearest_key(map_z, point.z, eps) {
            if let Some(&existing) = map_z.get(&kz) {
                return existing;
            }
        }
        let index = push_vertex(poly, point, uv);
        map_z.insert(CoordKey(point.z), index);
        index
    }

    /// Drop the lookup structure and all faces; vertices stay in the buffer
    pub fn clear_all_data(&mut self) {
        self.poly_data.clear_faces();
        self.existing_vertices.clear();
    }

    #[inline]
    pub fn poly_data(&self) -> &PolyhedronData {
        &self.poly_data
    }

    #[inline]
    pub fn poly_data_mut(&mut self) -> &mut PolyhedronData {
        &mut self.poly_data
    }

    pub fn into_poly_data(self) -> PolyhedronData {
        self.poly_data
    }
}

impl Default for PolyInputCache3D {
    fn default() -> Self {
        Self::new(-1.0)
    }
}

fn push_vertex(poly: &mut PolyhedronData, point: &Point3<f64>, uv: Option<&Point2<f64>>) -> usize {
    match uv {
        Some(uv) => poly.vertices.add_vertex_with_uv(*point, *uv),
        None => poly.vertices.add_vertex(*point),
    }
}
