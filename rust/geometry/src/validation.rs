// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh validation and repair
//!
//! Two levels are checked:
//! - raw [`PolyhedronData`] before it becomes a mesh
//!   ([`check_polyhedron_data`], [`fix_polyhedron_data`])
//! - a built [`MeshSet`] ([`check_mesh_set_validity`]), reporting open edges,
//!   zero-area faces, degenerate and fin edges and broken half-edge links.
//!
//! Defects are reported, never panicked on.

use crate::error::{Error, Result};
use crate::input::PolyhedronData;
use crate::keys::{EdgeKey, FaceKey};
use crate::mesh::{newell_normal, MeshSet};
use crate::poly_cache::PolyInputCache3D;
use crate::settings::GeomProcessingParams;
use nalgebra::Point3;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt::Write as _;

/// Surface-area comparison tolerance for [`MeshSetInfo::is_equal`]
const EPS_SURFACE_AREA: f64 = 1e-12;

/// Tri-state mesh set quality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshSetValidity {
    Valid,
    /// Defective but structurally intact (e.g. open or with sliver faces)
    InvalidUsable,
    /// Broken links, no faces or too many edges per face
    InvalidUnusable,
}

/// Result of [`check_mesh_set_validity`]
#[derive(Debug, Clone)]
pub struct MeshSetInfo {
    pub num_closed_edges: usize,
    pub num_open_edges: usize,
    pub num_faces: usize,
    pub zero_area_faces: FxHashSet<FaceKey>,
    pub degenerate_edges: FxHashSet<EdgeKey>,
    pub fin_edges: FxHashSet<EdgeKey>,
    pub fin_faces: FxHashSet<FaceKey>,
    pub surface_area: f64,
    pub all_pointers_valid: bool,
    pub mesh_set_valid: bool,
    pub max_num_edges_exceeded: bool,
    pub max_number_of_edges_per_face: usize,
    pub details: String,
    /// Tag of the entity the mesh was built for, -1 if unknown
    pub entity_tag: i32,
}

impl Default for MeshSetInfo {
    fn default() -> Self {
        Self {
            num_closed_edges: 0,
            num_open_edges: 0,
            num_faces: 0,
            zero_area_faces: FxHashSet::default(),
            degenerate_edges: FxHashSet::default(),
            fin_edges: FxHashSet::default(),
            fin_faces: FxHashSet::default(),
            surface_area: 0.0,
            all_pointers_valid: true,
            mesh_set_valid: false,
            max_num_edges_exceeded: false,
            max_number_of_edges_per_face: 0,
            details: String::new(),
            entity_tag: -1,
        }
    }
}

impl MeshSetInfo {
    pub fn new(entity_tag: i32) -> Self {
        Self {
            entity_tag,
            ..Self::default()
        }
    }

    /// Reset all results, keeping the entity attribution
    pub fn reset_info_result(&mut self) {
        *self = Self::new(self.entity_tag);
    }

    /// Compare two results.
    ///
    /// Counts are always compared. With `check_only_number_of_edges_and_faces`
    /// only the sizes of the defect sets are compared, otherwise their members.
    /// `details` is ignored.
    pub fn is_equal(&self, other: &MeshSetInfo, check_only_number_of_edges_and_faces: bool) -> bool {
        if self.num_closed_edges != other.num_closed_edges
            || self.num_open_edges != other.num_open_edges
            || self.num_faces != other.num_faces
        {
            return false;
        }
        if check_only_number_of_edges_and_faces {
            if self.zero_area_faces.len() != other.zero_area_faces.len()
                || self.degenerate_edges.len() != other.degenerate_edges.len()
                || self.fin_edges.len() != other.fin_edges.len()
                || self.fin_faces.len() != other.fin_faces.len()
            {
                return false;
            }
        } else if self.zero_area_faces != other.zero_area_faces
            || self.degenerate_edges != other.degenerate_edges
            || self.fin_edges != other.fin_edges
            || self.fin_faces != other.fin_faces
        {
            return false;
        }
        (self.surface_area - other.surface_area).abs() <= EPS_SURFACE_AREA
            && self.all_pointers_valid == other.all_pointers_valid
            && self.mesh_set_valid == other.mesh_set_valid
            && self.max_num_edges_exceeded == other.max_num_edges_exceeded
            && self.max_number_of_edges_per_face == other.max_number_of_edges_per_face
    }

    pub fn validity(&self) -> MeshSetValidity {
        if self.mesh_set_valid {
            MeshSetValidity::Valid
        } else if self.all_pointers_valid && self.num_faces > 0 && !self.max_num_edges_exceeded {
            MeshSetValidity::InvalidUsable
        } else {
            MeshSetValidity::InvalidUnusable
        }
    }
}

/// Face area and whether it counts as zero-area under `params`
fn face_area(points: &[Point3<f64>], params: &GeomProcessingParams) -> (f64, bool) {
    let area = newell_normal(points).norm() * 0.5;
    if area < params.min_face_area {
        return (area, true);
    }
    if params.treat_long_thin_face_as_degenerate {
        let longest = (0..points.len())
            .map(|i| (points[(i + 1) % points.len()] - points[i]).norm())
            .fold(0.0, f64::max);
        // width of the face perpendicular to its longest edge
        if longest > 0.0 && area / longest < params.eps_merge_points {
            return (area, true);
        }
    }
    (area, false)
}

/// Check raw polygon data before mesh construction.
///
/// All defects are collected; the error carries the full detail text.
pub fn check_polyhedron_data(poly: &PolyhedronData, params: &GeomProcessingParams) -> Result<()> {
    let mut details = String::new();
    let vertex_count = poly.vertex_count();
    let points = poly.points();

    if vertex_count < 3 {
        let _ = writeln!(details, "only {} vertices", vertex_count);
    }

    let mut num_faces = 0;
    for face in poly.faces() {
        let face = match face {
            Ok(face) => face,
            Err(e) => {
                let _ = writeln!(details, "{}", e);
                break;
            }
        };
        let face_index = num_faces;
        num_faces += 1;

        if face.len() < 3 {
            let _ = writeln!(details, "face {}: {} indices", face_index, face.len());
            continue;
        }
        if face.len() > params.max_num_face_edges {
            let _ = writeln!(
                details,
                "face {}: {} edges exceed maximum {}",
                face_index,
                face.len(),
                params.max_num_face_edges
            );
        }
        if let Some(&index) = face.iter().find(|&&i| i >= vertex_count) {
            let _ = writeln!(
                details,
                "face {}: index {} out of range ({} vertices)",
                face_index, index, vertex_count
            );
            continue;
        }

        if !params.allow_degenerate_edges {
            let degenerate = (0..face.len()).any(|i| {
                let a = face[i];
                let b = face[(i + 1) % face.len()];
                a == b || (points[a] - points[b]).norm() <= params.eps_merge_points
            });
            if degenerate {
                let _ = writeln!(details, "face {}: degenerate edge", face_index);
            }
        }

        if params.check_zero_area_faces && !params.allow_zero_area_faces {
            let face_points: Vec<Point3<f64>> = face.iter().map(|&i| points[i]).collect();
            let (area, zero) = face_area(&face_points, params);
            if zero {
                let _ = writeln!(details, "face {}: zero area ({:e})", face_index, area);
            }
        }
    }

    if num_faces == 0 {
        details.push_str("no faces\n");
    }
    if num_faces != poly.face_count {
        let _ = writeln!(
            details,
            "face count {} does not match {} encoded faces",
            poly.face_count, num_faces
        );
    }

    if details.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidPolyhedron(details.trim_end().to_string()))
    }
}

/// Repair raw polygon data in place.
///
/// Merges points within `eps_merge_points`, collapses repeated consecutive
/// indices and drops faces that end up with fewer than 3 indices or reference
/// missing vertices. Zero-area faces are dropped when
/// `remove_zero_area_faces` is set and the params do not allow them.
/// Returns whether the result passes [`check_polyhedron_data`].
pub fn fix_polyhedron_data(
    poly: &mut PolyhedronData,
    remove_zero_area_faces: bool,
    params: &GeomProcessingParams,
) -> bool {
    let faces: Vec<Vec<usize>> = poly
        .faces()
        .map_while(|f| f.ok())
        .map(<[usize]>::to_vec)
        .collect();

    let mut cache = PolyInputCache3D::new(params.eps_merge_points);
    let has_uvs = poly.vertices.has_uvs();
    let remap: Vec<usize> = poly
        .points()
        .iter()
        .enumerate()
        .map(|(i, p)| {
            if has_uvs {
                cache.add_point_with_uv(p, &poly.vertices.uvs[i])
            } else {
                cache.add_point(p)
            }
        })
        .collect();

    let mut fixed = cache.into_poly_data();
    let eps = params.eps_merge_points;
    let mut kept: Vec<Vec<usize>> = Vec::with_capacity(faces.len());

    for face in faces {
        if face.iter().any(|&i| i >= remap.len()) {
            continue;
        }
        let mut indices: Vec<usize> = Vec::with_capacity(face.len());
        for &i in &face {
            let index = remap[i];
            let repeated = indices.last().is_some_and(|&last| {
                last == index || (fixed.points()[last] - fixed.points()[index]).norm() <= eps
            });
            if !repeated {
                indices.push(index);
            }
        }
        while indices.len() > 1 {
            let (first, last) = (indices[0], indices[indices.len() - 1]);
            if first == last || (fixed.points()[first] - fixed.points()[last]).norm() <= eps {
                indices.pop();
            } else {
                break;
            }
        }
        if indices.len() < 3 {
            continue;
        }
        if remove_zero_area_faces && !params.allow_zero_area_faces {
            let face_points: Vec<Point3<f64>> = indices.iter().map(|&i| fixed.points()[i]).collect();
            if face_area(&face_points, params).1 {
                continue;
            }
        }
        kept.push(indices);
    }

    fixed.set_faces(&kept);
    *poly = fixed;
    check_polyhedron_data(poly, params).is_ok()
}

/// Reverse the winding of every face; false if the face buffer is malformed
pub fn reverse_faces_in_polyhedron_data(poly: &mut PolyhedronData) -> bool {
    let Ok(mut faces) = poly.decoded_faces() else {
        return false;
    };
    for face in &mut faces {
        face.reverse();
    }
    poly.set_faces(&faces);
    true
}

/// Inspect a mesh set for topological and geometric defects
pub fn check_mesh_set_validity(mesh_set: &MeshSet, params: &GeomProcessingParams) -> MeshSetInfo {
    let mut info = MeshSetInfo::new(params.entity_tag);
    let vertex_count = mesh_set.vertex_storage.len();
    let mut directed: FxHashMap<(usize, usize), Vec<EdgeKey>> = FxHashMap::default();

    for (mesh_index, mesh) in mesh_set.meshes.iter().enumerate() {
        info.num_open_edges += mesh.open_edges.len();
        info.num_closed_edges += mesh.closed_edges.len();

        for &fk in &mesh.faces {
            let Some(face) = mesh_set.faces.get(fk) else {
                info.all_pointers_valid = false;
                let _ = writeln!(info.details, "mesh {}: dangling face key", mesh_index);
                continue;
            };
            info.num_faces += 1;
            if face.mesh != mesh_index {
                info.all_pointers_valid = false;
            }

            let loop_edges = mesh_set.face_edges(fk);
            if loop_edges.len() != face.n_edges {
                info.all_pointers_valid = false;
                let _ = writeln!(
                    info.details,
                    "face loop has {} edges, expected {}",
                    loop_edges.len(),
                    face.n_edges
                );
                continue;
            }
            info.max_number_of_edges_per_face = info.max_number_of_edges_per_face.max(face.n_edges);
            if face.n_edges > params.max_num_face_edges {
                info.max_num_edges_exceeded = true;
            }

            let mut links_ok = true;
            for &ek in &loop_edges {
                let edge = &mesh_set.edges[ek];
                let next_ok = mesh_set.edges.get(edge.next).is_some_and(|n| n.prev == ek);
                let rev_ok = edge.rev.map_or(true, |r| {
                    mesh_set.edges.get(r).is_some_and(|re| re.rev == Some(ek))
                });
                if edge.face != fk || !next_ok || !rev_ok || edge.vert >= vertex_count {
                    links_ok = false;
                }
            }
            if !links_ok {
                info.all_pointers_valid = false;
                continue;
            }

            let face_points = mesh_set.face_points(fk);
            let (area, zero) = face_area(&face_points, params);
            info.surface_area += area;
            if zero && params.check_zero_area_faces {
                info.zero_area_faces.insert(fk);
            }

            for &ek in &loop_edges {
                let (a, b) = mesh_set.edge_vertex_indices(ek);
                directed.entry((a, b)).or_default().push(ek);

                if (mesh_set.vertex_storage[a].position - mesh_set.vertex_storage[b].position).norm()
                    <= params.eps_merge_points
                {
                    info.degenerate_edges.insert(ek);
                }

                let edge = &mesh_set.edges[ek];
                let rev_on_same_face = edge.rev.is_some_and(|r| mesh_set.edges[r].face == fk);
                let next_end = mesh_set.edge_vertex_indices(edge.next).1;
                let spike = next_end == a && face.n_edges > 2;
                if rev_on_same_face || spike {
                    info.fin_edges.insert(ek);
                    info.fin_faces.insert(fk);
                }
            }
        }
    }

    if info.all_pointers_valid {
        for edges in directed.values().filter(|edges| edges.len() > 1) {
            for &ek in edges {
                info.fin_edges.insert(ek);
                info.fin_faces.insert(mesh_set.edges[ek].face);
            }
        }
    }

    if info.num_faces == 0 {
        let _ = writeln!(info.details, "mesh set has no faces");
    }
    if info.num_open_edges > 0 {
        let _ = writeln!(info.details, "{} open edges", info.num_open_edges);
    }
    if !info.zero_area_faces.is_empty() {
        let _ = writeln!(info.details, "{} zero-area faces", info.zero_area_faces.len());
    }
    if !info.degenerate_edges.is_empty() {
        let _ = writeln!(info.details, "{} degenerate edges", info.degenerate_edges.len());
    }
    if !info.fin_edges.is_empty() {
        let _ = writeln!(info.details, "{} fin edges", info.fin_edges.len());
    }
    if info.max_num_edges_exceeded {
        let _ = writeln!(
            info.details,
            "face with {} edges exceeds maximum {}",
            info.max_number_of_edges_per_face, params.max_num_face_edges
        );
    }

    info.mesh_set_valid = info.all_pointers_valid
        && info.num_faces > 0
        && info.num_open_edges == 0
        && !info.max_num_edges_exceeded
        && (params.allow_zero_area_faces || info.zero_area_faces.is_empty())
        && (params.allow_degenerate_edges || info.degenerate_edges.is_empty())
        && (params.allow_fin_edges || info.fin_edges.is_empty());
    info
}

/// Extract raw polygon data from a mesh set into `cache`.
///
/// Faces in `skip_faces` are left out; `flip_faces` reverses every loop.
pub fn polyhedron_from_mesh_set(
    mesh_set: &MeshSet,
    skip_faces: &FxHashSet<FaceKey>,
    flip_faces: bool,
    cache: &mut PolyInputCache3D,
) {
    for fk in mesh_set.face_keys() {
        if skip_faces.contains(&fk) {
            continue;
        }
        let mut indices: Vec<usize> = mesh_set
            .face_vertex_indices(fk)
            .iter()
            .filter_map(|&i| mesh_set.vertex_storage.get(i))
            .map(|v| match &v.uv {
                Some(uv) => cache.add_point_with_uv(&v.position, uv),
                None => cache.add_point(&v.position),
            })
            .collect();
        if indices.len() < 3 {
            continue;
        }
        if flip_faces {
            indices.reverse();
        }
        cache.poly_data_mut().add_face(&indices);
    }
}
