// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Half-edge mesh sets
//!
//! A [`MeshSet`] owns a shared vertex pool and a set of faces, each face being
//! a cyclic loop of half-edges. Faces connected through paired (reverse)
//! half-edges are grouped into one [`Mesh`]. A mesh without open edges is
//! closed and gets an orientation from its signed volume.
//!
//! Faces and half-edges live in slot maps, so `Clone` produces a fully
//! independent copy whose keys remain valid.

use crate::bbox::BoundingBox;
use crate::error::{Error, Result};
use crate::input::PolyhedronData;
use crate::keys::{EdgeKey, FaceKey};
use nalgebra::{Matrix4, Point2, Point3, Vector3};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;

/// Vertex of the shared pool
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshVertex {
    pub position: Point3<f64>,
    pub uv: Option<Point2<f64>>,
}

/// Directed edge owned by one face
#[derive(Debug, Clone, Copy)]
pub struct HalfEdge {
    /// Start vertex (index into the vertex pool)
    pub vert: usize,
    pub face: FaceKey,
    pub next: EdgeKey,
    pub prev: EdgeKey,
    /// Paired edge of the neighbouring face, `None` for open (boundary) edges
    pub rev: Option<EdgeKey>,
}

#[derive(Debug, Clone, Copy)]
pub struct Face {
    /// First half-edge of the loop
    pub edge: EdgeKey,
    pub n_edges: usize,
    /// Index of the owning mesh in [`MeshSet::meshes`]
    pub mesh: usize,
    /// Unit normal (zero for degenerate faces)
    pub normal: Vector3<f64>,
    pub area: f64,
}

/// Connected component of a mesh set
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub faces: Vec<FaceKey>,
    pub open_edges: Vec<EdgeKey>,
    /// One half-edge per paired edge
    pub closed_edges: Vec<EdgeKey>,
    /// Closed mesh whose faces point inward
    pub is_negative: bool,
    /// Signed enclosed volume (zero for open meshes)
    pub volume: f64,
}

impl Mesh {
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.open_edges.is_empty()
    }
}

/// Collection of meshes sharing one vertex pool
#[derive(Debug, Clone, Default)]
pub struct MeshSet {
    pub vertex_storage: Vec<MeshVertex>,
    pub meshes: Vec<Mesh>,
    pub(crate) edges: SlotMap<EdgeKey, HalfEdge>,
    pub(crate) faces: SlotMap<FaceKey, Face>,
}

impl MeshSet {
    /// Build the half-edge structure from raw polygon data.
    ///
    /// Fails on an empty dataset, a malformed face buffer, faces with fewer
    /// than 3 indices, and out-of-range indices. Topological defects (open or
    /// non-manifold edges, zero-area faces) are accepted and left for
    /// [`check_mesh_set_validity`](crate::validation::check_mesh_set_validity).
    pub fn from_polyhedron_data(poly: &PolyhedronData, eps: f64) -> Result<Self> {
        let vertex_count = poly.vertex_count();
        if vertex_count == 0 || poly.face_count == 0 {
            return Err(Error::EmptyMesh(format!(
                "{} vertices, {} faces",
                vertex_count, poly.face_count
            )));
        }

        let has_uvs = poly.vertices.has_uvs();
        let vertex_storage = poly
            .points()
            .iter()
            .enumerate()
            .map(|(i, p)| MeshVertex {
                position: *p,
                uv: has_uvs.then(|| poly.vertices.uvs[i]),
            })
            .collect();

        let mut mesh_set = MeshSet {
            vertex_storage,
            ..MeshSet::default()
        };

        let mut face_order: Vec<FaceKey> = Vec::with_capacity(poly.face_count);
        let mut edge_order: Vec<EdgeKey> = Vec::with_capacity(poly.face_indices.len());
        let mut directed: FxHashMap<(usize, usize), SmallVec<[EdgeKey; 2]>> = FxHashMap::default();

        for face in poly.faces() {
            let face = face?;
            if face.len() < 3 {
                return Err(Error::invalid_polyhedron(format!(
                    "face {} has only {} indices",
                    face_order.len(),
                    face.len()
                )));
            }
            if let Some(&index) = face.iter().find(|&&i| i >= vertex_count) {
                return Err(Error::IndexOutOfRange {
                    index,
                    vertex_count,
                });
            }

            let fk = mesh_set.add_face_loop(face);
            let loop_edges = mesh_set.face_edges(fk);
            for (i, &ek) in loop_edges.iter().enumerate() {
                let a = face[i];
                let b = face[(i + 1) % face.len()];
                directed.entry((a, b)).or_default().push(ek);
            }
            edge_order.extend(loop_edges);
            face_order.push(fk);
        }

        // pair every edge with an unpaired edge running the opposite way
        for &ek in &edge_order {
            if mesh_set.edges[ek].rev.is_some() {
                continue;
            }
            let (a, b) = mesh_set.edge_vertex_indices(ek);
            let Some(candidates) = directed.get(&(b, a)) else {
                continue;
            };
            let partner = candidates
                .iter()
                .copied()
                .find(|&c| c != ek && mesh_set.edges[c].rev.is_none());
            if let Some(partner) = partner {
                mesh_set.edges[ek].rev = Some(partner);
                mesh_set.edges[partner].rev = Some(ek);
            }
        }

        mesh_set.build_meshes(&face_order);
        mesh_set.recalc(eps);
        Ok(mesh_set)
    }

    /// Insert one face and its half-edge loop
    fn add_face_loop(&mut self, indices: &[usize]) -> FaceKey {
        let fk = self.faces.insert(Face {
            edge: EdgeKey::default(),
            n_edges: indices.len(),
            mesh: usize::MAX,
            normal: Vector3::zeros(),
            area: 0.0,
        });
        let keys: SmallVec<[EdgeKey; 8]> = indices
            .iter()
            .map(|&vert| {
                self.edges.insert(HalfEdge {
                    vert,
                    face: fk,
                    next: EdgeKey::default(),
                    prev: EdgeKey::default(),
                    rev: None,
                })
            })
            .collect();
        let n = keys.len();
        for i in 0..n {
            let e = &mut self.edges[keys[i]];
            e.next = keys[(i + 1) % n];
            e.prev = keys[(i + n - 1) % n];
        }
        self.faces[fk].edge = keys[0];
        fk
    }

    /// Group faces into connected meshes and classify their edges
    fn build_meshes(&mut self, face_order: &[FaceKey]) {
        self.meshes.clear();
        for &seed in face_order {
            if self.faces[seed].mesh != usize::MAX {
                continue;
            }
            let mesh_index = self.meshes.len();
            let mut mesh = Mesh::default();
            let mut stack = vec![seed];
            self.faces[seed].mesh = mesh_index;

            while let Some(fk) = stack.pop() {
                mesh.faces.push(fk);
                for ek in self.face_edges(fk) {
                    let edge = self.edges[ek];
                    match edge.rev {
                        None => mesh.open_edges.push(ek),
                        Some(rev) => {
                            if ek < rev {
                                mesh.closed_edges.push(ek);
                            }
                            let neighbour = self.edges[rev].face;
                            if self.faces[neighbour].mesh == usize::MAX {
                                self.faces[neighbour].mesh = mesh_index;
                                stack.push(neighbour);
                            }
                        }
                    }
                }
            }
            self.meshes.push(mesh);
        }
    }

    #[inline]
    pub fn face(&self, fk: FaceKey) -> Option<&Face> {
        self.faces.get(fk)
    }

    #[inline]
    pub fn edge(&self, ek: EdgeKey) -> Option<&HalfEdge> {
        self.edges.get(ek)
    }

    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// All face keys, mesh by mesh
    pub fn face_keys(&self) -> impl Iterator<Item = FaceKey> + '_ {
        self.meshes.iter().flat_map(|m| m.faces.iter().copied())
    }

    /// Half-edges of a face in loop order.
    ///
    /// Stops after `n_edges` steps or at a dangling key, so a corrupt loop
    /// cannot spin forever.
    pub fn face_edges(&self, fk: FaceKey) -> SmallVec<[EdgeKey; 8]> {
        let mut result = SmallVec::new();
        let Some(face) = self.faces.get(fk) else {
            return result;
        };
        let mut ek = face.edge;
        for _ in 0..face.n_edges {
            if !self.edges.contains_key(ek) {
                break;
            }
            result.push(ek);
            ek = self.edges[ek].next;
            if ek == face.edge {
                break;
            }
        }
        result
    }

    /// Vertex indices of a face in loop order
    pub fn face_vertex_indices(&self, fk: FaceKey) -> SmallVec<[usize; 8]> {
        self.face_edges(fk)
            .iter()
            .map(|&ek| self.edges[ek].vert)
            .collect()
    }

    /// Start and end vertex index of a half-edge
    pub fn edge_vertex_indices(&self, ek: EdgeKey) -> (usize, usize) {
        let edge = &self.edges[ek];
        (edge.vert, self.edges[edge.next].vert)
    }

    #[inline]
    pub fn edge_next(&self, ek: EdgeKey) -> Option<EdgeKey> {
        self.edges.get(ek).map(|e| e.next)
    }

    #[inline]
    pub fn edge_rev(&self, ek: EdgeKey) -> Option<EdgeKey> {
        self.edges.get(ek).and_then(|e| e.rev)
    }

    /// Position of the start vertex of a half-edge
    #[inline]
    pub fn edge_vertex(&self, ek: EdgeKey) -> Option<Point3<f64>> {
        self.edges
            .get(ek)
            .and_then(|e| self.vertex_position(e.vert))
    }

    #[inline]
    pub fn vertex_position(&self, index: usize) -> Option<Point3<f64>> {
        self.vertex_storage.get(index).map(|v| v.position)
    }

    /// Positions of a face's loop
    pub fn face_points(&self, fk: FaceKey) -> SmallVec<[Point3<f64>; 8]> {
        self.face_vertex_indices(fk)
            .iter()
            .filter_map(|&i| self.vertex_position(i))
            .collect()
    }

    /// Apply a matrix to every pooled vertex (topology and normals are not updated)
    pub fn transform_vertices(&mut self, matrix: &Matrix4<f64>) {
        for v in &mut self.vertex_storage {
            v.position = matrix.transform_point(&v.position);
        }
    }

    /// Recompute face normals and areas, then mesh orientation
    pub fn recalc(&mut self, eps: f64) {
        for i in 0..self.meshes.len() {
            self.recalc_mesh(i, eps);
        }
    }

    pub fn recalc_mesh(&mut self, mesh_index: usize, eps: f64) {
        let Some(mesh) = self.meshes.get(mesh_index) else {
            return;
        };
        let faces = mesh.faces.clone();
        for fk in faces {
            let newell = newell_normal(&self.face_points(fk));
            let length = newell.norm();
            if let Some(face) = self.faces.get_mut(fk) {
                face.area = length * 0.5;
                face.normal = if length > eps.max(f64::EPSILON) {
                    newell / length
                } else {
                    Vector3::zeros()
                };
            }
        }
        self.calc_orientation_mesh(mesh_index);
    }

    /// Reverse the winding of every mesh
    pub fn invert(&mut self) {
        for i in 0..self.meshes.len() {
            self.invert_mesh(i);
        }
    }

    pub fn invert_mesh(&mut self, mesh_index: usize) {
        let Some(mesh) = self.meshes.get(mesh_index) else {
            return;
        };
        let faces = mesh.faces.clone();
        for fk in faces {
            let loop_edges = self.face_edges(fk);
            let n = loop_edges.len();
            let verts: SmallVec<[usize; 8]> = loop_edges.iter().map(|&ek| self.edges[ek].vert).collect();
            for (i, &ek) in loop_edges.iter().enumerate() {
                let edge = &mut self.edges[ek];
                edge.vert = verts[(i + 1) % n];
                std::mem::swap(&mut edge.next, &mut edge.prev);
            }
            if let Some(face) = self.faces.get_mut(fk) {
                face.normal = -face.normal;
            }
        }
        if let Some(mesh) = self.meshes.get_mut(mesh_index) {
            mesh.is_negative = !mesh.is_negative;
            mesh.volume = -mesh.volume;
        }
    }

    /// Reset the orientation flag of every mesh from its signed volume
    pub fn calc_orientation(&mut self) {
        for i in 0..self.meshes.len() {
            self.calc_orientation_mesh(i);
        }
    }

    pub fn calc_orientation_mesh(&mut self, mesh_index: usize) {
        let Some(mesh) = self.meshes.get(mesh_index) else {
            return;
        };
        let (volume, is_negative) = if mesh.is_closed() {
            let v = self.signed_volume(mesh_index);
            (v, v < 0.0)
        } else {
            (0.0, false)
        };
        if let Some(mesh) = self.meshes.get_mut(mesh_index) {
            mesh.volume = volume;
            mesh.is_negative = is_negative;
        }
    }

    /// Signed volume enclosed by a mesh (positive for outward winding)
    pub fn signed_volume(&self, mesh_index: usize) -> f64 {
        let Some(mesh) = self.meshes.get(mesh_index) else {
            return 0.0;
        };
        let mut volume = 0.0;
        for &fk in &mesh.faces {
            let points = self.face_points(fk);
            if points.len() < 3 {
                continue;
            }
            let p0 = points[0].coords;
            for i in 1..points.len() - 1 {
                volume += p0.dot(&points[i].coords.cross(&points[i + 1].coords));
            }
        }
        volume / 6.0
    }

    /// Bounding box of the vertex pool
    pub fn aabb(&self) -> BoundingBox {
        let mut bbox = BoundingBox::new();
        for v in &self.vertex_storage {
            bbox.expand(&v.position);
        }
        bbox
    }

    /// Total area of all faces
    pub fn surface_area(&self) -> f64 {
        self.face_keys()
            .filter_map(|fk| self.faces.get(fk))
            .map(|f| f.area)
            .sum()
    }

    pub fn is_closed(&self) -> bool {
        !self.meshes.is_empty() && self.meshes.iter().all(Mesh::is_closed)
    }
}

/// Newell's method; returns the unnormalized normal (length = 2 × area)
pub fn newell_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let mut normal = Vector3::zeros();
    let n = points.len();
    for i in 0..n {
        let curr = points[i];
        let next = points[(i + 1) % n];
        normal.x += (curr.y - next.y) * (curr.z + next.z);
        normal.y += (curr.z - next.z) * (curr.x + next.x);
        normal.z += (curr.x - next.x) * (curr.y + next.y);
    }
    normal
}

/// Structural equality: same mesh/face layout and vertices within 1e-4
pub fn is_equal_mesh_sets(a: &MeshSet, b: &MeshSet) -> bool {
    const TOLERANCE: f64 = 1e-4;

    if a.meshes.len() != b.meshes.len() || a.vertex_storage.len() != b.vertex_storage.len() {
        return false;
    }
    for (mesh_a, mesh_b) in a.meshes.iter().zip(&b.meshes) {
        if mesh_a.closed_edges.len() != mesh_b.closed_edges.len()
            || mesh_a.open_edges.len() != mesh_b.open_edges.len()
            || mesh_a.faces.len() != mesh_b.faces.len()
        {
            return false;
        }
        for (&fa, &fb) in mesh_a.faces.iter().zip(&mesh_b.faces) {
            let points_a = a.face_points(fa);
            let points_b = b.face_points(fb);
            if points_a.len() != points_b.len() {
                return false;
            }
            let close = points_a.iter().zip(&points_b).all(|(pa, pb)| {
                let d = pa - pb;
                d.x.abs() <= TOLERANCE && d.y.abs() <= TOLERANCE && d.z.abs() <= TOLERANCE
            });
            if !close {
                return false;
            }
        }
    }
    true
}
