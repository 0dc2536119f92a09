// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw geometry input blocks
//!
//! These are the mutable buffers filled while a representation item is
//! processed: loose points, polylines, and polygon soups with a flattened face
//! buffer (`[n, i0, .., in-1, n, ...]`). A [`PolyhedronData`] is later turned
//! into a [`MeshSet`](crate::mesh::MeshSet).

use crate::error::{Error, Result};
use nalgebra::{Matrix4, Point2, Point3};

/// Vertex positions with optional texture coordinates.
///
/// `uvs` is either empty or has one entry per point: once a vertex with a uv
/// is added, vertices without one get a zero uv.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexData {
    pub points: Vec<Point3<f64>>,
    pub uvs: Vec<Point2<f64>>,
}

impl VertexData {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_vertex(&mut self, point: Point3<f64>) -> usize {
        self.points.push(point);
        if !self.uvs.is_empty() {
            self.uvs.push(Point2::origin());
        }
        self.points.len() - 1
    }

    pub fn add_vertex_with_uv(&mut self, point: Point3<f64>, uv: Point2<f64>) -> usize {
        self.uvs.resize(self.points.len(), Point2::origin());
        self.points.push(point);
        self.uvs.push(uv);
        self.points.len() - 1
    }

    #[inline]
    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty() && self.uvs.len() == self.points.len()
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.points.len()
    }

    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        for p in &mut self.points {
            *p = matrix.transform_point(p);
        }
    }
}

/// Polygon soup: vertices plus a flattened face-index buffer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolyhedronData {
    pub vertices: VertexData,
    pub face_indices: Vec<usize>,
    pub face_count: usize,
}

impl PolyhedronData {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_vertex(&mut self, point: Point3<f64>) -> usize {
        self.vertices.add_vertex(point)
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.vertex_count()
    }

    #[inline]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.vertices.points
    }

    pub fn add_face(&mut self, indices: &[usize]) {
        self.face_indices.reserve(indices.len() + 1);
        self.face_indices.push(indices.len());
        self.face_indices.extend_from_slice(indices);
        self.face_count += 1;
    }

    pub fn add_triangle(&mut self, a: usize, b: usize, c: usize) {
        self.add_face(&[a, b, c]);
    }

    pub fn add_quad(&mut self, a: usize, b: usize, c: usize, d: usize) {
        self.add_face(&[a, b, c, d]);
    }

    pub fn clear_faces(&mut self) {
        self.face_indices.clear();
        self.face_count = 0;
    }

    /// Iterate over the encoded faces.
    ///
    /// A truncated buffer yields one final `Err` and then stops.
    pub fn faces(&self) -> FaceIter<'_> {
        FaceIter {
            buffer: &self.face_indices,
            pos: 0,
        }
    }

    /// Decode all faces into owned index lists
    pub fn decoded_faces(&self) -> Result<Vec<Vec<usize>>> {
        self.faces().map(|f| f.map(<[usize]>::to_vec)).collect()
    }

    /// Replace the face buffer with the given faces
    pub fn set_faces(&mut self, faces: &[Vec<usize>]) {
        self.clear_faces();
        for face in faces {
            self.add_face(face);
        }
    }
}

/// Iterator over the faces of a flattened face buffer
pub struct FaceIter<'a> {
    buffer: &'a [usize],
    pos: usize,
}

impl<'a> Iterator for FaceIter<'a> {
    type Item = Result<&'a [usize]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.buffer.len() {
            return None;
        }
        let n = self.buffer[self.pos];
        let start = self.pos + 1;
        let end = start.saturating_add(n);
        if end > self.buffer.len() {
            let err = Error::MalformedFaceBuffer(format!(
                "face at offset {} declares {} indices, only {} remain",
                self.pos,
                n,
                self.buffer.len() - start
            ));
            self.pos = self.buffer.len();
            return Some(Err(err));
        }
        self.pos = end;
        Some(Ok(&self.buffer[start..end]))
    }
}

/// Polyline set: shared vertices plus `(closed, indices)` runs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolylineSetData {
    pub vertices: VertexData,
    pub polylines: Vec<(bool, Vec<usize>)>,
}

impl PolylineSetData {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_vertex(&mut self, point: Point3<f64>) -> usize {
        self.vertices.add_vertex(point)
    }

    pub fn begin_polyline(&mut self, closed: bool) {
        self.polylines.push((closed, Vec::new()));
    }

    /// Append an index to the current polyline, starting an open one if needed
    pub fn add_polyline_index(&mut self, index: usize) {
        if self.polylines.is_empty() {
            self.begin_polyline(false);
        }
        if let Some((_, indices)) = self.polylines.last_mut() {
            indices.push(index);
        }
    }
}

/// Text literal with its placement
#[derive(Debug, Clone, PartialEq)]
pub struct TextItemData {
    pub text: String,
    pub text_position: Matrix4<f64>,
}

impl TextItemData {
    pub fn new(text: impl Into<String>, text_position: Matrix4<f64>) -> Self {
        Self {
            text: text.into(),
            text_position,
        }
    }

    /// Anchor point of the text (translation part of the placement)
    pub fn anchor(&self) -> Point3<f64> {
        Point3::new(
            self.text_position[(0, 3)],
            self.text_position[(1, 3)],
            self.text_position[(2, 3)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn test_face_buffer_encoding() {
        let mut poly = PolyhedronData::new();
        for i in 0..4 {
            poly.add_vertex(Point3::new(i as f64, 0.0, 0.0));
        }
        poly.add_triangle(0, 1, 2);
        poly.add_quad(0, 1, 2, 3);

        assert_eq!(poly.face_count, 2);
        assert_eq!(poly.face_indices, vec![3, 0, 1, 2, 4, 0, 1, 2, 3]);
        let faces = poly.decoded_faces().unwrap();
        assert_eq!(faces, vec![vec![0, 1, 2], vec![0, 1, 2, 3]]);
    }

    #[test]
    fn test_truncated_face_buffer() {
        let poly = PolyhedronData {
            face_indices: vec![3, 0, 1, 2, 5, 0, 1],
            face_count: 2,
            ..PolyhedronData::default()
        };
        let results: Vec<_> = poly.faces().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::MalformedFaceBuffer(_))));
    }

    #[test]
    fn test_polyline_without_begin() {
        let mut polyline = PolylineSetData::new();
        polyline.add_vertex(Point3::origin());
        polyline.add_polyline_index(0);
        assert_eq!(polyline.polylines, vec![(false, vec![0])]);
    }

    #[test]
    fn test_text_anchor_and_vertex_transform() {
        let text = TextItemData::new("Level 1", Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0)));
        assert_eq!(text.anchor(), Point3::new(1.0, 2.0, 3.0));

        let mut data = VertexData::new();
        data.add_vertex(Point3::new(1.0, 0.0, 0.0));
        data.transform(&Matrix4::new_scaling(2.0));
        assert_eq!(data.points[0], Point3::new(2.0, 0.0, 0.0));
    }
}
