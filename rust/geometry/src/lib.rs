// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Shape Geometry
//!
//! Aggregation and consolidation of building-model geometry: raw polygon,
//! point and polyline input is deduplicated, validated and repaired, turned
//! into half-edge mesh sets, and organised in a product → representation →
//! item hierarchy that carries placement transforms and styles.
//!
//! ```rust
//! use ifc_shape_geometry::{GeomProcessingParams, ItemShapeData, PolyInputCache3D, Point3};
//!
//! let mut cache = PolyInputCache3D::new(1e-9);
//! let a = cache.add_point(&Point3::new(0.0, 0.0, 0.0));
//! let b = cache.add_point(&Point3::new(1.0, 0.0, 0.0));
//! let c = cache.add_point(&Point3::new(0.0, 1.0, 0.0));
//! assert_eq!(cache.add_point(&Point3::new(0.0, 0.0, 1e-12)), a);
//! cache.poly_data_mut().add_triangle(a, b, c);
//!
//! let mut item = ItemShapeData::new();
//! item.add_open_or_closed_polyhedron(cache.poly_data(), &GeomProcessingParams::default());
//! assert_eq!(item.mesh_sets_open.len(), 1);
//! ```

pub mod appearance;
pub mod bbox;
pub mod error;
pub mod input;
pub mod keys;
pub mod mesh;
pub mod poly_cache;
pub mod settings;
pub mod shape;
pub mod transform;
pub mod validation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point2, Point3, Vector3};

pub use appearance::{AppearanceData, GeometryType};
pub use bbox::BoundingBox;
pub use error::{Error, Result};
pub use input::{PolyhedronData, PolylineSetData, TextItemData, VertexData};
pub use keys::{EdgeKey, FaceKey};
pub use mesh::{is_equal_mesh_sets, Face, HalfEdge, Mesh, MeshSet, MeshVertex};
pub use poly_cache::PolyInputCache3D;
pub use settings::{GeomProcessingParams, GeometrySettings};
pub use shape::{
    compute_bounding_box, compute_bounding_box_local_coords, is_equal_items, ItemRef,
    ItemShapeData, ProductRef, ProductShapeData, RepresentationData, RepresentationRef,
};
pub use transform::TransformData;
pub use validation::{
    check_mesh_set_validity, check_polyhedron_data, fix_polyhedron_data, polyhedron_from_mesh_set,
    reverse_faces_in_polyhedron_data, MeshSetInfo, MeshSetValidity,
};
