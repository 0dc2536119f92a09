// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry settings and per-call processing parameters.
//!
//! Settings are an explicit value handed down through every processing call;
//! there is no process-wide instance.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Merge epsilons at or below this value disable point merging
pub const EPS_MERGE_DISABLED: f64 = 1e-16;

/// Settings that influence geometry processing
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeometrySettings {
    /// Points closer than this are merged into one vertex
    pub eps_merge_points: f64,
    /// Distance tolerance for coplanarity tests
    pub eps_coplanar_distance: f64,
    /// Angle tolerance for coplanarity tests (radians)
    pub eps_coplanar_angle: f64,
    /// Faces smaller than this are treated as zero-area
    pub min_triangle_area: f64,
    /// Faces with more edges than this are rejected
    pub max_num_face_edges: usize,
    /// Merge collinear edges when simplifying faces
    pub merge_aligned_edges: bool,
    /// Number of discretization points per circle
    pub num_vertices_per_circle: usize,
    /// Minimum number of discretization points per arc
    pub min_num_vertices_per_arc: usize,
    pub handle_styled_items: bool,
    pub handle_layer_assignments: bool,
    pub render_bounding_boxes: bool,
    pub show_text_literals: bool,
}

impl GeometrySettings {
    /// Load settings from `IFC_SHAPE_*` environment variables.
    ///
    /// Unset or unparsable variables fall back to the built-in defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            eps_merge_points: env_or("IFC_SHAPE_EPS_MERGE_POINTS", defaults.eps_merge_points),
            eps_coplanar_distance: env_or(
                "IFC_SHAPE_EPS_COPLANAR_DISTANCE",
                defaults.eps_coplanar_distance,
            ),
            eps_coplanar_angle: env_or("IFC_SHAPE_EPS_COPLANAR_ANGLE", defaults.eps_coplanar_angle),
            min_triangle_area: env_or("IFC_SHAPE_MIN_TRIANGLE_AREA", defaults.min_triangle_area),
            max_num_face_edges: env_or("IFC_SHAPE_MAX_NUM_FACE_EDGES", defaults.max_num_face_edges),
            merge_aligned_edges: env_or(
                "IFC_SHAPE_MERGE_ALIGNED_EDGES",
                defaults.merge_aligned_edges,
            ),
            num_vertices_per_circle: env_or(
                "IFC_SHAPE_NUM_VERTICES_PER_CIRCLE",
                defaults.num_vertices_per_circle,
            ),
            min_num_vertices_per_arc: env_or(
                "IFC_SHAPE_MIN_NUM_VERTICES_PER_ARC",
                defaults.min_num_vertices_per_arc,
            ),
            handle_styled_items: env_or("IFC_SHAPE_HANDLE_STYLED_ITEMS", defaults.handle_styled_items),
            handle_layer_assignments: env_or(
                "IFC_SHAPE_HANDLE_LAYER_ASSIGNMENTS",
                defaults.handle_layer_assignments,
            ),
            render_bounding_boxes: env_or(
                "IFC_SHAPE_RENDER_BOUNDING_BOXES",
                defaults.render_bounding_boxes,
            ),
            show_text_literals: env_or("IFC_SHAPE_SHOW_TEXT_LITERALS", defaults.show_text_literals),
        }
    }

    /// Number of circle segments for a given radius (larger circles get 1.5x)
    pub fn num_vertices_per_circle_with_radius(&self, radius: f64) -> usize {
        if radius > 0.5 {
            self.num_vertices_per_circle * 3 / 2
        } else {
            self.num_vertices_per_circle
        }
    }
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            eps_merge_points: 1.5e-8,
            eps_coplanar_distance: 1.5e-8,
            eps_coplanar_angle: 1e-10,
            min_triangle_area: 1e-9,
            max_num_face_edges: 10_000,
            merge_aligned_edges: true,
            num_vertices_per_circle: 14,
            min_num_vertices_per_arc: 5,
            handle_styled_items: true,
            handle_layer_assignments: true,
            render_bounding_boxes: false,
            show_text_literals: false,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parameters for one processing call, derived from [`GeometrySettings`]
#[derive(Debug, Clone, PartialEq)]
pub struct GeomProcessingParams {
    pub eps_merge_points: f64,
    pub eps_merge_aligned_edges_angle: f64,
    pub min_face_area: f64,
    pub max_num_face_edges: usize,
    pub merge_aligned_edges: bool,
    pub allow_fin_edges: bool,
    pub allow_degenerate_edges: bool,
    pub check_zero_area_faces: bool,
    pub allow_zero_area_faces: bool,
    pub treat_long_thin_face_as_degenerate: bool,
    /// Tag of the entity being processed, for diagnostics (-1 if unknown)
    pub entity_tag: i32,
}

impl GeomProcessingParams {
    pub fn new(settings: &GeometrySettings) -> Self {
        Self {
            eps_merge_points: settings.eps_merge_points,
            eps_merge_aligned_edges_angle: settings.eps_coplanar_angle,
            min_face_area: settings.min_triangle_area,
            max_num_face_edges: settings.max_num_face_edges,
            merge_aligned_edges: settings.merge_aligned_edges,
            ..Self::default()
        }
    }

    /// Same parameters, attributed to the given entity tag
    pub fn for_entity(&self, entity_tag: i32) -> Self {
        Self {
            entity_tag,
            ..self.clone()
        }
    }
}

impl Default for GeomProcessingParams {
    fn default() -> Self {
        Self {
            eps_merge_points: 1e-9,
            eps_merge_aligned_edges_angle: 1e-6,
            min_face_area: 1e-12,
            max_num_face_edges: 10_000,
            merge_aligned_edges: true,
            allow_fin_edges: false,
            allow_degenerate_edges: false,
            check_zero_area_faces: true,
            allow_zero_area_faces: false,
            treat_long_thin_face_as_degenerate: false,
            entity_tag: -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_from_settings() {
        let settings = GeometrySettings {
            eps_merge_points: 1e-6,
            min_triangle_area: 1e-4,
            ..GeometrySettings::default()
        };
        let params = GeomProcessingParams::new(&settings);
        assert_eq!(params.eps_merge_points, 1e-6);
        assert_eq!(params.min_face_area, 1e-4);
        assert_eq!(params.max_num_face_edges, 10_000);
        assert!(!params.allow_zero_area_faces);
        assert_eq!(params.for_entity(17).entity_tag, 17);
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("IFC_SHAPE_NUM_VERTICES_PER_CIRCLE", "24");
        std::env::set_var("IFC_SHAPE_MIN_TRIANGLE_AREA", "not-a-number");
        let settings = GeometrySettings::from_env();
        std::env::remove_var("IFC_SHAPE_NUM_VERTICES_PER_CIRCLE");
        std::env::remove_var("IFC_SHAPE_MIN_TRIANGLE_AREA");

        assert_eq!(settings.num_vertices_per_circle, 24);
        assert_eq!(settings.min_triangle_area, 1e-9);
        assert_eq!(settings.num_vertices_per_circle_with_radius(1.0), 36);
        assert_eq!(settings.num_vertices_per_circle_with_radius(0.1), 24);
    }
}
