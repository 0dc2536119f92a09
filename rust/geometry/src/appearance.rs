// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surface and curve styles attached to items, representations and products

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Kind of geometry a style applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GeometryType {
    #[default]
    Any,
    Surface,
    Curve,
    Text,
}

/// Resolved presentation style. Immutable once built; shared as `Rc<AppearanceData>`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AppearanceData {
    /// Tag of the style entity this was resolved from
    pub step_style_id: i32,
    pub apply_to_geometry_type: GeometryType,
    pub color_ambient: [f32; 4],
    pub color_diffuse: [f32; 4],
    pub color_specular: [f32; 4],
    pub shininess: f32,
    pub transparency: f32,
    pub set_transparent: bool,
}

impl AppearanceData {
    pub fn new(step_style_id: i32) -> Self {
        Self {
            step_style_id,
            apply_to_geometry_type: GeometryType::Any,
            color_ambient: [0.2, 0.2, 0.2, 1.0],
            color_diffuse: [0.8, 0.8, 0.8, 1.0],
            color_specular: [0.1, 0.1, 0.1, 1.0],
            shininess: 10.0,
            transparency: 1.0,
            set_transparent: false,
        }
    }

    /// Style with a single surface color
    pub fn surface_color(step_style_id: i32, rgba: [f32; 4]) -> Self {
        let transparency = rgba[3];
        Self {
            apply_to_geometry_type: GeometryType::Surface,
            color_ambient: [rgba[0] * 0.8, rgba[1] * 0.8, rgba[2] * 0.8, rgba[3]],
            color_diffuse: rgba,
            transparency,
            set_transparent: transparency < 1.0,
            ..Self::new(step_style_id)
        }
    }

    /// Whether this style should be used for the given geometry type
    pub fn applies_to(&self, geometry_type: GeometryType) -> bool {
        self.apply_to_geometry_type == GeometryType::Any || self.apply_to_geometry_type == geometry_type
    }
}
