// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shape hierarchy
//!
//! Geometry produced for a model is organised as
//!
//! ```text
//! ProductShapeData (1..n)
//!   |-> ProductShapeData (children, 1..n)
//!   |-> RepresentationData (1..n)
//!         |-> ItemShapeData (1..n)
//!               |-> ItemShapeData (children, 1..n)
//! ```
//!
//! Parents own children through `Rc`; children point back through `Weak`.
//! References to schema entities are always weak and upgraded before use.
//! Attaching a node that would create a cycle is refused with a warning.

mod bounds;
mod item;
mod product;
mod representation;

#[cfg(test)]
mod tests;

pub use bounds::{compute_bounding_box, compute_bounding_box_local_coords};
pub use item::{is_equal_items, ItemShapeData};
pub use product::ProductShapeData;
pub use representation::RepresentationData;

use crate::appearance::AppearanceData;
use crate::input::{PolylineSetData, TextItemData, VertexData};
use crate::mesh::MeshSet;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub type ItemRef = Rc<RefCell<ItemShapeData>>;
pub type WeakItemRef = Weak<RefCell<ItemShapeData>>;
pub type RepresentationRef = Rc<RefCell<RepresentationData>>;
pub type WeakRepresentationRef = Weak<RefCell<RepresentationData>>;
pub type ProductRef = Rc<RefCell<ProductShapeData>>;
pub type WeakProductRef = Weak<RefCell<ProductShapeData>>;

/// Geometry containers are shared between items by [`ItemShapeData::add_item_data`]
pub type SharedMeshSet = Rc<RefCell<MeshSet>>;
pub type SharedVertexData = Rc<RefCell<VertexData>>;
pub type SharedPolylineSet = Rc<RefCell<PolylineSetData>>;
pub type SharedTextItem = Rc<RefCell<TextItemData>>;

/// Append `appearance` unless one with the same style id is already present
fn push_appearance(list: &mut Vec<Rc<AppearanceData>>, appearance: Rc<AppearanceData>) -> bool {
    if list
        .iter()
        .any(|a| a.step_style_id == appearance.step_style_id)
    {
        return false;
    }
    list.push(appearance);
    true
}
