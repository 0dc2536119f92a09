// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Product bounding boxes

use super::{ProductRef, ProductShapeData};
use crate::bbox::BoundingBox;
use rustc_hash::FxHashSet;
use std::cell::RefCell;
use std::rc::Rc;

type VisitedProducts = FxHashSet<*const RefCell<ProductShapeData>>;

/// Bounding box of a product's representations, optionally with children
/// and moved into global coordinates.
///
/// With `apply_transform_to_global`, each representation box is relocated so
/// its center lands where [`ProductShapeData::get_transform`] puts it; the
/// extent is kept, so rotated placements are approximated.
pub fn compute_bounding_box(product: &ProductRef, include_children: bool, apply_transform_to_global: bool) -> BoundingBox {
    let mut visited = VisitedProducts::default();
    bounding_box_walk(product, include_children, apply_transform_to_global, &mut visited)
}

/// Bounding box in the product's own coordinates (no placement applied)
pub fn compute_bounding_box_local_coords(product: &ProductRef, include_children: bool) -> BoundingBox {
    let mut visited = VisitedProducts::default();
    bounding_box_walk(product, include_children, false, &mut visited)
}

fn bounding_box_walk(
    product: &ProductRef,
    include_children: bool,
    apply_transform_to_global: bool,
    visited: &mut VisitedProducts,
) -> BoundingBox {
    let mut bbox = BoundingBox::new();
    if !visited.insert(Rc::as_ptr(product)) {
        return bbox;
    }

    let product = product.borrow();
    let transform = apply_transform_to_global.then(|| product.get_transform());

    for rep in &product.representations {
        let mut rep_bbox = BoundingBox::new();
        rep.borrow().compute_bounding_box(&mut rep_bbox);
        if let Some(transform) = &transform {
            rep_bbox = rep_bbox.relocated(transform);
        }
        bbox.union(&rep_bbox);
    }

    if include_children {
        for child in &product.children {
            let child_bbox = bounding_box_walk(child, true, apply_transform_to_global, visited);
            bbox.union(&child_bbox);
        }
    }
    bbox
}
