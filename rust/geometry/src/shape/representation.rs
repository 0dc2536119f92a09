// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::{push_appearance, ItemRef, RepresentationRef, WeakProductRef};
use crate::appearance::AppearanceData;
use crate::bbox::BoundingBox;
use crate::transform::is_matrix_identity;
use ifc_shape_core::{weak_entity_tag, WeakEntityRef};
use nalgebra::Matrix4;
use rustc_hash::FxHashSet;
use std::cell::RefCell;
use std::rc::Rc;

/// One shape representation of a product (body, axis, footprint, ...)
#[derive(Debug, Default)]
pub struct RepresentationData {
    pub representation: Option<WeakEntityRef>,
    pub items: Vec<ItemRef>,
    pub appearances: Vec<Rc<AppearanceData>>,
    /// e.g. `Body`, `Axis`
    pub representation_identifier: String,
    /// e.g. `SweptSolid`, `Brep`
    pub representation_type: String,
    pub parent_product: WeakProductRef,
}

impl RepresentationData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_ref() -> RepresentationRef {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Attach an item; an item already present is not added twice
    pub fn add_child_item(rep: &RepresentationRef, item: &ItemRef) -> bool {
        if rep.borrow().items.iter().any(|i| Rc::ptr_eq(i, item)) {
            tracing::debug!("item already part of representation");
            return false;
        }

        let rep_tag = weak_entity_tag(rep.borrow().representation.as_ref());
        {
            let mut item_data = item.borrow_mut();
            item_data.parent_representation = Rc::downgrade(rep);
            if rep_tag >= 0 {
                item_data.used_in_representations.insert(rep_tag);
            }
        }
        rep.borrow_mut().items.push(Rc::clone(item));
        true
    }

    /// Move all items and appearances of `other` into `rep`, leaving `other`
    /// empty. Items already listed in `rep` are not added twice.
    pub fn append_representation_data(rep: &RepresentationRef, other: &RepresentationRef) {
        if Rc::ptr_eq(rep, other) {
            tracing::warn!("cannot append representation to itself");
            return;
        }
        let (items, appearances) = {
            let mut other = other.borrow_mut();
            (
                std::mem::take(&mut other.items),
                std::mem::take(&mut other.appearances),
            )
        };
        for item in &items {
            Self::add_child_item(rep, item);
        }
        let mut rep = rep.borrow_mut();
        for appearance in appearances {
            push_appearance(&mut rep.appearances, appearance);
        }
    }

    /// Add a style unless one with the same style id is present
    pub fn add_appearance(&mut self, appearance: Rc<AppearanceData>) -> bool {
        push_appearance(&mut self.appearances, appearance)
    }

    pub fn clear_appearance_data(&mut self) {
        self.appearances.clear();
    }

    pub fn clear_all(&mut self) {
        self.appearances.clear();
        self.representation = None;
        self.items.clear();
        self.representation_identifier.clear();
        self.representation_type.clear();
    }

    pub fn apply_transform_to_representation(&self, matrix: &Matrix4<f64>, eps: f64, identity_checked: bool) {
        if !identity_checked && is_matrix_identity(matrix) {
            return;
        }
        for item in &self.items {
            item.borrow_mut().apply_transform_to_item(matrix, eps, true);
        }
    }

    /// Grow `bbox` by the geometry of all items (local coordinates)
    pub fn compute_bounding_box(&self, bbox: &mut BoundingBox) {
        for item in &self.items {
            let mut visited = FxHashSet::default();
            visited.insert(Rc::as_ptr(item));
            item.borrow().compute_bounding_box(bbox, &mut visited);
        }
    }

    /// Independent copy with deep-copied items; appearances are shared
    pub fn get_representation_data_deep_copy(&self) -> RepresentationRef {
        let copy = Rc::new(RefCell::new(RepresentationData {
            representation: self.representation.clone(),
            appearances: self.appearances.clone(),
            representation_identifier: self.representation_identifier.clone(),
            representation_type: self.representation_type.clone(),
            ..RepresentationData::default()
        }));
        for item in &self.items {
            let item_copy = item.borrow().get_item_shape_data_deep_copy();
            item_copy.borrow_mut().parent_representation = Rc::downgrade(&copy);
            copy.borrow_mut().items.push(item_copy);
        }
        copy
    }

    pub fn has_geometric_representation(&self) -> bool {
        self.items
            .iter()
            .any(|i| i.borrow().has_geometric_representation(true))
    }
}
