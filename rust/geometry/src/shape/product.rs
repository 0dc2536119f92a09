// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Product nodes: placement stack, representations and child products

use super::{push_appearance, ItemRef, ProductRef, RepresentationRef, WeakProductRef};
use crate::appearance::AppearanceData;
use crate::transform::{is_matrix_identity, TransformData};
use ifc_shape_core::{EntityRef, WeakEntityRef};
use nalgebra::Matrix4;
use rustc_hash::FxHashSet;
use std::cell::RefCell;
use std::rc::Rc;

/// Geometry and placement of one product (wall, storey, building, ...)
#[derive(Debug, Default)]
pub struct ProductShapeData {
    pub entity_guid: String,
    pub object_definition: Option<WeakEntityRef>,
    pub object_placement: Option<WeakEntityRef>,
    pub representations: Vec<RepresentationRef>,
    pub added_to_spatial_structure: bool,
    pub parent: WeakProductRef,
    /// Placement stack, most recently added first
    pub transforms: Vec<Rc<TransformData>>,
    pub children: Vec<ProductRef>,
    pub appearances: Vec<Rc<AppearanceData>>,
    pub geometric_items: Vec<ItemRef>,
    pub representation: Option<WeakEntityRef>,
}

impl ProductShapeData {
    pub fn new(entity_guid: impl Into<String>) -> Self {
        Self {
            entity_guid: entity_guid.into(),
            ..Self::default()
        }
    }

    pub fn new_ref(entity_guid: impl Into<String>) -> ProductRef {
        Rc::new(RefCell::new(Self::new(entity_guid)))
    }

    /// Product node for a schema object; the guid is read from attribute 0
    pub fn from_object_definition(entity: &EntityRef) -> ProductRef {
        let guid = match entity.attribute(0).and_then(|a| a.as_string()) {
            Some(guid) => guid.to_string(),
            None => {
                tracing::debug!(tag = entity.tag(), "object definition without guid");
                String::new()
            }
        };
        let product = Self {
            object_definition: Some(Rc::downgrade(entity)),
            ..Self::new(guid)
        };
        Rc::new(RefCell::new(product))
    }

    /// Matrix placing this product's geometry in global coordinates
    pub fn get_transform(&self) -> Matrix4<f64> {
        self.transforms
            .iter()
            .fold(Matrix4::identity(), |m, t| t.matrix * m)
    }

    /// Matrix relative to `other`: transforms shared at the outer end of both
    /// stacks (same placement tag) are skipped, the rest is composed like
    /// [`get_transform`](Self::get_transform).
    pub fn get_relative_transform(&self, other: &ProductShapeData) -> Matrix4<f64> {
        let shared = self
            .transforms
            .iter()
            .rev()
            .zip(other.transforms.iter().rev())
            .take_while(|(a, b)| a.placement_tag >= 0 && a.placement_tag == b.placement_tag)
            .count();
        let own = self.transforms.len() - shared;
        self.transforms[..own]
            .iter()
            .fold(Matrix4::identity(), |m, t| t.matrix * m)
    }

    /// Prepend a placement unless the same placement entity is already on the stack
    pub fn add_transform(&mut self, transform: Rc<TransformData>) -> bool {
        if self.transforms.iter().any(|t| t.is_same_transform(&transform)) {
            return false;
        }
        self.transforms.insert(0, transform);
        true
    }

    /// True if `check` is on the parent chain of this product
    pub fn is_contained_in_parents_list(&self, check: &ProductRef) -> bool {
        let mut visited: FxHashSet<*const RefCell<ProductShapeData>> = FxHashSet::default();
        let mut current = self.parent.upgrade();
        while let Some(node) = current {
            if Rc::ptr_eq(&node, check) {
                return true;
            }
            if !visited.insert(Rc::as_ptr(&node)) {
                break;
            }
            current = node.borrow().parent.upgrade();
        }
        false
    }

    /// Attach `child` below `parent`.
    ///
    /// Refused (returns false) for self-attachment, duplicates, and anything
    /// that would close a cycle in the product tree.
    pub fn add_child_product(parent: &ProductRef, child: &ProductRef) -> bool {
        if Rc::ptr_eq(parent, child) {
            tracing::warn!(guid = %parent.borrow().entity_guid, "cannot add product as its own child");
            return false;
        }
        if parent.borrow().is_contained_in_parents_list(child) || is_in_subtree(child, parent) {
            tracing::warn!(
                guid = %parent.borrow().entity_guid,
                child = %child.borrow().entity_guid,
                "adding child product would create a cycle"
            );
            return false;
        }
        if parent
            .borrow()
            .children
            .iter()
            .any(|c| Rc::ptr_eq(c, child))
        {
            tracing::debug!(guid = %child.borrow().entity_guid, "child product already added");
            return false;
        }

        parent.borrow_mut().children.push(Rc::clone(child));
        child.borrow_mut().parent = Rc::downgrade(parent);
        true
    }

    pub fn add_geometric_item(product: &ProductRef, item: &ItemRef) {
        item.borrow_mut().parent_product = Rc::downgrade(product);
        product.borrow_mut().geometric_items.push(Rc::clone(item));
    }

    /// Attach a representation; an already attached one is not added twice
    pub fn add_representation(product: &ProductRef, rep: &RepresentationRef) -> bool {
        if product
            .borrow()
            .representations
            .iter()
            .any(|r| Rc::ptr_eq(r, rep))
        {
            return false;
        }
        rep.borrow_mut().parent_product = Rc::downgrade(product);
        product.borrow_mut().representations.push(Rc::clone(rep));
        true
    }

    /// Add a style unless one with the same style id is present
    pub fn add_appearance(&mut self, appearance: Rc<AppearanceData>) -> bool {
        push_appearance(&mut self.appearances, appearance)
    }

    pub fn clear_appearance_data(&mut self) {
        self.appearances.clear();
    }

    /// Drop the items of all representations, keeping the representations
    pub fn clear_mesh_geometry(&mut self) {
        self.appearances.clear();
        self.object_placement = None;
        for rep in &self.representations {
            rep.borrow_mut().items.clear();
        }
        self.added_to_spatial_structure = false;
    }

    pub fn clear_all(&mut self) {
        self.appearances.clear();
        self.object_definition = None;
        self.object_placement = None;
        self.children.clear();
        self.representations.clear();
        self.added_to_spatial_structure = false;
    }

    /// Transform the geometry of all representations (and optionally children)
    pub fn apply_transform_to_product(
        &self,
        matrix: &Matrix4<f64>,
        eps: f64,
        identity_checked: bool,
        apply_to_children: bool,
    ) {
        if !identity_checked && is_matrix_identity(matrix) {
            return;
        }
        for rep in &self.representations {
            rep.borrow().apply_transform_to_representation(matrix, eps, true);
        }
        if apply_to_children {
            for child in &self.children {
                child
                    .borrow()
                    .apply_transform_to_product(matrix, eps, true, apply_to_children);
            }
        }
    }

    /// Independent copy of the product subtree.
    ///
    /// Geometry is copied, appearances and entity references are shared. The
    /// copy keeps the original's parent link but is not registered as a child
    /// there.
    pub fn get_deep_copy(&self) -> ProductRef {
        let copy = Rc::new(RefCell::new(ProductShapeData {
            entity_guid: self.entity_guid.clone(),
            object_definition: self.object_definition.clone(),
            object_placement: self.object_placement.clone(),
            added_to_spatial_structure: self.added_to_spatial_structure,
            appearances: self.appearances.clone(),
            representation: self.representation.clone(),
            transforms: self
                .transforms
                .iter()
                .map(|t| Rc::new(TransformData::clone(t)))
                .collect(),
            ..ProductShapeData::default()
        }));

        for rep in &self.representations {
            let rep_copy = rep.borrow().get_representation_data_deep_copy();
            ProductShapeData::add_representation(&copy, &rep_copy);
        }
        for item in &self.geometric_items {
            let item_copy = item.borrow().get_item_shape_data_deep_copy();
            ProductShapeData::add_geometric_item(&copy, &item_copy);
        }
        for child in &self.children {
            let child_copy = child.borrow().get_deep_copy();
            ProductShapeData::add_child_product(&copy, &child_copy);
        }
        copy.borrow_mut().parent = self.parent.clone();
        copy
    }

    /// True if there is no geometry and no appearance on this node (and
    /// optionally on any child)
    pub fn is_empty(&self, check_children: bool) -> bool {
        if !self.geometric_items.is_empty() || !self.appearances.is_empty() {
            return false;
        }
        if self
            .representations
            .iter()
            .any(|r| r.borrow().items.iter().any(|i| !i.borrow().is_empty()))
        {
            return false;
        }
        !check_children || self.children.iter().all(|c| c.borrow().is_empty(true))
    }

    pub fn has_geometric_representation(&self, include_children: bool) -> bool {
        if include_children
            && self
                .children
                .iter()
                .any(|c| c.borrow().has_geometric_representation(true))
        {
            return true;
        }
        self.geometric_items
            .iter()
            .any(|i| i.borrow().has_geometric_representation(include_children))
            || self
                .representations
                .iter()
                .any(|r| r.borrow().has_geometric_representation())
    }
}

/// True if `target` is reachable from `root` through child links
fn is_in_subtree(root: &ProductRef, target: &ProductRef) -> bool {
    let mut visited: FxHashSet<*const RefCell<ProductShapeData>> = FxHashSet::default();
    let mut stack = vec![Rc::clone(root)];
    while let Some(node) = stack.pop() {
        if Rc::ptr_eq(&node, target) {
            return true;
        }
        if !visited.insert(Rc::as_ptr(&node)) {
            continue;
        }
        stack.extend(node.borrow().children.iter().cloned());
    }
    false
}
