// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry of one representation item

use super::{
    push_appearance, ItemRef, SharedMeshSet, SharedPolylineSet, SharedTextItem, SharedVertexData,
    WeakItemRef, WeakProductRef, WeakRepresentationRef,
};
use crate::appearance::AppearanceData;
use crate::bbox::BoundingBox;
use crate::input::{PolyhedronData, PolylineSetData, TextItemData, VertexData};
use crate::mesh::{is_equal_mesh_sets, MeshSet};
use crate::settings::GeomProcessingParams;
use crate::transform::{flips_handedness, is_matrix_identity};
use crate::validation::{check_polyhedron_data, fix_polyhedron_data};
use ifc_shape_core::WeakEntityRef;
use nalgebra::{Matrix4, Point3};
use rustc_hash::FxHashSet;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

/// What happened to a polyhedron offered to the closed-mesh path
enum ClosedOutcome {
    Closed,
    /// Built, but had open edges and went to the open list
    Open,
    /// Not usable as a mesh at all
    Rejected,
}

/// Raw and meshed geometry of one representation item
#[derive(Debug, Default)]
pub struct ItemShapeData {
    pub vertex_points: Vec<SharedVertexData>,
    pub polylines: Vec<SharedPolylineSet>,
    /// Closed mesh sets
    pub mesh_sets: Vec<SharedMeshSet>,
    pub mesh_sets_open: Vec<SharedMeshSet>,
    pub appearances: Vec<Rc<AppearanceData>>,
    pub text_literals: Vec<SharedTextItem>,
    pub parent_representation: WeakRepresentationRef,
    pub parent_product: WeakProductRef,
    pub parent_item: WeakItemRef,
    pub child_items: Vec<ItemRef>,
    /// Schema representation item this geometry was produced from
    pub representation_item: Option<WeakEntityRef>,
    pub representation: Option<WeakEntityRef>,
    /// Tags of the representations this item is part of
    pub used_in_representations: BTreeSet<i32>,
}

impl ItemShapeData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_ref() -> ItemRef {
        Rc::new(RefCell::new(Self::new()))
    }

    /// No geometry and no appearance at all
    pub fn is_empty(&self) -> bool {
        self.vertex_points.is_empty()
            && self.polylines.is_empty()
            && self.mesh_sets.is_empty()
            && self.mesh_sets_open.is_empty()
            && self.appearances.is_empty()
            && self.text_literals.is_empty()
    }

    /// Attach `child` below `parent`.
    ///
    /// Refused (returns false) if `child` is `parent`, is already attached, or
    /// if `parent` is reachable from `child` in either direction.
    pub fn add_child_item(parent: &ItemRef, child: &ItemRef) -> bool {
        if Rc::ptr_eq(parent, child) {
            tracing::warn!("cannot add item as its own child");
            return false;
        }
        if is_ancestor(parent, child) || is_in_subtree(child, parent) {
            tracing::warn!("adding child item would create a cycle");
            return false;
        }
        if parent
            .borrow()
            .child_items
            .iter()
            .any(|c| Rc::ptr_eq(c, child))
        {
            tracing::debug!("child item already attached");
            return false;
        }

        parent.borrow_mut().child_items.push(Rc::clone(child));
        child.borrow_mut().parent_item = Rc::downgrade(parent);
        true
    }

    /// Store a polyhedron as closed mesh if possible, otherwise as open mesh
    pub fn add_open_or_closed_polyhedron(&mut self, poly: &PolyhedronData, params: &GeomProcessingParams) {
        if let ClosedOutcome::Rejected = self.try_add_closed(poly, params) {
            self.add_open_polyhedron(poly, params);
        }
    }

    /// Validate, repair once if needed, and store as closed mesh.
    ///
    /// Returns true only if a closed mesh was stored. A mesh that turns out
    /// to have open edges is kept in the open list.
    pub fn add_closed_polyhedron(&mut self, poly: &PolyhedronData, params: &GeomProcessingParams) -> bool {
        matches!(self.try_add_closed(poly, params), ClosedOutcome::Closed)
    }

    fn try_add_closed(&mut self, poly: &PolyhedronData, params: &GeomProcessingParams) -> ClosedOutcome {
        let mut poly = poly.clone();
        if let Err(e) = check_polyhedron_data(&poly, params) {
            tracing::debug!(tag = params.entity_tag, details = %e, "repairing polyhedron");
            if !fix_polyhedron_data(&mut poly, true, params) {
                tracing::warn!(tag = params.entity_tag, "polyhedron still invalid after repair");
                return ClosedOutcome::Rejected;
            }
        }

        let mesh_set = match MeshSet::from_polyhedron_data(&poly, params.eps_merge_points) {
            Ok(mesh_set) => mesh_set,
            Err(e) => {
                tracing::warn!(tag = params.entity_tag, error = %e, "mesh construction failed");
                return ClosedOutcome::Rejected;
            }
        };

        if mesh_set.is_closed() {
            self.mesh_sets.push(Rc::new(RefCell::new(mesh_set)));
            ClosedOutcome::Closed
        } else {
            tracing::debug!(tag = params.entity_tag, "mesh has open edges");
            self.mesh_sets_open.push(Rc::new(RefCell::new(mesh_set)));
            ClosedOutcome::Open
        }
    }

    /// Store a polyhedron as open mesh; fewer than 3 vertices is a no-op
    pub fn add_open_polyhedron(&mut self, poly: &PolyhedronData, params: &GeomProcessingParams) {
        if poly.vertex_count() < 3 {
            return;
        }
        let mut poly = poly.clone();
        if check_polyhedron_data(&poly, params).is_err() && !fix_polyhedron_data(&mut poly, true, params) {
            tracing::debug!(tag = params.entity_tag, "open polyhedron still has defects after repair");
        }
        match MeshSet::from_polyhedron_data(&poly, params.eps_merge_points) {
            Ok(mesh_set) => self.mesh_sets_open.push(Rc::new(RefCell::new(mesh_set))),
            Err(e) => tracing::warn!(tag = params.entity_tag, error = %e, "open mesh construction failed"),
        }
    }

    /// Add a loose point; all points share one vertex block
    pub fn add_point(&mut self, point: Point3<f64>) {
        if self.vertex_points.is_empty() {
            self.vertex_points.push(Rc::new(RefCell::new(VertexData::new())));
        }
        self.vertex_points[0].borrow_mut().add_vertex(point);
    }

    pub fn add_polyline(&mut self, polyline: PolylineSetData) {
        self.polylines.push(Rc::new(RefCell::new(polyline)));
    }

    pub fn add_text_literal(&mut self, text: TextItemData) {
        self.text_literals.push(Rc::new(RefCell::new(text)));
    }

    /// Add a style unless one with the same style id is present
    pub fn add_appearance(&mut self, appearance: Rc<AppearanceData>) -> bool {
        push_appearance(&mut self.appearances, appearance)
    }

    /// Transform all geometry of this item and its children in place.
    ///
    /// Mesh normals are recomputed with `eps`. A handedness-flipping matrix
    /// inverts every mesh so faces keep pointing outward.
    pub fn apply_transform_to_item(&mut self, matrix: &Matrix4<f64>, eps: f64, identity_checked: bool) {
        if !identity_checked && is_matrix_identity(matrix) {
            return;
        }

        for vertex_data in &self.vertex_points {
            vertex_data.borrow_mut().transform(matrix);
        }
        for polyline in &self.polylines {
            polyline.borrow_mut().vertices.transform(matrix);
        }

        let invert = flips_handedness(matrix);
        for mesh_set in &self.mesh_sets_open {
            let mut mesh_set = mesh_set.borrow_mut();
            mesh_set.transform_vertices(matrix);
            mesh_set.recalc(eps);
            if invert {
                mesh_set.invert();
            }
        }
        for mesh_set in &self.mesh_sets {
            let mut mesh_set = mesh_set.borrow_mut();
            mesh_set.transform_vertices(matrix);
            mesh_set.recalc(eps);
            if invert {
                mesh_set.invert();
                mesh_set.calc_orientation();
            }
        }

        for text in &self.text_literals {
            let mut text = text.borrow_mut();
            text.text_position = matrix * text.text_position;
        }

        for child in &self.child_items {
            child.borrow_mut().apply_transform_to_item(matrix, eps, true);
        }
    }

    /// Independent copy of all geometry (open meshes stay open, children are
    /// copied too). Appearances are shared, parents are left unset.
    pub fn get_item_shape_data_deep_copy(&self) -> ItemRef {
        let copy = ItemShapeData {
            vertex_points: self
                .vertex_points
                .iter()
                .map(|v| Rc::new(RefCell::new(v.borrow().clone())))
                .collect(),
            polylines: self
                .polylines
                .iter()
                .map(|p| Rc::new(RefCell::new(p.borrow().clone())))
                .collect(),
            mesh_sets: self
                .mesh_sets
                .iter()
                .map(|m| Rc::new(RefCell::new(m.borrow().clone())))
                .collect(),
            mesh_sets_open: self
                .mesh_sets_open
                .iter()
                .map(|m| Rc::new(RefCell::new(m.borrow().clone())))
                .collect(),
            appearances: self.appearances.clone(),
            text_literals: self
                .text_literals
                .iter()
                .map(|t| Rc::new(RefCell::new(t.borrow().clone())))
                .collect(),
            representation_item: self.representation_item.clone(),
            representation: self.representation.clone(),
            used_in_representations: self.used_in_representations.clone(),
            ..ItemShapeData::default()
        };
        let copy = Rc::new(RefCell::new(copy));

        for child in &self.child_items {
            let child_copy = child.borrow().get_item_shape_data_deep_copy();
            child_copy.borrow_mut().parent_item = Rc::downgrade(&copy);
            copy.borrow_mut().child_items.push(child_copy);
        }
        copy
    }

    /// Append the containers of `other`; they are shared, not copied
    pub fn add_item_data(&mut self, other: &ItemShapeData) {
        self.vertex_points.extend(other.vertex_points.iter().cloned());
        self.polylines.extend(other.polylines.iter().cloned());
        self.mesh_sets.extend(other.mesh_sets.iter().cloned());
        self.mesh_sets_open.extend(other.mesh_sets_open.iter().cloned());
        self.appearances.extend(other.appearances.iter().cloned());
        self.text_literals.extend(other.text_literals.iter().cloned());
    }

    /// Grow `bbox` by all geometry of this item and its children.
    ///
    /// `visited` holds the children already walked, so a child reachable
    /// twice is only counted once.
    pub fn compute_bounding_box(&self, bbox: &mut BoundingBox, visited: &mut FxHashSet<*const RefCell<ItemShapeData>>) {
        for vertex_data in &self.vertex_points {
            for p in &vertex_data.borrow().points {
                bbox.expand(p);
            }
        }
        for polyline in &self.polylines {
            for p in &polyline.borrow().vertices.points {
                bbox.expand(p);
            }
        }
        for mesh_set in self.mesh_sets_open.iter().chain(&self.mesh_sets) {
            bbox.union(&mesh_set.borrow().aabb());
        }
        for text in &self.text_literals {
            bbox.expand(&text.borrow().anchor());
        }

        for child in &self.child_items {
            if !visited.insert(Rc::as_ptr(child)) {
                continue;
            }
            let mut child_bbox = BoundingBox::new();
            child.borrow().compute_bounding_box(&mut child_bbox, visited);
            bbox.union(&child_bbox);
        }
    }

    /// True if the item carries meshes, points, polylines or text
    pub fn has_geometric_representation(&self, include_children: bool) -> bool {
        if !self.mesh_sets.is_empty()
            || !self.mesh_sets_open.is_empty()
            || !self.text_literals.is_empty()
            || !self.vertex_points.is_empty()
            || !self.polylines.is_empty()
        {
            return true;
        }
        include_children
            && self
                .child_items
                .iter()
                .any(|c| c.borrow().has_geometric_representation(true))
    }

    /// Drop all geometry and appearances, recursively
    pub fn clear_mesh_geometry(&mut self) {
        self.mesh_sets.clear();
        self.mesh_sets_open.clear();
        self.text_literals.clear();
        self.appearances.clear();
        self.vertex_points.clear();
        self.polylines.clear();
        for child in &self.child_items {
            child.borrow_mut().clear_mesh_geometry();
        }
    }
}

/// True if `candidate` is on the parent chain of `item`
fn is_ancestor(item: &ItemRef, candidate: &ItemRef) -> bool {
    let mut visited: FxHashSet<*const RefCell<ItemShapeData>> = FxHashSet::default();
    let mut current = item.borrow().parent_item.upgrade();
    while let Some(node) = current {
        if Rc::ptr_eq(&node, candidate) {
            return true;
        }
        if !visited.insert(Rc::as_ptr(&node)) {
            break;
        }
        current = node.borrow().parent_item.upgrade();
    }
    false
}

/// True if `target` is reachable from `root` through child links
fn is_in_subtree(root: &ItemRef, target: &ItemRef) -> bool {
    let mut visited: FxHashSet<*const RefCell<ItemShapeData>> = FxHashSet::default();
    let mut stack = vec![Rc::clone(root)];
    while let Some(node) = stack.pop() {
        if Rc::ptr_eq(&node, target) {
            return true;
        }
        if !visited.insert(Rc::as_ptr(&node)) {
            continue;
        }
        stack.extend(node.borrow().child_items.iter().cloned());
    }
    false
}

/// Structural comparison of the mesh sets of two items
pub fn is_equal_items(a: &ItemShapeData, b: &ItemShapeData) -> bool {
    if a.mesh_sets.len() != b.mesh_sets.len() || a.mesh_sets_open.len() != b.mesh_sets_open.len() {
        return false;
    }
    let pairs = a
        .mesh_sets
        .iter()
        .zip(&b.mesh_sets)
        .chain(a.mesh_sets_open.iter().zip(&b.mesh_sets_open));
    for (ma, mb) in pairs {
        if Rc::ptr_eq(ma, mb) {
            continue;
        }
        if !is_equal_mesh_sets(&ma.borrow(), &mb.borrow()) {
            return false;
        }
    }
    true
}
