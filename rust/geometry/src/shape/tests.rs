// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;
use crate::bbox::BoundingBox;
use crate::input::PolyhedronData;
use crate::mesh::test_shapes::{cube, sheet};
use crate::settings::GeomProcessingParams;
use crate::transform::TransformData;
use approx::assert_relative_eq;
use ifc_shape_core::{AttributeValue, GenericEntity};
use nalgebra::{Matrix4, Point3, Vector3};
use rustc_hash::FxHashSet;
use std::rc::Rc;

fn cube_item() -> ItemRef {
    let item = ItemShapeData::new_ref();
    item.borrow_mut()
        .add_open_or_closed_polyhedron(&cube(1.0), &GeomProcessingParams::default());
    item
}

fn product_with_cube(guid: &str) -> ProductRef {
    let product = ProductShapeData::new_ref(guid);
    let rep = RepresentationData::new_ref();
    RepresentationData::add_child_item(&rep, &cube_item());
    ProductShapeData::add_representation(&product, &rep);
    product
}

#[test]
fn test_closed_and_open_paths() {
    let params = GeomProcessingParams::default();
    let mut item = ItemShapeData::new();

    assert!(item.add_closed_polyhedron(&cube(1.0), &params));
    assert_eq!(item.mesh_sets.len(), 1);

    // an open sheet is built but kept in the open list
    assert!(!item.add_closed_polyhedron(&sheet(), &params));
    assert_eq!(item.mesh_sets.len(), 1);
    assert_eq!(item.mesh_sets_open.len(), 1);

    item.add_open_or_closed_polyhedron(&sheet(), &params);
    assert_eq!(item.mesh_sets_open.len(), 2);
}

#[test]
fn test_repaired_polyhedron_with_open_edges() {
    let params = GeomProcessingParams::default();
    let mut item = ItemShapeData::new();

    // only one face survives repair, but it makes an open mesh
    let mut poly = sheet();
    poly.add_face(&[0, 1]);
    poly.add_face(&[0, 2, 77]);
    item.add_open_or_closed_polyhedron(&poly, &params);
    assert!(item.mesh_sets.is_empty());
    assert_eq!(item.mesh_sets_open.len(), 1);

    // too few vertices is a no-op on the open path
    let mut tiny = PolyhedronData::new();
    tiny.add_vertex(Point3::origin());
    item.add_open_polyhedron(&tiny, &params);
    assert_eq!(item.mesh_sets_open.len(), 1);
}

#[test]
fn test_points_polylines_text() {
    let mut item = ItemShapeData::new();
    assert!(item.is_empty());
    assert!(!item.has_geometric_representation(true));

    item.add_point(Point3::new(1.0, 2.0, 3.0));
    item.add_point(Point3::new(-1.0, 0.0, 0.0));
    assert_eq!(item.vertex_points.len(), 1);
    assert_eq!(item.vertex_points[0].borrow().vertex_count(), 2);

    let mut polyline = crate::input::PolylineSetData::new();
    polyline.begin_polyline(true);
    let a = polyline.add_vertex(Point3::new(0.0, 5.0, 0.0));
    polyline.add_polyline_index(a);
    item.add_polyline(polyline);

    item.add_text_literal(crate::input::TextItemData::new(
        "A-101",
        Matrix4::new_translation(&Vector3::new(0.0, 0.0, 9.0)),
    ));
    assert!(item.has_geometric_representation(false));

    let mut bbox = BoundingBox::new();
    item.compute_bounding_box(&mut bbox, &mut FxHashSet::default());
    assert_eq!(bbox.min, Point3::new(-1.0, 0.0, 0.0));
    assert_eq!(bbox.max, Point3::new(1.0, 5.0, 9.0));

    item.clear_mesh_geometry();
    assert!(item.is_empty());
}

#[test]
fn test_appearance_first_writer_wins() {
    let red = Rc::new(crate::appearance::AppearanceData::surface_color(7, [1.0, 0.0, 0.0, 1.0]));
    let blue = Rc::new(crate::appearance::AppearanceData::surface_color(7, [0.0, 0.0, 1.0, 1.0]));

    let mut rep = RepresentationData::new();
    assert!(rep.add_appearance(Rc::clone(&red)));
    assert!(!rep.add_appearance(blue));
    assert_eq!(rep.appearances.len(), 1);
    assert_eq!(rep.appearances[0].color_diffuse, [1.0, 0.0, 0.0, 1.0]);

    let mut product = ProductShapeData::new("p");
    assert!(product.add_appearance(Rc::clone(&red)));
    assert!(!product.add_appearance(red));
    assert!(!product.is_empty(false));
    product.clear_appearance_data();
    assert!(product.is_empty(false));
}

#[test]
fn test_item_cycle_guard() {
    let a = ItemShapeData::new_ref();
    let b = ItemShapeData::new_ref();
    let c = ItemShapeData::new_ref();

    assert!(!ItemShapeData::add_child_item(&a, &a));
    assert!(ItemShapeData::add_child_item(&a, &b));
    assert!(ItemShapeData::add_child_item(&b, &c));
    assert!(!ItemShapeData::add_child_item(&c, &a));
    assert!(!ItemShapeData::add_child_item(&a, &b));
    assert!(Rc::ptr_eq(&c.borrow().parent_item.upgrade().unwrap(), &b));
}

#[test]
fn test_add_item_data_shares_containers() {
    let source = cube_item();
    let mut target = ItemShapeData::new();
    target.add_item_data(&source.borrow());

    assert_eq!(target.mesh_sets.len(), 1);
    assert!(Rc::ptr_eq(&target.mesh_sets[0], &source.borrow().mesh_sets[0]));
    assert!(is_equal_items(&target, &source.borrow()));
}

#[test]
fn test_deep_copy_keeps_open_meshes_open() {
    let item = ItemShapeData::new_ref();
    item.borrow_mut()
        .add_open_polyhedron(&sheet(), &GeomProcessingParams::default());
    let child = cube_item();
    ItemShapeData::add_child_item(&item, &child);

    let copy = item.borrow().get_item_shape_data_deep_copy();
    let copy = copy.borrow();
    assert_eq!(copy.mesh_sets_open.len(), 1);
    assert!(copy.mesh_sets.is_empty());
    assert_eq!(copy.child_items.len(), 1);
    assert!(!Rc::ptr_eq(&copy.child_items[0], &child));
    assert!(!Rc::ptr_eq(&copy.mesh_sets_open[0], &item.borrow().mesh_sets_open[0]));
    assert!(is_equal_items(&copy, &item.borrow()));
}

#[test]
fn test_transform_composition_order() {
    let site = GenericEntity::new(1, "IFCLOCALPLACEMENT", vec![]).into_ref();
    let storey = GenericEntity::new(2, "IFCLOCALPLACEMENT", vec![]).into_ref();

    let translate = Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0));
    let rotate = Matrix4::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2);

    let mut product = ProductShapeData::new("wall");
    assert!(product.add_transform(Rc::new(TransformData::from_entity(translate, &site))));
    assert!(product.add_transform(Rc::new(TransformData::from_entity(rotate, &storey))));
    // same placement entity again is ignored
    assert!(!product.add_transform(Rc::new(TransformData::from_entity(Matrix4::identity(), &site))));
    assert_eq!(product.transforms.len(), 2);
    assert_eq!(product.transforms[0].placement_tag, 2);

    let p = product.get_transform().transform_point(&Point3::new(1.0, 0.0, 0.0));
    let expected = (translate * rotate).transform_point(&Point3::new(1.0, 0.0, 0.0));
    assert_relative_eq!(p, expected, epsilon = 1e-12);
    assert_relative_eq!(p, Point3::new(10.0, 1.0, 0.0), epsilon = 1e-12);
}

#[test]
fn test_relative_transform_skips_shared_placements() {
    let site = GenericEntity::new(1, "IFCLOCALPLACEMENT", vec![]).into_ref();
    let own = GenericEntity::new(5, "IFCLOCALPLACEMENT", vec![]).into_ref();
    let site_matrix = Matrix4::new_translation(&Vector3::new(100.0, 0.0, 0.0));
    let own_matrix = Matrix4::new_translation(&Vector3::new(0.0, 3.0, 0.0));

    let mut parent = ProductShapeData::new("storey");
    parent.add_transform(Rc::new(TransformData::from_entity(site_matrix, &site)));

    let mut child = ProductShapeData::new("wall");
    child.add_transform(Rc::new(TransformData::from_entity(site_matrix, &site)));
    child.add_transform(Rc::new(TransformData::from_entity(own_matrix, &own)));

    assert_relative_eq!(child.get_relative_transform(&parent), own_matrix, epsilon = 1e-12);
    assert_relative_eq!(
        child.get_transform(),
        site_matrix * child.get_relative_transform(&parent),
        epsilon = 1e-12
    );
    assert_relative_eq!(child.get_relative_transform(&child), Matrix4::<f64>::identity());
}

#[test]
fn test_append_representation_reparents_items() {
    let a = RepresentationData::new_ref();
    let b = RepresentationData::new_ref();
    let item = cube_item();
    RepresentationData::add_child_item(&b, &item);
    b.borrow_mut()
        .add_appearance(Rc::new(crate::appearance::AppearanceData::new(3)));

    RepresentationData::append_representation_data(&a, &b);
    assert_eq!(a.borrow().items.len(), 1);
    assert_eq!(a.borrow().appearances.len(), 1);
    assert!(Rc::ptr_eq(&item.borrow().parent_representation.upgrade().unwrap(), &a));

    RepresentationData::append_representation_data(&a, &a);
    assert_eq!(a.borrow().items.len(), 1);

    let copy = a.borrow().get_representation_data_deep_copy();
    assert!(copy.borrow().has_geometric_representation());
    a.borrow_mut().clear_all();
    assert!(!a.borrow().has_geometric_representation());
    assert!(copy.borrow().has_geometric_representation());
}

#[test]
fn test_append_representation_moves_items_once() {
    let a = RepresentationData::new_ref();
    let b = RepresentationData::new_ref();
    let item = cube_item();
    RepresentationData::add_child_item(&a, &item);
    RepresentationData::add_child_item(&b, &item);

    RepresentationData::append_representation_data(&a, &b);
    assert!(b.borrow().items.is_empty());
    assert!(b.borrow().appearances.is_empty());
    assert_eq!(a.borrow().items.len(), 1);
    for listed in &a.borrow().items {
        assert!(Rc::ptr_eq(&listed.borrow().parent_representation.upgrade().unwrap(), &a));
    }

    // refill `b` with the same item and append again
    RepresentationData::add_child_item(&b, &item);
    RepresentationData::append_representation_data(&a, &b);
    assert_eq!(a.borrow().items.len(), 1);

    a.borrow().apply_transform_to_representation(
        &Matrix4::new_translation(&Vector3::new(0.0, 0.0, 10.0)),
        1e-9,
        false,
    );
    let mut bbox = BoundingBox::default();
    a.borrow().compute_bounding_box(&mut bbox);
    assert_relative_eq!(bbox.min.z, 10.0, epsilon = 1e-12);
}

#[test]
fn test_representation_tag_recorded_on_item() {
    let rep_entity = GenericEntity::new(88, "IFCSHAPEREPRESENTATION", vec![]).into_ref();
    let rep = RepresentationData::new_ref();
    rep.borrow_mut().representation = Some(Rc::downgrade(&rep_entity));
    let item = ItemShapeData::new_ref();
    assert!(RepresentationData::add_child_item(&rep, &item));
    assert!(!RepresentationData::add_child_item(&rep, &item));
    assert!(item.borrow().used_in_representations.contains(&88));
}

#[test]
fn test_product_emptiness_and_geometry() {
    let parent = ProductShapeData::new_ref("building");
    let child = product_with_cube("wall");
    assert!(parent.borrow().is_empty(true));

    ProductShapeData::add_child_product(&parent, &child);
    assert!(parent.borrow().is_empty(false));
    assert!(!parent.borrow().is_empty(true));
    assert!(parent.borrow().has_geometric_representation(true));
    assert!(!parent.borrow().has_geometric_representation(false));

    child.borrow_mut().clear_mesh_geometry();
    assert!(child.borrow().is_empty(true));
    assert_eq!(child.borrow().representations.len(), 1);

    let item = ItemShapeData::new_ref();
    item.borrow_mut().add_point(Point3::origin());
    ProductShapeData::add_geometric_item(&parent, &item);
    assert!(parent.borrow().has_geometric_representation(false));
    assert!(Rc::ptr_eq(&item.borrow().parent_product.upgrade().unwrap(), &parent));

    parent.borrow_mut().clear_all();
    assert!(parent.borrow().children.is_empty());
}

#[test]
fn test_product_from_object_definition() {
    let wall = GenericEntity::new(
        31,
        "IFCWALL",
        vec![AttributeValue::String("0DWgwt6o1FOx7466fPk$jl".into())],
    )
    .into_ref();
    let product = ProductShapeData::from_object_definition(&wall);
    assert_eq!(product.borrow().entity_guid, "0DWgwt6o1FOx7466fPk$jl");

    let anonymous = GenericEntity::new(32, "IFCWALL", vec![AttributeValue::Null]).into_ref();
    assert_eq!(ProductShapeData::from_object_definition(&anonymous).borrow().entity_guid, "");
}

#[test]
fn test_global_bounding_box_follows_placement() {
    let site = GenericEntity::new(1, "IFCLOCALPLACEMENT", vec![]).into_ref();
    let product = product_with_cube("wall");
    product.borrow_mut().add_transform(Rc::new(TransformData::from_entity(
        Matrix4::new_translation(&Vector3::new(5.0, 0.0, 0.0)),
        &site,
    )));

    let local = compute_bounding_box_local_coords(&product, true);
    assert_eq!(local.min, Point3::new(0.0, 0.0, 0.0));

    let global = compute_bounding_box(&product, true, true);
    assert_relative_eq!(global.min, Point3::new(5.0, 0.0, 0.0), epsilon = 1e-12);
    assert_relative_eq!(global.max, Point3::new(6.0, 1.0, 1.0), epsilon = 1e-12);

    let untransformed = compute_bounding_box(&product, true, false);
    assert_eq!(untransformed, local);
}

#[test]
fn test_apply_transform_skips_identity() {
    let product = product_with_cube("wall");
    let before = compute_bounding_box_local_coords(&product, false);
    product
        .borrow()
        .apply_transform_to_product(&Matrix4::identity(), 1e-9, false, true);
    assert_eq!(compute_bounding_box_local_coords(&product, false), before);

    product.borrow().apply_transform_to_product(
        &Matrix4::new_translation(&Vector3::new(0.0, 0.0, 2.0)),
        1e-9,
        false,
        true,
    );
    let after = compute_bounding_box_local_coords(&product, false);
    assert_relative_eq!(after.min.z, 2.0, epsilon = 1e-12);
}
