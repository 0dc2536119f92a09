// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC-Shape Core
//!
//! The schema-entity capability consumed by the geometry aggregation core.
//!
//! Generated schema classes live outside this workspace. The geometry layer
//! only needs three things from them: a stable integer tag, shared ownership,
//! and the ability to be referenced weakly. [`BuildingEntity`] captures that,
//! with optional positional attribute lookup.
//!
//! ```rust
//! use ifc_shape_core::{same_entity, GenericEntity};
//! use std::rc::Rc;
//!
//! let placement = GenericEntity::new(12, "IFCLOCALPLACEMENT", vec![]).into_ref();
//! let weak = Rc::downgrade(&placement);
//! assert!(same_entity(&placement, &weak.upgrade().unwrap()));
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization support for attribute values

pub mod attribute;
pub mod entity;
pub mod error;

pub use attribute::AttributeValue;
pub use entity::{
    same_entity, upgrade_entity, weak_entity_tag, BuildingEntity, EntityRef, GenericEntity,
    WeakEntityRef,
};
pub use error::{Error, Result};
