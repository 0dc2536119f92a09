// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Schema entity handles
//!
//! The geometry core never owns schema entities. It holds [`WeakEntityRef`]s
//! to them and compares them by identity, so two handles are "the same
//! entity" only if they point at the same allocation.

use std::fmt::Debug;
use std::rc::{Rc, Weak};

use crate::attribute::AttributeValue;
use crate::error::{Error, Result};

/// Capability every schema entity exposes to the geometry layer
pub trait BuildingEntity: Debug {
    /// Stable step tag (`#123` → 123)
    fn tag(&self) -> i32;

    /// Schema class name, e.g. `IFCLOCALPLACEMENT`
    fn class_name(&self) -> &str;

    /// Positional attribute lookup; entities without attribute data return `None`
    fn attribute(&self, _index: usize) -> Option<&AttributeValue> {
        None
    }
}

/// Shared, owning entity handle
pub type EntityRef = Rc<dyn BuildingEntity>;

/// Non-owning entity handle
pub type WeakEntityRef = Weak<dyn BuildingEntity>;

/// Identity comparison of two live entities (allocation address, vtable ignored)
#[inline]
pub fn same_entity(a: &EntityRef, b: &EntityRef) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Upgrade a weak handle, failing with a descriptive error if it expired
pub fn upgrade_entity(weak: &WeakEntityRef) -> Result<EntityRef> {
    weak.upgrade()
        .ok_or_else(|| Error::ExpiredReference("schema entity was dropped".to_string()))
}

/// Tag of a weakly referenced entity, or -1 when absent or expired
pub fn weak_entity_tag(weak: Option<&WeakEntityRef>) -> i32 {
    weak.and_then(|w| w.upgrade()).map(|e| e.tag()).unwrap_or(-1)
}

/// Entity with positional attributes, used where no generated class exists
#[derive(Debug, Clone, PartialEq)]
pub struct GenericEntity {
    pub tag: i32,
    pub class_name: String,
    pub attributes: Vec<AttributeValue>,
}

impl GenericEntity {
    pub fn new(tag: i32, class_name: impl Into<String>, attributes: Vec<AttributeValue>) -> Self {
        Self {
            tag,
            class_name: class_name.into(),
            attributes,
        }
    }

    /// Wrap into a shared handle
    pub fn into_ref(self) -> EntityRef {
        Rc::new(self)
    }

    /// Get string attribute, failing if absent
    pub fn require_string(&self, index: usize) -> Result<&str> {
        self.attributes
            .get(index)
            .and_then(|v| v.as_string())
            .ok_or(Error::InvalidAttribute {
                tag: self.tag,
                index,
            })
    }
}

impl BuildingEntity for GenericEntity {
    fn tag(&self) -> i32 {
        self.tag
    }

    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn attribute(&self, index: usize) -> Option<&AttributeValue> {
        self.attributes.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_not_value() {
        let a = GenericEntity::new(5, "IFCLOCALPLACEMENT", vec![]).into_ref();
        let b = GenericEntity::new(5, "IFCLOCALPLACEMENT", vec![]).into_ref();
        let a2 = Rc::clone(&a);

        assert!(same_entity(&a, &a2));
        assert!(!same_entity(&a, &b));
    }

    #[test]
    fn test_weak_tag_and_expiry() {
        let entity = GenericEntity::new(42, "IFCWALL", vec![]).into_ref();
        let weak = Rc::downgrade(&entity);
        assert_eq!(weak_entity_tag(Some(&weak)), 42);
        assert!(upgrade_entity(&weak).is_ok());

        drop(entity);
        assert_eq!(weak_entity_tag(Some(&weak)), -1);
        assert!(matches!(upgrade_entity(&weak), Err(Error::ExpiredReference(_))));
        assert_eq!(weak_entity_tag(None), -1);
    }

    #[test]
    fn test_attribute_lookup() {
        let entity = GenericEntity::new(
            7,
            "IFCWALL",
            vec![AttributeValue::String("2O2Fr$t4X7Zf8NOew3FLOH".into())],
        );
        assert_eq!(entity.require_string(0), Ok("2O2Fr$t4X7Zf8NOew3FLOH"));
        assert_eq!(
            entity.require_string(1),
            Err(Error::InvalidAttribute { tag: 7, index: 1 })
        );
        assert!(entity.attribute(0).is_some());
    }
}
