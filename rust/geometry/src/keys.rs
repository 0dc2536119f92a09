// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh key types for arena-based storage.
//!
//! Keys are created by `slotmap::SlotMap` and stay valid in a cloned mesh set,
//! which is what makes [`MeshSet`](crate::mesh::MeshSet) cloning a plain
//! value copy.

use slotmap::new_key_type;

new_key_type! {
    /// Key for a face (one cyclic half-edge loop).
    pub struct FaceKey;

    /// Key for a half-edge (directed edge owned by one face).
    pub struct EdgeKey;
}
