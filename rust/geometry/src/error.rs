// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during geometry aggregation
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid polyhedron data: {0}")]
    InvalidPolyhedron(String),

    #[error("Vertex index {index} out of range (vertex count {vertex_count})")]
    IndexOutOfRange { index: usize, vertex_count: usize },

    #[error("Malformed face buffer: {0}")]
    MalformedFaceBuffer(String),

    #[error("Empty mesh: {0}")]
    EmptyMesh(String),

    #[error("Core entity error: {0}")]
    CoreError(#[from] ifc_shape_core::Error),
}

impl Error {
    pub fn invalid_polyhedron(details: impl Into<String>) -> Self {
        Error::InvalidPolyhedron(details.into())
    }
}
