// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for entity operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the schema-entity layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Entity #{tag}: attribute {index} is missing or has the wrong type")]
    InvalidAttribute { tag: i32, index: usize },

    #[error("Entity reference expired: {0}")]
    ExpiredReference(String),
}
