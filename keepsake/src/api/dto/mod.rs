//! Wire types for the HTTP API.
//!
//! Kept separate from the domain models in `src/models/`; each DTO owns its
//! serde shape and the conversion to or from the domain.

pub mod common;
pub mod memories;
pub mod search;
pub mod timeline;

pub use common::*;
pub use memories::*;
pub use search::*;
pub use timeline::*;
