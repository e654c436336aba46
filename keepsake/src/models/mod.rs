mod common;
mod ingest;
mod memory;
mod search;
mod timeline;

pub use common::*;
pub use ingest::*;
pub use memory::*;
pub use search::*;
pub use timeline::*;
