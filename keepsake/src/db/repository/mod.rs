mod media;
mod memories;

pub use media::{MediaRepository, MediaSummary};
pub use memories::{MemoryRepository, ScanPage};
