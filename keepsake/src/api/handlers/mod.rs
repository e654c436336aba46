pub mod health;
pub mod memories;
pub mod search;
pub mod timeline;

pub use health::health_check;
