//! Image payload handling.
//!
//! - [`codec`]: base64 transport encoding and image container sniffing.
//! - [`thumbnail`]: downscaled JPEG previews for the timeline.

pub mod codec;
pub mod thumbnail;

pub use codec::{content_type, decode, encode, DecodeError};
pub use thumbnail::make_thumbnail;
