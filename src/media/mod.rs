//! Upload media pipeline: pure normalization plus the disk store
pub mod normalize;
pub mod store;

pub use normalize::{NormalizedImage, SourceFormat};
pub use store::MediaStore;
