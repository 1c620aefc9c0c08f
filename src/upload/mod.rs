//! Upload Module
//!
//! Image upload model and the size/MIME policy enforced before transmission.

pub mod validation;

pub use validation::{ImageUpload, UploadError, UploadPolicy};
