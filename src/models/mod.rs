//! Data models for orders, templates, and the compose draft

mod draft;
mod order;
mod template;

pub use draft::*;
pub use order::*;
pub use template::*;
