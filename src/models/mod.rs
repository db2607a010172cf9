pub mod document;
pub mod price;

pub use document::*;
pub use price::*;
