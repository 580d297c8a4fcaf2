//! Attribute trees returned by enumerators and the paths that address them.

mod path;
mod value;

pub use path::{AttrPath, AttrPathError, PathSegment};
pub use value::{AttrMap, AttrValue};
