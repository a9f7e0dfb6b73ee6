//! Binary SerDes for the game's property-tree format (§4.4).

pub mod color;
pub mod primitives;
pub mod value;

pub use color::{format_rgba, parse_rgba};
pub use value::Value;
