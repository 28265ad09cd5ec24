//! HTML Document Model - editable markup tree for table editing
//!
//! This crate provides the host document the table-editing core works
//! against: an arena of nodes with stable ids, boundary-point ranges,
//! a small geometry model, markup reading/writing and snapshot undo units.

mod document;
mod error;
mod layout;
mod markup;
mod node;
mod node_id;
mod range;
mod style;
mod undo;

pub use document::*;
pub use error::*;
pub use layout::*;
pub use node::*;
pub use node_id::*;
pub use range::*;
pub use style::*;
pub use undo::*;
