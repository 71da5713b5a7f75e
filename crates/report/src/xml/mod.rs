//! Element tree used by the preparation passes

mod reader;
mod tree;
mod writer;

pub use reader::parse_document;
pub use tree::{Element, NodeData, NodeId, Tree};
pub use writer::write_document;
