//! Store - Open Document package I/O
//!
//! This crate unpacks Open Document files (ZIP containers) into memory,
//! lets callers replace individual entries, and repacks or extracts the
//! result. Binary entries such as images and fonts are carried through
//! untouched.

mod error;
mod package;

pub use error::*;
pub use package::{
    Package, PackageEntry, CONTENT_ENTRY, MIMETYPE_ENTRY, STYLES_ENTRY,
};
