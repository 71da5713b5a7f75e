//! Open Document names used by the preparation passes
//!
//! Element and attribute names are compared by local name, so documents
//! that bind the usual prefixes to other namespaces are handled the same way.

/// ODF XML namespaces
pub mod namespaces {
    pub const OFFICE: &str = "urn:oasis:names:tc:opendocument:xmlns:office:1.0";
    pub const TEXT: &str = "urn:oasis:names:tc:opendocument:xmlns:text:1.0";
    pub const TABLE: &str = "urn:oasis:names:tc:opendocument:xmlns:table:1.0";
    /// Dublin Core, used for annotation authors and dates
    pub const DC: &str = "http://purl.org/dc/elements/1.1/";
}

/// Element names
pub mod elements {
    /// Qualified paragraph name; paragraphs are selected by prefix as well
    pub const TEXT_P: &str = "text:p";

    pub const BODY: &str = "body";
    pub const P: &str = "p";
    /// Heading; like `p`, its whitespace is part of the text
    pub const H: &str = "h";
    pub const SPAN: &str = "span";
    /// Soft-space placeholder
    pub const S: &str = "s";
    pub const ANNOTATION: &str = "annotation";
    pub const ANNOTATION_END: &str = "annotation-end";
    pub const TABLE_ROW: &str = "table-row";
}

/// Attribute names
pub mod attributes {
    pub const STYLE_NAME: &str = "style-name";
}

/// Local part of a possibly prefixed name
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}
