// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Parse-error taxonomy for program and palette documents.
//!
//! Every variant names the attribute, the element, and the byte offset of
//! the offending node, so a failing document can be fixed from the message
//! alone. Parse errors are fatal: the engine never starts on a malformed
//! document.

use thiserror::Error;

/// Everything that can go wrong while reading a document.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The document is not well-formed XML.
    #[error("malformed document: {0}")]
    Xml(#[from] roxmltree::Error),

    /// A required attribute is absent.
    #[error("missing '{attribute}' attribute in '{element}' node [:{offset}]")]
    MissingAttribute {
        /// The absent attribute.
        attribute: &'static str,
        /// Tag name of the node.
        element: String,
        /// Byte offset of the node in the document.
        offset: usize,
    },

    /// A required attribute is present but empty.
    #[error("empty '{attribute}' attribute in '{element}' node [:{offset}]")]
    EmptyAttribute {
        /// The empty attribute.
        attribute: &'static str,
        /// Tag name of the node.
        element: String,
        /// Byte offset of the node in the document.
        offset: usize,
    },

    /// An attribute that must hold exactly one character holds more.
    #[error("only one character allowed for '{attribute}' attribute of '{element}' node [:{offset}]")]
    NotASymbol {
        /// The offending attribute.
        attribute: &'static str,
        /// Tag name of the node.
        element: String,
        /// Byte offset of the node in the document.
        offset: usize,
    },

    /// A symbol-set attribute repeats a symbol.
    #[error("duplicate value in '{attribute}' attribute of '{element}' node [:{offset}]")]
    DuplicateSymbol {
        /// The offending attribute.
        attribute: &'static str,
        /// Tag name of the node.
        element: String,
        /// Byte offset of the node in the document.
        offset: usize,
    },

    /// An attribute failed numeric or boolean conversion.
    #[error("cannot parse '{attribute}' attribute of '{element}' node [:{offset}]")]
    BadValue {
        /// The offending attribute.
        attribute: &'static str,
        /// Tag name of the node.
        element: String,
        /// Byte offset of the node in the document.
        offset: usize,
    },

    /// A rule's `in` and `out` patterns disagree in shape.
    #[error("attributes 'in' and 'out' of '{element}' node must be of same shape [:{offset}]")]
    ShapeMismatch {
        /// Tag name of the node.
        element: String,
        /// Byte offset of the node in the document.
        offset: usize,
    },

    /// A pattern attribute is empty or ragged.
    #[error("bad '{attribute}' pattern in '{element}' node [:{offset}]: {source}")]
    Pattern {
        /// The offending attribute.
        attribute: &'static str,
        /// Tag name of the node.
        element: String,
        /// Byte offset of the node in the document.
        offset: usize,
        /// The underlying pattern defect.
        source: tessera_core::PatternError,
    },

    /// A `field` node carries both of `to` and `from`, or neither.
    #[error("exactly one of 'from' or 'to' allowed in 'field' node [:{offset}]")]
    FieldDirection {
        /// Byte offset of the node in the document.
        offset: usize,
    },

    /// A symmetry tag names no known subgroup.
    #[error("unknown symmetry '{tag}' [:{offset}]")]
    UnknownSymmetry {
        /// The unrecognized tag.
        tag: String,
        /// Byte offset of the node in the document.
        offset: usize,
    },

    /// A node's tag names no program construct.
    #[error("unknown tag '{tag}' [:{offset}]")]
    UnknownTag {
        /// The unrecognized tag.
        tag: String,
        /// Byte offset of the node in the document.
        offset: usize,
    },

    /// A palette color is not exactly six hexadecimal digits.
    #[error("attribute 'value' should be a rgb hex value in 'color' node [:{offset}]")]
    BadColor {
        /// Byte offset of the node in the document.
        offset: usize,
    },
}
