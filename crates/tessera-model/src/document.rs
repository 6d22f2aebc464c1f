// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Attribute accessors shared by the program and palette readers.
//!
//! Each accessor produces a [`ModelError`] naming the attribute, the
//! element, and the node's byte offset on failure.

use roxmltree::Node;

use tessera_core::{Symbol, SymbolSet};

use crate::error::ModelError;

pub(crate) fn tag(node: &Node<'_, '_>) -> String {
    node.tag_name().name().to_owned()
}

pub(crate) fn offset(node: &Node<'_, '_>) -> usize {
    node.range().start
}

pub(crate) fn get_string<'a>(
    node: &Node<'a, '_>,
    name: &'static str,
) -> Result<&'a str, ModelError> {
    let value = node
        .attribute(name)
        .ok_or_else(|| ModelError::MissingAttribute {
            attribute: name,
            element: tag(node),
            offset: offset(node),
        })?;
    if value.is_empty() {
        return Err(ModelError::EmptyAttribute {
            attribute: name,
            element: tag(node),
            offset: offset(node),
        });
    }
    Ok(value)
}

pub(crate) fn get_char(node: &Node<'_, '_>, name: &'static str) -> Result<Symbol, ModelError> {
    let value = get_string(node, name)?;
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ModelError::NotASymbol {
            attribute: name,
            element: tag(node),
            offset: offset(node),
        }),
    }
}

pub(crate) fn get_optchar(
    node: &Node<'_, '_>,
    name: &'static str,
) -> Result<Option<Symbol>, ModelError> {
    if node.attribute(name).is_none() {
        return Ok(None);
    }
    get_char(node, name).map(Some)
}

pub(crate) fn get_charset(node: &Node<'_, '_>, name: &'static str) -> Result<SymbolSet, ModelError> {
    let value = get_string(node, name)?;
    let set: SymbolSet = value.chars().collect();
    if set.len() != value.chars().count() {
        return Err(ModelError::DuplicateSymbol {
            attribute: name,
            element: tag(node),
            offset: offset(node),
        });
    }
    Ok(set)
}

pub(crate) fn get_bool(
    node: &Node<'_, '_>,
    name: &'static str,
    default: bool,
) -> Result<bool, ModelError> {
    match node.attribute(name) {
        None => Ok(default),
        Some("true" | "True" | "1") => Ok(true),
        Some("false" | "False" | "0") => Ok(false),
        Some(_) => Err(ModelError::BadValue {
            attribute: name,
            element: tag(node),
            offset: offset(node),
        }),
    }
}

pub(crate) fn get_u32(
    node: &Node<'_, '_>,
    name: &'static str,
    default: u32,
) -> Result<u32, ModelError> {
    parse_or(node, name, default)
}

pub(crate) fn get_i32(
    node: &Node<'_, '_>,
    name: &'static str,
    default: i32,
) -> Result<i32, ModelError> {
    parse_or(node, name, default)
}

pub(crate) fn get_f64(
    node: &Node<'_, '_>,
    name: &'static str,
    default: f64,
) -> Result<f64, ModelError> {
    parse_or(node, name, default)
}

fn parse_or<T: std::str::FromStr>(
    node: &Node<'_, '_>,
    name: &'static str,
    default: T,
) -> Result<T, ModelError> {
    match node.attribute(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ModelError::BadValue {
            attribute: name,
            element: tag(node),
            offset: offset(node),
        }),
    }
}
