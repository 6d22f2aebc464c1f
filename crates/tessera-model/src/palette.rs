// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The palette document: `<colors><color symbol value/></colors>`, mapping
//! symbols to display colors.

use std::collections::BTreeMap;

use roxmltree::Document;

use tessera_core::Symbol;

use crate::document::get_char;
use crate::error::ModelError;

/// An sRGB display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

/// Symbol-to-color assignments.
pub type Palette = BTreeMap<Symbol, Color>;

/// Parses a palette document.
///
/// Each `value` must be exactly six hexadecimal digits (`RRGGBB`).
pub fn parse_palette(src: &str) -> Result<Palette, ModelError> {
    let doc = Document::parse(src)?;
    let mut palette = Palette::new();

    for color in doc
        .root_element()
        .children()
        .filter(|n| n.has_tag_name("color"))
    {
        let symbol = get_char(&color, "symbol")?;
        let value = color.attribute("value").unwrap_or_default();
        let offset = color.range().start;

        if value.len() != 6 || !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ModelError::BadColor { offset });
        }
        let channel = |i: usize| {
            u8::from_str_radix(&value[2 * i..2 * i + 2], 16)
                .map_err(|_| ModelError::BadColor { offset })
        };

        palette.insert(
            symbol,
            Color {
                r: channel(0)?,
                g: channel(1)?,
                b: channel(2)?,
            },
        );
    }

    Ok(palette)
}
