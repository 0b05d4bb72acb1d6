//! Colours: shape fills, square outline and UI chrome, optionally loaded from a
//! `theme[key]="#RRGGBB"` file.

use crate::piece::Shape;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Theme-file keys for the shape fills, in `Shape::ALL` order.
const SHAPE_KEYS: [&str; 7] = [
    "horizontal",
    "left_corner",
    "right_corner",
    "square",
    "step_up_right",
    "pyramid",
    "step_up_left",
];

#[derive(Debug, Clone)]
pub struct Theme {
    /// Fill colour per shape, indexed by `Shape::color_index`.
    pub shapes: [Color; 7],
    /// Square outline.
    pub outline: Color,
    /// Playfield background.
    pub bg: Color,
    /// Borders.
    pub div_line: Color,
    /// Read-outs.
    pub main_fg: Color,
    /// Titles and the focused control.
    pub title: Color,
    /// Disabled controls.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}

impl Theme {
    /// Cyan, blue, gray, yellow, green, magenta, red on a dark field; black outlines.
    pub const fn classic() -> Self {
        Self {
            shapes: [
                Color::Cyan,
                Color::Blue,
                Color::Gray,
                Color::Yellow,
                Color::Green,
                Color::Magenta,
                Color::Red,
            ],
            outline: Color::Black,
            bg: Color::Rgb(0x1E, 0x21, 0x27),
            div_line: Color::Rgb(0x5C, 0x63, 0x70),
            main_fg: Color::Rgb(0xAB, 0xB2, 0xBF),
            title: Color::Rgb(0xE5, 0xC0, 0x7B),
            inactive_fg: Color::Rgb(0x4B, 0x52, 0x63),
        }
    }

    /// Load from `path`, falling back to the classic theme when no file is given or it is missing.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))?
            }
            _ => Self::classic(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.shapes = [
                    Color::Rgb(0x00, 0xFF, 0xFF),
                    Color::Rgb(0x00, 0x88, 0xFF),
                    Color::Rgb(0xFF, 0xFF, 0xFF),
                    Color::Rgb(0xFF, 0xFF, 0x00),
                    Color::Rgb(0x00, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0x00, 0xFF),
                    Color::Rgb(0xFF, 0x00, 0x00),
                ];
                self.outline = Color::Rgb(0x00, 0x00, 0x00);
            }
        }
    }

    /// Keys present in the file override the classic colours; a malformed value is an error.
    fn from_map(map: &HashMap<String, String>) -> Result<Self, ThemeError> {
        let mut theme = Self::classic();
        let get = |key: &str| map.get(key).map(|v| parse_hex(v)).transpose();
        for (slot, key) in theme.shapes.iter_mut().zip(SHAPE_KEYS) {
            if let Some(c) = get(key)? {
                *slot = c;
            }
        }
        for (slot, key) in [
            (&mut theme.outline, "outline"),
            (&mut theme.bg, "bg"),
            (&mut theme.div_line, "div_line"),
            (&mut theme.main_fg, "main_fg"),
            (&mut theme.title, "title"),
            (&mut theme.inactive_fg, "inactive_fg"),
        ] {
            if let Some(c) = get(key)? {
                *slot = c;
            }
        }
        Ok(theme)
    }

    #[inline]
    pub fn shape_color(&self, shape: Shape) -> Color {
        self.shapes[shape.color_index()]
    }
}

/// Parse `theme[key]="value"` lines into a key -> value map. Blank lines and `#` comments are skipped.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| {
            let rest = l.strip_prefix("theme[")?;
            let (key, rest) = rest.split_once(']')?;
            let (_, value) = rest.split_once('=')?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (!value.is_empty()).then(|| (key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// Parse hex colour "#RRGGBB" or "#RGB".
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>, scale: u8| {
        s.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .map(|v| v * scale)
            .ok_or_else(invalid)
    };
    match s.len() {
        6 => Ok(Color::Rgb(channel(0..2, 1)?, channel(2..4, 1)?, channel(4..6, 1)?)),
        3 => Ok(Color::Rgb(channel(0..1, 17)?, channel(1..2, 17)?, channel(2..3, 17)?)),
        _ => Err(invalid()),
    }
}
