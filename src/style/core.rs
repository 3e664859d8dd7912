use std::collections::{BTreeMap, HashMap};

use crossterm::style::Color;

use crate::error::ConfigError;
use crate::style::MarkupDialect;

/// Concrete styling attached to a tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleDescriptor {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub bold: bool,
    pub dimmed: bool,
    pub italic: bool,
    pub underline: bool,
}

impl StyleDescriptor {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_plain(&self) -> bool {
        *self == Self::none()
    }

    /// Parse a space separated style string such as `"bold fg:#ff8800 bg:blue"`.
    ///
    /// Bare colour words set the foreground. `none` resets everything parsed
    /// so far.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut style = Self::none();
        for word in raw.split_whitespace() {
            let lower = word.to_ascii_lowercase();
            match lower.as_str() {
                "bold" => style.bold = true,
                "dimmed" | "dim" => style.dimmed = true,
                "italic" => style.italic = true,
                "underline" => style.underline = true,
                "none" => style = Self::none(),
                other => {
                    if let Some(colour) = other.strip_prefix("bg:") {
                        style.bg = Some(parse_color(colour, raw)?);
                    } else {
                        let colour = other.strip_prefix("fg:").unwrap_or(other);
                        style.fg = Some(parse_color(colour, raw)?);
                    }
                }
            }
        }
        Ok(style)
    }
}

fn parse_color(word: &str, style: &str) -> Result<Color, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidStyle {
        style: style.to_string(),
        reason: reason.to_string(),
    };

    if let Some(hex) = word.strip_prefix('#') {
        if hex.len() != 6 {
            return Err(invalid("hex colours need six digits"));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid("bad hex digit"))
        };
        return Ok(Color::Rgb {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        });
    }

    if let Ok(index) = word.parse::<u8>() {
        return Ok(Color::AnsiValue(index));
    }

    let colour = match word {
        "black" => Color::Black,
        "red" => Color::DarkRed,
        "green" => Color::DarkGreen,
        "yellow" => Color::DarkYellow,
        "blue" => Color::DarkBlue,
        "purple" | "magenta" => Color::DarkMagenta,
        "cyan" => Color::DarkCyan,
        "white" => Color::Grey,
        "bright-black" => Color::DarkGrey,
        "bright-red" => Color::Red,
        "bright-green" => Color::Green,
        "bright-yellow" => Color::Yellow,
        "bright-blue" => Color::Blue,
        "bright-purple" | "bright-magenta" => Color::Magenta,
        "bright-cyan" => Color::Cyan,
        "bright-white" => Color::White,
        _ => return Err(invalid(&format!("unknown word `{word}`"))),
    };
    Ok(colour)
}

const DEFAULT_STYLES: &[(&str, &str)] = &[
    ("error", "bold red"),
    ("success", "bold green"),
    ("path", "bold cyan"),
    ("git-clean", "bold purple"),
    ("git-dirty", "bold yellow"),
    ("duration", "yellow"),
    ("jobs", "bold blue"),
    ("muted", "bright-black"),
];

/// Tag to descriptor mapping, fixed once the pipeline is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSheet {
    styles: HashMap<String, StyleDescriptor>,
}

impl Default for StyleSheet {
    fn default() -> Self {
        let styles = DEFAULT_STYLES
            .iter()
            .filter_map(|(tag, raw)| {
                StyleDescriptor::parse(raw)
                    .ok()
                    .map(|style| (tag.to_string(), style))
            })
            .collect();
        Self { styles }
    }
}

impl StyleSheet {
    pub fn empty() -> Self {
        Self {
            styles: HashMap::new(),
        }
    }

    pub fn insert(&mut self, tag: impl Into<String>, style: StyleDescriptor) {
        self.styles.insert(tag.into(), style);
    }

    /// Defaults overlaid with configured overrides.
    ///
    /// Entries that fail to parse are returned alongside the sheet and the
    /// tag keeps its default.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> (Self, Vec<ConfigError>) {
        let mut sheet = Self::default();
        let mut errors = Vec::new();
        for (tag, raw) in overrides {
            match StyleDescriptor::parse(raw) {
                Ok(style) => sheet.insert(tag.clone(), style),
                Err(err) => errors.push(err),
            }
        }
        (sheet, errors)
    }

    pub fn get(&self, tag: &str) -> Option<&StyleDescriptor> {
        self.styles.get(tag)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

/// Pure lookup from tag to descriptor plus the output dialect.
#[derive(Debug, Clone)]
pub struct StyleResolver {
    sheet: StyleSheet,
    dialect: MarkupDialect,
    plain: StyleDescriptor,
}

impl StyleResolver {
    pub fn new(sheet: StyleSheet, dialect: MarkupDialect) -> Self {
        Self {
            sheet,
            dialect,
            plain: StyleDescriptor::none(),
        }
    }

    pub fn dialect(&self) -> MarkupDialect {
        self.dialect
    }

    /// Unknown tags resolve to the unstyled descriptor.
    pub fn resolve(&self, tag: &str) -> &StyleDescriptor {
        self.sheet.get(tag).unwrap_or(&self.plain)
    }

    pub fn paint(&self, text: &str, tag: Option<&str>) -> String {
        match tag {
            Some(tag) => self.dialect.apply(text, self.resolve(tag)),
            None => text.to_string(),
        }
    }
}
