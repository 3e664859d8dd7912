use crossterm::style::{Attribute, Color, ContentStyle};
use serde::{Deserialize, Serialize};

use crate::style::StyleDescriptor;

/// Output syntax for style markers embedded in the prompt string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupDialect {
    /// No markers at all.
    Plain,
    /// Terminal escape sequences.
    #[default]
    Ansi,
    /// xonsh prompt colour fields such as `{BOLD_RED}` … `{RESET}`.
    Xonsh,
}

impl MarkupDialect {
    pub fn apply(self, text: &str, style: &StyleDescriptor) -> String {
        if style.is_plain() || text.is_empty() {
            return text.to_string();
        }
        match self {
            Self::Plain => text.to_string(),
            Self::Ansi => format!("{}", content_style(style).apply(text)),
            Self::Xonsh => xonsh_markup(text, style),
        }
    }
}

fn content_style(style: &StyleDescriptor) -> ContentStyle {
    let mut content = ContentStyle::new();
    content.foreground_color = style.fg;
    content.background_color = style.bg;
    if style.bold {
        content.attributes.set(Attribute::Bold);
    }
    if style.dimmed {
        content.attributes.set(Attribute::Dim);
    }
    if style.italic {
        content.attributes.set(Attribute::Italic);
    }
    if style.underline {
        content.attributes.set(Attribute::Underlined);
    }
    content
}

fn xonsh_markup(text: &str, style: &StyleDescriptor) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if style.bold {
        parts.push("BOLD");
    }
    if style.dimmed {
        parts.push("FAINT");
    }
    if style.italic {
        parts.push("ITALIC");
    }
    if style.underline {
        parts.push("UNDERLINE");
    }

    let mut out = String::new();
    let fg = style.fg.and_then(xonsh_color);
    let show_fg = fg.is_some() || !parts.is_empty();
    let colour = fg.unwrap_or_else(|| "DEFAULT".to_string());
    if show_fg {
        parts.push(&colour);
        out.push('{');
        out.push_str(&parts.join("_"));
        out.push('}');
    }
    if let Some(bg) = style.bg.and_then(xonsh_color) {
        out.push_str(&format!("{{BACKGROUND_{bg}}}"));
    }
    out.push_str(text);
    out.push_str("{RESET}");
    out
}

fn xonsh_color(colour: Color) -> Option<String> {
    let name = match colour {
        Color::Reset => "DEFAULT",
        Color::Black => "BLACK",
        Color::DarkGrey => "INTENSE_BLACK",
        Color::DarkRed => "RED",
        Color::Red => "INTENSE_RED",
        Color::DarkGreen => "GREEN",
        Color::Green => "INTENSE_GREEN",
        Color::DarkYellow => "YELLOW",
        Color::Yellow => "INTENSE_YELLOW",
        Color::DarkBlue => "BLUE",
        Color::Blue => "INTENSE_BLUE",
        Color::DarkMagenta => "PURPLE",
        Color::Magenta => "INTENSE_PURPLE",
        Color::DarkCyan => "CYAN",
        Color::Cyan => "INTENSE_CYAN",
        Color::Grey => "WHITE",
        Color::White => "INTENSE_WHITE",
        Color::Rgb { r, g, b } => return Some(format!("#{r:02x}{g:02x}{b:02x}")),
        Color::AnsiValue(_) => return None,
    };
    Some(name.to_string())
}
