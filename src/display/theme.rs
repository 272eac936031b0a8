//! Terminal display styles.
//!
//! All styles use only named ANSI colors (Black, Red, Green, Yellow, Blue,
//! Magenta, Cyan, White) so that colors adapt to the user's terminal theme.
//! Avoid `Color::Rgb`, `Color::AnsiValue`, and bright variants — these bypass
//! the user's palette and may be unreadable on some backgrounds.
//!
//! Use `Attribute::Dim` / `Attribute::Bold` for emphasis rather than bright
//! color variants.

use crossterm::style::{Attribute, Attributes, Color, ContentStyle};

pub fn dim() -> ContentStyle {
    ContentStyle {
        attributes: Attribute::Dim.into(),
        ..Default::default()
    }
}

pub fn progress() -> ContentStyle {
    ContentStyle {
        attributes: Attributes::from(Attribute::Dim) | Attribute::Italic,
        ..Default::default()
    }
}

pub fn cache_hit() -> ContentStyle {
    ContentStyle {
        foreground_color: Some(Color::Green),
        ..Default::default()
    }
}

pub fn cache_miss() -> ContentStyle {
    ContentStyle {
        foreground_color: Some(Color::Red),
        ..Default::default()
    }
}

pub fn status() -> ContentStyle {
    ContentStyle {
        foreground_color: Some(Color::Green),
        attributes: Attribute::Bold.into(),
        ..Default::default()
    }
}

pub fn error() -> ContentStyle {
    ContentStyle {
        foreground_color: Some(Color::Red),
        ..Default::default()
    }
}

// --- Markdown styles ---

pub fn heading() -> ContentStyle {
    ContentStyle {
        attributes: Attribute::Bold.into(),
        ..Default::default()
    }
}

pub fn strong() -> ContentStyle {
    ContentStyle {
        attributes: Attribute::Bold.into(),
        ..Default::default()
    }
}

pub fn emphasis() -> ContentStyle {
    ContentStyle {
        attributes: Attribute::Italic.into(),
        ..Default::default()
    }
}

pub fn strikethrough() -> ContentStyle {
    ContentStyle {
        attributes: Attribute::CrossedOut.into(),
        ..Default::default()
    }
}

pub fn inline_code() -> ContentStyle {
    ContentStyle {
        foreground_color: Some(Color::Yellow),
        ..Default::default()
    }
}

pub fn code_block() -> ContentStyle {
    ContentStyle {
        foreground_color: Some(Color::Cyan),
        ..Default::default()
    }
}

pub fn quote() -> ContentStyle {
    ContentStyle {
        attributes: Attributes::from(Attribute::Dim) | Attribute::Italic,
        ..Default::default()
    }
}

pub fn link_url() -> ContentStyle {
    ContentStyle {
        foreground_color: Some(Color::Blue),
        attributes: Attribute::Underlined.into(),
        ..Default::default()
    }
}
