//! Colors and glyphs used by the CLI.

use colored::Color;

pub struct Palette {
    pub success: Color,
    pub error: Color,
    pub warning: Color,
    /// Section headings and the model name.
    pub heading: Color,
    /// Example group titles and environment variable names.
    pub accent: Color,
    pub muted: Color,
}

pub const THEME: Palette = Palette {
    success: Color::Green,
    error: Color::Red,
    warning: Color::Yellow,
    heading: Color::BrightBlue,
    accent: Color::Cyan,
    muted: Color::BrightBlack,
};

pub struct Icons {
    pub success: &'static str,
    pub error: &'static str,
    pub warning: &'static str,
    pub arrow: &'static str,
    pub bullet: &'static str,
}

pub const ICONS: Icons = Icons {
    success: "✓",
    error: "✗",
    warning: "⚠",
    arrow: "→",
    bullet: "•",
};
