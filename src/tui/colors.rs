//! Color palette for the TUI

use ratatui::style::Color;

// UI Chrome
pub const BORDER: Color = Color::Rgb(100, 110, 130);
pub const BORDER_FOCUSED: Color = Color::Rgb(100, 180, 220);
pub const SURFACE_HIGHLIGHT: Color = Color::Rgb(50, 55, 70);

// Text
pub const TEXT_PRIMARY: Color = Color::Rgb(220, 220, 230);
pub const TEXT_DIM: Color = Color::Rgb(130, 135, 150);
pub const TEXT_MUTED: Color = Color::Rgb(90, 95, 110);

// Selection
pub const CHECKED: Color = Color::Rgb(120, 180, 120);
pub const PROVIDER: Color = Color::Rgb(100, 140, 200);

// Status
pub const BUSY: Color = Color::Rgb(200, 180, 100);
pub const NOTICE: Color = Color::Rgb(200, 160, 80);
pub const PROGRESS: Color = Color::Rgb(120, 180, 120);
