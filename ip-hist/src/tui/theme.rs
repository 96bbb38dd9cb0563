//! TUI color theme
//!
//! Fixed colors for the chrome, plus a per-session [`Palette`] that hands
//! each plotted series its own color.

use ratatui::style::Color;
use std::collections::HashMap;

pub const HUD_GREEN: Color = Color::Rgb(0, 255, 0);
pub const CAUTION_AMBER: Color = Color::Rgb(255, 191, 0);
pub const INFO_DIM: Color = Color::Rgb(0, 180, 0);

/// Standard ANSI colors that read well on a dark background
const SERIES_COLORS: [Color; 12] = [
    Color::Indexed(2),
    Color::Indexed(3),
    Color::Indexed(4),
    Color::Indexed(5),
    Color::Indexed(6),
    Color::Indexed(7),
    Color::Indexed(10),
    Color::Indexed(11),
    Color::Indexed(12),
    Color::Indexed(13),
    Color::Indexed(14),
    Color::Indexed(15),
];

/// Series id → color, assigned in order of first appearance
///
/// The first twelve series get the standard colors; later ones are spread over
/// the 256-color cube so neighbors stay distinguishable.
#[derive(Debug, Default)]
pub struct Palette {
    assigned: HashMap<usize, Color>,
}

impl Palette {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn color_for(&mut self, series: usize) -> Color {
        let next = self.assigned.len();
        *self.assigned.entry(series).or_insert_with(|| nth_color(next))
    }
}

fn nth_color(n: usize) -> Color {
    if let Some(color) = SERIES_COLORS.get(n) {
        return *color;
    }
    // Stride 37 is coprime with 240, so the first 240 extra series never repeat.
    let offset = ((n - SERIES_COLORS.len()) * 37) % 240;
    #[allow(clippy::cast_possible_truncation)]
    Color::Indexed(16 + offset as u8)
}
