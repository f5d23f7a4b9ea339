use ratatui::style::{Color, Modifier, Style};

/// Amber instrument-panel theme.
///
/// Base aesthetic:
/// - warm amber foreground on near-black
/// - cyan/magenta accents for the chart series
/// - red reserved for errors
pub struct Theme;

impl Theme {
    // Core palette
    pub const BG: Color = Color::Rgb(12, 10, 6);
    pub const FG_AMBER: Color = Color::Rgb(255, 183, 3);
    pub const FG_DIM: Color = Color::Rgb(190, 135, 0);
    pub const FG_MUTED: Color = Color::Rgb(95, 85, 60);

    // Accents
    pub const ACCENT_CYAN: Color = Color::Rgb(0, 220, 220);
    pub const ACCENT_MAGENTA: Color = Color::Rgb(235, 80, 235);
    pub const ACCENT_GREEN: Color = Color::Rgb(110, 220, 110);
    pub const ACCENT_RED: Color = Color::Rgb(255, 80, 80);

    /// Default full-screen style.
    pub fn base() -> Style {
        Style::default().fg(Self::FG_AMBER).bg(Self::BG)
    }

    /// Panel borders.
    pub fn border() -> Style {
        Style::default().fg(Self::FG_DIM).bg(Self::BG)
    }

    /// Titles (bold amber).
    pub fn title() -> Style {
        Style::default()
            .fg(Self::FG_AMBER)
            .add_modifier(Modifier::BOLD)
    }

    /// Regular text.
    pub fn text() -> Style {
        Style::default().fg(Self::FG_AMBER)
    }

    /// Secondary/dim text.
    pub fn dim() -> Style {
        Style::default().fg(Self::FG_DIM)
    }

    /// Muted/disabled text.
    pub fn muted() -> Style {
        Style::default().fg(Self::FG_MUTED)
    }

    pub fn ok() -> Style {
        Style::default()
            .fg(Self::ACCENT_GREEN)
            .add_modifier(Modifier::BOLD)
    }

    pub fn error() -> Style {
        Style::default()
            .fg(Self::ACCENT_RED)
            .add_modifier(Modifier::BOLD)
    }

    /// Loss curve and the predicted series.
    pub fn series_a() -> Style {
        Style::default().fg(Self::ACCENT_CYAN)
    }

    /// Metric curve and the original series.
    pub fn series_b() -> Style {
        Style::default().fg(Self::ACCENT_MAGENTA)
    }
}
