// Screen layout: panel arrangement and sizing.
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +--------------------------------------------------+
// | Race Clock (5 rows)                               |
// +--------------------------------------------------+
// | Main Panel (tab content)                          |
// |                                                   |
// +--------------------------------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Resolved screen areas for each console zone.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Top row: event name, phase, tab bar.
    pub status_bar: Rect,
    /// Shared race clock, session stage and the latest notice.
    pub clock_banner: Rect,
    /// Tab-switched content area.
    pub main_panel: Rect,
    /// Bottom row: keyboard shortcut hints.
    pub help_bar: Rect,
}

/// Build the console layout from the available terminal area.
pub fn build_layout(area: Rect) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Length(5), // race clock
            Constraint::Min(6),    // main panel
            Constraint::Length(1), // help bar
        ])
        .split(area);

    AppLayout {
        status_bar: vertical[0],
        clock_banner: vertical[1],
        main_panel: vertical[2],
        help_bar: vertical[3],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
