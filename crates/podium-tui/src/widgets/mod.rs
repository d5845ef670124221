// TUI widget modules for each console panel.

pub mod draw;
pub mod help_bar;
pub mod leaderboard;
pub mod overlay;
pub mod race;
pub mod race_clock;
pub mod scores;
pub mod status_bar;
pub mod teams;
