// Help bar widget: key hints for the active tab and session stage.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use podium_app::protocol::{SessionStage, TabId};
use podium_core::race::Phase;

use crate::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let text = format!(" {} | q:Quit 1-5:Tabs Tab:Phase", hints(state));
    let paragraph = Paragraph::new(Line::from(Span::styled(
        text,
        Style::default().fg(Color::White).add_modifier(Modifier::DIM),
    )))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

/// Key hints for whatever the active tab currently accepts.
pub fn hints(state: &ViewState) -> &'static str {
    match state.active_tab {
        TabId::Race => match (state.session.stage, state.phase) {
            (SessionStage::Idle, _) => "Enter:Select",
            (SessionStage::Selecting, _) => "Enter:Toggle b:Begin Esc:Clear",
            (SessionStage::Running, Phase::One) => {
                "f:Finish a:DNF s:Stop c:Barrier v:Stop-sign h:Interv d:Dist x:Cancel"
            }
            (SessionStage::Running, Phase::Two) => {
                "f:Finish a:DNF i/m/t:Challenge +/-:Interv d:Dist x:Cancel"
            }
            (SessionStage::Terminal, Phase::One) => "d:Dist c/v/h:Penalty w:Save x:Discard",
            (SessionStage::Terminal, Phase::Two) => {
                "d:Dist i/m/t:Challenge +/-:Interv w:Save x:Discard"
            }
        },
        TabId::Leaderboard => "e:Export D:Delete race C:Clear phase",
        TabId::Teams => "a:Add i:Import D:Remove",
        TabId::Draw => "Space:Spin r:Reset s:Save D:Remove",
        TabId::Scores => "Enter:Set score R:Reset",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_follow_stage_and_phase() {
        let mut state = ViewState::default();
        assert_eq!(hints(&state), "Enter:Select");

        state.session.stage = SessionStage::Running;
        assert!(hints(&state).contains("c:Barrier"));
        state.phase = Phase::Two;
        assert!(hints(&state).contains("i/m/t:Challenge"));

        state.active_tab = TabId::Draw;
        assert!(hints(&state).starts_with("Space:Spin"));
    }

    #[test]
    fn render_does_not_panic() {
        let backend = ratatui::backend::TestBackend::new(40, 1);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let state = ViewState::default();
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
    }
}
