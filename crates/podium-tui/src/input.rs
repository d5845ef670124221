// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages sent to the
// app orchestrator, or into local ViewState mutations (tab switching, cursor
// movement, prompt editing, confirmations).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use podium_app::protocol::{Notice, SessionStage, TabId, UserCommand};
use podium_core::race::{Challenge, PenaltyKind, Phase};

use crate::{Confirm, Prompt, PromptKind, ViewState};

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to the
/// app orchestrator. Returns `None` when it was handled locally.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // crossterm emits Press and Release on some platforms.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    // Ctrl+C always quits immediately regardless of mode.
    if key_event.modifiers.contains(KeyModifiers::CONTROL) && key_event.code == KeyCode::Char('c')
    {
        return Some(UserCommand::Quit);
    }

    if view_state.prompt.is_some() {
        return handle_prompt(key_event, view_state);
    }
    if view_state.confirm.is_some() {
        return handle_confirm(key_event, view_state);
    }

    match key_event.code {
        KeyCode::Char(c @ '1'..='5') => {
            let idx = (c as usize) - ('1' as usize);
            let tab = TabId::ALL[idx];
            view_state.active_tab = tab;
            Some(UserCommand::SwitchTab(tab))
        }
        KeyCode::Tab => Some(UserCommand::SwitchPhase(view_state.phase.other())),

        KeyCode::Up | KeyCode::Char('k') => {
            view_state.move_cursor(-1);
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            view_state.move_cursor(1);
            None
        }

        KeyCode::Char('q') => {
            view_state.confirm = Some(Confirm::Quit);
            None
        }

        _ => match view_state.active_tab {
            TabId::Race => race_key(key_event.code, view_state),
            TabId::Leaderboard => leaderboard_key(key_event.code, view_state),
            TabId::Teams => teams_key(key_event.code, view_state),
            TabId::Draw => draw_key(key_event.code, view_state),
            TabId::Scores => scores_key(key_event.code, view_state),
        },
    }
}

/// Prompt mode: printable characters edit the input, Enter submits, Esc
/// cancels.
fn handle_prompt(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    let prompt = view_state.prompt.as_mut()?;
    match key_event.code {
        KeyCode::Esc => {
            view_state.prompt = None;
            None
        }
        KeyCode::Enter => match prompt.submit() {
            Ok(cmd) => {
                view_state.prompt = None;
                Some(cmd)
            }
            Err(reason) => {
                view_state.notice = Some(Notice::error(reason));
                None
            }
        },
        KeyCode::Backspace => {
            prompt.input.pop();
            None
        }
        KeyCode::Char(c) => {
            prompt.input.push(c);
            None
        }
        _ => None,
    }
}

/// Confirmation mode: y confirms, n or Esc cancels, everything else is
/// blocked. `q` also confirms a pending quit.
fn handle_confirm(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    let confirm = view_state.confirm.take()?;
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => Some(confirm.command()),
        KeyCode::Char('q') | KeyCode::Char('Q') if confirm == Confirm::Quit => {
            Some(confirm.command())
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => None,
        _ => {
            view_state.confirm = Some(confirm);
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Per-tab keys
// ---------------------------------------------------------------------------

fn race_key(code: KeyCode, view_state: &mut ViewState) -> Option<UserCommand> {
    let stage = view_state.session.stage;
    let phase = view_state.phase;
    let team = view_state.selected_race_team();

    match (stage, code) {
        // Selection
        (SessionStage::Idle | SessionStage::Selecting, KeyCode::Enter | KeyCode::Char(' ')) => {
            let team = team?;
            if view_state.session.participants.contains(&team) {
                Some(UserCommand::DeselectTeam(team))
            } else {
                Some(UserCommand::SelectTeam(team))
            }
        }
        (SessionStage::Selecting, KeyCode::Char('b')) => Some(UserCommand::BeginRace),
        (SessionStage::Selecting, KeyCode::Esc) => Some(UserCommand::CancelRace),

        // Running clock
        (SessionStage::Running, KeyCode::Char('f')) => team.map(UserCommand::FinishTeam),
        (SessionStage::Running, KeyCode::Char('a')) => team.map(UserCommand::AbandonTeam),
        (SessionStage::Running, KeyCode::Char('s')) => Some(UserCommand::StopRace),

        // Scoring inputs
        (SessionStage::Running | SessionStage::Terminal, KeyCode::Char(c)) => {
            let team = team?;
            match (phase, c) {
                (Phase::One, 'c') => Some(penalty(team, PenaltyKind::BarrierContact)),
                (Phase::One, 'v') => Some(penalty(team, PenaltyKind::StopSignal)),
                (Phase::One, 'h') => Some(penalty(team, PenaltyKind::HumanIntervention)),
                (Phase::Two, 'i') => Some(challenge(team, Challenge::PlanIncline)),
                (Phase::Two, 'm') => Some(challenge(team, Challenge::DistanceMeasure)),
                (Phase::Two, 't') => Some(challenge(team, Challenge::Stairs)),
                (Phase::Two, '+') => Some(UserCommand::AddIntervention(team)),
                (Phase::Two, '-') => Some(UserCommand::RemoveIntervention(team)),
                (_, 'd') => {
                    view_state.prompt = Some(Prompt::new(PromptKind::Distance(team)));
                    None
                }
                (_, 'w') if stage == SessionStage::Terminal => Some(UserCommand::SaveRace),
                (_, 'x') => {
                    view_state.confirm = Some(Confirm::CancelRace);
                    None
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn penalty(team: String, kind: PenaltyKind) -> UserCommand {
    UserCommand::AddPenalty { team, kind }
}

fn challenge(team: String, challenge: Challenge) -> UserCommand {
    UserCommand::ToggleChallenge { team, challenge }
}

fn leaderboard_key(code: KeyCode, view_state: &mut ViewState) -> Option<UserCommand> {
    match code {
        KeyCode::Char('e') => {
            view_state.prompt = Some(Prompt::new(PromptKind::Export(view_state.phase)));
        }
        KeyCode::Char('D') => {
            let id = view_state
                .phase_races()
                .get(view_state.cursor())
                .map(|r| r.id.clone());
            view_state.confirm = id.map(Confirm::DeleteRace);
        }
        KeyCode::Char('C') => {
            view_state.confirm = Some(Confirm::ClearPhase(view_state.phase));
        }
        _ => {}
    }
    None
}

fn teams_key(code: KeyCode, view_state: &mut ViewState) -> Option<UserCommand> {
    match code {
        KeyCode::Char('a') => view_state.prompt = Some(Prompt::new(PromptKind::AddTeam)),
        KeyCode::Char('i') => view_state.prompt = Some(Prompt::new(PromptKind::ImportTeams)),
        KeyCode::Char('D') | KeyCode::Delete => {
            let team = view_state.teams.get(view_state.cursor()).cloned();
            view_state.confirm = team.map(Confirm::RemoveTeam);
        }
        _ => {}
    }
    None
}

fn draw_key(code: KeyCode, view_state: &mut ViewState) -> Option<UserCommand> {
    match code {
        KeyCode::Char(' ') => Some(UserCommand::SpinWheel),
        KeyCode::Char('r') => Some(UserCommand::ResetDraw),
        KeyCode::Char('s') => Some(UserCommand::SaveDraw),
        KeyCode::Char('D') => {
            let id = view_state
                .draw
                .history
                .get(view_state.cursor())
                .map(|r| r.id.clone());
            view_state.confirm = id.map(Confirm::RemoveDraw);
            None
        }
        _ => None,
    }
}

fn scores_key(code: KeyCode, view_state: &mut ViewState) -> Option<UserCommand> {
    match code {
        KeyCode::Enter => {
            if let Some(row) = view_state.score_rows().get(view_state.cursor()) {
                let mut prompt = Prompt::new(PromptKind::Score(row.team.clone()));
                prompt.input = row.score.to_string();
                view_state.prompt = Some(prompt);
            }
        }
        KeyCode::Char('R') => view_state.confirm = Some(Confirm::ResetScores),
        _ => {}
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
