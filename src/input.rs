use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;
use crate::history::SlotStore;
use crate::models::FocusArea;
use crate::network::AnalysisRequest;

/// What the event loop should do after a key press.
#[derive(Debug)]
pub enum Action {
    Continue,
    Quit,
    Analyze(AnalysisRequest),
}

pub fn handle_key<S: SlotStore>(key: KeyEvent, app: &mut App<S>) -> Action {
    if app.api_key_input.is_some() {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => app.end_api_key_edit(),
            KeyCode::Backspace => app.pop_api_key_char(),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                app.push_api_key_char(c)
            }
            _ => {}
        }
        return Action::Continue;
    }

    if app.popup.visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
            app.close_popup();
        }
        return Action::Continue;
    }

    match key.code {
        KeyCode::Char('q') => return Action::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Action::Quit,
        KeyCode::Tab => app.focus = app.focus.next(),
        KeyCode::BackTab => app.focus = app.focus.previous(),
        KeyCode::Up | KeyCode::Char('k') => app.move_cursor(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_cursor(1),
        KeyCode::PageUp => app.move_cursor(-10),
        KeyCode::PageDown => app.move_cursor(10),
        KeyCode::Enter | KeyCode::Char(' ') => app.activate(),
        KeyCode::Char('v') => {
            if let Some(request) = app.start_analysis() {
                return Action::Analyze(request);
            }
        }
        KeyCode::Char('r') => {
            app.rescan();
            app.status = "Folders rescanned".into();
        }
        KeyCode::Char('m') => app.cycle_model(),
        KeyCode::Char('K') => app.begin_api_key_edit(),
        KeyCode::Char('c') => app.copy_focused_problem(),
        KeyCode::Char('d') if app.focus == FocusArea::History => {
            app.delete_history_at(app.history_cursor)
        }
        KeyCode::Char('X') if app.focus == FocusArea::History => app.clear_history(),
        KeyCode::Char('1') => app.focus = FocusArea::SourceFiles,
        KeyCode::Char('2') => app.focus = FocusArea::TargetFiles,
        KeyCode::Char('3') => app.focus = FocusArea::Problems,
        KeyCode::Char('4') => app.focus = FocusArea::History,
        _ => {}
    }
    Action::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::history::{HistoryStore, MemorySlotStore};
    use crate::session::SessionController;
    use std::path::PathBuf;

    fn app() -> App<MemorySlotStore> {
        let controller = SessionController::new(HistoryStore::open(MemorySlotStore::default()));
        App::new(
            Settings::load(None).unwrap(),
            controller,
            PathBuf::from("."),
            PathBuf::from("."),
        )
    }

    fn press(app: &mut App<MemorySlotStore>, code: KeyCode) -> Action {
        handle_key(KeyEvent::new(code, KeyModifiers::NONE), app)
    }

    #[test]
    fn q_quits_unless_typing_a_key() {
        let mut app = app();
        assert!(matches!(press(&mut app, KeyCode::Char('q')), Action::Quit));

        press(&mut app, KeyCode::Char('K'));
        assert!(matches!(press(&mut app, KeyCode::Char('q')), Action::Continue));
        assert_eq!(app.api_key_input.as_deref(), Some("q"));
        press(&mut app, KeyCode::Esc);
        assert!(app.api_key_input.is_none());
    }

    #[test]
    fn popup_swallows_keys_until_closed() {
        let mut app = app();
        app.show_error("Error", "boom");
        assert!(matches!(press(&mut app, KeyCode::Char('q')), Action::Continue));
        assert!(!app.popup.visible);
    }

    #[test]
    fn verify_without_selection_does_nothing() {
        let mut app = app();
        assert!(matches!(press(&mut app, KeyCode::Char('v')), Action::Continue));
        assert!(!app.controller.is_busy());
    }

    #[test]
    fn tab_moves_focus() {
        let mut app = app();
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, FocusArea::TargetFiles);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.focus, FocusArea::SourceFiles);
        press(&mut app, KeyCode::Char('4'));
        assert_eq!(app.focus, FocusArea::History);
    }
}
