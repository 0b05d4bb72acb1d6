//! Key bindings. While a session runs keys steer the piece; otherwise they edit the name.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    MoveDown,
    Start,
    Type(char),
    Erase,
    Quit,
    None,
}

/// Map key event to action. `running` selects the in-game layer.
pub fn key_to_action(key: KeyEvent, running: bool) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = key;
    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Action::Quit,
            _ => Action::None,
        };
    }
    if modifiers.intersects(KeyModifiers::ALT | KeyModifiers::SUPER) {
        return Action::None;
    }
    if code == KeyCode::Esc {
        return Action::Quit;
    }
    if running {
        match code {
            KeyCode::Char('a' | 'A') | KeyCode::Left => Action::MoveLeft,
            KeyCode::Char('s' | 'S') | KeyCode::Down => Action::MoveDown,
            KeyCode::Char('d' | 'D') | KeyCode::Right => Action::MoveRight,
            _ => Action::None,
        }
    } else {
        match code {
            KeyCode::Enter => Action::Start,
            KeyCode::Backspace => Action::Erase,
            KeyCode::Char(c) if !c.is_control() => Action::Type(c),
            _ => Action::None,
        }
    }
}
