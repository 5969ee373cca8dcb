use super::input::{InputResult, TextInput};
use super::overlay::draw_prompt_box;
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;

/// Events emitted by the search box
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
  /// Query changed on a keystroke; empty when the search was cancelled
  Changed(String),
  /// Box closed with Enter; the filter stays applied
  Submitted,
}

/// `/` search box for filtering a list in place
#[derive(Debug, Clone, Default)]
pub struct SearchInput {
  input: TextInput,
  active: bool,
}

impl SearchInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<SearchEvent> {
    if !self.active {
      if key.code == KeyCode::Char('/') {
        self.active = true;
        self.input.clear();
        return KeyResult::Event(SearchEvent::Changed(String::new()));
      }
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(_) => {
        self.active = false;
        KeyResult::Event(SearchEvent::Submitted)
      }
      InputResult::Cancelled => {
        self.active = false;
        self.input.clear();
        KeyResult::Event(SearchEvent::Changed(String::new()))
      }
      InputResult::Consumed => KeyResult::Event(SearchEvent::Changed(self.input.value())),
      InputResult::NotHandled => KeyResult::NotHandled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if self.active {
      draw_prompt_box(frame, area, "Search", '/', &self.input, 0);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn press(search: &mut SearchInput, code: KeyCode) -> KeyResult<SearchEvent> {
    search.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
  }

  #[test]
  fn test_typing_emits_changes() {
    let mut search = SearchInput::new();
    press(&mut search, KeyCode::Char('/'));
    press(&mut search, KeyCode::Char('p'));
    assert_eq!(
      press(&mut search, KeyCode::Char('o')),
      KeyResult::Event(SearchEvent::Changed("po".to_string()))
    );
    assert_eq!(press(&mut search, KeyCode::Enter), KeyResult::Event(SearchEvent::Submitted));
    assert!(!search.is_active());
  }

  #[test]
  fn test_cancel_clears_query() {
    let mut search = SearchInput::new();
    press(&mut search, KeyCode::Char('/'));
    press(&mut search, KeyCode::Char('x'));
    assert_eq!(
      press(&mut search, KeyCode::Esc),
      KeyResult::Event(SearchEvent::Changed(String::new()))
    );
  }
}
