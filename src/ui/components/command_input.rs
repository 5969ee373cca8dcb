use super::input::{InputResult, TextInput};
use super::overlay::draw_prompt_box;
use super::KeyResult;
use crate::commands::{self, Command};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{List, ListItem, ListState};

const MAX_SUGGESTIONS: usize = 8;

/// Events emitted by the command palette
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
  /// Resolved command name, or the raw text if nothing matched
  Submitted(String),
  Cancelled,
}

/// `:` command palette with autocomplete
#[derive(Debug, Clone, Default)]
pub struct CommandInput {
  input: TextInput,
  active: bool,
  selected: usize,
}

impl CommandInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(&self.input.value())
  }

  fn close(&mut self) {
    self.active = false;
    self.input.clear();
    self.selected = 0;
  }

  /// Handles activation too, so call it for every key
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<CommandEvent> {
    if !self.active {
      if key.code == KeyCode::Char(':') {
        self.active = true;
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    let count = self.suggestions().len();
    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        if count > 0 {
          self.selected = (self.selected + 1) % count;
        }
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        if count > 0 {
          self.selected = (self.selected + count - 1) % count;
        }
        return KeyResult::Handled;
      }
      _ => {}
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(raw) => {
        let resolved = self
          .suggestions()
          .get(self.selected)
          .map(|cmd| cmd.name.to_string())
          .unwrap_or_else(|| raw.trim().to_lowercase());
        self.close();
        KeyResult::Event(CommandEvent::Submitted(resolved))
      }
      InputResult::Cancelled => {
        self.close();
        KeyResult::Event(CommandEvent::Cancelled)
      }
      InputResult::Consumed => {
        self.selected = 0;
        KeyResult::Handled
      }
      // Swallow everything else so view keys don't fire while typing
      InputResult::NotHandled => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }
    let suggestions = self.suggestions();
    let rows = suggestions.len().min(MAX_SUGGESTIONS) as u16;
    let Some(list_area) = draw_prompt_box(frame, area, "Command", ':', &self.input, rows) else {
      return;
    };

    let items: Vec<ListItem> = suggestions
      .iter()
      .take(MAX_SUGGESTIONS)
      .map(|cmd| {
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:<10}", cmd.name), Style::default().fg(Color::Cyan)),
          Span::styled(cmd.description, Style::default().fg(Color::DarkGray)),
        ]))
      })
      .collect();
    let list = List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));
    let mut state = ListState::default().with_selected(Some(self.selected));
    frame.render_stateful_widget(list, list_area, &mut state);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn press(palette: &mut CommandInput, code: KeyCode) -> KeyResult<CommandEvent> {
    palette.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
  }

  fn type_text(palette: &mut CommandInput, text: &str) {
    for c in text.chars() {
      press(palette, KeyCode::Char(c));
    }
  }

  #[test]
  fn test_inactive_ignores_keys() {
    let mut palette = CommandInput::new();
    assert_eq!(press(&mut palette, KeyCode::Char('x')), KeyResult::NotHandled);
    assert_eq!(press(&mut palette, KeyCode::Char(':')), KeyResult::Handled);
    assert!(palette.is_active());
  }

  #[test]
  fn test_submit_resolves_alias() {
    let mut palette = CommandInput::new();
    press(&mut palette, KeyCode::Char(':'));
    type_text(&mut palette, "favorites");
    assert_eq!(
      press(&mut palette, KeyCode::Enter),
      KeyResult::Event(CommandEvent::Submitted("liked".to_string()))
    );
    assert!(!palette.is_active());
  }

  #[test]
  fn test_tab_cycles_suggestions() {
    let mut palette = CommandInput::new();
    press(&mut palette, KeyCode::Char(':'));
    press(&mut palette, KeyCode::Tab);
    assert_eq!(
      press(&mut palette, KeyCode::Enter),
      KeyResult::Event(CommandEvent::Submitted(commands::COMMANDS[1].name.to_string()))
    );
  }

  #[test]
  fn test_unknown_command_passes_raw_text() {
    let mut palette = CommandInput::new();
    press(&mut palette, KeyCode::Char(':'));
    type_text(&mut palette, "Nope ");
    assert_eq!(
      press(&mut palette, KeyCode::Enter),
      KeyResult::Event(CommandEvent::Submitted("nope".to_string()))
    );
  }

  #[test]
  fn test_escape_cancels() {
    let mut palette = CommandInput::new();
    press(&mut palette, KeyCode::Char(':'));
    type_text(&mut palette, "st");
    assert_eq!(press(&mut palette, KeyCode::Esc), KeyResult::Event(CommandEvent::Cancelled));
    assert!(palette.suggestions().len() == commands::COMMANDS.len());
  }
}
