use super::failure_status;
use crate::app::Session;
use crate::preferences::{commute_label, needs_confirmation, toggle_mode, CommuteMode, Preferences};
use crate::ui::components::{draw_prompt_box, InputResult, TextInput};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

/// What the keyboard is currently driving
enum Mode {
  Browse,
  EditAddress(TextInput),
  /// Replacing a saved commute choice, waiting for y/n
  Confirm,
}

/// Home address and commute preferences
pub struct PreferencesView {
  session: Session,
  saved: Preferences,
  draft: Vec<CommuteMode>,
  list_state: ListState,
  mode: Mode,
  status: Option<String>,
}

impl PreferencesView {
  pub fn new(session: Session) -> Self {
    let mut view = Self {
      session,
      saved: Preferences::default(),
      draft: Vec::new(),
      list_state: ListState::default().with_selected(Some(0)),
      mode: Mode::Browse,
      status: None,
    };
    view.reload();
    view
  }

  fn reload(&mut self) {
    match self.session.preferences.load() {
      Ok(prefs) => {
        self.draft = prefs.commute.clone();
        self.saved = prefs;
      }
      Err(e) => self.status = failure_status::<()>("Loading preferences", Err(e)),
    }
  }

  fn submit_commute(&mut self) {
    if self.draft.is_empty() {
      self.status = Some("Pick at least one way to commute".to_string());
    } else if self.draft == self.saved.commute {
      self.status = Some("No changes".to_string());
    } else if needs_confirmation(&self.saved.commute, &self.draft) {
      self.mode = Mode::Confirm;
    } else {
      self.save_commute();
    }
  }

  fn save_commute(&mut self) {
    self.status = failure_status("Saving commute", self.session.preferences.set_commute(&self.draft))
      .or_else(|| Some(format!("Commute set to {}", commute_label(&self.draft))));
    self.reload();
  }

  fn save_address(&mut self, address: &str) {
    self.status = failure_status("Saving address", self.session.preferences.set_address(address))
      .or_else(|| Some("Address saved".to_string()));
    self.reload();
  }

  fn handle_browse_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        let next = self.list_state.selected().map_or(0, |i| (i + 1).min(CommuteMode::ALL.len() - 1));
        self.list_state.select(Some(next));
      }
      KeyCode::Char('k') | KeyCode::Up => {
        let prev = self.list_state.selected().map_or(0, |i| i.saturating_sub(1));
        self.list_state.select(Some(prev));
      }
      KeyCode::Char(' ') | KeyCode::Char('x') => {
        if let Some(mode) = self.list_state.selected().and_then(|i| CommuteMode::ALL.get(i)) {
          toggle_mode(&mut self.draft, *mode);
        }
      }
      KeyCode::Enter => self.submit_commute(),
      KeyCode::Char('a') => {
        let current = self.saved.address.as_deref().unwrap_or_default();
        self.mode = Mode::EditAddress(TextInput::with_value(current));
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render_confirm(&self, frame: &mut Frame, area: Rect) {
    let width = 50.min(area.width);
    let height = 8.min(area.height);
    let dialog = Rect::new(
      area.x + (area.width - width) / 2,
      area.y + (area.height - height) / 2,
      width,
      height,
    );
    let label = Style::default().fg(Color::DarkGray);
    let lines = vec![
      Line::from(Span::styled("Current:", label)),
      Line::from(self.saved.commute_label()),
      Line::from(Span::styled("New:", label)),
      Line::from(commute_label(&self.draft)),
      Line::default(),
      Line::from(vec![
        Span::styled("y", Style::default().fg(Color::Cyan)),
        Span::raw(" confirm   "),
        Span::styled("n", Style::default().fg(Color::Cyan)),
        Span::raw(" cancel"),
      ]),
    ];
    let block = Block::default()
      .title(" Confirm Changes ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Magenta));
    frame.render_widget(Clear, dialog);
    frame.render_widget(Paragraph::new(lines).block(block), dialog);
  }
}

impl View for PreferencesView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match &mut self.mode {
      Mode::Browse => return self.handle_browse_key(key),
      Mode::EditAddress(input) => match input.handle_key(key) {
        InputResult::Submitted(address) => {
          self.mode = Mode::Browse;
          self.save_address(&address);
        }
        InputResult::Cancelled => self.mode = Mode::Browse,
        InputResult::Consumed | InputResult::NotHandled => {}
      },
      Mode::Confirm => match key.code {
        KeyCode::Char('y') | KeyCode::Enter => {
          self.mode = Mode::Browse;
          self.save_commute();
        }
        KeyCode::Char('n') | KeyCode::Esc => {
          // Back to the saved choice
          self.mode = Mode::Browse;
          self.draft = self.saved.commute.clone();
          self.status = Some("Commute unchanged".to_string());
        }
        _ => {}
      },
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(" Preferences ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Green));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(4), Constraint::Min(1)])
      .split(inner);

    let label = Style::default().fg(Color::DarkGray);
    let address = match &self.saved.address {
      Some(address) => Span::raw(address.clone()),
      None => Span::styled("not set", label),
    };
    let summary = vec![
      Line::from(vec![Span::styled(format!("{:<10}", "Home"), label), address]),
      Line::from(vec![
        Span::styled(format!("{:<10}", "Commute"), label),
        Span::raw(self.saved.commute_label()),
      ]),
      Line::default(),
      Line::from(Span::styled("How do you plan to commute?", Style::default().bold())),
    ];
    frame.render_widget(Paragraph::new(summary), chunks[0]);

    let items: Vec<ListItem> = CommuteMode::ALL
      .iter()
      .map(|mode| {
        let checked = self.draft.contains(mode);
        let mark = if checked { "[x]" } else { "[ ]" };
        let style = if checked {
          Style::default().fg(Color::Green)
        } else {
          Style::default()
        };
        ListItem::new(Line::from(Span::styled(format!("{} {}", mark, mode.label()), style)))
      })
      .collect();
    let list = List::new(items)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[1], &mut self.list_state);

    match &self.mode {
      Mode::Browse => {}
      Mode::EditAddress(input) => {
        draw_prompt_box(frame, area, "Home address", '>', input, 0);
      }
      Mode::Confirm => self.render_confirm(frame, area),
    }
  }

  fn breadcrumb_label(&self) -> String {
    "Preferences".to_string()
  }

  fn status(&self) -> Option<&str> {
    self.status.as_deref()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    match self.mode {
      Mode::Browse => vec![
        ShortcutInfo::new("space", "toggle").with_priority(1),
        ShortcutInfo::new("enter", "save").with_priority(2),
        ShortcutInfo::new("a", "address").with_priority(3),
        ShortcutInfo::new(":", "command").with_priority(10),
        ShortcutInfo::new("q", "back").with_priority(90),
      ],
      Mode::EditAddress(_) => vec![
        ShortcutInfo::new("enter", "save").with_priority(1),
        ShortcutInfo::new("esc", "cancel").with_priority(2),
      ],
      Mode::Confirm => vec![
        ShortcutInfo::new("y", "confirm").with_priority(1),
        ShortcutInfo::new("n", "cancel").with_priority(2),
      ],
    }
  }
}
