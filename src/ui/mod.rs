pub mod components;
pub mod feed;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::ListState;
use renderfns::{draw_footer, draw_header, HeaderInfo};
use view::ShortcutInfo;

/// Keep a list selection inside `0..len`, selecting the first row when
/// nothing is selected
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  match state.selected() {
    _ if len == 0 => state.select(None),
    Some(i) if i >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    Some(_) => {}
  }
}

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let breadcrumb = app.breadcrumb();
  let title = app.title().to_string();
  let username = app.username().map(str::to_string);
  let info = HeaderInfo {
    title: &title,
    username: username.as_deref(),
    liked_count: app.session().liked.count(),
    loading: app.session().listings.is_loading(),
  };

  let app_command_active = app.command().is_active();

  let Some(view) = app.current_view_mut() else {
    return;
  };
  let shortcuts = if app_command_active {
    vec![
      ShortcutInfo::new("tab", "next").with_priority(1),
      ShortcutInfo::new("enter", "run").with_priority(2),
      ShortcutInfo::new("esc", "cancel").with_priority(3),
    ]
  } else {
    view.shortcuts()
  };
  draw_header(frame, chunks[0], &info, &shortcuts);
  view.render(frame, chunks[1]);
  draw_footer(frame, chunks[2], &breadcrumb, view.status());

  app.command().render_overlay(frame, chunks[1]);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_selection_clamped_to_len() {
    let mut state = ListState::default().with_selected(Some(7));
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(2));
  }

  #[test]
  fn test_selection_defaults_to_first() {
    let mut state = ListState::default();
    ensure_valid_selection(&mut state, 2);
    assert_eq!(state.selected(), Some(0));
  }

  #[test]
  fn test_empty_list_clears_selection() {
    let mut state = ListState::default().with_selected(Some(0));
    ensure_valid_selection(&mut state, 0);
    assert_eq!(state.selected(), None);
  }
}
