use super::failure_status;
use crate::app::Session;
use crate::listings::Listing;
use crate::metrics::MetricKind;
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::feed::SnapshotFeed;
use crate::ui::renderfns::{format_layout, format_price, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::ListingDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Liked listings that are still in the latest snapshot
pub struct LikedListView {
  session: Session,
  feed: SnapshotFeed,
  visible: Vec<Listing>,
  filter: String,
  list_state: ListState,
  search: SearchInput,
  status: Option<String>,
}

impl LikedListView {
  pub fn new(session: Session) -> Self {
    let feed = SnapshotFeed::new(session.listings.subscribe());
    let mut view = Self {
      session,
      feed,
      visible: Vec::new(),
      filter: String::new(),
      list_state: ListState::default(),
      search: SearchInput::new(),
      status: None,
    };
    view.refilter();
    view
  }

  fn refilter(&mut self) {
    self.visible = self
      .session
      .liked
      .filter(&self.feed.snapshot().items)
      .into_iter()
      .filter(|l| l.matches(&self.filter))
      .collect();
  }

  fn selected(&self) -> Option<&Listing> {
    self.list_state.selected().and_then(|i| self.visible.get(i))
  }

  fn unlike_selected(&mut self) {
    let Some(id) = self.selected().map(|l| l.id.clone()) else {
      return;
    };
    self.status = match self.session.liked.unlike(&id) {
      Ok(_) => failure_status("Recording unlike", self.session.metrics.record(&id, MetricKind::Unlike)),
      Err(e) => failure_status::<()>("Removing like", Err(e)),
    };
    self.refilter();
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    ensure_valid_selection(&mut self.list_state, self.visible.len());

    let title = match (self.feed.is_loading(), self.filter.is_empty()) {
      (true, _) => format!(" Liked ({}) (loading...) ", self.visible.len()),
      (false, true) => format!(" Liked ({}) ", self.visible.len()),
      (false, false) => format!(" Liked ({}) /{} ", self.visible.len(), self.filter),
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Red));

    if self.visible.is_empty() {
      let message = if self.feed.is_loading() {
        "Loading listings..."
      } else if !self.filter.is_empty() {
        "No liked listings match the filter."
      } else {
        "No liked listings yet. Swipe right in the deck to add some."
      };
      let paragraph = Paragraph::new(message)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .visible
      .iter()
      .map(|listing| {
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:>12}", format_price(listing.price)),
            Style::default().fg(Color::Green),
          ),
          Span::raw("  "),
          Span::styled(
            format!("{:<24}", format_layout(listing)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(truncate(&listing.title, 50)),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for LikedListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(query)) => {
        self.filter = query;
        self.refilter();
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('d') => self.unlike_selected(),
      KeyCode::Char('r') => {
        self.session.spawn_refresh();
        self.status = Some("Refreshing listings".to_string());
      }
      KeyCode::Enter => {
        if let Some(listing) = self.selected() {
          return ViewAction::Push(Box::new(ListingDetailView::new(
            self.session.clone(),
            listing.clone(),
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => {
        if !self.filter.is_empty() {
          self.filter.clear();
          self.refilter();
        } else {
          return ViewAction::Pop;
        }
      }
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Liked".to_string()
  }

  fn tick(&mut self) {
    self.feed.poll();
    self.refilter();
  }

  fn status(&self) -> Option<&str> {
    self.status.as_deref()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.search.is_active() {
      return vec![
        ShortcutInfo::new("enter", "keep filter").with_priority(1),
        ShortcutInfo::new("esc", "clear").with_priority(2),
      ];
    }
    vec![
      ShortcutInfo::new("enter", "details").with_priority(1),
      ShortcutInfo::new("/", "filter").with_priority(2),
      ShortcutInfo::new("d", "unlike").with_priority(3),
      ShortcutInfo::new("r", "refresh").with_priority(4),
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
