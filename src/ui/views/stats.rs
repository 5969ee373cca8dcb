use super::failure_status;
use crate::app::Session;
use crate::metrics::ListingMetrics;
use crate::ui::feed::SnapshotFeed;
use crate::ui::renderfns::truncate;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::ListingDetailView;
use chrono::{Duration, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, TableState};

/// Per-listing swipe metrics, most liked first
pub struct StatsView {
  session: Session,
  feed: SnapshotFeed,
  rows: Vec<ListingMetrics>,
  recent_events: usize,
  table_state: TableState,
  status: Option<String>,
}

impl StatsView {
  pub fn new(session: Session) -> Self {
    let feed = SnapshotFeed::new(session.listings.subscribe());
    let mut view = Self {
      session,
      feed,
      rows: Vec::new(),
      recent_events: 0,
      table_state: TableState::default(),
      status: None,
    };
    view.reload();
    view
  }

  fn reload(&mut self) {
    let since = Utc::now() - Duration::hours(24);
    let loaded = self
      .session
      .metrics
      .all()
      .and_then(|rows| Ok((rows, self.session.metrics.events_since(since)?.len())));
    match loaded {
      Ok((rows, recent)) => {
        self.rows = rows;
        self.recent_events = recent;
        self.status = None;
      }
      Err(e) => self.status = failure_status::<()>("Loading metrics", Err(e)),
    }
  }

  fn title_for(&self, listing_id: &str) -> String {
    self
      .feed
      .snapshot()
      .items
      .iter()
      .find(|l| l.id == listing_id)
      .map(|l| l.title.clone())
      .unwrap_or_else(|| format!("({})", listing_id))
  }

  fn move_selection(&mut self, delta: isize) {
    if self.rows.is_empty() {
      return;
    }
    let current = self.table_state.selected().unwrap_or(0) as isize;
    let next = (current + delta).clamp(0, self.rows.len() as isize - 1);
    self.table_state.select(Some(next as usize));
  }
}

impl View for StatsView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
      KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
      KeyCode::Char('r') => {
        self.session.spawn_refresh();
        self.reload();
      }
      KeyCode::Enter => {
        let selected = self.table_state.selected().and_then(|i| self.rows.get(i));
        if let Some(row) = selected {
          let listing = self.feed.snapshot().items.iter().find(|l| l.id == row.listing_id);
          if let Some(listing) = listing {
            return ViewAction::Push(Box::new(ListingDetailView::new(
              self.session.clone(),
              listing.clone(),
            )));
          }
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(
        " Stats ({} listings, {} events in 24h) ",
        self.rows.len(),
        self.recent_events
      ))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow));

    if self.rows.is_empty() {
      let paragraph = Paragraph::new("No activity recorded yet.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    if self.table_state.selected().map_or(true, |i| i >= self.rows.len()) {
      self.table_state.select(Some(0));
    }

    let header = Row::new(["Listing", "Views", "Likes", "Passes", "Shares", "Like rate"])
      .style(Style::default().fg(Color::DarkGray).bold());
    let rows: Vec<Row> = self
      .rows
      .iter()
      .map(|m| {
        let rate = m
          .like_rate()
          .map(|r| format!("{:.0}%", r * 100.0))
          .unwrap_or_else(|| "-".to_string());
        Row::new(vec![
          truncate(&self.title_for(&m.listing_id), 40),
          m.views.to_string(),
          m.swipe_rights.to_string(),
          m.swipe_lefts.to_string(),
          m.shares.to_string(),
          rate,
        ])
      })
      .collect();

    let widths = [
      Constraint::Min(20),
      Constraint::Length(7),
      Constraint::Length(7),
      Constraint::Length(7),
      Constraint::Length(7),
      Constraint::Length(10),
    ];
    let table = Table::new(rows, widths)
      .header(header)
      .block(block)
      .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(table, area, &mut self.table_state);
  }

  fn breadcrumb_label(&self) -> String {
    "Stats".to_string()
  }

  fn tick(&mut self) {
    self.feed.poll();
  }

  fn status(&self) -> Option<&str> {
    self.status.as_deref()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("enter", "details").with_priority(1),
      ShortcutInfo::new("r", "reload").with_priority(2),
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
