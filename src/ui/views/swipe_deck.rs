use super::failure_status;
use crate::app::Session;
use crate::listings::Listing;
use crate::metrics::MetricKind;
use crate::ui::feed::SnapshotFeed;
use crate::ui::renderfns::{format_layout, format_price, median_price, price_color, rating_label};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::ListingDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Wrap};
use std::collections::HashSet;

/// One card at a time: like it, pass on it, or open it.
///
/// The deck is every listing in the latest snapshot that is neither liked
/// nor passed in this session, in backend order.
pub struct SwipeDeckView {
  session: Session,
  feed: SnapshotFeed,
  passed: HashSet<String>,
  /// Cards liked or passed since the deck was opened or last reloaded
  swiped: usize,
  deck: Vec<usize>,
  seen_top: Option<String>,
  status: Option<String>,
}

impl SwipeDeckView {
  pub fn new(session: Session) -> Self {
    let feed = SnapshotFeed::new(session.listings.subscribe());
    let mut view = Self {
      session,
      feed,
      passed: HashSet::new(),
      swiped: 0,
      deck: Vec::new(),
      seen_top: None,
      status: None,
    };
    view.rebuild_deck();
    view
  }

  fn items(&self) -> &[Listing] {
    &self.feed.snapshot().items
  }

  fn top(&self) -> Option<&Listing> {
    self.deck.first().and_then(|&i| self.items().get(i))
  }

  fn rebuild_deck(&mut self) {
    let liked = self.session.liked.ids();
    self.deck = self
      .items()
      .iter()
      .enumerate()
      .filter(|(_, l)| !liked.contains(&l.id) && !self.passed.contains(&l.id))
      .map(|(i, _)| i)
      .collect();
    self.note_view();
  }

  /// Count a view the first time a card reaches the top
  fn note_view(&mut self) {
    let top_id = self.top().map(|l| l.id.clone());
    if top_id == self.seen_top {
      return;
    }
    if let Some(id) = &top_id {
      if let Some(msg) = failure_status("Recording view", self.session.metrics.record(id, MetricKind::View)) {
        self.status = Some(msg);
      }
    }
    self.seen_top = top_id;
  }

  fn swipe(&mut self, like: bool) {
    let Some(id) = self.top().map(|l| l.id.clone()) else {
      return;
    };
    let (kind, saved) = if like {
      (MetricKind::SwipeRight, failure_status("Saving like", self.session.liked.like(&id)))
    } else {
      self.passed.insert(id.clone());
      (MetricKind::SwipeLeft, None)
    };
    if saved.is_none() {
      self.swiped += 1;
    }
    self.status = saved.or_else(|| failure_status("Recording swipe", self.session.metrics.record(&id, kind)));
    self.rebuild_deck();
  }

  fn render_card(&self, frame: &mut Frame, area: Rect, listing: &Listing) {
    let listed: Vec<&Listing> = self.items().iter().collect();
    let median = median_price(&listed);
    let (position, total) = deck_progress(self.swiped, self.deck.len());

    let block = Block::default()
      .title(format!(" {} of {} ", position, total))
      .title_alignment(Alignment::Right)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Magenta));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(1), Constraint::Length(1)])
      .split(inner);

    let label = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
      Line::from(Span::styled(listing.title.clone(), Style::default().bold())),
      Line::from(Span::styled(listing.address.clone(), label)),
      Line::default(),
      Line::from(vec![
        Span::styled(
          format_price(listing.price),
          Style::default().fg(price_color(listing.price, median)).bold(),
        ),
        Span::raw("   "),
        Span::raw(format_layout(listing)),
      ]),
      Line::from(Span::styled(
        rating_label(listing.rating.as_ref()),
        Style::default().fg(Color::Yellow),
      )),
    ];
    if let Some(date) = &listing.available_from {
      lines.push(Line::from(vec![Span::styled("Available ", label), Span::raw(date.clone())]));
    }
    if !listing.amenities.is_empty() {
      lines.push(Line::default());
      lines.push(Line::from(Span::styled(
        listing.amenities.join(" · "),
        Style::default().fg(Color::Cyan),
      )));
    }
    if !listing.description.is_empty() {
      lines.push(Line::default());
      lines.push(Line::from(listing.description.clone()));
    }
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), chunks[0]);

    let gauge = Gauge::default()
      .gauge_style(Style::default().fg(Color::Magenta).bg(Color::Black))
      .ratio((position - 1) as f64 / total as f64)
      .label(format!("{} left", self.deck.len()));
    frame.render_widget(gauge, chunks[1]);
  }

  fn render_message(&self, frame: &mut Frame, area: Rect, message: &str) {
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::DarkGray));
    let paragraph = Paragraph::new(message)
      .block(block)
      .alignment(Alignment::Center)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
  }
}

impl View for SwipeDeckView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('l') | KeyCode::Right => self.swipe(true),
      KeyCode::Char('h') | KeyCode::Left => self.swipe(false),
      KeyCode::Enter => {
        if let Some(listing) = self.top() {
          return ViewAction::Push(Box::new(ListingDetailView::new(
            self.session.clone(),
            listing.clone(),
          )));
        }
      }
      KeyCode::Char('r') => {
        // Passed cards come back on a manual reload
        self.passed.clear();
        self.swiped = 0;
        self.session.spawn_refresh();
        self.status = Some("Refreshing listings".to_string());
        self.rebuild_deck();
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    match self.top() {
      Some(listing) => self.render_card(frame, area, listing),
      None if self.feed.is_loading() => self.render_message(frame, area, "\nLoading listings..."),
      None if self.items().is_empty() => {
        self.render_message(frame, area, "\nNo listings available.\nPress r to try again.")
      }
      None => self.render_message(
        frame,
        area,
        "\nYou've seen every listing.\nPress r to reload and revisit passed ones.",
      ),
    }
  }

  fn breadcrumb_label(&self) -> String {
    "Deck".to_string()
  }

  fn tick(&mut self) {
    self.feed.poll();
    // Likes can change from other views, so always rebuild
    self.rebuild_deck();
  }

  fn status(&self) -> Option<&str> {
    self.status.as_deref()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("l", "like").with_priority(1),
      ShortcutInfo::new("h", "pass").with_priority(2),
      ShortcutInfo::new("enter", "details").with_priority(3),
      ShortcutInfo::new("r", "refresh").with_priority(4),
      ShortcutInfo::new(":", "command").with_priority(10),
    ]
  }
}

/// 1-based position of the top card and the size of this session's deck.
/// Listings liked in earlier sessions never enter the deck, so they don't count.
fn deck_progress(swiped: usize, remaining: usize) -> (usize, usize) {
  (swiped + 1, swiped + remaining)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_progress_ignores_listings_outside_the_deck() {
    // Ten listings, three liked last time: the first card is 1 of 7
    assert_eq!(deck_progress(0, 7), (1, 7));
  }

  #[test]
  fn test_progress_advances_with_swipes() {
    assert_eq!(deck_progress(2, 5), (3, 7));
    assert_eq!(deck_progress(6, 1), (7, 7));
  }
}
