use super::failure_status;
use crate::app::Session;
use crate::listings::Listing;
use crate::metrics::MetricKind;
use crate::ui::feed::SnapshotFeed;
use crate::ui::renderfns::{format_layout, format_price, rating_label};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Full details for one listing
pub struct ListingDetailView {
  session: Session,
  feed: SnapshotFeed,
  listing: Listing,
  scroll: u16,
  status: Option<String>,
}

impl ListingDetailView {
  pub fn new(session: Session, listing: Listing) -> Self {
    let feed = SnapshotFeed::new(session.listings.subscribe());
    Self {
      session,
      feed,
      listing,
      scroll: 0,
      status: None,
    }
  }

  fn toggle_like(&mut self) {
    let id = self.listing.id.clone();
    self.status = match self.session.liked.toggle(&id) {
      Ok(liked) => {
        let kind = if liked {
          MetricKind::SwipeRight
        } else {
          MetricKind::Unlike
        };
        failure_status("Recording like", self.session.metrics.record(&id, kind))
          .or_else(|| Some(if liked { "Liked" } else { "Removed from liked" }.to_string()))
      }
      Err(e) => failure_status::<()>("Saving like", Err(e)),
    };
  }

  fn share(&mut self) {
    self.status = failure_status(
      "Recording share",
      self.session.metrics.record(&self.listing.id, MetricKind::Share),
    )
    .or_else(|| Some("Share recorded".to_string()));
  }

  fn lines(&self) -> Vec<Line<'static>> {
    let listing = &self.listing;
    let label = Style::default().fg(Color::DarkGray);
    let field = |name: &'static str, value: String| {
      Line::from(vec![Span::styled(format!("{:<12}", name), label), Span::raw(value)])
    };

    let mut lines = vec![
      Line::from(Span::styled(listing.title.clone(), Style::default().bold())),
      Line::default(),
      field("Address", listing.address.clone()),
      field("Rent", format_price(listing.price)),
      field("Layout", format_layout(listing)),
      field("Rating", rating_label(listing.rating.as_ref())),
      field(
        "Available",
        listing.available_from.clone().unwrap_or_else(|| "-".to_string()),
      ),
    ];
    if let Some(point) = listing.location {
      lines.push(field(
        "Location",
        format!("{:.5}, {:.5}", point.latitude, point.longitude),
      ));
    }
    lines.push(field("Photos", listing.images.len().to_string()));
    match self.session.metrics.for_listing(&listing.id) {
      Ok(m) => lines.push(field(
        "Activity",
        format!(
          "{} views · {} likes · {} passes · {} shares",
          m.views, m.swipe_rights, m.swipe_lefts, m.shares
        ),
      )),
      Err(e) => lines.push(field("Activity", format!("unavailable ({})", e))),
    }

    if !listing.amenities.is_empty() {
      lines.push(Line::default());
      lines.push(Line::from(Span::styled("Amenities", label)));
      for amenity in &listing.amenities {
        lines.push(Line::from(Span::styled(
          format!("  • {}", amenity),
          Style::default().fg(Color::Cyan),
        )));
      }
    }

    if !listing.description.is_empty() {
      lines.push(Line::default());
      lines.push(Line::from(Span::styled("Description", label)));
      lines.push(Line::from(listing.description.clone()));
    }
    lines
  }
}

impl View for ListingDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('l') => self.toggle_like(),
      KeyCode::Char('s') => self.share(),
      KeyCode::Char('j') | KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
      KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let liked = self.session.liked.contains(&self.listing.id);
    let title = if liked { " ♥ Liked " } else { " Listing " };
    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(if liked { Color::Red } else { Color::Blue }));

    let paragraph = Paragraph::new(self.lines())
      .block(block)
      .wrap(Wrap { trim: false })
      .scroll((self.scroll, 0));
    frame.render_widget(paragraph, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.listing.title.clone()
  }

  fn tick(&mut self) {
    // Follow the listing across reloads; keep the last copy if it vanished
    if self.feed.poll() {
      if let Some(fresh) = self.feed.snapshot().items.iter().find(|l| l.id == self.listing.id) {
        self.listing = fresh.clone();
      }
    }
  }

  fn status(&self) -> Option<&str> {
    self.status.as_deref()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("l", "like/unlike").with_priority(1),
      ShortcutInfo::new("s", "share").with_priority(2),
      ShortcutInfo::new("j/k", "scroll").with_priority(3),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
