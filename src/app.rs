use crate::config::Config;
use crate::db::Database;
use crate::event::{Event, EventHandler};
use crate::liked::LikedListings;
use crate::listings::BackendClient;
use crate::metrics::MetricsRecorder;
use crate::preferences::PreferencesStore;
use crate::sync::SyncStore;
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{LikedListView, PreferencesView, StatsView, SwipeDeckView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub type ListingsStore = SyncStore<BackendClient>;

/// Handles every view shares: the listings store and the local state
#[derive(Clone)]
pub struct Session {
  pub listings: ListingsStore,
  pub liked: LikedListings,
  pub metrics: MetricsRecorder,
  pub preferences: PreferencesStore,
}

impl Session {
  /// Reload listings in the background; views see the result on a tick
  pub fn spawn_refresh(&self) {
    if !self.listings.is_active() {
      debug!("Store is shut down, skipping refresh");
      return;
    }
    let store = self.listings.clone();
    tokio::spawn(async move { store.refresh().await });
  }
}

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,
  command: CommandInput,
  session: Session,
  title: String,
  username: Option<String>,
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let client = BackendClient::new(&config)?;
    let listings = SyncStore::new(client, config.sync_policy());

    let db = Arc::new(Database::open()?);
    let liked = LikedListings::load(Arc::clone(&db))?;
    let metrics = MetricsRecorder::new(Arc::clone(&db), config.username.clone());
    let preferences = PreferencesStore::new(db);

    let session = Session {
      listings,
      liked,
      metrics,
      preferences,
    };

    Ok(Self {
      view_stack: vec![Box::new(SwipeDeckView::new(session.clone()))],
      command: CommandInput::new(),
      session,
      title: config.display_title(),
      username: config.username,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;

    self.session.listings.activate();
    let result = self.event_loop().await;
    self.session.listings.deactivate();

    // Restore the terminal even when the loop failed
    if let Err(e) = disable_raw_mode() {
      error!("Failed to disable raw mode: {}", e);
    }
    if let Err(e) = stdout().execute(LeaveAlternateScreen) {
      error!("Failed to leave alternate screen: {}", e);
    }

    result
  }

  async fn event_loop(&mut self) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut events = EventHandler::new(Duration::from_millis(200));

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => {
          if let Some(view) = self.view_stack.last_mut() {
            view.tick();
          }
        }
        Some(Event::Resize) => {}
        None => {
          warn!("Event source closed");
          break;
        }
      }
    }
    Ok(())
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    // The palette gets first look so typing doesn't trigger view keys
    match self.command.handle_key(key) {
      KeyResult::Event(CommandEvent::Submitted(cmd)) => {
        self.execute_command(&cmd);
        return;
      }
      KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
      KeyResult::NotHandled => {}
    }

    let Some(view) = self.view_stack.last_mut() else {
      return;
    };
    match view.handle_key(key) {
      ViewAction::None => {}
      ViewAction::Push(next) => self.view_stack.push(next),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn execute_command(&mut self, cmd: &str) {
    debug!(command = cmd, "Executing command");
    let root: Box<dyn View> = match cmd {
      "deck" => Box::new(SwipeDeckView::new(self.session.clone())),
      "liked" => Box::new(LikedListView::new(self.session.clone())),
      "stats" => Box::new(StatsView::new(self.session.clone())),
      "prefs" => Box::new(PreferencesView::new(self.session.clone())),
      "refresh" => {
        info!("Manual refresh requested");
        self.session.spawn_refresh();
        return;
      }
      "quit" => {
        self.should_quit = true;
        return;
      }
      other => {
        warn!(command = other, "Unknown command");
        return;
      }
    };
    self.view_stack = vec![root];
  }

  // Accessors for UI rendering

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self.view_stack.iter().map(|v| v.breadcrumb_label()).collect()
  }

  pub fn command(&self) -> &CommandInput {
    &self.command
  }

  pub fn session(&self) -> &Session {
    &self.session
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn username(&self) -> Option<&str> {
    self.username.as_deref()
  }
}

#[cfg(test)]
mod tests {
  use crate::commands;

  #[test]
  fn test_every_command_is_handled() {
    let handled = ["deck", "liked", "stats", "prefs", "refresh", "quit"];
    for cmd in commands::COMMANDS {
      assert!(handled.contains(&cmd.name), "unhandled command {}", cmd.name);
    }
  }
}
