//! Event types and the main event loop driver for the Ember TUI.
//!
//! This module defines the [`Event`] enum (keyboard input, ticks and the
//! completion messages of background lookups) and the [`EventHandler`], which
//! runs a background task that polls crossterm for key events and emits
//! periodic [`Event::Tick`]s. The main loop in `main.rs` receives events via
//! [`EventHandler::next`]; the [`Controller`](crate::controller::Controller)
//! posts its completions through a clone of [`EventHandler::tx`].

use crate::controller::Retrieval;
use crate::error::{FetchError, LocationError};
use crate::models::Coordinate;
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::error;

/// Events processed by the application event loop.
#[derive(Debug)]
pub enum Event {
    /// Periodic tick used for the loading spinner.
    Tick,
    /// User key press from the terminal.
    Input(KeyEvent),
    /// The geolocation provider answered (or could not).
    LocationFix {
        /// Sequence number handed out when the lookup was started.
        seq: u64,
        result: Result<Coordinate, LocationError>,
    },
    /// A geocoder lookup for a search query finished.
    SearchResolved {
        /// Sequence number handed out when the search was submitted.
        seq: u64,
        query: String,
        /// First match, `None` when the geocoder had no candidates.
        result: Result<Option<Coordinate>, FetchError>,
    },
    /// A hotspot retrieval finished, live or degraded.
    RetrievalFinished {
        /// Sequence number handed out when the retrieval was issued.
        seq: u64,
        /// Coordinate the retrieval was issued for.
        at: Coordinate,
        outcome: Retrieval,
    },
}

/// Multiplexes terminal input, ticks and background completions into a single
/// event stream.
///
/// The sender ([`tx`](EventHandler::tx)) can be cloned and given to other
/// tasks, while the receiver is consumed by [`next`](EventHandler::next) in the
/// main loop.
pub struct EventHandler {
    /// Sender for posting events from background tasks.
    pub tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Creates a new event handler and spawns the input/tick task.
    ///
    /// The task polls crossterm with a timeout of `tick_rate_ms`; a key press
    /// becomes [`Event::Input`] and each elapsed interval an [`Event::Tick`].
    /// It stops when the terminal can no longer be read or the receiver is gone.
    pub fn new(tick_rate_ms: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        tokio::task::spawn_blocking(move || {
            let tick_rate = Duration::from_millis(tick_rate_ms);
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(Duration::from_secs(0));
                match event::poll(timeout) {
                    Ok(true) => match event::read() {
                        Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                            if event_tx.send(Event::Input(key)).is_err() {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!("Terminal read failed: {}", e);
                            break;
                        }
                    },
                    Ok(false) => {}
                    Err(e) => {
                        error!("Terminal poll failed: {}", e);
                        break;
                    }
                }
                if last_tick.elapsed() >= tick_rate {
                    if event_tx.send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = Instant::now();
                }
            }
        });

        Self { tx, rx }
    }

    /// Receives the next event from the channel.
    ///
    /// Returns `None` once every sender has been dropped.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}
