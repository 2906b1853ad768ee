//! Pending-intent tracking for favourite toggles.
//!
//! Pressing `f` sends a command to the catalog core and waits for the flag to
//! come back in a state broadcast.  During that window the heart icon pulses
//! instead of flipping immediately.
//!
//! # States
//! ```text
//!  Confirmed(T)          — store confirmed; render normally
//!  Pending { ... }       — command sent, no confirmation yet; pulse
//!  TimedOut { ... }      — waited too long; warning colour + "?"
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

use movie_proto::protocol::CatalogState;

/// Timeout before a pending intent becomes `TimedOut`.
pub const INTENT_TIMEOUT: Duration = Duration::from_millis(3000);

/// Three-state wrapper for a value that may be waiting for confirmation.
#[derive(Debug, Clone)]
pub enum IntentState<T: Clone + PartialEq> {
    Confirmed(T),
    /// Command sent; waiting for the store to echo back `intended`.
    Pending {
        intended: T,
        confirmed: T,
        since: Instant,
    },
    TimedOut { intended: T, confirmed: T },
}

impl<T: Clone + PartialEq> IntentState<T> {
    pub fn new(value: T) -> Self {
        Self::Confirmed(value)
    }

    /// The value the user intended (most relevant for display).
    pub fn intended(&self) -> &T {
        match self {
            Self::Confirmed(v) => v,
            Self::Pending { intended, .. } => intended,
            Self::TimedOut { intended, .. } => intended,
        }
    }

    pub fn confirmed(&self) -> &T {
        match self {
            Self::Confirmed(v) => v,
            Self::Pending { confirmed, .. } => confirmed,
            Self::TimedOut { confirmed, .. } => confirmed,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// Register a user intent.  Transitions to `Pending` unless `intended`
    /// already equals the confirmed value.
    pub fn set_intent(&mut self, intended: T) {
        self.set_intent_at(intended, Instant::now());
    }

    fn set_intent_at(&mut self, intended: T, now: Instant) {
        let confirmed = self.confirmed().clone();
        if intended == confirmed {
            *self = Self::Confirmed(intended);
        } else {
            *self = Self::Pending {
                intended,
                confirmed,
                since: now,
            };
        }
    }

    /// Called every tick to check for timeout.  Returns `true` if state changed.
    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> bool {
        if let Self::Pending {
            intended,
            confirmed,
            since,
        } = self
        {
            if now.saturating_duration_since(*since) >= INTENT_TIMEOUT {
                *self = Self::TimedOut {
                    intended: intended.clone(),
                    confirmed: confirmed.clone(),
                };
                return true;
            }
        }
        false
    }

    /// Called when a new observed value arrives.  Returns `true` if the state
    /// changed.
    pub fn on_confirmed(&mut self, value: T) -> bool {
        match self {
            Self::Pending { intended, .. } => {
                if value == *intended {
                    *self = Self::Confirmed(value);
                    return true;
                }
                // Different value came in; keep waiting
                if let Self::Pending { confirmed, .. } = self {
                    *confirmed = value;
                }
                false
            }
            Self::TimedOut { intended, .. } => {
                let matches = value == *intended;
                *self = Self::Confirmed(value);
                matches
            }
            Self::Confirmed(v) => {
                if *v != value {
                    *self = Self::Confirmed(value);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Drop the intent and show `value` again.
    pub fn revert(&mut self, value: T) {
        *self = Self::Confirmed(value);
    }

    pub fn render_state(&self) -> RenderHint {
        match self {
            Self::Confirmed(_) => RenderHint::Normal,
            Self::Pending { since, .. } => {
                // Pulse on/off every 400ms
                let pulsing = (since.elapsed().as_millis() / 400) % 2 == 0;
                if pulsing {
                    RenderHint::PendingVisible
                } else {
                    RenderHint::PendingHidden
                }
            }
            Self::TimedOut { .. } => RenderHint::TimedOut,
        }
    }
}

/// How to render a value that may be pending confirmation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderHint {
    Normal,
    /// Pending, show icon (pulse-on frame).
    PendingVisible,
    /// Pending, hide icon (pulse-off frame).
    PendingHidden,
    /// Timed out — warning colour and "?".
    TimedOut,
}

/// What a card shows for a movie's heart while an intent is outstanding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FavouriteHint {
    pub intended: bool,
    pub hint: RenderHint,
}

// ── Per-movie favourite intents ───────────────────────────────────────────────

/// One `IntentState<bool>` per movie with an unconfirmed toggle.  Settled
/// entries are removed so the map only holds what is in flight.
#[derive(Debug, Default)]
pub struct FavouriteIntents {
    intents: HashMap<String, IntentState<bool>>,
}

impl FavouriteIntents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a toggle of `movie_id` whose observed flag is `observed`.
    /// Returns the flag the user asked for.
    pub fn request_toggle(&mut self, movie_id: &str, observed: bool) -> bool {
        let intent = self
            .intents
            .entry(movie_id.to_string())
            .or_insert_with(|| IntentState::new(observed));
        let intended = !*intent.intended();
        intent.set_intent(intended);
        intended
    }

    /// Reconcile every outstanding intent with a fresh catalog snapshot.
    pub fn confirm_from(&mut self, state: &CatalogState) {
        self.intents.retain(|id, intent| match state.movie(id) {
            Some(movie) => {
                intent.on_confirmed(movie.favoured);
                !matches!(intent, IntentState::Confirmed(_))
            }
            None => false,
        });
    }

    /// Forget the intent for `movie_id` (the store rejected it).
    pub fn revert(&mut self, movie_id: &str) -> bool {
        self.intents.remove(movie_id).is_some()
    }

    /// Advance timeouts.  Returns the ids that just timed out.
    pub fn tick(&mut self) -> Vec<String> {
        let now = Instant::now();
        self.tick_at(now)
    }

    fn tick_at(&mut self, now: Instant) -> Vec<String> {
        let mut timed_out: Vec<String> = self
            .intents
            .iter_mut()
            .filter_map(|(id, intent)| intent.tick_at(now).then(|| id.clone()))
            .collect();
        timed_out.sort();
        timed_out
    }

    pub fn hints(&self) -> HashMap<String, FavouriteHint> {
        self.intents
            .iter()
            .map(|(id, intent)| {
                (
                    id.clone(),
                    FavouriteHint {
                        intended: *intent.intended(),
                        hint: intent.render_state(),
                    },
                )
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
}
