//! NavHost — back stack of resolved destinations.
//!
//! The start destination (Home) always stays at the bottom of the stack.

use movie_proto::error::RouteError;
use movie_proto::route::{match_path, Destination};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct NavHost {
    current: Destination,
    history: Vec<Destination>,
}

impl NavHost {
    pub fn new() -> Self {
        Self {
            current: Destination::Home,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> &Destination {
        &self.current
    }

    pub fn current_path(&self) -> String {
        self.current.path()
    }

    /// Number of entries on the stack, including the current one.
    pub fn depth(&self) -> usize {
        self.history.len() + 1
    }

    /// Resolve `path` and push it.  Unknown paths leave the stack untouched;
    /// navigating to the destination already on top is a no-op.
    pub fn navigate(&mut self, path: &str) -> Result<Destination, RouteError> {
        let dest = match_path(path).map_err(|e| {
            warn!("nav: {}", e);
            e
        })?;
        self.push(dest.clone());
        Ok(dest)
    }

    fn push(&mut self, dest: Destination) {
        if dest == self.current {
            return;
        }
        debug!("nav: {} -> {}", self.current.path(), dest.path());
        let prev = std::mem::replace(&mut self.current, dest);
        self.history.push(prev);
    }

    /// Go back one entry.  Returns `false` on the start destination.
    pub fn pop_back(&mut self) -> bool {
        match self.history.pop() {
            Some(prev) => {
                debug!("nav: back to {}", prev.path());
                self.current = prev;
                true
            }
            None => false,
        }
    }

    /// Rebuild the stack as `[Home, path]`, used when restoring a session.
    /// Falls back to Home for paths that no longer resolve.
    pub fn restore(&mut self, path: &str) {
        self.history.clear();
        self.current = Destination::Home;
        if let Ok(dest) = match_path(path) {
            self.push(dest);
        }
    }

    /// Screen titles from the bottom of the stack to the top.
    pub fn breadcrumbs(&self) -> Vec<&'static str> {
        self.history
            .iter()
            .chain(std::iter::once(&self.current))
            .map(|d| d.route().title())
            .collect()
    }
}

impl Default for NavHost {
    fn default() -> Self {
        Self::new()
    }
}
