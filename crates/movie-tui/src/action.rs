//! Action enum — all user-initiated intents and internal events.

/// Unique identifier for a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    HomeList,
    FavouritesList,
    DetailView,
    HelpOverlay,
}

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Navigation ───────────────────────────────────────────────────────────
    /// Navigate to a path (`homeScreen`, `favouriteScreen`, `detailScreen/{id}`).
    Navigate(String),
    Back,
    /// Return to the start destination, clearing the back stack.
    Home,

    // ── Favourites ───────────────────────────────────────────────────────────
    ToggleFavourite(String),

    // ── Filter/search ────────────────────────────────────────────────────────
    OpenFilter,
    CloseFilter,

    // ── UI toggles ───────────────────────────────────────────────────────────
    ToggleHelp,
    ToggleKeys,

    // ── System ───────────────────────────────────────────────────────────────
    Reload,
    Quit,
    Resize(u16, u16),
}
