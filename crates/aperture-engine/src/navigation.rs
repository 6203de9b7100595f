//! The host navigation seam.

/// Facade over the host framework's navigation subsystem.
///
/// The engine uses it for exactly one side effect: after visibility
/// changes, replay the current logical location so any view-level
/// permission gates re-run. When no navigation subsystem is active the
/// facade is simply absent and the replay is skipped.
pub trait NavigationFacade: Send + Sync {
    /// The current logical location, or `None` when nothing is shown yet.
    fn current_location(&self) -> Option<String>;

    /// Navigates to `location`, running the host's pre-navigation hooks.
    fn navigate_to(&self, location: &str);
}
