//! Per-instance reentrancy guard
//!
//! Set for the whole of every state-changing operation, including the window
//! in which collaborators run. A collaborator that calls back into the same
//! instance is rejected with [`TemplError::ReentrantCall`].

use std::cell::Cell;
use templ_types::{TemplError, TemplResult};
use tracing::warn;

#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: Cell<bool>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the instance busy until the returned token is dropped
    pub fn enter(&self) -> TemplResult<Entered<'_>> {
        if self.entered.replace(true) {
            warn!("Reentrant call rejected");
            return Err(TemplError::ReentrantCall);
        }
        Ok(Entered { guard: self })
    }

    pub fn is_entered(&self) -> bool {
        self.entered.get()
    }
}

/// Clears the guard on drop, including on early return
#[must_use]
pub struct Entered<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        self.guard.entered.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_entry_rejected() {
        let guard = ReentrancyGuard::new();
        let first = guard.enter().unwrap();
        assert!(guard.is_entered());
        assert_eq!(guard.enter().err(), Some(TemplError::ReentrantCall));
        // The failed attempt must not clear the flag
        assert!(guard.is_entered());
        drop(first);
        assert!(!guard.is_entered());
        assert!(guard.enter().is_ok());
    }

    #[test]
    fn test_released_on_error_path() {
        fn op(guard: &ReentrancyGuard) -> TemplResult<()> {
            let _entered = guard.enter()?;
            Err(TemplError::JoiningPaused)
        }
        let guard = ReentrancyGuard::new();
        assert!(op(&guard).is_err());
        assert!(!guard.is_entered());
    }
}
