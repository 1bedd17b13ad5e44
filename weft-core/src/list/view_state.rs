//! View-state preservation around a reconciliation pass.
//!
//! Reordering or replacing children can disturb host-side state that lives
//! outside the data model: focus, text selection, scroll position. A
//! [`ViewStateHook`] captures whatever the host cares about before a pass
//! and restores it afterwards. Strategies are pluggable and have no effect
//! on the correctness of reconciliation itself.

/// Captures host view state before a pass and restores it after.
pub trait ViewStateHook<C> {
    fn capture(&mut self, container: &C);
    fn restore(&mut self, container: &mut C);
}

/// The do-nothing strategy.
#[derive(Debug, Default)]
pub struct NoViewState;

impl<C> ViewStateHook<C> for NoViewState {
    fn capture(&mut self, _container: &C) {}
    fn restore(&mut self, _container: &mut C) {}
}

/// Adapter building a hook from two closures, for hosts that don't want a
/// dedicated type.
pub struct FnViewState<Cap, Res> {
    capture: Cap,
    restore: Res,
}

impl<Cap, Res> FnViewState<Cap, Res> {
    pub fn new(capture: Cap, restore: Res) -> Self {
        Self { capture, restore }
    }
}

impl<C, Cap, Res> ViewStateHook<C> for FnViewState<Cap, Res>
where
    Cap: FnMut(&C),
    Res: FnMut(&mut C),
{
    fn capture(&mut self, container: &C) {
        (self.capture)(container);
    }

    fn restore(&mut self, container: &mut C) {
        (self.restore)(container);
    }
}
