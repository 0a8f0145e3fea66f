//! Exclusive pointer interaction sessions.
//!
//! A drag installs document-wide listeners and changes global host state
//! (text selectability, page overflow). [`InteractionSession`] owns both for
//! the duration of the drag and puts everything back when it ends. A
//! [`SessionGate`] shared by every drag source admits one session at a time.

use std::cell::Cell;
use std::rc::Rc;

/// Which document-wide listener set a session installs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerScope {
    /// Pointer move/up while dragging a selection marker
    MarkerDrag,
    /// Pointer move/up while dragging the edit overlay
    OverlayDrag,
}

/// Page scrolling behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overflow {
    #[default]
    Auto,
    Hidden,
}

/// Global host state touched by drags.
pub trait InteractionHost {
    fn attach_listeners(&mut self, scope: ListenerScope);
    fn detach_listeners(&mut self, scope: ListenerScope);
    fn text_selectable(&self) -> bool;
    fn set_text_selectable(&mut self, selectable: bool);
    fn overflow(&self) -> Overflow;
    fn set_overflow(&mut self, overflow: Overflow);
}

/// Admits at most one active session among everything that shares it.
#[derive(Debug, Clone, Default)]
pub struct SessionGate {
    active: Rc<Cell<Option<ListenerScope>>>,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<ListenerScope> {
        self.active.get()
    }

    pub fn is_busy(&self) -> bool {
        self.active.get().is_some()
    }
}

/// Host state a session applies while it is active. `None` leaves it alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionEffects {
    pub text_selectable: Option<bool>,
    pub overflow: Option<Overflow>,
}

#[derive(Debug)]
pub struct InteractionSession {
    scope: ListenerScope,
    gate: SessionGate,
    prior_text_selectable: Option<bool>,
    prior_overflow: Option<Overflow>,
    ended: bool,
}

impl InteractionSession {
    /// Starts a session, or returns `None` while another one is active.
    pub fn begin<H: InteractionHost + ?Sized>(
        host: &mut H,
        gate: &SessionGate,
        scope: ListenerScope,
        effects: SessionEffects,
    ) -> Option<Self> {
        if let Some(active) = gate.active() {
            tracing::debug!(?scope, ?active, "interaction refused, another session is active");
            return None;
        }
        gate.active.set(Some(scope));

        host.attach_listeners(scope);
        let prior_text_selectable = effects.text_selectable.map(|selectable| {
            let prior = host.text_selectable();
            host.set_text_selectable(selectable);
            prior
        });
        let prior_overflow = effects.overflow.map(|overflow| {
            let prior = host.overflow();
            host.set_overflow(overflow);
            prior
        });

        tracing::trace!(?scope, "interaction session started");
        Some(Self { scope, gate: gate.clone(), prior_text_selectable, prior_overflow, ended: false })
    }

    pub fn scope(&self) -> ListenerScope {
        self.scope
    }

    /// Detaches listeners, restores host state and frees the gate.
    pub fn end<H: InteractionHost + ?Sized>(mut self, host: &mut H) {
        host.detach_listeners(self.scope);
        if let Some(selectable) = self.prior_text_selectable {
            host.set_text_selectable(selectable);
        }
        if let Some(overflow) = self.prior_overflow {
            host.set_overflow(overflow);
        }
        self.release();
        tracing::trace!(scope = ?self.scope, "interaction session ended");
    }

    fn release(&mut self) {
        self.ended = true;
        self.gate.active.set(None);
    }
}

impl Drop for InteractionSession {
    fn drop(&mut self) {
        if !self.ended {
            tracing::warn!(scope = ?self.scope, "interaction session dropped without end; host state left as is");
            self.release();
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingHost;
    use super::*;

    #[test]
    fn test_session_applies_and_restores_effects() {
        let mut host = RecordingHost::default();
        let gate = SessionGate::new();
        let effects = SessionEffects { text_selectable: Some(false), overflow: Some(Overflow::Hidden) };

        let session = InteractionSession::begin(&mut host, &gate, ListenerScope::OverlayDrag, effects).unwrap();
        assert_eq!(host.attached, vec![ListenerScope::OverlayDrag]);
        assert!(!host.text_selectable);
        assert_eq!(host.overflow, Overflow::Hidden);
        assert_eq!(gate.active(), Some(ListenerScope::OverlayDrag));

        session.end(&mut host);
        assert!(host.attached.is_empty());
        assert!(host.text_selectable);
        assert_eq!(host.overflow, Overflow::Auto);
        assert!(!gate.is_busy());
    }

    #[test]
    fn test_untouched_effects_are_not_restored() {
        let mut host = RecordingHost::default();
        let gate = SessionGate::new();

        let session =
            InteractionSession::begin(&mut host, &gate, ListenerScope::MarkerDrag, SessionEffects::default()).unwrap();
        host.overflow = Overflow::Hidden;
        session.end(&mut host);

        assert_eq!(host.overflow, Overflow::Hidden);
    }

    #[test]
    fn test_gate_admits_one_session() {
        let mut host = RecordingHost::default();
        let gate = SessionGate::new();

        let first =
            InteractionSession::begin(&mut host, &gate, ListenerScope::MarkerDrag, SessionEffects::default()).unwrap();
        assert!(
            InteractionSession::begin(&mut host, &gate.clone(), ListenerScope::OverlayDrag, SessionEffects::default())
                .is_none()
        );
        assert_eq!(host.attached, vec![ListenerScope::MarkerDrag]);

        first.end(&mut host);
        assert!(
            InteractionSession::begin(&mut host, &gate, ListenerScope::OverlayDrag, SessionEffects::default()).is_some()
        );
    }

    #[test]
    fn test_dropped_session_frees_the_gate() {
        let mut host = RecordingHost::default();
        let gate = SessionGate::new();

        drop(InteractionSession::begin(&mut host, &gate, ListenerScope::MarkerDrag, SessionEffects::default()));
        assert!(!gate.is_busy());
    }
}
