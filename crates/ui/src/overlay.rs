//! Edit overlay shown over a clicked annotation, and dragging it to move
//! the annotation.

use crate::hit_test::annotation_bounds;
use crate::session::{InteractionHost, InteractionSession, ListenerScope, SessionEffects, SessionGate};
use annotator_core::events::{AnnotationEvent, NodeTarget};
use annotator_core::manipulation::{MoveError, MoveState};
use annotator_core::persistence::KeyValueStore;
use annotator_core::store::{AnnotationStore, StoreError};
use annotator_model::{Annotation, GeometryError, Point, Rect, RecordId, Viewport};

/// Gap between an annotation and its overlay outline
pub const OVERLAY_BORDER: f64 = 2.0;

#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error("annotation `{0}` has no visible bounds")]
    NoBounds(RecordId),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Move(#[from] MoveError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The overlay currently shown.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOverlay {
    pub target: NodeTarget,
    pub annotation: Annotation,
    /// Overlay outline in viewport coordinates
    pub frame: Rect,
    pub viewport: Viewport,
}

#[derive(Debug)]
struct ActiveDrag {
    state: MoveState,
    session: InteractionSession,
    pointer_start: Point,
    frame_start: Rect,
}

/// Drives the edit overlay for one page.
pub struct OverlayDrag<H: InteractionHost> {
    host: H,
    gate: SessionGate,
    overlay: Option<EditOverlay>,
    drag: Option<ActiveDrag>,
}

impl<H: InteractionHost> OverlayDrag<H> {
    pub fn new(host: H, gate: SessionGate) -> Self {
        Self { host, gate, overlay: None, drag: None }
    }

    pub fn overlay(&self) -> Option<&EditOverlay> {
        self.overlay.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Shows the overlay around `annotation`, replacing any previous one.
    pub fn show(&mut self, annotation: &Annotation, viewport: &Viewport) -> Result<&EditOverlay, OverlayError> {
        self.hide();
        let bounds =
            annotation_bounds(annotation, viewport)?.ok_or_else(|| OverlayError::NoBounds(annotation.id.clone()))?;

        Ok(&*self.overlay.insert(EditOverlay {
            target: NodeTarget::of(annotation),
            annotation: annotation.clone(),
            frame: bounds.expand(OVERLAY_BORDER, OVERLAY_BORDER),
            viewport: *viewport,
        }))
    }

    pub fn hide(&mut self) {
        self.cancel();
        self.overlay = None;
    }

    /// Starts dragging when `point` is on the overlay.
    ///
    /// A press anywhere else dismisses the overlay. Text-anchored annotations
    /// keep their overlay but never start a drag.
    pub fn pointer_down(&mut self, point: Point) -> bool {
        if self.drag.is_some() {
            return false;
        }
        let Some(overlay) = &self.overlay else {
            return false;
        };
        if !overlay.frame.contains(point) {
            self.hide();
            return false;
        }

        let Ok(state) = MoveState::begin(overlay.annotation.clone(), overlay.frame.top_left()) else {
            return false;
        };
        let frame_start = overlay.frame;
        let effects = SessionEffects { text_selectable: Some(false), overflow: None };
        let Some(session) = InteractionSession::begin(&mut self.host, &self.gate, ListenerScope::OverlayDrag, effects)
        else {
            return false;
        };

        tracing::trace!(id = %overlay.target.annotation_id, "overlay drag started");
        self.drag = Some(ActiveDrag { state, session, pointer_start: point, frame_start });
        true
    }

    /// Follows the pointer. Each axis only moves while the overlay stays inside the page.
    pub fn pointer_move(&mut self, point: Point) {
        let (Some(drag), Some(overlay)) = (&mut self.drag, &mut self.overlay) else {
            return;
        };

        let x = drag.frame_start.x + (point.x - drag.pointer_start.x);
        let y = drag.frame_start.y + (point.y - drag.pointer_start.y);
        let frame = &mut overlay.frame;

        if y > 0.0 && y + frame.height < overlay.viewport.height {
            frame.y = y;
        }
        if x > 0.0 && x + frame.width < overlay.viewport.width {
            frame.x = x;
        }
        drag.state.update_position(frame.top_left());
    }

    /// Finishes a drag and stores the moved annotation.
    ///
    /// Returns `None` when nothing was being dragged or the overlay did not move.
    pub fn pointer_up<K: KeyValueStore>(
        &mut self,
        store: &AnnotationStore<K>,
        document: &str,
    ) -> Result<Option<Annotation>, OverlayError> {
        let Some(drag) = self.drag.take() else {
            return Ok(None);
        };
        drag.session.end(&mut self.host);

        let delta = drag.state.viewport_delta();
        if delta.x == 0.0 && delta.y == 0.0 {
            return Ok(None);
        }
        let Some(overlay) = &mut self.overlay else {
            return Ok(None);
        };

        let stored = match drag.state.commit(&overlay.viewport) {
            Ok(moved) => {
                let id = moved.id.clone();
                store.edit(document, &id, moved).map_err(OverlayError::from)
            }
            Err(err) => Err(err.into()),
        };
        let stored = match stored {
            Ok(stored) => stored,
            Err(err) => {
                overlay.frame = drag.frame_start;
                return Err(err);
            }
        };

        tracing::debug!(document, id = %stored.id, dx = delta.x, dy = delta.y, "annotation moved");
        store.bus().publish(AnnotationEvent::Message { annotation_id: stored.id.clone() });
        overlay.annotation = stored.clone();
        Ok(Some(stored))
    }

    /// Abandons an active drag and puts the overlay back where it started.
    pub fn cancel(&mut self) {
        if let Some(drag) = self.drag.take() {
            drag.session.end(&mut self.host);
            if let Some(overlay) = &mut self.overlay {
                overlay.frame = drag.frame_start;
            }
        }
    }

    /// Deletes the annotation under the overlay and hides it.
    pub fn delete_target<K: KeyValueStore>(
        &mut self,
        store: &AnnotationStore<K>,
        document: &str,
    ) -> Result<bool, OverlayError> {
        let Some(id) = self.overlay.as_ref().map(|overlay| overlay.target.annotation_id.clone()) else {
            return Ok(false);
        };
        self.hide();
        Ok(store.delete(document, &id)?)
    }
}

impl<H: InteractionHost> Drop for OverlayDrag<H> {
    fn drop(&mut self) {
        self.cancel();
    }
}
