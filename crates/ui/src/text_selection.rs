//! Text range selection driven by two draggable markers
//!
//! The selector turns raw pointer input over the text layer into a settled
//! [`SelectionEvent`]. It works against a [`TextSurface`], which supplies
//! caret lookup and owns the platform selection:
//! - Pointer-down on empty text captures a caret as the drag anchor
//! - Pointer-down near a marker drags that endpoint of the current range
//! - Dragging backwards past the fixed endpoint swaps the endpoint roles
//! - Pointer-up emits the selection, unless it lies outside the host
//!
//! Marker positions are kept in document coordinates (client coordinates
//! plus scroll offset) so that scrolling only needs to re-read the live
//! range.

use crate::session::{InteractionHost, InteractionSession, ListenerScope, Overflow, SessionEffects, SessionGate};
use annotator_model::{Point, Rect, SelectionEvent};
use std::cmp::Ordering;

/// Opaque handle to a text node of the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextNodeId(pub u64);

/// Caret position inside a text node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextAnchor {
    pub container: TextNodeId,
    pub offset: usize,
}

/// A live range as reported by the surface, in client coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRange {
    pub start: TextAnchor,
    pub end: TextAnchor,
    /// Selected text; empty when the range is collapsed or backwards
    pub text: String,
    /// One rectangle per line fragment
    pub client_rects: Vec<Rect>,
    pub bounding_rect: Rect,
}

/// Text layer capabilities consumed by the selector.
pub trait TextSurface: InteractionHost {
    /// Caret inside a text node under `point`, if any.
    fn caret_at_point(&self, point: Point) -> Option<TextAnchor>;

    /// Replaces the platform selection with `start..end` and reports it.
    fn select(&mut self, start: &TextAnchor, end: &TextAnchor) -> TextRange;

    /// The current selection, `None` when it is collapsed or absent.
    fn current_range(&self) -> Option<TextRange>;

    fn clear_selection(&mut self);

    /// Bounds of the interactive host in client coordinates.
    fn host_rect(&self) -> Rect;

    /// Whether the range's closest element ancestor lies inside the host.
    fn host_contains(&self, range: &TextRange) -> bool;

    fn scroll_offset(&self) -> Point;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectorConfig {
    pub marker_width: f64,
    pub marker_height: f64,
    /// Extra hit area left and right of a marker
    pub hit_padding_x: f64,
    /// Extra hit area above and below a marker
    pub hit_padding_y: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self { marker_width: 10.0, marker_height: 20.0, hit_padding_x: 20.0, hit_padding_y: 50.0 }
    }
}

/// Which endpoint a drag moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragRole {
    Start,
    End,
    /// Fresh selection from the captured anchor
    New,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectorState {
    #[default]
    Idle,
    AnchorCaptured,
    Dragging(DragRole),
    RangeSettled,
}

/// Whether the platform's default handling of a pointer event should run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Continue,
    PreventDefault,
}

/// Marker positions in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerPlacement {
    /// Top-left corner of the first line fragment
    pub start: Point,
    /// Bottom-right corner of the last line fragment
    pub end: Point,
}

pub struct TextRangeSelector<S: TextSurface> {
    surface: S,
    gate: SessionGate,
    config: SelectorConfig,
    state: SelectorState,
    session: Option<InteractionSession>,
    anchor: Option<TextAnchor>,
    start: Option<TextAnchor>,
    end: Option<TextAnchor>,
    markers: Option<MarkerPlacement>,
}

impl<S: TextSurface> TextRangeSelector<S> {
    pub fn new(surface: S, gate: SessionGate) -> Self {
        Self::with_config(surface, gate, SelectorConfig::default())
    }

    pub fn with_config(surface: S, gate: SessionGate, config: SelectorConfig) -> Self {
        Self {
            surface,
            gate,
            config,
            state: SelectorState::Idle,
            session: None,
            anchor: None,
            start: None,
            end: None,
            markers: None,
        }
    }

    pub fn state(&self) -> SelectorState {
        self.state
    }

    /// `None` while the markers are hidden.
    pub fn markers(&self) -> Option<MarkerPlacement> {
        self.markers
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn pointer_down(&mut self, point: Point) -> Propagation {
        if self.session.is_some() {
            return Propagation::Continue;
        }

        if let Some(role) = self.marker_under(point) {
            if !self.begin_session() {
                return Propagation::Continue;
            }
            tracing::trace!(?role, "marker drag started");
            self.state = SelectorState::Dragging(role);
            return Propagation::PreventDefault;
        }

        self.markers = None;
        self.surface.clear_selection();
        self.start = None;
        self.end = None;
        self.anchor = None;
        self.state = SelectorState::Idle;

        let Some(anchor) = self.surface.caret_at_point(point) else {
            return Propagation::Continue;
        };
        if !self.begin_session() {
            return Propagation::Continue;
        }

        self.anchor = Some(anchor);
        self.state = SelectorState::AnchorCaptured;
        Propagation::PreventDefault
    }

    pub fn pointer_move(&mut self, point: Point) -> Propagation {
        let role = match self.state {
            SelectorState::AnchorCaptured => DragRole::New,
            SelectorState::Dragging(role) => role,
            _ => return Propagation::Continue,
        };
        self.state = SelectorState::Dragging(role);

        let Some(moving) = self.surface.caret_at_point(point) else {
            return Propagation::PreventDefault;
        };
        let (start, end) = match role {
            DragRole::Start => (Some(moving), self.end),
            DragRole::End => (self.start, Some(moving)),
            DragRole::New => (self.anchor, Some(moving)),
        };
        let (Some(start), Some(end)) = (start, end) else {
            return Propagation::PreventDefault;
        };

        let mut range = self.surface.select(&start, &end);
        if range.text.is_empty() {
            range = self.surface.select(&end, &start);
            self.start = Some(end);
            self.end = Some(start);
            let flipped = match role {
                DragRole::Start => DragRole::End,
                DragRole::End => DragRole::Start,
                DragRole::New => DragRole::New,
            };
            self.state = SelectorState::Dragging(flipped);
        } else {
            self.start = Some(start);
            self.end = Some(end);
        }

        if self.surface.host_contains(&range) {
            self.markers = self.placement(&range.client_rects);
        }
        Propagation::PreventDefault
    }

    /// Ends a drag. Returns the settled selection when there is one inside the host.
    pub fn pointer_up(&mut self, point: Point) -> Option<SelectionEvent> {
        if let SelectorState::Dragging(_) = self.state {
            self.pointer_move(point);
        }
        if !matches!(self.state, SelectorState::AnchorCaptured | SelectorState::Dragging(_)) {
            return None;
        }
        self.end_session();

        let Some(range) = self.surface.current_range() else {
            self.markers = None;
            self.surface.set_overflow(Overflow::Auto);
            self.state = SelectorState::Idle;
            return None;
        };

        self.state = SelectorState::RangeSettled;
        if !self.surface.host_contains(&range) {
            tracing::debug!("selection outside the interactive host ignored");
            return None;
        }

        let host = self.surface.host_rect();
        let viewport_rect = range.bounding_rect;
        Some(SelectionEvent {
            text: range.text,
            viewport_rect,
            host_rect: viewport_rect.translate(-host.x, -host.y),
            rects: range.client_rects,
        })
    }

    /// Re-reads marker positions from the live selection.
    pub fn scroll(&mut self) {
        self.markers = match self.surface.current_range() {
            Some(range) => self.placement(&range.client_rects),
            None => None,
        };
    }

    /// Tears down any drag and forgets the selection.
    pub fn cancel(&mut self) {
        self.end_session();
        self.surface.clear_selection();
        self.surface.set_overflow(Overflow::Auto);
        self.markers = None;
        self.anchor = None;
        self.start = None;
        self.end = None;
        self.state = SelectorState::Idle;
    }

    fn begin_session(&mut self) -> bool {
        let effects = SessionEffects { text_selectable: None, overflow: Some(Overflow::Hidden) };
        self.session = InteractionSession::begin(&mut self.surface, &self.gate, ListenerScope::MarkerDrag, effects);
        self.session.is_some()
    }

    fn end_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.end(&mut self.surface);
        }
    }

    fn marker_under(&self, point: Point) -> Option<DragRole> {
        let markers = self.markers?;
        // End first: when the markers overlap, the end marker is on top.
        if self.hit(markers.end, point) {
            Some(DragRole::End)
        } else if self.hit(markers.start, point) {
            Some(DragRole::Start)
        } else {
            None
        }
    }

    fn hit(&self, marker: Point, point: Point) -> bool {
        let scroll = self.surface.scroll_offset();
        let area = Rect::new(
            marker.x - scroll.x - self.config.hit_padding_x,
            marker.y - scroll.y - self.config.hit_padding_y,
            self.config.marker_width + self.config.hit_padding_x * 2.0,
            self.config.marker_height + self.config.hit_padding_y * 2.0,
        );
        point.x > area.x && point.y > area.y && point.x < area.right() && point.y < area.bottom()
    }

    fn placement(&self, rects: &[Rect]) -> Option<MarkerPlacement> {
        let first = rects.iter().copied().reduce(|a, b| if line_order(&b, &a) == Ordering::Less { b } else { a })?;
        let last = rects.iter().copied().reduce(|a, b| if line_order(&b, &a) == Ordering::Less { a } else { b })?;
        let scroll = self.surface.scroll_offset();
        Some(MarkerPlacement {
            start: Point::new(first.x + scroll.x, first.y + scroll.y),
            end: Point::new(last.right() + scroll.x, last.bottom() + scroll.y),
        })
    }
}

impl<S: TextSurface> Drop for TextRangeSelector<S> {
    fn drop(&mut self) {
        self.end_session();
    }
}

/// Reading order of line fragments: rows top to bottom, then left to right.
fn line_order(a: &Rect, b: &Rect) -> Ordering {
    if a.bottom() <= b.y {
        Ordering::Less
    } else if a.y >= b.bottom() {
        Ordering::Greater
    } else if a.x >= b.x {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}
