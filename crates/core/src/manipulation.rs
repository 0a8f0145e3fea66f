//! Moving annotations by dragging them.
//!
//! A drag is tracked in viewport pixels and only converted to a normalized
//! delta when it is committed, so the stored geometry never leaves
//! normalized space.

use crate::coords::viewport_delta_to_normalized;
use annotator_model::{Annotation, AnnotationKind, AnnotationType, GeometryError, Point, Viewport};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MoveError {
    /// Highlights and strikeouts follow their text
    #[error("{0} annotations are anchored to text and cannot be moved")]
    NotMovable(AnnotationType),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Shifts the geometry of `kind` by a normalized delta.
pub fn translate(kind: &mut AnnotationKind, dx: f64, dy: f64) -> Result<(), MoveError> {
    match kind {
        AnnotationKind::Highlight { .. } => return Err(MoveError::NotMovable(AnnotationType::Highlight)),
        AnnotationKind::Strikeout { .. } => return Err(MoveError::NotMovable(AnnotationType::Strikeout)),
        AnnotationKind::Area { rectangles } => {
            for rect in rectangles.iter_mut() {
                *rect = rect.translate(dx, dy);
            }
        }
        AnnotationKind::Point { x, y } | AnnotationKind::Textbox { x, y, .. } => {
            *x += dx;
            *y += dy;
        }
        AnnotationKind::Drawing { lines, .. } => {
            for [x, y] in lines.iter_mut() {
                *x += dx;
                *y += dy;
            }
        }
    }
    Ok(())
}

/// Copy of `annotation` moved by a normalized delta.
pub fn translated(annotation: &Annotation, dx: f64, dy: f64) -> Result<Annotation, MoveError> {
    let mut moved = annotation.clone();
    translate(&mut moved.kind, dx, dy)?;
    Ok(moved)
}

/// Active move of one annotation.
#[derive(Debug, Clone)]
pub struct MoveState {
    /// Annotation as it was when the drag started
    pub original: Annotation,

    /// Drag start position in viewport coordinates
    pub drag_start: Point,

    /// Current drag position in viewport coordinates
    pub current_position: Point,
}

impl MoveState {
    /// Starts a move. Fails straight away for annotations that cannot move.
    pub fn begin(original: Annotation, drag_start: Point) -> Result<Self, MoveError> {
        let kind = original.annotation_type();
        if kind.is_text_anchored() {
            return Err(MoveError::NotMovable(kind));
        }
        Ok(Self { original, drag_start, current_position: drag_start })
    }

    pub fn update_position(&mut self, position: Point) {
        self.current_position = position;
    }

    /// Drag distance so far, in viewport pixels.
    pub fn viewport_delta(&self) -> Point {
        Point::new(self.current_position.x - self.drag_start.x, self.current_position.y - self.drag_start.y)
    }

    /// The moved annotation for the drag distance so far.
    pub fn commit(&self, viewport: &Viewport) -> Result<Annotation, MoveError> {
        let delta = self.viewport_delta();
        let normalized = viewport_delta_to_normalized(delta.x, delta.y, viewport)?;
        translated(&self.original, normalized.x, normalized.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annotator_model::{AnnotationDraft, Rect, RecordId, Rotation};
    use chrono::Utc;

    fn annotation(kind: AnnotationKind) -> Annotation {
        AnnotationDraft::new(kind).into_annotation(RecordId::new("a"), 1, Utc::now())
    }

    #[test]
    fn test_translate_each_movable_kind() {
        let mut area = AnnotationKind::Area { rectangles: vec![Rect::new(1.0, 2.0, 3.0, 4.0)] };
        translate(&mut area, 10.0, -1.0).unwrap();
        assert_eq!(area, AnnotationKind::Area { rectangles: vec![Rect::new(11.0, 1.0, 3.0, 4.0)] });

        let mut textbox = AnnotationKind::Textbox { x: 5.0, y: 5.0, size: 12.0, width: 20.0, height: 20.0 };
        translate(&mut textbox, 1.0, 2.0).unwrap();
        assert_eq!(textbox, AnnotationKind::Textbox { x: 6.0, y: 7.0, size: 12.0, width: 20.0, height: 20.0 });

        let mut drawing = AnnotationKind::Drawing { lines: vec![[0.0, 0.0], [4.0, 4.0]], width: Some(2.0) };
        translate(&mut drawing, 1.0, 1.0).unwrap();
        assert_eq!(drawing, AnnotationKind::Drawing { lines: vec![[1.0, 1.0], [5.0, 5.0]], width: Some(2.0) });
    }

    #[test]
    fn test_text_anchored_kinds_do_not_move() {
        let mut highlight = AnnotationKind::Highlight { rectangles: vec![Rect::new(1.0, 2.0, 3.0, 4.0)] };
        assert_eq!(translate(&mut highlight, 1.0, 1.0), Err(MoveError::NotMovable(AnnotationType::Highlight)));

        let strikeout = annotation(AnnotationKind::Strikeout { rectangles: vec![] });
        assert!(MoveState::begin(strikeout, Point::new(0.0, 0.0)).is_err());
    }

    #[test]
    fn test_move_state_commits_scaled_delta() {
        let viewport = Viewport::for_page(600.0, 800.0, 2.0, Rotation::Deg0).unwrap();
        let mut state = MoveState::begin(annotation(AnnotationKind::Point { x: 10.0, y: 10.0 }), Point::new(100.0, 100.0))
            .unwrap();

        state.update_position(Point::new(140.0, 80.0));
        assert_eq!(state.viewport_delta(), Point::new(40.0, -20.0));

        let moved = state.commit(&viewport).unwrap();
        assert_eq!(moved.kind, AnnotationKind::Point { x: 30.0, y: 0.0 });
        assert_eq!(state.original.kind, AnnotationKind::Point { x: 10.0, y: 10.0 });
    }
}
