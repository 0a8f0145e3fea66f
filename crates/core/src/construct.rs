//! Builds annotation drafts from what the interaction layer produces.

use crate::coords::{render_transform, RenderTransform};
use crate::overlap::resolve_overlaps;
use annotator_model::{
    AnnotationDraft, AnnotationKind, AnnotationType, GeometryError, Point, Rect, SelectionEvent, Viewport,
};

/// Side of the square a new textbox covers, in viewport pixels.
pub const TEXTBOX_SIZE: f64 = 40.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConstructError {
    #[error("{0} annotations cannot be built from a text selection")]
    NotTextAnchored(AnnotationType),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Turns a settled text selection into a highlight or strikeout draft.
///
/// Client rectangles are made relative to `overlay_origin` (the overlay's
/// top-left in the same client coordinates), normalized, stripped of empty
/// or off-page fragments and finally de-duplicated.
pub fn highlight(
    kind: AnnotationType,
    color: Option<&str>,
    selection: &SelectionEvent,
    overlay_origin: Point,
    viewport: &Viewport,
) -> Result<AnnotationDraft, ConstructError> {
    if !kind.is_text_anchored() {
        return Err(ConstructError::NotTextAnchored(kind));
    }

    let transform = render_transform(viewport)?;
    let normalized: Vec<Rect> = selection
        .rects
        .iter()
        .map(|rect| transform.invert_rect(rect.translate(-overlay_origin.x, -overlay_origin.y)))
        .filter(|rect| rect.width > 0.0 && rect.height > 0.0 && rect.x > -1.0 && rect.y > -1.0)
        .collect();

    let rectangles = resolve_overlaps(&normalized);
    let kind = match kind {
        AnnotationType::Strikeout => AnnotationKind::Strikeout { rectangles },
        _ => AnnotationKind::Highlight { rectangles },
    };
    let color = color.unwrap_or_else(|| kind.annotation_type().default_color());

    Ok(AnnotationDraft::new(kind).with_color(color).with_text(selection.text.clone()))
}

/// A textbox draft anchored at the pointer. Blank text produces nothing.
pub fn textbox(
    text: &str,
    pointer: Point,
    overlay_origin: Point,
    viewport: &Viewport,
    size: f64,
    color: &str,
) -> Result<Option<AnnotationDraft>, GeometryError> {
    if text.trim().is_empty() {
        return Ok(None);
    }

    let transform: RenderTransform = render_transform(viewport)?;
    let anchor = transform.invert(Point::new(pointer.x - overlay_origin.x, pointer.y - overlay_origin.y));
    let extent = TEXTBOX_SIZE / viewport.scale;

    let kind = AnnotationKind::Textbox { x: anchor.x, y: anchor.y, size, width: extent, height: extent };
    Ok(Some(AnnotationDraft::new(kind).with_color(color).with_text(text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use annotator_model::Rotation;

    fn selection(rects: Vec<Rect>) -> SelectionEvent {
        SelectionEvent {
            text: "quick brown fox".to_owned(),
            viewport_rect: Rect::new(0.0, 0.0, 0.0, 0.0),
            host_rect: Rect::new(0.0, 0.0, 0.0, 0.0),
            rects,
        }
    }

    #[test]
    fn test_highlight_normalizes_relative_to_overlay() {
        let viewport = Viewport::for_page(600.0, 800.0, 2.0, Rotation::Deg0).unwrap();
        let event = selection(vec![Rect::new(120.0, 250.0, 200.0, 24.0)]);

        let draft =
            highlight(AnnotationType::Highlight, None, &event, Point::new(100.0, 50.0), &viewport).unwrap();

        assert_eq!(draft.kind, AnnotationKind::Highlight { rectangles: vec![Rect::new(10.0, 100.0, 100.0, 12.0)] });
        assert_eq!(draft.color.as_deref(), Some("#ff0"));
        assert_eq!(draft.text, "quick brown fox");
    }

    #[test]
    fn test_highlight_drops_empty_offpage_and_duplicate_fragments() {
        let viewport = Viewport::for_page(600.0, 800.0, 1.0, Rotation::Deg0).unwrap();
        let event = selection(vec![
            Rect::new(10.0, 10.0, 0.0, 12.0),
            Rect::new(-30.0, 10.0, 20.0, 12.0),
            Rect::new(10.0, 30.0, 80.0, 12.0),
            Rect::new(10.0, 30.0, 20.0, 12.0),
            Rect::new(10.0, 50.0, 60.0, 12.0),
        ]);

        let draft =
            highlight(AnnotationType::Strikeout, Some("#123"), &event, Point::new(0.0, 0.0), &viewport).unwrap();

        assert_eq!(
            draft.kind,
            AnnotationKind::Strikeout {
                rectangles: vec![Rect::new(10.0, 30.0, 80.0, 12.0), Rect::new(10.0, 50.0, 60.0, 12.0)]
            }
        );
        assert_eq!(draft.color.as_deref(), Some("#123"));
    }

    #[test]
    fn test_highlight_undoes_rotation() {
        let viewport = Viewport::for_page(600.0, 800.0, 1.0, Rotation::Deg90).unwrap();
        let transform = render_transform(&viewport).unwrap();
        let stored = Rect::new(50.0, 100.0, 200.0, 14.0);
        let on_screen = transform.apply_rect(stored);

        let draft = highlight(
            AnnotationType::Highlight,
            None,
            &selection(vec![on_screen]),
            Point::new(0.0, 0.0),
            &viewport,
        )
        .unwrap();

        let rectangles = draft.kind.rectangles().unwrap();
        assert!((rectangles[0].x - stored.x).abs() < 1e-9);
        assert!((rectangles[0].y - stored.y).abs() < 1e-9);
        assert!((rectangles[0].width - stored.width).abs() < 1e-9);
    }

    #[test]
    fn test_highlight_rejects_free_form_kinds() {
        let viewport = Viewport::for_page(600.0, 800.0, 1.0, Rotation::Deg0).unwrap();
        let result = highlight(AnnotationType::Area, None, &selection(vec![]), Point::new(0.0, 0.0), &viewport);
        assert_eq!(result, Err(ConstructError::NotTextAnchored(AnnotationType::Area)));
    }

    #[test]
    fn test_textbox_at_pointer() {
        let viewport = Viewport::for_page(600.0, 800.0, 2.0, Rotation::Deg0).unwrap();

        let draft = textbox("note", Point::new(140.0, 90.0), Point::new(100.0, 50.0), &viewport, 10.0, "red")
            .unwrap()
            .unwrap();

        assert_eq!(
            draft.kind,
            AnnotationKind::Textbox { x: 20.0, y: 20.0, size: 10.0, width: 20.0, height: 20.0 }
        );
        assert_eq!(draft.color.as_deref(), Some("red"));
        assert_eq!(draft.text, "note");
    }

    #[test]
    fn test_blank_textbox_is_skipped() {
        let viewport = Viewport::for_page(600.0, 800.0, 1.0, Rotation::Deg0).unwrap();
        assert_eq!(textbox("   ", Point::new(0.0, 0.0), Point::new(0.0, 0.0), &viewport, 10.0, "red"), Ok(None));
    }
}
