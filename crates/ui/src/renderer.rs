//! Maps annotations to drawable primitive trees.
//!
//! Every tree gets the page's [`RenderTransform`] as its root transform, so
//! geometry is emitted in normalized units. Point markers are the exception:
//! they are nested drawing surfaces, which do not inherit transforms, so
//! their frames are placed in viewport units here.

use crate::scene::{Primitive, SceneNode, Style};
use annotator_core::coords::{render_transform, render_translation, RenderTransform};
use annotator_model::{Annotation, AnnotationKind, GeometryError, Point, Rect, Rotation, Viewport};

/// Height given to zero-height strikeout lines when hit testing
pub const LINE_OFFSET: f64 = 16.0;

/// Side of a point marker at scale 1
pub const POINT_SIZE: f64 = 25.0;

/// Fill opacity of highlights
pub const HIGHLIGHT_OPACITY: f64 = 0.4;

/// Coordinate range of the point marker glyph
const GLYPH_VIEW_BOX: f64 = 1000.0;

/// Speech-bubble outline drawn inside point markers
const GLYPH_PATH: &str = "M120 160 H880 V640 H470 L260 850 V640 H120 Z M260 330 H740 M260 470 H620";

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error("failed to write SVG: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("SVG output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Render statistics for debugging and profiling
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenderStats {
    /// Number of annotations rendered
    pub annotation_count: usize,
    /// Number of nodes across all produced trees
    pub node_count: usize,
}

impl RenderStats {
    /// Reset all counters to zero
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Default)]
pub struct AnnotationRenderer {
    stats: RenderStats,
}

impl AnnotationRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Renders `annotations` in order; later trees draw on top. Stats count
    /// this pass only.
    pub fn render_all(&mut self, annotations: &[Annotation], viewport: &Viewport) -> Result<Vec<SceneNode>, RenderError> {
        self.stats.reset();
        annotations.iter().map(|annotation| self.render(annotation, viewport)).collect()
    }

    pub fn render(&mut self, annotation: &Annotation, viewport: &Viewport) -> Result<SceneNode, RenderError> {
        let node = render_annotation(annotation, viewport)?;
        self.stats.annotation_count += 1;
        self.stats.node_count += node.node_count();
        Ok(node)
    }
}

/// The primitive tree of one annotation under `viewport`.
pub fn render_annotation(annotation: &Annotation, viewport: &Viewport) -> Result<SceneNode, GeometryError> {
    let transform = render_transform(viewport)?;
    let color = annotation.color_or_default();

    let node = match &annotation.kind {
        AnnotationKind::Highlight { rectangles } => SceneNode::group(rects(rectangles))
            .with_style(Style::default().fill(color).fill_opacity(HIGHLIGHT_OPACITY))
            .with_transform(transform),
        AnnotationKind::Area { rectangles } => SceneNode::group(rects(rectangles))
            .with_style(Style::default().fill("none").stroke(color).stroke_width(1.0))
            .with_transform(transform),
        AnnotationKind::Strikeout { rectangles } => {
            let lines = rectangles
                .iter()
                .map(|rect| {
                    let mid = rect.y + rect.height / 2.0;
                    SceneNode::new(Primitive::Line {
                        start: Point::new(rect.x, mid),
                        end: Point::new(rect.right(), mid),
                    })
                })
                .collect();
            SceneNode::group(lines)
                .with_style(Style::default().stroke(color).stroke_width(1.0))
                .with_transform(transform)
        }
        AnnotationKind::Textbox { x, y, size, .. } => {
            SceneNode::new(Primitive::Text { origin: Point::new(*x, y + size), content: annotation.text.clone() })
                .with_style(Style::default().fill(color).font_size(*size))
                .with_transform(transform)
        }
        AnnotationKind::Drawing { lines, width } => {
            let points = lines.iter().map(|[x, y]| Point::new(*x, *y)).collect();
            SceneNode::new(Primitive::Path { points, closed: true })
                .with_style(Style::default().fill("none").stroke(color).stroke_width(width.unwrap_or(1.0)))
                .with_transform(transform)
        }
        AnnotationKind::Point { x, y } => point_marker(*x, *y, color, viewport)?,
    };

    Ok(node.for_annotation(annotation.id.clone(), annotation.annotation_type()))
}

fn rects(rectangles: &[Rect]) -> Vec<SceneNode> {
    rectangles.iter().map(|rect| SceneNode::new(Primitive::Rect(*rect))).collect()
}

/// Viewport frame of the point marker anchored at normalized `(x, y)`.
///
/// Mirrors what [`render_transform`] does to the marker's square, for a
/// surface that cannot take the transform itself.
pub fn point_frame(x: f64, y: f64, viewport: &Viewport) -> Result<Rect, GeometryError> {
    let scale = viewport.scale;
    let (x, y) = (x * scale, y * scale);
    let (width, height) = (POINT_SIZE * scale, POINT_SIZE * scale);

    Ok(match viewport.rotation()? {
        Rotation::Deg0 => Rect::new(x, y, width, height),
        Rotation::Deg90 => Rect::new(viewport.width - y - height, x, height, width),
        Rotation::Deg180 => Rect::new(viewport.width - x - width, viewport.height - y - height, width, height),
        Rotation::Deg270 => Rect::new(y, viewport.height - x - width, height, width),
    })
}

/// Small offset applied to the glyph surface so the icon sits centred after rotation.
fn glyph_nudge(rotation: Rotation) -> Point {
    match rotation {
        Rotation::Deg0 => Point::new(0.0, -POINT_SIZE * 0.05),
        Rotation::Deg90 => Point::new(1.0, 0.0),
        Rotation::Deg180 => Point::new(0.0, 2.0),
        Rotation::Deg270 => Point::new(-1.0, 0.0),
    }
}

fn point_marker(x: f64, y: f64, color: &str, viewport: &Viewport) -> Result<SceneNode, GeometryError> {
    let frame = point_frame(x, y, viewport)?;
    let rotation = viewport.rotation()?;
    let local = Rect::new(0.0, 0.0, frame.width, frame.height);
    let nudge = glyph_nudge(rotation);

    // The glyph turns inside its own view box at unit scale.
    let glyph_space = Viewport::new(1.0, rotation, GLYPH_VIEW_BOX, GLYPH_VIEW_BOX);
    let glyph_transform =
        RenderTransform { scale: 1.0, rotation, translation: render_translation(&glyph_space)? };

    let background = SceneNode::new(Primitive::Rect(local)).with_style(Style::default().fill(color).stroke("#000"));
    let glyph = SceneNode::new(Primitive::Glyph { data: GLYPH_PATH })
        .with_style(Style::default().fill("#fff").stroke("#000").stroke_width(50.0))
        .with_transform(glyph_transform);
    let glyph_surface = SceneNode::new(Primitive::Surface {
        frame: local.translate(nudge.x, nudge.y),
        view_box: Some(Rect::new(0.0, 0.0, GLYPH_VIEW_BOX, GLYPH_VIEW_BOX)),
    })
    .with_children(vec![glyph]);

    Ok(SceneNode::new(Primitive::Surface { frame, view_box: None }).with_children(vec![background, glyph_surface]))
}
