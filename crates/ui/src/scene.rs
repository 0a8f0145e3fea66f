//! Drawable primitive tree
//!
//! The annotation renderer produces one [`SceneNode`] tree per annotation.
//! A node carries an optional root transform, presentation attributes that
//! its descendants inherit, one primitive and its children.

use annotator_core::coords::RenderTransform;
use annotator_model::{AnnotationType, Point, Rect, RecordId};

/// Presentation attributes of a node
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Style {
    /// Fill paint; `Some("none")` disables filling
    pub fill: Option<String>,
    /// Fill opacity in 0.0..=1.0
    pub fill_opacity: Option<f64>,
    /// Stroke paint
    pub stroke: Option<String>,
    /// Stroke width in the node's user units
    pub stroke_width: Option<f64>,
    /// Font size for text primitives
    pub font_size: Option<f64>,
}

impl Style {
    pub fn fill(mut self, paint: impl Into<String>) -> Self {
        self.fill = Some(paint.into());
        self
    }

    pub fn fill_opacity(mut self, opacity: f64) -> Self {
        self.fill_opacity = Some(opacity);
        self
    }

    pub fn stroke(mut self, paint: impl Into<String>) -> Self {
        self.stroke = Some(paint.into());
        self
    }

    pub fn stroke_width(mut self, width: f64) -> Self {
        self.stroke_width = Some(width);
        self
    }

    pub fn font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }
}

/// Visual primitive types that can be drawn
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Container without geometry of its own
    Group,
    /// Axis-aligned rectangle
    Rect(Rect),
    /// Line segment
    Line { start: Point, end: Point },
    /// Text whose baseline starts at `origin`
    Text { origin: Point, content: String },
    /// Path through `points` in order
    Path { points: Vec<Point>, closed: bool },
    /// Raw path data in the coordinate system of the enclosing surface
    Glyph { data: &'static str },
    /// Nested drawing surface placed at `frame`. Its children use the
    /// surface's own coordinate system, mapped from `view_box` when set.
    Surface { frame: Rect, view_box: Option<Rect> },
}

/// Node of the primitive tree
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// Annotation this tree was drawn for, set on the root only
    pub annotation: Option<(RecordId, AnnotationType)>,
    /// Root transform; `None` means inherit
    pub transform: Option<RenderTransform>,
    /// Presentation attributes
    pub style: Style,
    /// The node's own primitive
    pub primitive: Primitive,
    /// Child nodes, drawn in order
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(primitive: Primitive) -> Self {
        Self {
            annotation: None,
            transform: None,
            style: Style::default(),
            primitive,
            children: Vec::new(),
        }
    }

    pub fn group(children: Vec<SceneNode>) -> Self {
        Self { children, ..Self::new(Primitive::Group) }
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn with_transform(mut self, transform: RenderTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn with_children(mut self, children: Vec<SceneNode>) -> Self {
        self.children = children;
        self
    }

    pub fn for_annotation(mut self, id: RecordId, kind: AnnotationType) -> Self {
        self.annotation = Some((id, kind));
        self
    }

    /// Number of nodes in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SceneNode::node_count).sum::<usize>()
    }

    /// Depth-first, parent before children.
    pub fn descendants(&self) -> Vec<&SceneNode> {
        let mut nodes = vec![self];
        for child in &self.children {
            nodes.extend(child.descendants());
        }
        nodes
    }
}
