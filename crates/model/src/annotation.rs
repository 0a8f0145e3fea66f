use crate::geometry::{Point, Rect};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Store-assigned identifier of an annotation or comment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationType {
    Area,
    Highlight,
    Strikeout,
    Point,
    Textbox,
    Drawing,
}

impl AnnotationType {
    pub const ALL: [AnnotationType; 6] =
        [Self::Area, Self::Highlight, Self::Strikeout, Self::Point, Self::Textbox, Self::Drawing];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Area => "area",
            Self::Highlight => "highlight",
            Self::Strikeout => "strikeout",
            Self::Point => "point",
            Self::Textbox => "textbox",
            Self::Drawing => "drawing",
        }
    }

    /// Colour used when an annotation carries none.
    pub fn default_color(self) -> &'static str {
        match self {
            Self::Highlight => "#ff0",
            Self::Area | Self::Strikeout => "#f00",
            Self::Point => "#ff0",
            Self::Textbox | Self::Drawing => "#000",
        }
    }

    /// Highlights and strikeouts follow the text they were made from and cannot be dragged.
    pub fn is_text_anchored(self) -> bool {
        matches!(self, Self::Highlight | Self::Strikeout)
    }
}

impl fmt::Display for AnnotationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown annotation type `{0}`")]
pub struct UnknownAnnotationType(pub String);

impl FromStr for AnnotationType {
    type Err = UnknownAnnotationType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownAnnotationType(s.to_owned()))
    }
}

/// Type-specific geometry, always in normalized page space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationKind {
    Area {
        rectangles: Vec<Rect>,
    },
    Highlight {
        rectangles: Vec<Rect>,
    },
    Strikeout {
        rectangles: Vec<Rect>,
    },
    Point {
        x: f64,
        y: f64,
    },
    Textbox {
        x: f64,
        y: f64,
        size: f64,
        #[serde(default)]
        width: f64,
        #[serde(default)]
        height: f64,
    },
    Drawing {
        lines: Vec<[f64; 2]>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<f64>,
    },
}

impl AnnotationKind {
    pub fn annotation_type(&self) -> AnnotationType {
        match self {
            Self::Area { .. } => AnnotationType::Area,
            Self::Highlight { .. } => AnnotationType::Highlight,
            Self::Strikeout { .. } => AnnotationType::Strikeout,
            Self::Point { .. } => AnnotationType::Point,
            Self::Textbox { .. } => AnnotationType::Textbox,
            Self::Drawing { .. } => AnnotationType::Drawing,
        }
    }

    /// The rectangle list of the rect-based kinds.
    pub fn rectangles(&self) -> Option<&[Rect]> {
        match self {
            Self::Area { rectangles }
            | Self::Highlight { rectangles }
            | Self::Strikeout { rectangles } => Some(rectangles),
            _ => None,
        }
    }

    pub fn drawing_points(&self) -> Option<impl Iterator<Item = Point> + '_> {
        match self {
            Self::Drawing { lines, .. } => Some(lines.iter().map(|[x, y]| Point::new(*x, *y))),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// A persisted annotation. `id` and `page` are owned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: RecordId,
    pub page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub notes: Vec<Note>,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: AnnotationKind,
}

impl Annotation {
    pub fn annotation_type(&self) -> AnnotationType {
        self.kind.annotation_type()
    }

    pub fn color_or_default(&self) -> &str {
        self.color.as_deref().unwrap_or_else(|| self.annotation_type().default_color())
    }
}

/// An annotation before the store has given it an id and a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub kind: AnnotationKind,
}

impl AnnotationDraft {
    pub fn new(kind: AnnotationKind) -> Self {
        Self { color: None, text: String::new(), notes: Vec::new(), timestamp: None, kind }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Stamps the draft with its identity. A draft without a timestamp gets `now`.
    pub fn into_annotation(self, id: RecordId, page: u32, now: DateTime<Utc>) -> Annotation {
        Annotation {
            id,
            page,
            color: self.color,
            text: self.text,
            notes: self.notes,
            timestamp: self.timestamp.unwrap_or(now),
            kind: self.kind,
        }
    }
}

impl From<Annotation> for AnnotationDraft {
    fn from(annotation: Annotation) -> Self {
        Self {
            color: annotation.color,
            text: annotation.text,
            notes: annotation.notes,
            timestamp: Some(annotation.timestamp),
            kind: annotation.kind,
        }
    }
}

/// A comment attached to an annotation. The reference is soft: deleting the
/// annotation leaves its comments in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: RecordId,
    pub annotation: RecordId,
    pub content: String,
}

/// One entry of a document's persisted record list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum Record {
    Annotation(Annotation),
    Comment(Comment),
}

impl Record {
    pub fn id(&self) -> &RecordId {
        match self {
            Self::Annotation(annotation) => &annotation.id,
            Self::Comment(comment) => &comment.id,
        }
    }

    pub fn as_annotation(&self) -> Option<&Annotation> {
        match self {
            Self::Annotation(annotation) => Some(annotation),
            Self::Comment(_) => None,
        }
    }

    pub fn as_comment(&self) -> Option<&Comment> {
        match self {
            Self::Comment(comment) => Some(comment),
            Self::Annotation(_) => None,
        }
    }
}

/// Annotations of a single page, as returned by a whole-document listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageGroup {
    pub page: u32,
    pub annotations: Vec<Annotation>,
}
