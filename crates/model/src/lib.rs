//! Serializable data model shared by the annotator crates.
//!
//! Every geometric field stored here lives in normalized page space
//! (scale 1, rotation 0). Conversion to and from the on-screen viewport
//! happens in `annotator-core::coords`, never in this crate.

mod annotation;
mod geometry;
mod selection;

pub use annotation::{
    Annotation, AnnotationDraft, AnnotationKind, AnnotationType, Comment, Note, PageGroup, Record,
    RecordId, UnknownAnnotationType,
};
pub use geometry::{GeometryError, Point, Rect, Rotation, Viewport};
pub use selection::SelectionEvent;
