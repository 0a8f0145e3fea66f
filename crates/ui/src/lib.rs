//! Annotation overlay for rendered document pages
//!
//! Draws stored annotations as primitive trees over a page, serializes them
//! to SVG, and runs the two pointer state machines of the overlay: text
//! range selection and annotation dragging.

pub mod overlay;
pub mod page;
pub mod renderer;
pub mod scene;
pub mod session;
pub mod svg;
pub mod text_selection;

pub use hit_test::{annotation_bounds, find_annotation_at, ClickTracker};
pub use overlay::{EditOverlay, OverlayDrag, OverlayError};
pub use page::{render_page, CanvasSizing, OutputScale, OverlayMetadata, PageError, PageHost, RenderedPage, StaticHost};
pub use renderer::{render_annotation, AnnotationRenderer, RenderError, RenderStats};
pub use scene::{Primitive, SceneNode, Style};
pub use session::{InteractionHost, InteractionSession, ListenerScope, Overflow, SessionGate};
pub use text_selection::{TextRangeSelector, TextSurface};
