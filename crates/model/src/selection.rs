use crate::geometry::Rect;
use serde::{Deserialize, Serialize};

/// A settled text selection, emitted when the user releases the pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionEvent {
    pub text: String,
    /// Bounding box of the selection in viewport coordinates.
    pub viewport_rect: Rect,
    /// `viewport_rect` relative to the interactive host's own bounds.
    pub host_rect: Rect,
    /// One client rectangle per selected line fragment, viewport coordinates.
    pub rects: Vec<Rect>,
}
