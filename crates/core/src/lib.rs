//! Annotation logic independent of any rendering surface.
//!
//! This crate provides:
//! - Coordinate conversion between normalized page space and viewport space
//! - Resolution of overlapping selection fragments
//! - The annotation store over a pluggable key-value backend
//! - The in-process annotation event bus
//! - Draft construction, annotation moves and per-document view settings

pub mod config;
pub mod construct;
pub mod coords;
pub mod events;
pub mod manipulation;
pub mod overlap;
pub mod persistence;
pub mod store;
pub mod view_settings;

pub use config::{AnnotatorConfig, ConfigError, ViewDefaults};
pub use coords::{
    best_rational_approximation, render_transform, render_translation, scale_down, scale_up,
    viewport_delta_to_normalized, CoordError, RenderTransform,
};
pub use events::{AnnotationEvent, EventBus, NodeTarget, Subscription};
pub use manipulation::MoveError;
pub use overlap::resolve_overlaps;
pub use persistence::{KeyValueStore, MemoryStore, PersistenceError};
pub use store::{AnnotationStore, StoreError, StoreResult};
pub use view_settings::{SettingsError, ViewSettings};
