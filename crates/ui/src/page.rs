//! Per-page rendering: canvas sizing, overlay metadata and annotation trees.

use crate::renderer::{AnnotationRenderer, RenderError};
use crate::scene::SceneNode;
use crate::svg;
use annotator_core::coords::{best_rational_approximation, CoordError};
use annotator_model::{Annotation, Viewport};

pub const DOCUMENT_ATTRIBUTE: &str = "data-pdf-annotate-document";
pub const PAGE_ATTRIBUTE: &str = "data-pdf-annotate-page";
pub const VIEWPORT_ATTRIBUTE: &str = "data-pdf-annotate-viewport";

/// Largest denominator used when snapping the pixel ratio to a fraction
const MAX_RATIO_DENOMINATOR: u32 = 8;

/// Surface that displays rendered pages.
pub trait PageHost {
    fn device_pixel_ratio(&self) -> f64;
}

/// Host with a fixed pixel ratio, for headless rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticHost {
    pub device_pixel_ratio: f64,
}

impl Default for StaticHost {
    fn default() -> Self {
        Self { device_pixel_ratio: 1.0 }
    }
}

impl PageHost for StaticHost {
    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputScale {
    pub sx: f64,
    pub sy: f64,
}

impl OutputScale {
    pub fn of(host: &impl PageHost) -> Self {
        let ratio = host.device_pixel_ratio();
        Self { sx: ratio, sy: ratio }
    }

    pub fn is_scaled(&self) -> bool {
        self.sx != 1.0 || self.sy != 1.0
    }
}

/// `x` rounded up to the next multiple of `div`, unless already divisible.
pub fn round_to_divide(x: f64, div: u32) -> u32 {
    let div = f64::from(div.max(1));
    let remainder = x % div;
    if remainder == 0.0 {
        x as u32
    } else {
        (x - remainder + div).round() as u32
    }
}

/// Backing store and CSS dimensions of a page canvas.
///
/// Both sizes are chosen so that their ratio is exactly the rational
/// approximation of the pixel ratio, which keeps glyph edges crisp on
/// fractional-ratio displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSizing {
    pub backing_width: u32,
    pub backing_height: u32,
    pub css_width: u32,
    pub css_height: u32,
}

impl CanvasSizing {
    pub fn compute(viewport: &Viewport, output: OutputScale) -> Result<Self, CoordError> {
        let (x_num, x_den) = best_rational_approximation(output.sx, MAX_RATIO_DENOMINATOR)?;
        let (y_num, y_den) = best_rational_approximation(output.sy, MAX_RATIO_DENOMINATOR)?;

        Ok(Self {
            backing_width: round_to_divide(viewport.width * output.sx, x_num),
            backing_height: round_to_divide(viewport.height * output.sy, y_num),
            css_width: round_to_divide(viewport.width, x_den),
            css_height: round_to_divide(viewport.height, y_den),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("overlay is missing attribute {0}")]
    Missing(&'static str),
    #[error("invalid page number: {0}")]
    InvalidPage(String),
    #[error("invalid viewport: {0}")]
    InvalidViewport(#[from] serde_json::Error),
}

/// Page context attached to an overlay surface.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayMetadata {
    pub document_id: String,
    pub page_number: u32,
    pub viewport: Viewport,
}

impl OverlayMetadata {
    pub fn to_attributes(&self) -> Result<Vec<(String, String)>, MetadataError> {
        Ok(vec![
            (DOCUMENT_ATTRIBUTE.to_owned(), self.document_id.clone()),
            (PAGE_ATTRIBUTE.to_owned(), self.page_number.to_string()),
            (VIEWPORT_ATTRIBUTE.to_owned(), serde_json::to_string(&self.viewport)?),
        ])
    }

    pub fn from_attributes(attributes: &[(String, String)]) -> Result<Self, MetadataError> {
        let find = |name: &'static str| {
            attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
                .ok_or(MetadataError::Missing(name))
        };

        let page = find(PAGE_ATTRIBUTE)?;
        Ok(Self {
            document_id: find(DOCUMENT_ATTRIBUTE)?.to_owned(),
            page_number: page.parse().map_err(|_| MetadataError::InvalidPage(page.to_owned()))?,
            viewport: serde_json::from_str(find(VIEWPORT_ATTRIBUTE)?)?,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error(transparent)]
    Coord(#[from] CoordError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

/// Everything drawn for one page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub canvas: CanvasSizing,
    pub overlay: OverlayMetadata,
    pub nodes: Vec<SceneNode>,
}

impl RenderedPage {
    /// The overlay surface as a standalone SVG document.
    pub fn to_svg(&self) -> Result<String, PageError> {
        let mut attributes = vec![("class".to_owned(), "annotationLayer".to_owned())];
        attributes.extend(self.overlay.to_attributes()?);
        let viewport = &self.overlay.viewport;
        Ok(svg::to_svg(viewport.width, viewport.height, &attributes, &self.nodes)?)
    }
}

/// Renders the annotations of one page. Annotations on other pages are skipped.
pub fn render_page(
    document_id: &str,
    page_number: u32,
    annotations: &[Annotation],
    viewport: &Viewport,
    host: &impl PageHost,
    renderer: &mut AnnotationRenderer,
) -> Result<RenderedPage, PageError> {
    let canvas = CanvasSizing::compute(viewport, OutputScale::of(host))?;
    let on_page: Vec<Annotation> = annotations.iter().filter(|a| a.page == page_number).cloned().collect();
    let nodes = renderer.render_all(&on_page, viewport)?;

    tracing::debug!(
        document = document_id,
        page = page_number,
        annotations = nodes.len(),
        backing_width = canvas.backing_width,
        css_width = canvas.css_width,
        "rendered page"
    );

    Ok(RenderedPage {
        canvas,
        overlay: OverlayMetadata { document_id: document_id.to_owned(), page_number, viewport: *viewport },
        nodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use annotator_model::{AnnotationDraft, AnnotationKind, RecordId, Rect, Rotation};
    use chrono::Utc;

    fn viewport(width: f64, height: f64) -> Viewport {
        Viewport::new(1.0, Rotation::Deg0, width, height)
    }

    #[test]
    fn test_round_to_divide() {
        assert_eq!(round_to_divide(612.0, 2), 612);
        assert_eq!(round_to_divide(613.0, 2), 614);
        assert_eq!(round_to_divide(919.5, 3), 921);
        assert_eq!(round_to_divide(10.0, 1), 10);
    }

    #[test]
    fn test_canvas_sizing_at_unit_ratio() {
        let sizing = CanvasSizing::compute(&viewport(612.0, 792.0), OutputScale::of(&StaticHost::default())).unwrap();
        assert_eq!(
            sizing,
            CanvasSizing { backing_width: 612, backing_height: 792, css_width: 612, css_height: 792 }
        );
    }

    #[test]
    fn test_canvas_sizing_at_fractional_ratio() {
        let host = StaticHost { device_pixel_ratio: 1.5 };
        let sizing = CanvasSizing::compute(&viewport(613.0, 792.0), OutputScale::of(&host)).unwrap();

        assert_eq!(sizing.backing_width, 921);
        assert_eq!(sizing.css_width, 614);
        assert_eq!(sizing.backing_height, 1188);
        assert_eq!(sizing.css_height, 792);
        assert_eq!(sizing.backing_width * 2, sizing.css_width * 3);
    }

    #[test]
    fn test_canvas_sizing_rejects_bad_ratio() {
        let host = StaticHost { device_pixel_ratio: 0.0 };
        assert!(CanvasSizing::compute(&viewport(100.0, 100.0), OutputScale::of(&host)).is_err());
    }

    #[test]
    fn test_overlay_metadata_attributes_round_trip() {
        let metadata = OverlayMetadata {
            document_id: "report.pdf".to_owned(),
            page_number: 4,
            viewport: Viewport::new(1.5, Rotation::Deg90, 1200.0, 900.0),
        };

        let attributes = metadata.to_attributes().unwrap();
        assert_eq!(attributes[1], (PAGE_ATTRIBUTE.to_owned(), "4".to_owned()));
        assert_eq!(OverlayMetadata::from_attributes(&attributes).unwrap(), metadata);
    }

    #[test]
    fn test_overlay_metadata_missing_attribute() {
        let attributes = vec![(PAGE_ATTRIBUTE.to_owned(), "1".to_owned())];
        assert!(matches!(
            OverlayMetadata::from_attributes(&attributes),
            Err(MetadataError::Missing(DOCUMENT_ATTRIBUTE))
        ));

        let attributes = vec![
            (DOCUMENT_ATTRIBUTE.to_owned(), "doc".to_owned()),
            (PAGE_ATTRIBUTE.to_owned(), "first".to_owned()),
        ];
        assert!(matches!(OverlayMetadata::from_attributes(&attributes), Err(MetadataError::InvalidPage(_))));
    }

    #[test]
    fn test_render_page_filters_and_serializes() {
        let make = |id: &str, page: u32| {
            AnnotationDraft::new(AnnotationKind::Area { rectangles: vec![Rect::new(1.0, 1.0, 5.0, 5.0)] })
                .into_annotation(RecordId::new(id), page, Utc::now())
        };
        let annotations = vec![make("on-page", 2), make("elsewhere", 3)];
        let mut renderer = AnnotationRenderer::new();

        let page = render_page("doc", 2, &annotations, &viewport(600.0, 800.0), &StaticHost::default(), &mut renderer)
            .unwrap();

        assert_eq!(page.nodes.len(), 1);
        assert_eq!(renderer.stats().annotation_count, 1);

        let svg = page.to_svg().unwrap();
        assert!(svg.starts_with("<svg "));
        assert!(svg.contains(r#"class="annotationLayer""#));
        assert!(svg.contains(r#"data-pdf-annotate-page="2""#));
        assert!(svg.contains(r#"data-pdf-annotate-id="on-page""#));
        assert!(!svg.contains("elsewhere"));
    }
}
