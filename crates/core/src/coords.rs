//! Conversions between normalized page space (scale 1, rotation 0) and the
//! viewport a page is currently drawn in.
//!
//! Annotations are stored normalized. Rendering composes a single
//! [`RenderTransform`] per page so that drawables never need their own
//! rotation logic.
//!
//! # Example
//!
//! ```
//! use annotator_core::coords::{render_transform, scale_down, scale_up};
//! use annotator_model::{Point, Rect, Rotation, Viewport};
//!
//! let rect = Rect::new(10.0, 20.0, 30.0, 40.0);
//! assert_eq!(scale_down(scale_up(rect, 2.0), 2.0), rect);
//!
//! let viewport = Viewport::for_page(600.0, 800.0, 1.0, Rotation::Deg90).unwrap();
//! let transform = render_transform(&viewport).unwrap();
//! assert_eq!(transform.apply(Point::new(0.0, 0.0)), Point::new(800.0, 0.0));
//! ```

use annotator_model::{GeometryError, Point, Rect, Rotation, Viewport};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordError {
    #[error("cannot approximate {0} as a positive fraction")]
    InvalidInput(f64),
    #[error("maximum denominator must be at least 1")]
    ZeroDenominator,
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Multiplies every field of `rect` by `scale`.
pub fn scale_up(rect: Rect, scale: f64) -> Rect {
    Rect::new(rect.x * scale, rect.y * scale, rect.width * scale, rect.height * scale)
}

/// Divides every field of `rect` by `scale`.
pub fn scale_down(rect: Rect, scale: f64) -> Rect {
    Rect::new(rect.x / scale, rect.y / scale, rect.width / scale, rect.height / scale)
}

/// Translation that, after rotating about the origin, brings the page back
/// into the positive quadrant. Expressed in normalized units.
pub fn render_translation(viewport: &Viewport) -> Result<Point, GeometryError> {
    let page_width = viewport.width / viewport.scale;
    let page_height = viewport.height / viewport.scale;

    Ok(match viewport.rotation()? {
        Rotation::Deg0 => Point::new(0.0, 0.0),
        Rotation::Deg90 => Point::new(0.0, -page_width),
        Rotation::Deg180 => Point::new(-page_width, -page_height),
        Rotation::Deg270 => Point::new(-page_height, 0.0),
    })
}

/// The root transform for every drawable of a page:
/// `scale(s) rotate(r) translate(tx, ty)`.
pub fn render_transform(viewport: &Viewport) -> Result<RenderTransform, GeometryError> {
    Ok(RenderTransform {
        scale: viewport.scale,
        rotation: viewport.rotation()?,
        translation: render_translation(viewport)?,
    })
}

/// Affine map from normalized page space to viewport space.
///
/// Operations apply right to left, as in an SVG `transform` list: translate,
/// then rotate clockwise about the origin, then scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTransform {
    pub scale: f64,
    pub rotation: Rotation,
    pub translation: Point,
}

impl RenderTransform {
    pub fn identity() -> Self {
        Self { scale: 1.0, rotation: Rotation::Deg0, translation: Point::new(0.0, 0.0) }
    }

    pub fn apply(&self, point: Point) -> Point {
        let shifted = Point::new(point.x + self.translation.x, point.y + self.translation.y);
        let turned = rotate(shifted, self.rotation);
        Point::new(turned.x * self.scale, turned.y * self.scale)
    }

    /// Bounding box of the transformed rectangle. Quarter turns keep rectangles
    /// axis-aligned, so this is exact.
    pub fn apply_rect(&self, rect: Rect) -> Rect {
        let a = self.apply(rect.top_left());
        let b = self.apply(rect.bottom_right());
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Rect::new(x, y, (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    /// Maps a viewport point back into normalized page space.
    pub fn invert(&self, point: Point) -> Point {
        let unscaled = Point::new(point.x / self.scale, point.y / self.scale);
        let unturned = rotate(unscaled, inverse(self.rotation));
        Point::new(unturned.x - self.translation.x, unturned.y - self.translation.y)
    }

    /// Maps a viewport rectangle back into normalized page space.
    pub fn invert_rect(&self, rect: Rect) -> Rect {
        let a = self.invert(rect.top_left());
        let b = self.invert(rect.bottom_right());
        Rect::new(a.x.min(b.x), a.y.min(b.y), (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    /// SVG transform attribute value.
    pub fn to_svg(&self) -> String {
        format!(
            "scale({}) rotate({}) translate({}, {})",
            self.scale,
            self.rotation.degrees(),
            self.translation.x,
            self.translation.y
        )
    }
}

/// Converts a pointer movement measured in viewport pixels into a normalized delta.
pub fn viewport_delta_to_normalized(dx: f64, dy: f64, viewport: &Viewport) -> Result<Point, GeometryError> {
    let rotation = viewport.rotation()?;
    Ok(rotate(Point::new(dx / viewport.scale, dy / viewport.scale), inverse(rotation)))
}

fn rotate(point: Point, rotation: Rotation) -> Point {
    match rotation {
        Rotation::Deg0 => point,
        Rotation::Deg90 => Point::new(-point.y, point.x),
        Rotation::Deg180 => Point::new(-point.x, -point.y),
        Rotation::Deg270 => Point::new(point.y, -point.x),
    }
}

fn inverse(rotation: Rotation) -> Rotation {
    match rotation {
        Rotation::Deg90 => Rotation::Deg270,
        Rotation::Deg270 => Rotation::Deg90,
        other => other,
    }
}

/// Closest fraction `numerator / denominator` to `x` with both terms bounded
/// by `max_denominator`.
///
/// Used to pick canvas buffer sizes for fractional device pixel ratios.
/// Integers and values whose reciprocal is an integer are returned exactly;
/// values below `1 / max_denominator` collapse to `1 / max_denominator`, and
/// values above `max_denominator` round to the nearest integer over 1.
/// Everything else runs a Farey (Stern-Brocot) neighbour search on `x`, or on
/// `1 / x` when `x > 1`, and returns the closer of the two bounding fractions.
pub fn best_rational_approximation(x: f64, max_denominator: u32) -> Result<(u32, u32), CoordError> {
    if max_denominator == 0 {
        return Err(CoordError::ZeroDenominator);
    }
    if !x.is_finite() || x <= 0.0 || x > f64::from(u32::MAX) {
        return Err(CoordError::InvalidInput(x));
    }

    if x.floor() == x {
        return Ok((x as u32, 1));
    }

    let limit = f64::from(max_denominator);
    if x > limit {
        return Ok((x.round() as u32, 1));
    }
    let x_inv = 1.0 / x;
    if x_inv > limit {
        return Ok((1, max_denominator));
    }
    if x_inv.floor() == x_inv {
        return Ok((1, x_inv as u32));
    }

    let inverted = x > 1.0;
    let target = if inverted { x_inv } else { x };

    // Invariant: a/b <= target <= c/d.
    let (mut a, mut b, mut c, mut d) = (0u32, 1u32, 1u32, 1u32);
    loop {
        let p = a + c;
        let q = b + d;
        if q > max_denominator {
            break;
        }
        if target <= f64::from(p) / f64::from(q) {
            c = p;
            d = q;
        } else {
            a = p;
            b = q;
        }
    }

    let (n, m) = if target - f64::from(a) / f64::from(b) < f64::from(c) / f64::from(d) - target {
        (a, b)
    } else {
        (c, d)
    };

    Ok(if inverted { (m, n) } else { (n, m) })
}
