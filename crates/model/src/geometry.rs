use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("unsupported rotation {0}, expected one of 0, 90, 180 or 270")]
    InvalidRotation(i32),
    #[error("viewport scale must be positive, got {0}")]
    NonPositiveScale(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.right(), self.bottom())
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy, ..*self }
    }

    /// Grows the rectangle by `dx` on the left and right and by `dy` on the top and bottom.
    /// Negative values shrink it.
    pub fn expand(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x - dx,
            y: self.y - dy,
            width: self.width + dx * 2.0,
            height: self.height + dy * 2.0,
        }
    }

    pub fn union(&self, other: &Rect) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Self { x, y, width: self.right().max(other.right()) - x, height: self.bottom().max(other.bottom()) - y }
    }

    /// Smallest rectangle covering every point, `None` for an empty input.
    pub fn bounding<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (mut min, mut max) = (first, first);
        for point in points {
            min.x = min.x.min(point.x);
            min.y = min.y.min(point.y);
            max.x = max.x.max(point.x);
            max.y = max.y.max(point.y);
        }
        Some(Self { x: min.x, y: min.y, width: max.x - min.x, height: max.y - min.y })
    }
}

/// One of the four page rotations a viewport can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Accepts any value whose remainder modulo 360 is a quarter turn.
    ///
    /// The remainder keeps the sign of `degrees`, so `-90` is rejected
    /// while `450` maps to [`Rotation::Deg90`].
    pub fn from_degrees(degrees: i32) -> Result<Self, GeometryError> {
        match degrees % 360 {
            0 => Ok(Self::Deg0),
            90 => Ok(Self::Deg90),
            180 => Ok(Self::Deg180),
            270 => Ok(Self::Deg270),
            _ => Err(GeometryError::InvalidRotation(degrees)),
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    pub fn clockwise(self) -> Self {
        match self {
            Self::Deg0 => Self::Deg90,
            Self::Deg90 => Self::Deg180,
            Self::Deg180 => Self::Deg270,
            Self::Deg270 => Self::Deg0,
        }
    }

    /// True for the two rotations that swap page width and height.
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.degrees())
    }
}

/// Rendering state of a page: its scale, its rotation and the size of the
/// rotated, scaled page box in viewport pixels.
///
/// `rotation` is kept as raw degrees so a viewport read back from an overlay
/// can carry an unsupported value; [`Viewport::rotation`] is the checked view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub scale: f64,
    pub rotation: i32,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(scale: f64, rotation: Rotation, width: f64, height: f64) -> Self {
        Self { scale, rotation: rotation.degrees(), width, height }
    }

    /// Viewport of a page whose unrotated size at scale 1 is `page_width` x `page_height`.
    pub fn for_page(
        page_width: f64,
        page_height: f64,
        scale: f64,
        rotation: Rotation,
    ) -> Result<Self, GeometryError> {
        if scale.is_nan() || scale <= 0.0 {
            return Err(GeometryError::NonPositiveScale(scale));
        }

        let (width, height) = if rotation.is_quarter_turn() {
            (page_height * scale, page_width * scale)
        } else {
            (page_width * scale, page_height * scale)
        };

        Ok(Self::new(scale, rotation, width, height))
    }

    pub fn rotation(&self) -> Result<Rotation, GeometryError> {
        Rotation::from_degrees(self.rotation)
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_accepts_quarter_turns_only() {
        assert_eq!(Rotation::from_degrees(0), Ok(Rotation::Deg0));
        assert_eq!(Rotation::from_degrees(270), Ok(Rotation::Deg270));
        assert_eq!(Rotation::from_degrees(450), Ok(Rotation::Deg90));
        assert_eq!(Rotation::from_degrees(45), Err(GeometryError::InvalidRotation(45)));
        assert_eq!(Rotation::from_degrees(-90), Err(GeometryError::InvalidRotation(-90)));
    }

    #[test]
    fn test_rotation_clockwise_wraps() {
        assert_eq!(Rotation::Deg270.clockwise(), Rotation::Deg0);
        assert_eq!(Rotation::Deg0.clockwise().clockwise(), Rotation::Deg180);
    }

    #[test]
    fn test_viewport_for_page_swaps_dimensions_on_quarter_turn() {
        let upright = Viewport::for_page(600.0, 800.0, 2.0, Rotation::Deg180).unwrap();
        assert_eq!((upright.width, upright.height), (1200.0, 1600.0));

        let turned = Viewport::for_page(600.0, 800.0, 2.0, Rotation::Deg90).unwrap();
        assert_eq!((turned.width, turned.height), (1600.0, 1200.0));
        assert_eq!(turned.rotation, 90);
    }

    #[test]
    fn test_viewport_rejects_non_positive_scale() {
        assert!(matches!(
            Viewport::for_page(600.0, 800.0, 0.0, Rotation::Deg0),
            Err(GeometryError::NonPositiveScale(_))
        ));
    }

    #[test]
    fn test_rect_helpers() {
        let rect = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(rect.bottom_right(), Point::new(40.0, 60.0));
        assert!(rect.contains(Point::new(40.0, 60.0)));
        assert!(!rect.contains(Point::new(41.0, 60.0)));
        assert_eq!(rect.expand(5.0, 10.0), Rect::new(5.0, 10.0, 40.0, 60.0));

        let other = Rect::new(0.0, 50.0, 5.0, 50.0);
        assert_eq!(rect.union(&other), Rect::new(0.0, 20.0, 40.0, 80.0));
    }

    #[test]
    fn test_bounding_of_points() {
        assert_eq!(Rect::bounding(Vec::new()), None);

        let bounds =
            Rect::bounding([Point::new(3.0, 9.0), Point::new(-1.0, 4.0), Point::new(7.0, 5.0)]);
        assert_eq!(bounds, Some(Rect::new(-1.0, 4.0, 8.0, 5.0)));
    }
}
