//! Collapses the duplicate fragments a multi-line text selection produces.
//!
//! Selection rectangles arrive ordered top to bottom, so only consecutive
//! pairs are compared. Two neighbours are duplicates when their vertical
//! extents fall on the same integer row and their left edges round to the
//! same pixel; the narrower one is dropped.

use annotator_model::Rect;
use std::cmp::Ordering;

/// Returns `rects` without overlapping fragments, surviving order preserved.
///
/// Neighbours of exactly equal width are both kept.
pub fn resolve_overlaps(rects: &[Rect]) -> Vec<Rect> {
    if rects.len() < 2 {
        return rects.to_vec();
    }

    let mut removed = vec![false; rects.len()];
    for (index, pair) in rects.windows(2).enumerate() {
        let (earlier, later) = (&pair[0], &pair[1]);
        if !same_row(earlier, later) || round_half_up(earlier.x) != round_half_up(later.x) {
            continue;
        }

        match later.width.partial_cmp(&earlier.width) {
            Some(Ordering::Greater) => removed[index] = true,
            Some(Ordering::Less) => removed[index + 1] = true,
            _ => {}
        }
    }

    rects.iter().zip(removed).filter(|(_, removed)| !removed).map(|(rect, _)| *rect).collect()
}

fn same_row(a: &Rect, b: &Rect) -> bool {
    let (low, high) = if a.y < b.y { (a.y, b.y) } else { (b.y, a.y) };
    low.ceil() == high.floor()
}

fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_single_are_unchanged() {
        assert!(resolve_overlaps(&[]).is_empty());

        let single = [Rect::new(1.0, 2.0, 3.0, 4.0)];
        assert_eq!(resolve_overlaps(&single), single.to_vec());
    }

    #[test]
    fn test_distinct_rows_are_kept() {
        let rects = [Rect::new(10.0, 100.0, 50.0, 20.0), Rect::new(10.0, 119.0, 80.0, 20.0)];
        assert_eq!(resolve_overlaps(&rects), rects.to_vec());
    }

    #[test]
    fn test_narrower_duplicate_is_removed() {
        let line = Rect::new(10.0, 100.0, 80.0, 20.0);
        let fragment = Rect::new(10.2, 100.0, 35.0, 18.0);

        assert_eq!(resolve_overlaps(&[line, fragment]), vec![line]);
        assert_eq!(resolve_overlaps(&[fragment, line]), vec![line]);
    }

    #[test]
    fn test_different_starts_are_not_duplicates() {
        let rects = [Rect::new(10.0, 100.0, 80.0, 20.0), Rect::new(95.0, 100.0, 30.0, 20.0)];
        assert_eq!(resolve_overlaps(&rects), rects.to_vec());
    }

    #[test]
    fn test_equal_widths_are_both_kept() {
        let rects = [Rect::new(10.0, 100.0, 40.0, 20.0), Rect::new(10.0, 100.0, 40.0, 20.0)];
        assert_eq!(resolve_overlaps(&rects), rects.to_vec());
    }

    #[test]
    fn test_only_adjacent_pairs_are_compared() {
        let first = Rect::new(10.0, 100.0, 30.0, 20.0);
        let other_line = Rect::new(10.0, 130.0, 90.0, 20.0);
        let third = Rect::new(10.0, 100.0, 60.0, 20.0);

        assert_eq!(resolve_overlaps(&[first, other_line, third]), vec![first, other_line, third]);
    }

    #[test]
    fn test_survivors_keep_their_order() {
        let a = Rect::new(0.0, 10.0, 100.0, 12.0);
        let a_dup = Rect::new(0.0, 10.0, 20.0, 12.0);
        let b = Rect::new(0.0, 30.0, 100.0, 12.0);
        let c = Rect::new(5.0, 50.0, 40.0, 12.0);
        let c_dup = Rect::new(5.0, 50.0, 60.0, 12.0);

        assert_eq!(resolve_overlaps(&[a, a_dup, b, c, c_dup]), vec![a, b, c_dup]);
    }
}
