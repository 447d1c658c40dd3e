use crate::types::BoundingBox;

/// Pick the primary face: largest area, first in detector order on ties.
///
/// Stateless; every tick selects again from scratch.
pub fn select_primary(candidates: &[BoundingBox]) -> Option<BoundingBox> {
    let mut best: Option<BoundingBox> = None;
    for candidate in candidates {
        match best {
            Some(current) if candidate.area() <= current.area() => {}
            _ => best = Some(*candidate),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(select_primary(&[]), None);
    }

    #[test]
    fn test_largest_area_wins() {
        let small = BoundingBox::new(0, 0, 25, 40);
        let large = BoundingBox::new(100, 50, 50, 80);
        assert_eq!(select_primary(&[small, large]), Some(large));
        assert_eq!(select_primary(&[large, small]), Some(large));
    }

    #[test]
    fn test_tie_keeps_detector_order() {
        let first = BoundingBox::new(0, 0, 20, 50);
        let second = BoundingBox::new(200, 0, 50, 20);
        let third = BoundingBox::new(300, 0, 10, 100);
        assert_eq!(select_primary(&[first, second, third]), Some(first));
        assert_eq!(select_primary(&[second, first, third]), Some(second));
        assert_eq!(select_primary(&[third, first]), Some(third));
    }
}
