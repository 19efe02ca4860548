use crate::error::{Result, SchematicError};
use serde::{Deserialize, Serialize};

/// An axis-aligned box of voxels with inclusive bounds.
///
/// Construction normalises the two corners so that `min <= max` on every
/// axis; the box cannot be changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CuboidRegion {
    min: (i32, i32, i32),
    max: (i32, i32, i32),
}

impl CuboidRegion {
    pub fn new(p1: (i32, i32, i32), p2: (i32, i32, i32)) -> Self {
        let min = (p1.0.min(p2.0), p1.1.min(p2.1), p1.2.min(p2.2));
        let max = (p1.0.max(p2.0), p1.1.max(p2.1), p1.2.max(p2.2));
        Self { min, max }
    }

    /// Box starting at `position` and extending towards positive axes. A size
    /// below 1 on any axis is treated as 1.
    pub fn from_position_and_size(position: (i32, i32, i32), size: (i32, i32, i32)) -> Self {
        let extend = |start: i32, size: i32| start.saturating_add(size.max(1) - 1);
        Self::new(
            position,
            (
                extend(position.0, size.0),
                extend(position.1, size.1),
                extend(position.2, size.2),
            ),
        )
    }

    pub fn min(&self) -> (i32, i32, i32) {
        self.min
    }

    pub fn max(&self) -> (i32, i32, i32) {
        self.max
    }

    pub fn width(&self) -> i32 {
        self.max.0 - self.min.0 + 1
    }

    pub fn height(&self) -> i32 {
        self.max.1 - self.min.1 + 1
    }

    pub fn length(&self) -> i32 {
        self.max.2 - self.min.2 + 1
    }

    pub fn dimensions(&self) -> (i32, i32, i32) {
        (self.width(), self.height(), self.length())
    }

    pub fn volume(&self) -> u64 {
        self.width() as u64 * self.height() as u64 * self.length() as u64
    }

    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        x >= self.min.0
            && x <= self.max.0
            && y >= self.min.1
            && y <= self.max.1
            && z >= self.min.2
            && z <= self.max.2
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &CuboidRegion) -> CuboidRegion {
        CuboidRegion {
            min: (
                self.min.0.min(other.min.0),
                self.min.1.min(other.min.1),
                self.min.2.min(other.min.2),
            ),
            max: (
                self.max.0.max(other.max.0),
                self.max.1.max(other.max.1),
                self.max.2.max(other.max.2),
            ),
        }
    }
}

/// Minimal box enclosing every region in `regions`.
pub fn bounding_box(regions: &[CuboidRegion]) -> Result<CuboidRegion> {
    let (first, rest) = regions
        .split_first()
        .ok_or(SchematicError::EmptyRegionSet)?;
    Ok(rest.iter().fold(*first, |acc, region| acc.union(region)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corners_are_normalised() {
        let region = CuboidRegion::new((5, 2, 9), (1, 7, 3));
        assert_eq!(region.min(), (1, 2, 3));
        assert_eq!(region.max(), (5, 7, 9));
        assert_eq!(region.dimensions(), (5, 6, 7));
        assert_eq!(region.volume(), 210);
    }

    #[test]
    fn test_bounding_box_of_two_regions() {
        let regions = [
            CuboidRegion::new((0, 0, 0), (1, 1, 1)),
            CuboidRegion::new((5, 0, 0), (6, 2, 2)),
        ];
        let bbox = bounding_box(&regions).unwrap();
        assert_eq!(bbox.min(), (0, 0, 0));
        assert_eq!(bbox.max(), (6, 2, 2));
        assert_eq!(bbox.dimensions(), (7, 3, 3));
    }

    #[test]
    fn test_bounding_box_rejects_empty_input() {
        assert!(matches!(
            bounding_box(&[]),
            Err(SchematicError::EmptyRegionSet)
        ));
    }

    #[test]
    fn test_from_position_and_size() {
        let region = CuboidRegion::from_position_and_size((-2, 0, 4), (3, 1, 2));
        assert_eq!(region.min(), (-2, 0, 4));
        assert_eq!(region.max(), (0, 0, 5));
        assert!(region.contains(-1, 0, 5));
        assert!(!region.contains(1, 0, 5));

        let degenerate = CuboidRegion::from_position_and_size((4, 4, 4), (0, -3, 1));
        assert_eq!(degenerate.min(), (4, 4, 4));
        assert_eq!(degenerate.max(), (4, 4, 4));
    }
}
