use crate::{Interval, Vec3};

/// Axis-Aligned Bounding Box.
///
/// An AABB is defined by three intervals (one per axis). Unlike a BVH box
/// it is never padded: normalization divides by its diagonal, so the
/// extents must be exactly those of the points it was built from.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    /// Create a new AABB from three intervals.
    pub fn new(x: Interval, y: Interval, z: Interval) -> Self {
        Self { x, y, z }
    }

    /// Smallest AABB containing every point of the iterator.
    ///
    /// Returns [`Aabb::EMPTY`] for an empty iterator.
    pub fn from_positions<'a>(positions: impl IntoIterator<Item = &'a Vec3>) -> Self {
        positions
            .into_iter()
            .fold(Self::EMPTY, |aabb, p| aabb.include_point(*p))
    }

    /// Grow the box to include `p`.
    pub fn include_point(&self, p: Vec3) -> Self {
        Self {
            x: self.x.include(p.x),
            y: self.y.include(p.y),
            z: self.z.include(p.z),
        }
    }

    /// True when no point has been added.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty() || self.z.is_empty()
    }

    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        Vec3::new(self.x.center(), self.y.center(), self.z.center())
    }

    /// Edge lengths along each axis.
    pub fn extent(&self) -> Vec3 {
        Vec3::new(self.x.size(), self.y.size(), self.z.size())
    }

    /// Length of the box diagonal, 0 for an empty box.
    pub fn diagonal(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        self.extent().length()
    }

    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_point_grows_each_axis() {
        let aabb = Aabb::EMPTY
            .include_point(Vec3::new(10.0, 0.0, 10.0))
            .include_point(Vec3::new(0.0, 10.0, 0.0));

        assert_eq!(aabb.min(), Vec3::ZERO);
        assert_eq!(aabb.max(), Vec3::splat(10.0));
    }

    #[test]
    fn test_aabb_from_positions() {
        let positions = [
            Vec3::new(-1.0, -2.0, -3.0),
            Vec3::new(4.0, 5.0, 6.0),
            Vec3::new(0.0, 0.0, 0.0),
        ];
        let aabb = Aabb::from_positions(&positions);

        assert_eq!(aabb.min(), Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(aabb.max(), Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(aabb.centroid(), Vec3::new(1.5, 1.5, 1.5));
    }

    #[test]
    fn test_aabb_empty_has_zero_diagonal() {
        let aabb = Aabb::from_positions(std::iter::empty());
        assert!(aabb.is_empty());
        assert_eq!(aabb.diagonal(), 0.0);
    }

    #[test]
    fn test_aabb_diagonal_not_padded() {
        // A flat box keeps its zero-height axis.
        let aabb = Aabb::from_positions(&[Vec3::ZERO, Vec3::new(3.0, 0.0, 4.0)]);
        assert_eq!(aabb.extent().y, 0.0);
        assert!((aabb.diagonal() - 5.0).abs() < 1e-6);
    }
}
