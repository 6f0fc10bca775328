/// Extent of a point set along one axis.
///
/// `min > max` means no point has been seen yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    /// Nothing included yet. Any `include` replaces both ends.
    pub const EMPTY: Interval = Interval {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };

    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn size(&self) -> f32 {
        self.max - self.min
    }

    pub fn center(&self) -> f32 {
        (self.min + self.max) * 0.5
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// Widened to cover `x`.
    pub fn include(&self, x: f32) -> Interval {
        Interval::new(self.min.min(x), self.max.max(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_and_center_of_mesh_extent() {
        // Typical face scan x-range in millimetres
        let x = Interval::new(-72.5, 75.5);
        assert_eq!(x.size(), 148.0);
        assert_eq!(x.center(), 1.5);
    }

    #[test]
    fn test_include_from_empty() {
        let extent = [3.0, -1.0, 0.5]
            .into_iter()
            .fold(Interval::EMPTY, |acc, v| acc.include(v));

        assert!(!extent.is_empty());
        assert_eq!(extent, Interval::new(-1.0, 3.0));
    }

    #[test]
    fn test_single_point_is_not_empty() {
        let point = Interval::EMPTY.include(2.0);
        assert!(!point.is_empty());
        assert_eq!(point.size(), 0.0);
    }

    #[test]
    fn test_empty() {
        assert!(Interval::EMPTY.is_empty());
        assert!(Interval::EMPTY.size() < 0.0);
    }
}
