use std::f64::consts::PI;
use std::fmt;

use crate::errors::{RTreeError, RTreeResult};

/// An axis-aligned n-dimensional rectangle given by its minimum and maximum
/// corners.
///
/// All rectangles stored in one tree share the tree's dimensionality. Every
/// operation here is side-effect free; the tree engine, the split strategies
/// and the storage layer all compute costs through these same formulas so
/// that comparisons stay consistent.
///
/// # Examples
///
/// ```rust
/// use paged_rtree::Rect;
///
/// let a = Rect::new(vec![0.0, 0.0], vec![2.0, 1.0]).unwrap();
/// let b = Rect::new(vec![1.0, 0.5], vec![3.0, 4.0]).unwrap();
///
/// assert!(a.overlaps(&b));
/// assert_eq!(a.combine(&b), Rect::new(vec![0.0, 0.0], vec![3.0, 4.0]).unwrap());
/// assert_eq!(a.area(), 2.0);
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl Rect {
    /// Creates a rectangle from its corner coordinates.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the corners have different or zero length,
    /// and `InvalidOperation` if any coordinate is not finite or any axis
    /// has `min > max`.
    pub fn new(min: Vec<f64>, max: Vec<f64>) -> RTreeResult<Rect> {
        if min.is_empty() || min.len() != max.len() {
            return Err(RTreeError::Configuration(format!(
                "Rectangle corners must have the same non-zero dimensionality (got {} and {})",
                min.len(),
                max.len()
            )));
        }
        for axis in 0..min.len() {
            let (lo, hi) = (min[axis], max[axis]);
            if !lo.is_finite() || !hi.is_finite() {
                return Err(RTreeError::InvalidOperation(format!(
                    "non-finite coordinate on axis {}",
                    axis
                )));
            }
            if lo > hi {
                return Err(RTreeError::InvalidOperation(format!(
                    "min {} exceeds max {} on axis {}",
                    lo, hi, axis
                )));
            }
        }
        Ok(Rect { min, max })
    }

    /// Creates a degenerate rectangle covering a single point.
    pub fn from_point(point: &[f64]) -> RTreeResult<Rect> {
        Rect::new(point.to_vec(), point.to_vec())
    }

    /// The null rectangle: the identity element of [`Rect::combine`].
    ///
    /// It has `+inf` minimums and `-inf` maximums, overlaps nothing and has
    /// zero area.
    pub fn null(dimensions: usize) -> Rect {
        Rect {
            min: vec![f64::INFINITY; dimensions],
            max: vec![f64::NEG_INFINITY; dimensions],
        }
    }

    pub fn is_null(&self) -> bool {
        self.min.iter().zip(&self.max).any(|(lo, hi)| lo > hi)
    }

    pub fn dimensions(&self) -> usize {
        self.min.len()
    }

    pub fn min(&self) -> &[f64] {
        &self.min
    }

    pub fn max(&self) -> &[f64] {
        &self.max
    }

    /// Extent along one axis.
    pub fn extent(&self, axis: usize) -> f64 {
        self.max[axis] - self.min[axis]
    }

    /// n-dimensional area (the product of all extents). Null rectangles
    /// have zero area.
    pub fn area(&self) -> f64 {
        if self.is_null() {
            return 0.0;
        }
        (0..self.dimensions()).map(|axis| self.extent(axis)).product()
    }

    /// Sum of the extents along every axis. Proportional to the perimeter
    /// (surface) measure used by the R*-tree split.
    pub fn margin(&self) -> f64 {
        if self.is_null() {
            return 0.0;
        }
        (0..self.dimensions()).map(|axis| self.extent(axis)).sum()
    }

    /// Volume of the bounding sphere of this rectangle.
    pub fn spherical_volume(&self) -> f64 {
        if self.is_null() {
            return 0.0;
        }
        let sum_of_squares: f64 = (0..self.dimensions())
            .map(|axis| {
                let half = self.extent(axis) / 2.0;
                half * half
            })
            .sum();
        let radius = sum_of_squares.sqrt();
        unit_sphere_volume(self.dimensions()) * radius.powi(self.dimensions() as i32)
    }

    /// Smallest rectangle containing both `self` and `other`.
    pub fn combine(&self, other: &Rect) -> Rect {
        debug_assert_eq!(self.dimensions(), other.dimensions());
        Rect {
            min: self
                .min
                .iter()
                .zip(&other.min)
                .map(|(a, b)| a.min(*b))
                .collect(),
            max: self
                .max
                .iter()
                .zip(&other.max)
                .map(|(a, b)| a.max(*b))
                .collect(),
        }
    }

    /// Grows `self` in place to contain `other`.
    pub fn expand(&mut self, other: &Rect) {
        for axis in 0..self.min.len() {
            self.min[axis] = self.min[axis].min(other.min[axis]);
            self.max[axis] = self.max[axis].max(other.max[axis]);
        }
    }

    /// True if the rectangles share at least one point. Touching edges count
    /// as overlap; null rectangles overlap nothing.
    pub fn overlaps(&self, other: &Rect) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        (0..self.dimensions())
            .all(|axis| self.min[axis] <= other.max[axis] && other.min[axis] <= self.max[axis])
    }

    /// True if `other` lies entirely inside `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        (0..self.dimensions())
            .all(|axis| self.min[axis] <= other.min[axis] && other.max[axis] <= self.max[axis])
    }

    /// Exact coordinate equality.
    pub fn equals(&self, other: &Rect) -> bool {
        self == other
    }

    /// Area added to `self` by combining it with `other`.
    pub fn enlargement(&self, other: &Rect) -> f64 {
        self.combine(other).area() - self.area()
    }

    /// Area of the intersection of the two rectangles (zero when disjoint).
    pub fn overlap_area(&self, other: &Rect) -> f64 {
        if !self.overlaps(other) {
            return 0.0;
        }
        (0..self.dimensions())
            .map(|axis| self.max[axis].min(other.max[axis]) - self.min[axis].max(other.min[axis]))
            .product()
    }

    pub fn center(&self) -> Vec<f64> {
        self.min
            .iter()
            .zip(&self.max)
            .map(|(lo, hi)| (lo + hi) / 2.0)
            .collect()
    }

    /// Squared Euclidean distance between the centres of two rectangles.
    pub fn center_distance_sq(&self, other: &Rect) -> f64 {
        self.min
            .iter()
            .zip(&self.max)
            .zip(other.min.iter().zip(&other.max))
            .map(|((a_lo, a_hi), (b_lo, b_hi))| {
                let d = (a_lo + a_hi) / 2.0 - (b_lo + b_hi) / 2.0;
                d * d
            })
            .sum()
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "Rect(null)");
        }
        write!(f, "Rect(")?;
        for axis in 0..self.dimensions() {
            if axis > 0 {
                write!(f, " x ")?;
            }
            write!(f, "[{}, {}]", self.min[axis], self.max[axis])?;
        }
        write!(f, ")")
    }
}

/// Volume of the unit ball in `dimensions` dimensions:
/// `V0 = 1`, `V1 = 2`, `Vn = Vn-2 * 2π / n`.
pub fn unit_sphere_volume(dimensions: usize) -> f64 {
    let (mut even, mut odd) = (1.0_f64, 2.0_f64);
    if dimensions == 0 {
        return even;
    }
    for n in 2..=dimensions {
        if n % 2 == 0 {
            even *= 2.0 * PI / n as f64;
        } else {
            odd *= 2.0 * PI / n as f64;
        }
    }
    if dimensions % 2 == 0 {
        even
    } else {
        odd
    }
}
