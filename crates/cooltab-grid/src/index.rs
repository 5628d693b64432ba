use cooltab_core::errors::{ErrorInfo, GridError};
use serde::{Deserialize, Serialize};

/// Multidimensional position of a grid point, one index per parameter axis.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridCoordinate(Vec<usize>);

impl GridCoordinate {
    /// Wraps raw per-axis indices.
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    /// Per-axis indices, first axis first.
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Number of axes the coordinate spans.
    pub fn rank(&self) -> usize {
        self.0.len()
    }
}

/// Ordered axis sizes of a grid; the last axis varies fastest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridShape {
    sizes: Vec<usize>,
}

impl GridShape {
    /// Builds a shape, rejecting zero-sized axes.
    pub fn new(sizes: Vec<usize>) -> Result<Self, GridError> {
        if let Some(axis) = sizes.iter().position(|&size| size == 0) {
            return Err(GridError::Shape(
                ErrorInfo::new("axis_empty", "grid axes must have at least one value")
                    .with_context("axis", axis.to_string()),
            ));
        }
        Ok(Self { sizes })
    }

    /// Axis sizes in declaration order.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Number of parameter axes.
    pub fn rank(&self) -> usize {
        self.sizes.len()
    }

    /// Total number of grid points (one for a grid without parameter axes).
    pub fn total(&self) -> usize {
        self.sizes.iter().product()
    }

    /// Converts a flat 0-based run index into its coordinate.
    pub fn coordinate_of(&self, flat: usize) -> Result<GridCoordinate, GridError> {
        coordinate_of(flat, &self.sizes)
    }

    /// Converts a coordinate back into its flat 0-based run index.
    pub fn flat_of(&self, coordinate: &GridCoordinate) -> Result<usize, GridError> {
        flat_of(coordinate, &self.sizes)
    }
}

/// Row-major decomposition of `flat` over `sizes`.
pub fn coordinate_of(flat: usize, sizes: &[usize]) -> Result<GridCoordinate, GridError> {
    let total: usize = sizes.iter().product();
    if flat >= total {
        return Err(GridError::Shape(
            ErrorInfo::new("flat_out_of_range", "flat index exceeds grid size")
                .with_context("flat", flat.to_string())
                .with_context("total", total.to_string()),
        ));
    }
    let mut remaining = flat;
    let mut indices = Vec::with_capacity(sizes.len());
    for &size in sizes.iter().rev() {
        indices.push(remaining % size);
        remaining /= size;
    }
    indices.reverse();
    Ok(GridCoordinate(indices))
}

/// Inverse of [`coordinate_of`]: `flat = Σ idx_i * Π(sizes after i)`.
pub fn flat_of(coordinate: &GridCoordinate, sizes: &[usize]) -> Result<usize, GridError> {
    if coordinate.rank() != sizes.len() {
        return Err(GridError::Shape(
            ErrorInfo::new("rank_mismatch", "coordinate rank differs from grid rank")
                .with_context("coordinate_rank", coordinate.rank().to_string())
                .with_context("grid_rank", sizes.len().to_string()),
        ));
    }
    let mut flat = 0usize;
    for (axis, (&idx, &size)) in coordinate.indices().iter().zip(sizes).enumerate() {
        if idx >= size {
            return Err(GridError::Shape(
                ErrorInfo::new("coordinate_out_of_range", "axis index exceeds axis size")
                    .with_context("axis", axis.to_string())
                    .with_context("index", idx.to_string())
                    .with_context("size", size.to_string()),
            ));
        }
        flat = flat * size + idx;
    }
    Ok(flat)
}
