//! Deterministic mapping from world coordinates to owning worker.
//!
//! The world is tiled by a `dim x dim` uniform grid over the global
//! bounding box. Every worker constructs the partition from the same
//! collectively agreed bounds, so ownership decisions never diverge.

use kernel::{Bounds, Vec2};

/// Uniform worker grid over a global bounding box.
#[derive(Debug, Clone, Copy)]
pub struct GridPartition {
    dim: usize,
    origin: Vec2,
    block: Vec2,
}

impl GridPartition {
    /// Tile `global` with a `dim x dim` grid.
    pub fn new(dim: usize, global: &Bounds) -> Self {
        assert!(dim > 0, "partition grid must have at least one cell");
        let size = global.max - global.min;
        Self {
            dim,
            origin: global.min,
            block: Vec2::new(size.x / dim as f32, size.y / dim as f32),
        }
    }

    /// Per-axis grid extent.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Rank of the worker owning `position`.
    ///
    /// Always in `[0, dim * dim)`: positions on the global maximum edge
    /// land in the last cell, and a degenerate axis (zero extent) maps
    /// everything to cell zero of that axis on every worker alike.
    #[inline]
    pub fn owner(&self, position: Vec2) -> usize {
        let x = self.cell(position.x - self.origin.x, self.block.x);
        let y = self.cell(position.y - self.origin.y, self.block.y);
        y * self.dim + x
    }

    #[inline]
    fn cell(&self, offset: f32, block: f32) -> usize {
        // `as usize` saturates: NaN (degenerate axis) goes to 0, an
        // offset at or past the far edge clamps to the last cell.
        ((offset / block) as usize).min(self.dim - 1)
    }
}
