//! Progressive sample accumulation, split per tile.
//!
//! Each [`TileAccumulator`] is owned by exactly one job during a pass, so
//! the tiled progressive mode hands out disjoint `&mut` borrows through
//! `par_iter_mut` and never locks.

use crate::bucket::Bucket;
use crate::error::RenderResult;
use crate::tiled_image::try_filled;
use funray_math::Color;

/// Running radiance sums for one tile region.
pub struct TileAccumulator {
    bucket: Bucket,
    sums: Vec<Color>,
}

impl TileAccumulator {
    fn new(bucket: Bucket) -> RenderResult<Self> {
        let sums = try_filled(bucket.pixel_count() as usize, Color::ZERO, "accumulation buffer")?;
        Ok(Self { bucket, sums })
    }

    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        ((y - self.bucket.y) * self.bucket.width + (x - self.bucket.x)) as usize
    }

    /// Add one sample to global pixel `(x, y)` and return the new sum.
    ///
    /// The pixel must lie inside [`bucket`](TileAccumulator::bucket).
    pub fn add(&mut self, x: u32, y: u32, sample: Color) -> Color {
        let offset = self.offset(x, y);
        self.sums[offset] += sample;
        self.sums[offset]
    }

    /// Current sum at global pixel `(x, y)`.
    pub fn sum(&self, x: u32, y: u32) -> Color {
        self.sums[self.offset(x, y)]
    }

    pub fn clear(&mut self) {
        self.sums.fill(Color::ZERO);
    }
}

/// Accumulation buffer for a whole frame, one accumulator per tile.
pub struct AccumulationBuffer {
    tiles: Vec<TileAccumulator>,
    tile_size: u32,
    tiles_x: u32,
}

impl AccumulationBuffer {
    /// One accumulator per bucket; `buckets` must be row-major, as
    /// returned by [`generate_buckets`](crate::generate_buckets).
    pub fn new(buckets: &[Bucket], width: u32, tile_size: u32) -> RenderResult<Self> {
        let tiles = buckets
            .iter()
            .map(|bucket| TileAccumulator::new(*bucket))
            .collect::<RenderResult<Vec<_>>>()?;

        let tile_size = tile_size.max(1);
        Ok(Self {
            tiles,
            tile_size,
            tiles_x: width.div_ceil(tile_size),
        })
    }

    pub fn tiles(&self) -> &[TileAccumulator] {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut [TileAccumulator] {
        &mut self.tiles
    }

    /// Accumulator owning global pixel `(x, y)`.
    pub fn tile_for_mut(&mut self, x: u32, y: u32) -> Option<&mut TileAccumulator> {
        let index = ((y / self.tile_size) * self.tiles_x + x / self.tile_size) as usize;
        self.tiles.get_mut(index).filter(|t| t.bucket.contains(x, y))
    }

    pub fn sum(&self, x: u32, y: u32) -> Option<Color> {
        let index = ((y / self.tile_size) * self.tiles_x + x / self.tile_size) as usize;
        self.tiles
            .get(index)
            .filter(|t| t.bucket.contains(x, y))
            .map(|t| t.sum(x, y))
    }

    /// Zero every sum.
    pub fn clear(&mut self) {
        for tile in &mut self.tiles {
            tile.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::generate_buckets;

    #[test]
    fn test_add_and_clear() {
        let buckets = generate_buckets(10, 6, 4);
        let mut accum = AccumulationBuffer::new(&buckets, 10, 4).unwrap();

        let tile = accum.tile_for_mut(9, 5).unwrap();
        assert_eq!(tile.bucket().index, 5);
        tile.add(9, 5, Color::ONE);
        let sum = tile.add(9, 5, Color::ONE);
        assert_eq!(sum, Color::splat(2.0));
        assert_eq!(accum.sum(9, 5), Some(Color::splat(2.0)));

        accum.clear();
        assert_eq!(accum.sum(9, 5), Some(Color::ZERO));
    }

    #[test]
    fn test_out_of_range_pixel() {
        let buckets = generate_buckets(10, 6, 4);
        let mut accum = AccumulationBuffer::new(&buckets, 10, 4).unwrap();
        assert!(accum.tile_for_mut(10, 0).is_none());
        assert!(accum.sum(0, 6).is_none());
    }

    #[test]
    fn test_tiles_are_disjoint() {
        let buckets = generate_buckets(8, 8, 4);
        let mut accum = AccumulationBuffer::new(&buckets, 8, 4).unwrap();
        for tile in accum.tiles_mut() {
            let b = tile.bucket();
            tile.add(b.x, b.y, Color::ONE);
        }
        assert_eq!(accum.sum(0, 0), Some(Color::ONE));
        assert_eq!(accum.sum(4, 4), Some(Color::ONE));
        assert_eq!(accum.sum(1, 0), Some(Color::ZERO));
    }
}
