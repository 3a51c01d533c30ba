//! Tiled frame buffer with per-tile dirty counters.
//!
//! Render jobs write display colors into tiles; a viewer polls the dirty
//! counters and repaints only tiles that changed since it last looked.

use crate::bucket::{generate_buckets, Bucket, DEFAULT_BUCKET_SIZE};
use crate::error::{RenderError, RenderResult};
use crate::renderer::color_to_rgba;
use funray_math::Color;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Allocate a vector of `len` copies of `value`, reporting exhaustion.
pub(crate) fn try_filled(len: usize, value: Color, what: &'static str) -> RenderResult<Vec<Color>> {
    let mut pixels = Vec::new();
    pixels
        .try_reserve_exact(len)
        .map_err(|_| RenderError::OutOfMemory { what, pixels: len })?;
    pixels.resize(len, value);
    Ok(pixels)
}

/// One square block of the image.
///
/// Storage is always `size × size`; tiles on the right and bottom edges
/// only use the part covered by their [`Bucket`].
pub struct Tile {
    bucket: Bucket,
    size: u32,
    pixels: RwLock<Vec<Color>>,
    dirty: AtomicU64,
    last_dirty: AtomicU64,
}

impl Tile {
    fn new(bucket: Bucket, size: u32, base_color: Color) -> RenderResult<Self> {
        let len = size as usize * size as usize;
        Ok(Self {
            bucket,
            size,
            pixels: RwLock::new(try_filled(len, base_color, "tile")?),
            dirty: AtomicU64::new(0),
            last_dirty: AtomicU64::new(0),
        })
    }

    /// Image region this tile covers.
    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    fn offset(&self, local_x: u32, local_y: u32) -> Option<usize> {
        (local_x < self.bucket.width && local_y < self.bucket.height)
            .then(|| (local_y * self.size + local_x) as usize)
    }

    /// Pixel at tile-local coordinates, if inside the covered region.
    pub fn get_pixel(&self, local_x: u32, local_y: u32) -> Option<Color> {
        let offset = self.offset(local_x, local_y)?;
        let pixels = self.pixels.read().unwrap_or_else(PoisonError::into_inner);
        pixels.get(offset).copied()
    }

    /// Write a pixel at tile-local coordinates and bump the dirty counter.
    ///
    /// Returns false (and changes nothing) outside the covered region.
    pub fn set_pixel(&self, local_x: u32, local_y: u32, color: Color) -> bool {
        let Some(offset) = self.offset(local_x, local_y) else {
            return false;
        };

        {
            let mut pixels = self.pixels.write().unwrap_or_else(PoisonError::into_inner);
            pixels[offset] = color;
        }
        self.dirty.fetch_add(1, Ordering::AcqRel);
        true
    }

    /// Covered pixels, row-major, `bucket().width` per row.
    pub fn pixels(&self) -> Vec<Color> {
        let pixels = self.pixels.read().unwrap_or_else(PoisonError::into_inner);
        let (w, h) = (self.bucket.width as usize, self.bucket.height as usize);
        let stride = self.size as usize;
        (0..h)
            .flat_map(|row| pixels[row * stride..row * stride + w].iter().copied())
            .collect()
    }

    /// Number of writes since the tile was created.
    pub fn dirty_count(&self) -> u64 {
        self.dirty.load(Ordering::Acquire)
    }

    /// True if the tile was written since the last [`clear_dirty`](Tile::clear_dirty).
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire) != self.last_dirty.load(Ordering::Acquire)
    }

    pub fn clear_dirty(&self) {
        self.last_dirty
            .store(self.dirty.load(Ordering::Acquire), Ordering::Release);
    }

    /// Force a repaint without writing a pixel.
    pub fn set_dirty(&self) {
        self.dirty.fetch_add(1, Ordering::AcqRel);
    }
}

/// The whole image as a grid of row-major tiles.
pub struct TiledImage {
    width: u32,
    height: u32,
    tile_size: u32,
    tiles_x: u32,
    tiles_y: u32,
    tiles: Vec<Tile>,
    base_color: Color,
}

impl TiledImage {
    /// Black image with the default tile size.
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        Self::with_tile_size(width, height, DEFAULT_BUCKET_SIZE, Color::ZERO)
    }

    /// Image with square tiles of `tile_size` pixels, filled with `base_color`.
    ///
    /// `base_color` is also what out-of-range reads return.
    pub fn with_tile_size(
        width: u32,
        height: u32,
        tile_size: u32,
        base_color: Color,
    ) -> RenderResult<Self> {
        let tile_size = tile_size.max(1);
        let buckets = generate_buckets(width, height, tile_size);

        let mut tiles = Vec::new();
        tiles
            .try_reserve_exact(buckets.len())
            .map_err(|_| RenderError::OutOfMemory {
                what: "tile grid",
                pixels: width as usize * height as usize,
            })?;
        for bucket in buckets {
            tiles.push(Tile::new(bucket, tile_size, base_color)?);
        }

        Ok(Self {
            width,
            height,
            tile_size,
            tiles_x: width.div_ceil(tile_size),
            tiles_y: height.div_ceil(tile_size),
            tiles,
            base_color,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn num_tiles_x(&self) -> u32 {
        self.tiles_x
    }

    pub fn num_tiles_y(&self) -> u32 {
        self.tiles_y
    }

    pub fn num_tiles(&self) -> usize {
        self.tiles.len()
    }

    pub fn base_color(&self) -> Color {
        self.base_color
    }

    pub fn tile(&self, index: usize) -> Option<&Tile> {
        self.tiles.get(index)
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Tile index and tile-local coordinates of pixel `(x, y)`.
    pub fn locate(&self, x: u32, y: u32) -> Option<(usize, u32, u32)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let (tx, ty) = (x / self.tile_size, y / self.tile_size);
        let index = (ty * self.tiles_x + tx) as usize;
        Some((index, x % self.tile_size, y % self.tile_size))
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Color {
        self.locate(x, y)
            .and_then(|(index, lx, ly)| self.tiles[index].get_pixel(lx, ly))
            .unwrap_or(self.base_color)
    }

    /// Write pixel `(x, y)`; writes outside the image are ignored.
    pub fn set_pixel(&self, x: u32, y: u32, color: Color) {
        if let Some((index, lx, ly)) = self.locate(x, y) {
            self.tiles[index].set_pixel(lx, ly, color);
        }
    }

    /// Mark every tile dirty so the next poll repaints the whole frame.
    pub fn dirty_all(&self) {
        for tile in &self.tiles {
            tile.set_dirty();
        }
    }

    /// Call `f` for every tile written since the previous call, then mark
    /// it clean. Returns the number of tiles visited.
    ///
    /// Writes that land while `f` runs keep the tile dirty for next time.
    pub fn for_each_dirty(&self, mut f: impl FnMut(&Tile)) -> usize {
        let mut visited = 0;
        for tile in &self.tiles {
            let seen = tile.dirty_count();
            if seen != tile.last_dirty.load(Ordering::Acquire) {
                f(tile);
                tile.last_dirty.store(seen, Ordering::Release);
                visited += 1;
            }
        }
        visited
    }

    /// Full frame as 8-bit RGBA, row-major, top row first.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.width as usize * self.height as usize * 4];
        for tile in &self.tiles {
            let bucket = tile.bucket();
            for (i, color) in tile.pixels().into_iter().enumerate() {
                let x = bucket.x + i as u32 % bucket.width;
                let y = bucket.y + i as u32 / bucket.width;
                let offset = (y as usize * self.width as usize + x as usize) * 4;
                bytes[offset..offset + 4].copy_from_slice(&color_to_rgba(color));
            }
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_round_trip() {
        let image = TiledImage::with_tile_size(100, 70, 32, Color::ZERO).unwrap();
        let color = Color::new(0.25, 0.5, 0.75);
        image.set_pixel(99, 69, color);
        image.set_pixel(33, 5, color * 2.0);

        assert_eq!(image.get_pixel(99, 69), color);
        assert_eq!(image.get_pixel(33, 5), color * 2.0);
        assert_eq!(image.get_pixel(0, 0), Color::ZERO);
    }

    #[test]
    fn test_tile_grid() {
        let image = TiledImage::with_tile_size(100, 70, 32, Color::ZERO).unwrap();
        assert_eq!(image.num_tiles_x(), 4);
        assert_eq!(image.num_tiles_y(), 3);
        assert_eq!(image.num_tiles(), 12);
        assert_eq!(image.locate(33, 65), Some((9, 1, 1)));
        assert_eq!(image.tile(11).unwrap().bucket().width, 4);
    }

    #[test]
    fn test_out_of_range_reads_base_color() {
        let base = Color::new(0.1, 0.2, 0.3);
        let image = TiledImage::with_tile_size(10, 10, 4, base).unwrap();
        image.set_pixel(10, 3, Color::ONE);
        assert_eq!(image.get_pixel(10, 3), base);
        assert_eq!(image.get_pixel(3, 400), base);
        assert!(image.tiles().iter().all(|t| !t.is_dirty()));
    }

    #[test]
    fn test_dirty_counter_increases() {
        let image = TiledImage::new(8, 8).unwrap();
        let tile = image.tile(0).unwrap();

        let mut last = tile.dirty_count();
        for i in 0..5 {
            image.set_pixel(i, i, Color::ONE);
            assert!(tile.dirty_count() > last);
            last = tile.dirty_count();
        }

        assert!(tile.is_dirty());
        tile.clear_dirty();
        assert!(!tile.is_dirty());
    }

    #[test]
    fn test_for_each_dirty_visits_written_tiles() {
        let image = TiledImage::with_tile_size(8, 8, 4, Color::ZERO).unwrap();
        image.set_pixel(5, 1, Color::ONE);
        image.set_pixel(6, 6, Color::ONE);

        let mut seen = Vec::new();
        assert_eq!(image.for_each_dirty(|tile| seen.push(tile.bucket().index)), 2);
        assert_eq!(seen, vec![1, 3]);

        // Nothing changed since
        assert_eq!(image.for_each_dirty(|_| {}), 0);

        image.dirty_all();
        assert_eq!(image.for_each_dirty(|_| {}), 4);
    }

    #[test]
    fn test_tile_pixels_cover_edge_region() {
        let image = TiledImage::with_tile_size(6, 5, 4, Color::ZERO).unwrap();
        image.set_pixel(5, 4, Color::ONE);
        let tile = image.tile(3).unwrap();
        let pixels = tile.pixels();
        assert_eq!(pixels.len(), 2);
        assert_eq!(pixels[1], Color::ONE);
        // Local coordinates past the edge of the image are rejected
        assert!(!tile.set_pixel(3, 0, Color::ONE));
    }

    #[test]
    fn test_to_rgba8() {
        let image = TiledImage::with_tile_size(3, 2, 2, Color::ZERO).unwrap();
        image.set_pixel(2, 1, Color::ONE);
        let bytes = image.to_rgba8();
        assert_eq!(bytes.len(), 3 * 2 * 4);
        assert_eq!(&bytes[20..24], &[255, 255, 255, 255]);
        assert_eq!(&bytes[0..4], &[0, 0, 0, 255]);
    }
}
