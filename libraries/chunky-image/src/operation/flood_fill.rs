use super::{ChunkOperation, Paint};
use crate::chunk::{Chunk, ChunkCoordinate};
use crate::color::Color;
use crate::consts::FULL_CHUNK_SIZE;
use crate::rect::IRect;
use glam::IVec2;
use rustc_hash::FxHashMap;
use std::sync::Arc;

const WORDS_PER_CHUNK: usize = (FULL_CHUNK_SIZE * FULL_CHUNK_SIZE) as usize / 64;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ChunkMask {
	bits: Box<[u64; WORDS_PER_CHUNK]>,
}

impl ChunkMask {
	fn new() -> Self {
		Self { bits: Box::new([0; WORDS_PER_CHUNK]) }
	}

	fn index(local: IVec2) -> (usize, u64) {
		let index = local.y as usize * FULL_CHUNK_SIZE as usize + local.x as usize;
		(index / 64, 1 << (index % 64))
	}

	fn get(&self, local: IVec2) -> bool {
		let (word, bit) = Self::index(local);
		self.bits[word] & bit != 0
	}

	fn set(&mut self, local: IVec2) {
		let (word, bit) = Self::index(local);
		self.bits[word] |= bit;
	}
}

/// The set of full resolution pixels reached by a flood fill, stored sparsely per chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillMask {
	chunks: FxHashMap<ChunkCoordinate, ChunkMask>,
	bounds: Option<IRect>,
}

impl FillMask {
	/// Fills the 4-connected region around `seed` whose pixels are within `tolerance` of the seed's color, limited to `area`.
	///
	/// `pixel_at` reads the image the fill is computed against. Each pixel is read at most a few times.
	pub fn compute(seed: IVec2, area: IRect, tolerance: f32, mut pixel_at: impl FnMut(IVec2) -> Color) -> FillMask {
		let mut mask = FillMask::default();
		if !area.contains(seed) {
			return mask;
		}
		let target = pixel_at(seed);
		let mut matches = |mask: &FillMask, pixel: IVec2| area.contains(pixel) && !mask.contains(pixel) && pixel_at(pixel).is_similar(&target, tolerance);

		let mut stack = vec![seed];
		while let Some(start) = stack.pop() {
			if !matches(&mask, start) {
				continue;
			}

			let mut left = start.x;
			while matches(&mask, IVec2::new(left - 1, start.y)) {
				left -= 1;
			}
			let mut right = start.x;
			while matches(&mask, IVec2::new(right + 1, start.y)) {
				right += 1;
			}
			for x in left..=right {
				mask.insert(IVec2::new(x, start.y));
			}

			for y in [start.y - 1, start.y + 1] {
				let mut in_run = false;
				for x in left..=right {
					let pixel = IVec2::new(x, y);
					let fillable = matches(&mask, pixel);
					if fillable && !in_run {
						stack.push(pixel);
					}
					in_run = fillable;
				}
			}
		}
		mask
	}

	fn insert(&mut self, pixel: IVec2) {
		let coordinate = ChunkCoordinate::containing(pixel);
		self.chunks.entry(coordinate).or_insert_with(ChunkMask::new).set(pixel - coordinate.origin());
		let rect = IRect::from_position_size(pixel, IVec2::ONE);
		self.bounds = Some(self.bounds.map_or(rect, |bounds| bounds.union(&rect)));
	}

	pub fn contains(&self, pixel: IVec2) -> bool {
		let coordinate = ChunkCoordinate::containing(pixel);
		self.chunks.get(&coordinate).is_some_and(|mask| mask.get(pixel - coordinate.origin()))
	}

	pub fn bounds(&self) -> Option<IRect> {
		self.bounds
	}

	pub fn is_empty(&self) -> bool {
		self.chunks.is_empty()
	}

	/// Chunks containing at least one filled pixel.
	pub fn chunks(&self) -> impl Iterator<Item = ChunkCoordinate> + '_ {
		self.chunks.keys().copied()
	}
}

/// Paints a precomputed [`FillMask`].
#[derive(Debug, Clone, PartialEq)]
pub struct FloodFillOperation {
	pub mask: Arc<FillMask>,
	pub paint: Paint,
}

impl FloodFillOperation {
	pub fn new(mask: impl Into<Arc<FillMask>>, paint: Paint) -> Self {
		Self { mask: mask.into(), paint }
	}
}

impl ChunkOperation for FloodFillOperation {
	fn bounds(&self) -> Option<IRect> {
		self.mask.bounds()
	}

	fn draw_on_chunk(&self, chunk: &mut Chunk, coordinate: ChunkCoordinate) {
		let Some(mask) = self.mask.chunks.get(&coordinate) else { return };
		let origin = coordinate.origin();
		chunk.map_pixels(coordinate, |position, color| if mask.get(position.floor().as_ivec2() - origin) { self.paint.apply(color) } else { color });
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn fill_stops_at_different_colors() {
		// A vertical wall at x = 5 splits a 10×10 area
		let wall = |pixel: IVec2| if pixel.x == 5 { Color::BLACK } else { Color::TRANSPARENT };
		let area = IRect::from_size(glam::UVec2::splat(10));
		let mask = FillMask::compute(IVec2::new(1, 1), area, 0., wall);

		assert!(mask.contains(IVec2::new(4, 9)));
		assert!(!mask.contains(IVec2::new(5, 0)));
		assert!(!mask.contains(IVec2::new(6, 0)));
		assert_eq!(mask.bounds(), Some(IRect::from_corners(IVec2::ZERO, IVec2::new(5, 10))));
	}

	#[test]
	fn fill_spans_chunks() {
		let area = IRect::from_corners(IVec2::new(-10, 0), IVec2::new(300, 2));
		let mask = FillMask::compute(IVec2::new(0, 0), area, 0., |_| Color::TRANSPARENT);
		let mut chunks: Vec<_> = mask.chunks().collect();
		chunks.sort();
		assert_eq!(chunks, vec![ChunkCoordinate::new(-1, 0), ChunkCoordinate::new(0, 0), ChunkCoordinate::new(1, 0)]);
		assert!(mask.contains(IVec2::new(-10, 1)));
		assert!(mask.contains(IVec2::new(299, 1)));
	}

	#[test]
	fn seed_outside_area_fills_nothing() {
		let mask = FillMask::compute(IVec2::new(-1, 0), IRect::from_size(glam::UVec2::splat(4)), 0., |_| Color::TRANSPARENT);
		assert!(mask.is_empty());
		assert_eq!(mask.bounds(), None);
	}
}
