use super::ChunkOperation;
use crate::chunk::{Chunk, ChunkCoordinate};
use crate::color::Color;
use crate::rect::IRect;
use glam::{IVec2, UVec2};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlipAxis {
	/// Mirrors left and right.
	Horizontal,
	/// Mirrors top and bottom.
	Vertical,
}

/// Full resolution chunks of an image captured at one moment, used as the read-only source of a flip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrozenImage {
	pub size: UVec2,
	pub chunks: FxHashMap<ChunkCoordinate, Arc<Chunk>>,
}

impl FrozenImage {
	pub fn pixel(&self, pixel: IVec2) -> Color {
		let coordinate = ChunkCoordinate::containing(pixel);
		let local = (pixel - coordinate.origin()).as_uvec2();
		self.chunks.get(&coordinate).map_or(Color::TRANSPARENT, |chunk| chunk.pixel(local.x, local.y))
	}
}

/// Replaces the image content with its mirror image about the center of the image.
#[derive(Debug, Clone, PartialEq)]
pub struct FlipOperation {
	pub axis: FlipAxis,
	pub source: Arc<FrozenImage>,
}

impl FlipOperation {
	pub fn new(axis: FlipAxis, source: impl Into<Arc<FrozenImage>>) -> Self {
		Self { axis, source: source.into() }
	}

	fn source_pixel(&self, pixel: IVec2) -> IVec2 {
		let size = self.source.size.as_ivec2();
		match self.axis {
			FlipAxis::Horizontal => IVec2::new(size.x - 1 - pixel.x, pixel.y),
			FlipAxis::Vertical => IVec2::new(pixel.x, size.y - 1 - pixel.y),
		}
	}

	/// Every chunk holding source content plus every chunk that content lands in after flipping.
	pub fn affected_chunks(&self) -> FxHashSet<ChunkCoordinate> {
		let bounds = IRect::from_size(self.source.size);
		let mut chunks = FxHashSet::default();
		for &coordinate in self.source.chunks.keys() {
			chunks.insert(coordinate);
			let Some(rect) = coordinate.pixel_rect().intersect(&bounds) else { continue };
			let (a, b) = (self.source_pixel(rect.min), self.source_pixel(rect.max - IVec2::ONE));
			let flipped = IRect::from_corners(a.min(b), a.max(b) + IVec2::ONE);
			chunks.extend(ChunkCoordinate::covering(&flipped));
		}
		chunks
	}
}

impl ChunkOperation for FlipOperation {
	fn bounds(&self) -> Option<IRect> {
		if self.source.chunks.is_empty() {
			return None;
		}
		let bounds = IRect::from_size(self.source.size);
		(!bounds.is_empty()).then_some(bounds)
	}

	fn draw_on_chunk(&self, chunk: &mut Chunk, coordinate: ChunkCoordinate) {
		let bounds = IRect::from_size(self.source.size);
		if bounds.intersect(&coordinate.pixel_rect()).is_none() {
			return;
		}
		chunk.map_pixels(coordinate, |position, color| {
			let pixel = position.floor().as_ivec2();
			if bounds.contains(pixel) { self.source.pixel(self.source_pixel(pixel)) } else { color }
		});
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::resolution::Resolution;

	#[test]
	fn horizontal_flip_moves_content_across_chunks() {
		let mut chunk = Chunk::transparent(Resolution::Full);
		chunk.surface_mut().set_pixel(0, 3, Color::RED);
		let mut chunks = FxHashMap::default();
		chunks.insert(ChunkCoordinate::new(0, 0), Arc::new(chunk));
		let flip = FlipOperation::new(FlipAxis::Horizontal, FrozenImage { size: UVec2::new(300, 10), chunks });

		let mut affected: Vec<_> = flip.affected_chunks().into_iter().collect();
		affected.sort();
		assert_eq!(affected, vec![ChunkCoordinate::new(0, 0), ChunkCoordinate::new(1, 0)]);

		let mut right = Chunk::transparent(Resolution::Full);
		flip.draw_on_chunk(&mut right, ChunkCoordinate::new(1, 0));
		assert_eq!(right.pixel(299 - 256, 3), Color::RED);

		let mut left = Chunk::filled(Resolution::Full, Color::BLUE);
		flip.draw_on_chunk(&mut left, ChunkCoordinate::new(0, 0));
		assert_eq!(left.pixel(0, 3), Color::TRANSPARENT);
	}
}
