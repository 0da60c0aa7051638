use chunky_image::consts::FULL_CHUNK_SIZE;
use chunky_image::{ChunkCoordinate, Resolution};
use glam::UVec2;
use std::hash::{Hash, Hasher};

/// Position of a render on the animation timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTime {
	pub frame: u64,
	/// Position in the animation, from `0.0` at the first frame to `1.0` at the last.
	pub normalized_time: f64,
}

impl FrameTime {
	pub fn new(frame: u64, normalized_time: f64) -> Self {
		Self { frame, normalized_time }
	}
}

impl Hash for FrameTime {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.frame.hash(state);
		self.normalized_time.to_bits().hash(state);
	}
}

/// Everything a node may depend on besides its inputs when rendering one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Hash)]
pub struct RenderingContext {
	pub chunk: ChunkCoordinate,
	pub resolution: Resolution,
	pub frame_time: FrameTime,
	pub document_size: UVec2,
}

impl RenderingContext {
	pub fn new(chunk: ChunkCoordinate, resolution: Resolution, frame_time: FrameTime, document_size: UVec2) -> Self {
		Self {
			chunk,
			resolution,
			frame_time,
			document_size,
		}
	}

	/// Side length of the chunk being rendered, in pixels of its resolution.
	pub fn chunk_pixel_size(&self) -> u32 {
		FULL_CHUNK_SIZE / self.resolution.divisor()
	}

	pub fn is_within_document(&self) -> bool {
		self.chunk.is_within(self.document_size)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn chunks_outside_the_document_are_detected() {
		let frame = FrameTime::default();
		let size = UVec2::new(300, 100);
		assert!(RenderingContext::new(ChunkCoordinate::new(1, 0), Resolution::Full, frame, size).is_within_document());
		assert!(!RenderingContext::new(ChunkCoordinate::new(0, 1), Resolution::Full, frame, size).is_within_document());
		assert!(!RenderingContext::new(ChunkCoordinate::new(-1, 0), Resolution::Half, frame, size).is_within_document());
		assert_eq!(RenderingContext::new(ChunkCoordinate::new(0, 0), Resolution::Quarter, frame, size).chunk_pixel_size(), 64);

		for far in [ChunkCoordinate::new(16_777_216, 0), ChunkCoordinate::new(0, -16_777_216), ChunkCoordinate::new(i32::MIN, i32::MAX)] {
			assert!(!RenderingContext::new(far, Resolution::Full, frame, size).is_within_document());
		}
	}
}
