use crate::chunk::{Chunk, ChunkCoordinate};
use crate::rect::IRect;
use crate::resolution::Resolution;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

/// One committed full resolution chunk together with its lazily derived lower levels.
///
/// The lower levels are produced by successive 2× box-downsampling the first time they are read, so a commit never pays for levels nobody requests.
#[derive(Debug)]
pub struct MirroredChunk {
	revision: u64,
	full: Arc<Chunk>,
	half: OnceLock<Arc<Chunk>>,
	quarter: OnceLock<Arc<Chunk>>,
	eighth: OnceLock<Arc<Chunk>>,
}

impl MirroredChunk {
	pub fn new(full: Arc<Chunk>) -> Self {
		debug_assert_eq!(full.resolution(), Resolution::Full, "mirrored chunks are built from full resolution chunks");
		Self {
			revision: NEXT_REVISION.fetch_add(1, Ordering::Relaxed),
			full,
			half: OnceLock::new(),
			quarter: OnceLock::new(),
			eighth: OnceLock::new(),
		}
	}

	/// Process-unique stamp assigned when the chunk was committed.
	pub fn revision(&self) -> u64 {
		self.revision
	}

	pub fn get(&self, resolution: Resolution) -> Arc<Chunk> {
		match resolution {
			Resolution::Full => self.full.clone(),
			Resolution::Half => self.half.get_or_init(|| Arc::new(self.full.derive_lower(Resolution::Half))).clone(),
			Resolution::Quarter => self.quarter.get_or_init(|| Arc::new(self.get(Resolution::Half).derive_lower(Resolution::Quarter))).clone(),
			Resolution::Eighth => self.eighth.get_or_init(|| Arc::new(self.get(Resolution::Quarter).derive_lower(Resolution::Eighth))).clone(),
		}
	}

	/// Whether the given level has been materialized yet.
	pub fn is_materialized(&self, resolution: Resolution) -> bool {
		match resolution {
			Resolution::Full => true,
			Resolution::Half => self.half.get().is_some(),
			Resolution::Quarter => self.quarter.get().is_some(),
			Resolution::Eighth => self.eighth.get().is_some(),
		}
	}
}

/// The four parallel chunk grids of one image. Absent coordinates are fully transparent at every level.
///
/// Cloning is shallow: untouched coordinates keep sharing the same [`MirroredChunk`] between the old and new set.
#[derive(Debug, Clone, Default)]
pub struct ResolutionMirrorSet {
	chunks: FxHashMap<ChunkCoordinate, Arc<MirroredChunk>>,
}

impl ResolutionMirrorSet {
	pub fn get(&self, coordinate: ChunkCoordinate, resolution: Resolution) -> Option<Arc<Chunk>> {
		self.chunks.get(&coordinate).map(|mirrored| mirrored.get(resolution))
	}

	pub fn mirrored(&self, coordinate: ChunkCoordinate) -> Option<&Arc<MirroredChunk>> {
		self.chunks.get(&coordinate)
	}

	/// Stores a new full resolution chunk, discarding every level derived from the previous one.
	/// Fully transparent chunks are not stored.
	pub fn insert_full(&mut self, coordinate: ChunkCoordinate, chunk: Arc<Chunk>) {
		if chunk.is_fully_transparent() {
			self.chunks.remove(&coordinate);
		} else {
			self.chunks.insert(coordinate, Arc::new(MirroredChunk::new(chunk)));
		}
	}

	pub fn remove(&mut self, coordinate: ChunkCoordinate) -> Option<Arc<MirroredChunk>> {
		self.chunks.remove(&coordinate)
	}

	pub fn retain(&mut self, mut keep: impl FnMut(ChunkCoordinate) -> bool) {
		self.chunks.retain(|coordinate, _| keep(*coordinate));
	}

	pub fn contains(&self, coordinate: ChunkCoordinate) -> bool {
		self.chunks.contains_key(&coordinate)
	}

	pub fn coordinates(&self) -> impl Iterator<Item = ChunkCoordinate> + '_ {
		self.chunks.keys().copied()
	}

	pub fn len(&self) -> usize {
		self.chunks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chunks.is_empty()
	}

	pub fn revision(&self, coordinate: ChunkCoordinate) -> Option<u64> {
		self.chunks.get(&coordinate).map(|mirrored| mirrored.revision())
	}

	/// Whether both sets hold the very same committed chunk instance at `coordinate` (or both hold none).
	pub fn shares_chunk(&self, other: &ResolutionMirrorSet, coordinate: ChunkCoordinate) -> bool {
		match (self.chunks.get(&coordinate), other.chunks.get(&coordinate)) {
			(Some(a), Some(b)) => Arc::ptr_eq(a, b),
			(None, None) => true,
			_ => false,
		}
	}

	/// Union of the pixel rects of every stored chunk.
	pub fn chunk_aligned_bounds(&self) -> Option<IRect> {
		self.coordinates().map(|coordinate| coordinate.pixel_rect()).reduce(|a, b| a.union(&b))
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::color::Color;

	#[test]
	fn lower_levels_are_derived_lazily() {
		let mirrored = MirroredChunk::new(Arc::new(Chunk::filled(Resolution::Full, Color::RED)));
		assert!(!mirrored.is_materialized(Resolution::Half));
		let quarter = mirrored.get(Resolution::Quarter);
		assert_eq!(quarter.pixel_size(), 64);
		assert!(mirrored.is_materialized(Resolution::Half));
		assert!(!mirrored.is_materialized(Resolution::Eighth));
		assert!(Arc::ptr_eq(&quarter, &mirrored.get(Resolution::Quarter)));
	}

	#[test]
	fn transparent_chunks_are_not_stored() {
		let mut set = ResolutionMirrorSet::default();
		set.insert_full(ChunkCoordinate::new(0, 0), Arc::new(Chunk::transparent(Resolution::Full)));
		assert!(set.is_empty());
		set.insert_full(ChunkCoordinate::new(2, 1), Arc::new(Chunk::filled(Resolution::Full, Color::BLUE)));
		assert_eq!(set.chunk_aligned_bounds(), Some(ChunkCoordinate::new(2, 1).pixel_rect()));
	}

	#[test]
	fn clones_share_untouched_chunks() {
		let mut set = ResolutionMirrorSet::default();
		set.insert_full(ChunkCoordinate::new(0, 0), Arc::new(Chunk::filled(Resolution::Full, Color::BLUE)));
		let mut next = set.clone();
		assert!(set.shares_chunk(&next, ChunkCoordinate::new(0, 0)));
		next.insert_full(ChunkCoordinate::new(0, 0), Arc::new(Chunk::filled(Resolution::Full, Color::BLUE)));
		assert!(!set.shares_chunk(&next, ChunkCoordinate::new(0, 0)));
	}
}
