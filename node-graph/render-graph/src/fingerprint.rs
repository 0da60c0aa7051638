use crate::context::RenderingContext;
use crate::error::RenderFailure;
use crate::execution::RenderScope;
use crate::node_property::PortValue;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// Hash of a port value as seen by the chunk being rendered, or `None` when it cannot be hashed.
///
/// Images contribute their version at the rendered coordinate, read through the request's pinned reader.
pub(crate) fn value_hash(value: &PortValue, context: &RenderingContext, scope: &RenderScope) -> Result<Option<u64>, RenderFailure> {
	match value {
		PortValue::Image(handle) => Ok(Some(scope.reader(handle)?.version_at(context.chunk)?)),
		value => Ok(value.content_hash()),
	}
}

/// Accumulates everything a node's output depends on. Any unhashable part makes the whole fingerprint unavailable.
pub(crate) struct Fingerprint {
	hasher: FxHasher,
	computable: bool,
}

impl Fingerprint {
	pub fn new(context: &RenderingContext) -> Self {
		let mut hasher = FxHasher::default();
		context.hash(&mut hasher);
		Self { hasher, computable: true }
	}

	pub fn add(&mut self, part: Option<u64>) {
		match part {
			Some(hash) => hash.hash(&mut self.hasher),
			None => self.computable = false,
		}
	}

	pub fn finish(self) -> Option<u64> {
		self.computable.then(|| self.hasher.finish())
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::context::FrameTime;
	use chunky_image::{ChunkCoordinate, Resolution};
	use glam::UVec2;

	fn context(frame: u64) -> RenderingContext {
		RenderingContext::new(ChunkCoordinate::new(0, 0), Resolution::Full, FrameTime::new(frame, 0.), UVec2::splat(256))
	}

	#[test]
	fn context_is_part_of_the_fingerprint() {
		let fingerprint = |frame| {
			let mut fingerprint = Fingerprint::new(&context(frame));
			fingerprint.add(Some(7));
			fingerprint.finish()
		};
		assert_eq!(fingerprint(0), fingerprint(0));
		assert_ne!(fingerprint(0), fingerprint(1));
	}

	#[test]
	fn unhashable_parts_poison_the_fingerprint() {
		let mut fingerprint = Fingerprint::new(&context(0));
		fingerprint.add(Some(1));
		fingerprint.add(None);
		fingerprint.add(Some(2));
		assert_eq!(fingerprint.finish(), None);
	}
}
