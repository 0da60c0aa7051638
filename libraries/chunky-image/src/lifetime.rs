use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`crate::ChunkyImage`]. Clones made with `clone_from_committed` get a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(u64);

impl ImageId {
	pub(crate) fn next() -> Self {
		Self(NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed))
	}

	pub fn as_u64(&self) -> u64 {
		self.0
	}
}

impl core::fmt::Display for ImageId {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Disposal flag and generation counter shared by an image and every handle to it.
///
/// The generation advances whenever the committed state is replaced wholesale (restoring a snapshot), so readers that captured an older generation can detect it.
#[derive(Debug, Default)]
pub(crate) struct Lifetime {
	disposed: AtomicBool,
	generation: AtomicU64,
}

impl Lifetime {
	pub fn is_disposed(&self) -> bool {
		self.disposed.load(Ordering::Acquire)
	}

	/// Returns whether this call performed the disposal.
	pub fn dispose(&self) -> bool {
		!self.disposed.swap(true, Ordering::AcqRel)
	}

	pub fn generation(&self) -> u64 {
		self.generation.load(Ordering::Acquire)
	}

	pub fn advance_generation(&self) -> u64 {
		self.generation.fetch_add(1, Ordering::AcqRel) + 1
	}
}
