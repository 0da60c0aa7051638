use crate::consts::DEFAULT_PREVIEW_CACHE_LIMIT;
use serde::{Deserialize, Serialize};

/// Tunables for a [`crate::ChunkyImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkyImageSettings {
	/// Maximum number of cached preview chunks before the preview cache is flushed.
	pub preview_cache_limit: usize,
}

impl Default for ChunkyImageSettings {
	fn default() -> Self {
		Self {
			preview_cache_limit: DEFAULT_PREVIEW_CACHE_LIMIT,
		}
	}
}
