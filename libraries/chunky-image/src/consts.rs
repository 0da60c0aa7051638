/// Edge length in pixels of a chunk at full resolution.
pub const FULL_CHUNK_SIZE: u32 = 256;

/// Default number of preview chunks an image keeps before the cache is flushed.
pub const DEFAULT_PREVIEW_CACHE_LIMIT: usize = 1024;
