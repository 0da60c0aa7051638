//! Chunked, multi-resolution raster storage.
//!
//! An image is a sparse grid of 256×256 chunks. Every committed chunk is mirrored at half, quarter and eighth resolution, derived lazily by box-downsampling.
//! Drawing happens by queueing [`DrawOperation`]s which are previewed on top of the committed state until they are committed or cancelled.

pub mod affected_area;
pub mod chunk;
pub mod chunky_image;
pub mod color;
pub mod consts;
pub mod error;
pub mod lifetime;
pub mod mirror;
pub mod operation;
pub mod rect;
pub mod resolution;
pub mod settings;
pub mod surface;

pub use affected_area::AffectedArea;
pub use chunk::{Chunk, ChunkCoordinate};
pub use chunky_image::{ChunkyImage, ChunkyImageHandle, CommittedSnapshot, ImageReader};
pub use color::{BlendMode, Color};
pub use error::ChunkyImageError;
pub use lifetime::ImageId;
pub use mirror::{MirroredChunk, ResolutionMirrorSet};
pub use operation::{DrawOperation, FlipAxis, Paint};
pub use rect::IRect;
pub use resolution::Resolution;
pub use settings::ChunkyImageSettings;
pub use surface::Surface;
