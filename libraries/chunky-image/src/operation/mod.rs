//! Drawing operations that can be queued against a [`crate::ChunkyImage`].
//!
//! Every operation is a pure function of one chunk: given the chunk's previous pixels and its coordinate it produces the new pixels.
//! This is what allows pending operations to be replayed for previews at any resolution and then replayed again at commit time.

mod flip;
mod flood_fill;
mod image;
mod shapes;

pub use flip::{FlipAxis, FlipOperation, FrozenImage};
pub use flood_fill::{FillMask, FloodFillOperation};
pub use image::ImageOperation;
pub use shapes::{ClearRegionOperation, EllipseOperation, PixelsOperation, RectangleOperation, StrokeOperation};

use crate::chunk::{Chunk, ChunkCoordinate};
use crate::color::{BlendMode, Color};
use crate::rect::IRect;
use glam::UVec2;

/// Behavior shared by every operation kind.
pub trait ChunkOperation {
	/// Full resolution pixels the operation can change, or `None` when it draws nothing.
	fn bounds(&self) -> Option<IRect>;

	/// Draws the operation onto a chunk located at `coordinate`, at the chunk's own resolution.
	fn draw_on_chunk(&self, chunk: &mut Chunk, coordinate: ChunkCoordinate);
}

/// Color and blending used by the shape operations.
#[derive(Debug, Clone, Copy, PartialEq, Hash)]
pub struct Paint {
	pub color: Color,
	pub blend_mode: BlendMode,
}

impl Paint {
	pub fn new(color: Color) -> Self {
		Self {
			color,
			blend_mode: BlendMode::Normal,
		}
	}

	pub fn with_blend_mode(self, blend_mode: BlendMode) -> Self {
		Self { blend_mode, ..self }
	}

	#[inline(always)]
	pub fn apply(&self, destination: Color) -> Color {
		self.blend_mode.blend(destination, self.color)
	}
}

/// A line about which drawing is mirrored while symmetry is enabled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SymmetryAxis {
	/// A horizontal line at the given y position, mirroring top and bottom.
	Horizontal(f64),
	/// A vertical line at the given x position, mirroring left and right.
	Vertical(f64),
}

impl SymmetryAxis {
	pub(crate) fn mirror_point(&self, point: glam::DVec2) -> glam::DVec2 {
		match *self {
			SymmetryAxis::Horizontal(y) => glam::DVec2::new(point.x, 2. * y - point.y),
			SymmetryAxis::Vertical(x) => glam::DVec2::new(2. * x - point.x, point.y),
		}
	}

	/// Mirrors a pixel rect. The axis is snapped to the nearest half pixel.
	pub(crate) fn mirror_rect(&self, rect: IRect) -> IRect {
		match *self {
			SymmetryAxis::Horizontal(y) => {
				let twice = (2. * y).round() as i32;
				IRect::from_corners(glam::IVec2::new(rect.min.x, twice - rect.max.y), glam::IVec2::new(rect.max.x, twice - rect.min.y))
			}
			SymmetryAxis::Vertical(x) => {
				let twice = (2. * x).round() as i32;
				IRect::from_corners(glam::IVec2::new(twice - rect.max.x, rect.min.y), glam::IVec2::new(twice - rect.min.x, rect.max.y))
			}
		}
	}

	pub(crate) fn mirror_pixel(&self, pixel: glam::IVec2) -> glam::IVec2 {
		self.mirror_rect(IRect::from_position_size(pixel, glam::IVec2::ONE)).min
	}
}

/// A unit of drawing queued against an image.
#[derive(Debug, Clone)]
pub enum DrawOperation {
	/// Makes the whole image transparent.
	Clear,
	ClearRegion(ClearRegionOperation),
	Rectangle(RectangleOperation),
	Ellipse(EllipseOperation),
	Stroke(StrokeOperation),
	Pixels(PixelsOperation),
	Image(ImageOperation),
	FloodFill(FloodFillOperation),
	Flip(FlipOperation),
	/// Changes the image size. Pixels outside the new size become transparent.
	Resize(UVec2),
}

impl DrawOperation {
	fn as_chunk_operation(&self) -> Option<&dyn ChunkOperation> {
		match self {
			DrawOperation::Clear | DrawOperation::Resize(_) => None,
			DrawOperation::ClearRegion(operation) => Some(operation),
			DrawOperation::Rectangle(operation) => Some(operation),
			DrawOperation::Ellipse(operation) => Some(operation),
			DrawOperation::Stroke(operation) => Some(operation),
			DrawOperation::Pixels(operation) => Some(operation),
			DrawOperation::Image(operation) => Some(operation),
			DrawOperation::FloodFill(operation) => Some(operation),
			DrawOperation::Flip(operation) => Some(operation),
		}
	}

	/// Full resolution pixels the operation can change. `Clear` and `Resize` depend on the image and report `None` here.
	pub fn bounds(&self) -> Option<IRect> {
		self.as_chunk_operation().and_then(|operation| operation.bounds())
	}

	/// Whether the operation would draw nothing. Such operations are dropped instead of queued.
	pub fn is_noop(&self) -> bool {
		match self {
			DrawOperation::Clear | DrawOperation::Resize(_) => false,
			_ => self.bounds().is_none(),
		}
	}

	/// Draws the operation onto one chunk. `image_size` is the image size the operation was queued against.
	pub fn draw_on_chunk(&self, chunk: &mut Chunk, coordinate: ChunkCoordinate, image_size: UVec2) {
		match self {
			DrawOperation::Clear => chunk.surface_mut().fill(Color::TRANSPARENT),
			DrawOperation::Resize(size) => {
				let bounds = IRect::from_size(*size);
				if bounds.contains_rect(&coordinate.pixel_rect()) {
					return;
				}
				chunk.map_pixels(coordinate, |position, color| if bounds.contains(position.floor().as_ivec2()) { color } else { Color::TRANSPARENT });
			}
			_ => {
				if let Some(operation) = self.as_chunk_operation() {
					operation.draw_on_chunk(chunk, coordinate);
				}
			}
		}

		// Nothing may be drawn outside of the image
		let image = IRect::from_size(image_size);
		if !image.contains_rect(&coordinate.pixel_rect()) {
			chunk.map_pixels(coordinate, |position, color| if image.contains(position.floor().as_ivec2()) { color } else { Color::TRANSPARENT });
		}
	}

	/// The operation reflected about `axis`, for the operation kinds that support symmetry.
	pub fn mirrored(&self, axis: SymmetryAxis) -> Option<DrawOperation> {
		match self {
			DrawOperation::ClearRegion(operation) => Some(DrawOperation::ClearRegion(operation.mirrored(axis))),
			DrawOperation::Rectangle(operation) => Some(DrawOperation::Rectangle(operation.mirrored(axis))),
			DrawOperation::Ellipse(operation) => Some(DrawOperation::Ellipse(operation.mirrored(axis))),
			DrawOperation::Stroke(operation) => Some(DrawOperation::Stroke(operation.mirrored(axis))),
			DrawOperation::Pixels(operation) => Some(DrawOperation::Pixels(operation.mirrored(axis))),
			DrawOperation::Image(operation) => Some(DrawOperation::Image(operation.mirrored(axis))),
			DrawOperation::Clear | DrawOperation::FloodFill(_) | DrawOperation::Flip(_) | DrawOperation::Resize(_) => None,
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			DrawOperation::Clear => "Clear",
			DrawOperation::ClearRegion(_) => "Clear Region",
			DrawOperation::Rectangle(_) => "Rectangle",
			DrawOperation::Ellipse(_) => "Ellipse",
			DrawOperation::Stroke(_) => "Stroke",
			DrawOperation::Pixels(_) => "Pixels",
			DrawOperation::Image(_) => "Image",
			DrawOperation::FloodFill(_) => "Flood Fill",
			DrawOperation::Flip(_) => "Flip",
			DrawOperation::Resize(_) => "Resize",
		}
	}
}

macro_rules! impl_from_operation {
	($type:ty, $variant:ident) => {
		impl From<$type> for DrawOperation {
			fn from(operation: $type) -> Self {
				DrawOperation::$variant(operation)
			}
		}
	};
}

impl_from_operation!(ClearRegionOperation, ClearRegion);
impl_from_operation!(RectangleOperation, Rectangle);
impl_from_operation!(EllipseOperation, Ellipse);
impl_from_operation!(StrokeOperation, Stroke);
impl_from_operation!(PixelsOperation, Pixels);
impl_from_operation!(ImageOperation, Image);
impl_from_operation!(FloodFillOperation, FloodFill);
impl_from_operation!(FlipOperation, Flip);

#[cfg(test)]
mod test {
	use super::*;
	use crate::resolution::Resolution;
	use glam::IVec2;

	#[test]
	fn zero_sized_operations_are_noops() {
		let empty = RectangleOperation::new(IRect::from_position_size(IVec2::ZERO, IVec2::new(0, 10)), Paint::new(Color::RED));
		assert!(DrawOperation::from(empty).is_noop());
		let nan = StrokeOperation::new(vec![glam::DVec2::new(f64::NAN, 0.)], 4., Paint::new(Color::RED));
		assert!(DrawOperation::from(nan).is_noop());
		assert!(!DrawOperation::Clear.is_noop());
	}

	#[test]
	fn drawing_is_clipped_to_the_image() {
		let rect = RectangleOperation::new(IRect::from_position_size(IVec2::ZERO, IVec2::splat(256)), Paint::new(Color::RED));
		let mut chunk = Chunk::transparent(Resolution::Full);
		DrawOperation::from(rect).draw_on_chunk(&mut chunk, ChunkCoordinate::new(0, 0), UVec2::new(100, 50));
		assert_eq!(chunk.pixel(99, 49), Color::RED);
		assert_eq!(chunk.pixel(100, 49), Color::TRANSPARENT);
		assert_eq!(chunk.pixel(99, 50), Color::TRANSPARENT);
	}

	#[test]
	fn symmetry_mirrors_rects_about_the_axis() {
		let rect = IRect::from_corners(IVec2::new(0, 0), IVec2::new(10, 4));
		assert_eq!(SymmetryAxis::Vertical(50.).mirror_rect(rect), IRect::from_corners(IVec2::new(90, 0), IVec2::new(100, 4)));
		assert_eq!(SymmetryAxis::Horizontal(2.).mirror_rect(rect), rect);
		assert_eq!(SymmetryAxis::Vertical(50.).mirror_pixel(IVec2::new(0, 7)), IVec2::new(99, 7));
	}
}
