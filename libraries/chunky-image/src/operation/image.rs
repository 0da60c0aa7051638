use super::{ChunkOperation, SymmetryAxis};
use crate::chunk::{Chunk, ChunkCoordinate};
use crate::color::BlendMode;
use crate::rect::IRect;
use crate::surface::Surface;
use glam::IVec2;
use std::sync::Arc;

/// Blends a full resolution surface onto the image with its top left corner at `position`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOperation {
	pub surface: Arc<Surface>,
	pub position: IVec2,
	pub blend_mode: BlendMode,
}

impl ImageOperation {
	pub fn new(surface: impl Into<Arc<Surface>>, position: IVec2) -> Self {
		Self {
			surface: surface.into(),
			position,
			blend_mode: BlendMode::Normal,
		}
	}

	pub fn with_blend_mode(self, blend_mode: BlendMode) -> Self {
		Self { blend_mode, ..self }
	}

	fn rect(&self) -> IRect {
		IRect::from_position_size(self.position, self.surface.size().as_ivec2())
	}

	pub fn mirrored(&self, axis: SymmetryAxis) -> Self {
		let (width, height) = (self.surface.width(), self.surface.height());
		let mut flipped = Surface::new(width, height);
		for y in 0..height {
			for x in 0..width {
				let (source_x, source_y) = match axis {
					SymmetryAxis::Horizontal(_) => (x, height - 1 - y),
					SymmetryAxis::Vertical(_) => (width - 1 - x, y),
				};
				if let Some(color) = self.surface.get_pixel(source_x, source_y) {
					flipped.set_pixel(x, y, color);
				}
			}
		}
		Self {
			surface: Arc::new(flipped),
			position: axis.mirror_rect(self.rect()).min,
			blend_mode: self.blend_mode,
		}
	}
}

impl ChunkOperation for ImageOperation {
	fn bounds(&self) -> Option<IRect> {
		let rect = self.rect();
		(!rect.is_empty()).then_some(rect)
	}

	fn draw_on_chunk(&self, chunk: &mut Chunk, coordinate: ChunkCoordinate) {
		let rect = self.rect();
		if rect.intersect(&coordinate.pixel_rect()).is_none() {
			return;
		}
		chunk.map_pixels(coordinate, |position, color| {
			let pixel = position.floor().as_ivec2();
			if !rect.contains(pixel) {
				return color;
			}
			let local = (pixel - self.position).as_uvec2();
			match self.surface.get_pixel(local.x, local.y) {
				Some(source) => self.blend_mode.blend(color, source),
				None => color,
			}
		});
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::color::Color;
	use crate::resolution::Resolution;

	#[test]
	fn image_is_placed_at_position() {
		let mut surface = Surface::new(2, 1);
		surface.set_pixel(0, 0, Color::RED);
		surface.set_pixel(1, 0, Color::BLUE);
		let operation = ImageOperation::new(surface, IVec2::new(255, 0));

		let mut left = Chunk::transparent(Resolution::Full);
		operation.draw_on_chunk(&mut left, ChunkCoordinate::new(0, 0));
		assert_eq!(left.pixel(255, 0), Color::RED);

		let mut right = Chunk::transparent(Resolution::Full);
		operation.draw_on_chunk(&mut right, ChunkCoordinate::new(1, 0));
		assert_eq!(right.pixel(0, 0), Color::BLUE);
		assert_eq!(right.pixel(1, 0), Color::TRANSPARENT);
	}

	#[test]
	fn mirrored_image_is_flipped() {
		let mut surface = Surface::new(2, 1);
		surface.set_pixel(0, 0, Color::RED);
		let mirrored = ImageOperation::new(surface, IVec2::new(0, 0)).mirrored(SymmetryAxis::Vertical(5.));
		assert_eq!(mirrored.position, IVec2::new(8, 0));
		assert_eq!(mirrored.surface.get_pixel(1, 0), Some(Color::RED));
	}
}
