use crate::color::{BlendMode, Color};
use crate::rect::IRect;
use glam::{IVec2, UVec2};

/// A caller-owned block of pixels that regions of an image can be drawn onto.
#[derive(Clone, PartialEq, Default)]
pub struct Surface {
	width: u32,
	height: u32,
	data: Vec<Color>,
}

impl core::fmt::Debug for Surface {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		let length = self.data.len();
		f.debug_struct("Surface")
			.field("width", &self.width)
			.field("height", &self.height)
			.field("data", if length < 100 { &self.data } else { &length })
			.finish()
	}
}

impl Surface {
	pub fn new(width: u32, height: u32) -> Self {
		Self::filled(width, height, Color::TRANSPARENT)
	}

	pub fn filled(width: u32, height: u32, color: Color) -> Self {
		Self {
			width,
			height,
			data: vec![color; width as usize * height as usize],
		}
	}

	/// Wraps existing pixel data, returning `None` when the length does not match the dimensions.
	pub fn from_data(width: u32, height: u32, data: Vec<Color>) -> Option<Self> {
		(data.len() == width as usize * height as usize).then_some(Self { width, height, data })
	}

	pub fn width(&self) -> u32 {
		self.width
	}

	pub fn height(&self) -> u32 {
		self.height
	}

	pub fn size(&self) -> UVec2 {
		UVec2::new(self.width, self.height)
	}

	pub fn bounds(&self) -> IRect {
		IRect::from_size(self.size())
	}

	pub fn data(&self) -> &[Color] {
		&self.data
	}

	#[inline(always)]
	fn index(&self, x: u32, y: u32) -> Option<usize> {
		(x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
	}

	#[inline(always)]
	pub fn get_pixel(&self, x: u32, y: u32) -> Option<Color> {
		self.index(x, y).map(|index| self.data[index])
	}

	#[inline(always)]
	pub fn get_pixel_mut(&mut self, x: u32, y: u32) -> Option<&mut Color> {
		self.index(x, y).map(|index| &mut self.data[index])
	}

	pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) {
		if let Some(pixel) = self.get_pixel_mut(x, y) {
			*pixel = color;
		}
	}

	pub fn fill(&mut self, color: Color) {
		self.data.fill(color);
	}

	pub fn is_fully_transparent(&self) -> bool {
		self.data.iter().all(Color::is_transparent)
	}

	/// Bounding rect of all pixels with nonzero alpha.
	pub fn opaque_bounds(&self) -> Option<IRect> {
		let mut bounds: Option<IRect> = None;
		for y in 0..self.height {
			for x in 0..self.width {
				if self.data[y as usize * self.width as usize + x as usize].is_transparent() {
					continue;
				}
				let pixel = IRect::from_position_size(IVec2::new(x as i32, y as i32), IVec2::ONE);
				bounds = Some(bounds.map_or(pixel, |bounds| bounds.union(&pixel)));
			}
		}
		bounds
	}

	/// Halves both dimensions by averaging each 2×2 block. Odd trailing rows and columns reuse their edge pixels.
	pub fn downsample(&self) -> Surface {
		let width = self.width.div_ceil(2);
		let height = self.height.div_ceil(2);
		let mut data = Vec::with_capacity(width as usize * height as usize);
		let sample = |x: u32, y: u32| self.data[y.min(self.height - 1) as usize * self.width as usize + x.min(self.width - 1) as usize];
		for y in 0..height {
			for x in 0..width {
				let (sx, sy) = (x * 2, y * 2);
				data.push(Color::average([sample(sx, sy), sample(sx + 1, sy), sample(sx, sy + 1), sample(sx + 1, sy + 1)]));
			}
		}
		Surface { width, height, data }
	}

	/// Blends `source_rect` of this surface onto `target` with its top left corner at `destination`, clipped to the target.
	pub fn draw_on(&self, source_rect: IRect, target: &mut Surface, destination: IVec2, blend_mode: BlendMode) {
		let Some(source_rect) = source_rect.intersect(&self.bounds()) else { return };
		let target_rect = IRect::from_position_size(destination, source_rect.size());
		let Some(clipped) = target_rect.intersect(&target.bounds()) else { return };
		let source_offset = source_rect.min - destination;

		for y in clipped.min.y..clipped.max.y {
			for x in clipped.min.x..clipped.max.x {
				let source = IVec2::new(x, y) + source_offset;
				let color = self.data[source.y as usize * self.width as usize + source.x as usize];
				if let Some(pixel) = target.get_pixel_mut(x as u32, y as u32) {
					*pixel = blend_mode.blend(*pixel, color);
				}
			}
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn downsample_averages_blocks() {
		let mut surface = Surface::new(4, 2);
		surface.set_pixel(0, 0, Color::WHITE);
		surface.set_pixel(1, 1, Color::WHITE);
		let half = surface.downsample();
		assert_eq!(half.size(), UVec2::new(2, 1));
		assert_eq!(half.get_pixel(0, 0), Some(Color::WHITE.multiply_alpha(0.5)));
		assert_eq!(half.get_pixel(1, 0), Some(Color::TRANSPARENT));
	}

	#[test]
	fn draw_on_clips_to_target() {
		let source = Surface::filled(4, 4, Color::RED);
		let mut target = Surface::new(3, 3);
		source.draw_on(source.bounds(), &mut target, IVec2::new(1, 1), BlendMode::Normal);
		assert_eq!(target.get_pixel(0, 0), Some(Color::TRANSPARENT));
		assert_eq!(target.get_pixel(2, 2), Some(Color::RED));
		assert_eq!(target.opaque_bounds(), Some(IRect::from_corners(IVec2::ONE, IVec2::splat(3))));
	}
}
