use crate::color::Color;
use crate::consts::FULL_CHUNK_SIZE;
use crate::rect::IRect;
use crate::resolution::Resolution;
use crate::surface::Surface;
use glam::{DVec2, IVec2, UVec2};

/// Position of a chunk in the chunk grid. The same coordinate addresses the same region of the image at every resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoordinate {
	pub x: i32,
	pub y: i32,
}

impl ChunkCoordinate {
	pub const fn new(x: i32, y: i32) -> Self {
		Self { x, y }
	}

	/// The chunk containing a full resolution pixel.
	pub fn containing(pixel: IVec2) -> Self {
		let size = FULL_CHUNK_SIZE as i32;
		Self::new(pixel.x.div_euclid(size), pixel.y.div_euclid(size))
	}

	/// Full resolution position of the chunk's top left pixel, clamped to the `i32` pixel space.
	pub fn origin(&self) -> IVec2 {
		let size = FULL_CHUNK_SIZE as i32;
		IVec2::new(self.x.saturating_mul(size), self.y.saturating_mul(size))
	}

	/// The full resolution pixels covered by this chunk. Empty for chunks beyond the `i32` pixel space.
	pub fn pixel_rect(&self) -> IRect {
		let size = FULL_CHUNK_SIZE as i32;
		let min = self.origin();
		IRect::from_corners(min, IVec2::new(min.x.saturating_add(size), min.y.saturating_add(size)))
	}

	/// Whether this chunk overlaps the image or document of the given size, compared in chunk indices so extreme coordinates cannot wrap.
	pub fn is_within(&self, size: UVec2) -> bool {
		let columns = size.x.div_ceil(FULL_CHUNK_SIZE);
		let rows = size.y.div_ceil(FULL_CHUNK_SIZE);
		u32::try_from(self.x).is_ok_and(|x| x < columns) && u32::try_from(self.y).is_ok_and(|y| y < rows)
	}

	/// Every chunk overlapping a full resolution rect.
	pub fn covering(rect: &IRect) -> impl Iterator<Item = ChunkCoordinate> + use<> {
		let (first, last) = if rect.is_empty() { (IVec2::ONE, IVec2::ZERO) } else { rect.cell_range(FULL_CHUNK_SIZE as i32) };
		(first.y..=last.y).flat_map(move |y| (first.x..=last.x).map(move |x| ChunkCoordinate::new(x, y)))
	}

	/// Full resolution sample position for pixel `(x, y)` of this chunk at `resolution`.
	/// Lower levels sample the center of the first full resolution pixel their pixel covers.
	#[inline(always)]
	pub fn sample_position(&self, resolution: Resolution, x: u32, y: u32) -> DVec2 {
		let divisor = resolution.divisor();
		self.origin().as_dvec2() + DVec2::new((x * divisor) as f64, (y * divisor) as f64) + 0.5
	}
}

impl From<IVec2> for ChunkCoordinate {
	fn from(value: IVec2) -> Self {
		Self::new(value.x, value.y)
	}
}

impl core::fmt::Display for ChunkCoordinate {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		write!(f, "({}, {})", self.x, self.y)
	}
}

/// A square tile of pixels for one coordinate at one resolution.
///
/// Committed chunks are shared behind an `Arc` and never mutated in place; drawing into one clones it first.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
	resolution: Resolution,
	surface: Surface,
}

impl Chunk {
	pub fn transparent(resolution: Resolution) -> Self {
		Self::filled(resolution, Color::TRANSPARENT)
	}

	pub fn filled(resolution: Resolution, color: Color) -> Self {
		let size = resolution.pixel_size();
		Self {
			resolution,
			surface: Surface::filled(size, size, color),
		}
	}

	/// Wraps a surface whose dimensions match the chunk size of `resolution`.
	pub fn from_surface(resolution: Resolution, surface: Surface) -> Option<Self> {
		let size = resolution.pixel_size();
		(surface.width() == size && surface.height() == size).then_some(Self { resolution, surface })
	}

	pub fn resolution(&self) -> Resolution {
		self.resolution
	}

	pub fn pixel_size(&self) -> u32 {
		self.resolution.pixel_size()
	}

	pub fn surface(&self) -> &Surface {
		&self.surface
	}

	pub fn surface_mut(&mut self) -> &mut Surface {
		&mut self.surface
	}

	pub fn pixel(&self, x: u32, y: u32) -> Color {
		self.surface.get_pixel(x, y).unwrap_or_default()
	}

	pub fn is_fully_transparent(&self) -> bool {
		self.surface.is_fully_transparent()
	}

	/// One 2× box-downsample step, or `None` at the lowest level.
	pub fn downsample(&self) -> Option<Chunk> {
		let resolution = self.resolution.lower()?;
		Some(Chunk {
			resolution,
			surface: self.surface.downsample(),
		})
	}

	/// Builds the chunk one level below without checking that `resolution` is that level.
	pub(crate) fn derive_lower(&self, resolution: Resolution) -> Chunk {
		Chunk {
			resolution,
			surface: self.surface.downsample(),
		}
	}

	/// Applies `f` to every pixel together with its full resolution sample position.
	pub fn map_pixels(&mut self, coordinate: ChunkCoordinate, mut f: impl FnMut(DVec2, Color) -> Color) {
		let size = self.pixel_size();
		for y in 0..size {
			for x in 0..size {
				let position = coordinate.sample_position(self.resolution, x, y);
				if let Some(pixel) = self.surface.get_pixel_mut(x, y) {
					*pixel = f(position, *pixel);
				}
			}
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn covering_lists_every_overlapped_chunk() {
		let rect = IRect::from_corners(IVec2::new(-10, 0), IVec2::new(300, 10));
		let chunks: Vec<_> = ChunkCoordinate::covering(&rect).collect();
		assert_eq!(chunks, vec![ChunkCoordinate::new(-1, 0), ChunkCoordinate::new(0, 0), ChunkCoordinate::new(1, 0)]);
		assert_eq!(ChunkCoordinate::covering(&IRect::default()).count(), 0);
	}

	#[test]
	fn sample_positions_scale_with_resolution() {
		let coordinate = ChunkCoordinate::new(1, 0);
		assert_eq!(coordinate.sample_position(Resolution::Full, 3, 0), DVec2::new(259.5, 0.5));
		assert_eq!(coordinate.sample_position(Resolution::Eighth, 1, 1), DVec2::new(264.5, 8.5));
	}

	#[test]
	fn extreme_coordinates_do_not_wrap() {
		let far = ChunkCoordinate::new(16_777_216, 0);
		assert_eq!(far.origin(), IVec2::new(i32::MAX, 0));
		assert!(far.pixel_rect().is_empty());
		assert!(ChunkCoordinate::new(i32::MIN, i32::MIN).pixel_rect().is_empty());
		assert_eq!(ChunkCoordinate::new(-8_388_608, 0).origin(), IVec2::new(i32::MIN, 0));

		let size = UVec2::new(300, 100);
		assert!(ChunkCoordinate::new(1, 0).is_within(size));
		assert!(!ChunkCoordinate::new(2, 0).is_within(size));
		assert!(!ChunkCoordinate::new(0, 1).is_within(size));
		assert!(!far.is_within(size));
		assert!(!ChunkCoordinate::new(i32::MIN, 0).is_within(size));
		assert!(!ChunkCoordinate::new(0, 0).is_within(UVec2::ZERO));
		assert!(ChunkCoordinate::new(16_777_215, 0).is_within(UVec2::new(u32::MAX, 1)));
	}

	#[test]
	fn downsample_stops_at_eighth() {
		let chunk = Chunk::filled(Resolution::Quarter, Color::RED);
		let eighth = chunk.downsample().unwrap();
		assert_eq!(eighth, Chunk::filled(Resolution::Eighth, Color::RED));
		assert!(eighth.downsample().is_none());
	}
}
