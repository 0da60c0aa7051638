use glam::{DVec2, IVec2, UVec2};

/// An axis aligned integer rectangle in pixel space. `min` is inclusive and `max` is exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct IRect {
	pub min: IVec2,
	pub max: IVec2,
}

impl IRect {
	/// Create a rect from two corners in any order.
	#[must_use]
	pub fn from_corners(a: IVec2, b: IVec2) -> Self {
		Self { min: a.min(b), max: a.max(b) }
	}

	#[must_use]
	pub fn from_position_size(position: IVec2, size: IVec2) -> Self {
		Self {
			min: position,
			max: position + size,
		}
	}

	#[must_use]
	pub fn from_size(size: UVec2) -> Self {
		Self {
			min: IVec2::ZERO,
			max: size.as_ivec2(),
		}
	}

	/// Smallest rect containing every sample point of a continuous region, returning `None` for non-finite input.
	#[must_use]
	pub fn from_float_bounds(min: DVec2, max: DVec2) -> Option<Self> {
		if !min.is_finite() || !max.is_finite() {
			return None;
		}
		let (low, high) = (min.min(max), min.max(max));
		Some(Self {
			min: low.floor().as_ivec2(),
			max: high.ceil().as_ivec2(),
		})
	}

	#[must_use]
	pub fn width(&self) -> i32 {
		self.max.x - self.min.x
	}

	#[must_use]
	pub fn height(&self) -> i32 {
		self.max.y - self.min.y
	}

	#[must_use]
	pub fn size(&self) -> IVec2 {
		self.max - self.min
	}

	/// A rect with no area covers no pixels.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.max.x <= self.min.x || self.max.y <= self.min.y
	}

	#[must_use]
	pub fn contains(&self, point: IVec2) -> bool {
		point.x >= self.min.x && point.y >= self.min.y && point.x < self.max.x && point.y < self.max.y
	}

	#[must_use]
	pub fn contains_rect(&self, other: &IRect) -> bool {
		other.min.x >= self.min.x && other.min.y >= self.min.y && other.max.x <= self.max.x && other.max.y <= self.max.y
	}

	#[must_use]
	pub fn intersect(&self, other: &IRect) -> Option<IRect> {
		let rect = IRect {
			min: self.min.max(other.min),
			max: self.max.min(other.max),
		};
		(!rect.is_empty()).then_some(rect)
	}

	/// Take the outside bounds of two rects.
	#[must_use]
	pub fn union(&self, other: &IRect) -> IRect {
		IRect {
			min: self.min.min(other.min),
			max: self.max.max(other.max),
		}
	}

	#[must_use]
	pub fn translate(&self, offset: IVec2) -> IRect {
		IRect {
			min: self.min + offset,
			max: self.max + offset,
		}
	}

	#[must_use]
	pub fn expand_by(&self, amount: i32) -> IRect {
		IRect {
			min: self.min - amount,
			max: self.max + amount,
		}
	}

	/// Inclusive range of grid cells of size `cell` that this rect overlaps.
	#[must_use]
	pub fn cell_range(&self, cell: i32) -> (IVec2, IVec2) {
		let first = IVec2::new(self.min.x.div_euclid(cell), self.min.y.div_euclid(cell));
		let last = IVec2::new((self.max.x - 1).div_euclid(cell), (self.max.y - 1).div_euclid(cell));
		(first, last)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn intersection_of_disjoint_rects_is_none() {
		let a = IRect::from_position_size(IVec2::ZERO, IVec2::splat(10));
		let b = IRect::from_position_size(IVec2::splat(10), IVec2::splat(10));
		assert_eq!(a.intersect(&b), None);
		assert_eq!(a.union(&b), IRect::from_position_size(IVec2::ZERO, IVec2::splat(20)));
	}

	#[test]
	fn cell_range_handles_negative_coordinates() {
		let rect = IRect::from_corners(IVec2::new(-1, -300), IVec2::new(256, 1));
		assert_eq!(rect.cell_range(256), (IVec2::new(-1, -2), IVec2::new(0, 0)));
	}
}
