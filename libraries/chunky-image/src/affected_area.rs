use crate::chunk::ChunkCoordinate;
use crate::mirror::ResolutionMirrorSet;
use crate::operation::DrawOperation;
use crate::rect::IRect;
use glam::UVec2;
use rustc_hash::FxHashSet;

/// The chunks a change touches together with the pixel rect enclosing it.
///
/// Render caches use the chunk set to decide which coordinates must be re-rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AffectedArea {
	chunks: FxHashSet<ChunkCoordinate>,
	global_area: Option<IRect>,
}

impl AffectedArea {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_rect(rect: IRect) -> Self {
		if rect.is_empty() {
			return Self::default();
		}
		Self {
			chunks: ChunkCoordinate::covering(&rect).collect(),
			global_area: Some(rect),
		}
	}

	pub fn from_chunks(chunks: impl IntoIterator<Item = ChunkCoordinate>) -> Self {
		let mut area = Self::default();
		for coordinate in chunks {
			area.insert_chunk(coordinate);
		}
		area
	}

	/// The area an operation changes on an image of `image_size` whose chunks with content are `existing`.
	pub fn for_operation(operation: &DrawOperation, image_size: UVec2, existing: impl IntoIterator<Item = ChunkCoordinate>) -> Self {
		let image = IRect::from_size(image_size);
		match operation {
			DrawOperation::Clear => Self::from_chunks(existing),
			DrawOperation::Resize(size) => {
				let kept = IRect::from_size(*size);
				Self::from_chunks(existing.into_iter().filter(|coordinate| !kept.contains_rect(&coordinate.pixel_rect())))
			}
			DrawOperation::FloodFill(fill) => Self::from_chunks(fill.mask.chunks()).clipped_to(image),
			DrawOperation::Flip(flip) => Self::from_chunks(flip.affected_chunks()).clipped_to(image),
			_ => operation.bounds().and_then(|bounds| bounds.intersect(&image)).map(Self::from_rect).unwrap_or_default(),
		}
	}

	/// Coordinates whose chunk differs between two committed states: present in only one of them, or replaced.
	pub fn diff(before: &ResolutionMirrorSet, after: &ResolutionMirrorSet) -> Self {
		let changed = before.coordinates().filter(|&coordinate| !after.shares_chunk(before, coordinate));
		let added = after.coordinates().filter(|&coordinate| !before.contains(coordinate));
		Self::from_chunks(changed.chain(added))
	}

	fn insert_chunk(&mut self, coordinate: ChunkCoordinate) {
		let rect = coordinate.pixel_rect();
		self.global_area = Some(self.global_area.map_or(rect, |area| area.union(&rect)));
		self.chunks.insert(coordinate);
	}

	/// Drops chunks outside `bounds` and shrinks the global area to it.
	pub fn clipped_to(mut self, bounds: IRect) -> Self {
		self.chunks.retain(|coordinate| coordinate.pixel_rect().intersect(&bounds).is_some());
		self.global_area = if self.chunks.is_empty() { None } else { self.global_area.and_then(|area| area.intersect(&bounds)) };
		self
	}

	pub fn union_with(&mut self, other: &AffectedArea) {
		self.chunks.extend(other.chunks.iter().copied());
		self.global_area = match (self.global_area, other.global_area) {
			(Some(a), Some(b)) => Some(a.union(&b)),
			(a, b) => a.or(b),
		};
	}

	#[must_use]
	pub fn union(mut self, other: &AffectedArea) -> Self {
		self.union_with(other);
		self
	}

	pub fn contains(&self, coordinate: ChunkCoordinate) -> bool {
		self.chunks.contains(&coordinate)
	}

	pub fn is_empty(&self) -> bool {
		self.chunks.is_empty()
	}

	pub fn len(&self) -> usize {
		self.chunks.len()
	}

	pub fn chunks(&self) -> impl Iterator<Item = ChunkCoordinate> + '_ {
		self.chunks.iter().copied()
	}

	/// Chunks in row-major order.
	pub fn sorted_chunks(&self) -> Vec<ChunkCoordinate> {
		let mut chunks: Vec<_> = self.chunks().collect();
		chunks.sort_by_key(|coordinate| (coordinate.y, coordinate.x));
		chunks
	}

	pub fn global_area(&self) -> Option<IRect> {
		self.global_area
	}
}

impl FromIterator<ChunkCoordinate> for AffectedArea {
	fn from_iter<T: IntoIterator<Item = ChunkCoordinate>>(iter: T) -> Self {
		Self::from_chunks(iter)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::chunk::Chunk;
	use crate::color::Color;
	use crate::operation::{Paint, RectangleOperation};
	use crate::resolution::Resolution;
	use glam::IVec2;
	use std::sync::Arc;

	#[test]
	fn operation_area_is_clipped_to_image() {
		let rect = RectangleOperation::new(IRect::from_corners(IVec2::new(-100, 10), IVec2::new(600, 20)), Paint::new(Color::RED));
		let area = AffectedArea::for_operation(&rect.into(), UVec2::new(300, 300), []);
		assert_eq!(area.sorted_chunks(), vec![ChunkCoordinate::new(0, 0), ChunkCoordinate::new(1, 0)]);
		assert_eq!(area.global_area(), Some(IRect::from_corners(IVec2::new(0, 10), IVec2::new(300, 20))));
	}

	#[test]
	fn resize_affects_only_cut_chunks() {
		let existing = [ChunkCoordinate::new(0, 0), ChunkCoordinate::new(1, 0), ChunkCoordinate::new(2, 0)];
		let area = AffectedArea::for_operation(&DrawOperation::Resize(UVec2::new(300, 256)), UVec2::new(768, 256), existing);
		assert_eq!(area.sorted_chunks(), vec![ChunkCoordinate::new(1, 0), ChunkCoordinate::new(2, 0)]);
	}

	#[test]
	fn diff_reports_replaced_added_and_removed_chunks() {
		let chunk = |color| Arc::new(Chunk::filled(Resolution::Full, color));
		let mut before = ResolutionMirrorSet::default();
		before.insert_full(ChunkCoordinate::new(0, 0), chunk(Color::RED));
		before.insert_full(ChunkCoordinate::new(1, 0), chunk(Color::RED));
		before.insert_full(ChunkCoordinate::new(2, 0), chunk(Color::RED));

		let mut after = before.clone();
		after.insert_full(ChunkCoordinate::new(0, 0), chunk(Color::BLUE));
		after.remove(ChunkCoordinate::new(1, 0));
		after.insert_full(ChunkCoordinate::new(3, 0), chunk(Color::BLUE));

		let diff = AffectedArea::diff(&before, &after);
		assert_eq!(diff.sorted_chunks(), vec![ChunkCoordinate::new(0, 0), ChunkCoordinate::new(1, 0), ChunkCoordinate::new(3, 0)]);
	}
}
