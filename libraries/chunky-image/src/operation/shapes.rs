use super::{ChunkOperation, Paint, SymmetryAxis};
use crate::chunk::{Chunk, ChunkCoordinate};
use crate::color::Color;
use crate::rect::IRect;
use glam::{DVec2, IVec2};

/// Paints every sample point of the chunk that lies inside `bounds` and passes `covers`.
fn paint_covered(chunk: &mut Chunk, coordinate: ChunkCoordinate, bounds: IRect, mut paint: impl FnMut(DVec2) -> Option<Paint>) {
	if bounds.intersect(&coordinate.pixel_rect()).is_none() {
		return;
	}
	let (min, max) = (bounds.min.as_dvec2(), bounds.max.as_dvec2());
	chunk.map_pixels(coordinate, |position, color| {
		if position.x < min.x || position.y < min.y || position.x >= max.x || position.y >= max.y {
			return color;
		}
		match paint(position) {
			Some(paint) => paint.apply(color),
			None => color,
		}
	});
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearRegionOperation {
	pub rect: IRect,
}

impl ClearRegionOperation {
	pub fn new(rect: IRect) -> Self {
		Self { rect }
	}

	pub fn mirrored(&self, axis: SymmetryAxis) -> Self {
		Self::new(axis.mirror_rect(self.rect))
	}
}

impl ChunkOperation for ClearRegionOperation {
	fn bounds(&self) -> Option<IRect> {
		(!self.rect.is_empty()).then_some(self.rect)
	}

	fn draw_on_chunk(&self, chunk: &mut Chunk, coordinate: ChunkCoordinate) {
		let clear = Paint::new(Color::TRANSPARENT).with_blend_mode(crate::color::BlendMode::Replace);
		paint_covered(chunk, coordinate, self.rect, |_| Some(clear));
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectangleOperation {
	pub rect: IRect,
	pub paint: Paint,
}

impl RectangleOperation {
	pub fn new(rect: IRect, paint: Paint) -> Self {
		Self { rect, paint }
	}

	pub fn mirrored(&self, axis: SymmetryAxis) -> Self {
		Self::new(axis.mirror_rect(self.rect), self.paint)
	}
}

impl ChunkOperation for RectangleOperation {
	fn bounds(&self) -> Option<IRect> {
		(!self.rect.is_empty()).then_some(self.rect)
	}

	fn draw_on_chunk(&self, chunk: &mut Chunk, coordinate: ChunkCoordinate) {
		paint_covered(chunk, coordinate, self.rect, |_| Some(self.paint));
	}
}

/// An axis aligned ellipse inscribed in `bounds`, with an optional fill and an optional inner stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipseOperation {
	pub bounds: IRect,
	pub fill: Option<Paint>,
	pub stroke: Option<Paint>,
	pub stroke_width: f64,
}

impl EllipseOperation {
	pub fn filled(bounds: IRect, fill: Paint) -> Self {
		Self {
			bounds,
			fill: Some(fill),
			stroke: None,
			stroke_width: 0.,
		}
	}

	pub fn with_stroke(self, stroke: Paint, stroke_width: f64) -> Self {
		Self {
			stroke: Some(stroke),
			stroke_width,
			..self
		}
	}

	pub fn mirrored(&self, axis: SymmetryAxis) -> Self {
		Self {
			bounds: axis.mirror_rect(self.bounds),
			..*self
		}
	}

	fn is_inside(center: DVec2, radii: DVec2, position: DVec2) -> bool {
		if radii.x <= 0. || radii.y <= 0. {
			return false;
		}
		let normalized = (position - center) / radii;
		normalized.length_squared() <= 1.
	}
}

impl ChunkOperation for EllipseOperation {
	fn bounds(&self) -> Option<IRect> {
		let has_stroke = self.stroke.is_some() && self.stroke_width > 0.;
		if self.bounds.is_empty() || !self.stroke_width.is_finite() || (self.fill.is_none() && !has_stroke) {
			return None;
		}
		Some(self.bounds)
	}

	fn draw_on_chunk(&self, chunk: &mut Chunk, coordinate: ChunkCoordinate) {
		let center = (self.bounds.min.as_dvec2() + self.bounds.max.as_dvec2()) / 2.;
		let radii = self.bounds.size().as_dvec2() / 2.;
		let stroke = self.stroke.filter(|_| self.stroke_width > 0.);
		let inner_radii = radii - stroke.map_or(0., |_| self.stroke_width);

		paint_covered(chunk, coordinate, self.bounds, |position| {
			if !Self::is_inside(center, radii, position) {
				None
			} else if stroke.is_some() && !Self::is_inside(center, inner_radii, position) {
				stroke
			} else {
				self.fill
			}
		});
	}
}

/// A round-capped polyline.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeOperation {
	pub points: Vec<DVec2>,
	pub width: f64,
	pub paint: Paint,
}

impl StrokeOperation {
	pub fn new(points: Vec<DVec2>, width: f64, paint: Paint) -> Self {
		Self { points, width, paint }
	}

	pub fn mirrored(&self, axis: SymmetryAxis) -> Self {
		Self {
			points: self.points.iter().map(|&point| axis.mirror_point(point)).collect(),
			..self.clone()
		}
	}

	fn distance_squared_to_segment(point: DVec2, start: DVec2, end: DVec2) -> f64 {
		let segment = end - start;
		let length_squared = segment.length_squared();
		if length_squared == 0. {
			return point.distance_squared(start);
		}
		let t = ((point - start).dot(segment) / length_squared).clamp(0., 1.);
		point.distance_squared(start + segment * t)
	}

	/// Segments whose round-capped outline can reach into `area`. A single point is a zero length segment.
	fn segments_near(&self, area: IRect) -> Vec<(DVec2, DVec2)> {
		let radius = self.width / 2.;
		let (area_min, area_max) = (area.min.as_dvec2() - radius, area.max.as_dvec2() + radius);
		let reaches = |&(start, end): &(DVec2, DVec2)| {
			let (min, max) = (start.min(end), start.max(end));
			min.x <= area_max.x && min.y <= area_max.y && max.x >= area_min.x && max.y >= area_min.y
		};
		match self.points.as_slice() {
			[single] => vec![(*single, *single)],
			points => points.windows(2).map(|pair| (pair[0], pair[1])).collect(),
		}
		.into_iter()
		.filter(reaches)
		.collect()
	}
}

impl ChunkOperation for StrokeOperation {
	fn bounds(&self) -> Option<IRect> {
		if self.points.is_empty() || !(self.width > 0.) || !self.width.is_finite() || self.points.iter().any(|point| !point.is_finite()) {
			return None;
		}
		let radius = self.width / 2.;
		let min = self.points.iter().fold(DVec2::INFINITY, |acc, &point| acc.min(point)) - radius;
		let max = self.points.iter().fold(DVec2::NEG_INFINITY, |acc, &point| acc.max(point)) + radius;
		IRect::from_float_bounds(min, max).filter(|rect| !rect.is_empty())
	}

	fn draw_on_chunk(&self, chunk: &mut Chunk, coordinate: ChunkCoordinate) {
		let Some(bounds) = self.bounds() else { return };
		let segments = self.segments_near(coordinate.pixel_rect());
		if segments.is_empty() {
			return;
		}
		let radius_squared = (self.width / 2.).powi(2);
		paint_covered(chunk, coordinate, bounds, |position| {
			segments
				.iter()
				.any(|&(start, end)| Self::distance_squared_to_segment(position, start, end) <= radius_squared)
				.then_some(self.paint)
		});
	}
}

/// Individual full resolution pixels painted with one color.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelsOperation {
	pub positions: Vec<IVec2>,
	pub paint: Paint,
}

impl PixelsOperation {
	pub fn new(positions: Vec<IVec2>, paint: Paint) -> Self {
		Self { positions, paint }
	}

	pub fn mirrored(&self, axis: SymmetryAxis) -> Self {
		Self {
			positions: self.positions.iter().map(|&pixel| axis.mirror_pixel(pixel)).collect(),
			paint: self.paint,
		}
	}
}

impl ChunkOperation for PixelsOperation {
	fn bounds(&self) -> Option<IRect> {
		let pixel = |position: &IVec2| IRect::from_position_size(*position, IVec2::ONE);
		let first = self.positions.first().map(pixel)?;
		Some(self.positions.iter().skip(1).fold(first, |acc, position| acc.union(&pixel(position))))
	}

	fn draw_on_chunk(&self, chunk: &mut Chunk, coordinate: ChunkCoordinate) {
		let area = coordinate.pixel_rect();
		let positions: rustc_hash::FxHashSet<IVec2> = self.positions.iter().copied().filter(|&position| area.contains(position)).collect();
		if positions.is_empty() {
			return;
		}
		chunk.map_pixels(coordinate, |position, color| if positions.contains(&position.floor().as_ivec2()) { self.paint.apply(color) } else { color });
	}
}
