use crate::context::RenderingContext;
use crate::error::RenderFailure;
use crate::execution::RenderScope;
use crate::node_property::{InputProperty, OutputProperty, PortType, PortValue, Texture};
use chunky_image::{BlendMode, Chunk, ChunkyImage, ChunkyImageHandle, Color};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl core::fmt::Display for NodeId {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// The closed set of node behaviors.
#[derive(Debug)]
pub enum NodeKind {
	/// The terminal node whose background is the rendered chunk.
	Output,
	/// Composites the most up to date content of an owned image over its background.
	ImageLayer(ChunkyImage),
	Merge,
	SolidColor,
	Tint,
	ApplyMask,
	Time,
}

impl NodeKind {
	pub fn name(&self) -> &'static str {
		match self {
			NodeKind::Output => "Output",
			NodeKind::ImageLayer(_) => "Image Layer",
			NodeKind::Merge => "Merge",
			NodeKind::SolidColor => "Solid Color",
			NodeKind::Tint => "Tint",
			NodeKind::ApplyMask => "Apply Mask",
			NodeKind::Time => "Time",
		}
	}

	/// A deep copy with fresh identity. Owned images restart from their committed state.
	fn clone_state(&self) -> NodeKind {
		match self {
			NodeKind::Output => NodeKind::Output,
			NodeKind::ImageLayer(image) => NodeKind::ImageLayer(image.clone_from_committed()),
			NodeKind::Merge => NodeKind::Merge,
			NodeKind::SolidColor => NodeKind::SolidColor,
			NodeKind::Tint => NodeKind::Tint,
			NodeKind::ApplyMask => NodeKind::ApplyMask,
			NodeKind::Time => NodeKind::Time,
		}
	}

	fn default_inputs(&self) -> Vec<InputProperty> {
		let blend_mode = || InputProperty::new("Blend Mode", PortType::BlendMode, Some(PortValue::BlendMode(BlendMode::Normal)));
		let opacity = || InputProperty::new("Opacity", PortType::Float, Some(PortValue::Float(1.)));
		match self {
			NodeKind::Output => vec![InputProperty::new("Background", PortType::Texture, None).required()],
			NodeKind::ImageLayer(_) => vec![
				InputProperty::new("Background", PortType::Texture, None),
				opacity(),
				blend_mode(),
				InputProperty::new("Visible", PortType::Bool, Some(PortValue::Bool(true))),
			],
			NodeKind::Merge => vec![
				InputProperty::new("Background", PortType::Texture, None),
				InputProperty::new("Foreground", PortType::Texture, None),
				blend_mode(),
				opacity(),
			],
			NodeKind::SolidColor => vec![InputProperty::new("Color", PortType::Color, Some(PortValue::Color(Color::BLACK)))],
			NodeKind::Tint => vec![
				InputProperty::new("Input", PortType::Texture, None).required(),
				InputProperty::new("Color", PortType::Color, Some(PortValue::Color(Color::WHITE))),
			],
			NodeKind::ApplyMask => vec![
				InputProperty::new("Input", PortType::Texture, None).required(),
				InputProperty::new("Mask", PortType::Image, None),
				InputProperty::new("Invert", PortType::Bool, Some(PortValue::Bool(false))),
			],
			NodeKind::Time => Vec::new(),
		}
	}

	fn default_outputs(&self) -> Vec<OutputProperty> {
		match self {
			NodeKind::Time => vec![OutputProperty::new("Normalized Time", PortType::Float), OutputProperty::new("Frame", PortType::Int)],
			_ => vec![OutputProperty::new("Output", PortType::Texture)],
		}
	}
}

/// The fingerprint a node's outputs were computed under.
#[derive(Debug, Clone)]
pub(crate) struct CacheRecord {
	pub fingerprint: u64,
	pub outputs: Vec<PortValue>,
}

/// A unit of computation with typed ports and a single-entry memo of its last result.
#[derive(Debug)]
pub struct Node {
	kind: NodeKind,
	inputs: Vec<InputProperty>,
	outputs: Vec<OutputProperty>,
	cache: Mutex<Option<CacheRecord>>,
}

impl Node {
	pub fn new(kind: NodeKind) -> Self {
		Self {
			inputs: kind.default_inputs(),
			outputs: kind.default_outputs(),
			kind,
			cache: Mutex::new(None),
		}
	}

	pub fn output() -> Self {
		Self::new(NodeKind::Output)
	}

	pub fn image_layer(image: ChunkyImage) -> Self {
		Self::new(NodeKind::ImageLayer(image))
	}

	pub fn merge() -> Self {
		Self::new(NodeKind::Merge)
	}

	pub fn solid_color(color: Color) -> Self {
		let mut node = Self::new(NodeKind::SolidColor);
		node.inputs[0].value = Some(PortValue::Color(color));
		node
	}

	pub fn tint(color: Color) -> Self {
		let mut node = Self::new(NodeKind::Tint);
		node.inputs[1].value = Some(PortValue::Color(color));
		node
	}

	pub fn apply_mask(mask: Option<ChunkyImageHandle>) -> Self {
		let mut node = Self::new(NodeKind::ApplyMask);
		node.inputs[1].value = mask.map(PortValue::Image);
		node
	}

	pub fn time() -> Self {
		Self::new(NodeKind::Time)
	}

	pub fn kind(&self) -> &NodeKind {
		&self.kind
	}

	pub fn name(&self) -> &'static str {
		self.kind.name()
	}

	pub fn inputs(&self) -> &[InputProperty] {
		&self.inputs
	}

	pub fn outputs(&self) -> &[OutputProperty] {
		&self.outputs
	}

	pub fn input_index(&self, name: &str) -> Option<usize> {
		self.inputs.iter().position(|input| input.name == name)
	}

	pub fn output_index(&self, name: &str) -> Option<usize> {
		self.outputs.iter().position(|output| output.name == name)
	}

	pub(crate) fn set_input_value(&mut self, index: usize, value: Option<PortValue>) {
		if let Some(input) = self.inputs.get_mut(index) {
			input.value = value;
		}
	}

	pub fn image(&self) -> Option<&ChunkyImage> {
		match &self.kind {
			NodeKind::ImageLayer(image) => Some(image),
			_ => None,
		}
	}

	pub fn image_mut(&mut self) -> Option<&mut ChunkyImage> {
		match &mut self.kind {
			NodeKind::ImageLayer(image) => Some(image),
			_ => None,
		}
	}

	/// Deep copy with fresh identity and an empty cache.
	pub fn clone_state(&self) -> Node {
		Node {
			kind: self.kind.clone_state(),
			inputs: self.inputs.clone(),
			outputs: self.outputs.clone(),
			cache: Mutex::new(None),
		}
	}

	/// Releases the cache and any owned image.
	pub fn dispose(&mut self) {
		if let NodeKind::ImageLayer(image) = &mut self.kind {
			image.dispose();
		}
		self.clear_cache();
	}

	pub fn clear_cache(&self) {
		self.cache.lock().unwrap_or_else(PoisonError::into_inner).take();
	}

	pub fn has_cached_result(&self) -> bool {
		self.cache.lock().unwrap_or_else(PoisonError::into_inner).is_some()
	}

	pub(crate) fn cached_outputs(&self, fingerprint: u64) -> Option<Vec<PortValue>> {
		let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
		cache.as_ref().filter(|record| record.fingerprint == fingerprint).map(|record| record.outputs.clone())
	}

	pub(crate) fn store_cache(&self, record: CacheRecord) {
		*self.cache.lock().unwrap_or_else(PoisonError::into_inner) = Some(record);
	}

	/// Hash of the node's own state for the chunk being rendered, beyond its input values.
	pub(crate) fn state_hash(&self, context: &RenderingContext, scope: &RenderScope) -> Result<Option<u64>, RenderFailure> {
		let mut hasher = FxHasher::default();
		core::mem::discriminant(&self.kind).hash(&mut hasher);
		if let NodeKind::ImageLayer(image) = &self.kind {
			scope.reader(&image.handle())?.version_at(context.chunk)?.hash(&mut hasher);
		}
		Ok(Some(hasher.finish()))
	}

	/// Computes the outputs from resolved input values, one per input port.
	pub(crate) fn execute(&self, id: NodeId, inputs: &[Option<PortValue>], context: &RenderingContext, scope: &RenderScope) -> Result<Vec<PortValue>, RenderFailure> {
		let inputs = Inputs { node: id, values: inputs };
		let resolution = context.resolution;

		let output = match &self.kind {
			NodeKind::Output => inputs.texture(0)?.cloned().unwrap_or_else(|| Texture::transparent(resolution)),
			NodeKind::ImageLayer(image) => {
				let background = inputs.texture(0)?;
				let opacity = inputs.float(1)?.unwrap_or(1.);
				let blend_mode = inputs.blend_mode(2)?.unwrap_or_default();
				let visible = inputs.bool(3)?.unwrap_or(true);

				let layer = if visible { scope.reader(&image.handle())?.most_up_to_date_chunk(context.chunk, resolution)? } else { None };
				match layer {
					Some(layer) => Texture::new(composite(background, &layer, blend_mode, opacity, context)),
					None => background.cloned().unwrap_or_else(|| Texture::transparent(resolution)),
				}
			}
			NodeKind::Merge => {
				let background = inputs.texture(0)?;
				let foreground = inputs.texture(1)?;
				let blend_mode = inputs.blend_mode(2)?.unwrap_or_default();
				let opacity = inputs.float(3)?.unwrap_or(1.);
				match foreground {
					Some(foreground) => Texture::new(composite(background, foreground.chunk(), blend_mode, opacity, context)),
					None => background.cloned().unwrap_or_else(|| Texture::transparent(resolution)),
				}
			}
			NodeKind::SolidColor => Texture::new(Chunk::filled(resolution, inputs.color(0)?.unwrap_or(Color::BLACK))),
			NodeKind::Tint => {
				let color = inputs.color(1)?.unwrap_or(Color::WHITE);
				match inputs.texture(0)? {
					Some(input) => {
						let mut chunk = input.chunk().clone();
						chunk.map_pixels(context.chunk, |_, pixel| pixel.multiply(color));
						Texture::new(chunk)
					}
					None => Texture::transparent(resolution),
				}
			}
			NodeKind::ApplyMask => {
				let invert = inputs.bool(2)?.unwrap_or(false);
				match (inputs.texture(0)?, inputs.image(1)?) {
					(Some(input), Some(mask)) => {
						let mask = scope.reader(mask)?.most_up_to_date_chunk(context.chunk, resolution)?;
						let mut chunk = input.chunk().clone();
						let size = chunk.pixel_size();
						for y in 0..size {
							for x in 0..size {
								let coverage = mask.as_ref().map_or(0., |mask| mask.pixel(x, y).a());
								let factor = if invert { 1. - coverage } else { coverage };
								if let Some(pixel) = chunk.surface_mut().get_pixel_mut(x, y) {
									*pixel = pixel.multiply_alpha(factor);
								}
							}
						}
						Texture::new(chunk)
					}
					(Some(input), None) => input.clone(),
					(None, _) => Texture::transparent(resolution),
				}
			}
			NodeKind::Time => {
				let frame_time = context.frame_time;
				return Ok(vec![PortValue::Float(frame_time.normalized_time), PortValue::Int(frame_time.frame as i64)]);
			}
		};
		Ok(vec![PortValue::Texture(output)])
	}
}

/// Composites `foreground` over the background texture, or over transparency when there is none.
fn composite(background: Option<&Texture>, foreground: &Chunk, blend_mode: BlendMode, opacity: f64, context: &RenderingContext) -> Chunk {
	let mut chunk = background.map_or_else(|| Chunk::transparent(context.resolution), |background| background.chunk().clone());
	let opacity = opacity.clamp(0., 1.) as f32;
	let size = chunk.pixel_size().min(foreground.pixel_size());
	for y in 0..size {
		for x in 0..size {
			let source = foreground.pixel(x, y).multiply_alpha(opacity);
			if let Some(pixel) = chunk.surface_mut().get_pixel_mut(x, y) {
				*pixel = blend_mode.blend(*pixel, source);
			}
		}
	}
	chunk
}

/// Typed access to resolved input values.
struct Inputs<'a> {
	node: NodeId,
	values: &'a [Option<PortValue>],
}

impl<'a> Inputs<'a> {
	fn get<T>(&self, index: usize, expected: PortType, extract: impl FnOnce(&'a PortValue) -> Option<T>) -> Result<Option<T>, RenderFailure> {
		let Some(value) = self.values.get(index).and_then(Option::as_ref) else { return Ok(None) };
		let found = value.ty();
		extract(value).map(Some).ok_or(RenderFailure::UnexpectedValueType { node: self.node, expected, found })
	}

	fn texture(&self, index: usize) -> Result<Option<&'a Texture>, RenderFailure> {
		self.get(index, PortType::Texture, PortValue::as_texture)
	}

	fn float(&self, index: usize) -> Result<Option<f64>, RenderFailure> {
		self.get(index, PortType::Float, |value| if let PortValue::Float(value) = value { Some(*value) } else { None })
	}

	fn bool(&self, index: usize) -> Result<Option<bool>, RenderFailure> {
		self.get(index, PortType::Bool, |value| if let PortValue::Bool(value) = value { Some(*value) } else { None })
	}

	fn color(&self, index: usize) -> Result<Option<Color>, RenderFailure> {
		self.get(index, PortType::Color, |value| if let PortValue::Color(color) = value { Some(*color) } else { None })
	}

	fn blend_mode(&self, index: usize) -> Result<Option<BlendMode>, RenderFailure> {
		self.get(index, PortType::BlendMode, |value| if let PortValue::BlendMode(blend_mode) = value { Some(*blend_mode) } else { None })
	}

	fn image(&self, index: usize) -> Result<Option<&'a ChunkyImageHandle>, RenderFailure> {
		self.get(index, PortType::Image, |value| if let PortValue::Image(handle) = value { Some(handle) } else { None })
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::context::FrameTime;
	use chunky_image::{ChunkCoordinate, IRect, Paint, Resolution};
	use glam::{IVec2, UVec2};

	fn context() -> RenderingContext {
		RenderingContext::new(ChunkCoordinate::new(0, 0), Resolution::Eighth, FrameTime::new(3, 0.75), UVec2::splat(256))
	}

	fn texture(outputs: &[PortValue]) -> &Texture {
		outputs[0].as_texture().unwrap()
	}

	#[test]
	fn tint_multiplies_pixels() {
		let scope = RenderScope::default();
		let input = Some(PortValue::Texture(Texture::new(Chunk::filled(Resolution::Eighth, Color::WHITE))));
		let outputs = Node::tint(Color::RED).execute(NodeId(1), &[input, Some(PortValue::Color(Color::RED))], &context(), &scope).unwrap();
		assert_eq!(texture(&outputs).chunk().pixel(3, 3), Color::RED);
	}

	#[test]
	fn mismatched_values_are_reported() {
		let scope = RenderScope::default();
		let result = Node::tint(Color::RED).execute(NodeId(1), &[Some(PortValue::Float(1.)), None], &context(), &scope);
		assert_eq!(
			result.err(),
			Some(RenderFailure::UnexpectedValueType {
				node: NodeId(1),
				expected: PortType::Texture,
				found: PortType::Float
			})
		);
	}

	#[test]
	fn image_layer_composites_over_background() {
		let mut image = ChunkyImage::new(UVec2::splat(256));
		image.enqueue_rectangle(IRect::from_corners(IVec2::ZERO, IVec2::new(128, 256)), Paint::new(Color::RED));
		let node = Node::image_layer(image);

		let scope = RenderScope::default();
		let background = Some(PortValue::Texture(Texture::new(Chunk::filled(Resolution::Eighth, Color::BLUE))));
		let inputs = [background, Some(PortValue::Float(1.)), Some(PortValue::BlendMode(BlendMode::Normal)), Some(PortValue::Bool(true))];
		let outputs = node.execute(NodeId(1), &inputs, &context(), &scope).unwrap();
		assert_eq!(texture(&outputs).chunk().pixel(0, 0), Color::RED);
		assert_eq!(texture(&outputs).chunk().pixel(31, 0), Color::BLUE);
	}

	#[test]
	fn time_reads_the_frame() {
		let outputs = Node::time().execute(NodeId(1), &[], &context(), &RenderScope::default()).unwrap();
		assert_eq!(outputs, vec![PortValue::Float(0.75), PortValue::Int(3)]);
	}

	#[test]
	fn clone_state_has_fresh_identity() {
		let node = Node::image_layer(ChunkyImage::new(UVec2::splat(16)));
		let clone = node.clone_state();
		assert_ne!(node.image().map(ChunkyImage::id), clone.image().map(ChunkyImage::id));
		assert_eq!(node.inputs(), clone.inputs());
		assert!(!clone.has_cached_result());
	}
}
