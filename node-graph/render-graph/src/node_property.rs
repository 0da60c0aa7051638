use crate::node::NodeId;
use chunky_image::{BlendMode, Chunk, ChunkyImageHandle, Color, Resolution};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TEXTURE_REVISION: AtomicU64 = AtomicU64::new(1);

/// The closed set of types a port can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortType {
	Texture,
	Float,
	Int,
	Bool,
	Color,
	BlendMode,
	Image,
	String,
	Custom,
}

impl core::fmt::Display for PortType {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		let name = match self {
			PortType::Texture => "Texture",
			PortType::Float => "Float",
			PortType::Int => "Int",
			PortType::Bool => "Bool",
			PortType::Color => "Color",
			PortType::BlendMode => "Blend Mode",
			PortType::Image => "Image",
			PortType::String => "String",
			PortType::Custom => "Custom",
		};
		f.write_str(name)
	}
}

/// A value type defined outside of this crate.
pub trait CustomValue: core::fmt::Debug + Send + Sync + 'static {
	fn type_name(&self) -> &'static str;

	/// A hash of the value's content. Values without one make every node reading them recompute.
	fn content_hash(&self) -> Option<u64> {
		None
	}
}

/// A rendered chunk stamped with a process-unique revision, which serves as its content hash.
///
/// Cloning shares the pixels and keeps the revision, so a cached output fingerprints identically downstream.
#[derive(Debug, Clone)]
pub struct Texture {
	revision: u64,
	chunk: Arc<Chunk>,
}

impl Texture {
	pub fn new(chunk: impl Into<Arc<Chunk>>) -> Self {
		Self {
			revision: NEXT_TEXTURE_REVISION.fetch_add(1, Ordering::Relaxed),
			chunk: chunk.into(),
		}
	}

	pub fn transparent(resolution: Resolution) -> Self {
		Self::new(Chunk::transparent(resolution))
	}

	pub fn revision(&self) -> u64 {
		self.revision
	}

	pub fn chunk(&self) -> &Chunk {
		&self.chunk
	}

	pub fn shared_chunk(&self) -> Arc<Chunk> {
		self.chunk.clone()
	}
}

impl PartialEq for Texture {
	fn eq(&self, other: &Self) -> bool {
		self.revision == other.revision
	}
}

/// A value flowing through a port, either as an input literal or as a node output.
#[derive(Debug, Clone)]
pub enum PortValue {
	Texture(Texture),
	Float(f64),
	Int(i64),
	Bool(bool),
	Color(Color),
	BlendMode(BlendMode),
	Image(ChunkyImageHandle),
	String(String),
	Custom(Arc<dyn CustomValue>),
}

impl PortValue {
	pub fn ty(&self) -> PortType {
		match self {
			PortValue::Texture(_) => PortType::Texture,
			PortValue::Float(_) => PortType::Float,
			PortValue::Int(_) => PortType::Int,
			PortValue::Bool(_) => PortType::Bool,
			PortValue::Color(_) => PortType::Color,
			PortValue::BlendMode(_) => PortType::BlendMode,
			PortValue::Image(_) => PortType::Image,
			PortValue::String(_) => PortType::String,
			PortValue::Custom(_) => PortType::Custom,
		}
	}

	/// Structural hash of value types. Images depend on the chunk being rendered and are hashed by the fingerprinting instead.
	pub fn content_hash(&self) -> Option<u64> {
		let mut hasher = rustc_hash::FxHasher::default();
		core::mem::discriminant(self).hash(&mut hasher);
		match self {
			PortValue::Texture(texture) => texture.revision.hash(&mut hasher),
			PortValue::Float(value) => value.to_bits().hash(&mut hasher),
			PortValue::Int(value) => value.hash(&mut hasher),
			PortValue::Bool(value) => value.hash(&mut hasher),
			PortValue::Color(color) => color.hash(&mut hasher),
			PortValue::BlendMode(blend_mode) => blend_mode.hash(&mut hasher),
			PortValue::String(string) => string.hash(&mut hasher),
			PortValue::Image(_) => return None,
			PortValue::Custom(value) => value.content_hash()?.hash(&mut hasher),
		}
		Some(hasher.finish())
	}

	pub fn as_texture(&self) -> Option<&Texture> {
		match self {
			PortValue::Texture(texture) => Some(texture),
			_ => None,
		}
	}
}

impl PartialEq for PortValue {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(PortValue::Texture(a), PortValue::Texture(b)) => a == b,
			(PortValue::Float(a), PortValue::Float(b)) => a == b,
			(PortValue::Int(a), PortValue::Int(b)) => a == b,
			(PortValue::Bool(a), PortValue::Bool(b)) => a == b,
			(PortValue::Color(a), PortValue::Color(b)) => a == b,
			(PortValue::BlendMode(a), PortValue::BlendMode(b)) => a == b,
			(PortValue::Image(a), PortValue::Image(b)) => a == b,
			(PortValue::String(a), PortValue::String(b)) => a == b,
			(PortValue::Custom(a), PortValue::Custom(b)) => Arc::ptr_eq(a, b),
			_ => false,
		}
	}
}

macro_rules! impl_from_value {
	($type:ty, $variant:ident) => {
		impl From<$type> for PortValue {
			fn from(value: $type) -> Self {
				PortValue::$variant(value)
			}
		}
	};
}

impl_from_value!(Texture, Texture);
impl_from_value!(f64, Float);
impl_from_value!(i64, Int);
impl_from_value!(bool, Bool);
impl_from_value!(Color, Color);
impl_from_value!(BlendMode, BlendMode);
impl_from_value!(ChunkyImageHandle, Image);
impl_from_value!(String, String);

/// A named, typed input of a node. Holds a literal used whenever the input is not connected.
#[derive(Debug, Clone, PartialEq)]
pub struct InputProperty {
	pub name: &'static str,
	pub ty: PortType,
	pub value: Option<PortValue>,
	/// Required inputs must be connected for the graph to validate.
	pub required: bool,
}

impl InputProperty {
	pub fn new(name: &'static str, ty: PortType, value: Option<PortValue>) -> Self {
		Self { name, ty, value, required: false }
	}

	pub fn required(self) -> Self {
		Self { required: true, ..self }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputProperty {
	pub name: &'static str,
	pub ty: PortType,
}

impl OutputProperty {
	pub fn new(name: &'static str, ty: PortType) -> Self {
		Self { name, ty }
	}
}

/// Addresses one input port of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputConnector {
	pub node: NodeId,
	pub input: usize,
}

/// Addresses one output port of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputConnector {
	pub node: NodeId,
	pub output: usize,
}

#[cfg(test)]
mod test {
	use super::*;

	#[derive(Debug)]
	struct Opaque;

	impl CustomValue for Opaque {
		fn type_name(&self) -> &'static str {
			"Opaque"
		}
	}

	#[test]
	fn value_types_hash_structurally() {
		assert_eq!(PortValue::Float(0.5).content_hash(), PortValue::Float(0.5).content_hash());
		assert_ne!(PortValue::Float(0.5).content_hash(), PortValue::Float(0.25).content_hash());
		assert_ne!(PortValue::Int(1).content_hash(), PortValue::Bool(true).content_hash());
		assert_eq!(PortValue::from(String::from("a")).content_hash(), PortValue::from(String::from("a")).content_hash());
	}

	#[test]
	fn textures_hash_by_revision() {
		let texture = Texture::transparent(Resolution::Eighth);
		let shared = PortValue::Texture(texture.clone());
		assert_eq!(PortValue::Texture(texture).content_hash(), shared.content_hash());
		assert_ne!(PortValue::Texture(Texture::transparent(Resolution::Eighth)).content_hash(), shared.content_hash());
	}

	#[test]
	fn custom_values_without_content_hash_are_unhashable() {
		let value = PortValue::Custom(Arc::new(Opaque));
		assert_eq!(value.ty(), PortType::Custom);
		assert_eq!(value.content_hash(), None);
	}
}
