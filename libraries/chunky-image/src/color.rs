use core::hash::{Hash, Hasher};
use serde::{Deserialize, Serialize};

/// Structure that represents a color with associated (premultiplied) alpha.
/// Every channel is stored as an `f32` ranging from `0.0` to `1.0`, and the color channels never exceed alpha.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
	red: f32,
	green: f32,
	blue: f32,
	alpha: f32,
}

impl Hash for Color {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.red.to_bits().hash(state);
		self.green.to_bits().hash(state);
		self.blue.to_bits().hash(state);
		self.alpha.to_bits().hash(state);
	}
}

impl Color {
	pub const BLACK: Color = Color::from_rgbf32_unchecked(0., 0., 0.);
	pub const WHITE: Color = Color::from_rgbf32_unchecked(1., 1., 1.);
	pub const RED: Color = Color::from_rgbf32_unchecked(1., 0., 0.);
	pub const GREEN: Color = Color::from_rgbf32_unchecked(0., 1., 0.);
	pub const BLUE: Color = Color::from_rgbf32_unchecked(0., 0., 1.);
	pub const TRANSPARENT: Color = Self {
		red: 0.,
		green: 0.,
		blue: 0.,
		alpha: 0.,
	};

	/// Returns `Some(Color)` if the unassociated `red`, `green`, `blue` and `alpha` channels are all within `0.0..=1.0`.
	/// NaN and infinity are not valid values and return `None`.
	///
	/// # Examples
	/// ```
	/// use chunky_image::Color;
	/// let color = Color::from_rgbaf32(1., 0.5, 0., 0.5).unwrap();
	/// assert_eq!(color.components(), (0.5, 0.25, 0., 0.5));
	///
	/// assert!(Color::from_rgbaf32(1., 1., 1., f32::NAN).is_none());
	/// ```
	pub fn from_rgbaf32(red: f32, green: f32, blue: f32, alpha: f32) -> Option<Color> {
		if [red, green, blue, alpha].iter().any(|c| !c.is_finite() || !(0. ..=1.).contains(c)) {
			return None;
		}
		Some(Color {
			red: red * alpha,
			green: green * alpha,
			blue: blue * alpha,
			alpha,
		})
	}

	/// Return an opaque `Color` from given `f32` RGB channels.
	pub const fn from_rgbf32_unchecked(red: f32, green: f32, blue: f32) -> Color {
		Color { red, green, blue, alpha: 1. }
	}

	/// Return a `Color` from channels that already have alpha associated with them.
	pub const fn from_premultiplied_unchecked(red: f32, green: f32, blue: f32, alpha: f32) -> Color {
		Color { red, green, blue, alpha }
	}

	/// Return a `Color` given unassociated RGBA channels from `0` to `255`.
	pub fn from_rgba8(red: u8, green: u8, blue: u8, alpha: u8) -> Color {
		let map_range = |int_color: u8| int_color as f32 / 255.;
		let alpha = map_range(alpha);
		Color {
			red: map_range(red) * alpha,
			green: map_range(green) * alpha,
			blue: map_range(blue) * alpha,
			alpha,
		}
	}

	pub fn r(&self) -> f32 {
		self.red
	}

	pub fn g(&self) -> f32 {
		self.green
	}

	pub fn b(&self) -> f32 {
		self.blue
	}

	pub fn a(&self) -> f32 {
		self.alpha
	}

	/// Premultiplied channels as a tuple.
	pub fn components(&self) -> (f32, f32, f32, f32) {
		(self.red, self.green, self.blue, self.alpha)
	}

	/// Unassociated channels scaled to `0..=255`.
	pub fn to_rgba8(&self) -> [u8; 4] {
		if self.alpha <= 0. {
			return [0; 4];
		}
		let to_u8 = |channel: f32| ((channel / self.alpha).clamp(0., 1.) * 255. + 0.5) as u8;
		[to_u8(self.red), to_u8(self.green), to_u8(self.blue), (self.alpha.clamp(0., 1.) * 255. + 0.5) as u8]
	}

	pub fn is_transparent(&self) -> bool {
		self.alpha <= 0.
	}

	pub fn map_rgba<F: Fn(f32) -> f32>(&self, f: F) -> Self {
		Self::from_premultiplied_unchecked(f(self.red), f(self.green), f(self.blue), f(self.alpha))
	}

	/// Scales every channel, which for associated alpha is the same as scaling the opacity.
	pub fn multiply_alpha(&self, factor: f32) -> Self {
		let factor = factor.clamp(0., 1.);
		self.map_rgba(|channel| channel * factor)
	}

	/// Rescales the color so its alpha becomes `alpha` while keeping its unassociated color.
	pub fn with_alpha(&self, alpha: f32) -> Self {
		if self.alpha <= 0. {
			return Color::TRANSPARENT;
		}
		let scale = alpha / self.alpha;
		Self::from_premultiplied_unchecked(self.red * scale, self.green * scale, self.blue * scale, alpha)
	}

	/// Channel-wise product of two colors.
	pub fn multiply(&self, other: Color) -> Self {
		Self::from_premultiplied_unchecked(self.red * other.red, self.green * other.green, self.blue * other.blue, self.alpha * other.alpha)
	}

	/// Composites `top` over `self` (source-over with associated alpha).
	pub fn alpha_blend(&self, top: Color) -> Color {
		let inverse = 1. - top.alpha;
		Self::from_premultiplied_unchecked(
			top.red + self.red * inverse,
			top.green + self.green * inverse,
			top.blue + self.blue * inverse,
			top.alpha + self.alpha * inverse,
		)
	}

	pub fn lerp(&self, other: Color, t: f32) -> Color {
		let lerp = |a: f32, b: f32| a + (b - a) * t;
		Self::from_premultiplied_unchecked(lerp(self.red, other.red), lerp(self.green, other.green), lerp(self.blue, other.blue), lerp(self.alpha, other.alpha))
	}

	/// Box filter of four samples, used when deriving the next lower resolution.
	pub fn average(samples: [Color; 4]) -> Color {
		let sum = samples.iter().fold([0.; 4], |acc, c| [acc[0] + c.red, acc[1] + c.green, acc[2] + c.blue, acc[3] + c.alpha]);
		Self::from_premultiplied_unchecked(sum[0] / 4., sum[1] / 4., sum[2] / 4., sum[3] / 4.)
	}

	/// Whether every channel lies within `tolerance` of `other`.
	pub fn is_similar(&self, other: &Color, tolerance: f32) -> bool {
		(self.red - other.red).abs() <= tolerance
			&& (self.green - other.green).abs() <= tolerance
			&& (self.blue - other.blue).abs() <= tolerance
			&& (self.alpha - other.alpha).abs() <= tolerance
	}
}

/// How drawn pixels combine with the pixels already in a chunk.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BlendMode {
	#[default]
	Normal,
	/// Overwrites the destination, including its alpha.
	Replace,
	/// Removes destination coverage proportionally to the source alpha.
	Erase,
	Multiply,
	Screen,
}

impl BlendMode {
	pub fn blend(&self, destination: Color, source: Color) -> Color {
		match self {
			BlendMode::Normal => destination.alpha_blend(source),
			BlendMode::Replace => source,
			BlendMode::Erase => destination.multiply_alpha(1. - source.a()),
			BlendMode::Multiply => {
				let (sr, sg, sb, sa) = source.components();
				let (dr, dg, db, da) = destination.components();
				let channel = |s: f32, d: f32| s * d + s * (1. - da) + d * (1. - sa);
				Color::from_premultiplied_unchecked(channel(sr, dr), channel(sg, dg), channel(sb, db), sa + da - sa * da)
			}
			BlendMode::Screen => {
				let (sr, sg, sb, sa) = source.components();
				let (dr, dg, db, da) = destination.components();
				let channel = |s: f32, d: f32| s + d - s * d;
				Color::from_premultiplied_unchecked(channel(sr, dr), channel(sg, dg), channel(sb, db), channel(sa, da))
			}
		}
	}
}

impl core::fmt::Display for BlendMode {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		let name = match self {
			BlendMode::Normal => "Normal",
			BlendMode::Replace => "Replace",
			BlendMode::Erase => "Erase",
			BlendMode::Multiply => "Multiply",
			BlendMode::Screen => "Screen",
		};
		f.write_str(name)
	}
}
