use crate::consts::FULL_CHUNK_SIZE;
use serde::{Deserialize, Serialize};

/// One of the four fixed levels at which every chunk is mirrored.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resolution {
	#[default]
	Full,
	Half,
	Quarter,
	Eighth,
}

impl Resolution {
	pub const ALL: [Resolution; 4] = [Resolution::Full, Resolution::Half, Resolution::Quarter, Resolution::Eighth];

	/// How many full resolution pixels make up one pixel at this level, along each axis.
	pub const fn divisor(self) -> u32 {
		match self {
			Resolution::Full => 1,
			Resolution::Half => 2,
			Resolution::Quarter => 4,
			Resolution::Eighth => 8,
		}
	}

	pub fn multiplier(self) -> f64 {
		1. / self.divisor() as f64
	}

	/// Edge length in pixels of a chunk at this level.
	pub const fn pixel_size(self) -> u32 {
		FULL_CHUNK_SIZE / self.divisor()
	}

	/// The level one 2× box-downsample step below this one.
	pub const fn lower(self) -> Option<Resolution> {
		match self {
			Resolution::Full => Some(Resolution::Half),
			Resolution::Half => Some(Resolution::Quarter),
			Resolution::Quarter => Some(Resolution::Eighth),
			Resolution::Eighth => None,
		}
	}

	/// The level this one is derived from.
	pub const fn higher(self) -> Option<Resolution> {
		match self {
			Resolution::Full => None,
			Resolution::Half => Some(Resolution::Full),
			Resolution::Quarter => Some(Resolution::Half),
			Resolution::Eighth => Some(Resolution::Quarter),
		}
	}

	/// Number of downsample steps between `Full` and this level.
	pub const fn downsample_steps(self) -> u32 {
		self.divisor().trailing_zeros()
	}
}

impl core::fmt::Display for Resolution {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		let name = match self {
			Resolution::Full => "Full",
			Resolution::Half => "Half",
			Resolution::Quarter => "Quarter",
			Resolution::Eighth => "Eighth",
		};
		f.write_str(name)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn chunk_sizes_are_integral() {
		let sizes: Vec<_> = Resolution::ALL.iter().map(|resolution| resolution.pixel_size()).collect();
		assert_eq!(sizes, vec![256, 128, 64, 32]);
		for resolution in Resolution::ALL {
			assert_eq!(resolution.pixel_size() * resolution.divisor(), FULL_CHUNK_SIZE);
			assert_eq!(resolution.multiplier() * FULL_CHUNK_SIZE as f64, resolution.pixel_size() as f64);
		}
	}

	#[test]
	fn levels_chain_down_to_eighth() {
		let mut chain = vec![Resolution::Full];
		while let Some(lower) = chain.last().and_then(|resolution| resolution.lower()) {
			chain.push(lower);
		}
		assert_eq!(chain, Resolution::ALL.to_vec());
		assert_eq!(Resolution::Eighth.downsample_steps(), 3);
	}
}
