use crate::context::FrameTime;
use crate::error::ConfigError;
use chunky_image::{ChunkyImage, ChunkyImageSettings};
use glam::UVec2;
use serde::{Deserialize, Serialize};

/// Document level settings a render graph is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
	pub document_width: u32,
	pub document_height: u32,
	/// Number of frames in the animation timeline. At least one frame always exists.
	pub frame_count: u64,
	pub image: ChunkyImageSettings,
}

impl Default for RenderConfig {
	fn default() -> Self {
		Self {
			document_width: 1920,
			document_height: 1080,
			frame_count: 1,
			image: ChunkyImageSettings::default(),
		}
	}
}

impl RenderConfig {
	pub fn from_json(json: &str) -> Result<Self, ConfigError> {
		let config: Self = serde_json::from_str(json)?;
		log::debug!("Loaded render config for a {}x{} document", config.document_width, config.document_height);
		Ok(config)
	}

	pub fn document_size(&self) -> UVec2 {
		UVec2::new(self.document_width, self.document_height)
	}

	/// The position of `frame` on the timeline, clamped to the last frame.
	pub fn frame_time(&self, frame: u64) -> FrameTime {
		let last = self.frame_count.max(1) - 1;
		let frame = frame.min(last);
		let normalized_time = if last == 0 { 0. } else { frame as f64 / last as f64 };
		FrameTime::new(frame, normalized_time)
	}

	/// An empty image covering the document, using the configured image settings.
	pub fn new_image(&self) -> ChunkyImage {
		ChunkyImage::with_settings(self.document_size(), self.image)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn missing_fields_use_defaults() {
		let config = RenderConfig::from_json(r#"{ "document_width": 512, "image": { "preview_cache_limit": 8 } }"#).unwrap();
		assert_eq!(
			config,
			RenderConfig {
				document_width: 512,
				image: ChunkyImageSettings { preview_cache_limit: 8 },
				..RenderConfig::default()
			}
		);
	}

	#[test]
	fn malformed_documents_are_rejected() {
		assert!(matches!(RenderConfig::from_json("{ \"document_width\": -1 }"), Err(ConfigError::Malformed(_))));
	}

	#[test]
	fn frame_time_is_normalized() {
		let config = RenderConfig { frame_count: 5, ..Default::default() };
		assert_eq!(config.frame_time(0), FrameTime::new(0, 0.));
		assert_eq!(config.frame_time(2), FrameTime::new(2, 0.5));
		assert_eq!(config.frame_time(9), FrameTime::new(4, 1.));
		assert_eq!(RenderConfig::default().frame_time(3), FrameTime::new(0, 0.));
	}
}
