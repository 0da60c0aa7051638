use crate::lifetime::ImageId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkyImageError {
	#[error("Image {image} has been disposed")]
	Disposed { image: ImageId },
	#[error("Image {image} was replaced while being read (captured generation {captured}, current generation {current})")]
	Stale { image: ImageId, captured: u64, current: u64 },
}
