use crate::context::{FrameTime, RenderingContext};
use crate::error::RenderFailure;
use crate::execution::{Execution, ExecutionState, RenderRequest};
use crate::graph::NodeGraph;
use chunky_image::{AffectedArea, Chunk, ChunkCoordinate, Resolution};
use rustc_hash::FxHashMap;

impl NodeGraph {
	/// Renders one chunk of the document at the given resolution and frame.
	pub fn render_chunk(&self, coordinate: ChunkCoordinate, resolution: Resolution, frame_time: FrameTime) -> Result<Chunk, RenderFailure> {
		self.render_chunk_with(RenderRequest::new(coordinate, resolution, frame_time))
	}

	/// Renders one chunk, honoring the request's cancellation token and reporting to its observer.
	///
	/// Chunks outside of the document are transparent without evaluating any node.
	pub fn render_chunk_with(&self, request: RenderRequest<'_>) -> Result<Chunk, RenderFailure> {
		let context = RenderingContext::new(request.coordinate, request.resolution, request.frame_time, self.document_size());
		if !context.is_within_document() {
			return Ok(Chunk::transparent(request.resolution));
		}

		let mut execution = Execution::new(self, request, context);
		execution.resolve_order()?;
		execution.execute()?;
		debug_assert_eq!(execution.state(), ExecutionState::Done);
		let chunk = execution.finish()?;
		log::trace!("Rendered chunk {} at {} resolution", context.chunk, context.resolution);
		Ok(chunk)
	}
}

/// Presentation side helper which keeps the last successfully rendered chunk for every coordinate and resolution.
#[derive(Debug, Default)]
pub struct ChunkRenderer {
	last_good: FxHashMap<(ChunkCoordinate, Resolution), Chunk>,
}

impl ChunkRenderer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Renders a chunk, falling back to the last good chunk (or a blank one) when the render fails.
	pub fn render_or_fallback(&mut self, graph: &NodeGraph, coordinate: ChunkCoordinate, resolution: Resolution, frame_time: FrameTime) -> Chunk {
		match graph.render_chunk(coordinate, resolution, frame_time) {
			Ok(chunk) => {
				self.last_good.insert((coordinate, resolution), chunk.clone());
				chunk
			}
			Err(error) => {
				log::warn!("Rendering chunk {coordinate} at {resolution} resolution failed: {error}");
				self.last_good.get(&(coordinate, resolution)).cloned().unwrap_or_else(|| Chunk::transparent(resolution))
			}
		}
	}

	pub fn last_good(&self, coordinate: ChunkCoordinate, resolution: Resolution) -> Option<&Chunk> {
		self.last_good.get(&(coordinate, resolution))
	}

	/// Forgets the fallbacks of every coordinate in the area, at every resolution.
	pub fn forget(&mut self, area: &AffectedArea) {
		self.last_good.retain(|(coordinate, _), _| !area.contains(*coordinate));
	}

	pub fn clear(&mut self) {
		self.last_good.clear();
	}
}
