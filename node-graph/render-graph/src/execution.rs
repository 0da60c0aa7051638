use crate::context::{FrameTime, RenderingContext};
use crate::error::RenderFailure;
use crate::fingerprint::{Fingerprint, value_hash};
use crate::graph::NodeGraph;
use crate::node::{CacheRecord, NodeId};
use crate::node_property::{InputConnector, PortValue};
use chunky_image::{Chunk, ChunkCoordinate, ChunkyImageHandle, ImageId, ImageReader, Resolution};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Lifecycle of a single render request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
	Idle,
	OrderResolved,
	Executing,
	Done,
}

/// Cooperative cancellation flag shared between a render request and whoever may abort it.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self) {
		self.0.store(true, Ordering::Release);
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::Acquire)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOutcome {
	/// The node ran its computation.
	Executed,
	/// The node's fingerprint matched its last execution and the cached outputs were reused.
	CacheHit,
}

/// Receives one notification per node evaluated during a render.
pub trait ExecutionObserver {
	fn node_evaluated(&self, node: NodeId, outcome: NodeOutcome);
}

impl<F: Fn(NodeId, NodeOutcome)> ExecutionObserver for F {
	fn node_evaluated(&self, node: NodeId, outcome: NodeOutcome) {
		self(node, outcome)
	}
}

/// "Render chunk X at resolution R for frame F", with optional cancellation and observation.
pub struct RenderRequest<'a> {
	pub coordinate: ChunkCoordinate,
	pub resolution: Resolution,
	pub frame_time: FrameTime,
	pub cancellation: Option<CancellationToken>,
	pub observer: Option<&'a dyn ExecutionObserver>,
}

impl<'a> RenderRequest<'a> {
	pub fn new(coordinate: ChunkCoordinate, resolution: Resolution, frame_time: FrameTime) -> Self {
		Self {
			coordinate,
			resolution,
			frame_time,
			cancellation: None,
			observer: None,
		}
	}

	pub fn with_cancellation(self, cancellation: CancellationToken) -> Self {
		Self {
			cancellation: Some(cancellation),
			..self
		}
	}

	pub fn with_observer(self, observer: &'a dyn ExecutionObserver) -> Self {
		Self { observer: Some(observer), ..self }
	}

	fn is_cancelled(&self) -> bool {
		self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled)
	}
}

/// Image readers pinned for the duration of one request, so every read of an image sees the same state.
#[derive(Debug, Default)]
pub(crate) struct RenderScope {
	pins: RefCell<FxHashMap<ImageId, ImageReader>>,
}

impl RenderScope {
	pub fn reader(&self, handle: &ChunkyImageHandle) -> Result<ImageReader, RenderFailure> {
		if let Some(reader) = self.pins.borrow().get(&handle.id()) {
			return Ok(reader.clone());
		}
		let reader = handle.reader()?;
		log::trace!("Pinned image {} at commit {}", handle.id(), reader.commit_counter());
		self.pins.borrow_mut().insert(handle.id(), reader.clone());
		Ok(reader)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
	Visiting,
	Visited,
}

/// Orders every node the output depends on so that each node comes after all of its dependencies.
///
/// Walks depth first from the output along connected inputs, visiting each node once. Nodes without a path to the output are left out.
pub(crate) fn resolve_order(output: NodeId, upstream: impl Fn(NodeId) -> Vec<NodeId>) -> Result<Vec<NodeId>, RenderFailure> {
	let mut sorted = Vec::new();
	let mut state: FxHashMap<NodeId, VisitState> = FxHashMap::default();
	let mut stack = vec![output];

	while let Some(&node) = stack.last() {
		match state.get(&node).copied() {
			None => {
				state.insert(node, VisitState::Visiting);
				for dependency in upstream(node).into_iter().rev() {
					match state.get(&dependency).copied() {
						Some(VisitState::Visiting) => return Err(RenderFailure::Cycle(dependency)),
						Some(VisitState::Visited) => {}
						None => stack.push(dependency),
					}
				}
			}
			Some(VisitState::Visiting) => {
				stack.pop();
				state.insert(node, VisitState::Visited);
				sorted.push(node);
			}
			Some(VisitState::Visited) => {
				stack.pop();
			}
		}
	}

	Ok(sorted)
}

/// One render request in flight.
pub(crate) struct Execution<'a> {
	graph: &'a NodeGraph,
	request: RenderRequest<'a>,
	context: RenderingContext,
	state: ExecutionState,
	order: Arc<[NodeId]>,
	values: FxHashMap<NodeId, Vec<PortValue>>,
	/// Cache records written back to the nodes only once the whole request succeeds.
	staged: Vec<(NodeId, CacheRecord)>,
	scope: RenderScope,
}

impl<'a> Execution<'a> {
	pub fn new(graph: &'a NodeGraph, request: RenderRequest<'a>, context: RenderingContext) -> Self {
		Self {
			graph,
			request,
			context,
			state: ExecutionState::Idle,
			order: Arc::new([]),
			values: FxHashMap::default(),
			staged: Vec::new(),
			scope: RenderScope::default(),
		}
	}

	pub fn state(&self) -> ExecutionState {
		self.state
	}

	pub fn resolve_order(&mut self) -> Result<(), RenderFailure> {
		debug_assert_eq!(self.state, ExecutionState::Idle);
		self.order = self.graph.execution_order()?;
		self.state = ExecutionState::OrderResolved;
		Ok(())
	}

	pub fn execute(&mut self) -> Result<(), RenderFailure> {
		debug_assert_eq!(self.state, ExecutionState::OrderResolved);
		self.state = ExecutionState::Executing;

		let order = self.order.clone();
		for &id in order.iter() {
			if self.request.is_cancelled() {
				log::debug!("Render of chunk {} cancelled before node {id}", self.context.chunk);
				return Err(RenderFailure::Cancelled);
			}
			self.execute_node(id)?;
		}

		self.state = ExecutionState::Done;
		Ok(())
	}

	fn execute_node(&mut self, id: NodeId) -> Result<(), RenderFailure> {
		let graph = self.graph;
		let node = graph.node(id).ok_or(RenderFailure::NodeNotFound(id))?;

		let mut inputs = Vec::with_capacity(node.inputs().len());
		for (index, input) in node.inputs().iter().enumerate() {
			let value = match graph.connection(InputConnector { node: id, input: index }) {
				Some(source) => {
					let value = self.values.get(&source.node).and_then(|outputs| outputs.get(source.output));
					Some(value.cloned().ok_or(RenderFailure::MissingUpstreamValue { node: id, input: index })?)
				}
				None => input.value.clone(),
			};
			inputs.push(value);
		}

		let mut fingerprint = Fingerprint::new(&self.context);
		fingerprint.add(node.state_hash(&self.context, &self.scope)?);
		for value in &inputs {
			let hash = match value {
				Some(value) => value_hash(value, &self.context, &self.scope)?,
				None => Some(0),
			};
			fingerprint.add(hash);
		}
		let fingerprint = fingerprint.finish();

		if let Some(outputs) = fingerprint.and_then(|fingerprint| node.cached_outputs(fingerprint)) {
			log::trace!("{} node {id} reused its cached result", node.name());
			self.notify(id, NodeOutcome::CacheHit);
			self.values.insert(id, outputs);
			return Ok(());
		}
		if fingerprint.is_none() {
			log::trace!("{} node {id} has inputs without a content hash and always recomputes", node.name());
		}

		let outputs = node.execute(id, &inputs, &self.context, &self.scope)?;
		self.notify(id, NodeOutcome::Executed);
		if let Some(fingerprint) = fingerprint {
			self.staged.push((
				id,
				CacheRecord {
					fingerprint,
					outputs: outputs.clone(),
				},
			));
		}
		self.values.insert(id, outputs);
		Ok(())
	}

	fn notify(&self, node: NodeId, outcome: NodeOutcome) {
		if let Some(observer) = self.request.observer {
			observer.node_evaluated(node, outcome);
		}
	}

	/// Writes the staged cache records back and returns a copy of the output node's chunk.
	pub fn finish(self) -> Result<Chunk, RenderFailure> {
		debug_assert_eq!(self.state, ExecutionState::Done);
		if self.request.is_cancelled() {
			return Err(RenderFailure::Cancelled);
		}

		let output = self.graph.output_node();
		let texture = self.values.get(&output).and_then(|outputs| outputs.first()).and_then(PortValue::as_texture);
		let chunk = texture.ok_or(RenderFailure::MissingUpstreamValue { node: output, input: 0 })?.chunk().clone();

		for (id, record) in self.staged {
			if let Some(node) = self.graph.node(id) {
				node.store_cache(record);
			}
		}
		Ok(chunk)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use pretty_assertions::assert_eq;

	fn upstream_of(edges: &[(u64, u64)]) -> impl Fn(NodeId) -> Vec<NodeId> + '_ {
		move |node| edges.iter().filter(|(_, target)| *target == node.0).map(|(source, _)| NodeId(*source)).collect()
	}

	fn position(order: &[NodeId], node: u64) -> usize {
		order.iter().position(|id| id.0 == node).unwrap()
	}

	#[test]
	fn dependencies_come_first_even_when_shared_at_different_depths() {
		// 0 is the output. 3 feeds the output directly and also through 2 ← 1.
		let edges = [(3, 0), (1, 0), (2, 1), (3, 2)];
		let order = resolve_order(NodeId(0), upstream_of(&edges)).unwrap();
		assert_eq!(order.len(), 4);
		for (source, target) in edges {
			assert!(position(&order, source) < position(&order, target), "{source} must run before {target} in {order:?}");
		}
	}

	#[test]
	fn disconnected_nodes_are_not_ordered() {
		let edges = [(1, 0), (2, 3)];
		let order = resolve_order(NodeId(0), upstream_of(&edges)).unwrap();
		assert_eq!(order, vec![NodeId(1), NodeId(0)]);
	}

	#[test]
	fn cycles_are_reported() {
		let edges = [(1, 0), (2, 1), (1, 2)];
		assert!(matches!(resolve_order(NodeId(0), upstream_of(&edges)), Err(RenderFailure::Cycle(_))));
	}

	#[test]
	fn cancellation_token_is_shared() {
		let token = CancellationToken::new();
		let request = RenderRequest::new(ChunkCoordinate::new(0, 0), Resolution::Full, FrameTime::default()).with_cancellation(token.clone());
		assert!(!request.is_cancelled());
		token.cancel();
		assert!(request.is_cancelled());
	}
}
