use crate::config::RenderConfig;
use crate::error::{GraphEditError, RenderFailure};
use crate::execution::resolve_order;
use crate::node::{Node, NodeId, NodeKind};
use crate::node_property::{InputConnector, OutputConnector, PortValue};
use chunky_image::ChunkyImage;
use glam::UVec2;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::{Arc, OnceLock};

/// The node arena, the connection table and the distinguished output node.
///
/// Edits take `&mut self` and renders take `&self`, so an edit can never interleave with a render of the same graph.
#[derive(Debug)]
pub struct NodeGraph {
	nodes: FxHashMap<NodeId, Node>,
	/// Every connected input mapped to the output feeding it.
	connections: FxHashMap<InputConnector, OutputConnector>,
	output: NodeId,
	next_id: u64,
	document_size: UVec2,
	/// Execution order for the current topology, resolved on first render.
	order: OnceLock<Arc<[NodeId]>>,
}

impl NodeGraph {
	pub fn new(document_size: UVec2) -> Self {
		let output = NodeId(0);
		let mut nodes = FxHashMap::default();
		nodes.insert(output, Node::output());
		Self {
			nodes,
			connections: FxHashMap::default(),
			output,
			next_id: 1,
			document_size,
			order: OnceLock::new(),
		}
	}

	pub fn from_config(config: &RenderConfig) -> Self {
		Self::new(config.document_size())
	}

	pub fn output_node(&self) -> NodeId {
		self.output
	}

	pub fn document_size(&self) -> UVec2 {
		self.document_size
	}

	pub fn set_document_size(&mut self, document_size: UVec2) {
		self.document_size = document_size;
	}

	pub fn node(&self, id: NodeId) -> Option<&Node> {
		self.nodes.get(&id)
	}

	pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
		self.nodes.keys().copied()
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// The image owned by an image layer node, for enqueueing and committing.
	pub fn image_mut(&mut self, id: NodeId) -> Option<&mut ChunkyImage> {
		self.nodes.get_mut(&id).and_then(Node::image_mut)
	}

	pub fn image(&self, id: NodeId) -> Option<&ChunkyImage> {
		self.nodes.get(&id).and_then(Node::image)
	}

	pub fn connection(&self, input: InputConnector) -> Option<OutputConnector> {
		self.connections.get(&input).copied()
	}

	/// Nodes directly connected to the inputs of `node`, in input order.
	pub fn upstream_nodes(&self, node: NodeId) -> Vec<NodeId> {
		let input_count = self.nodes.get(&node).map_or(0, |node| node.inputs().len());
		(0..input_count).filter_map(|input| self.connection(InputConnector { node, input })).map(|source| source.node).collect()
	}

	fn invalidate_order(&mut self) {
		self.order.take();
	}

	fn get(&self, id: NodeId) -> Result<&Node, GraphEditError> {
		self.nodes.get(&id).ok_or(GraphEditError::NodeNotFound(id))
	}

	// Edits

	pub fn add_node(&mut self, node: Node) -> Result<NodeId, GraphEditError> {
		if matches!(node.kind(), NodeKind::Output) {
			return Err(GraphEditError::DuplicateOutputNode);
		}
		let id = NodeId(self.next_id);
		self.next_id += 1;
		log::trace!("Adding {} node {id}", node.name());
		self.nodes.insert(id, node);
		Ok(id)
	}

	/// Removes a node together with every connection touching it, disposing the node.
	pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphEditError> {
		if id == self.output {
			return Err(GraphEditError::CannotRemoveOutputNode);
		}
		let mut node = self.nodes.remove(&id).ok_or(GraphEditError::NodeNotFound(id))?;
		self.connections.retain(|input, output| input.node != id && output.node != id);
		node.dispose();
		self.invalidate_order();
		log::trace!("Removed {} node {id}", node.name());
		Ok(())
	}

	/// Adds a deep copy of a node with a fresh identity. Connections are not copied.
	pub fn duplicate_node(&mut self, id: NodeId) -> Result<NodeId, GraphEditError> {
		let copy = self.get(id)?.clone_state();
		self.add_node(copy)
	}

	/// Connects an output of `source` to an input of `target`, replacing any existing connection of that input.
	pub fn connect(&mut self, source: NodeId, output_name: &str, target: NodeId, input_name: &str) -> Result<(), GraphEditError> {
		let source_node = self.get(source)?;
		let target_node = self.get(target)?;
		let output = source_node.output_index(output_name).ok_or_else(|| GraphEditError::OutputNotFound {
			node: source,
			output: output_name.to_string(),
		})?;
		let input = target_node.input_index(input_name).ok_or_else(|| GraphEditError::InputNotFound {
			node: target,
			input: input_name.to_string(),
		})?;

		let (expected, found) = (target_node.inputs()[input].ty, source_node.outputs()[output].ty);
		if expected != found {
			log::debug!("Rejected connection {source} → {target}: expected {expected}, found {found}");
			return Err(GraphEditError::TypeMismatch { node: target, expected, found });
		}
		if source == target {
			return Err(GraphEditError::SelfConnection(source));
		}
		if self.depends_on(source, target) {
			log::debug!("Rejected connection {source} → {target}: it would create a cycle");
			return Err(GraphEditError::CycleDetected { source_node: source, target });
		}

		self.connections.insert(InputConnector { node: target, input }, OutputConnector { node: source, output });
		self.invalidate_order();
		Ok(())
	}

	/// Removes the connection of an input, returning the output it was connected to.
	pub fn disconnect(&mut self, target: NodeId, input_name: &str) -> Result<Option<OutputConnector>, GraphEditError> {
		let input = self.get(target)?.input_index(input_name).ok_or_else(|| GraphEditError::InputNotFound {
			node: target,
			input: input_name.to_string(),
		})?;
		let removed = self.connections.remove(&InputConnector { node: target, input });
		if removed.is_some() {
			self.invalidate_order();
		}
		Ok(removed)
	}

	/// Sets the literal value of an input. The value is type checked against the port.
	pub fn set_input_value(&mut self, node: NodeId, input_name: &str, value: impl Into<PortValue>) -> Result<(), GraphEditError> {
		let value = value.into();
		let target = self.nodes.get_mut(&node).ok_or(GraphEditError::NodeNotFound(node))?;
		let input = target.input_index(input_name).ok_or_else(|| GraphEditError::InputNotFound {
			node,
			input: input_name.to_string(),
		})?;
		let expected = target.inputs()[input].ty;
		if value.ty() != expected {
			return Err(GraphEditError::TypeMismatch { node, expected, found: value.ty() });
		}
		target.set_input_value(input, Some(value));
		Ok(())
	}

	pub fn input_value(&self, node: NodeId, input_name: &str) -> Option<&PortValue> {
		let node = self.nodes.get(&node)?;
		node.inputs().get(node.input_index(input_name)?)?.value.as_ref()
	}

	/// Whether `node` transitively reads from `dependency`.
	fn depends_on(&self, node: NodeId, dependency: NodeId) -> bool {
		let mut visited = FxHashSet::default();
		let mut stack = vec![node];
		while let Some(current) = stack.pop() {
			if current == dependency {
				return true;
			}
			if visited.insert(current) {
				stack.extend(self.upstream_nodes(current));
			}
		}
		false
	}

	/// Checks that every required input is connected.
	pub fn validate(&self) -> Result<(), GraphEditError> {
		let mut ids: Vec<_> = self.nodes.keys().copied().collect();
		ids.sort();
		for id in ids {
			let Some(node) = self.nodes.get(&id) else { continue };
			for (index, input) in node.inputs().iter().enumerate() {
				if input.required && self.connection(InputConnector { node: id, input: index }).is_none() {
					return Err(GraphEditError::MissingRequiredConnection {
						node: id,
						input: input.name.to_string(),
					});
				}
			}
		}
		Ok(())
	}

	/// Nodes the output depends on, each after all of its dependencies.
	pub fn execution_order(&self) -> Result<Arc<[NodeId]>, RenderFailure> {
		if let Some(order) = self.order.get() {
			return Ok(order.clone());
		}
		if !self.nodes.contains_key(&self.output) {
			return Err(RenderFailure::NoOutputNode);
		}
		let order: Arc<[NodeId]> = resolve_order(self.output, |node| self.upstream_nodes(node))?.into();
		log::trace!("Resolved execution order of {} nodes", order.len());
		Ok(self.order.get_or_init(|| order).clone())
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::node_property::PortType;
	use chunky_image::Color;
	use pretty_assertions::assert_eq;

	fn graph() -> NodeGraph {
		NodeGraph::new(UVec2::splat(256))
	}

	#[test]
	fn output_node_is_unique_and_permanent() {
		let mut graph = graph();
		assert_eq!(graph.add_node(Node::output()), Err(GraphEditError::DuplicateOutputNode));
		assert_eq!(graph.remove_node(graph.output_node()), Err(GraphEditError::CannotRemoveOutputNode));
		assert_eq!(graph.duplicate_node(graph.output_node()), Err(GraphEditError::DuplicateOutputNode));
		assert_eq!(graph.len(), 1);
	}

	#[test]
	fn connections_are_type_checked() {
		let mut graph = graph();
		let time = graph.add_node(Node::time()).unwrap();
		let tint = graph.add_node(Node::tint(Color::RED)).unwrap();
		assert_eq!(
			graph.connect(time, "Frame", tint, "Input"),
			Err(GraphEditError::TypeMismatch {
				node: tint,
				expected: PortType::Texture,
				found: PortType::Int
			})
		);
		assert_eq!(
			graph.connect(time, "Seconds", tint, "Input"),
			Err(GraphEditError::OutputNotFound {
				node: time,
				output: "Seconds".to_string()
			})
		);
		assert_eq!(
			graph.set_input_value(tint, "Color", 1.),
			Err(GraphEditError::TypeMismatch {
				node: tint,
				expected: PortType::Color,
				found: PortType::Float
			})
		);
	}

	#[test]
	fn cycles_and_self_connections_are_rejected() {
		let mut graph = graph();
		let a = graph.add_node(Node::tint(Color::RED)).unwrap();
		let b = graph.add_node(Node::tint(Color::BLUE)).unwrap();
		graph.connect(a, "Output", b, "Input").unwrap();
		assert_eq!(graph.connect(a, "Output", a, "Input"), Err(GraphEditError::SelfConnection(a)));
		assert_eq!(graph.connect(b, "Output", a, "Input"), Err(GraphEditError::CycleDetected { source_node: b, target: a }));
		assert_eq!(graph.connection(InputConnector { node: a, input: 0 }), None);
	}

	#[test]
	fn topology_edits_reset_the_order() {
		let mut graph = graph();
		let color = graph.add_node(Node::solid_color(Color::RED)).unwrap();
		assert_eq!(&*graph.execution_order().unwrap(), &[graph.output_node()]);

		graph.connect(color, "Output", graph.output_node(), "Background").unwrap();
		assert_eq!(&*graph.execution_order().unwrap(), &[color, graph.output_node()]);

		graph.remove_node(color).unwrap();
		assert_eq!(&*graph.execution_order().unwrap(), &[graph.output_node()]);
	}

	#[test]
	fn validation_reports_missing_required_connections() {
		let mut graph = graph();
		assert_eq!(
			graph.validate(),
			Err(GraphEditError::MissingRequiredConnection {
				node: graph.output_node(),
				input: "Background".to_string()
			})
		);
		let color = graph.add_node(Node::solid_color(Color::RED)).unwrap();
		graph.connect(color, "Output", graph.output_node(), "Background").unwrap();
		assert_eq!(graph.validate(), Ok(()));
	}

	#[test]
	fn duplicates_copy_literals_but_not_connections() {
		let mut graph = graph();
		let color = graph.add_node(Node::solid_color(Color::RED)).unwrap();
		let tint = graph.add_node(Node::tint(Color::BLUE)).unwrap();
		graph.connect(color, "Output", tint, "Input").unwrap();

		let copy = graph.duplicate_node(tint).unwrap();
		assert_eq!(graph.input_value(copy, "Color"), Some(&PortValue::Color(Color::BLUE)));
		assert_eq!(graph.connection(InputConnector { node: copy, input: 0 }), None);
	}
}
