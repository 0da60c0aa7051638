use crate::node::NodeId;
use crate::node_property::PortType;
use chunky_image::ChunkyImageError;

/// Rejected graph edits. The graph is left unchanged whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphEditError {
	#[error("Node {0} does not exist")]
	NodeNotFound(NodeId),
	#[error("Node {node} has no input named \"{input}\"")]
	InputNotFound { node: NodeId, input: String },
	#[error("Node {node} has no output named \"{output}\"")]
	OutputNotFound { node: NodeId, output: String },
	#[error("Type mismatch on node {node}: expected {expected}, found {found}")]
	TypeMismatch { node: NodeId, expected: PortType, found: PortType },
	#[error("Connecting node {source_node} into node {target} would create a cycle")]
	CycleDetected { source_node: NodeId, target: NodeId },
	#[error("Node {0} cannot be connected to itself")]
	SelfConnection(NodeId),
	#[error("The graph already has an output node")]
	DuplicateOutputNode,
	#[error("The output node cannot be removed")]
	CannotRemoveOutputNode,
	#[error("Required input \"{input}\" of node {node} is not connected")]
	MissingRequiredConnection { node: NodeId, input: String },
}

/// Why a single chunk render failed. Failures are contained to the request that produced them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderFailure {
	#[error(transparent)]
	Image(#[from] ChunkyImageError),
	#[error("Node {0} is not part of the graph")]
	NodeNotFound(NodeId),
	#[error("The render was cancelled")]
	Cancelled,
	#[error("The graph has no output node")]
	NoOutputNode,
	#[error("Node {node} did not receive a value for input {input}")]
	MissingUpstreamValue { node: NodeId, input: usize },
	#[error("Node {node} received a {found} value where {expected} was expected")]
	UnexpectedValueType { node: NodeId, expected: PortType, found: PortType },
	#[error("Cycle detected involving node {0}")]
	Cycle(NodeId),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Malformed render configuration: {0}")]
	Malformed(#[from] serde_json::Error),
}
