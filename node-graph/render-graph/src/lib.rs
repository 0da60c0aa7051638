pub mod config;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod execution;
mod fingerprint;
pub mod graph;
pub mod node;
pub mod node_property;

pub use config::RenderConfig;
pub use context::{FrameTime, RenderingContext};
pub use error::{ConfigError, GraphEditError, RenderFailure};
pub use evaluator::ChunkRenderer;
pub use execution::{CancellationToken, ExecutionObserver, ExecutionState, NodeOutcome, RenderRequest};
pub use graph::NodeGraph;
pub use node::{Node, NodeId, NodeKind};
pub use node_property::{CustomValue, InputConnector, InputProperty, OutputConnector, OutputProperty, PortType, PortValue, Texture};
