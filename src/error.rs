use crate::dom::NodeId;
use thiserror::Error;

/// Failures reported by a [`Dom`](`crate::dom::Dom`) implementation.
///
/// The reconciler itself never fails: it logs these and carries on with the live mirror in a consistent state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
	#[error("Unknown display node {0:?}")]
	UnknownNode(NodeId),

	#[error("Display node {0:?} is not an element")]
	NotAnElement(NodeId),

	#[error("Display node {child:?} is not a child of {parent:?}")]
	NotAChild { parent: NodeId, child: NodeId },

	/// Stringified error value thrown by the host, for example a `JsValue` from `web-sys`.
	#[error("Display surface operation failed: {0}")]
	Surface(String),

	#[error("Unsupported: {0}")]
	Unsupported(&'static str),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
