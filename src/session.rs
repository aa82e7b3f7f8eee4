//! A mounted view and the state that carries over between its render cycles.

use crate::{
	apply::apply,
	diff::diff,
	dom::{Dom, LiveNode, NodeId},
	error::{Error, Result},
	event::EventNode,
	index::resolve,
	load::virtualize,
	node::Node,
	render::render,
};
use core::fmt::{self, Debug, Formatter};
use std::rc::Rc;
use tracing::{info, instrument};

/// Diagnostics of one [`RenderSession::cycle`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
	/// Top-level patches produced by the diff.
	pub patches: usize,
	/// Live nodes the Indexer entered.
	pub visited: usize,
}

/// The handle to a mounted view.
///
/// Owns the previous abstract tree, the live mirror and the application's event dispatch root.
/// Cycles must not overlap, which `&mut self` enforces.
pub struct RenderSession<Msg> {
	container: LiveNode<Msg>,
	root: LiveNode<Msg>,
	tree: Node<Msg>,
	event_node: Rc<EventNode<Msg>>,
	cycles: u64,
}
impl<Msg> Debug for RenderSession<Msg> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("RenderSession")
			.field("container", &self.container.id())
			.field("root", &self.root.id())
			.field("tree", &self.tree)
			.field("cycles", &self.cycles)
			.finish_non_exhaustive()
	}
}

impl<Msg: 'static> RenderSession<Msg> {
	/// Renders `view` and appends it to `container`.
	///
	/// `deliver(message, is_synchronous)` receives every message raised by an event listener.
	/// Synchronous messages should be handled (and re-rendered) immediately, others may be batched.
	#[instrument(skip(dom, view, deliver))]
	pub fn attach(dom: &mut dyn Dom, container: NodeId, view: Node<Msg>, deliver: impl Fn(Msg, bool) + 'static) -> Self {
		let event_node = EventNode::root(deliver);
		let container = LiveNode::new(container);
		let root = render(dom, &view, &event_node);
		container.insert_child(dom, &root, None);
		info!("Attached view to {:?}.", container.id());
		Self {
			container,
			root,
			tree: view,
			event_node,
			cycles: 0,
		}
	}

	/// Takes over the existing first child of `container`, so that the first [`cycle`](`RenderSession::cycle`) only patches differences.
	///
	/// # Errors
	///
	/// Iff `container` has no children or the surface can't be read back.
	#[instrument(skip(dom, deliver))]
	pub fn hydrate(dom: &mut dyn Dom, container: NodeId, deliver: impl Fn(Msg, bool) + 'static) -> Result<Self> {
		let first = *dom.child_nodes(container)?.first().ok_or(Error::Unsupported("Hydrating an empty container"))?;
		let (tree, root) = virtualize(dom, first)?;
		let container = LiveNode::new(container);
		container.adopt_children(vec![root.clone()]);
		info!("Hydrated view in {:?}.", container.id());
		Ok(Self {
			container,
			root,
			tree,
			event_node: EventNode::root(deliver),
			cycles: 0,
		})
	}

	/// Diffs `view` against the previous tree, resolves the patches and applies them.
	#[instrument(skip(self, dom, view), fields(cycle = self.cycles))]
	pub fn cycle(&mut self, dom: &mut dyn Dom, view: Node<Msg>) -> CycleStats {
		let mut patches = diff(&self.tree, &view);
		let index_stats = resolve(&self.root, &self.tree, &mut patches, &self.event_node);
		self.root = apply(dom, &self.root, &patches);
		self.tree = view;
		self.cycles += 1;

		let stats = CycleStats {
			patches: patches.len(),
			visited: index_stats.visited,
		};
		info!("Render cycle applied {} patch(es), visiting {} live node(s).", stats.patches, stats.visited);
		stats
	}

	/// Removes the view from its container and releases it.
	#[instrument(skip(self, dom))]
	pub fn detach(self, dom: &mut dyn Dom) {
		self.root.destroy(dom);
		info!("Detached view from {:?}.", self.container.id());
	}
}

impl<Msg> RenderSession<Msg> {
	/// The live node the view is currently rendered as.
	#[must_use]
	pub fn root(&self) -> &LiveNode<Msg> {
		&self.root
	}

	/// The abstract tree of the last cycle.
	#[must_use]
	pub fn tree(&self) -> &Node<Msg> {
		&self.tree
	}

	#[must_use]
	pub fn container(&self) -> &LiveNode<Msg> {
		&self.container
	}

	#[must_use]
	pub fn cycles(&self) -> u64 {
		self.cycles
	}
}
