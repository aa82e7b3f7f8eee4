//! Positional edit operations produced by the Differ.

use crate::{
	dom::LiveNode,
	event::EventNode,
	facts::FactsDiff,
	node::{CustomPatch, Node, Tagger},
};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use std::rc::Rc;

/// An edit at a position of the *old* abstract tree's pre-order traversal.
///
/// The Indexer fills in the live node (and event dispatch root) each patch applies to.
pub struct Patch<Msg> {
	index: usize,
	kind: PatchKind<Msg>,
	pub(crate) target: Option<LiveNode<Msg>>,
	pub(crate) event_node: Option<Rc<EventNode<Msg>>>,
}

pub enum PatchKind<Msg> {
	/// Render this node from scratch in place of the old one.
	Replace(Node<Msg>),
	/// Patches for a recomputed thunk, indexed from 0 within the thunk's previous contents.
	DescendIntoThunk(Vec<Patch<Msg>>),
	/// The new tagger chain, outermost first.
	RetagTaggers(Vec<Tagger<Msg>>),
	SetText(String),
	UpdateFacts(FactsDiff<Msg>),
	CustomUpdate(CustomPatch),
	/// Keep the first `keep` children and remove the `remove` after them.
	TrimTrailingChildren { keep: usize, remove: usize },
	/// Render `children` and insert them from position `from` onwards.
	AppendChildren { from: usize, children: Vec<Node<Msg>> },
	KeyedReorder(Reorder<Msg>),
	/// Remove a keyed child, or lift it out for reinsertion if its [`KeyedEntry`] turned out to be a move.
	RemoveKeyedNode(SharedEntry<Msg>),
}

/// Everything that happens to one keyed parent's children.
pub struct Reorder<Msg> {
	pub(crate) local: Vec<Patch<Msg>>,
	pub(crate) inserts: Vec<KeyedInsert<Msg>>,
	pub(crate) end_inserts: Vec<SharedEntry<Msg>>,
}
impl<Msg> Reorder<Msg> {
	/// Patches for children that keep their position, and removals.
	#[must_use]
	pub fn local_patches(&self) -> &[Patch<Msg>] {
		&self.local
	}

	/// Insertions at a position of the new child list, in ascending order.
	#[must_use]
	pub fn inserts(&self) -> &[KeyedInsert<Msg>] {
		&self.inserts
	}

	/// Insertions after all other children.
	#[must_use]
	pub fn end_inserts(&self) -> &[SharedEntry<Msg>] {
		&self.end_inserts
	}
}

pub struct KeyedInsert<Msg> {
	pub(crate) index: usize,
	pub(crate) entry: SharedEntry<Msg>,
}
impl<Msg> KeyedInsert<Msg> {
	/// Position in the new child list.
	#[must_use]
	pub fn index(&self) -> usize {
		self.index
	}

	#[must_use]
	pub fn entry(&self) -> &SharedEntry<Msg> {
		&self.entry
	}
}

pub type SharedEntry<Msg> = Rc<RefCell<KeyedEntry<Msg>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
	/// Only seen as an insertion so far.
	Inserted,
	/// Only seen as a removal so far.
	Removed,
	/// Removed and inserted in the same cycle: the live node is moved instead of recreated.
	Moved,
}

/// Reconciliation bookkeeping for one key of a keyed child list.
pub struct KeyedEntry<Msg> {
	pub(crate) key: String,
	pub(crate) state: EntryState,
	/// The new node for insertions, the old node for removals.
	pub(crate) node: Node<Msg>,
	/// Old abstract index of a removal.
	pub(crate) removed_at: Option<usize>,
	/// For moves: patches turning the old node into the new one.
	pub(crate) patches: Vec<Patch<Msg>>,
	/// For moves: the live node being carried over.
	pub(crate) live: Option<LiveNode<Msg>>,
}
impl<Msg> KeyedEntry<Msg> {
	/// The key this entry was reconciled under, including any duplicate suffixes.
	#[must_use]
	pub fn key(&self) -> &str {
		&self.key
	}

	#[must_use]
	pub fn state(&self) -> EntryState {
		self.state
	}

	#[must_use]
	pub fn node(&self) -> &Node<Msg> {
		&self.node
	}

	#[must_use]
	pub fn patches(&self) -> &[Patch<Msg>] {
		&self.patches
	}
}

impl<Msg> Patch<Msg> {
	#[must_use]
	pub fn new(index: usize, kind: PatchKind<Msg>) -> Self {
		Self {
			index,
			kind,
			target: None,
			event_node: None,
		}
	}

	#[must_use]
	pub fn index(&self) -> usize {
		self.index
	}

	#[must_use]
	pub fn kind(&self) -> &PatchKind<Msg> {
		&self.kind
	}

	pub(crate) fn kind_mut(&mut self) -> &mut PatchKind<Msg> {
		&mut self.kind
	}

	/// The live node this patch was resolved to, if the Indexer has run.
	#[must_use]
	pub fn target(&self) -> Option<&LiveNode<Msg>> {
		self.target.as_ref()
	}
}

impl<Msg> Debug for Patch<Msg> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Patch")
			.field("index", &self.index)
			.field("kind", &self.kind)
			.field("target", &self.target.as_ref().map(LiveNode::id))
			.finish()
	}
}

impl<Msg> Debug for PatchKind<Msg> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Replace(node) => f.debug_tuple("Replace").field(node).finish(),
			Self::DescendIntoThunk(patches) => f.debug_tuple("DescendIntoThunk").field(patches).finish(),
			Self::RetagTaggers(taggers) => f.debug_tuple("RetagTaggers").field(&taggers.len()).finish(),
			Self::SetText(text) => {
				if cfg!(feature = "dangerous-logging") {
					f.debug_tuple("SetText").field(text).finish()
				} else {
					f.debug_tuple("SetText").field(&text.len()).finish()
				}
			}
			Self::UpdateFacts(diff) => f.debug_tuple("UpdateFacts").field(diff).finish(),
			Self::CustomUpdate(_) => f.debug_tuple("CustomUpdate").finish(),
			Self::TrimTrailingChildren { keep, remove } => f.debug_struct("TrimTrailingChildren").field("keep", keep).field("remove", remove).finish(),
			Self::AppendChildren { from, children } => f.debug_struct("AppendChildren").field("from", from).field("children", children).finish(),
			Self::KeyedReorder(reorder) => f
				.debug_struct("KeyedReorder")
				.field("local", &reorder.local)
				.field("inserts", &reorder.inserts.iter().map(|insert| (insert.index, insert.entry.borrow().key.clone())).collect::<Vec<_>>())
				.field("end_inserts", &reorder.end_inserts.iter().map(|entry| entry.borrow().key.clone()).collect::<Vec<_>>())
				.finish(),
			Self::RemoveKeyedNode(entry) => {
				let entry = entry.borrow();
				f.debug_struct("RemoveKeyedNode").field("key", &entry.key).field("state", &entry.state).field("patches", &entry.patches).finish()
			}
		}
	}
}
