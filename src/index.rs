//! Indexer: resolves each patch's abstract index to the live node it applies to.
//!
//! The old abstract tree drives a single walk over the live mirror.
//! Each node covers the index window from its own index to the end of its subtree,
//! and only children whose window contains a pending patch are entered.

use crate::{
	dom::LiveNode,
	event::EventNode,
	node::{Node, NodeKind},
	patch::{EntryState, Patch, PatchKind},
};
use std::rc::Rc;
use tracing::{error, instrument, trace};

/// Diagnostics of one [`resolve`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
	/// Live nodes the walk entered, including the root.
	pub visited: usize,
}

/// Attaches the target live node and event dispatch root to every patch in `patches`, including nested ones.
///
/// `patches` must be in ascending index order, as returned by [`diff`](`crate::diff::diff`) for `old`.
/// `root` must be the live tree rendered from `old`.
#[instrument(skip_all)]
pub fn resolve<Msg: 'static>(root: &LiveNode<Msg>, old: &Node<Msg>, patches: &mut [Patch<Msg>], event_node: &Rc<EventNode<Msg>>) -> IndexStats {
	let mut stats = IndexStats::default();
	if patches.is_empty() {
		return stats;
	}
	stats.visited += 1;
	let resolved = resolve_help(root, old, patches, 0, 0, old.subtree_size(), event_node, &mut stats);
	if resolved < patches.len() {
		error!("twig-dom bug: {} patch(es) could not be placed in the old tree.", patches.len() - resolved);
		debug_assert!(false, "Unresolved patches");
	}
	trace!("Visited {} live node(s).", stats.visited);
	stats
}

/// Resolves the patches from `i` on whose index lies within `low..=high`, the window of `node`.
///
/// Returns the index of the first patch past the window.
#[allow(clippy::too_many_arguments)]
fn resolve_help<Msg: 'static>(
	live: &LiveNode<Msg>,
	node: &Node<Msg>,
	patches: &mut [Patch<Msg>],
	mut i: usize,
	mut low: usize,
	high: usize,
	event_node: &Rc<EventNode<Msg>>,
	stats: &mut IndexStats,
) -> usize {
	let mut index = patches[i].index();

	while index == low {
		let patch = &mut patches[i];
		patch.target = Some(live.clone());
		patch.event_node = Some(Rc::clone(event_node));

		match patch.kind_mut() {
			PatchKind::DescendIntoThunk(sub_patches) => match node.kind() {
				NodeKind::Thunk(thunk) => {
					if !sub_patches.is_empty() {
						let contents = thunk.force();
						resolve_help(live, &contents, sub_patches, 0, 0, contents.subtree_size(), event_node, stats);
					}
				}
				_ => error!("twig-dom bug: Thunk patch at index {} points at a non-thunk node.", index),
			},
			PatchKind::KeyedReorder(reorder) => {
				if !reorder.local.is_empty() {
					resolve_help(live, node, &mut reorder.local, 0, low, high, event_node, stats);
				}
			}
			PatchKind::RemoveKeyedNode(entry) => {
				let mut entry = entry.borrow_mut();
				if entry.state == EntryState::Moved {
					entry.live = Some(live.clone());
					if !entry.patches.is_empty() {
						resolve_help(live, node, &mut entry.patches, 0, low, high, event_node, stats);
					}
				}
			}
			_ => (),
		}

		i += 1;
		match patches.get(i) {
			Some(next) if next.index() <= high => index = next.index(),
			_ => return i,
		}
	}

	let children: Vec<&Node<Msg>> = match node.kind() {
		NodeKind::Tagged(tagged) => {
			let (_, inner) = tagged.unwrap_chain();
			let sub_event_node = live.event_node().unwrap_or_else(|| Rc::clone(event_node));
			return resolve_help(live, inner, patches, i, low + 1, high, &sub_event_node, stats);
		}
		NodeKind::Element(element) => element.children().iter().collect(),
		NodeKind::KeyedElement(element) => element.children().iter().map(|(_, child)| child).collect(),
		NodeKind::Text(_) | NodeKind::Custom(_) | NodeKind::Thunk(_) => return i,
	};

	let live_children = live.children();
	for (j, child) in children.into_iter().enumerate() {
		low += 1;
		let next_low = low + child.subtree_size();
		if low <= index && index <= next_low {
			match live_children.get(j) {
				Some(live_child) => {
					stats.visited += 1;
					i = resolve_help(live_child, child, patches, i, low, next_low, event_node, stats);
				}
				None => {
					error!("twig-dom bug: Live node {:?} has no child {} for patch index {}. Skipping its patches.", live.id(), j, index);
					while patches.get(i).map_or(false, |patch| patch.index() <= next_low) {
						i += 1;
					}
				}
			}
			match patches.get(i) {
				Some(next) if next.index() <= high => index = next.index(),
				_ => return i,
			}
		}
		low = next_low;
	}
	i
}
