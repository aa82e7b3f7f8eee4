//! Patcher: applies resolved patches to the live tree.

use crate::{
	dom::{Dom, LiveNode},
	event::EventNode,
	node::CustomPatch,
	patch::{EntryState, Patch, PatchKind, Reorder, SharedEntry},
	render::{apply_facts, render},
};
use std::rc::Rc;
use tracing::{error, instrument, trace_span, warn};

/// Applies `patches` in order and returns the (possibly replaced) root.
///
/// Every patch must have been [resolved](`crate::index::resolve`) against the tree `root` belongs to, before any of them is applied.
#[instrument(skip_all)]
pub fn apply<Msg: 'static>(dom: &mut dyn Dom, root: &LiveNode<Msg>, patches: &[Patch<Msg>]) -> LiveNode<Msg> {
	apply_help(dom, root.clone(), patches)
}

fn apply_help<Msg: 'static>(dom: &mut dyn Dom, mut root: LiveNode<Msg>, patches: &[Patch<Msg>]) -> LiveNode<Msg> {
	for patch in patches {
		let (target, event_node) = match (&patch.target, &patch.event_node) {
			(Some(target), Some(event_node)) => (target.clone(), Rc::clone(event_node)),
			_ => {
				debug_assert!(false, "Unresolved patch: {:?}", patch);
				error!("twig-dom bug: Skipping unresolved patch at index {}.", patch.index());
				continue;
			}
		};
		let new_node = apply_patch(dom, &target, &event_node, patch);
		if LiveNode::ptr_eq(&target, &root) {
			root = new_node;
		}
	}
	root
}

fn apply_patch<Msg: 'static>(dom: &mut dyn Dom, target: &LiveNode<Msg>, event_node: &Rc<EventNode<Msg>>, patch: &Patch<Msg>) -> LiveNode<Msg> {
	match patch.kind() {
		PatchKind::Replace(node) => {
			let span = trace_span!("Replacing", index = patch.index());
			let _enter = span.enter();
			let replacement = render(dom, node, event_node);
			redraw(dom, target, &replacement)
		}

		PatchKind::UpdateFacts(facts_diff) => {
			let span = trace_span!("Updating facts", index = patch.index());
			let _enter = span.enter();
			apply_facts(dom, target, event_node, facts_diff);
			target.clone()
		}

		PatchKind::SetText(text) => {
			if let Err(error) = dom.set_text(target.id(), text) {
				error!("Failed to set text of {:?}: {}", target.id(), error);
			}
			target.clone()
		}

		PatchKind::DescendIntoThunk(sub_patches) => apply_help(dom, target.clone(), sub_patches),

		PatchKind::RetagTaggers(taggers) => {
			match target.event_node() {
				Some(tagged) if tagged.retag(taggers.clone()) => (),
				_ => target.set_event_node(Some(EventNode::tagged(taggers.clone(), Rc::clone(event_node)))),
			}
			target.clone()
		}

		PatchKind::TrimTrailingChildren { keep, remove } => {
			let span = trace_span!("Trimming children", index = patch.index(), keep, remove);
			let _enter = span.enter();
			for _ in 0..*remove {
				match target.child(*keep) {
					Some(child) => child.destroy(dom),
					None => {
						error!("twig-dom bug: Expected more than {} children on {:?}.", keep, target.id());
						break;
					}
				}
			}
			target.clone()
		}

		PatchKind::AppendChildren { from, children } => {
			let span = trace_span!("Appending children", index = patch.index(), from, count = children.len());
			let _enter = span.enter();
			let rendered: Vec<_> = children.iter().map(|child| render(dom, child, event_node)).collect();
			if target.child_count() == *from {
				target.append_children(dom, rendered);
			} else {
				warn!("Expected {} children on {:?} but found {}. Inserting positionally.", from, target.id(), target.child_count());
				for (offset, child) in rendered.iter().enumerate() {
					target.insert_child(dom, child, Some(from + offset));
				}
			}
			target.clone()
		}

		PatchKind::CustomUpdate(custom_patch) => apply_custom(dom, target, custom_patch),

		PatchKind::KeyedReorder(reorder) => apply_reorder(dom, target, event_node, reorder),

		PatchKind::RemoveKeyedNode(entry) => {
			let mut entry = entry.borrow_mut();
			if entry.state == EntryState::Moved {
				// Lifted out here, reinserted by the parent's reorder.
				target.detach(dom);
				let moved = apply_help(dom, target.clone(), &entry.patches);
				entry.live = Some(moved);
			} else {
				target.destroy(dom);
			}
			target.clone()
		}
	}
}

/// Puts `replacement` in `target`'s place. A replacement without its own event root inherits `target`'s.
fn redraw<Msg: 'static>(dom: &mut dyn Dom, target: &LiveNode<Msg>, replacement: &LiveNode<Msg>) -> LiveNode<Msg> {
	if replacement.event_node().is_none() {
		replacement.set_event_node(target.event_node());
	}
	target.replace_with(dom, replacement);
	replacement.clone()
}

fn apply_custom<Msg: 'static>(dom: &mut dyn Dom, target: &LiveNode<Msg>, custom_patch: &CustomPatch) -> LiveNode<Msg> {
	let new_id = custom_patch(dom, target.id());
	if new_id == target.id() {
		return target.clone();
	}
	if !target.listener_names().is_empty() {
		warn!("Custom widget replaced its display node; its event listeners are not carried over.");
	}
	redraw(dom, target, &LiveNode::new(new_id))
}

fn apply_reorder<Msg: 'static>(dom: &mut dyn Dom, target: &LiveNode<Msg>, event_node: &Rc<EventNode<Msg>>, reorder: &Reorder<Msg>) -> LiveNode<Msg> {
	let span = trace_span!("Reordering keyed children", inserts = reorder.inserts.len(), end_inserts = reorder.end_inserts.len());
	let _enter = span.enter();

	let parent = apply_help(dom, target.clone(), &reorder.local);

	for insert in &reorder.inserts {
		let child = take_or_render(dom, &insert.entry, event_node);
		parent.insert_child(dom, &child, Some(insert.index));
	}

	let end_inserts = reorder.end_inserts.iter().map(|entry| take_or_render(dom, entry, event_node)).collect();
	parent.append_children(dom, end_inserts);

	parent
}

fn take_or_render<Msg: 'static>(dom: &mut dyn Dom, entry: &SharedEntry<Msg>, event_node: &Rc<EventNode<Msg>>) -> LiveNode<Msg> {
	let mut entry = entry.borrow_mut();
	if entry.state == EntryState::Moved {
		if let Some(live) = entry.live.take() {
			return live;
		}
		error!("twig-dom bug: Moved key {:?} has no live node. Rendering it from scratch.", entry.key);
	}
	render(dom, &entry.node, event_node)
}
