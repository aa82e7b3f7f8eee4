//! Facts: everything about an element that isn't its tag or its children.

use crate::event::Handler;
use core::fmt::{self, Debug, Formatter};
use hashbrown::HashMap;
use serde_json::Value;

/// A single fact as written in a view, before [`Facts::organize`] sorts it into its category.
pub enum Fact<Msg> {
	Event { name: String, handler: Handler<Msg> },
	Style { name: String, value: String },
	Property { name: String, value: Value },
	Attribute { name: String, value: String },
	AttributeNs { namespace: String, name: String, value: String },
}
impl<Msg: 'static> Fact<Msg> {
	pub fn on(name: impl Into<String>, handler: Handler<Msg>) -> Self {
		Self::Event { name: name.into(), handler }
	}

	pub fn style(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self::Style { name: name.into(), value: value.into() }
	}

	/// A plain property, like `value` or `checked`.
	///
	/// `innerHTML` and `formAction` are renamed to `data-…`, and script or HTML URIs are blanked.
	pub fn property(name: &str, value: impl Into<Value>) -> Self {
		let value = match value.into() {
			Value::String(string) => Value::String(no_javascript_or_html_uri(&string).to_owned()),
			value => value,
		};
		Self::Property {
			name: no_inner_html_or_form_action(name),
			value,
		}
	}

	/// An attribute. Repeated `class` attributes accumulate.
	///
	/// Event handler attributes (`on…`) and `formAction` are renamed to `data-…`, and script or HTML URIs are blanked.
	pub fn attribute(name: &str, value: &str) -> Self {
		Self::Attribute {
			name: no_on_or_form_action(name),
			value: no_javascript_or_html_uri(value).to_owned(),
		}
	}

	pub(crate) fn raw_attribute(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self::Attribute { name: name.into(), value: value.into() }
	}

	pub fn attribute_ns(namespace: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
		Self::AttributeNs {
			namespace: namespace.into(),
			name: name.into(),
			value: value.into(),
		}
	}
}

#[must_use]
pub fn no_on_or_form_action(name: &str) -> String {
	let lower = name.to_ascii_lowercase();
	if lower.starts_with("on") || lower == "formaction" {
		format!("data-{}", name)
	} else {
		name.to_owned()
	}
}

#[must_use]
pub fn no_inner_html_or_form_action(name: &str) -> String {
	if name == "innerHTML" || name == "formAction" {
		format!("data-{}", name)
	} else {
		name.to_owned()
	}
}

/// Blanks `javascript:` and `data:text/html` URIs (ignoring case and embedded whitespace).
#[must_use]
pub fn no_javascript_or_html_uri(value: &str) -> &str {
	let compact: String = value.chars().filter(|c| !c.is_whitespace()).take(14).collect::<String>().to_ascii_lowercase();
	if compact.starts_with("javascript:") || value.trim_start().to_ascii_lowercase().starts_with("data:text/html") {
		""
	} else {
		value
	}
}

/// Facts sorted by category. Each category is diffed independently.
pub struct Facts<Msg> {
	events: HashMap<String, Handler<Msg>>,
	styles: HashMap<String, String>,
	attributes: HashMap<String, String>,
	/// name -> (namespace, value)
	attributes_ns: HashMap<String, (String, String)>,
	properties: HashMap<String, Value>,
}
impl<Msg> Default for Facts<Msg> {
	fn default() -> Self {
		Self {
			events: HashMap::new(),
			styles: HashMap::new(),
			attributes: HashMap::new(),
			attributes_ns: HashMap::new(),
			properties: HashMap::new(),
		}
	}
}
impl<Msg> Debug for Facts<Msg> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Facts")
			.field("events", &self.events.keys().collect::<Vec<_>>())
			.field("styles", &self.styles.keys().collect::<Vec<_>>())
			.field("attributes", &self.attributes.keys().collect::<Vec<_>>())
			.field("attributes_ns", &self.attributes_ns.keys().collect::<Vec<_>>())
			.field("properties", &self.properties.keys().collect::<Vec<_>>())
			.finish()
	}
}
impl<Msg> Facts<Msg> {
	/// Later facts overwrite earlier ones of the same category and name,
	/// except for the `class` attribute and `className` property, which are joined with spaces.
	pub fn organize(facts: impl IntoIterator<Item = Fact<Msg>>) -> Self {
		let mut organized = Self::default();
		for fact in facts {
			match fact {
				Fact::Event { name, handler } => {
					organized.events.insert(name, handler);
				}
				Fact::Style { name, value } => {
					organized.styles.insert(name, value);
				}
				Fact::Property { name, value } => {
					if name == "className" {
						if let (Some(Value::String(classes)), Value::String(new_class)) = (organized.properties.get_mut(&name), &value) {
							classes.push(' ');
							classes.push_str(new_class);
							continue;
						}
					}
					organized.properties.insert(name, value);
				}
				Fact::Attribute { name, value } => {
					if name == "class" {
						if let Some(classes) = organized.attributes.get_mut(&name) {
							classes.push(' ');
							classes.push_str(&value);
							continue;
						}
					}
					organized.attributes.insert(name, value);
				}
				Fact::AttributeNs { namespace, name, value } => {
					organized.attributes_ns.insert(name, (namespace, value));
				}
			}
		}
		organized
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.events.is_empty() && self.styles.is_empty() && self.attributes.is_empty() && self.attributes_ns.is_empty() && self.properties.is_empty()
	}

	#[must_use]
	pub fn event(&self, name: &str) -> Option<&Handler<Msg>> {
		self.events.get(name)
	}

	#[must_use]
	pub fn style(&self, name: &str) -> Option<&str> {
		self.styles.get(name).map(String::as_str)
	}

	#[must_use]
	pub fn attribute(&self, name: &str) -> Option<&str> {
		self.attributes.get(name).map(String::as_str)
	}

	/// Returns `(namespace, value)`.
	#[must_use]
	pub fn attribute_ns(&self, name: &str) -> Option<(&str, &str)> {
		self.attributes_ns.get(name).map(|(namespace, value)| (namespace.as_str(), value.as_str()))
	}

	#[must_use]
	pub fn property(&self, name: &str) -> Option<&Value> {
		self.properties.get(name)
	}
}

/// Changes between two [`Facts`], ready to be applied to a live element.
pub struct FactsDiff<Msg> {
	/// `None` removes the listener.
	pub(crate) events: Vec<(String, Option<Handler<Msg>>)>,
	/// An empty value removes the style.
	pub(crate) styles: Vec<(String, String)>,
	/// `None` removes the attribute.
	pub(crate) attributes: Vec<(String, Option<String>)>,
	/// (name, namespace, value)
	pub(crate) attributes_ns: Vec<(String, String, Option<String>)>,
	pub(crate) properties: Vec<(String, Value)>,
}
impl<Msg> Default for FactsDiff<Msg> {
	fn default() -> Self {
		Self {
			events: Vec::new(),
			styles: Vec::new(),
			attributes: Vec::new(),
			attributes_ns: Vec::new(),
			properties: Vec::new(),
		}
	}
}
impl<Msg> Debug for FactsDiff<Msg> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("FactsDiff")
			.field("events", &self.events.iter().map(|(name, handler)| (name, handler.is_some())).collect::<Vec<_>>())
			.field("styles", &self.styles.iter().map(|(name, _)| name).collect::<Vec<_>>())
			.field("attributes", &self.attributes.iter().map(|(name, _)| name).collect::<Vec<_>>())
			.field("attributes_ns", &self.attributes_ns.iter().map(|(name, ..)| name).collect::<Vec<_>>())
			.field("properties", &self.properties.iter().map(|(name, _)| name).collect::<Vec<_>>())
			.finish()
	}
}
impl<Msg> FactsDiff<Msg> {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.events.is_empty() && self.styles.is_empty() && self.attributes.is_empty() && self.attributes_ns.is_empty() && self.properties.is_empty()
	}

	/// `Some(None)` means the listener is removed.
	#[must_use]
	pub fn event(&self, name: &str) -> Option<Option<&Handler<Msg>>> {
		self.events.iter().find(|(n, _)| n == name).map(|(_, handler)| handler.as_ref())
	}

	#[must_use]
	pub fn style(&self, name: &str) -> Option<&str> {
		self.styles.iter().find(|(n, _)| n == name).map(|(_, value)| value.as_str())
	}

	/// `Some(None)` means the attribute is removed.
	#[must_use]
	pub fn attribute(&self, name: &str) -> Option<Option<&str>> {
		self.attributes.iter().find(|(n, _)| n == name).map(|(_, value)| value.as_deref())
	}

	#[must_use]
	pub fn property(&self, name: &str) -> Option<&Value> {
		self.properties.iter().find(|(n, _)| n == name).map(|(_, value)| value)
	}
}

impl<Msg: 'static> FactsDiff<Msg> {
	/// Every fact as an addition, for freshly created nodes.
	#[must_use]
	pub fn additions(facts: &Facts<Msg>) -> Self {
		Self {
			events: facts.events.iter().map(|(name, handler)| (name.clone(), Some(handler.clone()))).collect(),
			styles: facts.styles.iter().map(|(name, value)| (name.clone(), value.clone())).collect(),
			attributes: facts.attributes.iter().map(|(name, value)| (name.clone(), Some(value.clone()))).collect(),
			attributes_ns: facts.attributes_ns.iter().map(|(name, (namespace, value))| (name.clone(), namespace.clone(), Some(value.clone()))).collect(),
			properties: facts.properties.iter().map(|(name, value)| (name.clone(), value.clone())).collect(),
		}
	}
}

/// Form control state can be changed by the user, so these properties are never assumed unchanged.
fn is_volatile_property(name: &str) -> bool {
	name == "value" || name == "checked"
}

/// Returns `None` if nothing changed.
#[must_use]
pub fn diff_facts<Msg: 'static>(old: &Facts<Msg>, new: &Facts<Msg>) -> Option<FactsDiff<Msg>> {
	let mut diff = FactsDiff::default();

	for (name, old_handler) in &old.events {
		match new.events.get(name) {
			None => diff.events.push((name.clone(), None)),
			Some(new_handler) if !old_handler.equals(new_handler) => diff.events.push((name.clone(), Some(new_handler.clone()))),
			Some(_) => (),
		}
	}
	for (name, new_handler) in &new.events {
		if !old.events.contains_key(name) {
			diff.events.push((name.clone(), Some(new_handler.clone())));
		}
	}

	for (name, old_value) in &old.styles {
		match new.styles.get(name) {
			None => diff.styles.push((name.clone(), String::new())),
			Some(new_value) if new_value != old_value => diff.styles.push((name.clone(), new_value.clone())),
			Some(_) => (),
		}
	}
	for (name, new_value) in &new.styles {
		if !old.styles.contains_key(name) {
			diff.styles.push((name.clone(), new_value.clone()));
		}
	}

	for (name, old_value) in &old.attributes {
		match new.attributes.get(name) {
			None => diff.attributes.push((name.clone(), None)),
			Some(new_value) if new_value != old_value => diff.attributes.push((name.clone(), Some(new_value.clone()))),
			Some(_) => (),
		}
	}
	for (name, new_value) in &new.attributes {
		if !old.attributes.contains_key(name) {
			diff.attributes.push((name.clone(), Some(new_value.clone())));
		}
	}

	for (name, (old_namespace, old_value)) in &old.attributes_ns {
		match new.attributes_ns.get(name) {
			None => diff.attributes_ns.push((name.clone(), old_namespace.clone(), None)),
			Some((new_namespace, new_value)) if new_namespace != old_namespace || new_value != old_value => {
				if new_namespace != old_namespace {
					diff.attributes_ns.push((name.clone(), old_namespace.clone(), None));
				}
				diff.attributes_ns.push((name.clone(), new_namespace.clone(), Some(new_value.clone())));
			}
			Some(_) => (),
		}
	}
	for (name, (new_namespace, new_value)) in &new.attributes_ns {
		if !old.attributes_ns.contains_key(name) {
			diff.attributes_ns.push((name.clone(), new_namespace.clone(), Some(new_value.clone())));
		}
	}

	for (name, old_value) in &old.properties {
		match new.properties.get(name) {
			None => diff.properties.push((
				name.clone(),
				match old_value {
					Value::String(_) => Value::String(String::new()),
					_ => Value::Null,
				},
			)),
			Some(new_value) if new_value != old_value || is_volatile_property(name) => diff.properties.push((name.clone(), new_value.clone())),
			Some(_) => (),
		}
	}
	for (name, new_value) in &new.properties {
		if !old.properties.contains_key(name) {
			diff.properties.push((name.clone(), new_value.clone()));
		}
	}

	if diff.is_empty() {
		None
	} else {
		Some(diff)
	}
}
