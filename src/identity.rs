//! Node identity, the rule deciding whether an existing node can stand in for a template node.

/// What a node is, as far as reuse is concerned.
///
/// Two nodes with equal identities are "the same node" even if their remaining attributes or content differ;
/// those are patched in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
	/// The DOM `nodeType`.
	pub node_type: u16,
	/// The DOM `nodeName`, i.e. the (case-normalized) tag name for elements and `#text`/`#comment` otherwise.
	pub name: String,
	pub id: Option<String>,
	pub src: Option<String>,
	pub key: Option<String>,
}

impl Identity {
	/// An identity for a non-element node.
	#[must_use]
	pub fn plain(node_type: u16, name: impl Into<String>) -> Self {
		Self {
			node_type,
			name: name.into(),
			id: None,
			src: None,
			key: None,
		}
	}

	#[must_use]
	pub fn is_different(&self, other: &Self) -> bool {
		self != other
	}

	/// The value used for direct (non-scanning) lookup among siblings, if any.
	///
	/// An explicit key takes precedence over `id`.
	#[must_use]
	pub fn lookup_key(&self) -> Option<&str> {
		self.key.as_deref().or_else(|| self.id.as_deref())
	}

	/// Whether the name marks a custom element, whose content is its own business.
	#[must_use]
	pub fn is_custom_element(&self) -> bool {
		is_custom_element_name(&self.name)
	}
}

/// Treats empty values like missing ones, as the DOM's `id` and `src` properties do.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
	value.filter(|value| !value.is_empty())
}

pub(crate) fn is_custom_element_name(name: &str) -> bool {
	!name.starts_with('#') && name.contains('-')
}

#[cfg(test)]
mod tests {
	use super::*;

	const ELEMENT: u16 = 1;
	const TEXT: u16 = 3;
	const COMMENT: u16 = 8;

	fn element(name: &str) -> Identity {
		Identity::plain(ELEMENT, name)
	}

	#[test]
	fn kinds_differ() {
		assert!(Identity::plain(TEXT, "#text").is_different(&Identity::plain(COMMENT, "#comment")));
		assert!(!Identity::plain(TEXT, "#text").is_different(&Identity::plain(TEXT, "#text")));
	}

	#[test]
	fn tags_differ() {
		assert!(element("LI").is_different(&element("P")));
		assert!(!element("LI").is_different(&element("LI")));
	}

	#[test]
	fn id_src_and_key_participate() {
		let base = element("IMG");
		assert!(Identity { id: Some("a".into()), ..base.clone() }.is_different(&Identity { id: Some("b".into()), ..base.clone() }));
		assert!(Identity { src: Some("a.png".into()), ..base.clone() }.is_different(&base));
		assert!(Identity { key: Some("1".into()), ..base.clone() }.is_different(&Identity { key: Some("2".into()), ..base.clone() }));
		assert!(!Identity { key: Some("1".into()), ..base.clone() }.is_different(&Identity { key: Some("1".into()), ..base }));
	}

	#[test]
	fn key_wins_over_id_for_lookup() {
		let identity = Identity {
			id: Some("row".into()),
			key: Some("7".into()),
			..element("TR")
		};
		assert_eq!(identity.lookup_key(), Some("7"));
		assert_eq!(Identity { key: None, ..identity }.lookup_key(), Some("row"));
		assert_eq!(element("TR").lookup_key(), None);
	}

	#[test]
	fn custom_elements() {
		assert!(element("MY-WIDGET").is_custom_element());
		assert!(!element("DIV").is_custom_element());
		assert!(!Identity::plain(TEXT, "#text").is_custom_element());
	}

	#[test]
	fn empty_values_count_as_missing() {
		assert_eq!(non_empty(Some(String::new())), None);
		assert_eq!(non_empty(Some("x".into())), Some("x".to_owned()));
	}
}
