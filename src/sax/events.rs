//! SAX Event Types
//!
//! Events borrow from the parser's buffer and only live for the duration of
//! one callback.

use crate::core::attributes::Attribute;

/// An element start, as seen by [`ElementHandler::start_element`]
///
/// [`ElementHandler::start_element`]: super::ElementHandler::start_element
#[derive(Debug, Clone, Copy)]
pub struct StartElement<'a> {
    name: &'a str,
    attributes: &'a [Attribute<'a>],
    is_empty: bool,
}

impl<'a> StartElement<'a> {
    pub fn new(name: &'a str, attributes: &'a [Attribute<'a>], is_empty: bool) -> Self {
        StartElement {
            name,
            attributes,
            is_empty,
        }
    }

    /// Element name
    #[inline]
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Attribute name/value pairs in document order
    pub fn attributes(&self) -> impl ExactSizeIterator<Item = (&'a str, &'a str)> + 'a {
        self.attributes.iter().map(|a| (a.name, a.value.as_ref()))
    }

    /// Number of attributes on the element
    #[inline]
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Number of names plus values specified in the tag
    ///
    /// Counts the flat name/value sequence, so it is always twice
    /// [`attribute_count`](Self::attribute_count).
    #[inline]
    pub fn specified_attribute_count(&self) -> usize {
        self.attributes.len() * 2
    }

    /// True for a self-closing tag (`<br/>`); its end event follows immediately
    #[inline]
    pub fn is_empty_element(&self) -> bool {
        self.is_empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn test_start_element_accessors() {
        let attrs = [
            Attribute::new("x", Cow::Borrowed("1")),
            Attribute::new("y", Cow::Owned("a b".to_string())),
        ];
        let event = StartElement::new("el", &attrs, true);

        assert_eq!(event.name(), "el");
        assert_eq!(event.attribute_count(), 2);
        assert_eq!(event.specified_attribute_count(), 4);
        assert!(event.is_empty_element());
        assert_eq!(event.attributes().collect::<Vec<_>>(), [("x", "1"), ("y", "a b")]);
    }

    #[test]
    fn test_no_attributes() {
        let event = StartElement::new("b", &[], false);
        assert_eq!(event.specified_attribute_count(), 0);
        assert_eq!(event.attributes().len(), 0);
    }
}
