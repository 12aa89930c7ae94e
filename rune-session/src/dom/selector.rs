//! Compound selectors
//!
//! Only what the runtime queries for: an optional tag name, any number
//! of classes and attribute conditions, all of which must hold on the
//! same element. There are no combinators; scoping is done by the
//! caller choosing the subtree to search.

use super::Element;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrMatch {
    Present(String),
    Equals(String, String),
}

/// Infallible compound selector builder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    tag: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
}

impl Selector {
    /// `name`
    pub fn tag(name: &str) -> Self {
        Self {
            tag: Some(name.to_ascii_lowercase()),
            ..Self::default()
        }
    }

    /// `.class`
    pub fn class(class: &str) -> Self {
        Self::default().with_class(class)
    }

    /// `[name]`
    pub fn attr(name: &str) -> Self {
        Self::default().with_attr(name)
    }

    /// `[name="value"]`
    pub fn attr_eq(name: &str, value: &str) -> Self {
        Self::default().with_attr_eq(name, value)
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn with_attr(mut self, name: &str) -> Self {
        self.attrs.push(AttrMatch::Present(name.to_string()));
        self
    }

    pub fn with_attr_eq(mut self, name: &str, value: &str) -> Self {
        self.attrs
            .push(AttrMatch::Equals(name.to_string(), value.to_string()));
        self
    }

    pub fn matches(&self, element: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if !element.name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| element.has_class(c)) {
            return false;
        }
        self.attrs.iter().all(|m| match m {
            AttrMatch::Present(name) => element.attr(name).is_some(),
            AttrMatch::Equals(name, value) => element.attr(name) == Some(value.as_str()),
        })
    }
}
