//! Hydrator
//!
//! Page entry pass that makes presentation-only text real:
//! - `[data-fallback]` nodes with no visible text receive the value of
//!   the custom property their expression names (`var(--name)`)
//! - `.glitch` nodes mirror their text into a `text` attribute
//! - `[data-now-year]` nodes show the current year
//!
//! Custom properties resolve from the nearest inline `style` declaration
//! on the node or an ancestor, then from the document token map. The map
//! starts from the initial document's `<style>` blocks and absorbs those
//! of every page fetched for an in-place transition. Every step is
//! idempotent, so re-running on the same subtree changes nothing.

use crate::dom::{Document, NodeId, Selector};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

static VAR_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"var\((--[a-zA-Z0-9\-_]+)\)").expect("valid var() pattern"));

static DECLARATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(--[a-zA-Z0-9\-_]+)\s*:\s*([^;}]+)").expect("valid declaration pattern"));

/// Counts of nodes changed by one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HydrationReport {
    pub fallbacks: usize,
    pub glitch_mirrors: usize,
    pub years: usize,
}

impl HydrationReport {
    pub fn changed(&self) -> usize {
        self.fallbacks + self.glitch_mirrors + self.years
    }
}

#[derive(Debug, Default)]
pub struct Hydrator {
    tokens: Mutex<HashMap<String, String>>,
}

impl Hydrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit `--name -> raw value` token map
    pub fn with_tokens(tokens: HashMap<String, String>) -> Self {
        Self {
            tokens: Mutex::new(tokens),
        }
    }

    /// Collect every custom property declared anywhere in `css`
    pub fn from_stylesheet(css: &str) -> Self {
        let hydrator = Self::new();
        hydrator.merge_stylesheet(css);
        hydrator
    }

    /// Add the custom properties declared in `css` to the token map
    ///
    /// Later declarations win, as they would for a `:root` rule, so a
    /// merged sheet overrides tokens already in the map. Returns how many
    /// declarations were read.
    pub fn merge_stylesheet(&self, css: &str) -> usize {
        let mut tokens = self.tokens.lock().unwrap();
        let mut merged = 0;
        for c in DECLARATION.captures_iter(css) {
            tokens.insert(c[1].to_string(), c[2].trim().to_string());
            merged += 1;
        }
        merged
    }

    pub fn token(&self, name: &str) -> Option<String> {
        self.tokens.lock().unwrap().get(name).cloned()
    }

    /// Run every hydration step on `scope` and its descendants
    pub fn run(&self, doc: &mut Document, scope: NodeId, year: i32) -> HydrationReport {
        let report = HydrationReport {
            fallbacks: self.hydrate_fallbacks(doc, scope),
            glitch_mirrors: mirror_glitch_text(doc, scope),
            years: stamp_year(doc, scope, year),
        };
        debug!("Hydration pass changed {} nodes", report.changed());
        report
    }

    /// Fill empty `[data-fallback]` nodes from their custom property
    pub fn hydrate_fallbacks(&self, doc: &mut Document, scope: NodeId) -> usize {
        let mut changed = 0;
        for node in subtree_matching(doc, scope, &Selector::attr("data-fallback")) {
            let Some(name) = doc
                .attr(node, "data-fallback")
                .and_then(|expr| VAR_REFERENCE.captures(expr))
                .map(|c| c[1].to_string())
            else {
                continue;
            };
            if !doc.text_content(node).trim().is_empty() {
                continue;
            }
            let Some(raw) = self.resolve(doc, node, &name) else {
                continue;
            };
            let text = decode_css_string(&raw);
            if text.is_empty() {
                continue;
            }
            doc.set_text_content(node, &text);
            changed += 1;
        }
        changed
    }

    fn resolve(&self, doc: &Document, node: NodeId, name: &str) -> Option<String> {
        doc.inclusive_ancestors(node)
            .filter_map(|n| doc.attr(n, "style"))
            .find_map(|style| inline_custom_property(style, name))
            .or_else(|| self.token(name))
            .filter(|v| !v.trim().is_empty())
    }
}

/// Text of every `<style>` element in `doc`, in document order
pub fn style_text(doc: &Document) -> String {
    doc.select_all(doc.root(), &Selector::tag("style"))
        .into_iter()
        .map(|style| doc.text_content(style))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Copy the text of every `.glitch` node into its `text` attribute
pub fn mirror_glitch_text(doc: &mut Document, scope: NodeId) -> usize {
    let mut changed = 0;
    for node in subtree_matching(doc, scope, &Selector::class("glitch")) {
        let text = doc.text_content(node);
        if doc.attr(node, "text") != Some(text.as_str()) {
            doc.set_attr(node, "text", &text);
            changed += 1;
        }
    }
    changed
}

/// Write `year` into every `[data-now-year]` node
pub fn stamp_year(doc: &mut Document, scope: NodeId, year: i32) -> usize {
    let year = year.to_string();
    let mut changed = 0;
    for node in subtree_matching(doc, scope, &Selector::attr("data-now-year")) {
        if doc.text_content(node) != year {
            doc.set_text_content(node, &year);
            changed += 1;
        }
    }
    changed
}

/// Decode a CSS string token into plain text
///
/// Strips one surrounding quote on each side, then expands `\A` to a
/// newline and unescapes quotes.
pub fn decode_css_string(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix(['"', '\''])
        .unwrap_or(trimmed);
    let trimmed = trimmed
        .strip_suffix(['"', '\''])
        .unwrap_or(trimmed);
    trimmed
        .replace("\\A", "\n")
        .replace("\\\"", "\"")
        .replace("\\'", "'")
}

fn inline_custom_property(style: &str, name: &str) -> Option<String> {
    DECLARATION
        .captures_iter(style)
        .filter(|c| &c[1] == name)
        .last()
        .map(|c| c[2].trim().to_string())
}

fn subtree_matching(doc: &Document, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
    let mut nodes = Vec::new();
    if doc.element(scope).map(|el| selector.matches(el)).unwrap_or(false) {
        nodes.push(scope);
    }
    nodes.extend(doc.select_all(scope, selector));
    nodes
}
