//! Feedback templates
//!
//! TigerStyle: Selection is a pure function of the template list and the RNG,
//! so a seeded RNG gives a reproducible pick.

use rand::seq::SliceRandom;
use rand::Rng;

/// Ordered set of success message templates
#[derive(Debug, Clone)]
pub struct TemplateSet {
    templates: Vec<String>,
}

impl TemplateSet {
    pub fn new(templates: Vec<String>) -> Self {
        Self { templates }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.templates
    }

    /// Choose one template uniformly at random. `None` only when empty.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.templates.choose(rng).map(String::as_str)
    }

    /// Pick and render in one step
    pub fn render_random<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        new_name: &str,
        reason: &str,
    ) -> Option<String> {
        self.pick(rng)
            .map(|template| render_template(template, new_name, reason))
    }
}

/// Substitute `{new_name}` and `{reason}`.
///
/// `{{` and `}}` produce literal braces. Any other `{...}` is copied through
/// unchanged, as is a lone unmatched brace.
pub fn render_template(template: &str, new_name: &str, reason: &str) -> String {
    let mut out = String::with_capacity(template.len() + new_name.len() + reason.len());
    let mut rest = template;

    while let Some(pos) = rest.find(&['{', '}'][..]) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(after) = tail.strip_prefix("{{") {
            out.push('{');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("}}") {
            out.push('}');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{new_name}") {
            out.push_str(new_name);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{reason}") {
            out.push_str(reason);
            rest = after;
        } else {
            // Single brace, copied as-is
            out.push_str(&tail[..1]);
            rest = &tail[1..];
        }
    }
    out.push_str(rest);

    out
}

// =============================================================================
// Tests
// =============================================================================
