//! The OPTIONS-handler rewrite
//!
//! Recognizes the inlined preflight handler
//!
//! ```text
//! if ("OPTIONS".equals(exchange.getRequestMethod())) {
//!     exchange.sendResponseHeaders(200, -1);
//!     exchange.close();
//!     return;
//! ```
//!
//! and replaces its body with a single call to an extracted helper. Matching is
//! purely textual: whitespace between the statements is free, everything else is
//! literal.

use anyhow::{Context, Result};
use regex::{NoExpand, Regex};

/// Helper the handler body is extracted into unless configured otherwise
pub const DEFAULT_HELPER: &str = "handleOptions";

/// Printed after every run, whether or not anything was replaced
pub const SUCCESS_MESSAGE: &str = "✓ All OPTIONS handlers updated!";

const INLINED_HANDLER: &str = r#"if \("OPTIONS"\.equals\(exchange\.getRequestMethod\(\)\)\) \{\s*exchange\.sendResponseHeaders\(200, -1\);\s*exchange\.close\(\);\s*return;"#;

const GUARD: &str = r#"if ("OPTIONS".equals(exchange.getRequestMethod())) {"#;

// Handler bodies in the target sit two levels inside an anonymous HttpHandler.
const BODY_INDENT: &str = "                ";

/// Result of running the rewrite over a piece of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub content: String,
    pub replacements: usize,
}

impl PatchOutcome {
    /// True when the pattern did not occur and `content` equals the input
    pub fn is_noop(&self) -> bool {
        self.replacements == 0
    }
}

/// Compiled OPTIONS-handler substitution
#[derive(Debug, Clone)]
pub struct OptionsPatch {
    pattern: Regex,
    helper: String,
    replacement: String,
}

impl OptionsPatch {
    /// Build the substitution for the given helper method name
    pub fn new(helper: &str) -> Result<Self> {
        validate_helper_name(helper)?;

        let pattern = Regex::new(INLINED_HANDLER)
            .with_context(|| format!("Invalid regex pattern: {}", INLINED_HANDLER))?;

        let replacement = format!(
            "{GUARD}\n{BODY_INDENT}{helper}(exchange);\n{BODY_INDENT}return;"
        );

        Ok(Self {
            pattern,
            helper: helper.to_string(),
            replacement,
        })
    }

    pub fn helper(&self) -> &str {
        &self.helper
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Number of non-overlapping inlined handlers in `content`
    pub fn count_matches(&self, content: &str) -> usize {
        self.pattern.find_iter(content).count()
    }

    /// Replace every non-overlapping inlined handler in `content`
    ///
    /// The replacement is inserted literally, so a `$` in the helper name is
    /// never read as a capture group reference.
    pub fn apply(&self, content: &str) -> PatchOutcome {
        let replacements = self.count_matches(content);
        if replacements == 0 {
            return PatchOutcome {
                content: content.to_string(),
                replacements,
            };
        }

        let content = self
            .pattern
            .replace_all(content, NoExpand(&self.replacement))
            .into_owned();

        PatchOutcome {
            content,
            replacements,
        }
    }
}

/// Check that `name` can stand as a Java method name
pub fn validate_helper_name(name: &str) -> Result<()> {
    let mut chars = name.chars();

    let Some(first) = chars.next() else {
        anyhow::bail!("Helper name must not be empty");
    };

    if !(first.is_alphabetic() || first == '_' || first == '$') {
        anyhow::bail!(
            "Invalid helper name: '{}' (must start with a letter, '_' or '$')",
            name
        );
    }

    if let Some(bad) = chars.find(|c| !(c.is_alphanumeric() || *c == '_' || *c == '$')) {
        anyhow::bail!("Invalid helper name: '{}' (unexpected character '{}')", name, bad);
    }

    Ok(())
}
