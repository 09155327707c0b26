//! Markdown templates for issue bodies and progress comments.

use super::TrackerDomainError;
use minijinja::{Environment, context};

const PARENT_BODY_TEMPLATE: &str = "\
**Phase:** {{ phase }}
**Document:** `{{ document }}`
{% if checklist %}
**Checklist**

{{ checklist }}
{% endif %}";

const CHILD_BODY_TEMPLATE: &str = "\
{{ description }}

Part of #{{ parent }}";

const PROGRESS_TEMPLATE: &str = "\
Progress: {{ completed }}/{{ total }} checklist items complete ({{ percent }}%).
{% if pending %}
Remaining:
{% for item in pending %}- {{ item }}
{% endfor %}{% endif %}";

/// Context for rendering a parent issue body.
#[derive(Debug, Clone, Copy)]
pub struct ParentBody<'a> {
    /// Current phase name.
    pub phase: &'a str,
    /// Path of the backing document.
    pub document: &'a str,
    /// Checklist lines to mirror, possibly empty.
    pub checklist: &'a str,
}

/// Renders the body of a parent issue.
///
/// # Errors
///
/// Returns [`TrackerDomainError::TemplateRender`] when rendering fails.
pub fn render_parent_body(body: ParentBody<'_>) -> Result<String, TrackerDomainError> {
    render(
        "parent body",
        PARENT_BODY_TEMPLATE,
        context! {
            phase => body.phase,
            document => body.document,
            checklist => body.checklist.trim_end(),
        },
    )
}

/// Renders the body of a child issue.
///
/// # Errors
///
/// Returns [`TrackerDomainError::TemplateRender`] when rendering fails.
pub fn render_child_body(description: &str, parent: u64) -> Result<String, TrackerDomainError> {
    render(
        "child body",
        CHILD_BODY_TEMPLATE,
        context! { description => description.trim(), parent => parent },
    )
}

/// Renders an implementation progress comment.
///
/// # Errors
///
/// Returns [`TrackerDomainError::TemplateRender`] when rendering fails.
pub fn render_progress_comment(
    completed: usize,
    total: usize,
    percent: usize,
    pending: &[&str],
) -> Result<String, TrackerDomainError> {
    render(
        "progress comment",
        PROGRESS_TEMPLATE,
        context! { completed, total, percent, pending },
    )
}

fn render(
    template: &'static str,
    source: &str,
    ctx: minijinja::Value,
) -> Result<String, TrackerDomainError> {
    Environment::new()
        .render_str(source, ctx)
        .map_err(|err| TrackerDomainError::TemplateRender {
            template,
            reason: err.to_string(),
        })
}
