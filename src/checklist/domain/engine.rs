//! Checkbox parsing, diffing, and minimal patching of Markdown documents.

use super::{ChecklistChange, ChecklistChecksum, ChecklistError, ChecklistItem};
use regex::Regex;
use std::collections::{HashMap, HashSet};

const HEADING_PATTERN: &str = r"^#{1,6}\s+(.+)$";
const CHECKBOX_PATTERN: &str = r"^(\s*-\s*\[)( |x|X)(\]\s*)(.+)$";

/// Parses, hashes, diffs, and patches checkbox lists.
///
/// The engine only ever reports and applies boolean flips on items present
/// in both compared snapshots. Structural additions and removals are out of
/// its scope: two checklists are assumed to share structure and differ only
/// in check state.
///
/// # Duplicate items
///
/// Duplicate `(section, text)` pairs are not disambiguated. [`Self::diff`]
/// compares the first occurrence on each side and [`Self::apply`] patches the
/// first match within the item's section.
#[derive(Debug, Clone)]
pub struct ChecklistDiffEngine {
    heading: Regex,
    checkbox: Regex,
}

impl ChecklistDiffEngine {
    /// Compiles the heading and checkbox line patterns.
    ///
    /// # Errors
    ///
    /// Returns [`ChecklistError::InvalidPattern`] if a pattern fails to
    /// compile.
    pub fn new() -> Result<Self, ChecklistError> {
        Ok(Self {
            heading: compile(HEADING_PATTERN)?,
            checkbox: compile(CHECKBOX_PATTERN)?,
        })
    }

    /// Extracts checklist items in document order.
    ///
    /// Heading lines (`#` through `######`) set the current section; checkbox
    /// lines are recorded against it. Items with empty labels and all other
    /// lines are ignored.
    #[must_use]
    pub fn parse(&self, document: &str) -> Vec<ChecklistItem> {
        let mut section = String::new();
        let mut items = Vec::new();
        for (index, line) in document.lines().enumerate() {
            if let Some(heading) = self.heading_text(line) {
                heading.trim().clone_into(&mut section);
                continue;
            }
            if let Some((checked, text)) = self.checkbox(line) {
                items.push(ChecklistItem::new(section.as_str(), text, checked, index));
            }
        }
        items
    }

    /// Computes the order-sensitive checksum of a snapshot.
    #[must_use]
    pub fn hash(items: &[ChecklistItem]) -> ChecklistChecksum {
        ChecklistChecksum::compute(items)
    }

    /// Reports check-state flips between two snapshots.
    ///
    /// Only keys present on both sides are compared; the result follows the
    /// order of `source`.
    #[must_use]
    pub fn diff(source: &[ChecklistItem], target: &[ChecklistItem]) -> Vec<ChecklistChange> {
        let mut target_state: HashMap<(&str, &str), bool> = HashMap::new();
        for item in target {
            target_state.entry(item.key()).or_insert(item.checked());
        }

        let mut seen = HashSet::new();
        source
            .iter()
            .filter(|item| seen.insert(item.key()))
            .filter_map(|item| {
                let target_checked = *target_state.get(&item.key())?;
                (target_checked != item.checked()).then(|| {
                    ChecklistChange::new(
                        item.section(),
                        item.text(),
                        item.checked(),
                        target_checked,
                    )
                })
            })
            .collect()
    }

    /// Flips the checkbox marker of each changed item in `document`.
    ///
    /// Each change rewrites the first line under the change's section whose
    /// label and current marker match the change's text and old value.
    /// Indentation, bullet spacing, trailing content, and line endings are
    /// preserved. Changes without a matching line are skipped. An empty
    /// change list returns the document unchanged.
    #[must_use]
    pub fn apply(&self, document: &str, changes: &[ChecklistChange]) -> String {
        if changes.is_empty() {
            return document.to_owned();
        }

        let mut section = String::new();
        let mut lines: Vec<PatchLine> = document
            .split_inclusive('\n')
            .map(|raw| {
                let (body, ending) = split_line_ending(raw);
                if let Some(heading) = self.heading_text(body) {
                    heading.trim().clone_into(&mut section);
                }
                PatchLine {
                    body: body.to_owned(),
                    ending,
                    section: section.clone(),
                }
            })
            .collect();

        for change in changes {
            let target = lines.iter_mut().find(|line| {
                line.section == change.section
                    && self.checkbox(&line.body).is_some_and(|(checked, text)| {
                        checked == change.old_value && text == change.text
                    })
            });
            let Some(line) = target else {
                tracing::debug!(
                    section = %change.section,
                    text = %change.text,
                    "no matching checkbox line, change skipped"
                );
                continue;
            };
            if let Some(rewritten) = self.rewrite_marker(&line.body, change.new_value) {
                line.body = rewritten;
            }
        }

        lines
            .into_iter()
            .map(|line| line.body + line.ending)
            .collect()
    }

    fn heading_text<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.heading
            .captures(line)
            .and_then(|captures| captures.get(1))
            .map(|capture| capture.as_str())
    }

    fn checkbox<'a>(&self, line: &'a str) -> Option<(bool, &'a str)> {
        let captures = self.checkbox.captures(line)?;
        let checked = captures.get(2)?.as_str() != " ";
        let text = captures.get(4)?.as_str().trim();
        (!text.is_empty()).then_some((checked, text))
    }

    fn rewrite_marker(&self, line: &str, checked: bool) -> Option<String> {
        let captures = self.checkbox.captures(line)?;
        let prefix = captures.get(1)?.as_str();
        let closing = captures.get(3)?.as_str();
        let rest = captures.get(4)?.as_str();
        let marker = if checked { 'x' } else { ' ' };
        Some(format!("{prefix}{marker}{closing}{rest}"))
    }
}

struct PatchLine {
    body: String,
    ending: &'static str,
    section: String,
}

fn compile(pattern: &str) -> Result<Regex, ChecklistError> {
    Regex::new(pattern).map_err(|err| ChecklistError::InvalidPattern {
        pattern: pattern.to_owned(),
        reason: err.to_string(),
    })
}

fn split_line_ending(raw: &str) -> (&str, &'static str) {
    if let Some(body) = raw.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = raw.strip_suffix('\n') {
        (body, "\n")
    } else {
        (raw, "")
    }
}
