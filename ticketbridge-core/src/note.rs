//! Escalation notes
//!
//! A note is exactly four newline-separated lines of at most 350 characters
//! in total:
//!
//! ```text
//! Category: WiFi
//! Escalation Reason: TwoStepsNoResolve
//! Summary: Router drops every evening, reboot did not help
//! Confidence: 0.85
//! ```
//!
//! Lengths are counted in Unicode scalar values.

use crate::classify::{infer_category, infer_escalation_reason};
use crate::enums::{Category, EscalationReason};
use crate::error::ValidationError;
use crate::validation::Confidence;
use serde::{Serialize, Serializer};
use std::fmt;

/// Maximum rendered note length in characters.
pub const MAX_NOTE_CHARS: usize = 350;

/// Number of lines in a note.
pub const NOTE_LINES: usize = 4;

/// Literal line prefixes, in line order.
pub const NOTE_PREFIXES: [&str; NOTE_LINES] = [
    "Category: ",
    "Escalation Reason: ",
    "Summary: ",
    "Confidence: ",
];

/// Window at the end of an over-length note in which a line break is
/// preferred as the cut point.
const LINE_BREAK_WINDOW: usize = 50;

const ELLIPSIS: &str = "...";

/// The four structured fields of a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFields {
    pub category: Category,
    pub reason: EscalationReason,
    pub summary: String,
    pub confidence: Confidence,
}

/// A validated note. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Note(String);

impl Note {
    /// Render the four fields into a note.
    pub fn render(
        category: Category,
        reason: EscalationReason,
        summary: &str,
        confidence: Confidence,
    ) -> Result<Self, ValidationError> {
        if summary.contains(['\n', '\r']) {
            return Err(ValidationError::InvalidValue {
                field: "summary".to_string(),
                reason: "must be a single line".to_string(),
            });
        }
        if summary.trim().is_empty() {
            return Err(ValidationError::EmptyNoteLine { line: 3 });
        }
        let text = format!(
            "{}{}\n{}{}\n{}{}\n{}{}",
            NOTE_PREFIXES[0],
            category,
            NOTE_PREFIXES[1],
            reason,
            NOTE_PREFIXES[2],
            summary,
            NOTE_PREFIXES[3],
            confidence
        );
        check_shape(&text)?;
        Ok(Self(text))
    }

    /// Validate an externally supplied note.
    ///
    /// `\r` and surrounding whitespace are always stripped. With `truncate`,
    /// over-length input is clipped and extra lines dropped before checking.
    pub fn sanitize(raw: &str, truncate: bool) -> Result<Self, ValidationError> {
        let cleaned: String = raw.chars().filter(|c| *c != '\r').collect();
        let mut text = cleaned.trim().to_string();

        if truncate {
            text = clip_to_limit(&text);
            text = text.split('\n').take(NOTE_LINES).collect::<Vec<_>>().join("\n");
            text = text.trim_end().to_string();
        }

        check_shape(&text)?;
        Ok(Self(text))
    }

    /// Build a note from a free-text description.
    ///
    /// Explicit `category` and `reason` win over inference. The description
    /// is collapsed to one line and shortened with `...` to fit the limit.
    pub fn compose(
        description: &str,
        category: Option<Category>,
        reason: Option<EscalationReason>,
        confidence: Confidence,
    ) -> Result<Self, ValidationError> {
        let summary = description.split_whitespace().collect::<Vec<_>>().join(" ");
        if summary.is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "description".to_string(),
            });
        }

        let category = category.unwrap_or_else(|| infer_category(description));
        let reason = reason.unwrap_or_else(|| infer_escalation_reason(description));

        let fixed = NOTE_PREFIXES.iter().map(|p| p.chars().count()).sum::<usize>()
            + category.as_str().len()
            + reason.as_str().len()
            + confidence.to_string().len()
            + (NOTE_LINES - 1);
        let budget = MAX_NOTE_CHARS.saturating_sub(fixed);

        let summary = shorten(&summary, budget);
        Self::render(category, reason, &summary, confidence)
    }

    /// Parse the structured fields back out of the note.
    pub fn fields(&self) -> Result<NoteFields, ValidationError> {
        parse(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Note {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Note {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Parse note text into its fields. Inverse of [`Note::render`].
pub fn parse(text: &str) -> Result<NoteFields, ValidationError> {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() != NOTE_LINES {
        return Err(ValidationError::NoteLineCount {
            lines: lines.len(),
            expected: NOTE_LINES,
        });
    }

    let mut values = [""; NOTE_LINES];
    for (index, (line, prefix)) in lines.iter().zip(NOTE_PREFIXES).enumerate() {
        let value = line
            .strip_prefix(prefix)
            .ok_or(ValidationError::MissingNotePrefix {
                line: index + 1,
                prefix,
            })?;
        if value.trim().is_empty() {
            return Err(ValidationError::EmptyNoteLine { line: index + 1 });
        }
        values[index] = value;
    }

    let category = values[0]
        .trim()
        .parse::<Category>()
        .map_err(|e| ValidationError::InvalidValue {
            field: "category".to_string(),
            reason: e.to_string(),
        })?;
    let reason = values[1]
        .trim()
        .parse::<EscalationReason>()
        .map_err(|e| ValidationError::InvalidValue {
            field: "escalationReason".to_string(),
            reason: e.to_string(),
        })?;
    let confidence = values[3].parse::<Confidence>()?;

    Ok(NoteFields {
        category,
        reason,
        summary: values[2].to_string(),
        confidence,
    })
}

fn check_shape(text: &str) -> Result<(), ValidationError> {
    let chars = text.chars().count();
    if chars > MAX_NOTE_CHARS {
        return Err(ValidationError::NoteTooLong {
            chars,
            max: MAX_NOTE_CHARS,
        });
    }

    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() != NOTE_LINES {
        return Err(ValidationError::NoteLineCount {
            lines: lines.len(),
            expected: NOTE_LINES,
        });
    }

    if let Some(index) = lines.iter().position(|line| line.trim().is_empty()) {
        return Err(ValidationError::EmptyNoteLine { line: index + 1 });
    }
    Ok(())
}

/// Clip to `MAX_NOTE_CHARS`, cutting at a line break near the end when that
/// still leaves a full note.
fn clip_to_limit(text: &str) -> String {
    if text.chars().count() <= MAX_NOTE_CHARS {
        return text.to_string();
    }

    let clipped: String = text.chars().take(MAX_NOTE_CHARS).collect();
    let window_start = MAX_NOTE_CHARS - LINE_BREAK_WINDOW;

    let last_break = clipped
        .char_indices()
        .enumerate()
        .filter(|(_, (_, c))| *c == '\n')
        .map(|(char_pos, (byte_pos, _))| (char_pos, byte_pos))
        .last();

    if let Some((char_pos, byte_pos)) = last_break {
        let head = &clipped[..byte_pos];
        if char_pos >= window_start && head.split('\n').count() >= NOTE_LINES {
            return head.to_string();
        }
    }
    clipped
}

fn shorten(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }
    let keep = budget.saturating_sub(ELLIPSIS.len());
    let head: String = text.chars().take(keep).collect();
    format!("{}{}", head.trim_end(), ELLIPSIS)
}
