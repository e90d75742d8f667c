//! Interactive keep selection over any `BufRead`/`Write` pair.

use std::io::{self, BufRead, Write};

use super::plan::KeepSelection;
use crate::duplicates::{DuplicateGroup, GroupKind};

/// Prompt shown after each group.
pub const KEEP_PROMPT: &str = "Enter number to keep (or 'skip' to keep all): ";

/// Ask a yes/no question. Only `y`/`yes` (any case) is a yes; EOF is a no.
///
/// # Errors
///
/// Returns an error if reading or writing fails.
pub fn confirm<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> io::Result<bool> {
    write!(output, "{question} [y/N] ")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        writeln!(output)?;
        return Ok(false);
    }
    let answer = line.trim();
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}

/// Present every group and read one answer per group.
///
/// On EOF prompting stops; the returned vector is then shorter than
/// `groups` and the remaining groups count as having no selection.
///
/// # Errors
///
/// Returns an error if reading or writing fails.
pub fn prompt_selections<R: BufRead, W: Write>(
    groups: &[DuplicateGroup],
    input: &mut R,
    output: &mut W,
) -> io::Result<Vec<KeepSelection>> {
    let mut selections = Vec::with_capacity(groups.len());

    for (i, group) in groups.iter().enumerate() {
        writeln!(output)?;
        match &group.kind {
            GroupKind::Exact { digest } => {
                writeln!(output, "Group {} - duplicates for hash {}", i + 1, digest)?;
            }
            GroupKind::Similar { threshold, .. } => {
                writeln!(output, "Group {} - similar images (threshold {:.2})", i + 1, threshold)?;
            }
        }
        for (n, file) in group.files.iter().enumerate() {
            writeln!(output, "  {}. {}", n + 1, file.path.display())?;
        }
        write!(output, "{KEEP_PROMPT}")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            log::debug!("Input closed after {} of {} groups", i, groups.len());
            break;
        }
        let selection = KeepSelection::parse(&line);
        if let KeepSelection::Invalid(error) = &selection {
            writeln!(output, "Invalid choice ({error}); skipping")?;
        }
        selections.push(selection);
    }

    Ok(selections)
}
