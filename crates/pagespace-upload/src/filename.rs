//! Filename sanitization (spec.md §4.10 step 5): replace odd Unicode
//! whitespace with ordinary space, collapse runs, trim the ends.

const WEIRD_SPACES: [char; 5] = ['\u{00A0}', '\u{202F}', '\u{FEFF}', '\u{2000}', '\u{200B}'];

fn is_weird_space(c: char) -> bool {
    WEIRD_SPACES.contains(&c) || ('\u{2000}'..='\u{200B}').contains(&c)
}

/// Normalize a user-supplied filename for storage and display.
#[must_use]
pub fn sanitize_filename(raw: &str) -> String {
    let normalized: String = raw.chars().map(|c| if is_weird_space(c) { ' ' } else { c }).collect();

    let mut out = String::with_capacity(normalized.len());
    let mut prev_was_space = false;
    for c in normalized.trim().chars() {
        if c.is_whitespace() {
            if !prev_was_space {
                out.push(' ');
            }
            prev_was_space = true;
        } else {
            out.push(c);
            prev_was_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_nbsp_and_narrow_nbsp() {
        assert_eq!(sanitize_filename("a\u{00A0}b\u{202F}c"), "a b c");
    }

    #[test]
    fn replaces_zero_width_and_bom() {
        assert_eq!(sanitize_filename("a\u{200B}b\u{FEFF}c"), "a b c");
    }

    #[test]
    fn collapses_runs_of_whitespace() {
        assert_eq!(sanitize_filename("a   b\t\tc"), "a b c");
    }

    #[test]
    fn trims_leading_and_trailing_whitespace() {
        assert_eq!(sanitize_filename("  report.pdf  "), "report.pdf");
    }

    #[test]
    fn leaves_ordinary_filenames_untouched() {
        assert_eq!(sanitize_filename("Q3-summary_v2.docx"), "Q3-summary_v2.docx");
    }

    #[test]
    fn combination_of_weird_whitespace_and_trim() {
        assert_eq!(sanitize_filename("  \u{00A0}final\u{2000}\u{2000}report.csv\u{FEFF}  "), "final report.csv");
    }
}
