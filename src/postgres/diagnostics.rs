// ABOUTME: Classifies stderr from PostgreSQL client tools into warnings and errors
// ABOUTME: Relies on tools running with LC_ALL=C so severity tags are untranslated

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Benign,
    Error,
}

// Checked case-insensitively; the earliest tag on a line wins.
const BENIGN_TAGS: &[&str] = &["warning:", "notice:", "info:", "log:"];
const ERROR_TAGS: &[&str] = &["error:", "fatal:", "panic:"];
const CONTINUATION_TAGS: &[&str] = &["detail:", "hint:", "context:", "line "];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl Diagnostics {
    pub fn is_fatal(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_summary(&self) -> String {
        self.errors.join("; ")
    }
}

/// Split tool stderr into benign lines (warnings, notices) and errors.
///
/// Detail/hint lines and untagged lines (wrapped messages, multi-line
/// DETAIL bodies) inherit the severity of the line before them. An untagged
/// first line counts as an error.
pub fn classify(stderr: &str) -> Diagnostics {
    let mut diagnostics = Diagnostics::default();
    let mut previous: Option<Severity> = None;

    for line in stderr.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let lower = line.to_ascii_lowercase();
        let severity = match earliest_tag(&lower) {
            Some(Tag::Benign) => Severity::Benign,
            Some(Tag::Error) => Severity::Error,
            Some(Tag::Continuation) | None => previous.unwrap_or(Severity::Error),
        };

        match severity {
            Severity::Benign => diagnostics.warnings.push(line.to_string()),
            Severity::Error => diagnostics.errors.push(line.to_string()),
        }
        previous = Some(severity);
    }

    diagnostics
}

/// `createdb` reports an existing target as a plain error; the wording is
/// stable under the C locale.
pub fn is_already_exists(stderr: &str) -> bool {
    stderr.contains("already exists") || stderr.contains("42P04")
}

enum Tag {
    Benign,
    Error,
    Continuation,
}

fn earliest_tag(lower: &str) -> Option<Tag> {
    let find = |tags: &[&str]| tags.iter().filter_map(|t| lower.find(t)).min();

    [
        (find(BENIGN_TAGS), Tag::Benign),
        (find(ERROR_TAGS), Tag::Error),
        (find(CONTINUATION_TAGS), Tag::Continuation),
    ]
    .into_iter()
    .filter_map(|(pos, tag)| pos.map(|p| (p, tag)))
    .min_by_key(|(pos, _)| *pos)
    .map(|(_, tag)| tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stderr_is_clean() {
        let d = classify("");
        assert!(!d.is_fatal());
        assert!(d.warnings.is_empty());
    }

    #[test]
    fn test_warnings_and_notices_are_benign() {
        let d = classify(
            "pg_dump: warning: there are circular foreign-key constraints on this table:\n\
             pg_dump: detail: orders\n\
             psql:<stdin>:1: NOTICE:  drop cascades to 3 other objects\n",
        );
        assert!(!d.is_fatal(), "errors: {:?}", d.errors);
        assert_eq!(d.warnings.len(), 3);
    }

    #[test]
    fn test_error_lines_are_fatal() {
        let d = classify(
            "pg_dump: error: connection to server at \"db\" (10.0.0.5), port 5432 failed: Connection refused\n\
             \tIs the server running on that host and accepting TCP/IP connections?\n",
        );
        assert!(d.is_fatal());
        assert!(d.error_summary().contains("Connection refused"));
    }

    #[test]
    fn test_error_mentioning_warning_word_later_stays_error() {
        let d = classify("pg_restore: error: could not execute query: warning: relation exists");
        assert!(d.is_fatal());
    }

    #[test]
    fn test_multi_line_cascade_notice_is_benign() {
        let d = classify(
            "psql:<stdin>:1: NOTICE:  drop cascades to 2 other objects\n\
             DETAIL:  drop cascades to table users\n\
             drop cascades to table orders\n",
        );
        assert!(!d.is_fatal(), "errors: {:?}", d.errors);
        assert_eq!(d.warnings.len(), 3);
    }

    #[test]
    fn test_untagged_first_line_is_error() {
        let d = classify("could not translate host name \"db\" to address\n");
        assert!(d.is_fatal());
    }

    #[test]
    fn test_detail_after_error_is_error() {
        let d = classify("ERROR:  permission denied\nDETAIL:  must be owner");
        assert_eq!(d.errors.len(), 2);
    }

    #[test]
    fn test_already_exists_detection() {
        assert!(is_already_exists(
            "createdb: error: database creation failed: ERROR:  database \"test_clone_db\" already exists"
        ));
        assert!(!is_already_exists("createdb: error: could not connect"));
    }
}
