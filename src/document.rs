//! Configuration documents
//!
//! A [`ConfDocument`] is an ordered, mutable collection of assignments
//! backed by a file path. Two instances drive a setup run: the build
//! variables document (`conf/local.conf`) and the layer search list
//! (`conf/bblayers.conf`).
//!
//! ## No-clobber policy
//!
//! A document constructed over a path whose file already exists is
//! permanently read-only: every mutating operation becomes a no-op for
//! its lifetime, and `write` never touches the file. A hand-edited
//! configuration is never overwritten. Non-quiet documents log a warning
//! once at construction so the user knows their file was left alone.
//!
//! ## Round-trip fidelity
//!
//! `read` keeps assignments in file order including duplicate bindings of
//! one variable, and `write` re-emits them with their exact per-token
//! whitespace runs. The only rewriting applied on the way out is the
//! contiguous `+=` merge of [`ConfDocument::simplify`] and the value
//! quoting/reflow of [`format_value`].

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;

use crate::assignment::{parse_assignment, tokenize, Assignment, Operator};
use crate::error::Result;

/// Values longer than this are reflowed into a continuation block.
const REFLOW_LIMIT: usize = 65;

/// An ordered assignment document backed by a file.
#[derive(Debug)]
pub struct ConfDocument {
    path: PathBuf,
    read_only: bool,
    assignments: Vec<Assignment>,
}

impl ConfDocument {
    /// Create a document over `path`, warning when an existing file makes
    /// it read-only.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_options(path.into(), false)
    }

    /// Create a document over `path` without the read-only warning.
    ///
    /// Used for foreign files we only ever inspect, like `layer.conf`.
    pub fn new_quiet(path: impl Into<PathBuf>) -> Self {
        Self::with_options(path.into(), true)
    }

    fn with_options(path: PathBuf, quiet: bool) -> Self {
        let read_only = path.exists();
        if read_only && !quiet {
            warn!("{} exists. Not overwriting it.", path.display());
        }
        Self {
            path,
            read_only,
            assignments: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// The current assignment sequence, in document order.
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// First value bound to `var`, if any.
    pub fn get(&self, var: &str) -> Option<&[String]> {
        self.assignments
            .iter()
            .find(|a| a.variable == var)
            .map(|a| a.value.as_slice())
    }

    /// Populate the document from its backing file.
    ///
    /// Only valid once the file is guaranteed to exist (after the
    /// bootstrap, for the primary documents). Blank lines, comments and
    /// `require`/`include` directives are dropped; backslash-continued
    /// lines are joined before parsing; everything that parses as an
    /// assignment is kept in file order.
    pub fn read(&mut self) -> Result<()> {
        let content = fs::read_to_string(&self.path)?;
        self.assignments.clear();
        for line in logical_lines(&content) {
            if let Some(assignment) = parse_assignment(&line)? {
                self.assignments.push(assignment);
            }
        }
        Ok(())
    }

    /// Append a binding. No-op when read-only; duplicates are not merged
    /// at add time.
    pub fn add(&mut self, var: &str, op: Operator, val: &str) {
        self.push(Assignment::new(var, op, tokenize(val)));
    }

    /// Append an already-tokenized assignment. No-op when read-only.
    pub fn push(&mut self, assignment: Assignment) {
        if self.read_only {
            return;
        }
        self.assignments.push(assignment);
    }

    /// Delete every binding of `var`, keeping the rest in order. No-op
    /// when read-only.
    pub fn remove(&mut self, var: &str) {
        if self.read_only {
            return;
        }
        self.assignments.retain(|a| a.variable != var);
    }

    /// Replace all bindings of `var` with exactly one, placed at the end.
    pub fn reset(&mut self, var: &str, op: Operator, val: &str) {
        self.remove(var);
        self.add(var, op, val);
    }

    /// Merge contiguous `+=` runs of one variable into single bindings.
    ///
    /// Only an assignment immediately following another binding of the
    /// same variable, with both using `+=`, is merged (token sequences
    /// concatenate). Non-adjacent duplicates and differing operators stay
    /// distinct in original order: this is a syntactic accumulation, not
    /// last-writer-wins.
    pub fn simplify(&self) -> Vec<Assignment> {
        let mut simplified: Vec<Assignment> = Vec::new();
        for assignment in &self.assignments {
            if let Some(prev) = simplified.last_mut() {
                if prev.variable == assignment.variable
                    && prev.operator == Operator::Append
                    && assignment.operator == Operator::Append
                {
                    prev.value.extend(assignment.value.iter().cloned());
                    continue;
                }
            }
            simplified.push(assignment.clone());
        }
        simplified
    }

    /// Persist the simplified document, overwriting the file. No-op when
    /// read-only.
    pub fn write(&self) -> Result<()> {
        if self.read_only {
            return Ok(());
        }
        let mut out = String::new();
        for assignment in self.simplify() {
            out.push_str(&format!(
                "{} {} {}\n",
                assignment.variable,
                assignment.operator,
                format_value(&assignment.value)
            ));
        }
        fs::write(&self.path, out)?;
        Ok(())
    }
}

/// Join backslash-continued physical lines into logical lines.
///
/// Comment and blank lines reset any pending continuation buffer, then
/// are dropped.
fn logical_lines(content: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut buffer = String::new();
    for line in content.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            buffer.clear();
            continue;
        }
        if let Some(continued) = line.strip_suffix('\\') {
            buffer.push_str(continued);
            continue;
        }
        if buffer.is_empty() {
            lines.push(line.to_string());
        } else {
            buffer.push_str(line);
            lines.push(std::mem::take(&mut buffer));
        }
    }
    lines
}

/// Shell-style single quoting, forced even where quoting could be
/// omitted. Written values must always be visibly quoted.
fn single_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            // Close, escape the quote, reopen.
            quoted.push_str("'\"'\"'");
        } else {
            quoted.push(ch);
        }
    }
    quoted.push('\'');
    quoted
}

/// Format a token sequence for writing.
///
/// Tokens are joined with single spaces and single-quoted. A quoted value
/// longer than 65 characters with at least two fragments is reflowed into
/// a backslash-continued, 4-space-indented block bounded by the opening
/// and closing quote.
pub fn format_value(tokens: &[String]) -> String {
    let quoted = single_quote(&tokens.join(" "));
    if quoted.len() <= REFLOW_LIMIT {
        return quoted;
    }
    let fragments: Vec<&str> = quoted.split_whitespace().collect();
    if fragments.len() < 2 {
        return quoted;
    }

    let mut reflowed = String::from("'\\\n");
    for (index, fragment) in fragments.iter().enumerate() {
        let fragment = if index == 0 {
            // Strip the opening quote; the block supplies its own.
            &fragment[1..]
        } else if index == fragments.len() - 1 {
            &fragment[..fragment.len() - 1]
        } else {
            fragment
        };
        reflowed.push_str("    ");
        reflowed.push_str(fragment);
        reflowed.push_str(" \\\n");
    }
    reflowed.push('\'');
    reflowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn doc_in(dir: &TempDir, name: &str) -> ConfDocument {
        ConfDocument::new_quiet(dir.path().join(name))
    }

    mod logical_line_tests {
        use super::*;

        #[test]
        fn test_blank_and_comment_lines_dropped() {
            let lines = logical_lines("# header\n\nFOO = 'bar'\n");
            assert_eq!(lines, vec!["FOO = 'bar'"]);
        }

        #[test]
        fn test_continuation_joined() {
            let lines = logical_lines("FOO = '\\\n    a \\\n    b \\\n'\n");
            assert_eq!(lines, vec!["FOO = '    a     b '"]);
        }

        #[test]
        fn test_comment_resets_continuation_buffer() {
            let lines = logical_lines("FOO = 'a \\\n# interrupting comment\nBAR = 'b'\n");
            assert_eq!(lines, vec!["BAR = 'b'"]);
        }
    }

    mod format_value_tests {
        use super::*;

        fn toks(words: &[&str]) -> Vec<String> {
            words.iter().map(|w| w.to_string()).collect()
        }

        #[test]
        fn test_format_always_quotes() {
            assert_eq!(format_value(&toks(&["8"])), "'8'");
            assert_eq!(format_value(&toks(&["foo", "bar"])), "'foo bar'");
        }

        #[test]
        fn test_format_empty_value() {
            assert_eq!(format_value(&[]), "''");
        }

        #[test]
        fn test_format_embedded_single_quote() {
            assert_eq!(format_value(&toks(&["it's"])), "'it'\"'\"'s'");
        }

        #[test]
        fn test_format_preserves_edge_runs() {
            let tokens = vec![" foo".to_string(), "bar  ".to_string()];
            assert_eq!(format_value(&tokens), "' foo bar  '");
        }

        #[test]
        fn test_format_long_value_reflows() {
            let tokens = toks(&[
                "/ws/sources/meta-alpha",
                "/ws/sources/meta-bravo",
                "/ws/sources/meta-charlie",
            ]);
            let formatted = format_value(&tokens);
            assert!(formatted.starts_with("'\\\n"));
            assert!(formatted.ends_with("\\\n'"));
            assert!(formatted.contains("    /ws/sources/meta-alpha \\\n"));
            assert!(formatted.contains("    /ws/sources/meta-charlie \\\n"));
        }

        #[test]
        fn test_format_long_single_fragment_not_reflowed() {
            let long = "x".repeat(80);
            let formatted = format_value(&[long.clone()]);
            assert_eq!(formatted, format!("'{}'", long));
        }
    }

    mod document_tests {
        use super::*;

        #[test]
        fn test_read_keeps_file_order_and_duplicates() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("local.conf");
            fs::write(
                &path,
                "BB_NUMBER_THREADS = '8'\nIMAGE_INSTALL += 'vim'\nMACHINE ?= 'qemuarm'\nIMAGE_INSTALL += 'git'\n",
            )
            .unwrap();

            let mut doc = ConfDocument::new_quiet(&path);
            doc.read().unwrap();

            let vars: Vec<&str> = doc
                .assignments()
                .iter()
                .map(|a| a.variable.as_str())
                .collect();
            assert_eq!(
                vars,
                vec!["BB_NUMBER_THREADS", "IMAGE_INSTALL", "MACHINE", "IMAGE_INSTALL"]
            );
        }

        #[test]
        fn test_existing_file_makes_document_read_only() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("local.conf");
            let original = "MACHINE ?= 'wandboard-solo'\n";
            fs::write(&path, original).unwrap();

            let mut doc = ConfDocument::new_quiet(&path);
            assert!(doc.is_read_only());
            doc.read().unwrap();

            doc.add("FOO", Operator::Assign, "a foo");
            assert!(doc.get("FOO").is_none());

            doc.remove("MACHINE");
            assert_eq!(doc.get("MACHINE").unwrap(), ["wandboard-solo"]);

            doc.reset("MACHINE", Operator::Assign, "other");
            assert_eq!(doc.get("MACHINE").unwrap(), ["wandboard-solo"]);

            doc.write().unwrap();
            assert_eq!(fs::read_to_string(&path).unwrap(), original);
        }

        #[test]
        fn test_missing_file_allows_mutation() {
            let dir = TempDir::new().unwrap();
            let mut doc = doc_in(&dir, "local.conf");
            assert!(!doc.is_read_only());

            doc.add("FOO", Operator::Assign, "a foo");
            assert_eq!(doc.get("FOO").unwrap(), ["a", "foo"]);
        }

        #[test]
        fn test_add_tokenizes_with_edge_runs() {
            let dir = TempDir::new().unwrap();
            let mut doc = doc_in(&dir, "local.conf");
            doc.add("PREPEND_prepend", Operator::Assign, " xxx yyy  ");
            assert_eq!(doc.get("PREPEND_prepend").unwrap(), [" xxx", "yyy  "]);
        }

        #[test]
        fn test_add_empty_value() {
            let dir = TempDir::new().unwrap();
            let mut doc = doc_in(&dir, "local.conf");
            doc.add("EMPTY", Operator::Assign, "");
            assert_eq!(doc.get("EMPTY").unwrap(), Vec::<String>::new().as_slice());
        }

        #[test]
        fn test_remove_deletes_all_bindings() {
            let dir = TempDir::new().unwrap();
            let mut doc = doc_in(&dir, "local.conf");
            doc.add("X", Operator::Append, "a");
            doc.add("KEEP", Operator::Assign, "v");
            doc.add("X", Operator::Append, "b");
            doc.remove("X");

            let vars: Vec<&str> = doc
                .assignments()
                .iter()
                .map(|a| a.variable.as_str())
                .collect();
            assert_eq!(vars, vec!["KEEP"]);
        }

        #[test]
        fn test_reset_replaces_with_single_binding_at_end() {
            let dir = TempDir::new().unwrap();
            let mut doc = doc_in(&dir, "local.conf");
            doc.add("MACHINE", Operator::Assign, "one");
            doc.add("OTHER", Operator::Assign, "v");
            doc.add("MACHINE", Operator::Append, "two");
            doc.reset("MACHINE", Operator::Default, "three");

            let vars: Vec<&str> = doc
                .assignments()
                .iter()
                .map(|a| a.variable.as_str())
                .collect();
            assert_eq!(vars, vec!["OTHER", "MACHINE"]);
            let last = doc.assignments().last().unwrap();
            assert_eq!(last.operator, Operator::Default);
            assert_eq!(last.value, vec!["three"]);
        }

        #[test]
        fn test_simplify_merges_contiguous_appends() {
            let dir = TempDir::new().unwrap();
            let mut doc = doc_in(&dir, "local.conf");
            doc.add("X", Operator::Append, "a");
            doc.add("X", Operator::Append, "b");

            let simplified = doc.simplify();
            assert_eq!(simplified.len(), 1);
            assert_eq!(simplified[0].value, vec!["a", "b"]);
        }

        #[test]
        fn test_simplify_keeps_non_adjacent_duplicates() {
            let dir = TempDir::new().unwrap();
            let mut doc = doc_in(&dir, "local.conf");
            doc.add("X", Operator::Append, "a");
            doc.add("Y", Operator::Assign, "v");
            doc.add("X", Operator::Append, "b");

            let simplified = doc.simplify();
            assert_eq!(simplified.len(), 3);
        }

        #[test]
        fn test_simplify_requires_append_on_both_sides() {
            let dir = TempDir::new().unwrap();
            let mut doc = doc_in(&dir, "local.conf");
            doc.add("X", Operator::Assign, "a");
            doc.add("X", Operator::Append, "b");
            doc.add("X", Operator::Default, "c");

            assert_eq!(doc.simplify().len(), 3);
        }

        #[test]
        fn test_write_then_read_round_trips() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("local.conf");

            let mut doc = ConfDocument::new_quiet(&path);
            doc.add("FOO", Operator::Assign, "a foo");
            doc.add("MULTI", Operator::Assign, "foo bar baz");
            doc.add("EMPTY", Operator::Assign, "");
            doc.add("APPEND_append", Operator::Assign, " foo bar");
            doc.add("PREPEND_prepend", Operator::Assign, " xxx yyy  ");
            doc.write().unwrap();

            let mut check = ConfDocument::new_quiet(&path);
            check.read().unwrap();
            assert_eq!(check.assignments(), doc.assignments());
        }

        #[test]
        fn test_write_emits_quoted_lines() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("local.conf");

            let mut doc = ConfDocument::new_quiet(&path);
            doc.add("BB_NUMBER_THREADS", Operator::Assign, "8");
            doc.add("MACHINE", Operator::Default, "wandboard-solo");
            doc.write().unwrap();

            assert_eq!(
                fs::read_to_string(&path).unwrap(),
                "BB_NUMBER_THREADS = '8'\nMACHINE ?= 'wandboard-solo'\n"
            );
        }
    }
}
