//! Assignment parsing for the configuration dialect
//!
//! Configuration files hold one logical assignment per line, in the form
//! `VAR OP 'quoted value'`. This module provides the building blocks for
//! reading them back without a full grammar:
//!
//! - [`Operator`] — the closed set of assignment operators.
//! - [`tokenize`] — whitespace-aware splitting of a raw value into tokens,
//!   preserving the leading and trailing space runs attached to the first
//!   and last token. Those runs are semantically meaningful for
//!   override-suffixed variables (`FOO:append = " bar"`).
//! - [`parse_assignment`] — a three-state scan recognizing one logical
//!   line as `(variable, operator, value tokens)`, or classifying it as
//!   "not an assignment" (an expected, non-exceptional outcome for
//!   directives and malformed fragments).
//!
//! Values are treated as opaque tokens: nothing here evaluates embedded
//! expressions or resolves variable references.

use std::fmt;

use crate::error::{Error, Result};

/// Characters that may start or continue an operator.
const OPERATOR_CHARS: [char; 5] = ['=', '?', ':', '+', '.'];

/// The closed set of assignment operators.
///
/// Any other spelling in the operator position is a parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Assign,
    /// `+=`
    Append,
    /// `=+`
    Prepend,
    /// `?=`
    Default,
    /// `??=`
    WeakDefault,
    /// `:=`
    Immediate,
    /// `.=`
    DotAppend,
    /// `=.`
    DotPrepend,
}

impl Operator {
    /// The operator's spelling in a configuration file.
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Assign => "=",
            Operator::Append => "+=",
            Operator::Prepend => "=+",
            Operator::Default => "?=",
            Operator::WeakDefault => "??=",
            Operator::Immediate => ":=",
            Operator::DotAppend => ".=",
            Operator::DotPrepend => "=.",
        }
    }

    /// Parse an operator spelling, `None` for anything outside the set.
    pub fn from_str(op: &str) -> Option<Operator> {
        match op {
            "=" => Some(Operator::Assign),
            "+=" => Some(Operator::Append),
            "=+" => Some(Operator::Prepend),
            "?=" => Some(Operator::Default),
            "??=" => Some(Operator::WeakDefault),
            ":=" => Some(Operator::Immediate),
            ".=" => Some(Operator::DotAppend),
            "=." => Some(Operator::DotPrepend),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One variable binding: `(variable, operator, value tokens)`.
///
/// The variable is an opaque identifier; it may carry override suffixes
/// separated by `_` or `:`. Duplicate bindings of one variable are
/// legitimate and order-significant, so a document holds a sequence of
/// these rather than a map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub variable: String,
    pub operator: Operator,
    pub value: Vec<String>,
}

impl Assignment {
    pub fn new(variable: &str, operator: Operator, value: Vec<String>) -> Self {
        Self {
            variable: variable.to_string(),
            operator,
            value,
        }
    }
}

/// Split a raw value string into whitespace-delimited tokens.
///
/// The leading and trailing runs of space characters are preserved by
/// attaching them to the first and last token respectively (a single
/// token carries both). Interior whitespace runs separate tokens and are
/// not preserved. An empty or all-whitespace value yields no tokens.
pub fn tokenize(raw: &str) -> Vec<String> {
    let leading = raw.chars().take_while(|c| *c == ' ').count();
    let trailing = raw.chars().rev().take_while(|c| *c == ' ').count();

    let mut tokens: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
    if tokens.is_empty() {
        return tokens;
    }
    if leading > 0 {
        tokens[0] = format!("{}{}", " ".repeat(leading), tokens[0]);
    }
    if trailing > 0 {
        let last = tokens.len() - 1;
        tokens[last] = format!("{}{}", tokens[last], " ".repeat(trailing));
    }
    tokens
}

/// Unescape the raw value text of an assignment.
///
/// The right-hand side of an assignment is itself a quoted string literal
/// in the source file (`'a b c'` or `"a b c"`). This strips one matching
/// pair of outer quotes and resolves the recognized escape sequences
/// `\\`, `\'` and `\"` only. It deliberately does not evaluate anything
/// else; unquoted text is returned trimmed, as-is.
fn unescape_literal(raw: &str) -> String {
    let trimmed = raw.trim();
    let bytes = trimmed.as_bytes();
    if trimmed.len() >= 2 {
        let quote = bytes[0];
        if (quote == b'\'' || quote == b'"') && bytes[trimmed.len() - 1] == quote {
            let inner = &trimmed[1..trimmed.len() - 1];
            let mut out = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(ch) = chars.next() {
                if ch == '\\' {
                    match chars.next() {
                        Some(next @ ('\\' | '\'' | '"')) => out.push(next),
                        Some(next) => {
                            out.push('\\');
                            out.push(next);
                        }
                        None => out.push('\\'),
                    }
                } else {
                    out.push(ch);
                }
            }
            return out;
        }
    }
    trimmed.to_string()
}

/// Scanner states for [`parse_assignment`].
enum Scan {
    Variable,
    Operator,
}

/// Parse one logical (continuation-joined) line as an assignment.
///
/// Returns `Ok(None)` for lines that are not assignments: `require` and
/// `include` directives, and fragments where variable, operator or value
/// is missing. Those are an expected input class and never raise.
///
/// Returns an error for lines that *are* shaped like assignments but use
/// an operator outside the closed set, or a non-operator character where
/// an operator was expected.
///
/// Variable names may embed operator characters as override separators
/// (`FOO:append`); the scan backs out of the operator state when the
/// would-be operator runs straight into further variable characters.
pub fn parse_assignment(line: &str) -> Result<Option<Assignment>> {
    let line = line.trim();
    if line.starts_with("require") || line.starts_with("include") {
        // Directives, not variable bindings; never capture them as data.
        return Ok(None);
    }

    let mut variable = String::new();
    let mut operator = String::new();
    let mut raw_value = "";
    let mut state = Scan::Variable;
    let mut seen_space = false;

    for (pos, ch) in line.char_indices() {
        match state {
            Scan::Variable => {
                if OPERATOR_CHARS.contains(&ch) {
                    operator.push(ch);
                    state = Scan::Operator;
                } else if ch == ' ' {
                    seen_space = true;
                    state = Scan::Operator;
                } else {
                    variable.push(ch);
                }
            }
            Scan::Operator => {
                if OPERATOR_CHARS.contains(&ch) {
                    operator.push(ch);
                } else if ch == ' ' {
                    if Operator::from_str(&operator).is_none() {
                        return Err(Error::InvalidOperator {
                            operator,
                            line: line.to_string(),
                        });
                    }
                    raw_value = &line[pos + 1..];
                    break;
                } else if !seen_space {
                    // An override separator inside the variable name, not
                    // an operator: fold the accumulated characters back.
                    variable.push_str(&operator);
                    variable.push(ch);
                    operator.clear();
                    state = Scan::Variable;
                } else {
                    return Err(Error::Syntax {
                        line: line.to_string(),
                    });
                }
            }
        }
    }

    if variable.is_empty() || operator.is_empty() || raw_value.is_empty() {
        return Ok(None);
    }

    // Validated above; from_str cannot fail here.
    let operator = match Operator::from_str(&operator) {
        Some(op) => op,
        None => return Ok(None),
    };
    Ok(Some(Assignment {
        variable,
        operator,
        value: tokenize(&unescape_literal(raw_value)),
    }))
}
