//! Read-only guard for model-authored SQL.
//!
//! Each `;`-separated statement is normalized (leading whitespace, comments
//! and opening parentheses dropped, lowercased) and rejected when it begins
//! with a mutating keyword. A `WITH` statement is rejected when any bare word
//! of its body is a mutating keyword, since the CTE prefix can front an
//! `INSERT`, `UPDATE` or `DELETE`.

/// Error text returned to the model for any rejected statement.
pub const WRITE_BLOCKED_MESSAGE: &str = "Write operations are not allowed";

/// Leading keywords that mark a statement as mutating.
pub const DENIED_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "drop", "create", "alter", "truncate", "replace", "merge",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Write operations are not allowed")]
pub struct SafetyViolation {
    /// The normalized statement that tripped the guard.
    pub statement: String,
}

/// Reject `sql` if any statement in it would write.
pub fn check_read_only(sql: &str) -> Result<(), SafetyViolation> {
    for statement in split_statements(sql) {
        let normalized = skip_leading_noise(statement).trim_end().to_lowercase();
        let denied = if leading_word(&normalized) == "with" {
            cte_writes(&normalized)
        } else {
            DENIED_KEYWORDS.iter().any(|kw| normalized.starts_with(kw))
        };
        if denied {
            return Err(SafetyViolation {
                statement: normalized,
            });
        }
    }
    Ok(())
}

/// Split on `;` outside single/double-quoted literals.
/// Empty fragments (trailing semicolons) are skipped.
fn split_statements(sql: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in sql.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                ';' => {
                    statements.push(&sql[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    statements.push(&sql[start..]);

    statements
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect()
}

/// Drop whitespace, `--` and `/* */` comments and `(` before the first keyword.
fn skip_leading_noise(mut sql: &str) -> &str {
    loop {
        let trimmed = sql.trim_start();
        if let Some(rest) = trimmed.strip_prefix("--") {
            sql = rest.find('\n').map_or("", |i| &rest[i + 1..]);
        } else if let Some(rest) = trimmed.strip_prefix("/*") {
            sql = rest.find("*/").map_or("", |i| &rest[i + 2..]);
        } else if let Some(rest) = trimmed.strip_prefix('(') {
            sql = rest;
        } else {
            return trimmed;
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn leading_word(sql: &str) -> &str {
    let end = sql.find(|c: char| !is_word_char(c)).unwrap_or(sql.len());
    &sql[..end]
}

/// Whether a `WITH` statement contains a mutating statement. `replace` only
/// counts as `REPLACE INTO`; the scalar `replace(...)` function is a read.
fn cte_writes(sql: &str) -> bool {
    let words = bare_words(sql);
    words.iter().enumerate().any(|(idx, word)| match *word {
        "replace" => words.get(idx + 1) == Some(&"into"),
        other => DENIED_KEYWORDS.iter().any(|kw| *kw == other),
    })
}

/// Identifier-like words outside quoted literals and comments.
fn bare_words(sql: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut word_start: Option<usize> = None;
    let mut chars = sql.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if is_word_char(c) {
            word_start.get_or_insert(i);
            continue;
        }
        if let Some(start) = word_start.take() {
            words.push(&sql[start..i]);
        }
        match c {
            '\'' | '"' | '`' => {
                for (_, next) in chars.by_ref() {
                    if next == c {
                        break;
                    }
                }
            }
            '-' if matches!(chars.peek(), Some((_, '-'))) => {
                for (_, next) in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                let mut prev = ' ';
                for (_, next) in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => {}
        }
    }
    if let Some(start) = word_start {
        words.push(&sql[start..]);
    }
    words
}
