//! The bracket/text splitter.
//!
//! Takes a raw template string and the current bracket pair and produces
//! the alternating literal-text / expression-source fragments. Quoted
//! strings, regex literals and nested JS brackets inside expressions are
//! skipped so their bracket characters are never mistaken for structure,
//! and escaped brackets (`\{`) become literal text.

use regex::Regex;

use crate::runner::ds::error::EvalError;

/// A configured bracket pair. The default is `{ }`; custom pairs come
/// from a "open close" string such as `"[ ]"`, `"${ }"` or `"{{ }}"`.
#[derive(Clone, Debug, PartialEq)]
pub struct Brackets {
    open: String,
    close: String,
}

lazy_static! {
    // characters that would make a pair ambiguous or unsafe
    static ref INVALID_PAIR: Regex = Regex::new(r#"[\x00-\x1F<>a-zA-Z0-9'",;\\]"#).unwrap();
}

impl Brackets {
    pub fn default_pair() -> Self {
        Brackets {
            open: "{".to_string(),
            close: "}".to_string(),
        }
    }

    /// Parse a pair setting; `None` or empty restores the default.
    pub fn set(pair: Option<&str>) -> Result<Self, EvalError> {
        let pair = match pair {
            None | Some("") => return Ok(Self::default_pair()),
            Some(pair) => pair,
        };
        let halves: Vec<&str> = pair.split(' ').collect();
        if halves.len() != 2 || halves[0].is_empty() || halves[1].is_empty()
            || INVALID_PAIR.is_match(pair)
        {
            return Err(EvalError::SyntaxError(format!(
                "Unsupported brackets \"{}\"",
                pair
            )));
        }
        Ok(Brackets {
            open: halves[0].to_string(),
            close: halves[1].to_string(),
        })
    }

    pub fn open(&self) -> &str {
        &self.open
    }

    pub fn close(&self) -> &str {
        &self.close
    }
}

#[derive(Debug, PartialEq)]
pub enum Fragment {
    Text(String),
    Expr(String),
}

/// Split a template into text and expression fragments.
pub fn split(text: &str, brackets: &Brackets) -> Vec<Fragment> {
    split_inner(text, brackets).0
}

/// Whether the string contains at least one complete expression.
pub fn has_expr(text: &str, brackets: &Brackets) -> bool {
    let (fragments, unterminated) = split_inner(text, brackets);
    let expr_count = fragments
        .iter()
        .filter(|fragment| matches!(fragment, Fragment::Expr(_)))
        .count();
    if unterminated {
        expr_count > 1
    } else {
        expr_count > 0
    }
}

fn split_inner(text: &str, brackets: &Brackets) -> (Vec<Fragment>, bool) {
    let chars: Vec<char> = text.chars().collect();
    let open: Vec<char> = brackets.open.chars().collect();
    let close: Vec<char> = brackets.close.chars().collect();

    let mut fragments = vec![];
    let mut buffer = String::new();
    let mut in_expr = false;
    let mut depth: Vec<char> = vec![];
    let mut i = 0;

    let matches_at = |i: usize, what: &[char]| -> bool {
        chars.len() >= i + what.len() && chars[i..i + what.len()] == *what
    };

    while i < chars.len() {
        let c = chars[i];

        // escaped brackets unescape in both modes
        if c == '\\' && matches_at(i + 1, &open) {
            buffer.push_str(&brackets.open);
            i += 1 + open.len();
            continue;
        }
        if c == '\\' && matches_at(i + 1, &close) {
            buffer.push_str(&brackets.close);
            i += 1 + close.len();
            continue;
        }

        if !in_expr {
            if matches_at(i, &open) {
                fragments.push(Fragment::Text(std::mem::take(&mut buffer)));
                in_expr = true;
                depth.clear();
                i += open.len();
            } else {
                buffer.push(c);
                i += 1;
            }
            continue;
        }

        // inside an expression

        if depth.is_empty() && matches_at(i, &close) {
            fragments.push(Fragment::Expr(std::mem::take(&mut buffer)));
            in_expr = false;
            i += close.len();
            continue;
        }

        match c {
            '\'' | '"' => {
                i = consume_quoted(&chars, i, &mut buffer);
            }
            '/' if regex_can_follow(&buffer) => {
                match consume_regex(&chars, i, &mut buffer) {
                    Some(next) => i = next,
                    None => {
                        buffer.push('/');
                        i += 1;
                    }
                }
            }
            '(' | '[' | '{' => {
                depth.push(c);
                buffer.push(c);
                i += 1;
            }
            ')' | ']' | '}' => {
                let opener = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if depth.last() == Some(&opener) {
                    depth.pop();
                }
                buffer.push(c);
                i += 1;
            }
            _ => {
                buffer.push(c);
                i += 1;
            }
        }
    }

    if !buffer.is_empty() || in_expr {
        fragments.push(if in_expr {
            Fragment::Expr(buffer)
        } else {
            Fragment::Text(buffer)
        });
    }
    (fragments, in_expr)
}

/// Copy a quoted string verbatim, honoring backslash escapes. Returns the
/// index after the closing quote.
fn consume_quoted(chars: &[char], start: usize, buffer: &mut String) -> usize {
    let quote = chars[start];
    buffer.push(quote);
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        buffer.push(c);
        i += 1;
        if c == '\\' && i < chars.len() {
            buffer.push(chars[i]);
            i += 1;
        } else if c == quote {
            break;
        }
    }
    i
}

/// Decide whether a `/` at this point starts a regex literal instead of a
/// division, from the last significant characters of the expression
/// source. Ported keyword and operator sets from the skip-regex scanner.
fn regex_can_follow(buffer: &str) -> bool {
    const BEFORE_RE_CHARS: &str = "[{(,;:?=|&!^~>%*/<";
    const BEFORE_RE_WORDS: [&str; 9] = [
        "case",
        "do",
        "else",
        "in",
        "instanceof",
        "new",
        "return",
        "typeof",
        "void",
    ];

    let trimmed = buffer.trim_end();
    let last = match trimmed.chars().last() {
        None => return true,
        Some(c) => c,
    };
    if last == '+' || last == '-' {
        // `a + /re/` yes, but after `a++` the slash divides
        let mut rest = trimmed[..trimmed.len() - 1].chars().rev();
        if rest.next() == Some(last) {
            let before = rest.find(|c| !c.is_whitespace());
            return !matches!(
                before,
                Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == '$'
            );
        }
        return true;
    }
    if BEFORE_RE_CHARS.contains(last) {
        return true;
    }
    let tail: Vec<char> = trimmed
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
        .collect();
    let word: String = tail.into_iter().rev().collect();
    BEFORE_RE_WORDS.contains(&word.as_str())
}

/// Copy a regex literal verbatim; `None` when the slash turns out not to
/// open one (no closing slash on the line).
fn consume_regex(chars: &[char], start: usize, buffer: &mut String) -> Option<usize> {
    let mut scratch = String::new();
    scratch.push('/');
    let mut i = start + 1;
    let mut in_class = false;
    let mut closed = false;
    while i < chars.len() {
        let c = chars[i];
        if c == '\n' || c == '\r' {
            break;
        }
        scratch.push(c);
        i += 1;
        match c {
            '\\' => {
                if i < chars.len() {
                    scratch.push(chars[i]);
                    i += 1;
                }
            }
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => {
                closed = true;
                break;
            }
            _ => {}
        }
    }
    if !closed {
        return None;
    }
    // flags
    while i < chars.len() && chars[i].is_ascii_lowercase() {
        scratch.push(chars[i]);
        i += 1;
    }
    buffer.push_str(&scratch);
    Some(i)
}

/// Keys of an `each`-style loop expression: `{ item, i in items }`.
pub struct LoopKeys {
    pub key: Option<String>,
    pub pos: Option<String>,
    pub val: String,
}

/// Extract loop keys; expressions that are not loop shorthands come back
/// whole in `val`.
pub fn loop_keys(expr: &str, brackets: &Brackets) -> LoopKeys {
    let pattern = format!(
        r"^\s*{}\^?\s*([$\w]+)(?:\s*,\s*(\S+))?\s+in\s+(\S[\s\S]*?)\s*{}",
        regex::escape(&brackets.open),
        regex::escape(&brackets.close)
    );
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(_) => {
            return LoopKeys {
                key: None,
                pos: None,
                val: expr.trim().to_string(),
            }
        }
    };
    match re.captures(expr) {
        Some(captures) => LoopKeys {
            key: captures.get(1).map(|m| m.as_str().to_string()),
            pos: captures.get(2).map(|m| m.as_str().to_string()),
            val: format!(
                "{}{}{}",
                brackets.open,
                captures.get(3).map(|m| m.as_str().trim()).unwrap_or(""),
                brackets.close
            ),
        },
        None => LoopKeys {
            key: None,
            pos: None,
            val: expr.trim().to_string(),
        },
    }
}
