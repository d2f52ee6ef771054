//! Intent parser — from raw model text to typed calls.
//!
//! A routing completion is expected to be a JSON object with a single
//! `functions` field holding an ordered list of call signatures:
//!
//! ```json
//! { "functions": ["get_showtimes('The Batman', '95112')"] }
//! ```
//!
//! Signatures are parsed by a small explicit grammar rather than naive
//! splitting: identifiers, parenthesized argument lists, single/double
//! quoting, and nested parentheses (needed for the placeholder marker,
//! which is itself written `callback()`).

use serde::Deserialize;
use thiserror::Error;

/// The marker the model emits in an argument position to mean
/// "value not yet known; ask the user before calling this".
pub const PLACEHOLDER_MARKER: &str = "callback()";

/// The name of the re-entrant pseudo-function handled by the executor.
pub const CALLBACK_FUNCTION: &str = "callback";

/// A single argument in a parsed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// A literal string value (quotes already stripped)
    Literal(String),
    /// The value is unknown and must be solicited from the user
    Placeholder,
}

impl Argument {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Argument::Placeholder)
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Argument::Literal(s) => Some(s),
            Argument::Placeholder => None,
        }
    }
}

impl std::fmt::Display for Argument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Argument::Literal(s) => write!(f, "'{s}'"),
            // Redacted display for clarification messages
            Argument::Placeholder => write!(f, "[missing]"),
        }
    }
}

/// One function call requested by the model.
///
/// Produced fresh per completion and consumed immediately by the
/// executor; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCall {
    pub name: String,
    pub args: Vec<Argument>,
}

impl ParsedCall {
    /// True when no argument is a placeholder.
    pub fn is_complete(&self) -> bool {
        self.args.iter().all(|a| !a.is_placeholder())
    }

    /// Render the call for display, placeholders redacted.
    pub fn display(&self) -> String {
        let args: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
        format!("{}({})", self.name, args.join(", "))
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Completion is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("Completion lacks the 'functions' field")]
    MissingFunctionsField,

    #[error("Invalid function signature '{signature}': {reason}")]
    InvalidSignature { signature: String, reason: String },
}

#[derive(Deserialize)]
struct FunctionPlan {
    functions: Vec<String>,
}

/// Parse a raw routing completion into an ordered call list.
///
/// An empty `functions` array is a valid, meaningful result: the model
/// decided no function call is needed.
pub fn parse_completion(raw: &str) -> Result<Vec<ParsedCall>, ParseError> {
    let value: serde_json::Value =
        serde_json::from_str(raw.trim()).map_err(|e| ParseError::MalformedJson(e.to_string()))?;

    if value.get("functions").is_none() {
        return Err(ParseError::MissingFunctionsField);
    }

    let plan: FunctionPlan =
        serde_json::from_value(value).map_err(|e| ParseError::MalformedJson(e.to_string()))?;

    plan.functions
        .iter()
        .map(|sig| parse_signature(sig))
        .collect()
}

/// Parse one call signature, e.g. `get_showtimes('The Batman', '95112')`.
pub fn parse_signature(signature: &str) -> Result<ParsedCall, ParseError> {
    let invalid = |reason: &str| ParseError::InvalidSignature {
        signature: signature.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = signature.trim();
    let open = trimmed.find('(').ok_or_else(|| invalid("missing '('"))?;

    let name = &trimmed[..open];
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        || name.starts_with(|c: char| c.is_ascii_digit())
    {
        return Err(invalid("function name is not a valid identifier"));
    }

    // Scan the argument list: track quoting and parenthesis depth so a
    // quoted comma ('San Jose, CA') or a nested `callback()` doesn't
    // split an argument.
    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    let mut closed_at: Option<usize> = None;

    for (i, c) in trimmed[open + 1..].char_indices() {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' => {
                quote = Some(c);
                current.push(c);
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                if depth == 0 {
                    closed_at = Some(open + 1 + i);
                    break;
                }
                current.push(c);
            }
            ',' if depth == 1 => {
                args.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }

    if quote.is_some() {
        return Err(invalid("unterminated quote"));
    }
    let closed_at = closed_at.ok_or_else(|| invalid("unterminated argument list"))?;
    if !trimmed[closed_at + 1..].trim().is_empty() {
        return Err(invalid("trailing characters after ')'"));
    }

    // A zero-parameter call yields an empty argument list, not [""].
    if args.is_empty() && current.trim().is_empty() {
        return Ok(ParsedCall {
            name: name.to_string(),
            args: Vec::new(),
        });
    }
    args.push(current);

    let args = args
        .into_iter()
        .map(|piece| {
            let piece = piece.trim();
            if piece.is_empty() {
                return Err(invalid("empty argument"));
            }
            // The marker counts whether the model quoted it or not.
            let value = unquote(piece);
            if value == PLACEHOLDER_MARKER {
                return Ok(Argument::Placeholder);
            }
            Ok(Argument::Literal(value.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedCall {
        name: name.to_string(),
        args,
    })
}

/// Strip one layer of matching surrounding quotes, if present.
fn unquote(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'\'' || first == b'"') {
            return &s[1..s.len() - 1];
        }
    }
    s
}
