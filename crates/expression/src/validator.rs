//! Safety validator (spec §4.3: "rejects, before evaluation..."). Runs over
//! the raw expression source — before tokenizing — so a forbidden
//! identifier or a runaway nesting depth is rejected without ever handing
//! attacker-controlled text to the parser.

use crate::error::{ExpressionError, ExpressionResult};

const MAX_LENGTH: usize = 10_000;
const MAX_NESTING: usize = 10;

/// Substrings that would reach through the sandbox into the host:
/// filesystem, network, process, or reflective primitives. This is a
/// denylist, not a type system — the grammar itself has no way to name
/// these, but user-authored expression text is checked defensively before
/// it is even tokenized.
const FORBIDDEN_IDENTIFIERS: &[&str] = &[
    "std::fs",
    "std::net",
    "std::process",
    "std::env::set",
    "Command::new",
    "child_process",
    "require(",
    "import ",
    "eval(",
    "exec(",
    "__proto__",
    "constructor.constructor",
    "Function(",
    "System.",
    "Runtime.",
    "ProcessBuilder",
    "unsafe",
];

/// Validate `source` before it is tokenized. Returns `Ok(())` or the first
/// violation found.
pub fn validate(source: &str) -> ExpressionResult<()> {
    if source.len() > MAX_LENGTH {
        return Err(ExpressionError::TooLong {
            max: MAX_LENGTH,
            actual: source.len(),
        });
    }

    if source.contains("../") || source.contains("..\\") {
        return Err(ExpressionError::PathTraversal);
    }

    for needle in FORBIDDEN_IDENTIFIERS {
        if source.contains(needle) {
            return Err(ExpressionError::ForbiddenIdentifier((*needle).to_string()));
        }
    }

    check_delimiters(source)?;

    Ok(())
}

fn check_delimiters(source: &str) -> ExpressionResult<()> {
    let mut depth: i64 = 0;
    let mut max_depth: usize = 0;
    let mut stack: Vec<char> = Vec::new();

    for c in source.chars() {
        match c {
            '{' | '(' | '[' => {
                depth += 1;
                if depth < 0 {
                    return Err(ExpressionError::UnbalancedDelimiters);
                }
                max_depth = max_depth.max(depth as usize);
                stack.push(c);
            }
            '}' | ')' | ']' => {
                let expected = match c {
                    '}' => '{',
                    ')' => '(',
                    ']' => '[',
                    _ => unreachable!(),
                };
                depth -= 1;
                match stack.pop() {
                    Some(open) if open == expected => {}
                    _ => return Err(ExpressionError::UnbalancedDelimiters),
                }
            }
            _ => {}
        }
    }

    if depth != 0 || !stack.is_empty() {
        return Err(ExpressionError::UnbalancedDelimiters);
    }

    if max_depth > MAX_NESTING {
        return Err(ExpressionError::NestingTooDeep {
            max: MAX_NESTING,
            actual: max_depth,
        });
    }

    Ok(())
}
