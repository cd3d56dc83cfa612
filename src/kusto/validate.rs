//! Lightweight KQL lint: structural mistakes are errors, unknown pipe operators warnings.

use serde::Serialize;

const TABLE_OPERATORS: &[&str] = &[
    "where", "project", "project-away", "project-rename", "extend", "summarize", "sort",
    "order", "top", "take", "limit", "distinct", "join", "union", "render", "let",
    "datatable", "count", "as", "mv-expand", "parse", "lookup", "sample",
];

#[derive(Debug, Clone, Serialize)]
pub struct KustoValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub line_count: usize,
}

pub fn validate_kusto(kql: &str) -> KustoValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let lines: Vec<(usize, &str)> = kql
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with("//"))
        .collect();

    if let Some((n, first)) = lines.first() {
        if first.starts_with('|') {
            errors.push(format!("Line {}: query cannot start with a pipe", n));
        }
    } else {
        errors.push("Query is empty".to_string());
    }

    for (n, line) in &lines {
        if let Some(rest) = line.strip_prefix('|') {
            let operator = rest.split_whitespace().next().unwrap_or("");
            if operator.is_empty() {
                errors.push(format!("Line {}: pipe without an operator", n));
            } else if !TABLE_OPERATORS.contains(&operator) {
                warnings.push(format!("Line {}: unknown table operator '{}'", n, operator));
            }
        }
    }

    let code: String = lines
        .iter()
        .map(|(_, line)| *line)
        .collect::<Vec<_>>()
        .join("\n");
    if let Err(message) = check_brackets(&code) {
        errors.push(message);
    }

    KustoValidation {
        valid: errors.is_empty(),
        errors,
        warnings,
        line_count: lines.len(),
    }
}

/// Bracket balance outside string literals; `@"..."` literals take backslashes verbatim
fn check_brackets(code: &str) -> Result<(), String> {
    let mut stack: Vec<char> = Vec::new();
    let mut chars = code.chars().peekable();
    let mut previous = ' ';

    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => {
                let verbatim = previous == '@';
                let mut closed = false;
                while let Some(s) = chars.next() {
                    if s == '\\' && !verbatim {
                        chars.next();
                    } else if s == c {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err("Unterminated string literal".to_string());
                }
            }
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.pop() != Some(expected) {
                    return Err(format!("Unmatched '{}'", c));
                }
            }
            _ => {}
        }
        previous = c;
    }

    match stack.last() {
        Some(open) => Err(format!("Unclosed '{}'", open)),
        None => Ok(()),
    }
}
