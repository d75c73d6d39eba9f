use thiserror::Error;

use crate::problem::Problem;

pub const EMPTY_BODY_MESSAGE: &str =
    "function body was empty; a placeholder statement was inserted";

/// Placeholder inserted into an empty function body
const PLACEHOLDER: &str = "pass";
const PLACEHOLDER_INDENT: &str = "    ";

/// Reasons a submission is rejected before anything is executed
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no function definition `def {name}(...)` found in the submitted code")]
    NoFunctionFound { name: &'static str },
    #[error("function `{name}` must accept {expected} positional parameters, found {found}")]
    ArityMismatch {
        name: &'static str,
        expected: usize,
        found: usize,
    },
}

/// A self-contained program: the submission followed by the test driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessProgram {
    source: String,
    message: Option<String>,
}

impl HarnessProgram {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Informational note produced while synthesizing, forwarded onto the verdict
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn from_source(source: &str) -> Self {
        Self {
            source: source.to_string(),
            message: None,
        }
    }
}

/// Header of the function definition, possibly spanning several lines
struct Header<'a> {
    params: String,
    /// Index of the line holding the closing parenthesis
    end_line: usize,
    /// Text after the closing parenthesis on `end_line`
    tail: &'a str,
}

/// Validates `code` against `problem` and appends the generated test driver
pub fn synthesize(code: &str, problem: &Problem) -> Result<HarnessProgram, ValidationError> {
    let prefix = problem.definition_prefix();
    let lines: Vec<&str> = code.lines().collect();

    let def_idx = lines
        .iter()
        .position(|line| line.trim_start().starts_with(&prefix))
        .ok_or(ValidationError::NoFunctionFound {
            name: problem.function_name,
        })?;

    let header = parse_header(&lines, def_idx, &prefix);
    if let Some(header) = &header {
        check_arity(&header.params, problem)?;
    }

    let (body_start, inline_body) = match &header {
        Some(h) => (h.end_line + 1, has_inline_body(h.tail)),
        None => (def_idx + 1, false),
    };

    let def_indent = indentation(lines[def_idx]);
    let has_body = inline_body
        || lines[body_start.min(lines.len())..]
            .iter()
            .take_while(|line| line.trim().is_empty() || indentation(line) > def_indent)
            .any(|line| is_statement(line));

    let mut program = Vec::with_capacity(lines.len() + 32);
    let mut message = None;
    if has_body {
        program.extend(lines.iter().map(|l| l.to_string()));
    } else {
        log::debug!("Empty body for `{}`, inserting placeholder", problem.function_name);
        let placeholder_at = body_start.min(lines.len());
        program.extend(lines[..placeholder_at].iter().map(|l| l.to_string()));
        program.push(placeholder_line(lines[def_idx]));
        program.extend(lines[placeholder_at..].iter().map(|l| l.to_string()));
        message = Some(EMPTY_BODY_MESSAGE.to_string());
    }

    program.push(String::new());
    program.extend(driver_lines(problem));

    let mut source = program.join("\n");
    source.push('\n');

    Ok(HarnessProgram { source, message })
}

/// Collects the parameter list starting right after `prefix`, following it
/// across lines until the parentheses balance.
fn parse_header<'a>(lines: &[&'a str], def_idx: usize, prefix: &str) -> Option<Header<'a>> {
    let first = lines[def_idx];
    let open = first.find(prefix)? + prefix.len();

    let mut depth = 1usize;
    let mut params = String::new();
    for (idx, line) in lines.iter().enumerate().skip(def_idx) {
        let text = if idx == def_idx { &first[open..] } else { *line };
        for (pos, ch) in text.char_indices() {
            match ch {
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(Header {
                            params,
                            end_line: idx,
                            tail: &text[pos + ch.len_utf8()..],
                        });
                    }
                }
                _ => {}
            }
            params.push(ch);
        }
        params.push(' ');
    }

    None
}

fn check_arity(params: &str, problem: &Problem) -> Result<(), ValidationError> {
    let mut positional = 0usize;
    let mut required = 0usize;
    let mut variadic = false;

    for param in split_top_level(params) {
        match param {
            "/" => continue,
            "*" => break,
            p if p.starts_with("**") => break,
            p if p.starts_with('*') => {
                variadic = true;
                break;
            }
            p => {
                positional += 1;
                if !p.contains('=') {
                    required += 1;
                }
            }
        }
    }

    let arity = problem.arity;
    if required <= arity && (variadic || positional >= arity) {
        Ok(())
    } else {
        Err(ValidationError::ArityMismatch {
            name: problem.function_name,
            expected: arity,
            found: positional,
        })
    }
}

/// Splits on commas that are not nested inside brackets, dropping empty pieces
fn split_top_level(params: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;

    for (pos, ch) in params.char_indices() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                pieces.push(params[start..pos].trim());
                start = pos + 1;
            }
            _ => {}
        }
    }
    pieces.push(params[start..].trim());

    pieces.into_iter().filter(|p| !p.is_empty()).collect()
}

/// `def f(a, b): return a` keeps its body on the header line
fn has_inline_body(tail: &str) -> bool {
    tail.split_once(':')
        .map(|(_, rest)| is_statement(rest))
        .unwrap_or(false)
}

fn is_statement(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

/// Indents the placeholder one level below `def_line`, reusing its whitespace
/// so tab-indented code stays tab-indented
fn placeholder_line(def_line: &str) -> String {
    let prefix = &def_line[..indentation(def_line)];
    let unit = if prefix.contains('\t') {
        "\t"
    } else {
        PLACEHOLDER_INDENT
    };
    format!("{prefix}{unit}{PLACEHOLDER}")
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Renders `s` as a quoted literal; JSON string syntax is valid Python
fn quoted(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

fn driver_lines(problem: &Problem) -> Vec<String> {
    let mut lines: Vec<String> = [
        "",
        "import json as _judge_json",
        "import time as _judge_time",
        "",
        "",
        "def _judge_run():",
        "    cases = [",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    for (idx, case) in problem.cases.iter().enumerate() {
        lines.push(format!(
            "        ({}, {}, lambda: {}({}), {}),",
            idx + 1,
            quoted(case.input),
            problem.function_name,
            case.input,
            quoted(case.expected),
        ));
    }

    lines.extend(
        [
            "    ]",
            "    results = []",
            "    try:",
            "        for case, case_input, call, expected in cases:",
            "            start = _judge_time.perf_counter()",
            "            actual = call()",
            "            elapsed = (_judge_time.perf_counter() - start) * 1000.0",
            "            results.append({",
            "                \"case\": case,",
            "                \"input\": case_input,",
            "                \"expected\": expected,",
            "                \"actual\": str(actual),",
            "                \"passed\": str(actual) == expected,",
            "                \"execution_time\": elapsed,",
            "            })",
            "    except Exception as e:",
            "        results = [{\"error\": \"%s: %s\" % (type(e).__name__, e)}]",
            "    print(_judge_json.dumps(results))",
            "",
            "",
            "_judge_run()",
        ]
        .iter()
        .map(|s| s.to_string()),
    );

    lines
}
