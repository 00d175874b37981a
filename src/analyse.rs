//! Local error hints
//!
//! Looks at a failed run and, for Python, points at the offending line and
//! explains the error in plain words. Sandbox results carry the untranslated
//! exception and are matched on that; anything else is matched on the last
//! line of its output. Other languages get no hint.

use std::sync::OnceLock;

use regex::Regex;

use crate::core::ExecutionResult;
use crate::languages::Language;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorHint {
    /// Line reported by the traceback, if any
    pub line: Option<u32>,
    /// Empty when no rule matched
    pub message: String,
}

#[derive(Clone, Copy)]
enum Hint {
    Fixed(&'static str),
    /// Built from the first capture group
    Named(fn(&str) -> String),
}

struct Rule {
    pattern: Regex,
    hint: Hint,
}

const PYTHON_RULES: &[(&str, Hint)] = &[
    (
        r"EOFError: EOF when reading a line",
        Hint::Fixed("需要在输入框填写输入信息"),
    ),
    (
        r"SyntaxError: invalid character in identifier",
        Hint::Fixed("可能是单词拼写错误，可能是括号、引号写成中文的了"),
    ),
    (r"SyntaxError: invalid syntax", Hint::Fixed("语法错误，不合法的语法")),
    (
        r"SyntaxError: EOL while scanning string literal",
        Hint::Fixed("可能是这一行最后一个符号是中文的，或者引号、括号不匹配"),
    ),
    (
        r"NameError: name '(.*?)' is not defined",
        Hint::Named(unknown_name),
    ),
    (
        r"IndentationError: expected an indented block",
        Hint::Fixed("缩进错误：这一行需要缩进"),
    ),
    (
        r#"TypeError: can only concatenate str \(not "(.*?)"\) to str"#,
        Hint::Fixed("文字和数字不能相加"),
    ),
];

fn unknown_name(name: &str) -> String {
    format!("命名错误，{} 不知道是什么东西", name)
}

fn python_rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        PYTHON_RULES
            .iter()
            .filter_map(|(pattern, hint)| {
                Some(Rule {
                    pattern: Regex::new(pattern).ok()?,
                    hint: *hint,
                })
            })
            .collect()
    })
}

fn traceback_line() -> Option<&'static Regex> {
    static LINE: OnceLock<Option<Regex>> = OnceLock::new();
    LINE.get_or_init(|| Regex::new(r#"File "script\.py", line (\d+)"#).ok())
        .as_ref()
}

/// Hint for one error line; empty when nothing matches
pub fn find_error(line: &str, language: Language) -> String {
    let rules: &[Rule] = match language {
        Language::Python => python_rules(),
        Language::C | Language::Cpp | Language::Java => &[],
    };

    for rule in rules {
        if let Some(caps) = rule.pattern.captures(line) {
            return match &rule.hint {
                Hint::Fixed(text) => text.to_string(),
                Hint::Named(build) => build(caps.get(1).map_or("", |m| m.as_str())),
            };
        }
    }
    String::new()
}

/// Analyse the full output of a failed run
pub fn analyze_error(output: &str, language: Language) -> ErrorHint {
    let line = traceback_line()
        .and_then(|re| re.captures(output))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok());

    let last_line = output.rsplit('\n').next().unwrap_or_default();

    ErrorHint {
        line,
        message: find_error(last_line, language),
    }
}

/// Analyse a failed run, preferring the raw error the sandbox kept
pub fn analyze_result(result: &ExecutionResult, language: Language) -> ErrorHint {
    match &result.diagnostic {
        Some(diagnostic) => ErrorHint {
            line: diagnostic.line,
            message: find_error(&diagnostic.error_line(), language),
        },
        None => analyze_error(&result.output, language),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Diagnostic, Status};

    #[test]
    fn test_every_python_rule_compiles() {
        assert_eq!(python_rules().len(), PYTHON_RULES.len());
    }

    #[test]
    fn test_name_error_mentions_the_name() {
        let output = "Traceback (most recent call last):\n  File \"script.py\", line 3, in <module>\n    print(totl)\nNameError: name 'totl' is not defined";
        let hint = analyze_error(output, Language::Python);

        assert_eq!(hint.line, Some(3));
        assert_eq!(hint.message, "命名错误，totl 不知道是什么东西");
    }

    #[test]
    fn test_only_last_line_is_matched() {
        let output = "EOFError: EOF when reading a line\nsomething else";
        assert_eq!(analyze_error(output, Language::Python).message, "");

        let output = "prompt> \nEOFError: EOF when reading a line";
        assert_eq!(
            analyze_error(output, Language::Python).message,
            "需要在输入框填写输入信息"
        );
    }

    #[test]
    fn test_concatenation_hint() {
        let line = r#"TypeError: can only concatenate str (not "int") to str"#;
        assert_eq!(find_error(line, Language::Python), "文字和数字不能相加");
    }

    #[test]
    fn test_no_rules_for_compiled_languages() {
        let hint = analyze_error("SyntaxError: invalid syntax", Language::C);
        assert_eq!(hint, ErrorHint::default());
    }

    #[test]
    fn test_missing_traceback_line() {
        let hint = analyze_error("IndentationError: expected an indented block", Language::Python);
        assert_eq!(hint.line, None);
        assert_eq!(hint.message, "缩进错误：这一行需要缩进");
    }

    #[test]
    fn test_result_hint_uses_the_raw_error() {
        let result = ExecutionResult::new(Status::RuntimeError, "hi\n运行错误：EOF when reading a line")
            .with_diagnostic(Diagnostic::new("EOFError", "EOF when reading a line", Some(2)));

        let hint = analyze_result(&result, Language::Python);
        assert_eq!(hint.line, Some(2));
        assert_eq!(hint.message, "需要在输入框填写输入信息");
    }

    #[test]
    fn test_result_hint_without_diagnostic_reads_output() {
        let result = ExecutionResult::new(
            Status::RuntimeError,
            "  File \"script.py\", line 7\nNameError: name 'n' is not defined",
        );

        let hint = analyze_result(&result, Language::Python);
        assert_eq!(hint.line, Some(7));
        assert_eq!(hint.message, "命名错误，n 不知道是什么东西");
    }
}
