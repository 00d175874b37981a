//! Interpreter failure translation
//!
//! Turns a Python exception (name + message) into the judge-style status and a
//! short Chinese message for beginners.

use std::sync::OnceLock;

use regex::Regex;

use super::TIMEOUT_MESSAGE;
use crate::core::{ExecutionResult, Status};

const COMPILE_ERROR_MESSAGE: &str = "代码格式错误";
const RUNTIME_ERROR_MESSAGE: &str = "运行错误";

/// Message the worker driver raises when its deadline passes
const RUN_TIME_LIMIT_SIGNAL: &str = "exceeded run time limit";

fn exception_label(name: &str) -> Option<&'static str> {
    let label = match name {
        "SyntaxError" | "IndentationError" | "TabError" => "格式错误",
        "NameError" => "变量命名错误",
        "TypeError" => "类型错误",
        "ValueError" => "值错误",
        "IndexError" => "索引错误",
        "KeyError" => "键错误",
        "ZeroDivisionError" => "除零错误",
        "AttributeError" => "属性错误",
        "ImportError" => "导入错误",
        "ModuleNotFoundError" => "模块未找到",
        "RuntimeError" => "运行错误",
        _ => return None,
    };
    Some(label)
}

struct Rewrite {
    pattern: Regex,
    replacement: &'static str,
}

fn message_rewrites() -> &'static [Rewrite] {
    static REWRITES: OnceLock<Vec<Rewrite>> = OnceLock::new();
    REWRITES.get_or_init(|| {
        [
            (r"(?i)No module named ([^\s]+)", "没有名为 $1 的模块"),
            (r"(?i)integer division or modulo by zero", "不能除以零"),
            (r"(?i)name '([^']+)' is not defined", "变量 $1 未定义"),
            (r"(?i)list index out of range", "列表下标越界"),
            (r"(?i)index out of range", "索引越界"),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(pattern)
                .ok()
                .map(|pattern| Rewrite { pattern, replacement })
        })
        .collect()
    })
}

/// Whether a failure happened while parsing rather than running
pub fn is_compile_error(name: &str, message: &str) -> bool {
    const PARSE_ERRORS: [&str; 3] = ["SyntaxError", "IndentationError", "TabError"];

    let message = message.to_lowercase();
    PARSE_ERRORS.contains(&name)
        || PARSE_ERRORS
            .iter()
            .any(|parse_error| message.contains(&parse_error.to_lowercase()))
}

/// Human readable text for a failure
pub fn translate_error(name: &str, message: &str, compile_error: bool) -> String {
    if compile_error {
        return COMPILE_ERROR_MESSAGE.to_string();
    }
    if message.to_lowercase().contains(RUN_TIME_LIMIT_SIGNAL) {
        return TIMEOUT_MESSAGE.to_string();
    }

    let mut translated = message.to_string();
    for rewrite in message_rewrites() {
        translated = rewrite
            .pattern
            .replace_all(&translated, rewrite.replacement)
            .into_owned();
    }
    let translated = translated.trim();

    match exception_label(name) {
        Some(label) if !translated.is_empty() => format!("{}：{}", label, translated),
        Some(label) => label.to_string(),
        None if !translated.is_empty() => translated.to_string(),
        None => RUNTIME_ERROR_MESSAGE.to_string(),
    }
}

/// Result of a run that finished normally
pub fn success(stdout: &str) -> ExecutionResult {
    ExecutionResult::new(Status::Accepted, stdout.trim_end())
}

/// Result of a run that raised `name: message`, after printing `stdout`
pub fn failure(stdout: &str, name: &str, message: &str) -> ExecutionResult {
    let compile_error = is_compile_error(name, message);
    let text = translate_error(name, message, compile_error);

    let separator = if stdout.is_empty() { "" } else { "\n" };
    let output = format!("{}{}{}", stdout, separator, text)
        .trim()
        .replace("\r\n", "\n");

    let status = if compile_error {
        Status::CompileError
    } else {
        Status::RuntimeError
    };
    ExecutionResult::new(status, output)
}
