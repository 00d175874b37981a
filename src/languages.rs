//! Supported languages and their execution backend

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Judge language id that needs `-lm` to link against libm (GCC C)
const GCC_C_ID: u32 = 50;

/// A language the runner accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    Cpp,
    Java,
    Python,
}

/// Where code in a given language is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Local sandbox worker, no network round-trip
    Sandbox,
    /// Remote judge, with its numeric language id
    Remote(u32),
}

impl Language {
    pub const ALL: [Language; 4] = [Language::C, Language::Cpp, Language::Java, Language::Python];

    pub fn name(self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::Python => "python",
        }
    }

    /// Remote judge id for this language
    pub fn judge_id(self) -> u32 {
        match self {
            Language::C => GCC_C_ID,
            Language::Cpp => 54,
            Language::Java => 62,
            Language::Python => 71,
        }
    }

    /// Guess the language from a source file name
    pub fn from_path(path: &str) -> Option<Self> {
        let (_, ext) = path.rsplit_once('.')?;
        match ext.to_lowercase().as_str() {
            "c" => Some(Language::C),
            "cpp" | "cc" | "cxx" => Some(Language::Cpp),
            "java" => Some(Language::Java),
            "py" => Some(Language::Python),
            _ => None,
        }
    }

    pub fn backend(self) -> Backend {
        match self {
            Language::Python => Backend::Sandbox,
            Language::C | Language::Cpp | Language::Java => Backend::Remote(self.judge_id()),
        }
    }

    /// Starter source shown for a fresh editor
    pub fn template(self) -> &'static str {
        match self {
            Language::C => "#include<stdio.h>\r\n\r\nint main()\r\n{\r\n    \r\n    return 0;\r\n}",
            Language::Cpp => {
                "#include<iostream>\r\n\r\nusing namespace std;\r\n\r\nint main()\r\n{\r\n    \r\n    return 0;\r\n}"
            }
            Language::Java => {
                "public class Main {\r\n    public static void main(String[] args) {\r\n        \r\n    }\r\n}"
            }
            Language::Python => "",
        }
    }
}

/// Extra compiler flags the judge needs for a language id
pub fn compiler_options(judge_id: u32) -> &'static str {
    if judge_id == GCC_C_ID {
        "-lm"
    } else {
        ""
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "c" => Ok(Language::C),
            "cpp" | "c++" | "cc" => Ok(Language::Cpp),
            "java" => Ok(Language::Java),
            "python" | "python3" | "py" => Ok(Language::Python),
            _ => Err(Error::UnsupportedLanguage(s.to_string())),
        }
    }
}

/// Source code together with its language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    pub source: String,
    pub language: Language,
}

impl Code {
    pub fn new(source: impl Into<String>, language: Language) -> Self {
        Self {
            source: source.into(),
            language,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_selection() {
        assert_eq!(Language::Python.backend(), Backend::Sandbox);
        assert_eq!(Language::C.backend(), Backend::Remote(50));
        assert_eq!(Language::Cpp.backend(), Backend::Remote(54));
        assert_eq!(Language::Java.backend(), Backend::Remote(62));
        assert_eq!(Language::Python.judge_id(), 71);
    }

    #[test]
    fn test_compiler_options_only_for_gcc_c() {
        assert_eq!(compiler_options(50), "-lm");
        for language in Language::ALL {
            if language != Language::C {
                assert_eq!(compiler_options(language.judge_id()), "");
            }
        }
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("C++".parse::<Language>().unwrap(), Language::Cpp);
        assert_eq!("py".parse::<Language>().unwrap(), Language::Python);
        assert_eq!(" Java ".parse::<Language>().unwrap(), Language::Java);
        assert!("rust".parse::<Language>().is_err());
    }

    #[test]
    fn test_from_path() {
        assert_eq!(Language::from_path("solutions/a.PY"), Some(Language::Python));
        assert_eq!(Language::from_path("main.cc"), Some(Language::Cpp));
        assert_eq!(Language::from_path("Main.java"), Some(Language::Java));
        assert_eq!(Language::from_path("Makefile"), None);
        assert_eq!(Language::from_path("main.rs"), None);
    }

    #[test]
    fn test_serde_names() {
        let code = Code::new("x", Language::Cpp);
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, r#"{"source":"x","language":"cpp"}"#);
    }
}
