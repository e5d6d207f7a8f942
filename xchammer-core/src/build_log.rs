//! Parser for Xcode build transcripts.
//!
//! `xcodebuild` prints one section per build step. A section starts with an unindented
//! header naming the step, followed by indented lines: `cd` into the working directory,
//! `export`s, and finally the tool invocation:
//!
//! ```text
//! CompileC /tmp/Build/main.o /src/main.m normal x86_64 objective-c com.apple.compilers.llvm.clang.1_0.compiler (in target 'iOSApp' from project 'iOSApp')
//!     cd /src
//!     export LANG=en_US.US-ASCII
//!     /Applications/Xcode.app/.../clang -x objective-c -Wall -Wno-unused -c /src/main.m -o /tmp/Build/main.o
//! ```
//!
//! Compiler invocations inside compile sections become [`LogEntry::Entry`]; every other
//! line is [`LogEntry::Other`].

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Build steps whose invocations are compilations.
const COMPILE_STEPS: &[&str] = &[
    "CompileC",
    "CompileSwift",
    "CompileSwiftSources",
    "SwiftCompile",
    "SwiftEmitModule",
    "ProcessPCH",
    "ProcessPCH++",
    "PrecompileSwiftBridgingHeader",
];

/// Executable names recognized as compiler drivers.
const COMPILERS: &[&str] = &[
    "clang",
    "clang++",
    "swiftc",
    "swift-frontend",
    "cc",
    "c++",
    "gcc",
    "g++",
];

/// One compiler invocation recovered from a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileInvocation {
    /// Header line of the section the invocation belongs to.
    pub section: String,
    /// 1-based line number of the invocation.
    pub line: usize,
    /// Directory from the section's `cd` line, if any.
    pub directory: Option<PathBuf>,
    /// The lexed argument list, compiler first.
    pub arguments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    Entry(CompileInvocation),
    Other { line: usize, text: String },
}

impl LogEntry {
    pub fn invocation(&self) -> Option<&CompileInvocation> {
        match self {
            LogEntry::Entry(invocation) => Some(invocation),
            LogEntry::Other { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),
    #[error("trailing backslash")]
    TrailingBackslash,
}

/// Splits a command line into arguments the way a POSIX shell would: whitespace separates
/// words, single quotes are literal, double quotes allow `\"`, `\\`, `\$` and `` \` ``
/// escapes, and a backslash outside quotes escapes the next character.
pub fn split(line: &str) -> Result<Vec<String>, LexError> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => word.push(ch),
                        None => return Err(LexError::UnterminatedQuote('\'')),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(esc @ ('"' | '\\' | '$' | '`')) => word.push(esc),
                            Some('\n') => {}
                            Some(other) => {
                                word.push('\\');
                                word.push(other);
                            }
                            None => return Err(LexError::UnterminatedQuote('"')),
                        },
                        Some(ch) => word.push(ch),
                        None => return Err(LexError::UnterminatedQuote('"')),
                    }
                }
            }
            '\\' => match chars.next() {
                Some('\n') => {}
                Some(ch) => {
                    in_word = true;
                    word.push(ch);
                }
                None => return Err(LexError::TrailingBackslash),
            },
            other => {
                in_word = true;
                word.push(other);
            }
        }
    }
    if in_word {
        words.push(word);
    }
    Ok(words)
}

fn section_header() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        Regex::new(r"^(?P<step>[A-Za-z][A-Za-z0-9+]*)(\s|$)").expect("valid section regex")
    })
}

fn is_compiler(program: &str) -> bool {
    let name = Path::new(program)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(program);
    COMPILERS.contains(&name)
}

struct Section {
    header: String,
    compiles: bool,
    directory: Option<PathBuf>,
}

/// Parses a transcript into entries, one per line, in transcript order.
pub fn parse(log: &str) -> Vec<LogEntry> {
    let mut entries = Vec::new();
    let mut section: Option<Section> = None;

    for (idx, raw) in log.lines().enumerate() {
        let line = idx + 1;
        let other = || LogEntry::Other {
            line,
            text: raw.to_string(),
        };

        let indented = raw.starts_with(' ') || raw.starts_with('\t');
        if !indented {
            section = if raw.trim().is_empty() {
                None
            } else {
                section_header().captures(raw).map(|caps| Section {
                    header: raw.to_string(),
                    compiles: COMPILE_STEPS.contains(&&caps["step"]),
                    directory: None,
                })
            };
            entries.push(other());
            continue;
        }

        let Some(current) = section.as_mut().filter(|s| s.compiles) else {
            entries.push(other());
            continue;
        };

        let trimmed = raw.trim();
        if let Some(dir) = trimmed.strip_prefix("cd ") {
            if let Ok(mut words) = split(dir) {
                if words.len() == 1 {
                    current.directory = words.pop().map(PathBuf::from);
                }
            }
            entries.push(other());
            continue;
        }

        match split(trimmed) {
            Ok(arguments) if arguments.first().is_some_and(|p| is_compiler(p)) => {
                entries.push(LogEntry::Entry(CompileInvocation {
                    section: current.header.clone(),
                    line,
                    directory: current.directory.clone(),
                    arguments,
                }));
            }
            _ => entries.push(other()),
        }
    }
    entries
}
