use std::path::PathBuf;

use xchammer_core::build_log::{parse, split, LexError, LogEntry};

const TRANSCRIPT: &str = r#"Build settings from command line:
    SDKROOT = iphonesimulator

CompileC /tmp/Build/main.o /src/main.m normal x86_64 objective-c com.apple.compilers.llvm.clang.1_0.compiler (in target 'iOSApp' from project 'iOSApp')
    cd /src/iOSApp
    export LANG=en_US.US-ASCII
    /Applications/Xcode.app/Contents/Developer/Toolchains/XcodeDefault.xctoolchain/usr/bin/clang -x objective-c -Wall -Wno-unused-parameter -c /src/iOSApp/main.m -o /tmp/Build/main.o

Ld /tmp/Build/iOSApp normal x86_64 (in target 'iOSApp' from project 'iOSApp')
    cd /src/iOSApp
    /Applications/Xcode.app/Contents/Developer/Toolchains/XcodeDefault.xctoolchain/usr/bin/clang -target x86_64-apple-ios -Wl,-dead_strip -o /tmp/Build/iOSApp

CompileSwift normal x86_64 /src/iOSApp/App.swift (in target 'iOSApp' from project 'iOSApp')
    cd "/src/My App"
    /usr/bin/swift-frontend -frontend -c "/src/My App/App.swift" -Werror -module-name iOSApp
** BUILD SUCCEEDED **
"#;

fn invocations(log: &str) -> Vec<xchammer_core::build_log::CompileInvocation> {
    parse(log)
        .into_iter()
        .filter_map(|entry| match entry {
            LogEntry::Entry(invocation) => Some(invocation),
            LogEntry::Other { .. } => None,
        })
        .collect()
}

#[test]
fn split_handles_plain_words_and_whitespace() {
    assert_eq!(
        split("  clang\t-c   main.m  ").unwrap(),
        vec!["clang", "-c", "main.m"]
    );
    assert!(split("").unwrap().is_empty());
    assert!(split("   ").unwrap().is_empty());
}

#[test]
fn split_honours_quotes_and_escapes() {
    assert_eq!(
        split(r#"clang 'a b' "c \"d\" \$e" f\ g "\n""#).unwrap(),
        vec!["clang", "a b", "c \"d\" $e", "f g", "\\n"]
    );
    assert_eq!(split("-I''").unwrap(), vec!["-I"]);
    assert_eq!(split(r#""" x"#).unwrap(), vec!["", "x"]);
    assert_eq!(split("'$HOME \\'").unwrap(), vec!["$HOME \\"]);
}

#[test]
fn split_rejects_malformed_lines() {
    assert_eq!(split("clang 'oops"), Err(LexError::UnterminatedQuote('\'')));
    assert_eq!(split("clang \"oops"), Err(LexError::UnterminatedQuote('"')));
    assert_eq!(split("clang \\"), Err(LexError::TrailingBackslash));
}

#[test]
fn parse_yields_one_entry_per_line() {
    let entries = parse(TRANSCRIPT);
    assert_eq!(entries.len(), TRANSCRIPT.lines().count());

    for (idx, entry) in entries.iter().enumerate() {
        let line = match entry {
            LogEntry::Entry(invocation) => invocation.line,
            LogEntry::Other { line, .. } => *line,
        };
        assert_eq!(line, idx + 1);
    }
}

#[test]
fn parse_keeps_only_compiler_invocations_in_compile_sections() {
    let found = invocations(TRANSCRIPT);
    assert_eq!(found.len(), 2, "the Ld link step is not a compilation");

    let objc = &found[0];
    assert!(objc.section.starts_with("CompileC /tmp/Build/main.o"));
    assert_eq!(objc.line, 7);
    assert_eq!(objc.directory, Some(PathBuf::from("/src/iOSApp")));
    assert!(objc.arguments[0].ends_with("/clang"));
    assert!(objc.arguments.contains(&"-Wno-unused-parameter".to_string()));

    let swift = &found[1];
    assert!(swift.section.starts_with("CompileSwift normal"));
    assert_eq!(swift.directory, Some(PathBuf::from("/src/My App")));
    assert_eq!(swift.arguments[0], "/usr/bin/swift-frontend");
    assert!(swift.arguments.contains(&"/src/My App/App.swift".to_string()));
}

#[test]
fn exports_and_unrelated_tools_are_other_lines() {
    let entries = parse(TRANSCRIPT);
    match &entries[5] {
        LogEntry::Other { text, .. } => assert_eq!(text.trim(), "export LANG=en_US.US-ASCII"),
        other => panic!("expected an export line, got {other:?}"),
    }

    let log = "CompileC a.o a.c normal\n    /usr/bin/ccache -Wall -c a.c\n";
    assert!(invocations(log).is_empty());
}

#[test]
fn indented_lines_outside_any_section_are_ignored() {
    let log = "    clang -Wall -c stray.c\n\nCompileC b.o b.c\n    clang -Wextra -c b.c\n";
    let found = invocations(log);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].arguments, vec!["clang", "-Wextra", "-c", "b.c"]);
    assert_eq!(found[0].directory, None);
}

#[test]
fn a_blank_line_closes_the_section() {
    let log = "CompileC a.o a.c\n    cd /src\n\n    clang -Wall -c a.c\n";
    assert!(invocations(log).is_empty());
}

#[test]
fn unlexable_invocations_are_other_lines() {
    let log = "CompileC a.o a.c\n    clang -Wall 'unterminated\n";
    let entries = parse(log);
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.invocation().is_none()));
}

#[test]
fn newer_swift_step_names_are_compile_sections() {
    let log = "\
SwiftCompile normal arm64 /src/App.swift (in target 'iOSApp' from project 'iOSApp')
    cd /src
    /usr/bin/swift-frontend -frontend -c /src/App.swift -Wwarnings-as-errors
SwiftEmitModule normal arm64 Emitting\\ module\\ for\\ iOSApp (in target 'iOSApp' from project 'iOSApp')
    /usr/bin/swift-frontend -frontend -emit-module -Wno-deprecated
";
    let found = invocations(log);
    assert_eq!(found.len(), 2);
    assert!(found[0].section.starts_with("SwiftCompile"));
    assert_eq!(found[0].directory, Some(PathBuf::from("/src")));
    assert!(found[1].section.starts_with("SwiftEmitModule"));
    assert!(found[1].arguments.contains(&"-Wno-deprecated".to_string()));
}
