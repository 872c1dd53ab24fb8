//! Programming language detection for snippet naming
//!
//! Names follow the usual linguist spelling ("C#", "Objective-C", ...) and are
//! turned into the upper-case form used in snippet names by [`clean_language`].

use std::path::Path;

/// Detect the language of a file from its name, falling back to its content.
///
/// Returns `None` when nothing matches.
pub fn detect_language(path: &str, content: &str) -> Option<String> {
    let file_name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path);

    if file_name.eq_ignore_ascii_case("dockerfile") {
        return Some("Dockerfile".to_string());
    }

    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    let lang = match extension.as_deref() {
        Some("m") => objective_c_or_matlab(content),
        Some(ext) => match language_for_extension(ext) {
            Some(lang) => lang,
            None => return language_from_shebang(content),
        },
        None => return language_from_shebang(content),
    };

    Some(lang.to_string())
}

fn language_for_extension(extension: &str) -> Option<&'static str> {
    let lang = match extension {
        "c" => "C",
        "h" => "C",
        "cpp" | "cc" | "cxx" | "hpp" => "C++",
        "cs" => "C#",
        "go" => "Go",
        // Apps Script
        "gs" => "JavaScript",
        "html" | "htm" => "HTML",
        "jade" | "pug" => "Pug",
        "java" => "Java",
        "js" | "mjs" | "cjs" => "JavaScript",
        "ts" => "TypeScript",
        "json" => "JSON",
        "kt" | "kts" => "Kotlin",
        "php" => "PHP",
        "py" => "Python",
        "rb" | "ru" => "Ruby",
        "rs" => "Rust",
        "swift" => "Swift",
        "sh" | "bash" => "Shell",
        "xml" => "XML",
        "yaml" | "yml" => "YAML",
        _ => return None,
    };
    Some(lang)
}

/// `.m` is shared by Objective-C and MATLAB
fn objective_c_or_matlab(content: &str) -> &'static str {
    const OBJC_MARKERS: [&str; 5] = ["#import", "@interface", "@implementation", "@end", "#include"];
    if OBJC_MARKERS.iter().any(|m| content.contains(m)) {
        return "Objective-C";
    }

    let looks_like_matlab = content.lines().map(str::trim_start).any(|line| {
        line.starts_with("function ") || (line.starts_with('%') && !line.starts_with("%{"))
    });
    if looks_like_matlab {
        "MATLAB"
    } else {
        "Objective-C"
    }
}

fn language_from_shebang(content: &str) -> Option<String> {
    let first = content.lines().next()?.strip_prefix("#!")?;
    let mut parts = first.split_whitespace();
    let mut interpreter = parts.next()?.rsplit('/').next()?;
    if interpreter == "env" {
        interpreter = parts.next()?;
    }

    let lang = match interpreter.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.') {
        "python" => "Python",
        "node" | "nodejs" => "JavaScript",
        "ruby" => "Ruby",
        "php" => "PHP",
        "sh" | "bash" | "zsh" | "dash" | "ksh" => "Shell",
        _ => return None,
    };
    Some(lang.to_string())
}

/// Upper-case form used in snippet names: `C#` becomes `CSHARP`, `C++`
/// becomes `CPP`, spaces and hyphens become underscores.
pub fn clean_language(language: &str) -> String {
    match language {
        "C#" => "CSHARP".to_string(),
        "C++" => "CPP".to_string(),
        other => other.to_uppercase().replace([' ', '-'], "_"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_language() {
        assert_eq!(clean_language("C#"), "CSHARP");
        assert_eq!(clean_language("C++"), "CPP");
        assert_eq!(clean_language("Javascript"), "JAVASCRIPT");
        assert_eq!(clean_language("Ma ven Pom"), "MA_VEN_POM");
        assert_eq!(clean_language("Ma-ven-Pom"), "MA_VEN_POM");
        assert_eq!(clean_language("Objective-C"), "OBJECTIVE_C");
        assert_eq!(clean_language(""), "");
    }

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(detect_language("f.py", ""), Some("Python".to_string()));
        assert_eq!(detect_language("src/Main.java", ""), Some("Java".to_string()));
        assert_eq!(detect_language("a/b/c.cc", ""), Some("C++".to_string()));
        assert_eq!(detect_language("Program.cs", ""), Some("C#".to_string()));
        assert_eq!(detect_language("index.JS", ""), Some("JavaScript".to_string()));
        assert_eq!(detect_language("build.gradle.kts", ""), Some("Kotlin".to_string()));
        assert_eq!(detect_language("config.ru", ""), Some("Ruby".to_string()));
        assert_eq!(detect_language("views/home.jade", ""), Some("Pug".to_string()));
    }

    #[test]
    fn test_detect_dockerfile() {
        assert_eq!(detect_language("Dockerfile", ""), Some("Dockerfile".to_string()));
        assert_eq!(detect_language("app/DOCKERFILE", ""), Some("Dockerfile".to_string()));
    }

    #[test]
    fn test_detect_dot_m() {
        let objc = "#import <Foundation/Foundation.h>\n@interface Foo : NSObject\n@end\n";
        assert_eq!(detect_language("Foo.m", objc), Some("Objective-C".to_string()));

        let matlab = "function y = square(x)\n  % square a number\n  y = x.^2;\nend\n";
        assert_eq!(detect_language("square.m", matlab), Some("MATLAB".to_string()));

        assert_eq!(detect_language("empty.m", ""), Some("Objective-C".to_string()));
    }

    #[test]
    fn test_detect_shebang() {
        assert_eq!(
            detect_language("bin/tool", "#!/usr/bin/env python3\nprint(1)\n"),
            Some("Python".to_string())
        );
        assert_eq!(
            detect_language("run", "#!/bin/bash\necho hi\n"),
            Some("Shell".to_string())
        );
        assert_eq!(detect_language("notes", "just text"), None);
        assert_eq!(detect_language("data.unknown", "#!/usr/bin/env node\n"), Some("JavaScript".to_string()));
    }
}
