//! Classification of `git show --name-status` lines

use regex::Regex;
use std::sync::LazyLock;

const PATH: &str = r"[\w/.-]+";

static DELETED: LazyLock<Regex> = LazyLock::new(|| status_regex(&format!(r"^D\s+({PATH})$")));
static ADDED: LazyLock<Regex> = LazyLock::new(|| status_regex(&format!(r"^A\s+({PATH})$")));
static COPIED: LazyLock<Regex> =
    LazyLock::new(|| status_regex(&format!(r"^C\d{{3}}\s+({PATH})\s+({PATH})$")));
static MODIFIED: LazyLock<Regex> = LazyLock::new(|| status_regex(&format!(r"^M\s+({PATH})$")));
static RENAMED: LazyLock<Regex> =
    LazyLock::new(|| status_regex(&format!(r"^R\d{{3}}\s+({PATH})\s+({PATH})$")));

fn status_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid name-status regex")
}

/// What happened to a path in a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Deleted(String),
    Added(String),
    Copied { from: String, to: String },
    Modified(String),
    Renamed { from: String, to: String },
}

impl FileStatus {
    /// Classify one status line. Patterns are tried in the order
    /// delete, add, copy, modify, rename; `None` when nothing matches.
    pub fn parse(line: &str) -> Option<Self> {
        if let Some(caps) = DELETED.captures(line) {
            return Some(Self::Deleted(caps[1].to_string()));
        }
        if let Some(caps) = ADDED.captures(line) {
            return Some(Self::Added(caps[1].to_string()));
        }
        if let Some(caps) = COPIED.captures(line) {
            return Some(Self::Copied {
                from: caps[1].to_string(),
                to: caps[2].to_string(),
            });
        }
        if let Some(caps) = MODIFIED.captures(line) {
            return Some(Self::Modified(caps[1].to_string()));
        }
        if let Some(caps) = RENAMED.captures(line) {
            return Some(Self::Renamed {
                from: caps[1].to_string(),
                to: caps[2].to_string(),
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cases(prefix: &str) -> Vec<(String, Option<String>)> {
        vec![
            (format!("{prefix}\tfoo"), Some("foo".to_string())),
            (format!("{prefix}\tfoo.bar"), Some("foo.bar".to_string())),
            (format!("{prefix}\tfoo/bar.baz"), Some("foo/bar.baz".to_string())),
            (format!("{prefix}\tfoo%"), None),
            (format!("{prefix}\t"), None),
        ]
    }

    #[test]
    fn test_detects_deleted() {
        for (line, want) in cases("D") {
            assert_eq!(FileStatus::parse(&line), want.map(FileStatus::Deleted), "{line}");
        }
    }

    #[test]
    fn test_detects_added() {
        for (line, want) in cases("A") {
            assert_eq!(FileStatus::parse(&line), want.map(FileStatus::Added), "{line}");
        }
    }

    #[test]
    fn test_detects_modified() {
        for (line, want) in cases("M") {
            assert_eq!(FileStatus::parse(&line), want.map(FileStatus::Modified), "{line}");
        }
    }

    #[test]
    fn test_detects_copied() {
        assert_eq!(
            FileStatus::parse("C100\tfoo/bar.baz\tfoo/baz.biz"),
            Some(FileStatus::Copied {
                from: "foo/bar.baz".to_string(),
                to: "foo/baz.biz".to_string()
            })
        );
        for line in ["C\tfoo\tbar", "C\t", "C100\tfoo\t", "C50\tfoo\tbar", "C5000\tfoo\tbar"] {
            assert_eq!(FileStatus::parse(line), None, "{line}");
        }
    }

    #[test]
    fn test_detects_renamed() {
        assert_eq!(
            FileStatus::parse("R087\tfoo.bar\tfoo/biz"),
            Some(FileStatus::Renamed {
                from: "foo.bar".to_string(),
                to: "foo/biz".to_string()
            })
        );
        for line in ["R\tfoo\tbar", "R\t", "R100\tfoo\t", "R5\tfoo\tbar", "A100\tfoo\tbar"] {
            assert_eq!(FileStatus::parse(line), None, "{line}");
        }
    }

    #[test]
    fn test_unknown_status_letters() {
        assert_eq!(FileStatus::parse("T\tlink.py"), None);
        assert_eq!(FileStatus::parse("V\tfoo"), None);
        assert_eq!(FileStatus::parse(""), None);
    }
}
