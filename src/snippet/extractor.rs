//! Region-tag extraction from a single file

use super::metadata::{SampleMetadata, parse_sample_metadata};
use super::{SnippetVersion, SnippetVersionMeta};
use crate::error::ExtractionError;
use regex::{Regex, RegexSet};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static START_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[START ([0-9A-Za-z_-]+)\]").expect("valid region tag regex")
});

const START_IGNORE: &str = ":start-after:";
const END_IGNORE: &str = ":end-before:";

/// Source files worth scanning, matched against the full path
static FILE_WHITELIST: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"^(?i)dockerfile$",
        r"^.+\.c$",
        r"^.+\.(cpp|cc)$",
        r"^.+\.cs$",
        r"^.+\.go$",
        // Apps Script
        r"^.+\.gs$",
        r"^.+\.html$",
        r"^.+\.(jade|pug)$",
        r"^.+\.java$",
        r"^.+\.js$",
        r"^.+\.json$",
        r"^.+\.(kt|kts)$",
        r"^.+\.m$",
        r"^.+\.php$",
        r"^.+\.py$",
        r"^.+\.(rb|ru)$",
        r"^.+\.swift$",
        r"^.+\.sh$",
        r"^.+\.xml$",
        r"^.+\.yaml$",
    ])
    .expect("valid whitelist regexes")
});

/// Whether `path` is a source file that may carry region tags
pub fn is_valid_file(path: &str) -> bool {
    FILE_WHITELIST.is_match(path)
}

/// Every `[START tag]` in `content`, in order, duplicates included
pub fn detect_region_tags(content: &str) -> Vec<String> {
    START_TAG
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Extract one version per region tag found in `content`.
///
/// `name_for` turns a tag into the snippet's fully-qualified name. The returned
/// versions have no file attached yet. Disjoint regions for the same tag are
/// concatenated; a region without a matching `[END tag]` is dropped.
pub fn extract_snippet_versions<F>(
    content: &str,
    name_for: F,
) -> Result<BTreeMap<String, SnippetVersion>, ExtractionError>
where
    F: Fn(&str) -> String,
{
    let sample_meta = parse_sample_metadata(content)?;

    let mut tags = detect_region_tags(content);
    tags.sort();
    tags.dedup();

    let mut versions = BTreeMap::new();
    for tag in tags {
        let Some((lines, text)) = extract_regions(content, &tag) else {
            continue;
        };

        versions.insert(
            tag.clone(),
            SnippetVersion {
                name: name_for(&tag),
                file: None,
                lines,
                content: text,
                meta: meta_for_tag(sample_meta.as_ref(), &tag),
            },
        );
    }
    Ok(versions)
}

/// Line ranges and trimmed concatenated text of every closed region for `tag`
fn extract_regions(content: &str, tag: &str) -> Option<(Vec<String>, String)> {
    let start_marker = format!("[START {tag}]");
    let end_marker = format!("[END {tag}]");

    let mut ranges = Vec::new();
    let mut combined = String::new();
    // (first line number, text so far) of the region currently open
    let mut open: Option<(usize, String)> = None;

    for (idx, line) in content.lines().enumerate() {
        let number = idx + 1;
        if line.contains(&start_marker) && !line.contains(START_IGNORE) {
            // a second start discards whatever was open
            open = Some((number, format!("{line}\n")));
        } else if let Some((_, region)) = open.as_mut() {
            region.push_str(line);
            region.push('\n');
            if line.contains(&end_marker) && !line.contains(END_IGNORE) {
                if let Some((start, region)) = open.take() {
                    ranges.push(format!("L{start}-L{number}"));
                    combined.push_str(&region);
                }
            }
        }
    }

    if ranges.is_empty() {
        return None;
    }
    Some((ranges, combined.trim().to_string()))
}

fn meta_for_tag(sample_meta: Option<&SampleMetadata>, tag: &str) -> SnippetVersionMeta {
    let Some(sample) = sample_meta else {
        return SnippetVersionMeta::default();
    };
    let global = &sample.meta;
    let mut meta = SnippetVersionMeta {
        title: global.title.clone(),
        description: global.description.clone(),
        usage: global.usage.clone(),
        api_version: global.api_version.clone(),
    };

    if let Some(per_tag) = global.snippets.iter().find(|s| s.region_tag == tag) {
        if !per_tag.description.is_empty() {
            meta.description = per_tag.description.clone();
        }
        if !per_tag.usage.is_empty() {
            meta.usage = per_tag.usage.clone();
        }
    }
    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(prefix: &'static str) -> impl Fn(&str) -> String {
        move |tag| format!("{prefix}/{tag}")
    }

    fn lines(list: &[&str]) -> Vec<String> {
        list.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_validates_files() {
        for path in [
            "main.c", "a/b.cpp", "x.cc", "Program.cs", "Dockerfile", "DOCKERFILE",
            "main.go", "Code.gs", "index.html", "v.jade", "Main.java", "index.js",
            "package.json", "a.kt", "b.kts", "Foo.m", "index.php", "v.pug", "main.py",
            "a.rb", "config.ru", "App.swift", "run.sh", "pom.xml", "app.yaml",
        ] {
            assert!(is_valid_file(path), "{path} should be valid");
        }
        for path in [
            "README.md", "main.rs", ".py", "app.yml", "Dockerfile.dev", "image.png", "c",
            "docker/Dockerfile",
        ] {
            assert!(!is_valid_file(path), "{path} should be invalid");
        }
    }

    #[test]
    fn test_detects_region_tags() {
        assert!(detect_region_tags("").is_empty());
        assert_eq!(detect_region_tags("[START asdf]"), vec!["asdf"]);
        assert!(detect_region_tags("[Start asdf]").is_empty());
        assert!(detect_region_tags("[START asdf ]").is_empty());
        assert!(detect_region_tags("[ START asdf]").is_empty());
        assert!(detect_region_tags("[END asdf]").is_empty());
        assert_eq!(detect_region_tags("[START asdf][END asdf]"), vec!["asdf"]);
        assert!(detect_region_tags("[START ðŸ˜Š]").is_empty());
        assert_eq!(
            detect_region_tags("[START one]\n\t[START two]\n\t[START three]"),
            vec!["one", "two", "three"]
        );
        assert_eq!(
            detect_region_tags("[START one]\n[START one]\n[START one]"),
            vec!["one", "one", "one"]
        );
        assert_eq!(detect_region_tags("[START a-b_c9]"), vec!["a-b_c9"]);
    }

    #[test]
    fn test_empty_content_has_no_snippets() {
        assert!(extract_snippet_versions("", named("x")).unwrap().is_empty());
    }

    #[test]
    fn test_finds_snippets() {
        let content = "// [START foo]\nimport foo\ndef foo:\n  bar\n// [END foo]";
        let got = extract_snippet_versions(content, named("foo")).unwrap();
        assert_eq!(got.len(), 1);
        let v = &got["foo"];
        assert_eq!(v.name, "foo/foo");
        assert!(v.file.is_none());
        assert_eq!(v.lines, lines(&["L1-L5"]));
        assert_eq!(v.content, content);
    }

    #[test]
    fn test_finds_multiple_snippets() {
        let content = "// [START foo]\nimport foo\ndef foo:\n  bar\n// [END foo]\n\n// [START bar]\nimport bar\ndef bar:\n  baz\n// [END bar]";
        let got = extract_snippet_versions(content, named("baz")).unwrap();
        assert_eq!(got["foo"].lines, lines(&["L1-L5"]));
        assert_eq!(got["bar"].name, "baz/bar");
        assert_eq!(got["bar"].lines, lines(&["L7-L11"]));
        assert_eq!(
            got["bar"].content,
            "// [START bar]\nimport bar\ndef bar:\n  baz\n// [END bar]"
        );
    }

    #[test]
    fn test_concatenates_disjoint_regions() {
        let content = "// [START foo]\nimport foo\ndef foo:\n  bar\n// [END foo]\n\n// [START bar]\nimport bar\ndef bar:\n  baz\n// [END bar]\n\n// [START foo]\ndef biz:\n  fiz\n// [END foo]\n";
        let got = extract_snippet_versions(content, named("baz")).unwrap();
        assert_eq!(got["foo"].lines, lines(&["L1-L5", "L13-L16"]));
        assert_eq!(
            got["foo"].content,
            "// [START foo]\nimport foo\ndef foo:\n  bar\n// [END foo]\n// [START foo]\ndef biz:\n  fiz\n// [END foo]"
        );
        assert_eq!(got["bar"].lines, lines(&["L7-L11"]));
    }

    #[test]
    fn test_ignores_unterminated_and_mismatched_tags() {
        for content in [
            "// [START foo]\nimport foo\ndef foo:\n  bar\n",
            "// [START foo]\nimport foo\ndef foo:\n  bar\n// [END zfoo]\n",
            "import foo\ndef foo:\n  bar\n// [END bar]\n",
        ] {
            assert!(
                extract_snippet_versions(content, named("x")).unwrap().is_empty(),
                "{content:?}"
            );
        }
    }

    #[test]
    fn test_restart_discards_open_region() {
        let content = "# [START foo]\nold\n# [START foo]\nnew\n# [END foo]\n";
        let got = extract_snippet_versions(content, named("x")).unwrap();
        assert_eq!(got["foo"].lines, lines(&["L3-L5"]));
        assert_eq!(got["foo"].content, "# [START foo]\nnew\n# [END foo]");
    }

    #[test]
    fn test_trailing_unterminated_region_is_dropped() {
        let content = "# [START foo]\na\n# [END foo]\n# [START foo]\nb\n";
        let got = extract_snippet_versions(content, named("x")).unwrap();
        assert_eq!(got["foo"].lines, lines(&["L1-L3"]));
        assert_eq!(got["foo"].content, "# [START foo]\na\n# [END foo]");
    }

    #[test]
    fn test_ignores_pydoc_cross_references() {
        let content = "// [START foo]\nimport foo\ndef foo:\n  \"\"\"foo\n\n    :start-after: [START bigtable_create_table]\n    :end-before: [START bigtable_create_table]\n  bar\n// [END foo]\n";
        let got = extract_snippet_versions(content, named("foo")).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got["foo"].lines, lines(&["L1-L9"]));
        assert_eq!(got["foo"].content, content.trim());
    }

    #[test]
    fn test_attaches_sample_metadata() {
        let content = "\
# sample-metadata:
#   title: Upload a file
#   description: Uploads a file.
#   usage: python upload.py <bucket>
#   api_version: v1
#   snippets:
#   - region_tag: upload_tagged
#     usage: python upload.py --tagged

# [START upload]
print('upload')
# [END upload]
# [START upload_tagged]
print('tagged')
# [END upload_tagged]
";
        let got = extract_snippet_versions(content, named("x")).unwrap();
        let plain = &got["upload"].meta;
        assert_eq!(plain.title, "Upload a file");
        assert_eq!(plain.usage, "python upload.py <bucket>");
        assert_eq!(plain.api_version, "v1");

        let tagged = &got["upload_tagged"].meta;
        assert_eq!(tagged.description, "Uploads a file.");
        assert_eq!(tagged.usage, "python upload.py --tagged");
    }

    #[test]
    fn test_malformed_metadata_propagates() {
        let content = "# sample-metadata:\n#   title: [oops\n\n# [START a]\n# [END a]\n";
        assert!(extract_snippet_versions(content, named("x")).is_err());
    }
}
