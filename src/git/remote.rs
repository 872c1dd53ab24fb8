use super::iter::Series;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

static REMOTE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+)\s+([\w/:\-.@]+)\s+\((fetch|push)\)").expect("valid remote regex")
});

/// Name of the remote the repository was cloned from
pub const REMOTE_ORIGIN_NAME: &str = "origin";

/// Iterator over remotes
pub type RemoteIter = Series<Remote>;

/// Configuration of a remote repository
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteConfig {
    pub name: String,
    /// Fetch uses the first URL, push uses all of them
    pub urls: Vec<String>,
}

/// A connection to a remote repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    config: RemoteConfig,
}

impl Remote {
    pub fn new(config: RemoteConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }
}

impl fmt::Display for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let url = self.config.urls.first().map(String::as_str).unwrap_or("");
        write!(
            f,
            "{name}\t{url} (fetch)\n{name}\t{url} (push)",
            name = self.config.name
        )
    }
}

/// Group `git remote -v` output by remote name, ordered by name
pub(crate) fn parse_remotes(output: &str) -> Vec<Remote> {
    let mut configs: BTreeMap<String, RemoteConfig> = BTreeMap::new();

    for caps in REMOTE_LINE.captures_iter(output) {
        let name = &caps[1];
        let url = &caps[2];

        let config = configs
            .entry(name.to_string())
            .or_insert_with(|| RemoteConfig {
                name: name.to_string(),
                urls: Vec::new(),
            });
        if !config.urls.iter().any(|u| u == url) {
            config.urls.push(url.to_string());
        }
    }

    configs.into_values().map(Remote::new).collect()
}
