use std::fmt;

/// Version string reported when the installed jar carries no version.
pub const UNKNOWN_VERSION: &str = "unknown";

const PRE_RELEASE: &str = "pre-release";

/// Named release track. Compared case-insensitively everywhere.
#[derive(Debug, Clone)]
pub struct Channel(String);

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased form used in remote URLs.
    pub fn url_segment(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    pub fn is_pre_release(&self) -> bool {
        self.0.eq_ignore_ascii_case(PRE_RELEASE)
    }

    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.0)
    }
}

impl Eq for Channel {}

impl Default for Channel {
    fn default() -> Self {
        Self::new("release")
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VersionRequest {
    #[default]
    Latest,
    Exact(String),
}

impl VersionRequest {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("latest") {
            Self::Latest
        } else {
            Self::Exact(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Latest => "latest",
            Self::Exact(version) => version,
        }
    }
}

impl fmt::Display for VersionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
