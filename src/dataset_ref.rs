use crate::{Result, cache, error, version::VersionSelector};
use std::{fmt, str::FromStr};

/// Separates the dataset name from the version selector in a `NAME:VERSION` token.
const SEPARATOR: char = ':';

/// A dataset requested by the user: a name plus which version(s) of it.
///
/// Parsed from `NAME` (meaning the latest version) or `NAME:VERSION`, where `VERSION` is anything
/// [`VersionSelector`] accepts.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DatasetRef {
    pub name: String,
    pub selector: VersionSelector,

    /// Whether the token spelled out a version.  `remove` treats a bare name as "every version",
    /// whereas `download` treats it as `latest`.
    pub explicit_version: bool,
}

impl DatasetRef {
    pub fn new(name: impl Into<String>, selector: VersionSelector) -> Self {
        Self {
            name: name.into(),
            selector,
            explicit_version: true,
        }
    }
}

impl FromStr for DatasetRef {
    type Err = error::Error;

    fn from_str(token: &str) -> Result<Self> {
        let mut parts = token.split(SEPARATOR);
        let name = parts.next().unwrap_or_default();
        let version = parts.next();

        // The name becomes a directory under the cache root, so it must not be a path
        if parts.next().is_some() || !cache::is_valid_name(name) {
            return error::InvalidDatasetRefSnafu { token }.fail();
        }

        let (selector, explicit_version) = match version {
            Some(v) => (v.parse()?, true),
            None => (VersionSelector::Latest, false),
        };

        Ok(Self {
            name: name.to_string(),
            selector,
            explicit_version,
        })
    }
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.explicit_version {
            write!(f, "{}{}{}", self.name, SEPARATOR, self.selector)
        } else {
            f.write_str(&self.name)
        }
    }
}
