//! Dataset versions and the selectors that pick among them.
//!
//! A dataset version is a dot-separated list of non-negative integers such as `1.0.2`.  Versions
//! order component-wise as integers, so `1.10.0` is newer than `1.9.3`.
//!
//! A selector is either the keyword `latest` or a dot-separated pattern of integers and `*`
//! wildcards.  A selector shorter than a version matches any suffix, so `1.0` matches both `1.0.2`
//! and `1.0.3`.  Resolving a selector against a catalog yields the newest matching version.

use crate::{Result, error};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, hash::Hash, str::FromStr};

const LATEST: &str = "latest";
const WILDCARD: &str = "*";

/// A parsed dataset version.
///
/// The original text is kept because it is also the name of the version's directory, both on the
/// remote and in the local cache.  Comparison only looks at the numeric components.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    raw: String,
    components: Vec<u64>,
}

impl Version {
    /// The version exactly as it appears in the catalog.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }
}

impl FromStr for Version {
    type Err = error::Error;

    fn from_str(s: &str) -> Result<Self> {
        let components = s
            .split('.')
            .map(parse_component)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| error::Error::InvalidVersion { version: s.to_string() })?;

        Ok(Self {
            raw: s.to_string(),
            components,
        })
    }
}

impl TryFrom<String> for Version {
    type Error = error::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.raw
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.components.hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    /// Lexicographic over the integer components; on a shared-prefix tie the shorter version is
    /// the older one.
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }
}

/// One position of a [`VersionSelector::Pattern`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SelectorComponent {
    Exact(u64),
    Wildcard,
}

impl SelectorComponent {
    fn matches(self, component: u64) -> bool {
        match self {
            Self::Exact(n) => n == component,
            Self::Wildcard => true,
        }
    }
}

/// Which version(s) of a dataset the caller is interested in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum VersionSelector {
    /// The newest version in the catalog.
    #[default]
    Latest,

    /// A dot-separated pattern, matched component-wise against candidate versions.
    Pattern(Vec<SelectorComponent>),
}

impl VersionSelector {
    /// Does `version` satisfy this selector?
    ///
    /// Components are compared up to the length of the selector; trailing version components the
    /// selector does not mention are unconstrained.  A version shorter than the selector never
    /// matches.
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Latest => true,
            Self::Pattern(pattern) => {
                pattern.len() <= version.components.len()
                    && pattern
                        .iter()
                        .zip(&version.components)
                        .all(|(s, &v)| s.matches(v))
            }
        }
    }

    /// A pattern made only of literal numbers, with no wildcard.
    pub fn is_exact(&self) -> bool {
        match self {
            Self::Latest => false,
            Self::Pattern(pattern) => pattern
                .iter()
                .all(|c| matches!(c, SelectorComponent::Exact(_))),
        }
    }

    /// The selector as a concrete version, if it is exact.
    pub fn as_version(&self) -> Option<Version> {
        if self.is_exact() {
            self.to_string().parse().ok()
        } else {
            None
        }
    }

    /// An exact selector that spells out at least as many components as the longest available
    /// version.  A miss on such a selector means that specific version is absent, as opposed to a
    /// pattern that simply matched nothing.
    fn pins_every_component(&self, available: &[Version]) -> bool {
        match self {
            Self::Latest => false,
            Self::Pattern(pattern) => {
                self.is_exact()
                    && pattern.len()
                        >= available
                            .iter()
                            .map(|v| v.components.len())
                            .max()
                            .unwrap_or(0)
            }
        }
    }
}

impl FromStr for VersionSelector {
    type Err = error::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == LATEST {
            return Ok(Self::Latest);
        }

        let pattern = s
            .split('.')
            .map(|part| {
                if part == WILDCARD {
                    Some(SelectorComponent::Wildcard)
                } else {
                    parse_component(part).map(SelectorComponent::Exact)
                }
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| error::Error::InvalidSelector { selector: s.to_string() })?;

        Ok(Self::Pattern(pattern))
    }
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str(LATEST),
            Self::Pattern(pattern) => {
                for (i, component) in pattern.iter().enumerate() {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    match component {
                        SelectorComponent::Exact(n) => write!(f, "{}", n)?,
                        SelectorComponent::Wildcard => f.write_str(WILDCARD)?,
                    }
                }
                Ok(())
            }
        }
    }
}

/// Pick the newest version in `available` that satisfies `selector`.
///
/// `name` is only used to make the error useful.  Fails with
/// [`DatasetVersionNotFound`](error::Error::DatasetVersionNotFound) when an exact, fully-specified
/// version is missing, and with [`VersionNotFound`](error::Error::VersionNotFound) for every other
/// miss, including an empty catalog.
pub fn resolve(name: &str, selector: &VersionSelector, available: &[Version]) -> Result<Version> {
    let found = available.iter().filter(|v| selector.matches(v)).max().cloned();

    match found {
        Some(version) => Ok(version),
        None if !available.is_empty() && selector.pins_every_component(available) => {
            error::DatasetVersionNotFoundSnafu {
                name,
                version: selector.to_string(),
            }
            .fail()
        }
        None => error::VersionNotFoundSnafu {
            name,
            selector: selector.to_string(),
        }
        .fail(),
    }
}

/// Parse a list of raw catalog entries, dropping the ones that are not versions.
pub(crate) fn parse_versions<I, S>(raw: I) -> Vec<Version>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|s| match s.as_ref().parse::<Version>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::debug!("Ignoring catalog entry '{}': not a version", s.as_ref());
                None
            }
        })
        .collect()
}

fn parse_component(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}
