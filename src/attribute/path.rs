use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttrPathError {
    #[error("attribute path is empty")]
    Empty,

    #[error("attribute path '{0}' contains an empty segment")]
    EmptySegment(String),
}

/// One step of an attribute path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
    /// `*`: any single key or list index.
    Wildcard,
}

impl PathSegment {
    fn matches(&self, concrete: &Self) -> bool {
        match (self, concrete) {
            (Self::Wildcard, _) => true,
            (Self::Key(a), Self::Key(b)) => a == b,
            (Self::Index(a), Self::Index(b)) => a == b,
            _ => false,
        }
    }

    fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(i) => write!(f, "{i}"),
            Self::Wildcard => f.write_str("*"),
        }
    }
}

/// Dot separated attribute path such as `bullseye_rings.0.skills_to_remove`.
///
/// The same type serves two roles: a *declared* path (from a catalog or from
/// configuration, may contain wildcards) and a *concrete* location produced
/// while walking an attribute tree (keys and indices only).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AttrPath {
    segments: Vec<PathSegment>,
}

impl AttrPath {
    /// Empty path, the root of an attribute tree.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> Result<Self, AttrPathError> {
        if raw.trim().is_empty() {
            return Err(AttrPathError::Empty);
        }
        let segments = raw
            .split('.')
            .map(|part| match part {
                "" => Err(AttrPathError::EmptySegment(raw.to_string())),
                "*" => Ok(PathSegment::Wildcard),
                _ => Ok(part
                    .parse::<usize>()
                    .map_or_else(|_| PathSegment::Key(part.to_string()), PathSegment::Index)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// First key of the path, i.e. the top-level attribute name.
    #[must_use]
    pub fn top_level(&self) -> Option<&str> {
        self.segments.iter().find_map(|segment| match segment {
            PathSegment::Key(key) => Some(key.as_str()),
            _ => None,
        })
    }

    /// Path extended by a map key.
    #[must_use]
    pub fn child_key(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Key(key.to_string()));
        Self { segments }
    }

    /// Path extended by a list index.
    #[must_use]
    pub fn child_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        Self { segments }
    }

    /// `other` appended below this path.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// Whether this declared path addresses exactly the concrete location.
    ///
    /// List indices present in `concrete` but not mentioned by the declared
    /// path are traversed implicitly, so `members.user_id` matches
    /// `members.3.user_id` and `skills` matches `skills.1`.
    #[must_use]
    pub fn matches(&self, concrete: &Self) -> bool {
        match_segments(&self.segments, &concrete.segments, false)
    }

    /// Whether the concrete location is this declared path or lies below it.
    #[must_use]
    pub fn matches_prefix(&self, concrete: &Self) -> bool {
        match_segments(&self.segments, &concrete.segments, true)
    }
}

fn match_segments(declared: &[PathSegment], concrete: &[PathSegment], prefix: bool) -> bool {
    match (declared.split_first(), concrete.split_first()) {
        (None, _) => prefix || concrete.iter().all(PathSegment::is_index),
        (Some(_), None) => false,
        (Some((d, d_rest)), Some((c, c_rest))) => {
            (d.matches(c) && match_segments(d_rest, c_rest, prefix))
                || (c.is_index() && match_segments(declared, c_rest, prefix))
        }
    }
}

impl fmt::Display for AttrPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for AttrPath {
    type Err = AttrPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for AttrPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AttrPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;
