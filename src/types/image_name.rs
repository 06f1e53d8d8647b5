// ABOUTME: Repository and tag split for image names.
// ABOUTME: Handles forms like repo, repo:tag, registry:5000/repo:tag.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseImageNameError {
    #[error("image name cannot be empty")]
    Empty,

    #[error("image name has an empty repository: {0}")]
    EmptyRepository(String),
}

/// An image name split into repository and optional tag.
///
/// The last `:` separates the tag only when what follows it has no `/`, so a
/// registry port is never mistaken for a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageName {
    repository: String,
    tag: Option<String>,
}

impl ImageName {
    pub fn parse(input: &str) -> Result<Self, ParseImageNameError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageNameError::Empty);
        }

        let (repository, tag) = match input.rsplit_once(':') {
            Some((repo, tag)) if !tag.contains('/') => (repo, Some(tag.to_string())),
            _ => (input, None),
        };
        if repository.is_empty() {
            return Err(ParseImageNameError::EmptyRepository(input.to_string()));
        }

        Ok(Self {
            repository: repository.to_string(),
            tag,
        })
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }
}

impl FromStr for ImageName {
    type Err = ParseImageNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repository)?;
        if let Some(ref tag) = self.tag {
            write!(f, ":{}", tag)?;
        }
        Ok(())
    }
}
