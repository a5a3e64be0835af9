use std::fmt;
use std::str::FromStr;

use crate::digest::OciDigest;
use crate::error::Error;

/// A reference to an artifact in a remote registry.
///
/// Grammar: `host/path[:tag]` or `host/path@sha256:<hex>`. When neither tag
/// nor digest is present the tag defaults to `latest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Registry hostname, possibly with a port
    pub registry: String,
    /// Repository path within the registry
    pub repository: String,
    /// Tag, when the reference is tag-qualified
    pub tag: Option<String>,
    /// Digest, when the reference is digest-qualified
    pub digest: Option<OciDigest>,
}

impl Reference {
    /// The tag or digest string used in manifest URLs.
    pub fn manifest_reference(&self) -> String {
        match (&self.digest, &self.tag) {
            (Some(digest), _) => digest.to_string(),
            (None, Some(tag)) => tag.clone(),
            (None, None) => "latest".to_string(),
        }
    }
}

impl FromStr for Reference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((registry, remainder)) = s.split_once('/') else {
            return Err(Error::InvalidReference(format!(
                "missing registry host in {s:?}"
            )));
        };
        if registry.is_empty() || remainder.is_empty() {
            return Err(Error::InvalidReference(format!(
                "empty registry or repository in {s:?}"
            )));
        }

        // Digest-qualified references take precedence over tags
        if let Some((repository, digest)) = remainder.split_once('@') {
            if repository.is_empty() {
                return Err(Error::InvalidReference(format!(
                    "empty repository in {s:?}"
                )));
            }
            let digest = OciDigest::from_str(digest)?;
            return Ok(Reference {
                registry: registry.to_string(),
                repository: repository.to_string(),
                tag: None,
                digest: Some(digest),
            });
        }

        // The repository path may contain slashes; only the final segment can
        // carry a tag separator.
        let (repository, tag) = match remainder.rsplit_once(':') {
            Some((repository, tag)) if !tag.contains('/') => {
                if repository.is_empty() || tag.is_empty() {
                    return Err(Error::InvalidReference(format!(
                        "empty repository or tag in {s:?}"
                    )));
                }
                (repository.to_string(), Some(tag.to_string()))
            }
            _ => (remainder.to_string(), None),
        };

        Ok(Reference {
            registry: registry.to_string(),
            repository,
            tag,
            digest: None,
        })
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.repository)?;
        match (&self.digest, &self.tag) {
            (Some(digest), _) => write!(f, "@{digest}"),
            (None, Some(tag)) => write!(f, ":{tag}"),
            (None, None) => write!(f, ":latest"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_reference() {
        let r: Reference = "ghcr.io/myorg/myartifact:v1.2".parse().unwrap();
        assert_eq!(r.registry, "ghcr.io");
        assert_eq!(r.repository, "myorg/myartifact");
        assert_eq!(r.tag.as_deref(), Some("v1.2"));
        assert!(r.digest.is_none());
        assert_eq!(r.manifest_reference(), "v1.2");
    }

    #[test]
    fn defaults_to_latest_tag() {
        let r: Reference = "registry.local:5000/specs/demo".parse().unwrap();
        assert_eq!(r.registry, "registry.local:5000");
        assert_eq!(r.repository, "specs/demo");
        assert_eq!(r.manifest_reference(), "latest");
        assert_eq!(r.to_string(), "registry.local:5000/specs/demo:latest");
    }

    #[test]
    fn parses_digest_reference() {
        let digest = OciDigest::from_content(b"manifest");
        let raw = format!("ghcr.io/myorg/myartifact@{digest}");
        let r: Reference = raw.parse().unwrap();
        assert_eq!(r.digest.as_ref().unwrap(), &digest);
        assert!(r.tag.is_none());
        assert_eq!(r.manifest_reference(), digest.to_string());
        assert_eq!(r.to_string(), raw);
    }

    #[test]
    fn port_colon_is_not_a_tag() {
        let r: Reference = "localhost:5000/demo".parse().unwrap();
        assert_eq!(r.registry, "localhost:5000");
        assert_eq!(r.repository, "demo");
        assert!(r.tag.is_none());
    }

    #[test]
    fn rejects_malformed_references() {
        assert!("no-slash-here".parse::<Reference>().is_err());
        assert!("/leading/slash".parse::<Reference>().is_err());
        assert!("host/repo@not-a-digest".parse::<Reference>().is_err());
    }
}
