// Copyright 2024-2026 ImagePilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Container image reference parsing and repository matching.
//!
//! Accepts `[registry/]repository[:tag][@digest]`. Docker Hub shorthands are
//! normalized so that `nginx`, `library/nginx` and `docker.io/library/nginx`
//! name the same repository.

/// Maximum accepted length of an image reference.
pub const MAX_IMAGE_LENGTH: usize = 512;

/// Tag assumed when an image reference carries none.
pub const DEFAULT_TAG: &str = "latest";

/// Maximum length of a registry tag.
pub const MAX_TAG_LENGTH: usize = 128;

const DOCKER_HUB: &str = "docker.io";
const DOCKER_HUB_ALIASES: [&str; 3] = ["docker.io", "index.docker.io", "registry-1.docker.io"];

/// Image reference errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageError {
    /// Reference is empty.
    Empty,
    /// Reference exceeds [`MAX_IMAGE_LENGTH`].
    TooLong(usize),
    /// Reference contains a character never valid in an image name.
    ForbiddenCharacter(char),
    /// Reference has no repository component.
    MissingRepository(String),
    /// Tag is not `[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}`.
    InvalidTag(String),
}

impl std::fmt::Display for ImageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "image reference is empty"),
            Self::TooLong(len) => {
                write!(f, "image reference of {} bytes exceeds {}", len, MAX_IMAGE_LENGTH)
            }
            Self::ForbiddenCharacter(c) => {
                write!(f, "image reference contains forbidden character: {:?}", c)
            }
            Self::MissingRepository(image) => {
                write!(f, "image reference '{}' has no repository", image)
            }
            Self::InvalidTag(tag) => write!(f, "invalid image tag: {:?}", tag),
        }
    }
}

impl std::error::Error for ImageError {}

/// Parsed image reference. Keeps the registry spelling of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    registry: Option<String>,
    path: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageRef {
    /// Parse an image reference.
    ///
    /// # Errors
    /// Returns an `ImageError` for empty, oversized or shell-unsafe input.
    pub fn parse(image: &str) -> Result<Self, ImageError> {
        if image.is_empty() {
            return Err(ImageError::Empty);
        }
        if image.len() > MAX_IMAGE_LENGTH {
            return Err(ImageError::TooLong(image.len()));
        }

        let forbidden = [
            ';', '&', '|', '`', '$', '(', ')', '{', '}', '<', '>', ' ', '\n', '\r', '\0',
        ];
        if let Some(c) = image.chars().find(|c| forbidden.contains(c)) {
            return Err(ImageError::ForbiddenCharacter(c));
        }

        let (name, digest) = match image.split_once('@') {
            Some((name, digest)) => (name, Some(digest.to_string())),
            None => (image, None),
        };

        let last_slash = name.rfind('/').map_or(0, |i| i + 1);
        let (name, tag) = match name[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                (&name[..split], Some(name[split + 1..].to_string()))
            }
            None => (name, None),
        };

        let (registry, path) = match name.split_once('/') {
            Some((first, rest)) if is_registry_host(first) => (Some(first.to_string()), rest),
            _ => (None, name),
        };

        if path.is_empty() || path.starts_with('/') || path.ends_with('/') {
            return Err(ImageError::MissingRepository(image.to_string()));
        }

        Ok(Self {
            registry,
            path: path.to_string(),
            tag: tag.filter(|t| !t.is_empty()),
            digest,
        })
    }

    /// Registry host with Docker Hub aliases collapsed.
    pub fn registry_host(&self) -> &str {
        match self.registry.as_deref() {
            Some(host) if !DOCKER_HUB_ALIASES.contains(&host) => host,
            _ => DOCKER_HUB,
        }
    }

    /// Repository path, with the implicit `library/` namespace on Docker Hub.
    pub fn repository(&self) -> String {
        if self.registry_host() == DOCKER_HUB && !self.path.contains('/') {
            format!("library/{}", self.path)
        } else {
            self.path.clone()
        }
    }

    /// Tag of the reference, [`DEFAULT_TAG`] when absent.
    pub fn tag(&self) -> &str {
        self.tag.as_deref().unwrap_or(DEFAULT_TAG)
    }

    pub fn has_registry(&self) -> bool {
        self.registry.is_some()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Pinned by digest alone; [`tag`](Self::tag) reports the default but is not running.
    pub fn is_digest_pinned(&self) -> bool {
        self.digest.is_some() && self.tag.is_none()
    }

    /// Render the same repository at a new tag. Any digest pin is dropped.
    pub fn with_tag(&self, tag: &str) -> String {
        match &self.registry {
            Some(registry) => format!("{}/{}:{}", registry, self.path, tag),
            None => format!("{}:{}", self.path, tag),
        }
    }

    /// Whether this image belongs to the repository an event refers to.
    ///
    /// Registry hosts are compared only when the event names one, either
    /// inside `repository_name` or through `registry_host`.
    pub fn matches_repository(&self, repository_name: &str, registry_host: &str) -> bool {
        let Ok(event_ref) = ImageRef::parse(repository_name) else {
            return false;
        };

        let event_host = if event_ref.has_registry() {
            Some(event_ref.registry_host().to_string())
        } else if !registry_host.is_empty() {
            Some(normalize_host(registry_host).to_string())
        } else {
            None
        };

        if let Some(host) = event_host {
            if host != self.registry_host() {
                return false;
            }
            let event_path = ImageRef {
                registry: Some(host),
                ..event_ref
            };
            return event_path.repository() == self.repository();
        }

        event_ref.repository() == self.repository()
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(registry) = &self.registry {
            write!(f, "{}/", registry)?;
        }
        write!(f, "{}:{}", self.path, self.tag())?;
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

/// Check a tag against the registry tag grammar.
///
/// # Errors
/// Returns `ImageError::InvalidTag` for empty, oversized, or malformed tags.
pub fn validate_tag(tag: &str) -> Result<(), ImageError> {
    let mut chars = tag.chars();
    let valid_first = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));

    if !valid_first || !valid_rest || tag.len() > MAX_TAG_LENGTH {
        return Err(ImageError::InvalidTag(tag.to_string()));
    }
    Ok(())
}

/// First path component is a registry when it looks like a host.
fn is_registry_host(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

fn normalize_host(host: &str) -> &str {
    let host = host
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    if DOCKER_HUB_ALIASES.contains(&host) {
        DOCKER_HUB
    } else {
        host
    }
}

#[cfg(test)]
#[path = "image_tests.rs"]
mod tests;
