//! Force policy for mutable, unversioned tags.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ForcePolicy {
    match_tag: bool,
}

impl ForcePolicy {
    pub fn new(match_tag: bool) -> Self {
        Self { match_tag }
    }

    pub fn match_tag(&self) -> bool {
        self.match_tag
    }

    pub fn name(&self) -> &'static str {
        "force"
    }

    /// With `match_tag` set, only a re-push of the running tag qualifies.
    pub fn should_update(&self, current: &str, new: &str) -> bool {
        !self.match_tag || current == new
    }
}
