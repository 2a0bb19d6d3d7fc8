//! Versioned partition name table.

use serde::{Deserialize, Serialize};

/// The three partitions the current worker version owns.
///
/// Activation deletes every partition whose name is not listed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionNames {
    pub app_shell: String,
    pub api: String,
    pub image: String,
}

impl PartitionNames {
    pub fn new(app_shell: impl Into<String>, api: impl Into<String>, image: impl Into<String>) -> Self {
        Self { app_shell: app_shell.into(), api: api.into(), image: image.into() }
    }

    /// `{prefix}-cache-{version}`, `{prefix}-api-cache-{version}`,
    /// `{prefix}-image-cache-{version}`.
    pub fn versioned(prefix: &str, version: &str) -> Self {
        Self::new(
            format!("{prefix}-cache-{version}"),
            format!("{prefix}-api-cache-{version}"),
            format!("{prefix}-image-cache-{version}"),
        )
    }

    pub fn contains(&self, name: &str) -> bool {
        self.app_shell == name || self.api == name || self.image == name
    }

    pub fn all(&self) -> [&str; 3] {
        [&self.app_shell, &self.api, &self.image]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versioned_names() {
        let names = PartitionNames::versioned("dstory", "v2");
        assert_eq!(names.all(), ["dstory-cache-v2", "dstory-api-cache-v2", "dstory-image-cache-v2"]);
    }

    #[test]
    fn test_contains() {
        let names = PartitionNames::new("app-shell-v1", "api-v1", "image-v1");
        assert!(names.contains("api-v1"));
        assert!(!names.contains("old-cache-v0"));
        assert!(!names.contains("api-v0"));
    }
}
