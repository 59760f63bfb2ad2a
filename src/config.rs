use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Site-wide rendering settings, optionally loaded from a TOML file.
///
/// ```toml
/// site_name = "spacetraveling"
/// exit_preview_url = "/api/exit-preview"
/// template_dir = "templates"
///
/// [comments]
/// repo = "owner/blog-comments"
/// theme = "github-dark"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub site_name: String,
    pub exit_preview_url: String,
    /// Directory with `list.html` and `post.html` overriding the bundled templates.
    pub template_dir: Option<PathBuf>,
    pub comments: CommentsConfig,
}

/// Settings for the utterances comment widget.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommentsConfig {
    pub script_url: String,
    /// GitHub repository holding the comment issues.
    pub repo: String,
    pub issue_term: String,
    pub label: String,
    pub theme: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_name: "spacetraveling".to_string(),
            exit_preview_url: "/api/exit-preview".to_string(),
            template_dir: None,
            comments: CommentsConfig::default(),
        }
    }
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            script_url: "https://utteranc.es/client.js".to_string(),
            repo: "betolarbac/ignite-reactjs-spacetraveling".to_string(),
            issue_term: "pathname".to_string(),
            label: "blog-comment".to_string(),
            theme: "photon-dark".to_string(),
        }
    }
}

impl SiteConfig {
    /// Load from `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        let config: SiteConfig =
            toml::from_str(&data).with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = SiteConfig::load(None).unwrap();
        assert_eq!(config, SiteConfig::default());
        assert_eq!(config.comments.issue_term, "pathname");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: SiteConfig = toml::from_str(
            r#"
            site_name = "My blog"

            [comments]
            repo = "me/comments"
            "#,
        )
        .unwrap();
        assert_eq!(config.site_name, "My blog");
        assert_eq!(config.comments.repo, "me/comments");
        assert_eq!(config.comments.theme, "photon-dark");
        assert_eq!(config.exit_preview_url, "/api/exit-preview");
        assert!(config.template_dir.is_none());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<SiteConfig>("sitename = \"typo\"").is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(SiteConfig::load(Some(Path::new("/nonexistent/site.toml"))).is_err());
    }
}
