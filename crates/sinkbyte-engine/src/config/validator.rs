//! Semantic validation for parsed settings.

use anyhow::{bail, Result};

use crate::config::types::{MountSettings, Settings};

fn validate_url(url: &str, context: &str, errors: &mut Vec<String>) {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        errors.push(format!("{context} must not be empty"));
    } else if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        errors.push(format!("{context} '{url}' must be an http(s) URL"));
    }
}

fn validate_mount(mount: &MountSettings, context: &str, errors: &mut Vec<String>) {
    if mount.source.trim().is_empty() {
        errors.push(format!("{context}.source must not be empty"));
    }
    if !mount.target.is_absolute() {
        errors.push(format!(
            "{context}.target '{}' must be an absolute path",
            mount.target.display()
        ));
    }
}

/// Validate parsed settings.
/// Returns `Ok(())` if valid, Err with all validation errors if not.
///
/// # Errors
///
/// Returns an error listing every validation failure found.
pub fn validate_settings(settings: &Settings) -> Result<()> {
    let mut errors = Vec::new();

    validate_mount(&settings.container.workspace, "container.workspace", &mut errors);
    validate_mount(
        &settings.container.tool_workspace,
        "container.tool_workspace",
        &mut errors,
    );
    if settings.container.workspace.target == settings.container.tool_workspace.target {
        errors.push("container.workspace and container.tool_workspace share a target".to_string());
    }
    if settings.container.cleanup_timeout_secs == 0 {
        errors.push("container.cleanup_timeout_secs must be at least 1".to_string());
    }

    validate_url(&settings.commit.api_base_url, "commit.api_base_url", &mut errors);
    validate_url(
        &settings.commit.asset_profile_url,
        "commit.asset_profile_url",
        &mut errors,
    );
    if settings.commit.request_timeout_secs == 0 {
        errors.push("commit.request_timeout_secs must be at least 1".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        bail!("Settings validation failed:\n  - {}", errors.join("\n  - "));
    }
}
