//! Artifact file naming.
//!
//! Display names come from an object's name field when it survives
//! sanitization, otherwise from `<declared_type>_<path_id>`. Artifact file
//! names always append the object's identity, so two objects sharing a
//! display name never collide on disk.

/// Strips every character that is not alphanumeric, space, dot, underscore
/// or hyphen, then trims surrounding whitespace.
///
/// # Examples
///
/// ```
/// use bundlesync_core::naming::sanitize_name;
///
/// assert_eq!(sanitize_name("  hero/sword:01 "), "herosword01");
/// assert_eq!(sanitize_name("***"), "");
/// ```
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Synthesized name used when an object has no usable name.
#[must_use]
pub fn fallback_name(declared_type: &str, path_id: i64) -> String {
    format!("{declared_type}_{path_id}")
}

/// Resolves the display name for an object.
///
/// Returns the sanitized `raw` name when it is non-empty, otherwise the
/// synthesized fallback.
#[must_use]
pub fn display_name(raw: Option<&str>, declared_type: &str, path_id: i64) -> String {
    let sanitized = raw.map(sanitize_name).unwrap_or_default();
    if sanitized.is_empty() {
        fallback_name(declared_type, path_id)
    } else {
        sanitized
    }
}

/// Stem shared by every artifact of an object: `<name>_<path_id>`.
#[must_use]
pub fn artifact_stem(name: &str, path_id: i64) -> String {
    format!("{name}_{path_id}")
}

/// Full artifact file name: `<name>_<path_id>.<extension>`.
#[must_use]
pub fn artifact_file_name(name: &str, path_id: i64, extension: &str) -> String {
    format!("{}.{extension}", artifact_stem(name, path_id))
}
