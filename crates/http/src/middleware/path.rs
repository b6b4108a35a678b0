//! Request path normalization
//!
//! The file server behind the gate percent-decodes the path and ignores empty
//! and `.` segments, so access has to be judged on that same form.

/// Decoded path with empty and `.` segments dropped and `..` resolved
///
/// Returns `None` for paths that are not valid UTF-8 once decoded, that climb
/// above the root, or that carry a NUL or backslash. A trailing slash is kept.
pub fn canonical_path(raw: &str) -> Option<String> {
    let decoded = urlencoding::decode(raw).ok()?;
    if decoded.contains(['\0', '\\']) {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            segment => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return Some("/".to_string());
    }

    let mut path = String::with_capacity(decoded.len());
    for segment in &segments {
        path.push('/');
        path.push_str(segment);
    }
    if decoded.ends_with('/') || decoded.ends_with("/.") || decoded.ends_with("/..") {
        path.push('/');
    }
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_paths_are_unchanged() {
        assert_eq!(canonical_path("/").as_deref(), Some("/"));
        assert_eq!(canonical_path("/dashboard/admin").as_deref(), Some("/dashboard/admin"));
        assert_eq!(canonical_path("/dashboard/admin/").as_deref(), Some("/dashboard/admin/"));
    }

    #[test]
    fn test_encoded_segments_are_decoded() {
        assert_eq!(canonical_path("/dashboard/%61dmin/").as_deref(), Some("/dashboard/admin/"));
        assert_eq!(canonical_path("/dashboard%2Fadmin").as_deref(), Some("/dashboard/admin"));
        assert_eq!(canonical_path("/profile/a%20b").as_deref(), Some("/profile/a b"));
    }

    #[test]
    fn test_empty_and_dot_segments_collapse() {
        assert_eq!(canonical_path("/dashboard//admin/").as_deref(), Some("/dashboard/admin/"));
        assert_eq!(canonical_path("//dashboard/./admin").as_deref(), Some("/dashboard/admin"));
        assert_eq!(
            canonical_path("/about/../dashboard/admin").as_deref(),
            Some("/dashboard/admin")
        );
        assert_eq!(canonical_path("/dashboard/admin/..").as_deref(), Some("/dashboard/"));
        assert_eq!(canonical_path("//").as_deref(), Some("/"));
    }

    #[test]
    fn test_unusable_paths_are_rejected() {
        assert_eq!(canonical_path("/../etc/passwd"), None);
        assert_eq!(canonical_path("/dashboard/%2e%2e/%2e%2e/x"), None);
        assert_eq!(canonical_path("/dashboard/%ff"), None);
        assert_eq!(canonical_path("/dashboard/a%00"), None);
        assert_eq!(canonical_path("/dashboard\\admin"), None);
    }
}
