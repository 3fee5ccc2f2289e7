//! Unique, traceable names for provisioned resources.
//!
//! Names embed the requesting test so that leftovers can be traced back, and a
//! random suffix so that parallel runs never collide. The result is a valid
//! DNS-1123 label as long as the prefix is one.

/// Longest test-name fragment kept in a blamed name.
pub const MAX_CONTEXT_LEN: usize = 24;

/// Lowercases `test_name`, replaces everything but ASCII alphanumerics with
/// dashes, collapses runs of dashes and truncates to [`MAX_CONTEXT_LEN`].
pub fn sanitize(test_name: &str) -> String {
    let mut out = String::with_capacity(test_name.len());
    for c in test_name.chars() {
        let c = if c.is_ascii_alphanumeric() {
            c.to_ascii_lowercase()
        } else {
            '-'
        };
        if c == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.push(c);
    }
    out.truncate(MAX_CONTEXT_LEN);
    out.trim_end_matches('-').to_string()
}

/// `{prefix}-{sanitized test name}-{short uuid}`.
pub fn blame(test_name: &str, prefix: &str) -> String {
    let short_uuid = &uuid::Uuid::new_v4().to_string()[..8];
    let context = sanitize(test_name);
    if context.is_empty() {
        format!("{}-{}", prefix, short_uuid)
    } else {
        format!("{}-{}-{}", prefix, context, short_uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_produces_dns_label_fragment() {
        assert_eq!(sanitize("test_mtls[Matching authorities]"), "test-mtls-matching-autho");
        assert_eq!(sanitize("Simple"), "simple");
        assert_eq!(sanitize("__"), "");
    }

    #[test]
    fn sanitize_does_not_end_with_dash_after_truncation() {
        let name = sanitize("abcdefghijklmnopqrstuvw_xyz");
        assert_eq!(name, "abcdefghijklmnopqrstuvw");
    }

    #[test]
    fn blame_has_prefix_context_and_suffix() {
        let name = blame("test_apicast_pagination", "svc");
        let parts: Vec<&str> = name.rsplitn(2, '-').collect();

        assert_eq!(parts[0].len(), 8);
        assert_eq!(parts[1], "svc-test-apicast-pagination");
    }

    #[test]
    fn blame_is_unique_per_call() {
        assert_ne!(blame("t", "svc"), blame("t", "svc"));
    }

    #[test]
    fn blame_without_context_keeps_prefix() {
        let name = blame("", "httpbin-mtls");
        assert!(name.starts_with("httpbin-mtls-"));
        assert_eq!(name.len(), "httpbin-mtls-".len() + 8);
    }
}
