//! Resource identifier helpers.
//!
//! Identifiers are opaque string keys of the form `"{type}.{name}"`, possibly
//! wrapped in `module.<name>.` prefixes by the source inventory and possibly
//! carrying a `~N` suffix marking the Nth synthetically numbered instance.

/// Remove every leading `module.<name>.` segment from an identifier.
pub fn strip_modules(id: &str) -> &str {
    let mut rest = id;
    while let Some(tail) = rest.strip_prefix("module.") {
        match tail.find('.') {
            Some(dot) => rest = &tail[dot + 1..],
            None => break,
        }
    }
    rest
}

/// The resource type portion of an identifier, module prefixes stripped.
///
/// `"module.vpc.aws_subnet.private~2"` yields `"aws_subnet"`.
pub fn resource_type(id: &str) -> &str {
    let stripped = strip_modules(id);
    match stripped.find('.') {
        Some(dot) => &stripped[..dot],
        None => stripped,
    }
}

/// The instance name portion of an identifier, `~N` suffix included.
pub fn resource_name(id: &str) -> Option<&str> {
    let stripped = strip_modules(id);
    stripped.find('.').map(|dot| &stripped[dot + 1..])
}

/// Strip the `~N` numbered-instance suffix, if present.
pub fn base_id(id: &str) -> &str {
    match id.rfind('~') {
        Some(tilde) if id[tilde + 1..].chars().all(|c| c.is_ascii_digit()) => &id[..tilde],
        _ => id,
    }
}

/// The numbered-instance suffix, if present and well formed.
pub fn instance_suffix(id: &str) -> Option<u32> {
    let tilde = id.rfind('~')?;
    id[tilde + 1..].parse().ok()
}

/// Attach a numbered-instance suffix to a base identifier.
pub fn numbered(id: &str, n: u32) -> String {
    format!("{}~{}", base_id(id), n)
}

/// Whether the identifier's type (module-stripped, suffix-stripped) starts
/// with the given type prefix.
pub fn matches_prefix(id: &str, prefix: &str) -> bool {
    resource_type(base_id(id)).starts_with(prefix)
}

/// Whether the identifier's type matches any of the given type prefixes.
pub fn matches_any_prefix(id: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|p| matches_prefix(id, p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_modules() {
        assert_eq!(strip_modules("aws_subnet.private"), "aws_subnet.private");
        assert_eq!(
            strip_modules("module.vpc.aws_subnet.private"),
            "aws_subnet.private"
        );
        assert_eq!(
            strip_modules("module.app.module.vpc.aws_subnet.private"),
            "aws_subnet.private"
        );
    }

    #[test]
    fn test_type_and_name() {
        assert_eq!(resource_type("aws_subnet.private~2"), "aws_subnet");
        assert_eq!(resource_type("module.vpc.aws_subnet.private"), "aws_subnet");
        assert_eq!(resource_name("aws_subnet.private~2"), Some("private~2"));
        assert_eq!(resource_name("aws_subnet"), None);
    }

    #[test]
    fn test_numbered_suffix() {
        assert_eq!(base_id("aws_subnet.private~2"), "aws_subnet.private");
        assert_eq!(base_id("aws_subnet.private"), "aws_subnet.private");
        assert_eq!(instance_suffix("aws_subnet.private~2"), Some(2));
        assert_eq!(instance_suffix("aws_subnet.private"), None);
        assert_eq!(numbered("aws_subnet.private", 3), "aws_subnet.private~3");
        assert_eq!(numbered("aws_subnet.private~1", 3), "aws_subnet.private~3");
    }

    #[test]
    fn test_prefix_match() {
        assert!(matches_prefix("aws_lb_listener.front", "aws_lb"));
        assert!(matches_prefix("module.lb.aws_lb.front~1", "aws_lb"));
        assert!(!matches_prefix("aws_subnet.private", "aws_lb"));
    }
}
