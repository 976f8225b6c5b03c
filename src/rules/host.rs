//! Host name matching for rules

/// How closely a rule's host pattern matches a host
///
/// Ordered from weakest to strongest: a rule without a host, the `*`
/// pattern, a `*.suffix` pattern (longer suffixes are stronger), then an
/// exact match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Specificity {
    Neutral,
    Any,
    Wildcard(usize),
    Exact,
}

/// Canonical host form: trimmed, lower-case, without the trailing root dot
pub fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Match `host` against `pattern`; both must already be normalized
///
/// `*.example.com` matches exactly one extra label, so it covers
/// `www.example.com` but neither `example.com` nor `a.b.example.com`.
pub fn specificity(pattern: &str, host: &str) -> Option<Specificity> {
    if pattern.is_empty() {
        return Some(Specificity::Neutral);
    }
    if pattern == host {
        return Some(Specificity::Exact);
    }
    if pattern == "*" {
        return Some(Specificity::Any);
    }

    let suffix = pattern.strip_prefix("*.")?;
    let label = host.strip_suffix(suffix)?.strip_suffix('.')?;
    if label.is_empty() || label.contains('.') || suffix.contains('*') {
        return None;
    }
    Some(Specificity::Wildcard(suffix.split('.').count()))
}
