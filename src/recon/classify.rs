//! Syntactic target classification

use super::models::TargetType;

/// Assign a taxonomy type to a raw line.
///
/// Rules are checked in order and the first match wins. The dot-count rules
/// only apply to strings without `/` or `:`, so anything carrying a scheme
/// falls through to the `url` rule.
pub fn classify_target(raw: &str) -> TargetType {
    let dots = raw.matches('.').count();
    let bare = !raw.contains('/') && !raw.contains(':');

    if bare && dots == 1 {
        TargetType::Domain
    } else if bare && dots > 1 {
        TargetType::Subdomain
    } else if raw.contains("://") {
        TargetType::Url
    } else if raw.contains(':') {
        TargetType::IpPort
    } else {
        TargetType::Unknown
    }
}
