//! Application settings.

use fox_router::RoutingPolicy;
use serde::{Deserialize, Serialize};

/// Default number of contexts kept for reuse.
pub const DEFAULT_POOL_CAPACITY: usize = 1024;

/// How captured path parameters are exposed to handlers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringMode {
    /// Parameters borrow from the request path and live as long as the
    /// request.
    #[default]
    ZeroCopy,
    /// Parameters are also copied into shared strings at match time, so
    /// [`Context::param_shared`](crate::Context::param_shared) is a
    /// reference-count bump.
    Immutable,
}

/// Behavior switches for routing and dispatch.
///
/// Every field has a default, so a settings file only needs to name what it
/// changes.
///
/// # Example
///
/// ```
/// use fox_core::Settings;
///
/// let settings: Settings = serde_json::from_str(r#"{"strict_routing": true}"#).unwrap();
/// assert!(settings.strict_routing);
/// assert!(!settings.case_sensitive);
/// assert!(settings.handle_method_not_allowed);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Compare literal segments exactly instead of ignoring ASCII case.
    pub case_sensitive: bool,
    /// Treat `/a` and `/a/` as different paths.
    pub strict_routing: bool,
    /// Percent-decode the path before matching.
    pub unescape_path: bool,
    /// Parameter exposure mode.
    pub string_mode: StringMode,
    /// Answer `405` with an `Allow` header instead of `404` when the path
    /// matches under another method.
    pub handle_method_not_allowed: bool,
    /// Answer unrouted `OPTIONS` requests with `204` and an `Allow` header.
    pub handle_options: bool,
    /// Turn handler panics into `500` responses.
    pub recover_panics: bool,
    /// Value for the `Server` response header.
    pub server_header: Option<String>,
    /// Number of idle contexts kept for reuse.
    pub pool_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            strict_routing: false,
            unescape_path: false,
            string_mode: StringMode::ZeroCopy,
            handle_method_not_allowed: true,
            handle_options: true,
            recover_panics: false,
            server_header: None,
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

impl Settings {
    /// The routing policy these settings imply.
    #[must_use]
    pub fn routing_policy(&self) -> RoutingPolicy {
        RoutingPolicy::new(self.case_sensitive, self.strict_routing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(!settings.case_sensitive);
        assert!(!settings.strict_routing);
        assert!(!settings.unescape_path);
        assert_eq!(settings.string_mode, StringMode::ZeroCopy);
        assert!(settings.handle_method_not_allowed);
        assert!(settings.handle_options);
        assert!(!settings.recover_panics);
        assert_eq!(settings.server_header, None);
        assert_eq!(settings.pool_capacity, DEFAULT_POOL_CAPACITY);
    }

    #[test]
    fn test_routing_policy() {
        let settings = Settings {
            case_sensitive: true,
            strict_routing: true,
            ..Settings::default()
        };
        assert_eq!(settings.routing_policy(), RoutingPolicy::new(true, true));
    }

    #[test]
    fn test_string_mode_serde() {
        let mode: StringMode = serde_json::from_str("\"immutable\"").unwrap();
        assert_eq!(mode, StringMode::Immutable);
        assert_eq!(
            serde_json::to_string(&StringMode::ZeroCopy).unwrap(),
            "\"zero_copy\""
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<Settings, _> = serde_json::from_str(r#"{"prefork": true}"#);
        assert!(result.is_err());
    }
}
