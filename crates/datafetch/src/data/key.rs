use std::collections::BTreeMap;

use serde_json::Value;

/// Typed inputs that distinguish otherwise identical URLs in the cache.
///
/// Parameters are kept sorted by name, so insertion order never changes the
/// resulting key.
///
/// # Examples
///
/// ```
/// use datafetch::KeyParams;
///
/// let params = KeyParams::new().param("season", 2023).param("format", "csv");
/// assert_eq!(
///     params.canonical_key("https://example.com/pbp"),
///     "https://example.com/pbp?format=\"csv\"&season=2023",
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyParams(BTreeMap<String, Value>);

impl KeyParams {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `url` alone when empty, otherwise `url?name=<json>&...`.
    pub fn canonical_key(&self, url: &str) -> String {
        if self.0.is_empty() {
            return url.to_string();
        }
        let query: Vec<String> = self
            .0
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        format!("{url}?{}", query.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_values_are_json_encoded() {
        let params = KeyParams::new()
            .param("flag", true)
            .param("name", "a&b")
            .param("weeks", json!([1, 2]));
        assert_eq!(
            params.canonical_key("u"),
            "u?flag=true&name=\"a&b\"&weeks=[1,2]"
        );
    }

    #[test]
    fn test_later_value_replaces_earlier() {
        let params = KeyParams::new().param("season", 2022).param("season", 2023);
        assert_eq!(params.canonical_key("u"), "u?season=2023");
    }

    #[test]
    fn test_empty_params_yield_bare_url() {
        assert!(KeyParams::new().is_empty());
        assert_eq!(KeyParams::new().canonical_key("u"), "u");
    }
}
