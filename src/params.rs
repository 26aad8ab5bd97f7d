//! Route parameters and query strings.
//!
//! - [`RouteParams`]: values captured by dynamic segments (`:id` in
//!   `/users/:id`). Fed into [`compile_path`](crate::path::compile_path) to
//!   produce the resolved path of each matched segment.
//! - [`QueryParams`]: the `?key=value&...` part of a location, multi-valued.
//!   [`QueryParams::diff`] yields the keys whose values changed between two
//!   navigations, which drives watch-query refresh decisions.
//!
//! # Example
//!
//! ```
//! use shell_navigator::{QueryParams, RouteParams};
//!
//! let mut params = RouteParams::new();
//! params.insert("id", "42");
//! assert_eq!(params.get_as::<u32>("id"), Some(42));
//!
//! let before = QueryParams::from_query_string("page=1&sort=name");
//! let after = QueryParams::from_query_string("page=1&sort=date");
//! assert!(after.diff(&before).contains("sort"));
//! ```

use std::collections::{BTreeSet, HashMap};

/// Path parameters captured by the router for the current location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    params: HashMap<String, String>,
}

impl RouteParams {
    /// Create empty route parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from an existing `HashMap`.
    pub fn from_map(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    /// Get a parameter value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Get a parameter parsed as `T`. `None` if missing or unparsable.
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.get(key)?.parse().ok()
    }

    /// Insert or overwrite a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Return `true` if the parameter is present.
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Iterate over all `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.params.iter()
    }

    /// Return `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Return the number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RouteParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Query parameters parsed from a location's query string.
///
/// Keys may repeat (`?tag=a&tag=b`); values keep their order of appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: HashMap<String, Vec<String>>,
}

impl QueryParams {
    /// Create empty query parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string, with or without the leading `?`.
    ///
    /// A key without `=` is kept with an empty value.
    pub fn from_query_string(query: &str) -> Self {
        let mut parsed = Self::new();
        let query = query.strip_prefix('?').unwrap_or(query);

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            parsed.append(decode_uri_component(key), decode_uri_component(value));
        }

        parsed
    }

    /// Get the first value for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key)?.first().map(String::as_str)
    }

    /// Get all values for a key.
    pub fn get_all(&self, key: &str) -> Option<&[String]> {
        self.params.get(key).map(Vec::as_slice)
    }

    /// Get the first value for a key, parsed as `T`.
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.get(key)?.parse().ok()
    }

    /// Append a value for `key`; existing values are kept.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.entry(key.into()).or_default().push(value.into());
    }

    /// Builder form of [`append`](Self::append).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(key, value);
        self
    }

    /// Return `true` if the key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Iterate over every key.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.params.keys()
    }

    /// Keys whose values differ between `self` (the next location) and
    /// `previous`. A key present on only one side counts as changed.
    pub fn diff(&self, previous: &QueryParams) -> BTreeSet<String> {
        self.keys()
            .chain(previous.keys())
            .filter(|key| self.params.get(*key) != previous.params.get(*key))
            .cloned()
            .collect()
    }

    /// Serialize back into a query string with keys in sorted order.
    pub fn to_query_string(&self) -> String {
        let mut keys: Vec<&String> = self.params.keys().collect();
        keys.sort();

        keys.into_iter()
            .flat_map(|key| {
                self.params[key].iter().map(move |value| {
                    format!(
                        "{}={}",
                        encode_uri_component(key),
                        encode_uri_component(value)
                    )
                })
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Return `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Return the number of distinct keys.
    pub fn len(&self) -> usize {
        self.params.len()
    }
}

/// Percent-encode everything outside the unreserved set, byte by byte.
pub(crate) fn encode_uri_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Decode `%XX` escapes and `+` as space. Malformed escapes are kept verbatim.
pub(crate) fn decode_uri_component(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                match hex_byte(bytes[i + 1], bytes[i + 2]) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_byte(high: u8, low: u8) -> Option<u8> {
    fn digit(b: u8) -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(b - b'a' + 10),
            b'A'..=b'F' => Some(b - b'A' + 10),
            _ => None,
        }
    }
    Some((digit(high)? << 4) | digit(low)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_params_basic() {
        let params = RouteParams::new().with("id", "123").with("active", "true");

        assert_eq!(params.get("id"), Some("123"));
        assert_eq!(params.get_as::<i32>("id"), Some(123));
        assert_eq!(params.get_as::<bool>("active"), Some(true));
        assert!(!params.contains("missing"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_route_params_from_iter() {
        let params: RouteParams = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(params.get("b"), Some("2"));
        assert_eq!(params.iter().count(), 2);
    }

    #[test]
    fn test_query_params_basic() {
        let query = QueryParams::from_query_string("?page=1&sort=name&flag");

        assert_eq!(query.get("page"), Some("1"));
        assert_eq!(query.get_as::<u32>("page"), Some(1));
        assert_eq!(query.get("flag"), Some(""));
        assert_eq!(query.get("missing"), None);
    }

    #[test]
    fn test_query_params_multiple_values() {
        let query = QueryParams::from_query_string("tag=rust&tag=ui");
        assert_eq!(query.get_all("tag").map(<[String]>::len), Some(2));
        assert_eq!(query.get("tag"), Some("rust"));
    }

    #[test]
    fn test_query_diff_changed_added_removed() {
        let previous = QueryParams::from_query_string("page=1&sort=name&filter=x");
        let next = QueryParams::from_query_string("page=1&sort=date&lang=en");

        let diff = next.diff(&previous);
        assert!(diff.contains("sort"));
        assert!(diff.contains("filter"));
        assert!(diff.contains("lang"));
        assert!(!diff.contains("page"));
        assert_eq!(diff.len(), 3);
    }

    #[test]
    fn test_query_diff_identical_is_empty() {
        let a = QueryParams::from_query_string("a=1&b=2");
        let b = QueryParams::from_query_string("b=2&a=1");
        assert!(a.diff(&b).is_empty());
    }

    #[test]
    fn test_uri_codec() {
        assert_eq!(encode_uri_component("hello world"), "hello%20world");
        assert_eq!(encode_uri_component("a@b"), "a%40b");
        assert_eq!(decode_uri_component("hello%20world"), "hello world");
        assert_eq!(decode_uri_component("hello+world"), "hello world");
        assert_eq!(decode_uri_component("100%"), "100%");
        assert_eq!(decode_uri_component("caf%C3%A9"), "café");
        assert_eq!(decode_uri_component("%+F"), "% F");
        assert_eq!(decode_uri_component("%-1x"), "%-1x");
        assert_eq!(decode_uri_component("%2f%2F"), "//");
    }

    #[test]
    fn test_to_query_string_sorted() {
        let query = QueryParams::new().with("sort", "name").with("page", "1");
        assert_eq!(query.to_query_string(), "page=1&sort=name");
    }
}
