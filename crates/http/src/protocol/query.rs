use serde::de::DeserializeOwned;
use std::sync::OnceLock;

/// Raw query string with lazily decoded key/value pairs.
///
/// The parser validates percent-escapes while reading the request line, so
/// decoding here never fails; bytes that do not form UTF-8 are replaced.
#[derive(Debug, Clone, Default)]
pub struct Query {
    raw: String,
    pairs: OnceLock<Vec<(String, String)>>,
}

impl Query {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into(), pairs: OnceLock::new() }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// First value of `key`. Bare keys without `=` have an empty value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs().iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs().iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Deserializes the whole query into `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_urlencoded::de::Error> {
        serde_urlencoded::from_str(&self.raw)
    }

    fn pairs(&self) -> &[(String, String)] {
        self.pairs.get_or_init(|| self.parse().unwrap_or_default())
    }

    pub(crate) fn set_raw(&mut self, raw: &str) {
        self.raw.clear();
        self.raw.push_str(raw);
        self.pairs.take();
    }

    pub fn clear(&mut self) {
        self.raw.clear();
        self.pairs.take();
    }
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Query {}
