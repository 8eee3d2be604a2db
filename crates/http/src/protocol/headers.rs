use crate::utils::eq_ignore_case;

/// Ordered header list with case-insensitive lookup.
///
/// Duplicated keys are kept in insertion order; nothing is merged or folded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity) }
    }

    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Replaces every value of `key` with the single `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.remove(&key);
        self.entries.push((key, value.into()));
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.retain(|(k, _)| !eq_ignore_case(k, key));
    }

    /// First value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values(key).next()
    }

    pub fn values<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a str> {
        self.entries.iter().filter(move |(k, _)| eq_ignore_case(k, key)).map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| eq_ignore_case(k, key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self { entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case() {
        let mut headers = Headers::new();
        headers.add("Accept", "one,two");
        headers.add("Host", "localhost");
        headers.add("accept", "three");

        assert_eq!(headers.get("ACCEPT"), Some("one,two"));
        assert_eq!(headers.values("accept").collect::<Vec<_>>(), vec!["one,two", "three"]);
        assert!(headers.contains("host"));
        assert!(!headers.contains("content-type"));
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn test_value_outlives_lookup_key() {
        let headers: Headers = [("Content-Type", "text/plain")].into_iter().collect();
        let value = {
            let key = String::from("content-type");
            headers.get(&key)
        };
        assert_eq!(value, Some("text/plain"));

        let values: Vec<&str> = headers.values(&String::from("CONTENT-TYPE")).collect();
        assert_eq!(values, vec!["text/plain"]);
    }

    #[test]
    fn test_set_and_remove() {
        let mut headers: Headers = [("Accept", "one"), ("accept", "two"), ("Host", "a")].into_iter().collect();
        headers.set("ACCEPT", "three");
        assert_eq!(headers.values("accept").collect::<Vec<_>>(), vec!["three"]);
        assert_eq!(headers.iter().next(), Some(("Host", "a")));

        headers.remove("host");
        assert_eq!(headers.len(), 1);
        headers.clear();
        assert!(headers.is_empty());
    }
}
