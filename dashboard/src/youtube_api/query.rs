//! Query-string parameters for YouTube API requests.

use std::fmt;

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Text(String),
    Integer(i64),
    Bool(bool),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Text(s) => f.write_str(s),
            QueryValue::Integer(n) => write!(f, "{n}"),
            QueryValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(s: &str) -> Self {
        QueryValue::Text(s.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(s: String) -> Self {
        QueryValue::Text(s)
    }
}

impl From<&String> for QueryValue {
    fn from(s: &String) -> Self {
        QueryValue::Text(s.clone())
    }
}

impl From<bool> for QueryValue {
    fn from(b: bool) -> Self {
        QueryValue::Bool(b)
    }
}

impl From<i64> for QueryValue {
    fn from(n: i64) -> Self {
        QueryValue::Integer(n)
    }
}

impl From<u32> for QueryValue {
    fn from(n: u32) -> Self {
        QueryValue::Integer(n.into())
    }
}

/// An ordered set of query parameters.
///
/// Parameters given as `None` are left out entirely; `false` and `0` are real values and are
/// sent. Setting a key twice keeps the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: Vec<(&'static str, QueryValue)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(self, key: &'static str, value: impl Into<QueryValue>) -> Self {
        self.maybe(key, Some(value))
    }

    pub fn maybe<V: Into<QueryValue>>(mut self, key: &'static str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.params.retain(|(k, _)| *k != key);
            self.params.push((key, value.into()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    #[cfg(test)]
    fn get(&self, key: &str) -> Option<&QueryValue> {
        self.params.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// `application/x-www-form-urlencoded` serialization, without a leading `?`.
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.params {
            serializer.append_pair(key, &value.to_string());
        }
        serializer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn none_is_omitted_but_falsy_values_are_kept() {
        let query = Query::new()
            .param("part", "snippet,replies")
            .maybe("pageToken", None::<String>)
            .param("mine", false)
            .param("maxResults", 0u32);
        assert_eq!(query.encode(), "part=snippet%2Creplies&mine=false&maxResults=0");
    }

    #[test]
    fn later_value_wins() {
        let query = Query::new().param("id", "a").param("id", "b");
        assert_eq!(query.encode(), "id=b");
        assert_eq!(query.get("id"), Some(&QueryValue::Text("b".to_string())));
    }

    #[test]
    fn empty() {
        let query = Query::new().maybe("pageToken", None::<&str>);
        assert!(query.is_empty());
        assert_eq!(query.encode(), "");
    }

    #[test]
    fn values_are_escaped() {
        let query = Query::new().param("pageToken", "a b&c=d");
        assert_eq!(query.encode(), "pageToken=a+b%26c%3Dd");
    }
}
