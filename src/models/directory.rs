//! The community directory.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Community id to the URL of its API document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Directory(BTreeMap<String, String>);

impl Directory {
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn url(&self, id: &str) -> Option<&str> {
        self.0.get(id).map(String::as_str)
    }

    /// Entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(id, url)| (id.as_str(), url.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Directory {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(id, url)| (id.into(), url.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_mapping() {
        let dir: Directory = serde_json::from_str(
            r#"{"beta": "http://b.example/api.json", "alpha": "http://a.example/api.json"}"#,
        )
        .unwrap();

        assert_eq!(dir.len(), 2);
        assert!(dir.contains("alpha"));
        assert_eq!(dir.url("beta"), Some("http://b.example/api.json"));
        let ids: Vec<_> = dir.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, ["alpha", "beta"]);
    }

    #[test]
    fn rejects_non_string_urls() {
        assert!(serde_json::from_str::<Directory>(r#"{"alpha": 1}"#).is_err());
        assert!(serde_json::from_str::<Directory>(r#"["alpha"]"#).is_err());
    }
}
