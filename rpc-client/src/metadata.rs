//! # Metadata
//!
//! Destination metadata given on the command line as `k1:v1,k2:v2`.

use snafu::prelude::Snafu;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Errors raised while parsing a metadata string
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum MetadataError {
    /// A non empty token did not split into exactly one key and one value
    #[snafu(display("invalid kv pair str {pair}"))]
    InvalidPair {
        /// the offending token
        pair: String,
    },
}

/// Key/value labels used to narrow the set of candidate instances
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata(BTreeMap<String, String>);

impl Metadata {
    /// Number of labels
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no label is set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value of a single label
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Labels in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Consumes the wrapper
    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl FromIterator<(String, String)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Metadata(iter.into_iter().collect())
    }
}

impl FromStr for Metadata {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_metadata(s)
    }
}

/// Parses `k1:v1,k2:v2,...` into [`Metadata`].
///
/// Empty tokens are skipped. Any other token must contain exactly one `:`.
pub fn parse_metadata(metadata_str: &str) -> Result<Metadata, MetadataError> {
    let mut metadata = BTreeMap::new();
    for pair in metadata_str.split(',') {
        if pair.is_empty() {
            continue;
        }

        let kv: Vec<&str> = pair.split(':').collect();
        let [key, value] = kv[..] else {
            return InvalidPairSnafu { pair }.fail();
        };
        metadata.insert(key.to_owned(), value.to_owned());
    }

    Ok(Metadata(metadata))
}
