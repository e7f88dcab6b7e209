//! Inbound request parameters.
//!
//! EC2 Query API requests carry everything as flat `name=value` pairs. Lists
//! use the indexed convention `VolumeId.1`, `VolumeId.2`, ... and are read
//! back through [`Params::get_list`].

use crate::errors::{GatewayError, Result};
use http::Method;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Sorted view over the inbound parameters of one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    /// Parses an `application/x-www-form-urlencoded` payload (a request body
    /// or a raw query string). A name may appear only once.
    pub fn from_urlencoded(input: &[u8]) -> Result<Self> {
        let mut params = BTreeMap::new();
        for (name, value) in url::form_urlencoded::parse(input).into_owned() {
            match params.entry(name) {
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
                Entry::Occupied(entry) => {
                    return Err(GatewayError::InvalidParameterValue(format!(
                        "The parameter {} was given more than once",
                        entry.key()
                    )));
                }
            }
        }
        Ok(Params(params))
    }

    /// Adds every parameter of `other`, overwriting existing names.
    pub fn extend(&mut self, other: Params) {
        self.0.extend(other.0);
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Result<&str> {
        self.get_optional(name)
            .ok_or_else(|| GatewayError::MissingParameter(name.to_string()))
    }

    pub fn get_optional(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Values of `prefix.1`, `prefix.2`, ... in index order, stopping at the
    /// first missing index.
    pub fn get_list(&self, prefix: &str) -> Vec<&str> {
        (1..)
            .map_while(|index| self.get_optional(&format!("{prefix}.{index}")))
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn contains_list(&self, prefix: &str) -> bool {
        self.contains(&format!("{prefix}.1"))
    }

    /// Fails with the first name in `names` that is absent.
    pub fn require_parameters(&self, names: &[&str]) -> Result<()> {
        match names.iter().find(|name| !self.contains(name)) {
            Some(missing) => Err(GatewayError::MissingParameter(missing.to_string())),
            None => Ok(()),
        }
    }

    pub fn require_at_least_one(&self, names: &[&str]) -> Result<()> {
        if names.iter().any(|name| self.contains(name)) {
            Ok(())
        } else {
            Err(GatewayError::MissingParameter(names.join(" or ")))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Params(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Everything the gateway needs to know about one inbound request. Built once
/// by the HTTP service and never modified afterwards.
#[derive(Clone, Debug)]
pub struct RequestContext {
    method: Method,
    host: String,
    path: String,
    params: Params,
}

impl RequestContext {
    pub fn new(
        method: Method,
        host: impl Into<String>,
        path: impl Into<String>,
        params: Params,
    ) -> Self {
        let path = path.into();
        RequestContext {
            method,
            host: host.into(),
            path: if path.is_empty() { "/".to_string() } else { path },
            params,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}
