use std::fmt;
use std::ops::Index;
use std::slice;
use std::sync::Arc;

/// A probe target in `host:port` form.
///
/// An endpoint with a blank address is a placeholder: it occupies a slot in the registry but is
/// never dialed.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Endpoint {
    address: Arc<str>,
}

#[derive(Clone, Debug, Default)]
pub struct Registry {
    endpoints: Vec<Endpoint>,
}

impl Endpoint {
    pub fn new<A>(address: A) -> Self
    where
        A: Into<Arc<str>>,
    {
        Self {
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_placeholder(&self) -> bool {
        self.address.trim().is_empty()
    }
}

impl From<&str> for Endpoint {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for Endpoint {
    fn from(address: String) -> Self {
        Self::new(address)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

impl Registry {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            endpoints: Vec::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, endpoint: Endpoint) {
        self.endpoints.push(endpoint);
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.endpoints.capacity()
    }

    pub fn get(&self, index: usize) -> Option<&Endpoint> {
        self.endpoints.get(index)
    }

    pub fn iter(&self) -> slice::Iter<'_, Endpoint> {
        self.endpoints.iter()
    }

    /// Returns the dialable endpoints paired with their registry index.
    pub(crate) fn targets(&self) -> Vec<(usize, Endpoint)> {
        self.iter()
            .enumerate()
            .filter(|(_, endpoint)| !endpoint.is_placeholder())
            .map(|(index, endpoint)| (index, endpoint.clone()))
            .collect()
    }
}

impl FromIterator<Endpoint> for Registry {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Endpoint>,
    {
        Self {
            endpoints: iter.into_iter().collect(),
        }
    }
}

impl Index<usize> for Registry {
    type Output = Endpoint;

    fn index(&self, index: usize) -> &Self::Output {
        &self.endpoints[index]
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a Endpoint;
    type IntoIter = slice::Iter<'a, Endpoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
