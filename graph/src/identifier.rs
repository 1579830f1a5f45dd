use std::fmt;
use std::hash::{Hash, Hasher};

use smartstring::alias::String as SmartString;

/// Key used to look resources up across the registry, providers and
/// resolvers. Hashing is precomputed so identifier-heavy maps stay cheap
/// even with long names.
#[derive(Debug, Clone)]
pub struct ResourceIdentifier {
    name: SmartString,
    hash: u64,
}

impl ResourceIdentifier {
    pub fn new(name: &str) -> Self {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        name.hash(&mut hasher);
        Self {
            name: SmartString::from(name),
            hash: hasher.finish(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hash_value(&self) -> u64 {
        self.hash
    }
}

impl From<&str> for ResourceIdentifier {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq for ResourceIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.name == other.name
    }
}
impl Eq for ResourceIdentifier {}

impl Hash for ResourceIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
