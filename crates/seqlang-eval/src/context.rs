//! Immutable variable bindings.

use crate::value::Var;
use rpds::RedBlackTreeMapSync;
use std::collections::BTreeSet;

/// Name → value environment.
///
/// Never mutated: [`extend`](Self::extend) returns a new context sharing
/// structure with the old one, so every lambda element can fork its own
/// bindings without copying the map.
#[derive(Debug, Clone)]
pub struct EvalContext {
    bindings: RedBlackTreeMapSync<String, Var>,
}

impl EvalContext {
    /// An empty context.
    pub fn new() -> Self {
        Self {
            bindings: RedBlackTreeMapSync::new_sync(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Var> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.size()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bound names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// A new context with `bindings` added.
    ///
    /// Fails with every name that is already bound here or appears twice in
    /// `bindings`; `self` is left untouched either way.
    pub fn extend<I>(&self, bindings: I) -> Result<EvalContext, BTreeSet<String>>
    where
        I: IntoIterator<Item = (String, Var)>,
    {
        let mut extended = self.bindings.clone();
        let mut collisions = BTreeSet::new();
        for (name, value) in bindings {
            if extended.contains_key(&name) {
                collisions.insert(name);
            } else {
                extended.insert_mut(name, value);
            }
        }
        if collisions.is_empty() {
            Ok(Self { bindings: extended })
        } else {
            Err(collisions)
        }
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}
