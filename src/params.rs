//! Path parameters and their per-request pool.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};
use std::{fmt, mem, slice};

/// The ordered list of parameters bound by a route match.
///
/// Order is bind order. The same segment may appear under several keys when
/// aliases accept it. Lookups are a linear scan: routes carry a handful of
/// parameters at most.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { pairs: Vec::with_capacity(capacity) }
    }

    /// Returns the value of the first parameter bound under `key`.
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        let key = key.as_ref();
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> ParamsIter<'_> {
        ParamsIter { inner: self.pairs.iter() }
    }

    pub(crate) fn push(&mut self, key: &str, value: &str) {
        self.pairs.push((key.to_owned(), value.to_owned()));
    }

    pub(crate) fn clear(&mut self) {
        self.pairs.clear();
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// An iterator over `(key, value)` pairs in bind order.
pub struct ParamsIter<'a> {
    inner: slice::Iter<'a, (String, String)>,
}

impl<'a> Iterator for ParamsIter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a str, &'a str);
    type IntoIter = ParamsIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ── Pool ──────────────────────────────────────────────────────────────────────

/// Upper bound on idle lists kept around between requests.
const MAX_IDLE: usize = 1024;

/// A free list of [`Params`] shared by every request of one dispatcher.
#[derive(Clone)]
pub(crate) struct ParamsPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    idle: Mutex<Vec<Params>>,
    capacity: usize,
}

impl ParamsPool {
    pub(crate) fn new(capacity: usize) -> Self {
        Self { inner: Arc::new(PoolInner { idle: Mutex::new(Vec::new()), capacity }) }
    }

    /// Takes a cleared list from the pool, or allocates one with the base
    /// capacity.
    pub(crate) fn acquire(&self) -> Pooled {
        let recycled = match self.inner.idle.lock() {
            Ok(mut idle) => idle.pop(),
            Err(poisoned) => poisoned.into_inner().pop(),
        };
        let mut params = recycled.unwrap_or_else(|| Params::with_capacity(self.inner.capacity));
        params.clear();
        Pooled { params, pool: Arc::clone(&self.inner) }
    }

    #[cfg(test)]
    pub(crate) fn idle(&self) -> usize {
        self.inner.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }
}

/// A [`Params`] borrowed from the pool. Goes back on drop, including while
/// unwinding.
pub(crate) struct Pooled {
    params: Params,
    pool: Arc<PoolInner>,
}

impl Deref for Pooled {
    type Target = Params;

    fn deref(&self) -> &Params {
        &self.params
    }
}

impl DerefMut for Pooled {
    fn deref_mut(&mut self) -> &mut Params {
        &mut self.params
    }
}

impl fmt::Debug for Pooled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.params.fmt(f)
    }
}

impl Drop for Pooled {
    fn drop(&mut self) {
        let params = mem::take(&mut self.params);
        // A poisoned lock only means another request panicked mid-push;
        // the free list itself is still a valid Vec.
        let mut idle = match self.pool.idle.lock() {
            Ok(idle) => idle,
            Err(poisoned) => poisoned.into_inner(),
        };
        if idle.len() < MAX_IDLE {
            idle.push(params);
        }
    }
}
