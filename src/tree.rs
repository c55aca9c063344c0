//! Segment trie: one per HTTP method.
//!
//! Each node stands for one path segment. Children come in three kinds,
//! tried in a fixed order during a match:
//!
//! 1. static children, by exact segment text
//! 2. the single parameter child, gated by its binding's validator
//! 3. the single catch-all leaf, which swallows the rest of the path
//!
//! There is no backtracking: once a static child accepts a segment the walk
//! commits to it.

use std::collections::HashMap;

use crate::error::RouteError;
use crate::params::Params;
use crate::pattern::Segment;
use crate::validator::{Validator, Validators};

pub(crate) struct Node<T> {
    statics: HashMap<Box<str>, Node<T>>,
    param: Option<Box<ParamChild<T>>>,
    catch_all: Option<CatchAll<T>>,
    handle: Option<T>,
}

struct ParamChild<T> {
    binding: ParamBinding,
    node: Node<T>,
}

struct CatchAll<T> {
    name: Box<str>,
    handle: T,
}

/// One name bound to a parameter position.
#[derive(Clone, Debug)]
enum Binding {
    Any(Box<str>),
    Checked { name: Box<str>, validator: Validator },
}

/// What a parameter position binds: a single name, or a primary name plus
/// aliases registered by later routes that reuse the position.
#[derive(Debug)]
enum ParamBinding {
    Single(Binding),
    Aliased { primary: Binding, aliases: Vec<Binding> },
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self { statics: HashMap::new(), param: None, catch_all: None, handle: None }
    }
}

impl<T: Clone> Node<T> {
    /// Inserts `value` under the compiled `segments` of `pattern`.
    ///
    /// `pattern` is only used to label errors.
    pub(crate) fn insert(
        &mut self,
        pattern: &str,
        segments: &[Segment],
        validators: &Validators,
        value: T,
    ) -> Result<(), RouteError> {
        let conflict = || RouteError::Conflict { pattern: pattern.to_owned() };

        let Some((segment, rest)) = segments.split_first() else {
            if self.handle.is_some() {
                return Err(conflict());
            }
            self.handle = Some(value);
            return Ok(());
        };

        match segment {
            Segment::Static(name) => {
                self.static_child(name).insert(pattern, rest, validators, value)
            }
            Segment::Group(alternatives) => {
                for name in alternatives {
                    self.static_child(name).insert(pattern, rest, validators, value.clone())?;
                }
                Ok(())
            }
            Segment::Param { name, validator } => {
                let binding = Binding::resolve(pattern, name, validator.as_deref(), validators)?;
                let child = self.param.get_or_insert_with(|| {
                    Box::new(ParamChild { binding: ParamBinding::Single(binding.clone()), node: Node::default() })
                });
                child.binding.absorb(binding);
                child.node.insert(pattern, rest, validators, value)
            }
            Segment::CatchAll(name) => {
                if !rest.is_empty() {
                    return Err(RouteError::InvalidCatchAll { pattern: pattern.to_owned() });
                }
                if self.catch_all.is_some() {
                    return Err(conflict());
                }
                self.catch_all = Some(CatchAll { name: name.as_str().into(), handle: value });
                Ok(())
            }
        }
    }

    fn static_child(&mut self, name: &str) -> &mut Node<T> {
        self.statics.entry(name.into()).or_default()
    }
}

impl<T> Node<T> {
    /// Walks the trie for a normalized `path`, appending every binding to
    /// `params`.
    ///
    /// `params` may hold partial bindings when this returns `None`.
    pub(crate) fn at(&self, path: &str, params: &mut Params) -> Option<&T> {
        if !path.starts_with('/') {
            return None;
        }

        if path == "/" {
            if let Some(handle) = self.handle.as_ref() {
                return Some(handle);
            }
            let catch_all = self.catch_all.as_ref()?;
            params.push(&catch_all.name, path);
            return Some(&catch_all.handle);
        }

        let mut node = self;
        let mut start = 1;

        loop {
            let end = path[start..].find('/').map_or(path.len(), |i| start + i);
            let segment = &path[start..end];

            if let Some(child) = node.statics.get(segment) {
                node = child;
            } else {
                match node.param.as_deref() {
                    Some(child) if child.binding.bind(segment, params) => node = &child.node,
                    _ => {
                        let catch_all = node.catch_all.as_ref()?;
                        params.push(&catch_all.name, &path[start - 1..]);
                        return Some(&catch_all.handle);
                    }
                }
            }

            if end == path.len() {
                return node.handle.as_ref();
            }
            start = end + 1;
        }
    }
}

impl Binding {
    fn resolve(
        pattern: &str,
        name: &str,
        validator: Option<&str>,
        validators: &Validators,
    ) -> Result<Self, RouteError> {
        let Some(validator) = validator else {
            return Ok(Self::Any(name.into()));
        };
        let validator = validators.get(validator).cloned().ok_or_else(|| RouteError::UnknownValidator {
            pattern: pattern.to_owned(),
            validator: validator.to_owned(),
        })?;
        Ok(Self::Checked { name: name.into(), validator })
    }

    fn name(&self) -> &str {
        match self {
            Self::Any(name) | Self::Checked { name, .. } => name,
        }
    }

    #[inline]
    fn accepts(&self, segment: &str) -> bool {
        match self {
            Self::Any(_) => true,
            Self::Checked { validator, .. } => validator.accepts(segment),
        }
    }

    /// Same name under the same validator (by registered name).
    fn same_as(&self, other: &Binding) -> bool {
        match (self, other) {
            (Self::Any(a), Self::Any(b)) => a == b,
            (Self::Checked { name: a, validator: va }, Self::Checked { name: b, validator: vb }) => {
                a == b && va.name() == vb.name()
            }
            _ => false,
        }
    }
}

impl ParamBinding {
    /// Records `binding` as an alias unless this position already binds it.
    fn absorb(&mut self, binding: Binding) {
        match self {
            Self::Single(primary) => {
                if primary.same_as(&binding) {
                    return;
                }
                let primary = primary.clone();
                *self = Self::Aliased { primary, aliases: vec![binding] };
            }
            Self::Aliased { primary, aliases } => {
                if primary.same_as(&binding) || aliases.iter().any(|alias| alias.same_as(&binding)) {
                    return;
                }
                aliases.push(binding);
            }
        }
    }

    /// Binds `segment` if the primary binding accepts it. Every alias is then
    /// checked on its own and bound when it accepts too.
    fn bind(&self, segment: &str, params: &mut Params) -> bool {
        match self {
            Self::Single(binding) => {
                if !binding.accepts(segment) {
                    return false;
                }
                params.push(binding.name(), segment);
                true
            }
            Self::Aliased { primary, aliases } => {
                if !primary.accepts(segment) {
                    return false;
                }
                params.push(primary.name(), segment);
                for alias in aliases.iter().filter(|alias| alias.accepts(segment)) {
                    params.push(alias.name(), segment);
                }
                true
            }
        }
    }
}
