//! Radix tree matcher on the request hot path.

use http::Method;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

use super::table::RouteKey;

/// Most routes carry well under eight parameters; beyond that SmallVec spills to the heap.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Extracted `(name, value)` pairs. Names are shared with the tree.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Outcome of matching a request against the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteLookup {
    Found { key: RouteKey, params: ParamVec },
    /// The path exists but not for this method.
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

#[derive(Clone, Default)]
struct RadixNode {
    segment: String,
    endpoints: HashMap<Method, RouteKey>,
    param_name: Option<Arc<str>>,
    children: Vec<RadixNode>,
    param_children: Vec<RadixNode>,
}

impl RadixNode {
    fn new(segment: &str) -> Self {
        Self {
            segment: segment.to_string(),
            ..Self::default()
        }
    }

    fn new_param(name: &str) -> Self {
        Self {
            param_name: Some(Arc::from(name)),
            ..Self::default()
        }
    }

    fn insert(&mut self, segments: &[&str], key: RouteKey) {
        let Some((segment, remaining)) = segments.split_first() else {
            self.endpoints.insert(key.method.clone(), key);
            return;
        };

        if let Some(name) = segment.strip_prefix(':') {
            if let Some(child) = self
                .param_children
                .iter_mut()
                .find(|c| c.param_name.as_deref() == Some(name))
            {
                child.insert(remaining, key);
                return;
            }
            let mut child = RadixNode::new_param(name);
            child.insert(remaining, key);
            self.param_children.push(child);
            return;
        }

        if let Some(child) = self.children.iter_mut().find(|c| c.segment == *segment) {
            child.insert(remaining, key);
            return;
        }
        let mut child = RadixNode::new(segment);
        child.insert(remaining, key);
        self.children.push(child);
    }

    /// Returns false when the subtree became empty and can be pruned.
    fn remove(&mut self, segments: &[&str], method: &Method) -> bool {
        match segments.split_first() {
            None => {
                self.endpoints.remove(method);
            }
            Some((segment, remaining)) => {
                if let Some(name) = segment.strip_prefix(':') {
                    self.param_children.retain_mut(|c| {
                        c.param_name.as_deref() != Some(name) || c.remove(remaining, method)
                    });
                } else {
                    self.children
                        .retain_mut(|c| c.segment != *segment || c.remove(remaining, method));
                }
            }
        }
        !(self.endpoints.is_empty() && self.children.is_empty() && self.param_children.is_empty())
    }

    /// Find the node for `segments`, preferring static children and backtracking
    /// into parameter children. `accept` decides whether a terminal node counts.
    fn search<'a, F>(&'a self, segments: &[&str], params: &mut ParamVec, accept: &F) -> Option<&'a RadixNode>
    where
        F: Fn(&RadixNode) -> bool,
    {
        let Some((segment, remaining)) = segments.split_first() else {
            return accept(self).then_some(self);
        };

        for child in &self.children {
            if child.segment == *segment {
                if let Some(found) = child.search(remaining, params, accept) {
                    return Some(found);
                }
            }
        }

        for child in &self.param_children {
            let Some(name) = &child.param_name else { continue };
            params.push((Arc::clone(name), (*segment).to_string()));
            if let Some(found) = child.search(remaining, params, accept) {
                return Some(found);
            }
            params.pop();
        }

        None
    }
}

/// Method-aware radix tree keyed by normalized `:param` paths.
#[derive(Clone, Default)]
pub struct Router {
    root: RadixNode,
    len: usize,
}

fn split_segments(path: &str) -> SmallVec<[&str; 16]> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: RouteKey) {
        let path = key.path.clone();
        let segments = split_segments(&path);
        if !self.contains(&key) {
            self.len += 1;
        }
        self.root.insert(&segments, key);
    }

    pub fn remove(&mut self, key: &RouteKey) -> bool {
        if !self.contains(key) {
            return false;
        }
        let segments = split_segments(&key.path);
        self.root.remove(&segments, &key.method);
        self.len -= 1;
        true
    }

    /// Exact pattern lookup, no parameter matching.
    pub fn contains(&self, key: &RouteKey) -> bool {
        let mut node = &self.root;
        for segment in split_segments(&key.path) {
            let next = match segment.strip_prefix(':') {
                Some(name) => node
                    .param_children
                    .iter()
                    .find(|c| c.param_name.as_deref() == Some(name)),
                None => node.children.iter().find(|c| c.segment == segment),
            };
            match next {
                Some(n) => node = n,
                None => return false,
            }
        }
        node.endpoints.contains_key(&key.method)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Match a request path (no query string) for `method`.
    pub fn route(&self, method: &Method, path: &str) -> RouteLookup {
        let segments = split_segments(path);
        let mut params = ParamVec::new();

        if let Some(node) = self
            .root
            .search(&segments, &mut params, &|n| n.endpoints.contains_key(method))
        {
            if let Some(key) = node.endpoints.get(method) {
                return RouteLookup::Found {
                    key: key.clone(),
                    params,
                };
            }
        }

        let mut scratch = ParamVec::new();
        match self
            .root
            .search(&segments, &mut scratch, &|n| !n.endpoints.is_empty())
        {
            Some(node) => {
                let mut allowed: Vec<Method> = node.endpoints.keys().cloned().collect();
                allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
                RouteLookup::MethodNotAllowed { allowed }
            }
            None => RouteLookup::NotFound,
        }
    }
}
