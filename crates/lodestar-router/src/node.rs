//! Radix tree nodes.
//!
//! Each node stands for one path segment. Static children are kept sorted so
//! lookups can binary search; a node has at most one parameter child and at
//! most one wildcard child. Capture names are not stored in the tree: a match
//! yields the captured values in path order and the route table pairs them
//! with the names from the winning route's pattern.

use http::Method;
use smallvec::SmallVec;

use crate::definition::RouteId;
use crate::method_router::MethodRouter;
use crate::pattern::{split_path, Segment};

/// Values captured while walking the tree, in path order.
pub(crate) type Captures = SmallVec<[String; 4]>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    Static(String),
    Param,
    Wildcard,
}

/// A node in the radix tree.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    kind: NodeKind,
    methods: Option<MethodRouter>,
    static_children: Vec<Node>,
    param_child: Option<Box<Node>>,
    wildcard_child: Option<Box<Node>>,
}

impl Node {
    fn with_kind(kind: NodeKind) -> Self {
        Self {
            kind,
            methods: None,
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    /// Creates the root node.
    pub(crate) fn root() -> Self {
        Self::with_kind(NodeKind::Static(String::new()))
    }

    fn segment(&self) -> &str {
        match &self.kind {
            NodeKind::Static(text) => text,
            NodeKind::Param | NodeKind::Wildcard => "",
        }
    }

    /// Binds `method` at the path described by `segments`.
    ///
    /// Returns the id already bound there when the slot is taken.
    pub(crate) fn insert(
        &mut self,
        segments: &[Segment],
        method: &Method,
        id: RouteId,
    ) -> Result<(), RouteId> {
        let Some((first, rest)) = segments.split_first() else {
            return self
                .methods
                .get_or_insert_with(MethodRouter::new)
                .insert(method, id);
        };

        let child = match first {
            Segment::Static(text) => {
                let index = match self
                    .static_children
                    .binary_search_by(|c| c.segment().cmp(text))
                {
                    Ok(index) => index,
                    Err(index) => {
                        self.static_children
                            .insert(index, Node::with_kind(NodeKind::Static(text.clone())));
                        index
                    }
                };
                &mut self.static_children[index]
            }
            Segment::Param(_) => self
                .param_child
                .get_or_insert_with(|| Box::new(Node::with_kind(NodeKind::Param)))
                .as_mut(),
            Segment::Wildcard(_) => self
                .wildcard_child
                .get_or_insert_with(|| Box::new(Node::with_kind(NodeKind::Wildcard)))
                .as_mut(),
        };
        child.insert(rest, method, id)
    }

    /// The id bound to `method` at exactly the pattern `segments`, if any.
    ///
    /// Walks the tree structurally; parameter and wildcard names are ignored,
    /// as they are by [`Node::insert`].
    pub(crate) fn bound(&self, segments: &[Segment], method: &Method) -> Option<RouteId> {
        let Some((first, rest)) = segments.split_first() else {
            return self.methods.as_ref()?.get(method);
        };
        let child = match first {
            Segment::Static(text) => self.find_static_child(text)?,
            Segment::Param(_) => self.param_child.as_deref()?,
            Segment::Wildcard(_) => self.wildcard_child.as_deref()?,
        };
        child.bound(rest, method)
    }

    /// Finds the method slots for `path`, collecting captured values.
    pub(crate) fn find(&self, path: &str) -> Option<(&MethodRouter, Captures)> {
        let segments: SmallVec<[&str; 8]> = split_path(path).collect();
        let mut captures = Captures::new();
        let methods = self.find_segments(&segments, &mut captures)?;
        Some((methods, captures))
    }

    fn find_segments<'a>(
        &'a self,
        segments: &[&str],
        captures: &mut Captures,
    ) -> Option<&'a MethodRouter> {
        let Some((first, rest)) = segments.split_first() else {
            return self.methods.as_ref();
        };

        // Static beats parameter beats wildcard; each failed branch is undone.
        if let Some(child) = self.find_static_child(first) {
            if let Some(found) = child.find_segments(rest, captures) {
                return Some(found);
            }
        }

        if let Some(child) = &self.param_child {
            captures.push((*first).to_string());
            if let Some(found) = child.find_segments(rest, captures) {
                return Some(found);
            }
            captures.pop();
        }

        if let Some(child) = &self.wildcard_child {
            if let Some(methods) = &child.methods {
                captures.push(segments.join("/"));
                return Some(methods);
            }
        }

        None
    }

    fn find_static_child(&self, segment: &str) -> Option<&Node> {
        self.static_children
            .binary_search_by(|c| c.segment().cmp(segment))
            .ok()
            .map(|i| &self.static_children[i])
    }
}
