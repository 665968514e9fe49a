//! Node model.
//!
//! A [`Dom`] is an arena of nodes linked by parent, sibling and child ids.
//! The sibling links are the only representation of child order, so the
//! list and the tree can never disagree.
//!
//! ## Scope chain
//!
//! Every node owns a [`ScopeVars`] map holding the variables bound *on that
//! node*. A lookup walks from the node up through its current ancestors, so a
//! binding on a parent is visible to every descendant unless shadowed.
//! Because the chain follows the live parent links, detaching a node severs
//! inheritance immediately and attaching it elsewhere rebinds it.

pub mod tag;

pub use tag::{Attributes, ForMode, TagKind, TagNode, DEFAULT_SLOT};

use crate::error::{CompileError, Result};
use crate::value::{ScopeVars, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Document,
    Tag(TagNode),
    Text(String),
    Comment(String),
    CData(String),
    ProcessingInstruction { target: String, data: String },
}

#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    pub scope: ScopeVars,
    /// Whitespace inside this node must be kept verbatim.
    pub whitespace_sensitive: bool,
    /// The compiler walk has finished with this node.
    pub compiled: bool,
    parent: Option<NodeId>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            scope: ScopeVars::new(),
            whitespace_sensitive: false,
            compiled: false,
            parent: None,
            prev: None,
            next: None,
            first_child: None,
            last_child: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    /// An empty tree holding only its Document root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CREATION & ACCESS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Allocate a detached node.
    pub fn create(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node::new(data));
        NodeId(self.nodes.len() - 1)
    }

    pub fn create_tag(&mut self, tag: TagNode) -> NodeId {
        self.create(NodeData::Tag(tag))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.create(NodeData::Text(text.into()))
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn tag(&self, id: NodeId) -> Option<&TagNode> {
        match &self.nodes[id.0].data {
            NodeData::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn tag_mut(&mut self, id: NodeId) -> Option<&mut TagNode> {
        match &mut self.nodes[id.0].data {
            NodeData::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    /// Tag name, if the node is a tag.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.tag(id).map(|t| t.name.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].last_child
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].next
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].prev
    }

    /// Snapshot of the current children.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut child = self.first_child(id);
        while let Some(c) = child {
            out.push(c);
            child = self.next_sibling(c);
        }
        out
    }

    /// The node and all its descendants in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            let mut child = self.last_child(n);
            while let Some(c) = child {
                stack.push(c);
                child = self.prev_sibling(c);
            }
        }
        out
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |n| self.parent(*n))
    }

    /// Is `ancestor` the node itself or one of its ancestors?
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        ancestor == id || self.ancestors(id).any(|a| a == ancestor)
    }

    /// Concatenated text of all descendant text and CDATA nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for n in self.descendants(id) {
            match self.data(n) {
                NodeData::Text(t) | NodeData::CData(t) => out.push_str(t),
                _ => {}
            }
        }
        out
    }

    /// Replace all children of `id` with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: impl Into<String>) -> Result<()> {
        for child in self.children(id) {
            self.detach(child);
        }
        let text = self.create_text(text);
        self.append(id, text)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TREE MUTATION
    // ═══════════════════════════════════════════════════════════════════════════

    fn check_attach(&self, parent: NodeId, child: NodeId) -> Result<()> {
        if matches!(self.data(child), NodeData::Document) {
            return Err(CompileError::invalid_tree(
                "a document node cannot be attached as a child",
            ));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(CompileError::invalid_tree(
                "cannot attach a node beneath itself or its own descendant",
            ));
        }
        Ok(())
    }

    /// Append `child` as the last child of `parent`, detaching it from any
    /// previous position first.
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_attach(parent, child)?;
        self.detach(child);
        let last = self.nodes[parent.0].last_child;
        {
            let node = &mut self.nodes[child.0];
            node.parent = Some(parent);
            node.prev = last;
            node.next = None;
        }
        match last {
            Some(last) => self.nodes[last.0].next = Some(child),
            None => self.nodes[parent.0].first_child = Some(child),
        }
        self.nodes[parent.0].last_child = Some(child);
        Ok(())
    }

    /// Insert `new` immediately before `reference`.
    pub fn insert_before(&mut self, reference: NodeId, new: NodeId) -> Result<()> {
        let parent = self.parent(reference).ok_or_else(|| {
            CompileError::invalid_tree("cannot insert next to a node without a parent")
        })?;
        if new == reference {
            return Ok(());
        }
        self.check_attach(parent, new)?;
        self.detach(new);
        let prev = self.nodes[reference.0].prev;
        {
            let node = &mut self.nodes[new.0];
            node.parent = Some(parent);
            node.prev = prev;
            node.next = Some(reference);
        }
        self.nodes[reference.0].prev = Some(new);
        match prev {
            Some(prev) => self.nodes[prev.0].next = Some(new),
            None => self.nodes[parent.0].first_child = Some(new),
        }
        Ok(())
    }

    /// Insert `new` immediately after `reference`.
    pub fn insert_after(&mut self, reference: NodeId, new: NodeId) -> Result<()> {
        let parent = self.parent(reference).ok_or_else(|| {
            CompileError::invalid_tree("cannot insert next to a node without a parent")
        })?;
        if new == reference {
            return Ok(());
        }
        self.check_attach(parent, new)?;
        self.detach(new);
        let next = self.nodes[reference.0].next;
        {
            let node = &mut self.nodes[new.0];
            node.parent = Some(parent);
            node.prev = Some(reference);
            node.next = next;
        }
        self.nodes[reference.0].next = Some(new);
        match next {
            Some(next) => self.nodes[next.0].prev = Some(new),
            None => self.nodes[parent.0].last_child = Some(new),
        }
        Ok(())
    }

    /// Remove a node from its parent. The subtree stays intact but no longer
    /// inherits any scope. Detaching an unattached node is a no-op.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes[id.0].parent else {
            return;
        };
        let (prev, next) = (self.nodes[id.0].prev, self.nodes[id.0].next);
        match prev {
            Some(prev) => self.nodes[prev.0].next = next,
            None => self.nodes[parent.0].first_child = next,
        }
        match next {
            Some(next) => self.nodes[next.0].prev = prev,
            None => self.nodes[parent.0].last_child = prev,
        }
        let node = &mut self.nodes[id.0];
        node.parent = None;
        node.prev = None;
        node.next = None;
    }

    /// Insert `new_nodes` as successive siblings after `node`, then detach it.
    pub fn replace(&mut self, node: NodeId, new_nodes: &[NodeId]) -> Result<()> {
        let mut anchor = node;
        for &new in new_nodes {
            self.insert_after(anchor, new)?;
            anchor = new;
        }
        self.detach(node);
        Ok(())
    }

    /// Move the children of `node` into its place and detach it.
    pub fn promote_children(&mut self, node: NodeId) -> Result<()> {
        let children = self.children(node);
        self.replace(node, &children)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CLONING
    // ═══════════════════════════════════════════════════════════════════════════

    /// Deep-copy a subtree within this arena. The copy is detached and has a
    /// fresh identity; attribute values are shared by reference.
    /// `on_each_clone(dom, original, copy)` runs for every copied node.
    pub fn clone_subtree(
        &mut self,
        id: NodeId,
        on_each_clone: &mut dyn FnMut(&mut Dom, NodeId, NodeId),
    ) -> NodeId {
        let copy = self.copy_node(id);
        on_each_clone(self, id, copy);
        for child in self.children(id) {
            let child_copy = self.clone_subtree(child, on_each_clone);
            self.link_last(copy, child_copy);
        }
        copy
    }

    /// Deep-copy a subtree of another tree into this arena (detached).
    pub fn import_subtree(&mut self, other: &Dom, id: NodeId) -> NodeId {
        let source = other.node(id);
        let copy = self.nodes.len();
        self.nodes.push(Node {
            data: source.data.clone(),
            scope: source.scope.clone(),
            whitespace_sensitive: source.whitespace_sensitive,
            compiled: source.compiled,
            parent: None,
            prev: None,
            next: None,
            first_child: None,
            last_child: None,
        });
        let copy = NodeId(copy);
        for child in other.children(id) {
            let child_copy = self.import_subtree(other, child);
            self.link_last(copy, child_copy);
        }
        copy
    }

    /// Copy the children of another tree's root into a fresh detached list.
    pub fn import_children(&mut self, other: &Dom, id: NodeId) -> Vec<NodeId> {
        other
            .children(id)
            .into_iter()
            .map(|child| self.import_subtree(other, child))
            .collect()
    }

    /// A new tree whose root holds copies of the given nodes.
    pub fn extract(&self, nodes: &[NodeId]) -> Dom {
        let mut dom = Dom::new();
        let root = dom.root();
        for &node in nodes {
            let copy = dom.import_subtree(self, node);
            dom.link_last(root, copy);
        }
        dom
    }

    fn copy_node(&mut self, id: NodeId) -> NodeId {
        let source = &self.nodes[id.0];
        let node = Node {
            data: source.data.clone(),
            scope: source.scope.clone(),
            whitespace_sensitive: source.whitespace_sensitive,
            compiled: source.compiled,
            parent: None,
            prev: None,
            next: None,
            first_child: None,
            last_child: None,
        };
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Link a freshly copied, detached, non-document node. Skips the
    /// cycle checks of `append`.
    fn link_last(&mut self, parent: NodeId, child: NodeId) {
        let last = self.nodes[parent.0].last_child;
        self.nodes[child.0].parent = Some(parent);
        self.nodes[child.0].prev = last;
        match last {
            Some(last) => self.nodes[last.0].next = Some(child),
            None => self.nodes[parent.0].first_child = Some(child),
        }
        self.nodes[parent.0].last_child = Some(child);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SCOPE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Resolve `key` from the node's own scope up through its ancestors.
    /// An unresolved key is `None`, not an error.
    pub fn lookup(&self, id: NodeId, key: &str) -> Option<&Value> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find_map(|n| self.nodes[n.0].scope.get(key))
    }

    /// Bind a variable on the node itself.
    pub fn bind(&mut self, id: NodeId, key: impl Into<String>, value: Value) {
        self.nodes[id.0].scope.insert(key.into(), value);
    }

    /// Flatten the effective scope of a node, nearest bindings winning.
    pub fn effective_scope(&self, id: NodeId) -> ScopeVars {
        let chain: Vec<NodeId> = std::iter::once(id).chain(self.ancestors(id)).collect();
        let mut out = ScopeVars::new();
        for n in chain.into_iter().rev() {
            for (k, v) in &self.nodes[n.0].scope {
                out.insert(k.clone(), v.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn div(dom: &mut Dom) -> NodeId {
        dom.create_tag(TagNode::element("div"))
    }

    /// Children as seen through forward links must mirror the backward links.
    fn assert_consistent(dom: &Dom, parent: NodeId) {
        let forward = dom.children(parent);
        let mut backward = Vec::new();
        let mut child = dom.last_child(parent);
        while let Some(c) = child {
            backward.push(c);
            child = dom.prev_sibling(c);
        }
        backward.reverse();
        assert_eq!(forward, backward);
        for c in forward {
            assert_eq!(dom.parent(c), Some(parent));
        }
    }

    #[test]
    fn test_attach_and_detach_rebind_scope() {
        let mut dom = Dom::new();
        let root = dom.root();
        let parent = div(&mut dom);
        let child = div(&mut dom);
        dom.append(root, parent).unwrap();
        dom.bind(parent, "key", Value::string("value"));

        assert!(dom.lookup(child, "key").is_none());
        dom.append(parent, child).unwrap();
        assert_eq!(dom.lookup(child, "key"), Some(&Value::string("value")));

        dom.detach(child);
        assert!(dom.lookup(child, "key").is_none());
        assert_consistent(&dom, parent);
    }

    #[test]
    fn test_local_binding_shadows_parent() {
        let mut dom = Dom::new();
        let root = dom.root();
        let child = div(&mut dom);
        dom.append(root, child).unwrap();
        dom.bind(root, "x", Value::Number(1.0));
        dom.bind(child, "x", Value::Number(2.0));
        assert_eq!(dom.lookup(child, "x"), Some(&Value::Number(2.0)));
        assert_eq!(dom.lookup(root, "x"), Some(&Value::Number(1.0)));
        assert_eq!(dom.effective_scope(child).get("x"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_sibling_links_stay_consistent() {
        let mut dom = Dom::new();
        let root = dom.root();
        let a = div(&mut dom);
        let b = div(&mut dom);
        let c = div(&mut dom);
        dom.append(root, b).unwrap();
        dom.insert_before(b, a).unwrap();
        dom.insert_after(b, c).unwrap();
        assert_eq!(dom.children(root), vec![a, b, c]);
        assert_consistent(&dom, root);

        dom.detach(b);
        assert_eq!(dom.children(root), vec![a, c]);
        assert_consistent(&dom, root);

        // Moving a node keeps it under exactly one parent.
        dom.append(a, c).unwrap();
        assert_eq!(dom.children(root), vec![a]);
        assert_eq!(dom.children(a), vec![c]);
        assert_consistent(&dom, a);
    }

    #[test]
    fn test_replace_and_promote() {
        let mut dom = Dom::new();
        let root = dom.root();
        let wrapper = div(&mut dom);
        let x = dom.create_text("x");
        let y = dom.create_text("y");
        dom.append(root, wrapper).unwrap();
        dom.append(wrapper, x).unwrap();
        dom.append(wrapper, y).unwrap();

        dom.promote_children(wrapper).unwrap();
        assert_eq!(dom.children(root), vec![x, y]);
        assert!(dom.parent(wrapper).is_none());

        let z = dom.create_text("z");
        dom.replace(x, &[z]).unwrap();
        assert_eq!(dom.children(root), vec![z, y]);
        assert_consistent(&dom, root);
    }

    #[test]
    fn test_invalid_attachments() {
        let mut dom = Dom::new();
        let root = dom.root();
        let outer = div(&mut dom);
        let inner = div(&mut dom);
        dom.append(root, outer).unwrap();
        dom.append(outer, inner).unwrap();

        let err = dom.append(inner, outer).unwrap_err();
        assert_eq!(err.code(), crate::error::ERR_INVALID_TREE);
        assert!(dom.append(outer, root).is_err());
        assert!(dom.append(outer, outer).is_err());
        // The failed attempts left the tree untouched.
        assert_eq!(dom.children(outer), vec![inner]);
    }

    #[test]
    fn test_clone_has_fresh_identity() {
        let mut dom = Dom::new();
        let root = dom.root();
        let original = div(&mut dom);
        let text = dom.create_text("body");
        dom.append(root, original).unwrap();
        dom.append(original, text).unwrap();

        let mut seen = Vec::new();
        let copy = dom.clone_subtree(original, &mut |_, from, to| seen.push((from, to)));
        assert_ne!(copy, original);
        assert!(dom.parent(copy).is_none());
        assert_eq!(seen.len(), 2);
        assert_eq!(dom.text_content(copy), "body");

        // Mutating the copy leaves the original alone.
        let copied_text = dom.first_child(copy).unwrap();
        dom.node_mut(copied_text).data = NodeData::Text("changed".to_string());
        assert_eq!(dom.text_content(original), "body");
    }

    #[test]
    fn test_import_across_trees() {
        let mut source = Dom::new();
        let root = source.root();
        let p = source.create_tag(TagNode::element("p"));
        let t = source.create_text("hi");
        source.append(root, p).unwrap();
        source.append(p, t).unwrap();

        let mut target = Dom::new();
        let copies = target.import_children(&source, root);
        assert_eq!(copies.len(), 1);
        let target_root = target.root();
        target.append(target_root, copies[0]).unwrap();
        assert_eq!(target.tag_name(copies[0]), Some("p"));
        assert_eq!(target.text_content(target_root), "hi");
    }
}
