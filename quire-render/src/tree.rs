//! Arena storage shared by every output backend.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("{0} cannot hold child nodes")]
    Leaf(String),

    #[error("output node #{0} does not exist")]
    Missing(usize),
}

/// A node kind that knows how to serialize itself around its children
pub trait Markup {
    /// Text written before the children
    fn open(&self, out: &mut String);

    /// Text written after the children
    fn close(&self, out: &mut String);

    /// Leaf nodes reject children
    fn is_leaf(&self) -> bool {
        false
    }

    /// Short human-readable name used in errors
    fn describe(&self) -> String;
}

/// Handle to a node inside a [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutId(usize);

impl OutId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Slot<N> {
    node: N,
    parent: Option<OutId>,
    children: Vec<OutId>,
}

/// Output tree; index 0 is always the root
#[derive(Debug, Clone)]
pub struct Tree<N> {
    slots: Vec<Slot<N>>,
}

impl<N: Markup> Tree<N> {
    pub fn new(root: N) -> Self {
        Self {
            slots: vec![Slot {
                node: root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> OutId {
        OutId(0)
    }

    /// Append `node` as the last child of `parent`
    pub fn push(&mut self, parent: OutId, node: N) -> Result<OutId, TreeError> {
        let slot = self
            .slots
            .get(parent.0)
            .ok_or(TreeError::Missing(parent.0))?;
        if slot.node.is_leaf() {
            return Err(TreeError::Leaf(slot.node.describe()));
        }

        let id = OutId(self.slots.len());
        self.slots.push(Slot {
            node,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.slots[parent.0].children.push(id);
        Ok(id)
    }

    pub fn get(&self, id: OutId) -> Option<&N> {
        self.slots.get(id.0).map(|slot| &slot.node)
    }

    pub fn get_mut(&mut self, id: OutId) -> Option<&mut N> {
        self.slots.get_mut(id.0).map(|slot| &mut slot.node)
    }

    pub fn parent(&self, id: OutId) -> Option<OutId> {
        self.slots.get(id.0).and_then(|slot| slot.parent)
    }

    pub fn children(&self, id: OutId) -> &[OutId] {
        self.slots
            .get(id.0)
            .map(|slot| slot.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.len() == 1 && self.slots[0].children.is_empty()
    }

    /// Serialize the whole tree
    pub fn write(&self) -> String {
        self.write_from(self.root())
    }

    /// Serialize the subtree rooted at `id`
    pub fn write_from(&self, id: OutId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: OutId, out: &mut String) {
        let Some(slot) = self.slots.get(id.0) else {
            return;
        };
        slot.node.open(out);
        for &child in &slot.children {
            self.write_node(child, out);
        }
        slot.node.close(out);
    }
}
