use crate::resource::DataSize;
use crate::root::{Element, Root};
use crate::tree::{CrdtTree, TreeNodeKind};

impl CrdtTree {
    /// Check the internal state of the tree. This is only exported for integration testing. You
    /// shouldn't have any reason to call this method.
    ///
    /// This method is public, but do not depend on it as part of the API. It could be removed at
    /// any time.
    #[allow(unused)]
    pub fn dbg_check(&self) {
        let nodes = self.nodes();
        assert_eq!(self.index().len(), nodes.len());

        for (id, idx) in self.index().iter() {
            assert_eq!(nodes[*idx].id(), *id);
        }

        for (idx, node) in nodes.iter().enumerate() {
            match node.parent {
                None => assert_eq!(idx, 0, "Only the root may be parentless"),
                Some(parent) => {
                    assert!(matches!(nodes[parent].kind, TreeNodeKind::Element(_)));
                    assert_eq!(nodes[parent].children.iter().filter(|c| **c == idx).count(), 1);

                    // Removing a node removes everything under it.
                    if let Some(parent_removed) = nodes[parent].removed_at {
                        let removed = node.removed_at.expect("Child of removed node is live");
                        assert!(!removed.after(&parent_removed));
                    }
                }
            }

            if node.is_text() {
                assert!(node.children.is_empty());
                assert!(node.attrs.nodes().next().is_none());
            }

            for child in node.children.iter() {
                assert_eq!(nodes[*child].parent, Some(idx));
            }
        }
    }
}

impl Root {
    /// Check the internal state of the root: every element is consistent, every registered pair
    /// names a fragment that is no longer live, and the gc ledger matches the registered pairs.
    #[allow(unused)]
    pub fn dbg_check(&self) {
        let mut expected_gc = DataSize::ZERO;

        for pair in self.gc_pairs() {
            expected_gc += pair.size;
            assert!(!pair.created.at.after(&pair.removed.at));

            for element in self.elements() {
                let Element::Tree(tree) = element else { continue; };
                let Some(attrs) = tree.attrs_of(&pair.created.node) else { continue; };
                if let Some(node) = attrs.get_node(&pair.created.key) {
                    if node.updated_at() == pair.created.at {
                        assert!(node.is_removed(), "Live fragment {} registered for collection", pair.created);
                    }
                }
            }
        }
        assert_eq!(self.doc_size().gc, expected_gc);

        for element in self.elements() {
            if let Element::Tree(tree) = element {
                tree.dbg_check();
            }
        }
    }
}
