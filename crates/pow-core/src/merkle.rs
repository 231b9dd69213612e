//! Merkle tree commitments over transaction ids.
//!
//! [`MerkleTree`] is append-only and caches interior hashes, so re-reading
//! the root after changing a single leaf (the coinbase, when the extranonce
//! rolls) only rehashes one path.

use thiserror::Error;

use crate::hash::double_sha256;
use crate::sha256::RawDigest;

/// Merkle tree errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerkleError {
    #[error("leaf index {index} out of range for {len} leaves")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(RawDigest),
    Branch {
        cache: Option<RawDigest>,
        left: usize,
        right: Option<usize>,
    },
}

/// Incrementally built binary hash tree.
///
/// Nodes live in an arena and each is referenced by exactly one parent. The
/// tree is always complete to the minimum depth that holds its leaves, filled
/// left to right.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    nodes: Vec<Node>,
    root: Option<usize>,
    depth: u32,
    leaves: Vec<RawDigest>,
}

impl Default for MerkleTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MerkleTree {
    /// An empty tree.
    pub fn new() -> Self {
        MerkleTree {
            nodes: Vec::new(),
            root: None,
            depth: 1,
            leaves: Vec::new(),
        }
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Levels of branches above the leaves.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Leaf hashes in insertion order.
    pub fn leaves(&self) -> &[RawDigest] {
        &self.leaves
    }

    /// Append a leaf, growing the tree first if it is full.
    pub fn append(&mut self, hash: RawDigest) {
        let count = self.leaves.len();
        if count >= 2 && count.is_power_of_two() {
            self.grow();
        }

        let leaf = self.push(Node::Leaf(hash));
        self.leaves.push(hash);

        match self.root {
            None => self.root = Some(self.build_path(leaf, self.depth)),
            Some(root) => {
                let appended = self.insert(root, leaf, self.depth);
                debug_assert!(appended, "tree was grown before append");
            }
        }
    }

    /// Replace the hash of an existing leaf.
    pub fn update(&mut self, index: usize, hash: RawDigest) -> Result<(), MerkleError> {
        let len = self.leaves.len();
        let out_of_range = MerkleError::IndexOutOfRange { index, len };
        let mut node = self.root.filter(|_| index < len).ok_or(out_of_range.clone())?;

        for level in (0..self.depth).rev() {
            let next = match &mut self.nodes[node] {
                Node::Branch { cache, left, right } => {
                    *cache = None;
                    if (index >> level) & 1 == 0 {
                        Some(*left)
                    } else {
                        *right
                    }
                }
                Node::Leaf(_) => None,
            };
            node = next.ok_or(out_of_range.clone())?;
        }

        self.nodes[node] = Node::Leaf(hash);
        self.leaves[index] = hash;
        Ok(())
    }

    /// The root commitment, recomputing any invalidated branches.
    ///
    /// An empty tree commits to all zeros and a single leaf is its own root.
    pub fn root_hash(&mut self) -> RawDigest {
        match (self.root, self.leaves.len()) {
            (None, _) => [0u8; 32],
            (Some(_), 1) => self.leaves[0],
            (Some(root), _) => self.refresh(root),
        }
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Wrap the current root as the left child of a new root.
    fn grow(&mut self) {
        if let Some(old_root) = self.root {
            let new_root = self.push(Node::Branch {
                cache: None,
                left: old_root,
                right: None,
            });
            self.root = Some(new_root);
            self.depth += 1;
        }
    }

    /// Build a chain of `height` branches above `leaf`, returning its top.
    fn build_path(&mut self, leaf: usize, height: u32) -> usize {
        let mut child = leaf;
        for _ in 0..height {
            child = self.push(Node::Branch {
                cache: None,
                left: child,
                right: None,
            });
        }
        child
    }

    /// Place `leaf` in the leftmost free slot under the branch `node`, whose
    /// children sit `depth - 1` levels above the leaves.
    fn insert(&mut self, node: usize, leaf: usize, depth: u32) -> bool {
        let (left, right) = match self.nodes[node] {
            Node::Branch { left, right, .. } => (left, right),
            Node::Leaf(_) => return false,
        };

        let mut appended = depth > 1 && self.insert(left, leaf, depth - 1);
        if !appended {
            appended = match right {
                Some(right) => depth > 1 && self.insert(right, leaf, depth - 1),
                None => {
                    let subtree = self.build_path(leaf, depth - 1);
                    if let Node::Branch { right, .. } = &mut self.nodes[node] {
                        *right = Some(subtree);
                    }
                    true
                }
            };
        }

        if appended {
            if let Node::Branch { cache, .. } = &mut self.nodes[node] {
                *cache = None;
            }
        }
        appended
    }

    fn refresh(&mut self, node: usize) -> RawDigest {
        let (left, right) = match self.nodes[node] {
            Node::Leaf(hash) => return hash,
            Node::Branch { cache: Some(hash), .. } => return hash,
            Node::Branch { cache: None, left, right } => (left, right),
        };

        let left_hash = self.refresh(left);
        // Odd count: the last hash on a level is paired with itself.
        let right_hash = match right {
            Some(right) => self.refresh(right),
            None => left_hash,
        };

        let hash = hash_pair(&left_hash, &right_hash);
        if let Node::Branch { cache, .. } = &mut self.nodes[node] {
            *cache = Some(hash);
        }
        hash
    }
}

fn hash_pair(left: &RawDigest, right: &RawDigest) -> RawDigest {
    let mut combined = [0u8; 64];
    combined[..32].copy_from_slice(left);
    combined[32..].copy_from_slice(right);
    double_sha256(&combined)
}

/// Compute the merkle root from a list of transaction IDs by flat pairwise
/// level construction.
///
/// For a single transaction the merkle root is simply the txid itself.
pub fn compute_merkle_root(txids: &[RawDigest]) -> RawDigest {
    if txids.is_empty() {
        return [0u8; 32];
    }

    let mut current_level: Vec<RawDigest> = txids.to_vec();

    while current_level.len() > 1 {
        current_level = current_level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => hash_pair(left, right),
                [single] => hash_pair(single, single),
                _ => unreachable!("chunks(2) yields one or two items"),
            })
            .collect();
    }

    current_level[0]
}
