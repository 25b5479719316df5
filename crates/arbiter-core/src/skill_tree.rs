//! Merkle commitments over an agent's skill set.
//!
//! Construction rules, shared by root computation, proof generation and
//! verification:
//! - each pair is hashed as `H(min(a, b) ∥ max(a, b))`;
//! - consecutive elements are paired left to right;
//! - an unpaired last element is promoted to the next layer unchanged.
//!
//! A promoted node has no sibling at that layer, so its proof carries no
//! entry for the layer. Proofs are therefore at most `ceil(log2 n)` long and
//! verification is a plain fold with no special cases.

use crate::domain::{ArbiterError, Hash32, Result};

/// Leaf identifier for a skill: `H(name ∥ "@" ∥ version)`.
pub fn skill_id(name: &str, version: &str) -> Hash32 {
    Hash32::digest(format!("{name}@{version}").as_bytes())
}

fn hash_pair(a: &Hash32, b: &Hash32) -> Hash32 {
    if a <= b {
        Hash32::concat(a, b)
    } else {
        Hash32::concat(b, a)
    }
}

fn next_layer(layer: &[Hash32]) -> Vec<Hash32> {
    layer
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => hash_pair(left, right),
            _ => pair[0],
        })
        .collect()
}

/// Fully materialised tree; keeps every layer so proofs are cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillTree {
    layers: Vec<Vec<Hash32>>,
}

impl SkillTree {
    pub fn build(leaves: &[Hash32]) -> Result<Self> {
        if leaves.is_empty() {
            return Err(ArbiterError::EmptyLeafSet);
        }
        let mut layers = vec![leaves.to_vec()];
        while let Some(top) = layers.last() {
            if top.len() == 1 {
                break;
            }
            let next = next_layer(top);
            layers.push(next);
        }
        Ok(Self { layers })
    }

    pub fn root(&self) -> Hash32 {
        // `build` guarantees a final single-element layer.
        self.layers
            .last()
            .and_then(|top| top.first())
            .copied()
            .unwrap_or(Hash32::ZERO)
    }

    pub fn leaves(&self) -> &[Hash32] {
        &self.layers[0]
    }

    pub fn leaf_count(&self) -> usize {
        self.layers[0].len()
    }

    /// Number of hashing layers above the leaves.
    pub fn depth(&self) -> usize {
        self.layers.len() - 1
    }

    /// Sibling path from leaf `index` to the root.
    pub fn proof(&self, index: usize) -> Result<Vec<Hash32>> {
        let len = self.leaf_count();
        if index >= len {
            return Err(ArbiterError::LeafIndexOutOfRange { index, len });
        }

        let mut proof = Vec::with_capacity(self.depth());
        let mut position = index;
        for layer in &self.layers[..self.layers.len() - 1] {
            let sibling = position ^ 1;
            if let Some(hash) = layer.get(sibling) {
                proof.push(*hash);
            }
            position /= 2;
        }
        Ok(proof)
    }
}

/// Root over `leaves` in the given order.
pub fn compute_root(leaves: &[Hash32]) -> Result<Hash32> {
    Ok(SkillTree::build(leaves)?.root())
}

/// Proof of membership for `leaves[index]`.
pub fn generate_proof(leaves: &[Hash32], index: usize) -> Result<Vec<Hash32>> {
    SkillTree::build(leaves)?.proof(index)
}

/// Fold `proof` over `leaf` and compare with `root`. Never errors.
pub fn verify(root: &Hash32, leaf: &Hash32, proof: &[Hash32]) -> bool {
    let computed = proof
        .iter()
        .fold(*leaf, |current, sibling| hash_pair(&current, sibling));
    computed == *root
}

/// Element-wise [`verify`]; lengths must match.
pub fn verify_batch(root: &Hash32, leaves: &[Hash32], proofs: &[Vec<Hash32>]) -> Result<Vec<bool>> {
    if leaves.len() != proofs.len() {
        return Err(ArbiterError::LengthMismatch {
            left: leaves.len(),
            right: proofs.len(),
        });
    }
    Ok(leaves
        .iter()
        .zip(proofs)
        .map(|(leaf, proof)| verify(root, leaf, proof))
        .collect())
}
