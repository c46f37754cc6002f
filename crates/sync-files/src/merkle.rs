//! Merkle tree integrity over file chunks (spec §4.I).
//!
//! Leaves are `SHA-256(chunk_plaintext)`; internal nodes are
//! `SHA-256(left || right)`. An odd trailing node at any level is
//! paired with itself rather than promoted unchanged — this is a
//! deliberate departure from a plain binary-tree-with-carry scheme, to
//! keep every internal node's preimage exactly 64 bytes.

use sha2::{Digest, Sha256};

/// A SHA-256 digest.
pub type Hash = [u8; 32];

fn hash_leaf(chunk: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(chunk);
    hasher.finalize().into()
}

fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Build every level of the tree, leaves first, root last.
///
/// Returns an empty vec for zero chunks. A single chunk yields one
/// level containing just its leaf hash (the leaf is the root).
fn build_levels(leaves: &[Hash]) -> Vec<Vec<Hash>> {
    if leaves.is_empty() {
        return Vec::new();
    }
    let mut levels = vec![leaves.to_vec()];
    while levels.last().unwrap().len() > 1 {
        let current = levels.last().unwrap();
        let mut next = Vec::with_capacity(current.len().div_ceil(2));
        let mut pairs = current.chunks_exact(2);
        for pair in pairs.by_ref() {
            next.push(hash_pair(&pair[0], &pair[1]));
        }
        if let [lone] = pairs.remainder() {
            next.push(hash_pair(lone, lone));
        }
        levels.push(next);
    }
    levels
}

/// Compute the Merkle root of a sequence of chunks.
#[must_use]
pub fn root_of(chunks: &[Vec<u8>]) -> Hash {
    let leaves: Vec<Hash> = chunks.iter().map(|c| hash_leaf(c)).collect();
    let levels = build_levels(&leaves);
    levels
        .last()
        .and_then(|top| top.first())
        .copied()
        .unwrap_or_else(|| hash_leaf(&[]))
}

/// Compute the sibling-hash proof for the chunk at `index`, given every
/// chunk in the file. The proof runs leaf level upward; `verify_proof`
/// walks it in the same order.
#[must_use]
pub fn proof_for(chunks: &[Vec<u8>], index: usize) -> Vec<Hash> {
    let leaves: Vec<Hash> = chunks.iter().map(|c| hash_leaf(c)).collect();
    let levels = build_levels(&leaves);
    let mut proof = Vec::new();
    let mut idx = index;
    for level in &levels[..levels.len().saturating_sub(1)] {
        let sibling_idx = if idx % 2 == 0 { idx + 1 } else { idx - 1 };
        let sibling = level.get(sibling_idx).or_else(|| level.get(idx)).copied();
        if let Some(sibling) = sibling {
            proof.push(sibling);
        }
        idx /= 2;
    }
    proof
}

/// Verify that `chunk` at `index`, together with `proof`, hashes up to
/// `expected_root`.
#[must_use]
pub fn verify_proof(chunk: &[u8], index: usize, proof: &[Hash], expected_root: &Hash) -> bool {
    let mut hash = hash_leaf(chunk);
    let mut idx = index;
    for sibling in proof {
        hash = if idx % 2 == 0 {
            hash_pair(&hash, sibling)
        } else {
            hash_pair(sibling, &hash)
        };
        idx /= 2;
    }
    &hash == expected_root
}
