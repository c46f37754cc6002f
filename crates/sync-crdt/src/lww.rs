//! `LwwDoc`: a last-write-wins op log keyed by per-writer logical
//! clocks — the reference `Crdt` implementation used to drive the
//! transport bridge and its tests. Not a claim to implement a real
//! CRDT algorithm; a real document (Yjs, Automerge, or similar) is an
//! external collaborator that implements the same `Crdt`/`MergeUpdates`
//! contract.

use crate::error::{CrdtError, Result};
use crate::traits::{ChangeEvent, Crdt, MergeUpdates};
use std::collections::BTreeMap;
use sync_wire::varint;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Op {
    writer: String,
    clock: u64,
    text: String,
}

fn encode_ops(ops: &[&Op]) -> Vec<u8> {
    let mut out = Vec::new();
    varint::write_u64(&mut out, ops.len() as u64);
    for op in ops {
        varint::write_string(&mut out, &op.writer);
        varint::write_u64(&mut out, op.clock);
        varint::write_string(&mut out, &op.text);
    }
    out
}

fn decode_ops(buf: &[u8]) -> Result<Vec<Op>> {
    let mut pos = 0usize;
    let count = varint::read_u64(buf, &mut pos).map_err(|_| CrdtError::MalformedUpdate)? as usize;
    let mut ops = Vec::with_capacity(count);
    for _ in 0..count {
        let writer =
            varint::read_string(buf, &mut pos).map_err(|_| CrdtError::InvalidUtf8)?;
        let clock = varint::read_u64(buf, &mut pos).map_err(|_| CrdtError::MalformedUpdate)?;
        let text = varint::read_string(buf, &mut pos).map_err(|_| CrdtError::InvalidUtf8)?;
        ops.push(Op { writer, clock, text });
    }
    Ok(ops)
}

fn decode_state_vector(buf: &[u8]) -> Result<BTreeMap<String, u64>> {
    let mut pos = 0usize;
    let count = varint::read_u64(buf, &mut pos).map_err(|_| CrdtError::MalformedUpdate)? as usize;
    let mut sv = BTreeMap::new();
    for _ in 0..count {
        let writer =
            varint::read_string(buf, &mut pos).map_err(|_| CrdtError::InvalidUtf8)?;
        let clock = varint::read_u64(buf, &mut pos).map_err(|_| CrdtError::MalformedUpdate)?;
        sv.insert(writer, clock);
    }
    Ok(sv)
}

fn encode_state_vector(sv: &BTreeMap<String, u64>) -> Vec<u8> {
    let mut out = Vec::new();
    varint::write_u64(&mut out, sv.len() as u64);
    for (writer, clock) in sv {
        varint::write_string(&mut out, writer);
        varint::write_u64(&mut out, *clock);
    }
    out
}

/// A last-write-wins document: one `(clock, text)` slot per writer ID.
/// Applying an update for a writer only takes effect if its clock is
/// strictly newer than what's already recorded for that writer.
#[derive(Debug, Default)]
pub struct LwwDoc {
    ops: BTreeMap<String, (u64, String)>,
}

impl LwwDoc {
    /// An empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce and apply a local edit for `writer`, returning the
    /// update bytes to broadcast to peers.
    pub fn write_local(&mut self, writer: &str, text: &str) -> Vec<u8> {
        let clock = self.ops.get(writer).map_or(0, |(c, _)| *c) + 1;
        self.ops
            .insert(writer.to_string(), (clock, text.to_string()));
        let op = Op {
            writer: writer.to_string(),
            clock,
            text: text.to_string(),
        };
        encode_ops(&[&op])
    }

    /// The document's current text, as the concatenation of each
    /// writer's latest fragment in writer-ID order. A projection for
    /// tests and demos, not part of the opaque `Crdt` contract.
    #[must_use]
    pub fn text(&self) -> String {
        self.ops.values().map(|(_, text)| text.as_str()).collect()
    }

    fn merge_op(&mut self, op: Op) -> bool {
        match self.ops.get(&op.writer) {
            Some((clock, _)) if *clock >= op.clock => false,
            _ => {
                self.ops.insert(op.writer, (op.clock, op.text));
                true
            }
        }
    }
}

impl Crdt for LwwDoc {
    fn apply(&mut self, update: &[u8], origin: &str) -> Vec<ChangeEvent> {
        let ops = match decode_ops(update) {
            Ok(ops) => ops,
            Err(_) => return Vec::new(),
        };
        let new_ops = ops.into_iter().filter(|op| self.merge_op(op.clone())).count();
        if new_ops == 0 {
            Vec::new()
        } else {
            vec![ChangeEvent {
                origin: origin.to_string(),
                new_ops,
            }]
        }
    }

    fn encode_state_as_update(&self) -> Vec<u8> {
        let owned: Vec<Op> = self
            .ops
            .iter()
            .map(|(writer, (clock, text))| Op {
                writer: writer.clone(),
                clock: *clock,
                text: text.clone(),
            })
            .collect();
        encode_ops(&owned.iter().collect::<Vec<_>>())
    }

    fn state_vector(&self) -> Vec<u8> {
        let sv: BTreeMap<String, u64> = self
            .ops
            .iter()
            .map(|(writer, (clock, _))| (writer.clone(), *clock))
            .collect();
        encode_state_vector(&sv)
    }

    fn diff(&self, remote_state_vector: &[u8]) -> Vec<u8> {
        let remote_sv = decode_state_vector(remote_state_vector).unwrap_or_default();
        let missing: Vec<Op> = self
            .ops
            .iter()
            .filter(|(writer, (clock, _))| *clock > remote_sv.get(*writer).copied().unwrap_or(0))
            .map(|(writer, (clock, text))| Op {
                writer: writer.clone(),
                clock: *clock,
                text: text.clone(),
            })
            .collect();
        encode_ops(&missing.iter().collect::<Vec<_>>())
    }
}

impl MergeUpdates for LwwDoc {
    fn merge(updates: &[Vec<u8>]) -> Vec<u8> {
        let mut merged: BTreeMap<String, (u64, String)> = BTreeMap::new();
        for update in updates {
            let Ok(ops) = decode_ops(update) else {
                continue;
            };
            for op in ops {
                match merged.get(&op.writer) {
                    Some((clock, _)) if *clock >= op.clock => {}
                    _ => {
                        merged.insert(op.writer, (op.clock, op.text));
                    }
                }
            }
        }
        let owned: Vec<Op> = merged
            .into_iter()
            .map(|(writer, (clock, text))| Op { writer, clock, text })
            .collect();
        encode_ops(&owned.iter().collect::<Vec<_>>())
    }

    fn state_vector_of(update: &[u8]) -> Vec<u8> {
        let ops = decode_ops(update).unwrap_or_default();
        let mut sv: BTreeMap<String, u64> = BTreeMap::new();
        for op in ops {
            let entry = sv.entry(op.writer).or_insert(0);
            if op.clock > *entry {
                *entry = op.clock;
            }
        }
        encode_state_vector(&sv)
    }
}
