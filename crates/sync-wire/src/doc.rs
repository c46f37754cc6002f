//! `DocMessage` payload variants (spec §3, §6 subtype table 0x00).

use crate::error::CodecError;
use crate::milestone::Milestone;
use crate::varint;

/// Outcome of a permission check, as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Denied.
    Denied,
    /// Allowed.
    Allowed,
}

impl Permission {
    fn to_byte(self) -> u8 {
        match self {
            Permission::Denied => 0x00,
            Permission::Allowed => 0x01,
        }
    }

    fn from_byte(byte: u8) -> Result<Self, CodecError> {
        match byte {
            0x00 => Ok(Permission::Denied),
            0x01 => Ok(Permission::Allowed),
            _ => Err(CodecError::UnknownSubtype),
        }
    }
}

/// Payload carried by a `DocMessage`.
#[derive(Debug, Clone, PartialEq)]
pub enum DocPayload {
    /// Client announces what it already knows via a state vector.
    SyncStep1 {
        /// The sender's state vector.
        sv: Vec<u8>,
    },
    /// Reply carrying the updates the other side is missing.
    SyncStep2 {
        /// The missing update bytes (or, if encrypted, faux-update envelope bytes).
        update: Vec<u8>,
    },
    /// A standalone document update (not part of a handshake).
    Update {
        /// Update bytes (or faux-update envelope bytes if encrypted).
        update: Vec<u8>,
    },
    /// Marks the end of a sync handshake round.
    SyncDone,
    /// Permission result / denial reason for a document-level request.
    AuthMessage {
        /// Whether the request was allowed.
        permission: Permission,
        /// Human-readable reason (empty string if none).
        reason: String,
    },
    /// Request metadata for a set of milestones (empty = all).
    MilestoneListReq {
        /// Milestone IDs to fetch; empty means "list all".
        snapshot_ids: Vec<String>,
    },
    /// Response carrying milestone metadata.
    MilestoneListResp {
        /// Matching milestones.
        milestones: Vec<Milestone>,
    },
    /// Request the snapshot bytes for one milestone.
    MilestoneSnapshotReq {
        /// Milestone ID.
        milestone_id: String,
    },
    /// Snapshot bytes for one milestone.
    MilestoneSnapshotResp {
        /// Milestone ID.
        milestone_id: String,
        /// Snapshot bytes (a full CRDT update encoding the document at that point).
        snapshot: Vec<u8>,
    },
    /// Create a new milestone from the given snapshot.
    MilestoneCreateReq {
        /// Optional client-supplied name.
        name: Option<String>,
        /// Snapshot bytes to persist.
        snapshot: Vec<u8>,
    },
    /// Metadata for the newly created milestone.
    MilestoneCreateResp {
        /// The created milestone's metadata.
        milestone: Milestone,
    },
    /// Rename an existing milestone.
    MilestoneRenameReq {
        /// Milestone ID.
        milestone_id: String,
        /// New name.
        name: String,
    },
    /// Metadata after a rename.
    MilestoneRenameResp {
        /// The renamed milestone's metadata.
        milestone: Milestone,
    },
    /// Permission result for a milestone-level request.
    MilestoneAuth {
        /// Whether the request was allowed.
        permission: Permission,
        /// Human-readable reason (empty string if none).
        reason: String,
    },
    /// Soft-delete a milestone.
    MilestoneSoftDeleteReq {
        /// Milestone ID.
        milestone_id: String,
    },
    /// Acknowledge a soft-delete.
    MilestoneSoftDeleteResp {
        /// Milestone ID.
        milestone_id: String,
    },
    /// Restore a soft-deleted milestone.
    MilestoneRestoreReq {
        /// Milestone ID.
        milestone_id: String,
    },
    /// Acknowledge a restore.
    MilestoneRestoreResp {
        /// Milestone ID.
        milestone_id: String,
    },
}

impl DocPayload {
    pub(crate) fn subtype(&self) -> u8 {
        match self {
            DocPayload::SyncStep1 { .. } => 0x00,
            DocPayload::SyncStep2 { .. } => 0x01,
            DocPayload::Update { .. } => 0x02,
            DocPayload::SyncDone => 0x03,
            DocPayload::AuthMessage { .. } => 0x04,
            DocPayload::MilestoneListReq { .. } => 0x05,
            DocPayload::MilestoneListResp { .. } => 0x06,
            DocPayload::MilestoneSnapshotReq { .. } => 0x07,
            DocPayload::MilestoneSnapshotResp { .. } => 0x08,
            DocPayload::MilestoneCreateReq { .. } => 0x09,
            DocPayload::MilestoneCreateResp { .. } => 0x0A,
            DocPayload::MilestoneRenameReq { .. } => 0x0B,
            DocPayload::MilestoneRenameResp { .. } => 0x0C,
            DocPayload::MilestoneAuth { .. } => 0x0D,
            DocPayload::MilestoneSoftDeleteReq { .. } => 0x0E,
            DocPayload::MilestoneSoftDeleteResp { .. } => 0x0F,
            DocPayload::MilestoneRestoreReq { .. } => 0x10,
            DocPayload::MilestoneRestoreResp { .. } => 0x11,
        }
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.subtype());
        match self {
            DocPayload::SyncStep1 { sv } => varint::write_bytes(out, sv),
            DocPayload::SyncStep2 { update } | DocPayload::Update { update } => {
                varint::write_bytes(out, update)
            }
            DocPayload::SyncDone => {}
            DocPayload::AuthMessage { permission, reason }
            | DocPayload::MilestoneAuth { permission, reason } => {
                out.push(permission.to_byte());
                varint::write_string(out, reason);
            }
            DocPayload::MilestoneListReq { snapshot_ids } => {
                varint::write_u64(out, snapshot_ids.len() as u64);
                for id in snapshot_ids {
                    varint::write_string(out, id);
                }
            }
            DocPayload::MilestoneListResp { milestones } => {
                varint::write_u64(out, milestones.len() as u64);
                for m in milestones {
                    m.encode(out);
                }
            }
            DocPayload::MilestoneSnapshotReq { milestone_id } => {
                varint::write_string(out, milestone_id)
            }
            DocPayload::MilestoneSnapshotResp {
                milestone_id,
                snapshot,
            } => {
                varint::write_string(out, milestone_id);
                varint::write_bytes(out, snapshot);
            }
            DocPayload::MilestoneCreateReq { name, snapshot } => {
                match name {
                    Some(n) => {
                        out.push(0x01);
                        varint::write_string(out, n);
                    }
                    None => out.push(0x00),
                }
                varint::write_bytes(out, snapshot);
            }
            DocPayload::MilestoneCreateResp { milestone }
            | DocPayload::MilestoneRenameResp { milestone } => milestone.encode(out),
            DocPayload::MilestoneRenameReq { milestone_id, name } => {
                varint::write_string(out, milestone_id);
                varint::write_string(out, name);
            }
            DocPayload::MilestoneSoftDeleteReq { milestone_id }
            | DocPayload::MilestoneSoftDeleteResp { milestone_id }
            | DocPayload::MilestoneRestoreReq { milestone_id }
            | DocPayload::MilestoneRestoreResp { milestone_id } => {
                varint::write_string(out, milestone_id)
            }
        }
    }

    pub(crate) fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, CodecError> {
        let subtype = *buf.get(*pos).ok_or(CodecError::Truncated)?;
        *pos += 1;
        Ok(match subtype {
            0x00 => DocPayload::SyncStep1 {
                sv: varint::read_bytes(buf, pos)?,
            },
            0x01 => DocPayload::SyncStep2 {
                update: varint::read_bytes(buf, pos)?,
            },
            0x02 => DocPayload::Update {
                update: varint::read_bytes(buf, pos)?,
            },
            0x03 => DocPayload::SyncDone,
            0x04 => {
                let permission = Permission::from_byte(*buf.get(*pos).ok_or(CodecError::Truncated)?)?;
                *pos += 1;
                let reason = varint::read_string(buf, pos)?;
                DocPayload::AuthMessage { permission, reason }
            }
            0x05 => {
                let count = varint::read_u64(buf, pos)? as usize;
                let mut snapshot_ids = Vec::with_capacity(count);
                for _ in 0..count {
                    snapshot_ids.push(varint::read_string(buf, pos)?);
                }
                DocPayload::MilestoneListReq { snapshot_ids }
            }
            0x06 => {
                let count = varint::read_u64(buf, pos)? as usize;
                let mut milestones = Vec::with_capacity(count);
                for _ in 0..count {
                    milestones.push(Milestone::decode(buf, pos)?);
                }
                DocPayload::MilestoneListResp { milestones }
            }
            0x07 => DocPayload::MilestoneSnapshotReq {
                milestone_id: varint::read_string(buf, pos)?,
            },
            0x08 => {
                let milestone_id = varint::read_string(buf, pos)?;
                let snapshot = varint::read_bytes(buf, pos)?;
                DocPayload::MilestoneSnapshotResp {
                    milestone_id,
                    snapshot,
                }
            }
            0x09 => {
                let has_name = *buf.get(*pos).ok_or(CodecError::Truncated)?;
                *pos += 1;
                let name = match has_name {
                    0x00 => None,
                    0x01 => Some(varint::read_string(buf, pos)?),
                    _ => return Err(CodecError::InvalidBoolFlag),
                };
                let snapshot = varint::read_bytes(buf, pos)?;
                DocPayload::MilestoneCreateReq { name, snapshot }
            }
            0x0A => DocPayload::MilestoneCreateResp {
                milestone: Milestone::decode(buf, pos)?,
            },
            0x0B => {
                let milestone_id = varint::read_string(buf, pos)?;
                let name = varint::read_string(buf, pos)?;
                DocPayload::MilestoneRenameReq { milestone_id, name }
            }
            0x0C => DocPayload::MilestoneRenameResp {
                milestone: Milestone::decode(buf, pos)?,
            },
            0x0D => {
                let permission = Permission::from_byte(*buf.get(*pos).ok_or(CodecError::Truncated)?)?;
                *pos += 1;
                let reason = varint::read_string(buf, pos)?;
                DocPayload::MilestoneAuth { permission, reason }
            }
            0x0E => DocPayload::MilestoneSoftDeleteReq {
                milestone_id: varint::read_string(buf, pos)?,
            },
            0x0F => DocPayload::MilestoneSoftDeleteResp {
                milestone_id: varint::read_string(buf, pos)?,
            },
            0x10 => DocPayload::MilestoneRestoreReq {
                milestone_id: varint::read_string(buf, pos)?,
            },
            0x11 => DocPayload::MilestoneRestoreResp {
                milestone_id: varint::read_string(buf, pos)?,
            },
            _ => return Err(CodecError::UnknownSubtype),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::milestone::MilestoneCreator;

    fn roundtrip(payload: DocPayload) {
        let mut buf = Vec::new();
        payload.encode(&mut buf);
        let mut pos = 0;
        let decoded = DocPayload::decode(&buf, &mut pos).unwrap();
        assert_eq!(payload, decoded);
        assert_eq!(pos, buf.len());
    }

    #[test]
    fn sync_variants_roundtrip() {
        roundtrip(DocPayload::SyncStep1 { sv: vec![1, 2, 3] });
        roundtrip(DocPayload::SyncStep1 { sv: vec![] });
        roundtrip(DocPayload::SyncStep2 {
            update: vec![4, 5],
        });
        roundtrip(DocPayload::Update { update: vec![6] });
        roundtrip(DocPayload::SyncDone);
    }

    #[test]
    fn auth_message_roundtrip() {
        roundtrip(DocPayload::AuthMessage {
            permission: Permission::Denied,
            reason: "no write access".into(),
        });
        roundtrip(DocPayload::AuthMessage {
            permission: Permission::Allowed,
            reason: String::new(),
        });
    }

    #[test]
    fn milestone_list_roundtrip() {
        roundtrip(DocPayload::MilestoneListReq {
            snapshot_ids: vec!["a".into(), "b".into()],
        });
        roundtrip(DocPayload::MilestoneListReq {
            snapshot_ids: vec![],
        });

        let milestone = Milestone {
            id: "m1".into(),
            name: "v1".into(),
            document_id: "doc1".into(),
            created_at: 42,
            created_by: MilestoneCreator::User("u1".into()),
            deleted_at: None,
            lifecycle_state: None,
            expires_at: None,
        };
        roundtrip(DocPayload::MilestoneListResp {
            milestones: vec![milestone],
        });
    }

    #[test]
    fn milestone_create_roundtrip() {
        roundtrip(DocPayload::MilestoneCreateReq {
            name: Some("checkpoint".into()),
            snapshot: vec![1, 2, 3],
        });
        roundtrip(DocPayload::MilestoneCreateReq {
            name: None,
            snapshot: vec![],
        });
    }

    #[test]
    fn milestone_lifecycle_roundtrip() {
        roundtrip(DocPayload::MilestoneSoftDeleteReq {
            milestone_id: "m1".into(),
        });
        roundtrip(DocPayload::MilestoneRestoreResp {
            milestone_id: "m1".into(),
        });
        roundtrip(DocPayload::MilestoneRenameReq {
            milestone_id: "m1".into(),
            name: "new name".into(),
        });
    }

    #[test]
    fn unknown_subtype_errors() {
        let buf = [0xFF];
        let mut pos = 0;
        assert_eq!(
            DocPayload::decode(&buf, &mut pos),
            Err(CodecError::UnknownSubtype)
        );
    }
}
