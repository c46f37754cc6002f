//! Milestone metadata: named, persisted document snapshots (spec §3).

use crate::error::CodecError;
use crate::varint;

/// Who created a milestone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MilestoneCreator {
    /// A human user, identified by their user ID.
    User(String),
    /// The system itself (e.g. an automatic periodic snapshot).
    System(String),
}

impl MilestoneCreator {
    fn type_byte(&self) -> u8 {
        match self {
            MilestoneCreator::User(_) => 0x00,
            MilestoneCreator::System(_) => 0x01,
        }
    }

    fn id(&self) -> &str {
        match self {
            MilestoneCreator::User(id) | MilestoneCreator::System(id) => id,
        }
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.type_byte());
        varint::write_string(out, self.id());
    }

    pub(crate) fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, CodecError> {
        let type_byte = *buf.get(*pos).ok_or(CodecError::Truncated)?;
        *pos += 1;
        let id = varint::read_string(buf, pos)?;
        match type_byte {
            0x00 => Ok(MilestoneCreator::User(id)),
            0x01 => Ok(MilestoneCreator::System(id)),
            _ => Err(CodecError::UnknownSubtype),
        }
    }
}

/// Lifecycle state of a milestone (free-form; server policy decides the
/// concrete strings used, e.g. `"active"`, `"archived"`).
pub type LifecycleState = String;

/// Named, persisted snapshot of a document's state at some point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Milestone {
    /// Opaque milestone ID.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Document this milestone belongs to.
    pub document_id: String,
    /// Creation timestamp (milliseconds since epoch).
    pub created_at: u64,
    /// Who created it.
    pub created_by: MilestoneCreator,
    /// Soft-deletion timestamp, if the milestone has been soft-deleted.
    pub deleted_at: Option<u64>,
    /// Lifecycle state, if tracked.
    pub lifecycle_state: Option<LifecycleState>,
    /// Expiry timestamp, if this milestone is subject to retention.
    pub expires_at: Option<u64>,
}

fn write_optional_u64(out: &mut Vec<u8>, value: Option<u64>) {
    match value {
        Some(v) => {
            out.push(0x01);
            varint::write_u64(out, v);
        }
        None => out.push(0x00),
    }
}

fn read_optional_u64(buf: &[u8], pos: &mut usize) -> Result<Option<u64>, CodecError> {
    let has = *buf.get(*pos).ok_or(CodecError::Truncated)?;
    *pos += 1;
    match has {
        0x00 => Ok(None),
        0x01 => Ok(Some(varint::read_u64(buf, pos)?)),
        _ => Err(CodecError::InvalidBoolFlag),
    }
}

impl Milestone {
    pub(crate) fn encode(&self, out: &mut Vec<u8>) {
        varint::write_string(out, &self.id);
        varint::write_string(out, &self.name);
        varint::write_string(out, &self.document_id);
        varint::write_u64(out, self.created_at);
        write_optional_u64(out, self.deleted_at);
        match &self.lifecycle_state {
            Some(state) => {
                out.push(0x01);
                varint::write_string(out, state);
            }
            None => out.push(0x00),
        }
        write_optional_u64(out, self.expires_at);
        self.created_by.encode(out);
    }

    pub(crate) fn decode(buf: &[u8], pos: &mut usize) -> Result<Self, CodecError> {
        let id = varint::read_string(buf, pos)?;
        let name = varint::read_string(buf, pos)?;
        let document_id = varint::read_string(buf, pos)?;
        let created_at = varint::read_u64(buf, pos)?;
        let deleted_at = read_optional_u64(buf, pos)?;
        let has_lifecycle = *buf.get(*pos).ok_or(CodecError::Truncated)?;
        *pos += 1;
        let lifecycle_state = match has_lifecycle {
            0x00 => None,
            0x01 => Some(varint::read_string(buf, pos)?),
            _ => return Err(CodecError::InvalidBoolFlag),
        };
        let expires_at = read_optional_u64(buf, pos)?;
        let created_by = MilestoneCreator::decode(buf, pos)?;

        Ok(Milestone {
            id,
            name,
            document_id,
            created_at,
            created_by,
            deleted_at,
            lifecycle_state,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Milestone {
        Milestone {
            id: "m1".into(),
            name: "v1".into(),
            document_id: "doc1".into(),
            created_at: 1000,
            created_by: MilestoneCreator::User("u1".into()),
            deleted_at: None,
            lifecycle_state: Some("active".into()),
            expires_at: Some(2000),
        }
    }

    #[test]
    fn milestone_roundtrip() {
        let m = sample();
        let mut buf = Vec::new();
        m.encode(&mut buf);
        let mut pos = 0;
        let decoded = Milestone::decode(&buf, &mut pos).unwrap();
        assert_eq!(m, decoded);
        assert_eq!(pos, buf.len());
    }

    #[test]
    fn milestone_with_all_none_roundtrip() {
        let m = Milestone {
            id: "m2".into(),
            name: "v2".into(),
            document_id: "doc2".into(),
            created_at: 0,
            created_by: MilestoneCreator::System("server".into()),
            deleted_at: None,
            lifecycle_state: None,
            expires_at: None,
        };
        let mut buf = Vec::new();
        m.encode(&mut buf);
        let mut pos = 0;
        assert_eq!(Milestone::decode(&buf, &mut pos).unwrap(), m);
    }
}
