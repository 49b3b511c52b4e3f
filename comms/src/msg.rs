//! Typed payload variants and their explicit encode/decode routines.
//!
//! Every message lives inside the payload region of one [`Envelope`];
//! unbounded lists are chunked by the `pack` module, and each chunk
//! carries enough bookkeeping (`list_len`, `offset`) for the receiver to
//! reassemble independently of arrival order.
//!
//! [`Envelope`]: crate::Envelope

use std::io;

use bytemuck::{Pod, Zeroable};

use crate::pack;

/// One grid point coordinate: hierarchical level and index in one dimension.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct LevelIndexPair {
    pub level: u64,
    pub index: u64,
}

/// A full grid point, one `(level, index)` pair per dimension.
pub type LevelIndexVector = Vec<LevelIndexPair>;

/// Which list of a refinement diff a chunk belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateType {
    Deleted,
    Added,
}

impl UpdateType {
    fn to_wire(self) -> u64 {
        match self {
            Self::Deleted => 0,
            Self::Added => 1,
        }
    }

    fn from_wire(raw: u64) -> io::Result<Self> {
        match raw {
            0 => Ok(Self::Deleted),
            1 => Ok(Self::Added),
            other => Err(invalid(format!("unknown refinement update type {other}"))),
        }
    }
}

/// A dataset window assignment for one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignBatch {
    pub batch_offset: u64,
    pub batch_size: u64,
    pub do_cross_validation: bool,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct RefinementWire {
    class_index: u64,
    update_type: u64,
    grid_version: u64,
    list_len: u64,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct MergeWire {
    class_index: u64,
    grid_version: u64,
    offset: u64,
    batch_size: u64,
    payload_len: u64,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct AssignBatchWire {
    batch_offset: u64,
    batch_size: u64,
    do_cross_validation: u64,
}

const REFINEMENT_HEADER: usize = size_of::<RefinementWire>();
const MERGE_HEADER: usize = size_of::<MergeWire>();

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn chunk_too_small(what: &str, capacity: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("payload capacity {capacity} cannot hold one {what}"),
    )
}

/// Validates a wire-carried list length against the chunk body. The
/// multiply is checked so that an absurd length fails the same way an
/// oversized one does instead of wrapping.
fn checked_list_bytes(what: &str, len: usize, elem_bytes: usize, body: &[u8]) -> io::Result<usize> {
    match len.checked_mul(elem_bytes) {
        Some(bytes) if bytes <= body.len() => Ok(bytes),
        _ => Err(invalid(format!("{what} length {len} exceeds chunk body"))),
    }
}

/// Encodes one chunk of deleted point indices.
///
/// # Returns
/// How many indices of `deleted` were consumed; the caller re-invokes
/// with the remainder until the list is exhausted.
pub fn encode_deleted_chunk(
    payload: &mut [u8],
    class_index: u64,
    grid_version: u64,
    deleted: &[u64],
) -> io::Result<usize> {
    debug_assert!(!deleted.is_empty());
    let (header, body) = split_header_mut(payload, REFINEMENT_HEADER)?;
    let count = pack::pack_scalars(body, deleted);
    if count == 0 {
        return Err(chunk_too_small("deleted point index", payload.len()));
    }
    let wire = RefinementWire {
        class_index,
        update_type: UpdateType::Deleted.to_wire(),
        grid_version,
        list_len: count as u64,
    };
    header.copy_from_slice(bytemuck::bytes_of(&wire));
    Ok(count)
}

/// Encodes one chunk of added grid points, `dims` pairs per point.
///
/// # Returns
/// How many whole points of `pairs` were consumed.
pub fn encode_added_chunk(
    payload: &mut [u8],
    class_index: u64,
    grid_version: u64,
    dims: usize,
    pairs: &[LevelIndexPair],
) -> io::Result<usize> {
    debug_assert!(!pairs.is_empty());
    let (header, body) = split_header_mut(payload, REFINEMENT_HEADER)?;
    let count = pack::pack_points(body, pairs, dims);
    if count == 0 {
        return Err(chunk_too_small("grid point", payload.len()));
    }
    let wire = RefinementWire {
        class_index,
        update_type: UpdateType::Added.to_wire(),
        grid_version,
        list_len: count as u64,
    };
    header.copy_from_slice(bytemuck::bytes_of(&wire));
    Ok(count)
}

/// A decoded refinement chunk, borrowing its list body from the envelope.
#[derive(Debug)]
pub struct RefinementView<'a> {
    pub class_index: u64,
    pub update_type: UpdateType,
    pub grid_version: u64,
    pub list_len: usize,
    body: &'a [u8],
}

impl<'a> RefinementView<'a> {
    /// The deleted point indices carried by this chunk.
    pub fn deleted(&self) -> io::Result<&'a [u64]> {
        if self.update_type != UpdateType::Deleted {
            return Err(invalid("refinement chunk is not a deleted list".into()));
        }
        let bytes = checked_list_bytes("deleted list", self.list_len, size_of::<u64>(), self.body)?;
        bytemuck::try_cast_slice(&self.body[..bytes]).map_err(|e| invalid(e.to_string()))
    }

    /// The added point pairs carried by this chunk, flat, `dims` per point.
    pub fn added(&self, dims: usize) -> io::Result<&'a [LevelIndexPair]> {
        if self.update_type != UpdateType::Added {
            return Err(invalid("refinement chunk is not an added list".into()));
        }
        let bytes = checked_list_bytes(
            "added list",
            self.list_len,
            dims * size_of::<LevelIndexPair>(),
            self.body,
        )?;
        bytemuck::try_cast_slice(&self.body[..bytes]).map_err(|e| invalid(e.to_string()))
    }
}

pub fn decode_refinement(payload: &[u8]) -> io::Result<RefinementView<'_>> {
    let (header, body) = split_header(payload, REFINEMENT_HEADER)?;
    let wire: RefinementWire = bytemuck::pod_read_unaligned(header);
    Ok(RefinementView {
        class_index: wire.class_index,
        update_type: UpdateType::from_wire(wire.update_type)?,
        grid_version: wire.grid_version,
        list_len: wire.list_len as usize,
        body,
    })
}

/// Encodes one coefficient chunk at `offset` into the class vector.
///
/// # Returns
/// How many coefficients of `coefficients` were consumed.
pub fn encode_merge_chunk(
    payload: &mut [u8],
    class_index: u64,
    grid_version: u64,
    batch_size: u64,
    offset: u64,
    coefficients: &[f64],
) -> io::Result<usize> {
    debug_assert!(!coefficients.is_empty());
    let (header, body) = split_header_mut(payload, MERGE_HEADER)?;
    let count = pack::pack_scalars(body, coefficients);
    if count == 0 {
        return Err(chunk_too_small("coefficient", payload.len()));
    }
    let wire = MergeWire {
        class_index,
        grid_version,
        offset,
        batch_size,
        payload_len: count as u64,
    };
    header.copy_from_slice(bytemuck::bytes_of(&wire));
    Ok(count)
}

/// A decoded coefficient chunk, borrowing its values from the envelope.
#[derive(Debug)]
pub struct MergeView<'a> {
    pub class_index: u64,
    pub grid_version: u64,
    pub offset: u64,
    pub batch_size: u64,
    pub values: &'a [f64],
}

pub fn decode_merge(payload: &[u8]) -> io::Result<MergeView<'_>> {
    let (header, body) = split_header(payload, MERGE_HEADER)?;
    let wire: MergeWire = bytemuck::pod_read_unaligned(header);
    let bytes = checked_list_bytes(
        "coefficient chunk",
        wire.payload_len as usize,
        size_of::<f64>(),
        body,
    )?;
    let values = bytemuck::try_cast_slice(&body[..bytes]).map_err(|e| invalid(e.to_string()))?;
    Ok(MergeView {
        class_index: wire.class_index,
        grid_version: wire.grid_version,
        offset: wire.offset,
        batch_size: wire.batch_size,
        values,
    })
}

pub fn encode_assign_batch(payload: &mut [u8], msg: &AssignBatch) -> io::Result<()> {
    let wire = AssignBatchWire {
        batch_offset: msg.batch_offset,
        batch_size: msg.batch_size,
        do_cross_validation: msg.do_cross_validation as u64,
    };
    let (header, _) = split_header_mut(payload, size_of::<AssignBatchWire>())?;
    header.copy_from_slice(bytemuck::bytes_of(&wire));
    Ok(())
}

pub fn decode_assign_batch(payload: &[u8]) -> io::Result<AssignBatch> {
    let (header, _) = split_header(payload, size_of::<AssignBatchWire>())?;
    let wire: AssignBatchWire = bytemuck::pod_read_unaligned(header);
    let do_cross_validation = match wire.do_cross_validation {
        0 => false,
        1 => true,
        other => return Err(invalid(format!("invalid cross-validation flag {other}"))),
    };
    Ok(AssignBatch {
        batch_offset: wire.batch_offset,
        batch_size: wire.batch_size,
        do_cross_validation,
    })
}

fn split_header(payload: &[u8], header: usize) -> io::Result<(&[u8], &[u8])> {
    if payload.len() < header {
        return Err(invalid(format!(
            "payload of {} bytes is shorter than the {header} byte message header",
            payload.len()
        )));
    }
    Ok(payload.split_at(header))
}

fn split_header_mut(payload: &mut [u8], header: usize) -> io::Result<(&mut [u8], &mut [u8])> {
    if payload.len() < header {
        return Err(invalid(format!(
            "payload of {} bytes is shorter than the {header} byte message header",
            payload.len()
        )));
    }
    Ok(payload.split_at_mut(header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{CommandKind, Envelope};

    #[test]
    fn merge_chunks_split_at_four_doubles() {
        let coefficients: Vec<f64> = (0..10).map(|i| i as f64 * 1.5).collect();
        let capacity = MERGE_HEADER + 4 * size_of::<f64>();

        let mut env = Envelope::for_command(CommandKind::MergeGrid);
        let mut offset = 0usize;
        let mut chunks = Vec::new();
        while offset < coefficients.len() {
            let n = encode_merge_chunk(
                &mut env.payload_mut()[..capacity],
                2,
                7,
                100,
                offset as u64,
                &coefficients[offset..],
            )
            .unwrap();
            let view = decode_merge(&env.payload()[..capacity]).unwrap();
            chunks.push((view.offset, view.values.to_vec()));
            offset += n;
        }

        let lens: Vec<usize> = chunks.iter().map(|(_, v)| v.len()).collect();
        let offsets: Vec<u64> = chunks.iter().map(|(o, _)| *o).collect();
        assert_eq!(lens, [4, 4, 2]);
        assert_eq!(offsets, [0, 4, 8]);

        // Applying the chunks in any order rebuilds the original vector.
        chunks.reverse();
        let mut rebuilt = vec![0.0; coefficients.len()];
        for (off, values) in &chunks {
            rebuilt[*off as usize..*off as usize + values.len()].copy_from_slice(values);
        }
        assert_eq!(rebuilt, coefficients);
    }

    #[test]
    fn merge_view_carries_version_and_weight() {
        let mut env = Envelope::for_command(CommandKind::MergeGrid);
        encode_merge_chunk(env.payload_mut(), 1, 42, 500, 16, &[3.0, 4.0]).unwrap();
        let view = decode_merge(env.payload()).unwrap();
        assert_eq!(view.class_index, 1);
        assert_eq!(view.grid_version, 42);
        assert_eq!(view.offset, 16);
        assert_eq!(view.batch_size, 500);
        assert_eq!(view.values, [3.0, 4.0]);
    }

    #[test]
    fn deleted_chunk_roundtrip() {
        let mut env = Envelope::for_command(CommandKind::UpdateGrid);
        let deleted = [4u64, 9, 17];
        let n = encode_deleted_chunk(env.payload_mut(), 0, 3, &deleted).unwrap();
        assert_eq!(n, 3);

        let view = decode_refinement(env.payload()).unwrap();
        assert_eq!(view.update_type, UpdateType::Deleted);
        assert_eq!(view.grid_version, 3);
        assert_eq!(view.deleted().unwrap(), deleted);
        assert!(view.added(2).is_err());
    }

    #[test]
    fn added_chunk_respects_point_boundaries() {
        let dims = 3;
        let pairs: Vec<LevelIndexPair> = (0..5 * dims as u64)
            .map(|i| LevelIndexPair { level: i, index: i })
            .collect();
        // Room for exactly two whole points.
        let capacity = REFINEMENT_HEADER + 2 * dims * size_of::<LevelIndexPair>();

        let mut env = Envelope::for_command(CommandKind::UpdateGrid);
        let n = encode_added_chunk(&mut env.payload_mut()[..capacity], 1, 5, dims, &pairs).unwrap();
        assert_eq!(n, 2);

        let view = decode_refinement(&env.payload()[..capacity]).unwrap();
        assert_eq!(view.list_len, 2);
        assert_eq!(view.added(dims).unwrap(), &pairs[..2 * dims]);
    }

    #[test]
    fn assign_batch_roundtrip() {
        let mut env = Envelope::for_command(CommandKind::AssignBatch);
        let msg = AssignBatch {
            batch_offset: 1000,
            batch_size: 250,
            do_cross_validation: true,
        };
        encode_assign_batch(env.payload_mut(), &msg).unwrap();
        assert_eq!(decode_assign_batch(env.payload()).unwrap(), msg);
    }

    #[test]
    fn oversized_list_length_is_rejected() {
        let mut env = Envelope::for_command(CommandKind::UpdateGrid);
        encode_deleted_chunk(env.payload_mut(), 0, 1, &[1, 2, 3]).unwrap();
        // Corrupt the list length beyond the body.
        let wire = RefinementWire {
            class_index: 0,
            update_type: 0,
            grid_version: 1,
            list_len: u64::MAX / 16,
        };
        env.payload_mut()[..REFINEMENT_HEADER].copy_from_slice(bytemuck::bytes_of(&wire));
        let view = decode_refinement(env.payload()).unwrap();
        assert!(view.deleted().is_err());
    }

    #[test]
    fn overflowing_list_length_is_rejected_not_wrapped() {
        // A length whose byte count overflows usize must fail like any
        // other oversized length, never wrap to a small count.
        let mut env = Envelope::for_command(CommandKind::UpdateGrid);
        encode_deleted_chunk(env.payload_mut(), 0, 1, &[1, 2, 3]).unwrap();
        let wire = RefinementWire {
            class_index: 0,
            update_type: 0,
            grid_version: 1,
            list_len: 1 << 61,
        };
        env.payload_mut()[..REFINEMENT_HEADER].copy_from_slice(bytemuck::bytes_of(&wire));
        assert!(decode_refinement(env.payload()).unwrap().deleted().is_err());

        let mut env = Envelope::for_command(CommandKind::MergeGrid);
        encode_merge_chunk(env.payload_mut(), 0, 0, 1, 0, &[1.0]).unwrap();
        let wire = MergeWire {
            class_index: 0,
            grid_version: 0,
            offset: 0,
            batch_size: 1,
            payload_len: 1 << 61,
        };
        env.payload_mut()[..MERGE_HEADER].copy_from_slice(bytemuck::bytes_of(&wire));
        assert!(decode_merge(env.payload()).is_err());
    }

    #[test]
    fn chunk_capacity_below_one_element_is_an_error() {
        let mut env = Envelope::for_command(CommandKind::MergeGrid);
        let capacity = MERGE_HEADER + 4;
        let err = encode_merge_chunk(&mut env.payload_mut()[..capacity], 0, 0, 1, 0, &[1.0]);
        assert!(err.is_err());
    }
}
