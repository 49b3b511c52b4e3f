use comms::envelope::{CommandKind, Envelope, PAYLOAD_BYTES};
use comms::msg::{self, LevelIndexPair, UpdateType};

// A diff larger than one envelope: chunked send, reassembled receive.
#[test]
fn refinement_diff_survives_envelope_chunking() {
    let dims = 3;
    let points: Vec<LevelIndexPair> = (0..41 * dims as u64)
        .map(|i| LevelIndexPair {
            level: i / dims as u64 + 1,
            index: i,
        })
        .collect();
    let deleted: Vec<u64> = (0..300).map(|i| i * 3).collect();
    assert!(points.len() * size_of::<LevelIndexPair>() > PAYLOAD_BYTES);
    assert!(deleted.len() * size_of::<u64>() > PAYLOAD_BYTES);

    let mut wire: Vec<Envelope> = Vec::new();

    let mut rest = deleted.as_slice();
    while !rest.is_empty() {
        let mut env = Envelope::for_command(CommandKind::UpdateGrid);
        let n = msg::encode_deleted_chunk(env.payload_mut(), 1, 9, rest).unwrap();
        rest = &rest[n..];
        wire.push(env);
    }
    assert!(wire.len() > 1);

    let mut rest = points.as_slice();
    while !rest.is_empty() {
        let mut env = Envelope::for_command(CommandKind::UpdateGrid);
        let n = msg::encode_added_chunk(env.payload_mut(), 1, 9, dims, rest).unwrap();
        rest = &rest[n * dims..];
        wire.push(env);
    }

    let mut got_deleted = Vec::new();
    let mut got_points = Vec::new();
    for env in &wire {
        assert_eq!(env.kind().unwrap(), CommandKind::UpdateGrid);
        let view = msg::decode_refinement(env.payload()).unwrap();
        assert_eq!(view.class_index, 1);
        assert_eq!(view.grid_version, 9);
        match view.update_type {
            UpdateType::Deleted => got_deleted.extend_from_slice(view.deleted().unwrap()),
            UpdateType::Added => got_points.extend_from_slice(view.added(dims).unwrap()),
        }
    }

    assert_eq!(got_deleted, deleted);
    assert_eq!(got_points, points);
}

#[test]
fn coefficient_vector_survives_out_of_order_merge() {
    let coefficients: Vec<f64> = (0..400).map(|i| (i as f64).sin()).collect();

    let mut wire = Vec::new();
    let mut offset = 0usize;
    while offset < coefficients.len() {
        let mut env = Envelope::for_command(CommandKind::MergeGrid);
        let n = msg::encode_merge_chunk(
            env.payload_mut(),
            0,
            4,
            128,
            offset as u64,
            &coefficients[offset..],
        )
        .unwrap();
        offset += n;
        wire.push(env);
    }
    assert!(wire.len() > 2);

    // Apply last-to-first; explicit offsets make order irrelevant.
    let mut rebuilt = vec![0.0f64; coefficients.len()];
    for env in wire.iter().rev() {
        let view = msg::decode_merge(env.payload()).unwrap();
        let at = view.offset as usize;
        rebuilt[at..at + view.values.len()].copy_from_slice(view.values);
    }

    assert_eq!(rebuilt, coefficients);
}
