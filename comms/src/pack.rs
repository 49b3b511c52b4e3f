//! Greedy packing of unbounded sequences into fixed-capacity buffers.
//!
//! Both packers copy maximal whole elements and report how many were
//! consumed, so a caller can advance its cursor and emit another envelope
//! for the remainder. Neither ever writes past `dst`.

use bytemuck::Pod;

use crate::msg::LevelIndexPair;

/// Copies as many whole `T` values from `src` into `dst` as fit.
///
/// # Returns
/// The number of elements copied. Zero only when `src` is empty or `dst`
/// cannot hold a single element.
pub fn pack_scalars<T: Pod>(dst: &mut [u8], src: &[T]) -> usize {
    let elem = size_of::<T>();
    let count = (dst.len() / elem).min(src.len());
    if count == 0 {
        return 0;
    }
    dst[..count * elem].copy_from_slice(bytemuck::cast_slice(&src[..count]));
    count
}

/// Copies as many whole grid points from `pairs` into `dst` as fit.
///
/// `pairs` is a flat run of `(level, index)` pairs, `dims` per point;
/// points are never split across buffers.
///
/// # Returns
/// The number of whole points copied.
pub fn pack_points(dst: &mut [u8], pairs: &[LevelIndexPair], dims: usize) -> usize {
    debug_assert!(dims > 0);
    debug_assert_eq!(pairs.len() % dims, 0);

    let point_bytes = dims * size_of::<LevelIndexPair>();
    let count = (dst.len() / point_bytes).min(pairs.len() / dims);
    if count == 0 {
        return 0;
    }
    let bytes = bytemuck::cast_slice(&pairs[..count * dims]);
    dst[..count * point_bytes].copy_from_slice(bytes);
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(level: u64, dims: usize) -> Vec<LevelIndexPair> {
        (0..dims as u64)
            .map(|d| LevelIndexPair {
                level,
                index: 2 * level + d,
            })
            .collect()
    }

    #[test]
    fn scalars_fill_greedily_with_cursor() {
        let src: Vec<u64> = (0..5).collect();
        // Room for exactly two u64 values per chunk.
        let mut dst = [0u8; 16];

        let mut cursor = 0;
        let mut counts = Vec::new();
        let mut reassembled: Vec<u64> = Vec::new();
        while cursor < src.len() {
            let n = pack_scalars(&mut dst, &src[cursor..]);
            counts.push(n);
            reassembled.extend(bytemuck::pod_collect_to_vec::<u8, u64>(&dst[..n * 8]));
            cursor += n;
        }

        assert_eq!(counts, [2, 2, 1]);
        assert_eq!(reassembled, src);
    }

    #[test]
    fn scalars_never_overrun_an_odd_capacity() {
        let src = [1.0f64, 2.0, 3.0];
        let mut dst = [0xFFu8; 23];
        let n = pack_scalars(&mut dst, &src);
        assert_eq!(n, 2);
        // The trailing partial slot is untouched.
        assert!(dst[16..].iter().all(|b| *b == 0xFF));
    }

    #[test]
    fn capacity_below_one_element_copies_nothing() {
        let src = [7.0f64];
        let mut dst = [0u8; 7];
        assert_eq!(pack_scalars(&mut dst, &src), 0);
    }

    #[test]
    fn points_pack_two_per_chunk() {
        // Five 3-dimensional points, capacity for exactly two per chunk.
        let dims = 3;
        let pairs: Vec<LevelIndexPair> = (0..5).flat_map(|p| point(p, dims)).collect();
        let mut dst = vec![0u8; 2 * dims * size_of::<LevelIndexPair>()];

        let mut cursor = 0;
        let mut counts = Vec::new();
        let mut reassembled: Vec<LevelIndexPair> = Vec::new();
        while cursor < pairs.len() {
            let n = pack_points(&mut dst, &pairs[cursor..], dims);
            counts.push(n);
            let copied = bytemuck::pod_collect_to_vec::<u8, LevelIndexPair>(&dst[..n * dims * 16]);
            reassembled.extend(copied);
            cursor += n * dims;
        }

        assert_eq!(counts, [2, 2, 1]);
        assert_eq!(reassembled, pairs);
    }

    #[test]
    fn points_are_never_split() {
        let dims = 3;
        let pairs: Vec<LevelIndexPair> = (0..2).flat_map(|p| point(p, dims)).collect();
        // Capacity for one point plus half of the next.
        let mut dst = vec![0u8; dims * 16 + 24];
        assert_eq!(pack_points(&mut dst, &pairs, dims), 1);
    }
}
