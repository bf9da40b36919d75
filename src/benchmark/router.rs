//! Record routing
//!
//! Maps the first field of every input row to a worker index so that all
//! rows sharing a key (e.g. the same host) land on the same worker. The hash
//! is FNV-1a (32-bit), which is stable across runs; repeated benchmarks over
//! the same input distribute load identically.

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a hash of `bytes`
#[inline]
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &b| {
        (hash ^ u32::from(b)).wrapping_mul(FNV_PRIME)
    })
}

/// Worker index in `[0, worker_count)` for a routing key.
///
/// `worker_count` must be non-zero; `WorkerPool::new` rejects empty pools
/// before any routing happens.
#[inline]
pub fn route(key: &str, worker_count: usize) -> usize {
    debug_assert!(worker_count > 0, "route() called with zero workers");
    (fnv1a_32(key.as_bytes()) as usize) % worker_count
}
