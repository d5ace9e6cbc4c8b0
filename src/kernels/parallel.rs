use std::sync::OnceLock;

#[inline(always)]
pub(crate) fn should_parallelize(
    pixel_count: usize,
    min_pixels: usize,
    min_chunk_pixels: usize,
    max_workers: usize,
) -> bool {
    let workers = filter_workers(max_workers);
    if workers <= 1 {
        return false;
    }
    let min_chunk_total = min_chunk_pixels.saturating_mul(workers);
    pixel_count >= min_pixels.max(min_chunk_total)
}

/// Rows per parallel chunk, or `None` when the raster is too small to
/// split into at least two worthwhile chunks.
#[inline(always)]
pub(crate) fn chunk_rows(
    width: usize,
    height: usize,
    min_chunk_pixels: usize,
    max_workers: usize,
) -> Option<usize> {
    let workers = filter_workers(max_workers);
    let chunk_pixels = width.checked_mul(height)? / workers.max(1);

    if chunk_pixels < min_chunk_pixels {
        return None;
    }

    let rows = (chunk_pixels / width).max(1);
    if height.div_ceil(rows) < 2 {
        return None;
    }

    Some(rows)
}

#[inline]
pub(crate) fn filter_workers(max_workers: usize) -> usize {
    static WORKERS: OnceLock<usize> = OnceLock::new();
    (*WORKERS.get_or_init(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }))
    .min(max_workers.max(1))
}

/// Run `job` on a dedicated pool so filter work never competes with a
/// caller-installed global rayon pool. Falls back to the caller thread
/// when only one worker is available or pool creation fails.
#[inline]
pub(crate) fn install_filter_pool<F>(max_workers: usize, job: F)
where
    F: FnOnce() + Send,
{
    static POOL: OnceLock<Option<rayon::ThreadPool>> = OnceLock::new();
    if let Some(pool) = POOL
        .get_or_init(|| {
            let workers = filter_workers(max_workers);
            if workers <= 1 {
                return None;
            }
            rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .ok()
        })
        .as_ref()
    {
        pool.install(job);
    } else {
        job();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_rows_rejects_small_rasters() {
        assert_eq!(chunk_rows(64, 64, 65_536, 8), None);
    }

    #[test]
    fn chunk_rows_splits_into_at_least_two_chunks() {
        if let Some(rows) = chunk_rows(1920, 1080, 65_536, 8) {
            assert!(rows >= 1);
            assert!((1080usize).div_ceil(rows) >= 2);
        }
    }

    #[test]
    fn single_worker_cap_disables_parallelism() {
        assert!(!should_parallelize(usize::MAX, 0, 0, 1));
    }
}
