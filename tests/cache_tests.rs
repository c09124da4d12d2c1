#[cfg(test)]
mod unit_tests {
    use paged_view::{CacheBox, CacheMode, FetchResult, SourceError};
    use serial_test::serial;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use std::thread;

    static FETCH_CALLS: AtomicUsize = AtomicUsize::new(0);
    static TRANSFORM_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn reset_counters() {
        FETCH_CALLS.store(0, Ordering::SeqCst);
        TRANSFORM_CALLS.store(0, Ordering::SeqCst);
    }

    fn fetch_page() -> FetchResult<Vec<u32>> {
        let call = FETCH_CALLS.fetch_add(1, Ordering::SeqCst) as u32;
        Ok(vec![call, call + 1, call + 2])
    }

    fn double_page(page: Vec<u32>) -> FetchResult<Vec<u32>> {
        TRANSFORM_CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(page.into_iter().map(|n| n * 2).collect())
    }

    #[test]
    #[serial]
    fn test_auto_value_is_idempotent() {
        println!("== Auto Idempotence ==");
        reset_counters();
        let cache = CacheBox::with_transform(fetch_page, double_page, CacheMode::Auto).unwrap();
        let first = cache.value().unwrap();
        let second = cache.value().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(FETCH_CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(TRANSFORM_CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(*first, vec![0, 2, 4]);
    }

    #[test]
    #[serial]
    fn test_manual_skips_transform() {
        reset_counters();
        let cache = CacheBox::with_transform(fetch_page, double_page, CacheMode::Manual).unwrap();
        let first = cache.value().unwrap();
        let second = cache.value().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(FETCH_CALLS.load(Ordering::SeqCst), 2);
        assert_eq!(TRANSFORM_CALLS.load(Ordering::SeqCst), 0);
        assert_eq!(*second, vec![1, 2, 3]);
    }

    #[test]
    #[serial]
    fn test_invalidate_then_read_refetches() {
        reset_counters();
        let cache = CacheBox::new(fetch_page, CacheMode::Auto).unwrap();
        let before = cache.value().unwrap();
        cache.invalidate().unwrap();
        assert!(!cache.is_cached());
        let after = cache.value().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(FETCH_CALLS.load(Ordering::SeqCst), 2);
        assert_eq!(cache.reloads(), 2);
    }

    #[test]
    #[serial]
    fn test_suspend_scope_law() {
        println!("== Suspend Scope ==");
        reset_counters();
        let cache = CacheBox::new(fetch_page, CacheMode::AutoWithPrefetch).unwrap();
        assert_eq!(FETCH_CALLS.load(Ordering::SeqCst), 1);

        let guard = cache.suspend_auto_refresh();
        for _ in 0..5 {
            cache.invalidate().unwrap();
        }
        assert_eq!(FETCH_CALLS.load(Ordering::SeqCst), 1);
        assert!(cache.stats().is_suspended());
        guard.release().unwrap();

        assert_eq!(FETCH_CALLS.load(Ordering::SeqCst), 2);
        assert!(cache.is_cached());
        assert!(!cache.is_suspended());
    }

    #[test]
    #[serial]
    fn test_suspend_on_auto_mode_still_reloads_once() {
        reset_counters();
        let cache = CacheBox::new(fetch_page, CacheMode::Auto).unwrap();
        {
            let _guard = cache.suspend_auto_refresh();
            cache.invalidate().unwrap();
        }
        assert_eq!(FETCH_CALLS.load(Ordering::SeqCst), 1);
        assert!(cache.is_cached());
    }

    #[test]
    #[serial]
    fn test_guard_drop_swallows_reload_error() {
        let fail = Arc::new(AtomicUsize::new(0));
        let fail_clone = Arc::clone(&fail);
        let cache = CacheBox::new(
            move || {
                if fail_clone.load(Ordering::SeqCst) > 0 {
                    return Err(SourceError::msg("fetch", "backend down"));
                }
                Ok(1u32)
            },
            CacheMode::AutoWithPrefetch,
        )
        .unwrap();
        {
            let _guard = cache.suspend_auto_refresh();
            fail.store(1, Ordering::SeqCst);
            cache.invalidate().unwrap();
        }
        assert!(!cache.is_cached());
        assert_eq!(cache.suspend_depth(), 0);

        let guard = cache.suspend_auto_refresh();
        let err = guard.release().unwrap_err();
        assert!(err.is_source());
        assert_eq!(err.to_string(), "fetch: backend down");
    }

    #[test]
    #[serial]
    fn test_set_mode_changes_behaviour() {
        reset_counters();
        let cache = CacheBox::new(fetch_page, CacheMode::Manual).unwrap();
        cache.value().unwrap();
        assert!(!cache.is_cached());
        cache.set_mode(CacheMode::Auto);
        cache.value().unwrap();
        assert!(cache.is_cached());
        cache.set_mode(CacheMode::AutoWithPrefetch).invalidate().unwrap();
        assert!(cache.is_cached());
        assert_eq!(FETCH_CALLS.load(Ordering::SeqCst), 3);
    }

    #[test]
    #[serial]
    fn test_concurrent_readers_share_value() {
        reset_counters();
        let cache = Arc::new(CacheBox::new(fetch_page, CacheMode::Auto).unwrap());
        cache.ensure_cached().unwrap();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    (0..100)
                        .map(|_| cache.value().unwrap())
                        .all(|page| *page == vec![0, 1, 2])
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(FETCH_CALLS.load(Ordering::SeqCst), 1);
    }
}
