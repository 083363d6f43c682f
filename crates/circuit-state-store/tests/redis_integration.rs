//! Contract tests against a live Redis server
//!
//! Set `CIRCUIT_STATE_REDIS_URL` (e.g. `redis://127.0.0.1:6379`) to run them;
//! without it every test returns early.

#[cfg(test)]
mod tests {
    use circuit_state_store::{
        BucketIndex, CircuitStateStore, KeyTtl, KvBackend, RedisBackend, StateStorage,
        StoreConfig,
    };
    use redis::aio::ConnectionManager;
    use std::sync::Arc;

    async fn redis_store(test_name: &str) -> Option<CircuitStateStore<RedisBackend<ConnectionManager>>> {
        let url = std::env::var("CIRCUIT_STATE_REDIS_URL").ok()?;
        let client = redis::Client::open(url.as_str()).unwrap();
        let conn = ConnectionManager::new(client).await.unwrap();

        // Unique namespace per run so tests never see each other's keys
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let config = StoreConfig {
            key_prefix: format!("cst-{}-{}", test_name, nanos),
            ..StoreConfig::default()
        };
        Some(CircuitStateStore::with_config(RedisBackend::new(conn), config).unwrap())
    }

    #[tokio::test]
    async fn test_redis_buckets() {
        let Some(store) = redis_store("buckets").await else {
            return;
        };
        let index = BucketIndex::Int(17);

        assert_eq!(store.get_bucket("orders", 1, &index).await.unwrap(), None);

        store.reset_bucket("orders", 1, &index).await.unwrap();
        assert_eq!(store.get_bucket("orders", 1, &index).await.unwrap(), None);

        store.increment_bucket("orders", 1, &index).await.unwrap();
        store.increment_bucket("orders", 1, &index).await.unwrap();
        assert_eq!(store.get_bucket("orders", 1, &index).await.unwrap(), Some(2));

        let key = store.bucket_key("orders", 1, &index).unwrap();
        assert_eq!(store.backend().ttl(&key).await.unwrap(), KeyTtl::Persistent);

        store.reset_bucket("orders", 1, &index).await.unwrap();
        assert_eq!(store.get_bucket("orders", 1, &index).await.unwrap(), Some(0));
        match store.backend().ttl(&key).await.unwrap() {
            KeyTtl::Expires(secs) => assert!(secs > 0 && secs <= 120),
            other => panic!("expected an expiring bucket, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_redis_concurrent_increments() {
        let Some(store) = redis_store("incr").await else {
            return;
        };
        let store = Arc::new(store);
        let index = BucketIndex::from("slot");

        let mut handles = Vec::new();
        for _ in 0..100 {
            let store = store.clone();
            let index = index.clone();
            handles.push(tokio::spawn(async move {
                store.increment_bucket("orders", 2, &index).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.get_bucket("orders", 2, &index).await.unwrap(), Some(100));
    }

    #[tokio::test]
    async fn test_redis_circuit_flags() {
        let Some(store) = redis_store("flags").await else {
            return;
        };

        assert!(!store.is_circuit_open("orders").await.unwrap());

        store.open_circuit("orders", 5000).await.unwrap();
        assert!(store.is_circuit_open("orders").await.unwrap());
        assert!(!store.allow_single_test("orders", 5000).await.unwrap());

        let test_key = store.circuit_test_key("orders").unwrap();
        match store.backend().ttl(&test_key).await.unwrap() {
            KeyTtl::Expires(secs) => assert!(secs > 0 && secs <= 5),
            other => panic!("expected an expiring permit, got {:?}", other),
        }

        store.close_circuit("orders").await.unwrap();
        assert!(!store.is_circuit_open("orders").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_redis_single_test_race() {
        let Some(store) = redis_store("race").await else {
            return;
        };
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.allow_single_test("orders", 1000).await
            }));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 1);
    }
}
