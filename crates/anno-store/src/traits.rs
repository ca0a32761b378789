use crate::error::{StoreError, StoreResult};

/// Flat key-value store keyed by `/`-joined path strings.
///
/// All implementations must satisfy these invariants:
/// - A missing key is reported as [`StoreError::NotFound`] by `get` and
///   `delete`; every other failure uses a different variant.
/// - Each call touches exactly one key and is atomic on its own.
/// - The store never interprets keys or values.
pub trait KvStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> StoreResult<Vec<u8>>;

    /// Write `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Remove `key`. Fails with `NotFound` if it does not exist.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Write `value` under `key` only if the key is absent.
    ///
    /// Fails with [`StoreError::AlreadyExists`] otherwise. The default
    /// implementation is a non-atomic get followed by put; backends that
    /// can do better override it.
    fn insert_new(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        match self.get(key) {
            Ok(_) => Err(StoreError::AlreadyExists { key: key.to_string() }),
            Err(e) if e.is_not_found() => self.put(key, value),
            Err(e) => Err(e),
        }
    }

    /// Check whether `key` exists.
    fn contains(&self, key: &str) -> StoreResult<bool> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Minimal backend relying on the default `insert_new`/`contains`.
    #[derive(Default)]
    struct PlainStore {
        map: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl KvStore for PlainStore {
        fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
            self.map
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or_else(|| StoreError::NotFound { key: key.into() })
        }

        fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
            self.map.lock().unwrap().insert(key.into(), value.to_vec());
            Ok(())
        }

        fn delete(&self, key: &str) -> StoreResult<()> {
            self.map
                .lock()
                .unwrap()
                .remove(key)
                .map(|_| ())
                .ok_or_else(|| StoreError::NotFound { key: key.into() })
        }
    }

    #[test]
    fn default_insert_new_refuses_existing_key() {
        let store = PlainStore::default();
        store.insert_new("a/b", b"one").unwrap();
        let err = store.insert_new("a/b", b"two").unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
        assert_eq!(store.get("a/b").unwrap(), b"one");
    }

    #[test]
    fn default_contains() {
        let store = PlainStore::default();
        assert!(!store.contains("a/b").unwrap());
        store.put("a/b", b"x").unwrap();
        assert!(store.contains("a/b").unwrap());
    }
}
