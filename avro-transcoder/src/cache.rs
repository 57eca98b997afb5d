use crate::error::Result;
use crate::translator::{SchemaTranslator, TargetSchema};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use structured_record::{RecordSchema, SchemaHash};
use tracing::{debug, info, warn};

/// A cached derivation: the source schema is kept to verify hash hits
#[derive(Debug)]
struct CachedSchema {
    source: Arc<RecordSchema>,
    target: Arc<TargetSchema>,
}

/// Counters describing cache activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Translator invocations, failed ones included
    pub derivations: u64,
    /// Distinct schemas that landed in an already occupied hash bucket
    pub collisions: u64,
}

/// Memoizes Avro schema derivations per distinct source schema
///
/// Entries are keyed by the structural hash and confirmed by structural
/// equality, so a hash collision never serves the wrong schema. The cache
/// grows without bound and never evicts; drop it between unrelated jobs.
#[derive(Debug)]
pub struct SchemaCache {
    entries: DashMap<SchemaHash, Vec<CachedSchema>>,
    translator: Arc<dyn SchemaTranslator>,
    len: AtomicUsize,
    warn_threshold: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    derivations: AtomicU64,
    collisions: AtomicU64,
}

impl SchemaCache {
    pub fn new(translator: Arc<dyn SchemaTranslator>, warn_threshold: usize) -> Self {
        Self {
            entries: DashMap::new(),
            translator,
            len: AtomicUsize::new(0),
            warn_threshold,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            derivations: AtomicU64::new(0),
            collisions: AtomicU64::new(0),
        }
    }

    /// Returns the Avro schema for `source`, deriving it on first sight
    ///
    /// Derivation runs without holding any lock. When two threads race on a
    /// new schema, the first insert wins and both get the same instance.
    /// A failed derivation is not cached.
    pub fn resolve(&self, source: &Arc<RecordSchema>) -> Result<Arc<TargetSchema>> {
        self.resolve_hashed(source.fingerprint(), source)
    }

    pub(crate) fn resolve_hashed(
        &self,
        hash: SchemaHash,
        source: &Arc<RecordSchema>,
    ) -> Result<Arc<TargetSchema>> {
        if let Some(target) = self.lookup(hash, source) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(schema = %source.name(), hash = %hash, "schema cache hit");
            return Ok(target);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        self.derivations.fetch_add(1, Ordering::Relaxed);
        let derived = Arc::new(self.translator.translate(source)?);
        debug!(schema = %source.name(), hash = %hash, "derived Avro schema");

        let mut bucket = self.entries.entry(hash).or_default();
        if let Some(existing) = bucket.iter().find(|e| same_schema(&e.source, source)) {
            return Ok(Arc::clone(&existing.target));
        }
        if !bucket.is_empty() {
            self.collisions.fetch_add(1, Ordering::Relaxed);
            warn!(
                schema = %source.name(),
                hash = %hash,
                bucket_size = bucket.len(),
                "structural hash collision between distinct schemas"
            );
        }
        bucket.push(CachedSchema {
            source: Arc::clone(source),
            target: Arc::clone(&derived),
        });
        drop(bucket);

        let len = self.len.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            schema = %source.name(),
            hash = %hash,
            fingerprint = %derived.fingerprint(),
            cached = len,
            "cached new Avro schema"
        );
        if self.warn_threshold > 0 && len % self.warn_threshold == 0 {
            warn!(
                cached = len,
                "schema cache keeps growing; it never evicts, consider a fresh transcoder per job"
            );
        }

        Ok(derived)
    }

    /// Cached schema for `source`, without deriving
    pub fn get(&self, source: &RecordSchema) -> Option<Arc<TargetSchema>> {
        self.lookup(source.fingerprint(), source)
    }

    fn lookup(&self, hash: SchemaHash, source: &RecordSchema) -> Option<Arc<TargetSchema>> {
        self.entries.get(&hash).and_then(|bucket| {
            bucket
                .iter()
                .find(|e| same_schema(&e.source, source))
                .map(|e| Arc::clone(&e.target))
        })
    }

    /// Number of distinct source schemas cached
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            derivations: self.derivations.load(Ordering::Relaxed),
            collisions: self.collisions.load(Ordering::Relaxed),
        }
    }
}

fn same_schema(cached: &Arc<RecordSchema>, source: &RecordSchema) -> bool {
    std::ptr::eq(cached.as_ref(), source) || cached.as_ref() == source
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranscodeError;
    use crate::translator::AvroSchemaTranslator;
    use std::thread;
    use structured_record::{Field, Schema};

    /// Counts derivations and optionally fails them
    #[derive(Debug, Default)]
    struct CountingTranslator {
        calls: AtomicU64,
        fail_first: AtomicU64,
    }

    impl SchemaTranslator for CountingTranslator {
        fn translate(&self, schema: &RecordSchema) -> Result<TargetSchema> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self
                .fail_first
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(TranscodeError::SchemaParse("injected failure".to_string()));
            }
            AvroSchemaTranslator::new().translate(schema)
        }
    }

    fn schema(name: &str, field_type: Schema) -> Arc<RecordSchema> {
        Arc::new(RecordSchema::new(name, vec![Field::new("value", field_type)]).unwrap())
    }

    #[test]
    fn test_second_resolve_is_a_hit_with_same_instance() {
        let translator = Arc::new(CountingTranslator::default());
        let cache = SchemaCache::new(translator.clone(), 0);

        let first = cache.resolve(&schema("A", Schema::Int)).unwrap();
        // Structurally equal but a distinct allocation
        let second = cache.resolve(&schema("A", Schema::Int)).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(translator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                derivations: 1,
                collisions: 0
            }
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_schemas_get_distinct_entries() {
        let cache = SchemaCache::new(Arc::new(AvroSchemaTranslator::new()), 0);
        let a = cache.resolve(&schema("A", Schema::Int)).unwrap();
        let b = cache.resolve(&schema("A", Schema::Long)).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_colliding_hashes_keep_separate_entries() {
        let translator = Arc::new(CountingTranslator::default());
        let cache = SchemaCache::new(translator.clone(), 0);
        let shared = SchemaHash::from_u64(1);
        let ints = schema("A", Schema::Int);
        let strings = schema("B", Schema::String);

        let a = cache.resolve_hashed(shared, &ints).unwrap();
        let b = cache.resolve_hashed(shared, &strings).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), "A");
        assert_eq!(b.name(), "B");
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().collisions, 1);

        // Each schema keeps getting its own derivation out of the shared bucket
        let a_again = cache.resolve_hashed(shared, &schema("A", Schema::Int)).unwrap();
        let b_again = cache.resolve_hashed(shared, &schema("B", Schema::String)).unwrap();
        assert!(Arc::ptr_eq(&a, &a_again));
        assert!(Arc::ptr_eq(&b, &b_again));
        assert_eq!(translator.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 2,
                misses: 2,
                derivations: 2,
                collisions: 1
            }
        );
    }

    #[test]
    fn test_failed_derivation_is_not_cached() {
        let translator = Arc::new(CountingTranslator {
            calls: AtomicU64::new(0),
            fail_first: AtomicU64::new(1),
        });
        let cache = SchemaCache::new(translator.clone(), 0);
        let source = schema("A", Schema::Int);

        assert!(cache.resolve(&source).is_err());
        assert!(cache.is_empty());
        assert!(cache.get(&source).is_none());

        assert!(cache.resolve(&source).is_ok());
        assert_eq!(translator.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_resolution_yields_one_instance() {
        let cache = Arc::new(SchemaCache::new(Arc::new(AvroSchemaTranslator::new()), 0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.resolve(&schema("Shared", Schema::String)).unwrap())
            })
            .collect();
        let resolved: Vec<Arc<TargetSchema>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        for target in &resolved[1..] {
            assert!(Arc::ptr_eq(&resolved[0], target));
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_does_not_derive() {
        let translator = Arc::new(CountingTranslator::default());
        let cache = SchemaCache::new(translator.clone(), 0);
        assert!(cache.get(&schema("A", Schema::Int)).is_none());
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    }
}
