//! Meta pool: the per-stream owner of both struct signature scopes

use super::clock::{Clock, CoarseClock};
use super::config::MetaPoolConfig;
use super::signature::StructSignature;
use super::slot_table::{Registration, Scope, SlotTable, TableStats};
use crate::error::{Error, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Struct metadata pool for one encoding stream
///
/// Owns the context table (kept across batches, bounded by `capacity`), the
/// transient table (dropped at every batch boundary) and the clock used to
/// stamp registrations. Not synchronized: the owning stream serializes all
/// calls.
pub struct MetaPool {
    context: SlotTable,
    transient: SlotTable,
    capacity: usize,
    clock: Arc<dyn Clock>,
    resets: u64,
}

impl MetaPool {
    /// Create a pool with its own [`CoarseClock`] at the default interval
    ///
    /// # Arguments
    /// * `capacity` - Maximum context entries kept across a `reset()`; must be positive
    pub fn new(capacity: usize) -> Result<Self> {
        Self::check_capacity(capacity)?;
        let clock = CoarseClock::with_default_interval()?;
        Self::with_clock(capacity, Arc::new(clock))
    }

    /// Create a pool driven by an injected clock
    pub fn with_clock(capacity: usize, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::check_capacity(capacity)?;

        info!(capacity, "Creating struct meta pool");

        Ok(Self {
            context: SlotTable::new(Scope::Context),
            transient: SlotTable::new(Scope::Transient),
            capacity,
            clock,
            resets: 0,
        })
    }

    /// Create a pool from configuration, with a [`CoarseClock`] at the
    /// configured interval
    pub fn from_config(config: &MetaPoolConfig) -> Result<Self> {
        config.validate()?;
        let clock = CoarseClock::new(config.clock_interval())?;
        Self::with_clock(config.context_capacity, Arc::new(clock))
    }

    fn check_capacity(capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(Error::InvalidConfiguration(
                "context capacity must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }

    /// Register a struct shape that should persist across batches
    ///
    /// Fails with `NullArgument` if `fields` is absent; nothing is allocated
    /// in that case.
    pub fn register_context_struct<S: AsRef<str>>(&mut self, fields: Option<&[S]>) -> Result<u64> {
        self.register_context_struct_outcome(fields).map(|reg| reg.id)
    }

    /// Register a struct shape that only lives until the next `reset()`
    pub fn register_transient_struct<S: AsRef<str>>(&mut self, fields: Option<&[S]>) -> Result<u64> {
        self.register_transient_struct_outcome(fields).map(|reg| reg.id)
    }

    /// Like [`register_context_struct`](Self::register_context_struct), also
    /// reporting whether the id is new to the stream
    pub fn register_context_struct_outcome<S: AsRef<str>>(
        &mut self,
        fields: Option<&[S]>,
    ) -> Result<Registration> {
        let signature = StructSignature::from_optional(fields)?;
        let tick = self.clock.tick();
        Ok(self.context.register(signature, tick))
    }

    /// Like [`register_transient_struct`](Self::register_transient_struct),
    /// also reporting whether the id is new to the current batch
    pub fn register_transient_struct_outcome<S: AsRef<str>>(
        &mut self,
        fields: Option<&[S]>,
    ) -> Result<Registration> {
        let signature = StructSignature::from_optional(fields)?;
        let tick = self.clock.tick();
        Ok(self.transient.register(signature, tick))
    }

    /// Close the current batch
    ///
    /// Evicts the least recently used context entries beyond the capacity,
    /// then drops the whole transient scope.
    pub fn reset(&mut self) {
        let evicted = self.context.evict(self.capacity);
        let cleared = self.transient.clear();
        self.resets += 1;

        debug!(
            evicted = evicted.len(),
            cleared,
            context = self.context.len(),
            "Meta pool reset"
        );
    }

    /// Signature addressed by `id`
    ///
    /// Scope comes from parity alone: `0` is the empty signature, odd ids
    /// address the context table, even ids the transient table.
    pub fn resolve(&self, id: u64) -> Option<StructSignature> {
        match Scope::of(id) {
            None => Some(StructSignature::empty()),
            Some(Scope::Context) => self.context.resolve(id).cloned(),
            Some(Scope::Transient) => self.transient.resolve(id).cloned(),
        }
    }

    /// Number of resident context entries
    pub fn context_len(&self) -> usize {
        self.context.len()
    }

    /// Number of resident transient entries
    pub fn transient_len(&self) -> usize {
        self.transient.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn context_table(&self) -> &SlotTable {
        &self.context
    }

    pub fn transient_table(&self) -> &SlotTable {
        &self.transient
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.capacity,
            resets: self.resets,
            context: self.context.stats(),
            transient: self.transient.stats(),
        }
    }
}

impl std::fmt::Debug for MetaPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaPool")
            .field("capacity", &self.capacity)
            .field("context", &self.context.len())
            .field("transient", &self.transient.len())
            .field("resets", &self.resets)
            .finish()
    }
}

/// Meta pool statistics
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    pub capacity: usize,
    pub resets: u64,
    pub context: TableStats,
    pub transient: TableStats,
}

impl PoolStats {
    /// Fraction of registrations answered from either table
    pub fn hit_rate(&self) -> f64 {
        let hits = self.context.hits + self.transient.hits;
        let total = hits + self.context.misses + self.transient.misses;
        if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::clock::ManualClock;
    use crate::meta::slot_table::EMPTY_STRUCT_ID;

    const NONE: Option<&[&str]> = None;

    fn pool(capacity: usize) -> (MetaPool, ManualClock) {
        let clock = ManualClock::new();
        let pool = MetaPool::with_clock(capacity, Arc::new(clock.clone())).unwrap();
        (pool, clock)
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = MetaPool::with_clock(0, Arc::new(ManualClock::new())).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));

        let err = MetaPool::new(0).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn test_absent_fields_leave_pool_untouched() {
        let (mut pool, _) = pool(16);

        let err = pool.register_context_struct(NONE).unwrap_err();
        assert!(matches!(err, Error::NullArgument(_)));
        let err = pool.register_transient_struct(NONE).unwrap_err();
        assert!(matches!(err, Error::NullArgument(_)));

        let stats = pool.stats();
        assert_eq!(stats.context.resident, 0);
        assert_eq!(stats.context.next_rank, 1);
        assert_eq!(stats.context.misses, 0);
        assert_eq!(stats.transient.next_rank, 1);

        assert_eq!(pool.register_context_struct(Some(&["a"][..])).unwrap(), 3);
    }

    #[test]
    fn test_outcome_reports_first_occurrence() -> Result<()> {
        let (mut pool, _) = pool(16);

        let first = pool.register_context_struct_outcome(Some(&["id", "name"][..]))?;
        assert!(first.is_new);
        let second = pool.register_context_struct_outcome(Some(&["id", "name"][..]))?;
        assert!(!second.is_new);
        assert_eq!(first.id, second.id);

        let tmp = pool.register_transient_struct_outcome(Some(&["id", "name"][..]))?;
        assert!(tmp.is_new);
        assert_eq!(tmp.id, 2);
        Ok(())
    }

    #[test]
    fn test_same_shape_in_both_scopes() -> Result<()> {
        let (mut pool, _) = pool(16);

        let cxt = pool.register_context_struct(Some(&["id"][..]))?;
        let tmp = pool.register_transient_struct(Some(&["id"][..]))?;
        assert_eq!(cxt, 3);
        assert_eq!(tmp, 2);
        assert_eq!(pool.context_len(), 1);
        assert_eq!(pool.transient_len(), 1);
        Ok(())
    }

    #[test]
    fn test_resolve_by_parity() -> Result<()> {
        let (mut pool, _) = pool(16);

        let cxt = pool.register_context_struct(Some(&["id", "name"][..]))?;
        let tmp = pool.register_transient_struct(Some(&["x", "y", "z"][..]))?;

        assert_eq!(pool.resolve(0), Some(StructSignature::empty()));
        assert_eq!(pool.resolve(cxt), Some(StructSignature::new(&["id", "name"])));
        assert_eq!(pool.resolve(tmp), Some(StructSignature::new(&["x", "y", "z"])));
        assert_eq!(pool.resolve(99), None);

        pool.reset();
        assert_eq!(pool.resolve(tmp), None);
        assert_eq!(pool.resolve(cxt), Some(StructSignature::new(&["id", "name"])));
        Ok(())
    }

    #[test]
    fn test_reset_on_empty_pool() {
        let (mut pool, _) = pool(1);
        pool.reset();
        pool.reset();

        let stats = pool.stats();
        assert_eq!(stats.resets, 2);
        assert_eq!(stats.context.resident, 0);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_reset_respects_capacity() -> Result<()> {
        let (mut pool, clock) = pool(3);

        for i in 0..10 {
            clock.advance(1);
            pool.register_context_struct(Some(&[format!("f{}", i)][..]))?;
            pool.register_transient_struct(Some(&[format!("t{}", i)][..]))?;
        }
        pool.reset();

        assert_eq!(pool.context_len(), 3);
        assert_eq!(pool.transient_len(), 0);
        // The three most recent survive
        for i in 7..10 {
            let id = pool.context_table().id_of(&StructSignature::new(&[format!("f{}", i)]));
            assert_eq!(id, Some(Scope::Context.id_for(i + 1)));
        }
        Ok(())
    }

    #[test]
    fn test_stats_hit_rate() -> Result<()> {
        let (mut pool, _) = pool(4);
        pool.register_context_struct(Some(&["a"][..]))?;
        pool.register_context_struct(Some(&["a"][..]))?;
        pool.register_transient_struct(Some(&["b"][..]))?;
        pool.register_transient_struct(Some(&["b"][..]))?;

        let stats = pool.stats();
        assert_eq!(stats.context.hits, 1);
        assert_eq!(stats.transient.hits, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
        assert_eq!(format!("{:?}", pool), "MetaPool { capacity: 4, context: 1, transient: 1, resets: 0 }");
        Ok(())
    }

    #[test]
    fn test_empty_id_constant() -> Result<()> {
        let (mut pool, _) = pool(2);
        let empty: &[&str] = &[];
        assert_eq!(pool.register_context_struct(Some(empty))?, EMPTY_STRUCT_ID);
        assert_eq!(pool.register_transient_struct(Some(empty))?, EMPTY_STRUCT_ID);
        assert_eq!(pool.context_len(), 0);
        Ok(())
    }
}
