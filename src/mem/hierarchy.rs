use log::{debug, info};

use crate::mem::cache::{CacheEntry, CacheLevel};
use crate::mem::stats::LevelStats;

/// Access operations flowing through the hierarchy. `Fill` is the privileged
/// block fill a level issues to its upstream neighbor when writing back a
/// dirty victim; it never fetches and never propagates past its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Read,
    Write,
    Fill,
}

impl Op {
    pub fn is_read(self) -> bool {
        matches!(self, Self::Read)
    }

    /// Fills read back as writes at the receiving level.
    pub fn verb(self) -> &'static str {
        if self.is_read() {
            "read"
        } else {
            "write"
        }
    }
}

/// Terminal level of every chain: always hits, never dirty, nothing to evict.
#[derive(Debug, Default)]
pub struct MainMemory {
    stats: LevelStats,
}

impl MainMemory {
    pub const NAME: &'static str = "Memory";

    pub fn stats(&self) -> &LevelStats {
        &self.stats
    }
}

/// One node in the chain: a cache level or the terminal backing store.
#[derive(Debug)]
pub enum Level {
    Cache(CacheLevel),
    Memory(MainMemory),
}

impl Level {
    pub fn name(&self) -> &str {
        match self {
            Self::Cache(cache) => cache.name(),
            Self::Memory(_) => MainMemory::NAME,
        }
    }

    pub fn stats(&self) -> &LevelStats {
        match self {
            Self::Cache(cache) => cache.stats(),
            Self::Memory(memory) => &memory.stats,
        }
    }

    pub fn as_cache(&self) -> Option<&CacheLevel> {
        match self {
            Self::Cache(cache) => Some(cache),
            Self::Memory(_) => None,
        }
    }

    fn stats_mut(&mut self) -> &mut LevelStats {
        match self {
            Self::Cache(cache) => cache.stats_mut(),
            Self::Memory(memory) => &mut memory.stats,
        }
    }

    fn report_hit(&mut self, op: Op, addr: u32) {
        self.stats_mut().record_hit(op);
        info!("{}: {} hit at address {:#010x}", self.name(), op.verb(), addr);
    }

    fn report_miss(&mut self, op: Op, addr: u32) {
        self.stats_mut().record_miss(op);
        info!("{}: {} miss at address {:#010x}", self.name(), op.verb(), addr);
    }

    fn report_eviction(&mut self, block_addr: u32) {
        self.stats_mut().record_eviction();
        info!("{}: evicted cache line at {:#010x}", self.name(), block_addr);
    }

    fn report_writeback(&mut self, block_addr: u32) {
        self.stats_mut().record_writeback();
        info!(
            "{}: performing writeback of cache line {:#010x}",
            self.name(),
            block_addr
        );
    }
}

/// The ordered chain of levels, CPU-facing end first, terminated by the
/// backing store. Levels refer to their neighbors by position: `i + 1` is
/// upstream (toward memory), `i - 1` downstream (toward the requester).
/// All cross-level recursion runs through these indices, so the invalidate
/// and writeback cascades can re-enter any level without holding a borrow
/// on another one.
#[derive(Debug)]
pub struct Hierarchy {
    levels: Vec<Level>,
}

impl Hierarchy {
    /// Assemble a chain from cache levels ordered CPU-facing first and
    /// append the backing store.
    pub fn new(cache_levels: Vec<CacheLevel>) -> Self {
        let mut levels: Vec<Level> = cache_levels.into_iter().map(Level::Cache).collect();
        levels.push(Level::Memory(MainMemory::default()));
        Self { levels }
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Level names CPU-facing first, e.g. `L1 <-> L2 <-> Memory`.
    pub fn name_chain(&self) -> String {
        self.levels
            .iter()
            .map(Level::name)
            .collect::<Vec<_>>()
            .join(" <-> ")
    }

    /// Feed one access to the CPU-facing end of the chain.
    pub fn access(&mut self, op: Op, addr: u32) {
        self.access_at(0, op, addr);
    }

    fn access_at(&mut self, idx: usize, op: Op, addr: u32) {
        if matches!(self.levels[idx], Level::Memory(_)) {
            self.levels[idx].report_hit(op, addr);
            return;
        }
        self.cache_access(idx, op, addr);
    }

    fn cache_access(&mut self, idx: usize, op: Op, addr: u32) {
        let (set_idx, tag, block_addr, resident, at_capacity) = {
            let cache = self.cache(idx);
            let geometry = cache.geometry();
            let set_idx = geometry.set_index(addr);
            let tag = geometry.tag(addr);
            let set = cache.set(set_idx);
            (
                set_idx,
                tag,
                geometry.block_addr(addr),
                set.get(tag).is_some(),
                set.len() >= geometry.associativity(),
            )
        };

        if let Op::Fill = op {
            // A downstream level is pushing its dirty victim into us. The
            // block lands dirty and the fill stops here.
            if resident {
                self.levels[idx].report_hit(Op::Fill, addr);
                self.cache_mut(idx).set_mut(set_idx).mark_dirty(tag);
            } else {
                self.levels[idx].report_miss(Op::Fill, addr);
                if at_capacity {
                    self.evict(idx, set_idx);
                }
                self.cache_mut(idx).set_mut(set_idx).insert(CacheEntry {
                    tag,
                    dirty: true,
                    block_addr,
                });
            }
            return;
        }

        if resident {
            self.levels[idx].report_hit(op, addr);
            let cache = self.cache_mut(idx);
            let policy = cache.policy();
            let set = cache.set_mut(set_idx);
            if let Op::Write = op {
                set.mark_dirty(tag);
            }
            if policy.reorders_on_hit() {
                set.touch(tag);
            }
            return;
        }

        self.levels[idx].report_miss(op, addr);
        if at_capacity {
            self.evict(idx, set_idx);
        }
        self.cache_mut(idx).set_mut(set_idx).insert(CacheEntry {
            tag,
            dirty: matches!(op, Op::Write),
            block_addr,
        });

        // Fetch the block from upstream, then inherit its dirty state: a
        // dirty upstream copy is newer than the backing store, and the fresh
        // copy here must carry that.
        self.access_at(idx + 1, Op::Read, addr);
        if self.is_dirty_at(idx + 1, block_addr) {
            self.cache_mut(idx).set_mut(set_idx).mark_dirty(tag);
        }
    }

    /// Select a victim in `set_idx` per this level's policy and invalidate
    /// its block. The set must be at capacity.
    fn evict(&mut self, idx: usize, set_idx: usize) {
        let (victim_block, policy) = {
            let cache = self.cache(idx);
            let set = cache.set(set_idx);
            debug_assert_eq!(
                set.len(),
                cache.geometry().associativity(),
                "evict on a set below capacity"
            );
            let tag = set.victim_tag(cache.policy());
            (
                cache.geometry().block_addr_from_parts(tag, set_idx),
                cache.policy(),
            )
        };
        debug!(
            "{}: {} victim {:#010x} in set {}",
            self.levels[idx].name(),
            policy.as_str(),
            victim_block,
            set_idx
        );
        self.invalidate_at(idx, victim_block);
    }

    /// Remove `block_addr` from level `idx`: reconcile closer-to-requester
    /// copies first, push dirty data upstream, then drop the entry.
    fn invalidate_at(&mut self, idx: usize, block_addr: u32) {
        if matches!(self.levels[idx], Level::Memory(_)) {
            return;
        }
        // A downstream level may hold a dirtier copy of this block; it has
        // to be reconciled before this level's copy goes away.
        if idx > 0 {
            self.invalidate_at(idx - 1, block_addr);
        }

        let (set_idx, tag, state) = {
            let cache = self.cache(idx);
            let geometry = cache.geometry();
            let set_idx = geometry.set_index(block_addr);
            let tag = geometry.tag(block_addr);
            let state = cache
                .set(set_idx)
                .get(tag)
                .map(|entry| (entry.dirty, entry.block_addr));
            (set_idx, tag, state)
        };
        let Some((dirty, entry_block)) = state else {
            return;
        };

        if dirty {
            self.levels[idx].report_writeback(entry_block);
            self.access_at(idx + 1, Op::Fill, entry_block);
        }
        let removed = self.cache_mut(idx).set_mut(set_idx).remove(tag);
        debug_assert!(removed.is_some(), "invalidated entry vanished mid-cascade");
        self.levels[idx].report_eviction(entry_block);
    }

    /// Dirty state of `block_addr` at level `idx`; the backing store is
    /// never dirty.
    pub fn is_dirty_at(&self, idx: usize, block_addr: u32) -> bool {
        match &self.levels[idx] {
            Level::Cache(cache) => cache.is_dirty(block_addr),
            Level::Memory(_) => false,
        }
    }

    fn cache(&self, idx: usize) -> &CacheLevel {
        match &self.levels[idx] {
            Level::Cache(cache) => cache,
            Level::Memory(_) => unreachable!("backing store has no sets"),
        }
    }

    fn cache_mut(&mut self, idx: usize) -> &mut CacheLevel {
        match &mut self.levels[idx] {
            Level::Cache(cache) => cache,
            Level::Memory(_) => unreachable!("backing store has no sets"),
        }
    }
}
