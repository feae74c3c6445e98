use crate::idx::LitVec;
use crate::lit::Lit;
use crate::var::Var;

/// One cached implication `key → lit`. `certain` is set when the
/// implication was confirmed by both probing passes of the key's
/// variable, i.e. it is a transitively certain consequence.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CacheEntry {
    pub lit: Lit,
    pub certain: bool,
}

/// Transitive implication cache filled by the prober and consumed by the
/// cache-based learnt-clause minimization.
///
/// Per-literal entry lists are kept sorted and deduplicated so lookups
/// and merges stay cheap and deterministic.
#[derive(Debug, Default)]
pub struct ImplCache {
    cache: LitVec<Vec<CacheEntry>>,
    /// Per-literal size cap; oldest entries are not worth keeping past it.
    cap: usize,
}

impl ImplCache {
    pub fn new(cap: usize) -> Self {
        Self {
            cache: LitVec::new(),
            cap,
        }
    }

    pub fn init(&mut self, var: Var) {
        self.cache.init(&Lit::positive(var));
        self.cache.init(&Lit::negative(var));
    }

    pub fn implied_by(&self, lit: Lit) -> &[CacheEntry] {
        &self.cache[lit]
    }

    /// Merge the consequences observed for `key` into its entry list.
    /// An implication seen again with `certain` upgrades in place.
    pub fn merge(&mut self, key: Lit, implied: impl Iterator<Item = CacheEntry>) {
        let list = &mut self.cache[key];
        for entry in implied {
            debug_assert_ne!(entry.lit.var(), key.var());
            match list.binary_search_by_key(&entry.lit, |e| e.lit) {
                Ok(at) => list[at].certain |= entry.certain,
                Err(at) => {
                    if list.len() < self.cap {
                        list.insert(at, entry);
                    }
                }
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(x: i32) -> Lit {
        Lit::from_external(x)
    }

    #[test]
    fn merge_upgrades_certainty() {
        let mut cache = ImplCache::new(16);
        for v in 0..3 {
            cache.init(Var::new(v));
        }
        cache.merge(lit(1), [CacheEntry { lit: lit(2), certain: false }].into_iter());
        cache.merge(
            lit(1),
            [
                CacheEntry { lit: lit(2), certain: true },
                CacheEntry { lit: lit(-3), certain: false },
            ]
            .into_iter(),
        );
        let entries = cache.implied_by(lit(1));
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().find(|e| e.lit == lit(2)).unwrap().certain);
        assert!(!entries.iter().find(|e| e.lit == lit(-3)).unwrap().certain);
    }
}
