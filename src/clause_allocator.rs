use std::ops::{Index, IndexMut};

use tracing::debug;

use crate::clause::Clause;
use crate::cref::ClauseRef;
use crate::lit::Lit;

/// Arena owning every long clause. Watches and reasons hold raw
/// [`ClauseRef`] offsets into it; the arena is the sole owner.
///
/// Freed clauses are only marked; `consolidate` compacts the storage and
/// hands back a remap that every offset holder must apply. That is the
/// single moment at which handles are rewritten, and it must run with no
/// other component holding a cached offset.
#[derive(Debug, Default)]
pub struct ClauseAllocator {
    db: Vec<Clause>,
    freed: usize,
}

/// Offset translation produced by [`ClauseAllocator::consolidate`].
pub struct ClauseRemap {
    map: Vec<Option<ClauseRef>>,
}

impl ClauseRemap {
    pub fn translate(&self, cref: ClauseRef) -> ClauseRef {
        self.map[cref.index()].expect("live clause must survive consolidation")
    }

    /// `None` for clauses freed before this consolidation; watch lists
    /// use this to drop their lazily retired entries.
    pub fn try_translate(&self, cref: ClauseRef) -> Option<ClauseRef> {
        self.map[cref.index()]
    }
}

impl ClauseAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }
    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
    pub fn num_freed(&self) -> usize {
        self.freed
    }

    pub fn alloc(&mut self, lits: Vec<Lit>) -> ClauseRef {
        debug_assert!(lits.len() >= 3, "binary clauses live in the watch lists");
        let cref = ClauseRef(self.db.len() as u32);
        self.db.push(Clause::new(lits));
        cref
    }

    pub fn clause(&self, cref: ClauseRef) -> &Clause {
        &self.db[cref.index()]
    }
    pub fn clause_mut(&mut self, cref: ClauseRef) -> &mut Clause {
        &mut self.db[cref.index()]
    }

    pub fn free(&mut self, cref: ClauseRef) {
        self.db[cref.index()].mark_deleted();
        self.freed += 1;
    }

    /// Compact live clauses to the front, dropping freed ones, and return
    /// the handle remap for watches, reasons, and database tier lists.
    pub fn consolidate(&mut self) -> ClauseRemap {
        let before = self.db.len();
        let mut map = vec![None; before];
        let mut live = Vec::with_capacity(before - self.freed);
        for (old, clause) in self.db.drain(..).enumerate() {
            if !clause.is_deleted() {
                map[old] = Some(ClauseRef(live.len() as u32));
                live.push(clause);
            }
        }
        self.db = live;
        self.freed = 0;
        debug!("consolidated arena: {} -> {} clauses", before, self.db.len());
        ClauseRemap { map }
    }

    pub fn iter_refs(&self) -> impl Iterator<Item = ClauseRef> + '_ {
        (0..self.db.len() as u32).map(ClauseRef)
    }
}

impl Index<ClauseRef> for ClauseAllocator {
    type Output = Clause;

    fn index(&self, cref: ClauseRef) -> &Self::Output {
        self.clause(cref)
    }
}

impl IndexMut<ClauseRef> for ClauseAllocator {
    fn index_mut(&mut self, cref: ClauseRef) -> &mut Self::Output {
        self.clause_mut(cref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lit::Lit;

    fn lits(xs: &[i32]) -> Vec<Lit> {
        xs.iter().map(|&x| Lit::from_external(x)).collect()
    }

    #[test]
    fn consolidate_remaps_live_clauses() {
        let mut ca = ClauseAllocator::new();
        let a = ca.alloc(lits(&[1, 2, 3]));
        let b = ca.alloc(lits(&[1, -2, 4]));
        let c = ca.alloc(lits(&[-1, 3, 4]));
        ca.free(b);
        let remap = ca.consolidate();
        assert_eq!(ca.len(), 2);
        assert_eq!(remap.translate(a).index(), 0);
        assert_eq!(remap.translate(c).index(), 1);
        assert_eq!(ca.clause(remap.translate(c))[0], Lit::from_external(-1));
    }
}
