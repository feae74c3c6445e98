use crate::cref::ClauseRef;
use crate::idx::LitVec;
use crate::lit::Lit;
use crate::var::Var;

/// Inline binary clause: the occurrence under literal `a` stores the
/// other literal `b` plus the redundancy flag. Both directions are kept.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BinWatch {
    pub other: Lit,
    pub red: bool,
}

/// Watch on a long clause, with a cached blocker literal that lets the
/// propagator skip the clause load when the blocker is already true.
#[derive(Debug, Copy, Clone)]
pub struct LongWatch {
    pub blocker: Lit,
    pub cref: ClauseRef,
}

/// Per-literal watch index. Binary occurrences live in their own block
/// ahead of the long watches; the propagator scans binaries first.
#[derive(Debug, Default)]
pub struct WatchList {
    bins: LitVec<Vec<BinWatch>>,
    longs: LitVec<Vec<LongWatch>>,
}

impl WatchList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(&mut self, var: Var) {
        for lit in [Lit::positive(var), Lit::negative(var)] {
            self.bins.init(&lit);
            self.longs.init(&lit);
        }
    }

    pub fn bins(&self, lit: Lit) -> &[BinWatch] {
        &self.bins[lit]
    }
    pub fn longs(&self, lit: Lit) -> &[LongWatch] {
        &self.longs[lit]
    }
    pub fn longs_mut(&mut self, lit: Lit) -> &mut Vec<LongWatch> {
        &mut self.longs[lit]
    }

    pub fn attach_bin(&mut self, a: Lit, b: Lit, red: bool) {
        debug_assert_ne!(a.var(), b.var());
        self.bins[a].push(BinWatch { other: b, red });
        self.bins[b].push(BinWatch { other: a, red });
    }

    /// Remove one binary `a ∨ b`; returns false if it was not present.
    pub fn detach_bin(&mut self, a: Lit, b: Lit, red: bool) -> bool {
        let rem = |list: &mut Vec<BinWatch>, other: Lit| -> bool {
            if let Some(at) = list.iter().position(|w| w.other == other && w.red == red) {
                list.remove(at);
                true
            } else {
                false
            }
        };
        let r1 = rem(&mut self.bins[a], b);
        let r2 = rem(&mut self.bins[b], a);
        debug_assert_eq!(r1, r2);
        r1 && r2
    }

    pub fn contains_bin(&self, a: Lit, b: Lit) -> bool {
        self.bins[a].iter().any(|w| w.other == b)
    }

    pub fn attach_long(&mut self, cref: ClauseRef, a: Lit, b: Lit) {
        self.longs[a].push(LongWatch { blocker: b, cref });
        self.longs[b].push(LongWatch { blocker: a, cref });
    }

    pub fn detach_long(&mut self, cref: ClauseRef, a: Lit, b: Lit) {
        for lit in [a, b] {
            let list = &mut self.longs[lit];
            let at = list
                .iter()
                .position(|w| w.cref == cref)
                .expect("watched clause must be present");
            list.swap_remove(at);
        }
    }

    /// Visit every binary once (under its smaller literal).
    pub fn for_each_bin_once<F>(&self, mut f: F)
    where
        F: FnMut(Lit, Lit, bool),
    {
        for (code, list) in self.bins.iter().enumerate() {
            let lit = Lit::from_inner(code as u32);
            for w in list {
                if lit < w.other {
                    f(lit, w.other, w.red);
                }
            }
        }
    }

    /// Rewrite all clause handles after arena consolidation, dropping
    /// watches whose clause was freed (they are retired lazily).
    pub fn remap_crefs<F>(&mut self, mut translate: F)
    where
        F: FnMut(ClauseRef) -> Option<ClauseRef>,
    {
        for list in self.longs.iter_mut() {
            list.retain_mut(|w| match translate(w.cref) {
                Some(cref) => {
                    w.cref = cref;
                    true
                }
                None => false,
            });
        }
    }
}
