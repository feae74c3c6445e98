use crate::lit::Lit;

/// Clauses received from peer instances, to be installed at level 0
/// before the next search phase.
#[derive(Debug, Default)]
pub struct SyncIntake {
    pub units: Vec<Lit>,
    pub binaries: Vec<(Lit, Lit)>,
}

/// Port for exchanging learnt unit and binary clauses with sibling solver
/// instances. Called only at phase boundaries, from the driving thread;
/// implementations own whatever synchronization they need internally.
pub trait DataSync {
    /// A new learnt unit is available for peers.
    fn signal_unit(&mut self, _lit: Lit) {}
    /// A new learnt binary is available for peers.
    fn signal_binary(&mut self, _a: Lit, _b: Lit) {}
    /// Exchange with peers; whatever comes back is enqueued at level 0.
    fn exchange(&mut self) -> SyncIntake {
        SyncIntake::default()
    }
}

/// The single-instance port: nothing to exchange.
#[derive(Debug, Default)]
pub struct NoSync;

impl DataSync for NoSync {}
