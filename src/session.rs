//! The checkpoint and restore "sessions" that the design's global-state
//! note asks for: owned arenas with phase-scoped lifetimes instead of
//! process-wide singletons, so the socket table, icon index, loaded-socket
//! arena and deferred-connection queue are all just fields on a value
//! created at phase start and dropped at phase end.

use std::collections::HashMap;

use crate::checkpoint::table::{IconIndex, SocketTable};
use crate::config::Config;
use crate::restore::loader::UnixSkInfo;

/// Everything the checkpoint phase accumulates while walking the target
/// process tree: the collected socket table, the in-flight icon index, and
/// the list of externally-owned UNIX peers deferred until every in-tree
/// socket has been dumped (§4.4).
pub struct CheckpointSession {
    pub config: Config,
    pub table: SocketTable,
    pub icons: IconIndex,
    /// Inodes of UNIX peers seen but not (yet) dumped because they belong
    /// to a socket outside the process tree. Entries graduate out of this
    /// list the moment their owning inode is actually dumped (§3).
    pub external_defer: Vec<u32>,
}

impl CheckpointSession {
    pub fn new(config: Config) -> Self {
        CheckpointSession {
            config,
            table: SocketTable::new(),
            icons: IconIndex::new(),
            external_defer: Vec::new(),
        }
    }

    /// Queue `ino` for external finalization unless it's already pending.
    pub fn defer_external(&mut self, ino: u32) {
        if !self.external_defer.contains(&ino) {
            self.external_defer.push(ino);
        }
    }

    /// Drop `ino` from the defer list because it just got dumped for real.
    pub fn undefer(&mut self, ino: u32) {
        self.external_defer.retain(|&i| i != ino);
    }
}

/// Everything the restore phase accumulates: every loaded `UnixSkInfo` in
/// an append-only arena (peers are indices into this same `Vec`, per the
/// design's "back-references without cycles" note) plus the queue of
/// deferred `connect` jobs built up while opening standalone client
/// sockets.
pub struct RestoreSession {
    pub config: Config,
    pub sockets: Vec<UnixSkInfo>,
    by_id: HashMap<u32, usize>,
    /// Indices into `sockets` awaiting a deferred `connect` (§4.7).
    pub conn_jobs: Vec<usize>,
}

impl RestoreSession {
    pub fn new(config: Config, sockets: Vec<UnixSkInfo>) -> Self {
        let by_id = sockets.iter().enumerate().map(|(i, s)| (s.id(), i)).collect();
        RestoreSession { config, sockets, by_id, conn_jobs: Vec::new() }
    }

    pub fn find_by_id(&self, id: u32) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub fn get(&self, index: usize) -> &UnixSkInfo {
        &self.sockets[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut UnixSkInfo {
        &mut self.sockets[index]
    }

    pub fn schedule_connect(&mut self, index: usize) {
        self.conn_jobs.push(index);
    }
}

/// A freshly constructed table/icon pair used by tests that exercise the
/// checkpoint decoder directly without going through netlink collection.
#[cfg(test)]
pub(crate) fn empty_table_and_icons() -> (SocketTable, IconIndex) {
    (SocketTable::new(), IconIndex::new())
}
