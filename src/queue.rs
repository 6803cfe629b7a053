//! The socket payload queue dump/restore subsystem is an external
//! collaborator (§1): this module only defines the narrow interface the
//! socket-graph engine needs from it (`dump_sk_queue` / `restore_sk_queue`
//! / the ordering guarantee that queue images load before peer resolution).
//! An embedding system supplies a real implementation; a no-op stand-in is
//! provided for tests that don't care about payload bytes.

use std::os::unix::io::RawFd;

use crate::error::Result;

/// Drains and serializes the buffered payload of socket `id`, keyed by
/// checkpoint id, into whichever image sidecar the embedding system uses.
pub trait SkQueueDumper {
    fn dump_sk_queue(&mut self, fd: RawFd, id: u32) -> Result<()>;
}

/// Restores previously dumped payload for socket `id` onto the live
/// descriptor `fd` (§4.6: used both when a pair-master hands queues to
/// each half of a fresh `socketpair`, and when a deferred `connect`
/// succeeds).
pub trait SkQueueRestorer {
    fn restore_sk_queue(&mut self, fd: RawFd, id: u32) -> Result<()>;

    /// Reads every previously dumped queue image into memory so
    /// `restore_sk_queue` calls can be served without further I/O. Must be
    /// called, and complete, before [`crate::restore::resolver::resolve_unix_peers`]
    /// runs (§5 ordering guarantee 3).
    fn read_sk_queues(&mut self) -> Result<()>;
}

/// A `SkQueueDumper`/`SkQueueRestorer` that does nothing: every socket is
/// treated as having an empty queue. Useful for exercising the graph
/// reconstruction logic in isolation from the payload subsystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullQueueIo;

impl SkQueueDumper for NullQueueIo {
    fn dump_sk_queue(&mut self, _fd: RawFd, _id: u32) -> Result<()> {
        Ok(())
    }
}

impl SkQueueRestorer for NullQueueIo {
    fn restore_sk_queue(&mut self, _fd: RawFd, _id: u32) -> Result<()> {
        Ok(())
    }

    fn read_sk_queues(&mut self) -> Result<()> {
        Ok(())
    }
}
