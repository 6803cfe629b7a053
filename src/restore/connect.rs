//! Deferred connection runner (§4.7): once every opener has run, drains the
//! connection-job queue built up by [`crate::restore::opener::open_unixsk`]'s
//! standalone branch, retrying each `connect` a bounded number of times.

use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::queue::SkQueueRestorer;
use crate::restore::opener::apply_owner;
use crate::session::RestoreSession;

/// Number of retries a deferred `connect` gets before the job is fatal
/// (§4.7). The peer's listener may not have called `listen()` yet at the
/// moment this job first runs; these ~8ms give it a chance to catch up.
/// FIXME use futex waiters instead of a fixed sleep loop, matching the
/// original's own noted shortcut here.
const CONNECT_RETRIES: u32 = 8;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(1);

fn connect_raw(fd: RawFd, session: &RestoreSession, peer_index: usize) -> std::io::Result<()> {
    let addr = session
        .get(peer_index)
        .addr()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let (sockaddr, len) = addr.as_raw_general();
    // Safety: `sockaddr`/`len` were produced by `UnixSocketAddr` itself.
    let ret = unsafe { libc::connect(fd, sockaddr as *const _ as *const libc::sockaddr, len) };
    if ret != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Run every queued connection job exactly once, in FIFO order. Each job
/// connects to its peer's restored name with up to [`CONNECT_RETRIES`]
/// attempts; on success the peer's queued payload is restored onto the
/// freshly connected descriptor. A job that exhausts its retries is fatal
/// to the restore (§4.7).
pub fn run_unix_connections(
    session: &mut RestoreSession,
    fds: &dyn Fn(usize) -> RawFd,
    queues: &mut dyn SkQueueRestorer,
) -> Result<()> {
    let jobs = std::mem::take(&mut session.conn_jobs);
    for index in jobs {
        let fd = fds(index);
        let peer_index = session.get(index).peer.ok_or_else(|| {
            Error::graph(format!("connect job {:#x} has no peer", session.get(index).id()))
        })?;
        let mut last_err = None;
        let mut connected = false;
        for attempt in 0..=CONNECT_RETRIES {
            match connect_raw(fd, session, peer_index) {
                Ok(()) => {
                    connected = true;
                    break;
                }
                Err(e) => {
                    last_err = Some(e);
                    if attempt < CONNECT_RETRIES {
                        std::thread::sleep(CONNECT_RETRY_DELAY);
                    }
                }
            }
        }

        if !connected {
            let id = session.get(index).id();
            return Err(Error::Transport(last_err.unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, format!("connect exhausted retries for {id:#x}"))
            })));
        }

        let id = session.get(index).id();
        if let Some(peer_idx) = session.get(index).peer {
            let peer_id = session.get(peer_idx).id();
            queues.restore_sk_queue(fd, peer_id)?;
        }
        let entry = &session.get(index).entry;
        apply_owner(fd, &entry.fown, entry.flags)?;
        tracing::debug!(id, "deferred connect succeeded");
    }
    Ok(())
}
