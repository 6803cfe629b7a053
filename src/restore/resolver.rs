//! The restore-side peer resolver (§4.5, second half): runs once every
//! socket and queue image is loaded, links each socket to its peer by id,
//! and classifies reciprocal peers as pair-master/pair-slave by a
//! deterministic total order on `(pid, fd)`.

use crate::error::{Error, Result};
use crate::fdreg::FdRegistry;
use crate::image::UFLAG_EXTERN;
use crate::restore::loader::Role;
use crate::session::RestoreSession;

/// Resolve every socket's `peer` link and pair role.
///
/// Must run after [`crate::restore::loader::load_unix_sockets`] and after
/// queue images are read in (§5 ordering guarantee 3) — both happen before
/// this function is ever called, by construction of the restore pipeline.
pub fn resolve_unix_peers(session: &mut RestoreSession, registry: &dyn FdRegistry) -> Result<()> {
    let indices: Vec<usize> = (0..session.sockets.len()).collect();

    for &i in &indices {
        if session.get(i).peer.is_some() {
            continue;
        }
        let peer_id = session.get(i).entry.peer;
        if peer_id == 0 {
            continue;
        }

        let peer_idx = match session.find_by_id(peer_id) {
            Some(idx) => idx,
            None => {
                return Err(Error::graph(format!(
                    "peer {:#x} unresolved for {:#x}",
                    peer_id,
                    session.get(i).id()
                )))
            }
        };

        let peer_is_extern = session.get(peer_idx).entry.uflags & UFLAG_EXTERN != 0;
        if peer_is_extern && !session.config.ext_unix_sk {
            return Err(Error::policy(format!(
                "peer {:#x} is external but ext_unix_sk is disabled",
                peer_id
            )));
        }

        session.get_mut(i).peer = Some(peer_idx);

        if i == peer_idx {
            // Socket connected to itself: no pair role, standalone connect
            // scheduling still applies below through open_unixsk_standalone.
            tracing::debug!(id = session.get(i).id(), "socket is its own peer");
            continue;
        }

        if session.get(peer_idx).entry.peer != session.get(i).id() {
            // Not reciprocal: in-flight or one-way-by-name. No pair role.
            continue;
        }

        // Reciprocally connected: a socketpair, or two sockets that
        // connected to each other's names. Exactly one side becomes the
        // master; the choice is a total order over (pid, fd), never a tie
        // since a given (pid, fd) names exactly one descriptor.
        let a = registry.owner(session.get(i).id());
        let b = registry.owner(session.get(peer_idx).id());

        if a < b {
            session.get_mut(i).role = Role::PairMaster;
            session.get_mut(peer_idx).role = Role::PairSlave;
        } else {
            session.get_mut(peer_idx).role = Role::PairMaster;
            session.get_mut(i).role = Role::PairSlave;
        }
        session.get_mut(peer_idx).peer = Some(i);
    }

    Ok(())
}
