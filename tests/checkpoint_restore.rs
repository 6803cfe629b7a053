//! End-to-end scenarios from §8: dump a small graph of real UNIX sockets
//! through the checkpoint side, stream the image through the restore side,
//! and check the reconstructed sockets behave as expected.

use std::os::unix::io::AsRawFd;

use sockmigrate::checkpoint::dump::dump_unixsk;
use sockmigrate::checkpoint::table::{SockState, SockType, SocketDesc, UnixSkDesc};
use sockmigrate::config::Config;
use sockmigrate::fdreg::testing::LoopbackRegistry;
use sockmigrate::fown::{FileOwner, OwnerId};
use sockmigrate::image::UnixSkEntry;
use sockmigrate::queue::NullQueueIo;
use sockmigrate::restore::connect::run_unix_connections;
use sockmigrate::restore::loader::{load_unix_sockets, Role, UnixSkInfo};
use sockmigrate::restore::opener::open_unixsk;
use sockmigrate::restore::resolver::resolve_unix_peers;
use sockmigrate::session::{CheckpointSession, RestoreSession};

/// Route `tracing` output from these end-to-end scenarios through the test
/// harness's captured stdout, so a failing scenario shows its socket/peer
/// debug trail. Safe to call from every test: `try_init` no-ops past the
/// first call in the binary.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn bind_listener(path: &std::path::Path, backlog: i32) -> std::os::fd::OwnedFd {
    let fd = nix::sys::socket::socket(
        nix::sys::socket::AddressFamily::Unix,
        nix::sys::socket::SockType::Stream,
        nix::sys::socket::SockFlag::empty(),
        None,
    )
    .unwrap();
    let addr = sockmigrate::addr::UnixSocketAddr::from_path(path).unwrap();
    let (sockaddr, len) = addr.as_raw_general();
    unsafe {
        assert_eq!(
            libc::bind(fd.as_raw_fd(), sockaddr as *const _ as *const libc::sockaddr, len),
            0
        );
        assert_eq!(libc::listen(fd.as_raw_fd(), backlog), 0);
    }
    fd
}

/// Scenario 1: listening stream socket with no clients round-trips through
/// dump and load with its name, backlog, and zero peer intact.
#[test]
fn listening_stream_socket_round_trips() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sock");
    let listener = bind_listener(&path, 8);

    let mut session = CheckpointSession::new(Config::default());
    let mut desc = UnixSkDesc::new(42, SockType::Stream, SockState::Listen);
    desc.name = Some(path.to_str().unwrap().as_bytes().to_vec());
    desc.wqlen = 8;
    session.table.insert(SocketDesc::Unix(desc));

    let mut fdinfo = Vec::new();
    let mut image = Vec::new();
    let mut queues = NullQueueIo;
    dump_unixsk(
        &mut session,
        listener.as_raw_fd(),
        42,
        FileOwner::default(),
        0,
        &mut fdinfo,
        &mut image,
        &mut queues,
    )
    .unwrap();

    let mut cursor = &image[..];
    let entry = UnixSkEntry::read_from(&mut cursor).unwrap().unwrap();
    assert_eq!(entry.id, 42);
    assert_eq!(entry.peer, 0);
    assert_eq!(entry.name, path.to_str().unwrap().as_bytes());
    assert_eq!(entry.backlog, 8, "backlog must round-trip from the decoded wqlen");

    std::fs::remove_file(&path).unwrap();
    let mut reader = &image[..];
    let loaded = load_unix_sockets(&mut reader).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].role, Role::Standalone);
}

/// Scenario 2: a socketpair of dgrams dumped as two reciprocal records gets
/// pair-master/pair-slave roles assigned by owner order on restore, and the
/// master side can actually open a socketpair and hand a half across the
/// loopback transport.
#[test]
fn socketpair_of_dgrams_assigns_master_and_hands_off_fd() {
    init_tracing();
    let mut session = CheckpointSession::new(Config::default());
    let mut a = UnixSkDesc::new(3, SockType::Dgram, SockState::Established);
    a.peer_ino = 4;
    let mut b = UnixSkDesc::new(4, SockType::Dgram, SockState::Established);
    b.peer_ino = 3;
    session.table.insert(SocketDesc::Unix(a));
    session.table.insert(SocketDesc::Unix(b));

    let mut fdinfo = Vec::new();
    let mut image = Vec::new();
    let mut queues = NullQueueIo;
    dump_unixsk(&mut session, 3, 3, FileOwner::default(), 0, &mut fdinfo, &mut image, &mut queues).unwrap();
    dump_unixsk(&mut session, 4, 4, FileOwner::default(), 0, &mut fdinfo, &mut image, &mut queues).unwrap();

    let mut reader = &image[..];
    let loaded = load_unix_sockets(&mut reader).unwrap();
    let mut restore_session = RestoreSession::new(Config::default(), loaded);

    let mut registry = LoopbackRegistry::new();
    registry.set_owner(3, OwnerId { pid: 100, fd: 3 });
    registry.set_owner(4, OwnerId { pid: 100, fd: 4 });
    resolve_unix_peers(&mut restore_session, &registry).unwrap();

    let master = restore_session.find_by_id(3).unwrap();
    let slave = restore_session.find_by_id(4).unwrap();
    assert_eq!(restore_session.get(master).role, Role::PairMaster);
    assert_eq!(restore_session.get(slave).role, Role::PairSlave);

    let mut queues = NullQueueIo;
    let master_fd = open_unixsk(&mut restore_session, &mut registry, &mut queues, master).unwrap();
    assert!(master_fd.as_raw_fd() >= 0);

    let slave_fd = open_unixsk(&mut restore_session, &mut registry, &mut queues, slave).unwrap();
    assert!(slave_fd.as_raw_fd() >= 0);
}

/// Scenario 4: a peer queued on a listener's accept queue with `peer == 0`
/// gets its peer rewritten to the listener's id via the icon index.
#[test]
fn in_flight_connection_resolves_through_icon_index() {
    init_tracing();
    let mut session = CheckpointSession::new(Config::default());
    session.table.insert(SocketDesc::Unix(UnixSkDesc::new(10, SockType::Stream, SockState::Listen)));
    session.table.insert(SocketDesc::Unix(UnixSkDesc::new(11, SockType::Stream, SockState::Established)));
    session.icons.insert(11, 10);

    let mut fdinfo = Vec::new();
    let mut image = Vec::new();
    let mut queues = NullQueueIo;
    dump_unixsk(&mut session, 7, 10, FileOwner::default(), 0, &mut fdinfo, &mut image, &mut queues).unwrap();
    dump_unixsk(&mut session, 8, 11, FileOwner::default(), 0, &mut fdinfo, &mut image, &mut queues).unwrap();

    let mut reader = &image[..];
    let loaded = load_unix_sockets(&mut reader).unwrap();
    let client = loaded.iter().find(|s| s.id() == 11).unwrap();
    assert_eq!(client.entry.peer, 10);
}

/// Scenario 5: a bound path whose backing inode no longer matches what
/// `stat` reports (the file was unlinked and replaced, or just vanished)
/// drops the name but keeps the socket registered.
#[test]
fn unlinked_bound_socket_drops_its_name_but_keeps_the_entry() {
    use sockmigrate::checkpoint::table::{IconIndex, SocketTable};
    use sockmigrate::checkpoint::unix_decoder::{decode_unix_diag, UnixDiagAttrs};

    init_tracing();
    let mut table = SocketTable::new();
    let mut icons = IconIndex::new();
    let attrs = UnixDiagAttrs {
        ino: 77,
        sk_type: SockType::Stream,
        state: SockState::Listen,
        peer: None,
        name: Some(b"/tmp/vanished".to_vec()),
        vfs: Some((1, 2)),
        icons: Vec::new(),
        rqlen: 0,
        wqlen: 0,
    };
    decode_unix_diag(attrs, &mut table, &mut icons, |_| {
        Err(std::io::Error::from(std::io::ErrorKind::NotFound))
    })
    .unwrap();

    let desc = table.lookup(77).unwrap().as_unix().unwrap();
    assert!(desc.name.is_none());
}

/// Scenario 6: an external dgram peer, once `ext_unix_sk` is enabled, is
/// emitted as a stub `EXTERN` entry and accepted as a valid peer target
/// during resolution.
#[test]
fn external_dgram_peer_is_accepted_when_policy_allows() {
    use sockmigrate::checkpoint::dump::finalize_external;

    init_tracing();
    let mut dump_session = CheckpointSession::new(Config { ext_unix_sk: true });
    dump_session
        .table
        .insert(SocketDesc::Unix(UnixSkDesc::new(99, SockType::Dgram, SockState::Established)));
    dump_session.defer_external(99);

    let mut image = Vec::new();
    finalize_external(&mut dump_session, &mut image).unwrap();

    // A local socket in the same image that points at the external peer.
    UnixSkEntry {
        id: 1,
        sk_type: SockType::Dgram,
        state: SockState::Established,
        name: Vec::new(),
        flags: 0,
        backlog: 0,
        peer: 99,
        fown: FileOwner::default(),
        uflags: 0,
    }
    .write_to(&mut image)
    .unwrap();

    let mut reader = &image[..];
    let loaded = load_unix_sockets(&mut reader).unwrap();
    assert_eq!(loaded.len(), 2);

    let registry = LoopbackRegistry::new();
    let mut restore_session = RestoreSession::new(Config { ext_unix_sk: true }, loaded);
    resolve_unix_peers(&mut restore_session, &registry).unwrap();

    let local = restore_session.find_by_id(1).unwrap();
    assert!(restore_session.get(local).peer.is_some());
}

/// Scenario 3: a client connected to an in-tree listener reconnects by name
/// once the listener has been opened, through the deferred connect queue.
#[test]
fn standalone_client_connects_after_listener_is_opened() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let server_path = dir.path().join("server.sock");

    let loaded = vec![
        UnixSkInfo {
            entry: UnixSkEntry {
                id: 1,
                sk_type: SockType::Stream,
                state: SockState::Listen,
                name: server_path.to_str().unwrap().as_bytes().to_vec(),
                flags: 0,
                backlog: 8,
                peer: 0,
                fown: FileOwner::default(),
                uflags: 0,
            },
            peer: None,
            role: Role::Standalone,
        },
        UnixSkInfo {
            entry: UnixSkEntry {
                id: 2,
                sk_type: SockType::Stream,
                state: SockState::Established,
                name: Vec::new(),
                flags: 0,
                backlog: 0,
                peer: 1,
                fown: FileOwner::default(),
                uflags: 0,
            },
            peer: Some(0),
            role: Role::Standalone,
        },
    ];
    let mut session = RestoreSession::new(Config::default(), loaded);
    let mut registry = LoopbackRegistry::new();
    let mut queues = NullQueueIo;

    let _listener_fd = open_unixsk(&mut session, &mut registry, &mut queues, 0).unwrap();

    let client_fd = nix::sys::socket::socket(
        nix::sys::socket::AddressFamily::Unix,
        nix::sys::socket::SockType::Stream,
        nix::sys::socket::SockFlag::empty(),
        None,
    )
    .unwrap();
    session.schedule_connect(1);

    let client_raw = client_fd.as_raw_fd();
    run_unix_connections(&mut session, &|_| client_raw, &mut queues).unwrap();
}
