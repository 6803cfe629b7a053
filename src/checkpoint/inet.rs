//! INET collectors (§4.8, thin): one-line dispatch per `(family, protocol)`
//! into a shared collector. Only listening TCP is actually dump-admitted in
//! current scope; UDP/UDP-lite collectors populate the table so it's
//! complete, but nothing downstream promises to ever emit their records
//! (design's Open Questions).

use crate::checkpoint::table::{Family, InetSkDesc, Protocol, SockState, SockType, SocketDesc, SocketTable};

/// The subset of a diagnostic header this core needs to collect an INET
/// socket: its inode, listen/established/close state, and socket shape.
/// The embedding INET per-socket dumper (§1, external collaborator) reads
/// the rest of the diagnostic payload itself.
#[derive(Debug, Clone, Copy)]
pub struct InetDiagHeader {
    pub ino: u32,
    pub sk_type: SockType,
    pub state: SockState,
}

fn collect(table: &mut SocketTable, header: InetDiagHeader, family: Family, protocol: Protocol) {
    table.insert(SocketDesc::Inet(InetSkDesc {
        ino: header.ino,
        family,
        protocol,
        sk_type: header.sk_type,
        state: header.state,
        dumped: false,
    }));
}

pub fn collect_tcp4(table: &mut SocketTable, header: InetDiagHeader) {
    collect(table, header, Family::Inet, Protocol::Tcp);
}

pub fn collect_tcp6(table: &mut SocketTable, header: InetDiagHeader) {
    collect(table, header, Family::Inet6, Protocol::Tcp);
}

pub fn collect_udp4(table: &mut SocketTable, header: InetDiagHeader) {
    collect(table, header, Family::Inet, Protocol::Udp);
}

pub fn collect_udp6(table: &mut SocketTable, header: InetDiagHeader) {
    collect(table, header, Family::Inet6, Protocol::Udp);
}

pub fn collect_udplite4(table: &mut SocketTable, header: InetDiagHeader) {
    collect(table, header, Family::Inet, Protocol::UdpLite);
}

pub fn collect_udplite6(table: &mut SocketTable, header: InetDiagHeader) {
    collect(table, header, Family::Inet6, Protocol::UdpLite);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listening_tcp_is_collected() {
        let mut table = SocketTable::new();
        collect_tcp4(&mut table, InetDiagHeader { ino: 1, sk_type: SockType::Stream, state: SockState::Listen });
        let desc = table.lookup(1).unwrap();
        match desc {
            SocketDesc::Inet(i) => {
                assert_eq!(i.family, Family::Inet);
                assert_eq!(i.protocol, Protocol::Tcp);
            }
            _ => panic!("expected an inet descriptor"),
        }
    }

    #[test]
    fn udp_is_collected_but_table_does_not_promise_emission() {
        let mut table = SocketTable::new();
        collect_udp6(&mut table, InetDiagHeader { ino: 2, sk_type: SockType::Dgram, state: SockState::Established });
        assert!(table.lookup(2).is_some());
    }
}
