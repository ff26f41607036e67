//! The requesting client, as seen by a ranking.
use ipnetwork::IpNetwork;
use std::net::IpAddr;

/// Describes who is asking: the source address of the query and, when the query carried an EDNS
/// Client Subnet option, the announced client network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientInfo {
    pub source: IpAddr,
    pub edns_client: Option<IpNetwork>,
}

impl ClientInfo {
    #[must_use]
    pub fn new(source: IpAddr) -> Self {
        ClientInfo {
            source,
            edns_client: None,
        }
    }

    #[must_use]
    pub fn with_edns_client(mut self, network: IpNetwork) -> Self {
        self.edns_client = Some(network);
        self
    }

    /// The address rankings should look up: the EDNS client network if there is one, otherwise
    /// the query source.
    #[must_use]
    pub fn lookup_addr(&self) -> IpAddr {
        self.edns_client.map_or(self.source, |net| net.network())
    }
}
