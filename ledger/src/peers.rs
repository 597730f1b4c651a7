//! Peer registry: the set of `host:port` addresses a node gossips and
//! reconciles its chain against.

use std::collections::HashSet;

/// Set of known peer addresses, stored as bare `host:port` (no scheme, no
/// path).
#[derive(Clone, Debug, Default)]
pub struct PeerRegistry {
    nodes: HashSet<String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `address`, normalizing away any scheme or trailing path.
    ///
    /// Accepts `http://host:port`, `host:port`, and `host:port/anything`;
    /// rejects anything that doesn't reduce to a non-empty `host:port`.
    pub fn register(&mut self, address: &str) -> Result<(), String> {
        let netloc = normalize(address).ok_or_else(|| format!("invalid address: {address}"))?;
        self.nodes.insert(netloc);
        Ok(())
    }

    /// Removes `address` from the registry. Idempotent: removing an address
    /// that was never registered is not an error.
    pub fn remove(&mut self, address: &str) {
        if let Some(netloc) = normalize(address) {
            self.nodes.remove(&netloc);
        } else {
            self.nodes.remove(address);
        }
    }

    /// Returns `true` if `address` (in any accepted form) is registered.
    pub fn contains(&self, address: &str) -> bool {
        match normalize(address) {
            Some(netloc) => self.nodes.contains(&netloc),
            None => self.nodes.contains(address),
        }
    }

    /// Returns every registered peer as a `host:port` string.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Reduces an address of the form `scheme://host:port/path`, `host:port`, or
/// `host:port/path` down to bare `host:port`. Returns `None` if nothing
/// usable can be extracted.
///
/// Public so transport code outside this crate (e.g. the bootstrap source
/// address, which arrives as a full `scheme://host:port/` URL on the CLI)
/// can normalize an address the same way the registry itself does before
/// handing it to an HTTP helper that prepends its own scheme.
pub fn normalize(address: &str) -> Option<String> {
    let without_scheme = match address.find("://") {
        Some(idx) => &address[idx + 3..],
        None => address,
    };
    let netloc = without_scheme.split('/').next().unwrap_or("");
    if netloc.is_empty() {
        None
    } else {
        Some(netloc.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_accepts_scheme_prefixed_address() {
        let mut peers = PeerRegistry::new();
        peers.register("http://192.168.0.5:5000").unwrap();
        assert!(peers.contains("192.168.0.5:5000"));
    }

    #[test]
    fn register_accepts_bare_host_port() {
        let mut peers = PeerRegistry::new();
        peers.register("192.168.0.5:5000").unwrap();
        assert!(peers.contains("http://192.168.0.5:5000"));
    }

    #[test]
    fn register_accepts_address_with_trailing_path() {
        let mut peers = PeerRegistry::new();
        peers.register("192.168.0.5:5000/chain").unwrap();
        assert!(peers.contains("192.168.0.5:5000"));
    }

    #[test]
    fn remove_is_idempotent() {
        let mut peers = PeerRegistry::new();
        peers.register("192.168.0.5:5000").unwrap();
        peers.remove("192.168.0.5:5000");
        peers.remove("192.168.0.5:5000");
        assert!(peers.is_empty());
    }

    #[test]
    fn register_rejects_empty_address() {
        let mut peers = PeerRegistry::new();
        assert!(peers.register("http://").is_err());
    }
}
