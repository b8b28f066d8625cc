use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;

/// Reachability of vendor hosts, decided by the first probe per process.
///
/// Shared by every `ApiClient` on the host through an `Arc`. A host that
/// failed its probe stays unreachable until the process restarts.
#[derive(Debug, Default)]
pub struct HostAvailability {
    hosts: RwLock<HashMap<String, bool>>,
}

impl HostAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` until the host has been probed
    pub fn get(&self, api_url: &str) -> Option<bool> {
        let hosts = self.hosts.read().unwrap_or_else(|e| e.into_inner());
        hosts.get(&host_key(api_url)).copied()
    }

    /// Record a probe result. The first recorded value wins.
    pub fn record(&self, api_url: &str, reachable: bool) -> bool {
        let mut hosts = self.hosts.write().unwrap_or_else(|e| e.into_inner());
        *hosts.entry(host_key(api_url)).or_insert(reachable)
    }
}

fn host_key(api_url: &str) -> String {
    hex::encode(Sha256::digest(api_url.as_bytes()))
}
