// License-gated update client
// Vendor API, result cache, license state and host hooks

pub mod types;
pub mod config;
pub mod site;
pub mod storage;
pub mod serialized;
pub mod response;
pub mod availability;
pub mod api;
pub mod cache;
pub mod version;
pub mod settings;
pub mod manager;
pub mod checker;
pub mod hooks;
pub mod package;
pub mod admin;

pub use types::*;
pub use config::UpdaterConfig;
pub use response::ApiResponse;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use availability::HostAvailability;
pub use hooks::{HookOutcome, HookRegistry, UpdateHook};
pub use package::PackageUpdater;
pub use admin::{AdminNotice, AdminResponse, CsrfVerifier, KeyAction, KeyForm};
