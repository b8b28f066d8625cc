//! Update client for commercially licensed packages.
//!
//! Checks a vendor server for newer releases of an installed package,
//! feeds the result into the host's update aggregate, and manages the
//! license key that gates those checks.

pub mod updater;

pub use updater::{
    Action, ApiResponse, HookRegistry, HostAvailability, HostContext, InfoRequest,
    LicenseStatus, PackageIdentity, PackageUpdater, UpdateHook, UpdaterConfig, UpdaterError,
    UpdaterResult,
};
