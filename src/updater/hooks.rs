//! Dispatch points the host invokes.
//!
//! Each registered hook either passes or hands back a replacement value.
//! Hooks run in registration order and each sees the value produced so
//! far; when every hook passes the host gets its input back untouched.

use async_trait::async_trait;
use std::sync::Arc;

use crate::updater::response::ApiResponse;
use crate::updater::types::{HostContext, InfoRequest, UpdateTransient};

#[derive(Clone, Debug, PartialEq)]
pub enum HookOutcome<T> {
    Pass,
    Replace(T),
}

impl<T> HookOutcome<T> {
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(value) => HookOutcome::Replace(value),
            None => HookOutcome::Pass,
        }
    }

    fn apply(self, current: T) -> T {
        match self {
            HookOutcome::Pass => current,
            HookOutcome::Replace(value) => value,
        }
    }
}

#[async_trait]
pub trait UpdateHook: Send + Sync {
    /// Host is about to persist its pending-updates aggregate
    async fn on_update_check(
        &self,
        transient: &UpdateTransient,
        ctx: &HostContext,
    ) -> HookOutcome<UpdateTransient>;

    /// Host asks for package details
    async fn on_plugin_info(
        &self,
        current: Option<&ApiResponse>,
        request: &InfoRequest,
    ) -> HookOutcome<ApiResponse>;
}

/// Ordered list of hooks for every package installed on the host
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: Vec<Arc<dyn UpdateHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Arc<dyn UpdateHook>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub async fn apply_update_check(
        &self,
        transient: UpdateTransient,
        ctx: &HostContext,
    ) -> UpdateTransient {
        let mut current = transient;
        for hook in &self.hooks {
            let outcome = hook.on_update_check(&current, ctx).await;
            current = outcome.apply(current);
        }
        current
    }

    pub async fn apply_plugin_info(
        &self,
        data: Option<ApiResponse>,
        request: &InfoRequest,
    ) -> Option<ApiResponse> {
        let mut current = data;
        for hook in &self.hooks {
            if let HookOutcome::Replace(value) = hook.on_plugin_info(current.as_ref(), request).await {
                current = Some(value);
            }
        }
        current
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
