// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `Context`: the per-process aggregate root (spec.md §5, "Single tick
//! thread per `Context`; global singletons live here, not in statics").
//!
//! One `Context` owns the runtime configuration, the network-interface
//! service, and the tick thread every `Controller`/`Device`/`LlrpManager`/
//! `LlrpTarget` created against it shares.

use std::sync::Arc;

use crate::config::{NetintConfig, RuntimeConfig};
use crate::core::rt::scheduler::Scheduler;
use crate::core::cid::Cid;
use crate::error::Result;
use crate::transport::netint::NetintService;

/// Shared process state: configuration, interface enumeration, and the
/// tick thread.
///
/// Cheap to clone — every field is already `Arc`-backed or `Clone`-cheap
/// — so callers can hand a `Context` to multiple `Controller`/`Device`
/// instances without wrapping it themselves.
#[derive(Clone)]
pub struct Context {
    config: RuntimeConfig,
    netints: Arc<NetintService>,
    scheduler: Arc<Scheduler>,
}

impl Context {
    /// Enumerate network interfaces, apply `netint_override` if given,
    /// and spawn the tick thread.
    ///
    /// # Errors
    /// Returns an error if interface enumeration or the tick thread
    /// fails to start.
    pub fn new(netint_override: Option<NetintConfig>) -> Result<Self> {
        let config = RuntimeConfig::new();
        if let Some(netint) = netint_override {
            config.set_netint(netint);
        }
        let netints = NetintService::discover()?;
        let scheduler = Scheduler::spawn()?;
        Ok(Self { config, netints: Arc::new(netints), scheduler: Arc::new(scheduler) })
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn netints(&self) -> &NetintService {
        &self.netints
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Generate a fresh, process-unique CID seeded from [`fastrand`].
    #[must_use]
    pub fn generate_cid(&self) -> Cid {
        Cid::from_rng(fastrand::u8)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").field("netints", &self.netints.interfaces().len()).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_cid_is_not_nil_and_varies() {
        let ctx = Context::new(None).expect("context");
        let a = ctx.generate_cid();
        let b = ctx.generate_cid();
        assert!(!a.is_nil());
        assert_ne!(a, b);
    }
}
