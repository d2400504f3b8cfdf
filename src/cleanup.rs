//! Page-wide ledger of teardown callbacks.
//!
//! Every widget registers how to tear itself down under its component name.
//! Registering a name that already exists composes: the new teardown joins
//! the same entry, ahead of the earlier ones. On page teardown every
//! callback runs exactly once; a failing or panicking callback is logged and
//! the rest still run.
//!
//! The registry is generic over the context handed to teardowns so it never
//! has to own element handles itself. The runtime passes itself in.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use anyhow::Result;

/// A teardown callback receiving the page context.
pub type Teardown<C> = Box<dyn FnOnce(&mut C) -> Result<()>>;

struct CleanupEntry<C> {
    name: String,
    /// Newest first.
    teardowns: Vec<Teardown<C>>,
}

/// Outcome of draining some or all of the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Callbacks invoked, including failed ones.
    pub ran: usize,
    /// Component names whose callbacks failed, one per failure.
    pub failed: Vec<String>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn merge(&mut self, other: Self) {
        self.ran += other.ran;
        self.failed.extend(other.failed);
    }
}

pub struct CleanupRegistry<C> {
    entries: Vec<CleanupEntry<C>>,
}

impl<C> Default for CleanupRegistry<C> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<C> fmt::Debug for CleanupRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|e| (&e.name, e.teardowns.len())))
            .finish()
    }
}

impl<C> CleanupRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `teardown` under `name`, composing with any existing entry.
    pub fn register<F>(&mut self, name: &str, teardown: F)
    where
        F: FnOnce(&mut C) -> Result<()> + 'static,
    {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.teardowns.insert(0, Box::new(teardown)),
            None => self.entries.push(CleanupEntry {
                name: name.to_string(),
                teardowns: vec![Box::new(teardown)],
            }),
        }
        tracing::debug!(component = name, "teardown registered");
    }

    /// Number of distinct component names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total callbacks across all names.
    pub fn teardown_count(&self) -> usize {
        self.entries.iter().map(|e| e.teardowns.len()).sum()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// Registered names, in first-registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Run and forget every teardown.
    pub fn cleanup_all(&mut self, ctx: &mut C) -> CleanupReport {
        let mut report = CleanupReport::default();
        for entry in std::mem::take(&mut self.entries) {
            report.merge(run_entry(entry, ctx));
        }
        if !report.is_clean() {
            tracing::warn!(failed = report.failed.len(), "page teardown finished with failures");
        }
        report
    }

    /// Run one entry, addressed by component name or by its global hook
    /// name (`cleanupCarousel`). Returns `None` if nothing is registered.
    pub fn cleanup(&mut self, name_or_hook: &str, ctx: &mut C) -> Option<CleanupReport> {
        let index = self
            .entries
            .iter()
            .position(|e| e.name == name_or_hook || hook_name(&e.name) == name_or_hook)?;
        let entry = self.entries.remove(index);
        Some(run_entry(entry, ctx))
    }
}

/// Global attachment name for a component: `sticky-bar` → `cleanupStickyBar`.
pub fn hook_name(name: &str) -> String {
    let mut hook = String::from("cleanup");
    for part in name.split(['-', '_', ' ']).filter(|p| !p.is_empty()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            hook.extend(first.to_uppercase());
            hook.push_str(chars.as_str());
        }
    }
    hook
}

fn run_entry<C>(entry: CleanupEntry<C>, ctx: &mut C) -> CleanupReport {
    let mut report = CleanupReport::default();
    for teardown in entry.teardowns {
        report.ran += 1;
        match panic::catch_unwind(AssertUnwindSafe(|| teardown(ctx))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(component = %entry.name, "teardown failed: {err:#}");
                report.failed.push(entry.name.clone());
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::warn!(component = %entry.name, "teardown panicked: {message}");
                report.failed.push(entry.name.clone());
            }
        }
    }
    report
}
