//! Page re-initialization registry: an ordered list of zero-argument
//! callbacks re-run after every content swap.
//!
//! Callbacks must be idempotent (check for an already-attached marker before
//! creating listeners or nodes). A failing callback is logged and isolated;
//! the remaining callbacks still run.

use std::cell::RefCell;
use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{PassageError, Result};

pub type ReinitFn = Box<dyn Fn() -> anyhow::Result<()>>;

struct Entry {
    name: String,
    callback: ReinitFn,
}

#[derive(Default)]
pub struct ReinitRegistry {
    entries: RefCell<Vec<Entry>>,
}

impl fmt::Debug for ReinitRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReinitRegistry")
            .field("names", &self.names())
            .finish()
    }
}

/// Result of one `run_all` pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReinitReport {
    /// Callbacks that completed, in registration order.
    pub ran: Vec<String>,
    pub failures: Vec<PassageError>,
}

impl ReinitReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl ReinitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback. Fails if called from inside `run_all`.
    pub fn register<F>(&self, name: impl Into<String>, callback: F) -> Result<()>
    where
        F: Fn() -> anyhow::Result<()> + 'static,
    {
        let name = name.into();
        let mut entries = self.entries.try_borrow_mut().map_err(|_| {
            PassageError::config(format!("cannot register {name} while callbacks are running"))
        })?;
        debug!("registered re-init callback {name}");
        entries.push(Entry {
            name,
            callback: Box::new(callback),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }

    /// Run every callback in registration order.
    pub fn run_all(&self) -> ReinitReport {
        let mut report = ReinitReport::default();
        let entries = self.entries.borrow();
        for entry in entries.iter() {
            match (entry.callback)() {
                Ok(()) => report.ran.push(entry.name.clone()),
                Err(e) => {
                    warn!("re-init callback {} failed: {e:#}", entry.name);
                    report.failures.push(PassageError::Reinit {
                        name: entry.name.clone(),
                        reason: format!("{e:#}"),
                    });
                }
            }
        }
        report
    }
}
