//! Transition pick policy: `(trigger) -> TransitionName`.

use std::cell::{Cell, RefCell};

use log::warn;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::catalog::TransitionName;

/// How a transition is chosen when the trigger does not name one.
///
/// - `fixed`: always the configured transition.
/// - `cycle`: catalog order, wrapping around.
/// - `random`: uniform over the catalog. A missing seed is replaced by host
///   entropy at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransitionPolicy {
    Fixed { name: TransitionName },
    Cycle,
    Random {
        #[serde(default)]
        seed: Option<u64>,
    },
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        Self::Random { seed: None }
    }
}

#[derive(Debug)]
pub struct TransitionPicker {
    policy: TransitionPolicy,
    cursor: Cell<usize>,
    rng: RefCell<SmallRng>,
}

impl TransitionPicker {
    pub fn new(policy: TransitionPolicy, entropy: u64) -> Self {
        let seed = match &policy {
            TransitionPolicy::Random { seed: Some(seed) } => *seed,
            _ => entropy,
        };
        Self {
            policy,
            cursor: Cell::new(0),
            rng: RefCell::new(SmallRng::seed_from_u64(seed)),
        }
    }

    pub fn policy(&self) -> &TransitionPolicy {
        &self.policy
    }

    /// Resolve the transition for one navigation. A recognised `requested`
    /// name always wins; an unknown one falls back to the policy.
    pub fn pick(&self, requested: Option<&str>) -> TransitionName {
        if let Some(raw) = requested.filter(|r| !r.trim().is_empty()) {
            match TransitionName::parse(raw) {
                Some(name) => return name,
                None => warn!("unknown transition {raw:?} requested, using pick policy"),
            }
        }
        match &self.policy {
            TransitionPolicy::Fixed { name } => *name,
            TransitionPolicy::Cycle => {
                let i = self.cursor.get();
                self.cursor.set((i + 1) % TransitionName::ALL.len());
                TransitionName::ALL[i]
            }
            TransitionPolicy::Random { .. } => {
                let i = self.rng.borrow_mut().gen_range(0..TransitionName::ALL.len());
                TransitionName::ALL[i]
            }
        }
    }
}
