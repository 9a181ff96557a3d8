//! Render configuration.
//!
//! Thread-local like the rest of the document state. Read with [`config`],
//! change with [`set_config`] or the narrower setters.

use std::cell::RefCell;

/// What happens to nodes cleared out of a marked range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClearPolicy {
    /// Move the nodes into a fresh inert fragment. Code still holding a
    /// handle can keep touching them without affecting the live document,
    /// until the next clear (or [`flush_parked`](crate::engine::flush_parked))
    /// releases the fragment.
    #[default]
    Park,
    /// Detach and free the arena slots. Old handles become stale.
    Release,
}

/// Rendering knobs for ranges and lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    pub clear_policy: ClearPolicy,
    /// Comment text of the start marker of an `observing` range.
    pub range_start: String,
    /// Comment text of the end marker of an `observing` range.
    pub range_end: String,
    /// Comment text of per-item markers in a mapped list.
    pub item: String,
    /// Comment text of the trailing sentinel of a mapped list.
    pub list_end: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            clear_policy: ClearPolicy::Park,
            range_start: "(".to_string(),
            range_end: ")".to_string(),
            item: "|".to_string(),
            list_end: "#".to_string(),
        }
    }
}

thread_local! {
    static CONFIG: RefCell<RenderConfig> = RefCell::new(RenderConfig::default());
}

/// Current configuration.
pub fn config() -> RenderConfig {
    CONFIG.with(|c| c.borrow().clone())
}

/// Replace the configuration.
pub fn set_config(config: RenderConfig) {
    CONFIG.with(|c| *c.borrow_mut() = config);
}

/// Current clear policy.
pub fn clear_policy() -> ClearPolicy {
    CONFIG.with(|c| c.borrow().clear_policy)
}

pub fn set_clear_policy(policy: ClearPolicy) {
    CONFIG.with(|c| c.borrow_mut().clear_policy = policy);
}

/// Reset to defaults (for testing).
pub fn reset_config() {
    set_config(RenderConfig::default());
}
