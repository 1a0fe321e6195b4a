//! Core types for spark-dom.
//!
//! Handles and identity tokens shared by the document, the component
//! registry and the reconciler.

use std::cell::Cell;
use std::fmt;

// =============================================================================
// Node Handle
// =============================================================================

/// Handle to a live node in a [`Document`](crate::dom::Document).
///
/// Slots are reused after a node is freed, but every free bumps the slot's
/// generation, so a stale handle never resolves to a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the document arena.
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}v{}", self.index, self.generation)
    }
}

// =============================================================================
// Component Instance Handle
// =============================================================================

/// Process-unique identifier of a mounted component instance.
///
/// Generated from a monotonic counter owned by the registry; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub(crate) u64);

impl InstanceId {
    /// Raw counter value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component-{}", self.0)
    }
}

// =============================================================================
// Key
// =============================================================================

/// Identity token used to match reordered siblings across renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&String> for Key {
    fn from(value: &String) -> Self {
        Self(value.clone())
    }
}

macro_rules! key_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Key {
                fn from(value: $t) -> Self {
                    Self(value.to_string())
                }
            }
        )*
    };
}

key_from_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

// =============================================================================
// Events
// =============================================================================

/// Reserved event name for post-attach callbacks.
pub const MOUNT_EVENT: &str = "mount";

/// An event delivered to listeners by [`Runtime::dispatch`](crate::Runtime::dispatch).
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event name (e.g. "click", "input").
    pub name: String,
    /// Optional payload supplied by the host (e.g. an input's new value).
    pub value: Option<String>,
    stopped: Cell<bool>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            stopped: Cell::new(false),
        }
    }

    /// Event carrying a host payload.
    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::new(name)
        }
    }

    /// The synthetic event passed to `mount` handlers.
    pub fn mount() -> Self {
        Self::new(MOUNT_EVENT)
    }

    /// Stop bubbling to ancestors after the current node's listeners.
    pub fn stop_propagation(&self) {
        self.stopped.set(true);
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.stopped.get()
    }
}

// =============================================================================
// Patch Flags (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// What an in-place patch of an element actually changed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PatchFlags: u8 {
        const CLASS = 0b0000_0001;
        const STYLE = 0b0000_0010;
        const DATASET = 0b0000_0100;
        const ATTRIBUTES = 0b0000_1000;
        const LISTENERS = 0b0001_0000;
        const IDENTITY = 0b0010_0000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_id_display() {
        assert_eq!(InstanceId(7).to_string(), "component-7");
    }

    #[test]
    fn test_key_conversions() {
        assert_eq!(Key::from("a"), Key::new("a"));
        assert_eq!(Key::from(42u32).as_str(), "42");
        assert_eq!(Key::from(String::from("b")).to_string(), "b");
    }

    #[test]
    fn test_event_propagation_flag() {
        let event = Event::with_value("input", "hello");
        assert_eq!(event.value.as_deref(), Some("hello"));
        assert!(!event.is_propagation_stopped());
        event.stop_propagation();
        assert!(event.is_propagation_stopped());
    }

    #[test]
    fn test_patch_flags_combine() {
        let flags = PatchFlags::CLASS | PatchFlags::STYLE;
        assert!(flags.contains(PatchFlags::CLASS));
        assert!(!flags.contains(PatchFlags::LISTENERS));
        assert!(PatchFlags::default().is_empty());
    }
}
