//! Wire labels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An addressable subsystem label.
///
/// Tapes may freely mix integer and string labels (`0`, `"a"`, `4`); the
/// device decides how labels map to positions in its state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Wire {
    /// An integer label.
    Index(u32),
    /// A string label.
    Label(String),
}

impl fmt::Display for Wire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Wire::Index(i) => write!(f, "{i}"),
            Wire::Label(l) => write!(f, "{l}"),
        }
    }
}

impl From<u32> for Wire {
    fn from(id: u32) -> Self {
        Wire::Index(id)
    }
}

impl From<i32> for Wire {
    fn from(id: i32) -> Self {
        Wire::Index(u32::try_from(id).expect("wire index must be non-negative"))
    }
}

impl From<usize> for Wire {
    fn from(id: usize) -> Self {
        Wire::Index(u32::try_from(id).expect("wire index overflow: exceeds u32::MAX"))
    }
}

impl From<&str> for Wire {
    fn from(label: &str) -> Self {
        Wire::Label(label.to_string())
    }
}

impl From<String> for Wire {
    fn from(label: String) -> Self {
        Wire::Label(label)
    }
}

/// Collect wires into a list with duplicates removed, keeping first appearance.
pub fn unique_wires<'a>(wires: impl IntoIterator<Item = &'a Wire>) -> Vec<Wire> {
    let mut out: Vec<Wire> = Vec::new();
    for w in wires {
        if !out.contains(w) {
            out.push(w.clone());
        }
    }
    out
}
