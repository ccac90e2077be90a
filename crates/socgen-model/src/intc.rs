//! Interrupt controller model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Registry mapping interrupt lines to controller indices.
///
/// Each line is owned by a peripheral and is referred to by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InterruptController {
    /// Instance name.
    pub name: String,
    /// Registered lines and their indices.
    #[serde(default)]
    pub lines: BTreeMap<String, u32>,
}

impl InterruptController {
    /// Create a controller with no registered lines.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lines: BTreeMap::new(),
        }
    }

    /// Register `line` at `index`.
    ///
    /// Fails if the line or the index is already taken.
    pub fn add_irq(&mut self, line: impl Into<String>, index: u32) -> Result<()> {
        let line = line.into();
        if self.lines.contains_key(&line) {
            return Err(ModelError::Validation {
                detail: format!("interrupt line '{line}' registered twice"),
            });
        }
        if let Some(owner) = self.line_at(index) {
            return Err(ModelError::Validation {
                detail: format!("interrupt index {index} already used by '{owner}'"),
            });
        }
        self.lines.insert(line, index);
        Ok(())
    }

    /// Index assigned to `line`.
    pub fn find_index(&self, line: &str) -> Result<u32> {
        self.lines
            .get(line)
            .copied()
            .ok_or_else(|| ModelError::UnregisteredInterrupt {
                line: line.to_string(),
            })
    }

    /// Line registered at `index`, if any.
    pub fn line_at(&self, index: u32) -> Option<&str> {
        self.lines
            .iter()
            .find(|(_, &i)| i == index)
            .map(|(line, _)| line.as_str())
    }

    /// Registered lines ordered by index.
    pub fn iter_by_index(&self) -> Vec<(u32, &str)> {
        let mut out: Vec<(u32, &str)> = self
            .lines
            .iter()
            .map(|(line, &index)| (index, line.as_str()))
            .collect();
        out.sort();
        out
    }

    /// Indices that are claimed by more than one line.
    pub fn duplicate_indices(&self) -> Vec<u32> {
        let by_index = self.iter_by_index();
        let mut dups: Vec<u32> = by_index
            .windows(2)
            .filter(|w| w[0].0 == w[1].0)
            .map(|w| w[0].0)
            .collect();
        dups.dedup();
        dups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_registered_line() {
        let mut intc = InterruptController::new("intc");
        intc.add_irq("timer", 0).unwrap();
        intc.add_irq("uart", 1).unwrap();
        assert_eq!(intc.find_index("uart").unwrap(), 1);
        assert_eq!(intc.line_at(0), Some("timer"));
        assert_eq!(intc.iter_by_index(), vec![(0, "timer"), (1, "uart")]);
    }

    #[test]
    fn unregistered_line_fails() {
        let intc = InterruptController::new("intc");
        let err = intc.find_index("spi").unwrap_err();
        assert!(matches!(err, ModelError::UnregisteredInterrupt { ref line } if line == "spi"));
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut intc = InterruptController::new("intc");
        intc.add_irq("uart", 1).unwrap();
        assert!(intc.add_irq("uart", 2).is_err());
        assert!(intc.add_irq("timer", 1).is_err());
    }

    #[test]
    fn duplicate_indices_detected_from_raw_map() {
        let mut intc = InterruptController::new("intc");
        intc.lines.insert("a".into(), 3);
        intc.lines.insert("b".into(), 3);
        intc.lines.insert("c".into(), 4);
        assert_eq!(intc.duplicate_indices(), vec![3]);
    }
}
