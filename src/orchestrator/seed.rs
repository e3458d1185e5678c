//! Deterministic per-file seed sequence.

/// Yields `start`, `start + step`, `start + 2·step`, … until the next
/// value would overflow `i64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSequence {
    next: Option<i64>,
    step: i64,
}

impl SeedSequence {
    pub fn new(start: i64, step: i64) -> Self {
        Self {
            next: Some(start),
            step,
        }
    }
}

impl Iterator for SeedSequence {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        let current = self.next?;
        self.next = current.checked_add(self.step);
        Some(current)
    }
}
