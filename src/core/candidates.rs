//! Candidate replies collected for a single turn.
//!
//! A [`CandidateSet`] is sized once when generation starts and only ever grows
//! by appending fragments to an existing slot. The streaming task and the
//! control loop share it through [`SharedCandidates`].

use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    candidates: Vec<String>,
}

impl CandidateSet {
    pub fn new(count: usize) -> Self {
        Self {
            candidates: vec![String::new(); count],
        }
    }

    /// Appends `fragment` to the candidate at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside `0..count()`. Backends must only emit
    /// indices they announced when the response started.
    pub fn apply_delta(&mut self, index: usize, fragment: &str) {
        let count = self.candidates.len();
        match self.candidates.get_mut(index) {
            Some(candidate) => candidate.push_str(fragment),
            None => panic!("delta for candidate {index} but only {count} candidates exist"),
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.candidates.get(index).map(String::as_str)
    }

    pub fn count(&self) -> usize {
        self.candidates.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(String::as_str)
    }

    pub fn render_all(&self) -> String {
        self.candidates
            .iter()
            .enumerate()
            .map(|(i, text)| format!("\nResponse {i}: {text}\n"))
            .collect()
    }
}

/// Handle to a candidate set that a background task writes into while the
/// control loop reads it.
#[derive(Debug, Clone)]
pub struct SharedCandidates {
    inner: Arc<Mutex<CandidateSet>>,
}

impl SharedCandidates {
    pub fn new(count: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CandidateSet::new(count))),
        }
    }

    pub fn apply_delta(&self, index: usize, fragment: &str) {
        self.lock().apply_delta(index, fragment);
    }

    pub fn get(&self, index: usize) -> Option<String> {
        self.lock().get(index).map(str::to_owned)
    }

    pub fn snapshot(&self) -> CandidateSet {
        self.lock().clone()
    }

    // A writer that panicked on a bad index leaves the text it already
    // appended intact, so a poisoned lock is still readable.
    fn lock(&self) -> MutexGuard<'_, CandidateSet> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
