//! Closable sequences handed out by the plumbing layer
//!
//! A `Series` is consumed once: either step through it with [`Iterator::next`]
//! or visit everything with [`Series::visit`]. Both leave it closed.

use std::ops::ControlFlow;

/// Sequence of plumbing values (commits, files, references, remotes)
#[derive(Debug, Clone)]
pub struct Series<T> {
    pos: usize,
    items: Vec<T>,
}

impl<T> Series<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { pos: 0, items }
    }

    /// Marks the series as exhausted
    pub fn close(&mut self) {
        self.pos = self.items.len();
    }

    pub fn is_closed(&self) -> bool {
        self.pos >= self.items.len()
    }

    /// Number of items not yet handed out by `next`
    pub fn remaining(&self) -> usize {
        self.items.len() - self.pos.min(self.items.len())
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    /// Visit every item in order, from the start of the series.
    ///
    /// The callback stops the walk early by returning `ControlFlow::Break`,
    /// which is not an error. The series is closed afterwards in every case.
    pub fn visit<E, F>(&mut self, mut f: F) -> Result<(), E>
    where
        F: FnMut(&T) -> Result<ControlFlow<()>, E>,
    {
        let result = self.items.iter().try_for_each(|item| match f(item) {
            Ok(ControlFlow::Continue(())) => Ok(()),
            Ok(ControlFlow::Break(())) => Err(None),
            Err(err) => Err(Some(err)),
        });
        self.close();

        match result {
            Ok(()) | Err(None) => Ok(()),
            Err(Some(err)) => Err(err),
        }
    }
}

impl<T: Clone> Iterator for Series<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let item = self.items.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }
}

impl<T> From<Vec<T>> for Series<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}
