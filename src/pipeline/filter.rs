//! Filter units, the edits that mutate a chain of them, and the chain itself

use std::fmt;
use std::sync::Arc;

use image::RgbaImage;

use crate::error::{CompositorError, CompositorResult};

/// An opaque effect applied in place to the composite texture.
pub trait Filter: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called on the render thread when the filter enters a chain, and again
    /// whenever the composite resolution changes.
    fn prepare(&self, _width: u32, _height: u32) {}

    fn apply(&self, texture: &mut RgbaImage);
}

pub type FilterHandle = Arc<dyn Filter>;

fn same_filter(a: &FilterHandle, b: &FilterHandle) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterAction {
    Set,
    SetAtIndex,
    Add,
    AddAtIndex,
    Remove,
    RemoveAtIndex,
    Clear,
}

/// A pending change to the filter chain.
#[derive(Clone)]
pub enum FilterEdit {
    /// Replace the first filter, or add one to an empty chain.
    Set(FilterHandle),
    SetAt(usize, FilterHandle),
    Add(FilterHandle),
    AddAt(usize, FilterHandle),
    Remove(FilterHandle),
    RemoveAt(usize),
    Clear,
}

impl FilterEdit {
    pub fn action(&self) -> FilterAction {
        match self {
            FilterEdit::Set(_) => FilterAction::Set,
            FilterEdit::SetAt(..) => FilterAction::SetAtIndex,
            FilterEdit::Add(_) => FilterAction::Add,
            FilterEdit::AddAt(..) => FilterAction::AddAtIndex,
            FilterEdit::Remove(_) => FilterAction::Remove,
            FilterEdit::RemoveAt(_) => FilterAction::RemoveAtIndex,
            FilterEdit::Clear => FilterAction::Clear,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            FilterEdit::SetAt(index, _) | FilterEdit::AddAt(index, _) | FilterEdit::RemoveAt(index) => {
                Some(*index)
            }
            _ => None,
        }
    }

    pub fn filter(&self) -> Option<&FilterHandle> {
        match self {
            FilterEdit::Set(f)
            | FilterEdit::SetAt(_, f)
            | FilterEdit::Add(f)
            | FilterEdit::AddAt(_, f)
            | FilterEdit::Remove(f) => Some(f),
            FilterEdit::RemoveAt(_) | FilterEdit::Clear => None,
        }
    }

    /// The filter this edit puts into a chain, if any.
    pub fn inserted(&self) -> Option<&FilterHandle> {
        match self {
            FilterEdit::Remove(_) => None,
            _ => self.filter(),
        }
    }
}

impl fmt::Debug for FilterEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("FilterEdit");
        s.field("action", &self.action());
        if let Some(index) = self.index() {
            s.field("index", &index);
        }
        if let Some(filter) = self.filter() {
            s.field("filter", &filter.name());
        }
        s.finish()
    }
}

/// Ordered filters run by the composite pass. Owned by the render thread.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<FilterHandle>,
    /// 0 means unlimited.
    max_filters: usize,
}

impl FilterChain {
    pub fn new(max_filters: usize) -> Self {
        Self {
            filters: Vec::new(),
            max_filters,
        }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, index: usize) -> Option<&FilterHandle> {
        self.filters.get(index)
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &FilterHandle> {
        self.filters.iter()
    }

    /// Apply one edit. A failing edit leaves the chain untouched.
    pub fn apply(&mut self, edit: FilterEdit) -> CompositorResult<()> {
        let len = self.filters.len();
        match edit {
            FilterEdit::Set(filter) => match self.filters.first_mut() {
                Some(slot) => *slot = filter,
                None => self.filters.push(filter),
            },
            FilterEdit::SetAt(index, filter) => {
                let slot = self
                    .filters
                    .get_mut(index)
                    .ok_or(CompositorError::FilterIndexOutOfRange { index, len })?;
                *slot = filter;
            }
            FilterEdit::Add(filter) => {
                self.check_limit()?;
                self.filters.push(filter);
            }
            FilterEdit::AddAt(index, filter) => {
                self.check_limit()?;
                if index > len {
                    return Err(CompositorError::FilterIndexOutOfRange { index, len });
                }
                self.filters.insert(index, filter);
            }
            FilterEdit::Remove(filter) => {
                let position = self
                    .filters
                    .iter()
                    .position(|f| same_filter(f, &filter))
                    .ok_or(CompositorError::FilterNotFound)?;
                self.filters.remove(position);
            }
            FilterEdit::RemoveAt(index) => {
                if index >= len {
                    return Err(CompositorError::FilterIndexOutOfRange { index, len });
                }
                self.filters.remove(index);
            }
            FilterEdit::Clear => self.filters.clear(),
        }
        Ok(())
    }

    /// Run every filter in order over `texture`.
    pub fn run(&self, texture: &mut RgbaImage) {
        for filter in &self.filters {
            filter.apply(texture);
        }
    }

    pub fn prepare_all(&self, width: u32, height: u32) {
        for filter in &self.filters {
            filter.prepare(width, height);
        }
    }

    fn check_limit(&self) -> CompositorResult<()> {
        if self.max_filters > 0 && self.filters.len() >= self.max_filters {
            return Err(CompositorError::FilterLimitExceeded(self.max_filters));
        }
        Ok(())
    }
}
