use smallvec::SmallVec;

/// Number of entries a traversal stack holds inline before it has to spill onto the heap.
///
/// Trees built by the surface area heuristic over practical scenes stay well below this depth.
pub const TRAVERSAL_STACK_CAPACITY: usize = 64;

/// Explicit stack used by iterative tree traversals.
///
/// Lives on the call stack of the query, so concurrent traversals never share state and a query performs no heap
/// allocation unless a degenerate tree exceeds `TRAVERSAL_STACK_CAPACITY`.
#[derive(Debug)]
pub struct TraversalStack<T> {
    entries: SmallVec<[T; TRAVERSAL_STACK_CAPACITY]>,
}

impl<T> Default for TraversalStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TraversalStack<T> {
    /// Creates an empty stack backed by inline storage only.
    #[inline]
    pub fn new() -> Self {
        Self {
            entries: SmallVec::new(),
        }
    }

    #[inline]
    pub fn push(&mut self, entry: T) {
        self.entries.push(entry);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.entries.pop()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the entries still fit in the inline storage.
    #[inline]
    pub fn is_inline(&self) -> bool {
        !self.entries.spilled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_in_first_out() {
        let mut stack = TraversalStack::new();
        stack.push(1);
        stack.push(2);
        stack.push(3);
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.pop(), Some(3));
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.pop(), Some(1));
        assert_eq!(stack.pop(), None);
        assert!(stack.is_empty());
    }

    #[test]
    fn starts_without_heap_storage() {
        let stack = TraversalStack::<(u32, f32)>::new();
        assert!(stack.is_inline());
        assert!(stack.is_empty());
    }

    #[test]
    fn stays_inline_for_shallow_trees() {
        let mut stack = TraversalStack::new();
        for entry in 0..TRAVERSAL_STACK_CAPACITY {
            stack.push(entry);
        }
        assert!(stack.is_inline());
        stack.push(0);
        assert!(!stack.is_inline());
    }
}
