/// A binary heap ordered by a caller-supplied `less` function.
///
/// The element at the top is one for which `less(top, x)` holds against every
/// other element `x` (ties broken arbitrarily). Unlike
/// [`std::collections::BinaryHeap`] the ordering does not have to be the
/// element type's `Ord`, which lets callers key on a projection or break ties
/// on auxiliary data.
pub struct Heap<T, F>
where
    F: Fn(&T, &T) -> bool,
{
    items: Vec<T>,
    less: F,
}

impl<T, F> Heap<T, F>
where
    F: Fn(&T, &T) -> bool,
{
    pub fn new(less: F) -> Self {
        Self::with_capacity(0, less)
    }

    pub fn with_capacity(capacity: usize, less: F) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            less,
        }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
        self.sift_up(self.items.len() - 1);
    }

    /// Removes and returns the top element, or `None` if the heap is empty.
    pub fn pop(&mut self) -> Option<T> {
        if self.items.is_empty() {
            return None;
        }
        let last = self.items.len() - 1;
        self.items.swap(0, last);
        let top = self.items.pop();
        if !self.items.is_empty() {
            self.sift_down(0);
        }
        top
    }

    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.items.first()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if !(self.less)(&self.items[idx], &self.items[parent]) {
                break;
            }
            self.items.swap(idx, parent);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * idx + 1;
            let right = left + 1;
            let mut smallest = idx;

            if left < len && (self.less)(&self.items[left], &self.items[smallest]) {
                smallest = left;
            }
            if right < len && (self.less)(&self.items[right], &self.items[smallest]) {
                smallest = right;
            }
            if smallest == idx {
                return;
            }
            self.items.swap(idx, smallest);
            idx = smallest;
        }
    }
}

impl<T: std::fmt::Debug, F> std::fmt::Debug for Heap<T, F>
where
    F: Fn(&T, &T) -> bool,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Heap").field("len", &self.items.len()).finish()
    }
}
