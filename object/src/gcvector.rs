use std::fmt::{self, Write as _};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};
use std::ptr::{self, NonNull};

use crate::alloc::{BlockAllocator, Moveable, SystemAllocator};
use crate::hard_error;

/// A growable sequence whose storage the collector is allowed to relocate.
///
/// The vector itself is one pointer wide: a handle to a [`Moveable`] block
/// holding the capacity, the logical end and the elements. The handle is
/// the only path to the block, so a collector that moves the block only has
/// to repoint it with [`GcVector::set_contents`].
///
/// An empty vector has no block at all; the first `reserve`, `push_back`,
/// `resize` or `emplace` allocates one.
pub struct GcVector<T, A: BlockAllocator = SystemAllocator> {
    contents: Option<NonNull<Moveable<T>>>,
    _alloc: PhantomData<A>,
}

impl<T, A: BlockAllocator> GcVector<T, A> {
    pub const fn new() -> Self {
        Self {
            contents: None,
            _alloc: PhantomData,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut vector = Self::new();
        vector.reserve(capacity);
        vector
    }

    // ── Handle ─────────────────────────────────────────────────────

    /// The block handle as the collector sees it.
    #[inline(always)]
    pub fn contents(&self) -> Option<NonNull<Moveable<T>>> {
        self.contents
    }

    /// Repoint the handle after the collector moved the block.
    ///
    /// # Safety
    ///
    /// `contents` must be a bitwise copy of the current block (or `None` if
    /// the vector was empty), allocated so that `A` can release it. The old
    /// block is not released.
    #[inline(always)]
    pub unsafe fn set_contents(&mut self, contents: Option<NonNull<Moveable<T>>>) {
        self.contents = contents;
    }

    #[inline(always)]
    fn block(&self) -> Option<&Moveable<T>> {
        // SAFETY: the handle always points to a live block
        self.contents.map(|block| unsafe { &*block.as_ptr() })
    }

    /// `(end, capacity)` of the block, if any.
    #[inline(always)]
    fn extent(&self) -> Option<(usize, usize)> {
        self.block().map(|block| (block.end(), block.capacity()))
    }

    // ── Size ───────────────────────────────────────────────────────

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.block().map_or(0, Moveable::end)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.size()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.block().map_or(0, Moveable::capacity)
    }

    // ── Access ─────────────────────────────────────────────────────

    /// Pointer to the first element, null when there is no block.
    #[inline(always)]
    pub fn data(&self) -> *mut T {
        match self.contents {
            // SAFETY: block is live
            Some(block) => unsafe { Moveable::data(block) },
            None => ptr::null_mut(),
        }
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> *const T {
        self.data()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        match self.contents {
            // SAFETY: elements below end are initialized
            Some(block) => unsafe {
                std::slice::from_raw_parts(Moveable::data(block), self.size())
            },
            None => &[],
        }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        match self.contents {
            // SAFETY: elements below end are initialized, borrow is unique
            Some(block) => unsafe {
                std::slice::from_raw_parts_mut(Moveable::data(block), self.size())
            },
            None => &mut [],
        }
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.as_mut_slice().get_mut(index)
    }

    /// # Safety
    ///
    /// The vector must have a block and `index` must be below its size.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        debug_assert!(index < self.size());
        // SAFETY: guaranteed by caller
        unsafe { &*self.data().add(index) }
    }

    /// # Safety
    ///
    /// The vector must have a block and `index` must be below its size.
    #[inline(always)]
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(index < self.size());
        // SAFETY: guaranteed by caller
        unsafe { &mut *self.data().add(index) }
    }

    #[inline]
    fn checked_index(&self, index: usize) -> *mut T {
        let Some(block) = self.block() else {
            hard_error!("GcVector had no contents");
        };
        if index >= block.end() {
            hard_error!("GcVector index {index} out of range for size {}", block.end());
        }
        // SAFETY: in range
        unsafe { self.data().add(index) }
    }

    // ── Growth ─────────────────────────────────────────────────────

    /// Move every element into a fresh block of `capacity` and release the
    /// old one. Elements are moved bitwise, so the old slots are not dropped.
    fn relocate(&mut self, capacity: usize) {
        let new_block = A::allocate::<T>(capacity);
        let Some(old_block) = self.contents else {
            self.contents = Some(new_block);
            return;
        };
        // SAFETY: both blocks are live and distinct
        unsafe {
            let old = &mut *old_block.as_ptr();
            let len = old.end();
            debug_assert!(len <= capacity);
            ptr::copy_nonoverlapping(
                Moveable::data(old_block),
                Moveable::data(new_block),
                len,
            );
            (*new_block.as_ptr()).set_end(len);
            let old_capacity = old.capacity();
            old.set_end(0);
            self.contents = Some(new_block);
            A::deallocate(old_block, old_capacity);
        }
    }

    /// Make room for at least `n` elements.
    ///
    /// An empty vector gets a block of exactly `n` (or [`BlockAllocator::PAD`]
    /// for zero); a vector with a smaller block is relocated into exactly `n`.
    pub fn reserve(&mut self, n: usize) {
        match self.extent() {
            None => {
                let capacity = if n == 0 { A::PAD } else { n };
                self.contents = Some(A::allocate::<T>(capacity));
            }
            Some((_, capacity)) if n > capacity => self.relocate(n),
            Some(_) => {}
        }
    }

    /// Append `value`, growing the block if it is full.
    pub fn push_back(&mut self, value: T) {
        match self.extent() {
            None => self.reserve(A::PAD),
            Some((end, capacity)) if end == capacity => self.relocate(A::grown(capacity)),
            Some(_) => {}
        }
        let Some(block) = self.contents else {
            hard_error!("GcVector had no contents after growing");
        };
        // SAFETY: end < capacity after growth
        unsafe {
            let head = &mut *block.as_ptr();
            let end = head.end();
            A::construct(Moveable::data(block).add(end), value);
            head.set_end(end + 1);
        }
    }

    #[inline]
    pub fn emplace_back(&mut self, value: T) {
        self.push_back(value);
    }

    /// Remove the last element.
    pub fn pop_back(&mut self) -> Option<T> {
        let block = self.contents?;
        // SAFETY: block is live, the popped slot is initialized
        unsafe {
            let head = &mut *block.as_ptr();
            let end = head.end().checked_sub(1)?;
            head.set_end(end);
            Some(ptr::read(Moveable::data(block).add(end)))
        }
    }

    /// Insert `value` at `pos`, shifting the tail towards the end.
    pub fn emplace(&mut self, pos: usize, value: T) -> usize {
        let len = self.size();
        if pos > len {
            hard_error!("GcVector emplace at {pos} past size {len}");
        }
        match self.extent() {
            None => self.reserve(A::PAD),
            Some((end, capacity)) if end == capacity => self.relocate(A::grown_to(end + 1)),
            Some(_) => {}
        }
        let Some(block) = self.contents else {
            hard_error!("GcVector had no contents after growing");
        };
        // SAFETY: len < capacity after growth, pos <= len
        unsafe {
            let data = Moveable::data(block);
            ptr::copy(data.add(pos), data.add(pos + 1), len - pos);
            A::construct(data.add(pos), value);
            (*block.as_ptr()).set_end(len + 1);
        }
        pos
    }

    /// Remove the element at `pos`, shifting the tail towards it.
    pub fn erase(&mut self, pos: usize) -> usize {
        let len = self.size();
        if pos >= len {
            hard_error!("GcVector erase at {pos} with size {len}");
        }
        let Some(block) = self.contents else {
            hard_error!("GcVector had no contents");
        };
        // SAFETY: pos < len, the removed element is read out before the tail
        // closes over its slot
        let removed = unsafe {
            let data = Moveable::data(block);
            let removed = ptr::read(data.add(pos));
            ptr::copy(data.add(pos + 1), data.add(pos), len - pos - 1);
            (*block.as_ptr()).set_end(len - 1);
            removed
        };
        drop(removed);
        pos
    }

    /// Drop every element, keeping the block.
    pub fn clear(&mut self) {
        let Some(block) = self.contents else {
            return;
        };
        // SAFETY: end is lowered before the elements are dropped
        unsafe {
            let len = (*block.as_ptr()).end();
            (*block.as_ptr()).set_end(0);
            let data = Moveable::data(block);
            for i in 0..len {
                A::destroy(data.add(i));
            }
        }
    }

    /// Exchange blocks with `other`.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(&mut self.contents, &mut other.contents);
    }

    /// Move the block out, leaving an empty vector behind.
    #[inline]
    pub fn take(&mut self) -> Self {
        Self {
            contents: self.contents.take(),
            _alloc: PhantomData,
        }
    }

    /// Null the handle, then drop the elements and release the block.
    fn release(&mut self) {
        let Some(block) = self.contents.take() else {
            return;
        };
        // SAFETY: the handle no longer reaches the block
        unsafe {
            let head = &mut *block.as_ptr();
            let (len, capacity) = (head.end(), head.capacity());
            head.set_end(0);
            let data = Moveable::data(block);
            for i in 0..len {
                A::destroy(data.add(i));
            }
            A::deallocate(block, capacity);
        }
    }
}

impl<T: Clone, A: BlockAllocator> GcVector<T, A> {
    /// Set the size to `n`, filling new slots with clones of `fill`.
    ///
    /// Shrinking is logical only; the block keeps its capacity.
    pub fn resize(&mut self, n: usize, fill: T) {
        let len = self.size();
        match self.extent() {
            None => {
                let capacity = if n == 0 { A::PAD } else { A::grown_to(n) };
                self.contents = Some(A::allocate::<T>(capacity));
            }
            Some(_) if n == len => return,
            Some((_, capacity)) if n > capacity => self.relocate(A::grown_to(n)),
            Some((_, capacity)) if n < len => {
                if (n as f32) < capacity as f32 * A::SHRINK {
                    log::trace!("GcVector shrink to {n} keeps capacity {capacity}");
                }
                self.truncate(n);
                return;
            }
            Some(_) => {}
        }
        let Some(block) = self.contents else {
            hard_error!("GcVector had no contents after growing");
        };
        // SAFETY: capacity >= n; end is bumped per element so a panicking
        // clone leaves only initialized slots below end
        unsafe {
            let data = Moveable::data(block);
            for i in self.size()..n {
                A::construct(data.add(i), fill.clone());
                (*block.as_ptr()).set_end(i + 1);
            }
        }
    }

    fn truncate(&mut self, n: usize) {
        let Some(block) = self.contents else {
            return;
        };
        // SAFETY: n < end
        unsafe {
            let len = (*block.as_ptr()).end();
            (*block.as_ptr()).set_end(n);
            let data = Moveable::data(block);
            for i in n..len {
                A::destroy(data.add(i));
            }
        }
    }
}

impl<T: fmt::Debug, A: BlockAllocator> GcVector<T, A> {
    /// One-line rendering of the block, marking the logical end with `/`.
    pub fn dump(&self, head: &str) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "{head} vec@{:p} _C[{}] _E[{}] ",
            self.data(),
            self.capacity(),
            self.size()
        );
        for (i, element) in self.iter().enumerate() {
            let _ = write!(out, "[{i}]={element:?} ");
        }
        out.push_str("/ ");
        out
    }
}

impl<T, A: BlockAllocator> Drop for GcVector<T, A> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T, A: BlockAllocator> Default for GcVector<T, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, A: BlockAllocator> Clone for GcVector<T, A> {
    fn clone(&self) -> Self {
        let mut copy = Self::new();
        copy.copy_from(self);
        copy
    }

    fn clone_from(&mut self, source: &Self) {
        self.release();
        self.copy_from(source);
    }
}

impl<T: Clone, A: BlockAllocator> GcVector<T, A> {
    fn copy_from(&mut self, source: &Self) {
        debug_assert!(self.contents.is_none());
        if source.contents.is_none() {
            return;
        }
        let block = A::allocate::<T>(source.capacity());
        self.contents = Some(block);
        // SAFETY: capacity matches the source, end is bumped per element
        unsafe {
            let data = Moveable::data(block);
            for (i, element) in source.iter().enumerate() {
                A::construct(data.add(i), element.clone());
                (*block.as_ptr()).set_end(i + 1);
            }
        }
    }
}

impl<T, A: BlockAllocator> Index<usize> for GcVector<T, A> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        // SAFETY: checked
        unsafe { &*self.checked_index(index) }
    }
}

impl<T, A: BlockAllocator> IndexMut<usize> for GcVector<T, A> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        // SAFETY: checked, borrow is unique
        unsafe { &mut *self.checked_index(index) }
    }
}

impl<T: fmt::Debug, A: BlockAllocator> fmt::Debug for GcVector<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, A: BlockAllocator> PartialEq for GcVector<T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T, A: BlockAllocator> Extend<T> for GcVector<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<T, A: BlockAllocator> FromIterator<T> for GcVector<T, A> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut vector = Self::new();
        vector.extend(iter);
        vector
    }
}

impl<'a, T, A: BlockAllocator> IntoIterator for &'a GcVector<T, A> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::tests::CountingAllocator;
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::rc::Rc;

    type Counted<T> = GcVector<T, CountingAllocator>;

    #[derive(Clone)]
    struct Tracked(Rc<Cell<usize>>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn empty_vector_has_no_block() {
        let v: GcVector<u64> = GcVector::new();
        assert!(v.contents().is_none());
        assert_eq!(v.size(), 0);
        assert_eq!(v.capacity(), 0);
        assert!(v.data().is_null());
        assert!(v.as_slice().is_empty());
    }

    #[test]
    fn pushes_grow_from_pad_and_double() {
        let mut v: GcVector<i32> = GcVector::new();
        for i in 0..8 {
            v.push_back(i);
        }
        assert_eq!(v.capacity(), 8);
        v.push_back(8);
        assert_eq!(v.capacity(), 16);
        assert_eq!(v.size(), 9);
        assert_eq!(v.as_slice(), &[0, 1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn reserve_on_empty_is_exact() {
        let mut v: GcVector<i32> = GcVector::new();
        v.reserve(3);
        assert_eq!(v.capacity(), 3);

        let mut w: GcVector<i32> = GcVector::new();
        w.reserve(0);
        assert_eq!(w.capacity(), 8);
    }

    #[test]
    fn reserve_relocates_only_when_larger() {
        let mut v: GcVector<i32> = GcVector::with_capacity(4);
        v.extend([1, 2, 3]);
        let before = v.contents();
        v.reserve(2);
        assert_eq!(v.contents(), before);
        v.reserve(20);
        assert_eq!(v.capacity(), 20);
        assert_eq!(v.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn emplace_into_full_block() {
        let mut v: GcVector<i32> = GcVector::new();
        v.reserve(3);
        v.extend([1, 2, 3]);
        assert_eq!(v.capacity(), 3);

        assert_eq!(v.emplace(0, 9), 0);
        assert_eq!(v.as_slice(), &[9, 1, 2, 3]);
        assert_eq!(v.capacity(), 8);
    }

    #[test]
    fn emplace_never_relocates_into_a_smaller_block() {
        struct Half;
        impl BlockAllocator for Half {
            const GROW: f32 = 0.5;
            fn allocate<T>(capacity: usize) -> NonNull<Moveable<T>> {
                SystemAllocator::allocate(capacity)
            }
            unsafe fn deallocate<T>(block: NonNull<Moveable<T>>, capacity: usize) {
                unsafe { SystemAllocator::deallocate(block, capacity) }
            }
        }

        let mut v: GcVector<i32, Half> = GcVector::new();
        v.reserve(3);
        v.extend([1, 2, 3]);
        assert_eq!(v.emplace(0, 9), 0);
        assert_eq!(v.as_slice(), &[9, 1, 2, 3]);
        assert!(v.len() <= v.capacity());

        v.resize(10, 0);
        assert_eq!(v.len(), 10);
        assert!(v.len() <= v.capacity());
    }

    #[test]
    fn emplace_in_place_and_at_end() {
        let mut v: GcVector<i32> = [1, 3].into_iter().collect();
        v.emplace(1, 2);
        v.emplace(3, 4);
        assert_eq!(v.as_slice(), &[1, 2, 3, 4]);
        assert_eq!(v.capacity(), 8);
    }

    #[test]
    fn emplace_into_empty() {
        let mut v: GcVector<i32> = GcVector::new();
        v.emplace(0, 5);
        assert_eq!(v.as_slice(), &[5]);
        assert_eq!(v.capacity(), 8);
    }

    #[test]
    #[should_panic(expected = "past size")]
    fn emplace_past_end_is_a_hard_error() {
        let mut v: GcVector<i32> = [1].into_iter().collect();
        v.emplace(2, 0);
    }

    #[test]
    fn erase_shifts_tail() {
        let mut v: GcVector<i32> = [10, 20, 30, 40].into_iter().collect();
        assert_eq!(v.erase(1), 1);
        assert_eq!(v.as_slice(), &[10, 30, 40]);
        assert_eq!(v.erase(2), 2);
        assert_eq!(v.as_slice(), &[10, 30]);
    }

    #[test]
    #[should_panic(expected = "erase at 2")]
    fn erase_out_of_range_is_a_hard_error() {
        let mut v: GcVector<i32> = [1, 2].into_iter().collect();
        v.erase(2);
    }

    #[test]
    #[should_panic(expected = "GcVector had no contents")]
    fn indexing_empty_vector_is_a_hard_error() {
        let v: GcVector<i32> = GcVector::new();
        let _ = v[0];
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn indexing_past_end_is_a_hard_error() {
        let mut v: GcVector<i32> = GcVector::with_capacity(4);
        v.push_back(1);
        let _ = v[1];
    }

    #[test]
    fn index_mut_writes_through() {
        let mut v: GcVector<i32> = [1, 2].into_iter().collect();
        v[1] = 7;
        assert_eq!(unsafe { *v.get_unchecked(1) }, 7);
    }

    #[test]
    fn pop_back_returns_elements_in_reverse() {
        let mut v: GcVector<i32> = [1, 2].into_iter().collect();
        assert_eq!(v.pop_back(), Some(2));
        assert_eq!(v.pop_back(), Some(1));
        assert_eq!(v.pop_back(), None);

        let mut empty: GcVector<i32> = GcVector::new();
        assert_eq!(empty.pop_back(), None);
    }

    #[test]
    fn resize_grows_and_shrinks_logically() {
        let mut v: GcVector<i32> = GcVector::new();
        v.resize(3, 7);
        assert_eq!(v.as_slice(), &[7, 7, 7]);
        assert_eq!(v.capacity(), 6);

        v.resize(10, 1);
        assert_eq!(v.size(), 10);
        assert_eq!(v.capacity(), 20);
        assert_eq!(v[9], 1);

        v.resize(2, 0);
        assert_eq!(v.as_slice(), &[7, 7]);
        assert_eq!(v.capacity(), 20);
    }

    #[test]
    fn resize_to_zero_on_empty_allocates_pad() {
        let mut v: GcVector<i32> = GcVector::new();
        v.resize(0, 0);
        assert_eq!(v.capacity(), 8);
        assert!(v.is_empty());
    }

    #[test]
    fn resize_within_capacity_keeps_block() {
        let mut v: GcVector<i32> = GcVector::with_capacity(8);
        v.push_back(1);
        let before = v.contents();
        v.resize(5, 2);
        assert_eq!(v.contents(), before);
        assert_eq!(v.as_slice(), &[1, 2, 2, 2, 2]);
    }

    #[test]
    fn clear_keeps_block_and_drops_elements() {
        let drops = Rc::new(Cell::new(0));
        let mut v: GcVector<Tracked> = GcVector::new();
        for _ in 0..3 {
            v.push_back(Tracked(drops.clone()));
        }
        let before = v.contents();
        v.clear();
        assert_eq!(drops.get(), 3);
        assert_eq!(v.size(), 0);
        assert_eq!(v.contents(), before);
    }

    #[test]
    fn each_element_dropped_exactly_once() {
        let drops = Rc::new(Cell::new(0));
        {
            let mut v: GcVector<Tracked> = GcVector::new();
            for _ in 0..20 {
                v.push_back(Tracked(drops.clone()));
            }
            v.emplace(5, Tracked(drops.clone()));
            v.erase(0);
            assert_eq!(drops.get(), 1);
            drop(v.pop_back());
            assert_eq!(drops.get(), 2);
        }
        assert_eq!(drops.get(), 21);
    }

    #[test]
    fn growth_releases_every_old_block_once() {
        CountingAllocator::reset();
        {
            let mut v: Counted<u64> = GcVector::new();
            for i in 0..100 {
                v.push_back(i);
            }
            v.emplace(0, 0);
            v.reserve(1000);
            assert_eq!(CountingAllocator::live(), 1);
        }
        assert_eq!(CountingAllocator::live(), 0);
        assert!(CountingAllocator::allocated() > 1);
    }

    #[test]
    fn clone_copies_capacity_and_clone_from_releases_first() {
        CountingAllocator::reset();
        let mut a: Counted<i32> = GcVector::with_capacity(12);
        a.extend([1, 2, 3]);
        let b = a.clone();
        assert_eq!(b.capacity(), 12);
        assert_eq!(b, a);
        assert_ne!(b.contents(), a.contents());

        let mut c: Counted<i32> = [9].into_iter().collect();
        assert_eq!(CountingAllocator::live(), 3);
        c.clone_from(&a);
        assert_eq!(c.as_slice(), &[1, 2, 3]);
        assert_eq!(CountingAllocator::live(), 3);

        let empty: Counted<i32> = GcVector::new();
        assert!(empty.clone().contents().is_none());
    }

    #[test]
    fn swap_and_take_move_handles_only() {
        let mut a: GcVector<i32> = [1, 2].into_iter().collect();
        let mut b: GcVector<i32> = GcVector::new();
        let block = a.contents();
        a.swap(&mut b);
        assert!(a.contents().is_none());
        assert_eq!(b.contents(), block);

        let c = b.take();
        assert!(b.contents().is_none());
        assert_eq!(c.contents(), block);
        assert_eq!(c.as_slice(), &[1, 2]);
    }

    #[test]
    fn collector_repoint_preserves_contents() {
        CountingAllocator::reset();
        let mut v: Counted<u64> = [4, 5, 6].into_iter().collect();
        let old = v.contents().expect("block");
        let capacity = v.capacity();

        // move the block the way a copying collector would
        let new = CountingAllocator::allocate::<u64>(capacity);
        unsafe {
            let (layout, _) = Moveable::<u64>::layout(capacity);
            ptr::copy_nonoverlapping(
                old.as_ptr().cast::<u8>(),
                new.as_ptr().cast::<u8>(),
                layout.size(),
            );
            v.set_contents(Some(new));
            CountingAllocator::deallocate(old, capacity);
        }
        assert_eq!(v.as_slice(), &[4, 5, 6]);
        drop(v);
        assert_eq!(CountingAllocator::live(), 0);
    }

    #[test]
    fn dump_marks_logical_end() {
        let mut v: GcVector<i32> = GcVector::with_capacity(4);
        v.extend([1, 2]);
        let text = v.dump("rack");
        assert!(text.starts_with("rack vec@"));
        assert!(text.contains("_C[4] _E[2] [0]=1 [1]=2 / "));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Push(i32),
        Pop,
        Emplace(usize, i32),
        Erase(usize),
        Resize(usize, i32),
        Reserve(usize),
        Clear,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => any::<i32>().prop_map(Op::Push),
            1 => Just(Op::Pop),
            2 => (any::<usize>(), any::<i32>()).prop_map(|(p, x)| Op::Emplace(p, x)),
            1 => any::<usize>().prop_map(Op::Erase),
            1 => (0usize..64, any::<i32>()).prop_map(|(n, x)| Op::Resize(n, x)),
            1 => (0usize..64).prop_map(Op::Reserve),
            1 => Just(Op::Clear),
        ]
    }

    proptest! {
        #[test]
        fn behaves_like_vec(ops in prop::collection::vec(op(), 0..200)) {
            let mut v: GcVector<i32> = GcVector::new();
            let mut model: Vec<i32> = Vec::new();
            for op in ops {
                match op {
                    Op::Push(x) => { v.push_back(x); model.push(x); }
                    Op::Pop => { prop_assert_eq!(v.pop_back(), model.pop()); }
                    Op::Emplace(p, x) => {
                        let p = p % (model.len() + 1);
                        prop_assert_eq!(v.emplace(p, x), p);
                        model.insert(p, x);
                    }
                    Op::Erase(p) => {
                        if !model.is_empty() {
                            let p = p % model.len();
                            prop_assert_eq!(v.erase(p), p);
                            model.remove(p);
                        }
                    }
                    Op::Resize(n, x) => { v.resize(n, x); model.resize(n, x); }
                    Op::Reserve(n) => {
                        let had_block = v.contents().is_some();
                        let before = v.capacity();
                        v.reserve(n);
                        if had_block {
                            prop_assert_eq!(v.capacity(), before.max(n));
                        }
                    }
                    Op::Clear => { v.clear(); model.clear(); }
                }
                prop_assert!(v.size() <= v.capacity());
                prop_assert_eq!(v.as_slice(), model.as_slice());
            }
        }

        #[test]
        fn capacity_never_shrinks(xs in prop::collection::vec(any::<u8>(), 1..100), n in 0usize..100) {
            let mut v: GcVector<u8> = xs.iter().copied().collect();
            let before = v.capacity();
            v.resize(n, 0);
            prop_assert!(v.capacity() >= before);
        }
    }
}
