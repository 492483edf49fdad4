use std::alloc::{self, Layout};
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use crate::hard_error;

/// The backing block of a [`GcVector`](crate::GcVector).
///
/// ```text
/// [ capacity | end | T T T ... T ]
///                    ^ Moveable::data
/// ```
///
/// Element storage starts at the offset returned by [`Moveable::layout`], not
/// at a trailing array field, so the block is a single allocation whose
/// address the collector may change as a whole.
#[repr(C)]
pub struct Moveable<T> {
    capacity: usize,
    end: usize,
    _marker: PhantomData<T>,
}

impl<T> Moveable<T> {
    /// Layout of a block holding `capacity` elements and the offset of the
    /// first element.
    pub fn layout(capacity: usize) -> (Layout, usize) {
        let head = Layout::new::<Self>();
        let Ok(elements) = Layout::array::<T>(capacity) else {
            hard_error!("GcVector capacity overflow: {capacity}");
        };
        match head.extend(elements) {
            Ok((layout, offset)) => (layout.pad_to_align(), offset),
            Err(_) => hard_error!("GcVector capacity overflow: {capacity}"),
        }
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    pub fn end(&self) -> usize {
        self.end
    }

    /// # Safety
    ///
    /// `end` must not exceed the capacity and every slot below it must hold
    /// an initialized element.
    #[inline(always)]
    pub unsafe fn set_end(&mut self, end: usize) {
        debug_assert!(end <= self.capacity);
        self.end = end;
    }

    /// Address of element 0.
    ///
    /// # Safety
    ///
    /// `block` must have been produced by a [`BlockAllocator`] for `T`.
    #[inline(always)]
    pub unsafe fn data(block: NonNull<Self>) -> *mut T {
        let (_, offset) = Self::layout(0);
        // SAFETY: the element offset does not depend on the capacity
        unsafe { block.cast::<u8>().as_ptr().add(offset).cast() }
    }
}

/// Source of vector backing blocks.
///
/// The policy constants decide how blocks grow; a collector-backed allocator
/// can override them alongside the allocation functions.
pub trait BlockAllocator {
    /// Capacity of the first block given to an empty vector.
    const PAD: usize = 8;
    /// Capacity multiplier applied when a full vector grows.
    const GROW: f32 = 2.0;
    /// Fraction of capacity below which shrinking would be worth it.
    const SHRINK: f32 = 0.5;

    /// Allocate an empty block with room for `capacity` elements.
    fn allocate<T>(capacity: usize) -> NonNull<Moveable<T>>;

    /// Release a block without touching its elements.
    ///
    /// # Safety
    ///
    /// `block` must come from [`BlockAllocator::allocate`] on this allocator
    /// with the same `capacity`, and must not be used afterwards.
    unsafe fn deallocate<T>(block: NonNull<Moveable<T>>, capacity: usize);

    /// # Safety
    ///
    /// `slot` must be valid for writes and hold no live element.
    #[inline(always)]
    unsafe fn construct<T>(slot: *mut T, value: T) {
        // SAFETY: guaranteed by caller
        unsafe { slot.write(value) }
    }

    /// # Safety
    ///
    /// `slot` must hold a live element that is not used afterwards.
    #[inline(always)]
    unsafe fn destroy<T>(slot: *mut T) {
        // SAFETY: guaranteed by caller
        unsafe { ptr::drop_in_place(slot) }
    }

    /// Capacity after growing a full block of `capacity` elements.
    #[inline]
    fn grown(capacity: usize) -> usize {
        let grown = (capacity as f32 * Self::GROW) as usize;
        grown.max(capacity + 1)
    }

    /// Capacity of a block grown to hold at least `needed` elements.
    #[inline]
    fn grown_to(needed: usize) -> usize {
        let grown = (needed as f32 * Self::GROW) as usize;
        grown.max(needed)
    }
}

/// Blocks from the global allocator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAllocator;

impl BlockAllocator for SystemAllocator {
    fn allocate<T>(capacity: usize) -> NonNull<Moveable<T>> {
        let (layout, _) = Moveable::<T>::layout(capacity);
        // SAFETY: the layout always has a non-zero size because of the head
        let raw = unsafe { alloc::alloc(layout) };
        let Some(block) = NonNull::new(raw.cast::<Moveable<T>>()) else {
            alloc::handle_alloc_error(layout);
        };
        // SAFETY: freshly allocated with room for the head
        unsafe {
            block.as_ptr().write(Moveable {
                capacity,
                end: 0,
                _marker: PhantomData,
            });
        }
        log::trace!("allocated block {block:p} capacity {capacity}");
        block
    }

    unsafe fn deallocate<T>(block: NonNull<Moveable<T>>, capacity: usize) {
        let (layout, _) = Moveable::<T>::layout(capacity);
        log::trace!("released block {block:p} capacity {capacity}");
        // SAFETY: guaranteed by caller
        unsafe { alloc::dealloc(block.as_ptr().cast(), layout) };
    }
}
