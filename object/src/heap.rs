use std::alloc::{self, Layout};
use std::ptr::NonNull;

use crate::{
    ClassRep, Cons, Derivable, DerivableObject, FuncallableInstance, HEADER_SIZE, Header,
    HeaderFlags, Instance, OptimizedSlotInfo, Stamp, Tagged, Value, WrappedPointer, hard_error,
};

struct Allocation {
    base: NonNull<u8>,
    layout: Layout,
    finalize: Option<unsafe fn(*mut u8)>,
}

unsafe fn drop_client<T>(client: *mut u8) {
    // SAFETY: client holds a live T
    unsafe { client.cast::<T>().drop_in_place() }
}

/// Owner of headed objects.
///
/// Every object is laid out as a [`Header`] followed by its client value,
/// and stays at its address until the heap is dropped. Objects whose type
/// owns resources get the `FINALIZE` flag and are dropped with the heap.
#[derive(Default)]
pub struct Heap {
    allocations: Vec<Allocation>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects allocated so far.
    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    /// Allocate `value` behind a header carrying `stamp`.
    pub fn allocate<T>(&mut self, stamp: Stamp, value: T) -> Tagged<T> {
        let Ok((layout, offset)) = Layout::new::<Header>().extend(Layout::new::<T>()) else {
            hard_error!("object layout overflow");
        };
        if offset != HEADER_SIZE {
            hard_error!(
                "client alignment {} exceeds the header size",
                align_of::<T>()
            );
        }
        let layout = layout.pad_to_align();
        // SAFETY: the layout includes the header so it is never zero-sized
        let raw = unsafe { alloc::alloc(layout) };
        let Some(base) = NonNull::new(raw) else {
            alloc::handle_alloc_error(layout);
        };

        let finalize = core::mem::needs_drop::<T>();
        let flags = if finalize {
            HeaderFlags::FINALIZE
        } else {
            HeaderFlags::empty()
        };
        // SAFETY: fresh allocation sized for header and client
        let client = unsafe {
            base.cast::<Header>().as_ptr().write(Header::new(stamp, flags));
            let client = base.as_ptr().add(offset).cast::<T>();
            client.write(value);
            client
        };

        self.allocations.push(Allocation {
            base,
            layout,
            finalize: finalize.then_some(drop_client::<T> as unsafe fn(*mut u8)),
        });
        log::trace!("allocated {stamp:?} at {client:p}");
        Tagged::from_ptr(client)
    }

    /// Allocate an instance-shaped object; `header` is one of the
    /// rack-redirected stamps, `class_stamp` goes into rack slot 0.
    pub fn allocate_instance(
        &mut self,
        header: Stamp,
        class_stamp: Stamp,
        nslots: usize,
    ) -> Tagged<Instance> {
        debug_assert!(header.is_rack_redirected());
        self.allocate(header, Instance::new(class_stamp, nslots))
    }

    pub fn allocate_funcallable_instance(
        &mut self,
        class_stamp: Stamp,
        nslots: usize,
        entry: Value,
    ) -> Tagged<FuncallableInstance> {
        self.allocate(
            Stamp::FUNCALLABLE_INSTANCE,
            FuncallableInstance::new(class_stamp, nslots, entry),
        )
    }

    pub fn allocate_class_rep(
        &mut self,
        metaclass_stamp: Stamp,
        nslots: usize,
        name: Value,
    ) -> Tagged<ClassRep> {
        self.allocate(Stamp::CLASS_REP, ClassRep::new(metaclass_stamp, nslots, name))
    }

    pub fn allocate_wrapped_pointer(
        &mut self,
        stamp: Stamp,
        pointer: *mut core::ffi::c_void,
    ) -> Tagged<WrappedPointer> {
        self.allocate(Stamp::WRAPPED_POINTER, WrappedPointer::new(stamp, pointer))
    }

    pub fn allocate_derivable(&mut self, inner: Box<dyn Derivable>) -> Tagged<DerivableObject> {
        self.allocate(Stamp::DERIVABLE, DerivableObject::new(inner))
    }

    /// A fresh cons cell, returned cons-tagged.
    pub fn allocate_cons(&mut self, car: Value, cdr: Value) -> Value {
        let cell = self.allocate(Stamp::CONS, Cons::new(car, cdr));
        Value::from_cons(cell.as_ptr())
    }

    pub fn allocate_optimized_slot_info(
        &mut self,
        location: Value,
        slot_name: Value,
    ) -> Tagged<OptimizedSlotInfo> {
        self.allocate(
            Stamp::OPTIMIZED_SLOT_INFO,
            OptimizedSlotInfo::new(location, slot_name),
        )
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        log::debug!("releasing {} objects", self.allocations.len());
        for allocation in self.allocations.drain(..) {
            // SAFETY: each allocation was made by `allocate` and is released once
            unsafe {
                let header = &*allocation.base.as_ptr().cast::<Header>();
                let client = allocation.base.as_ptr().add(HEADER_SIZE);
                if let Some(finalize) = allocation.finalize {
                    if header.has_flag(HeaderFlags::FINALIZE) {
                        finalize(client);
                        header.remove_flag(HeaderFlags::FINALIZE);
                    }
                }
                alloc::dealloc(allocation.base.as_ptr(), allocation.layout);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn header_precedes_client() {
        let mut heap = Heap::new();
        let info = heap.allocate_optimized_slot_info(Value::from_fixnum(1), Value::nil());
        let header = unsafe { info.header() };
        assert_eq!(header.stamp(), Stamp::OPTIMIZED_SLOT_INFO);
        assert!(!header.has_flag(HeaderFlags::FINALIZE));
        assert_eq!(
            info.as_ptr() as usize - header as *const Header as usize,
            HEADER_SIZE
        );
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn instances_are_finalized() {
        let mut heap = Heap::new();
        let instance = heap.allocate_instance(Stamp::INSTANCE, Stamp::FIRST_CLASS, 2);
        assert!(unsafe { instance.header() }.has_flag(HeaderFlags::FINALIZE));
        assert_eq!(unsafe { instance.as_ref() }.number_of_slots(), 2);
    }

    #[test]
    fn cleared_finalize_flag_skips_the_drop() {
        struct Counted(Rc<Cell<usize>>);
        impl Derivable for Counted {
            fn stamp(&self) -> Stamp {
                Stamp::new(5001)
            }
        }
        impl Drop for Counted {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let drops = Rc::new(Cell::new(0));
        let mut heap = Heap::new();
        let kept = heap.allocate_derivable(Box::new(Counted(drops.clone())));
        let skipped = heap.allocate_derivable(Box::new(Counted(drops.clone())));
        let skipped_header = unsafe { skipped.header() };
        skipped_header.remove_flag(HeaderFlags::FINALIZE);
        assert!(unsafe { kept.header() }.has_flag(HeaderFlags::FINALIZE));
        drop(heap);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn dropping_the_heap_drops_clients() {
        struct Witness(Rc<Cell<bool>>);
        impl Derivable for Witness {
            fn stamp(&self) -> Stamp {
                Stamp::new(5000)
            }
        }
        impl Drop for Witness {
            fn drop(&mut self) {
                self.0.set(true);
            }
        }

        let dropped = Rc::new(Cell::new(false));
        let mut heap = Heap::new();
        heap.allocate_derivable(Box::new(Witness(dropped.clone())));
        assert!(!dropped.get());
        drop(heap);
        assert!(dropped.get());
    }

    #[test]
    fn cons_is_cons_tagged() {
        let mut heap = Heap::new();
        let cell = heap.allocate_cons(Value::from_fixnum(1), Value::nil());
        assert!(cell.is_cons());
        let cons = unsafe { cell.as_cons() };
        assert_eq!(cons.car, Value::from_fixnum(1));
        assert!(cons.cdr.is_nil());
    }

    #[test]
    #[should_panic(expected = "exceeds the header size")]
    fn over_aligned_clients_are_rejected() {
        #[repr(align(16))]
        struct Wide(u8);
        Heap::new().allocate(Stamp::new(6000), Wide(0));
    }
}
