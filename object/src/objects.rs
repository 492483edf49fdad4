use core::ffi::c_void;

use crate::{GcVector, Stamp, Value, hard_error};

/// Instance slot storage. Slot 0 holds the class stamp as a fixnum.
pub type Rack = GcVector<Value>;

/// Index of the first user slot in a rack.
pub const FIRST_SLOT_INDEX: usize = 1;

fn new_rack(class_stamp: Stamp, nslots: usize) -> Rack {
    let mut rack = Rack::new();
    rack.reserve(FIRST_SLOT_INDEX + nslots);
    rack.push_back(class_stamp.to_value());
    rack.resize(FIRST_SLOT_INDEX + nslots, Value::unbound());
    rack
}

/// A standard object: a header and a rack.
#[repr(C)]
#[derive(Debug)]
pub struct Instance {
    pub rack: Rack,
}

impl Instance {
    /// A new instance of `class_stamp` with `nslots` unbound slots.
    pub fn new(class_stamp: Stamp, nslots: usize) -> Self {
        Self {
            rack: new_rack(class_stamp, nslots),
        }
    }

    /// The stamp kept in rack slot 0.
    #[inline]
    pub fn class_stamp(&self) -> Stamp {
        Stamp::from_value(self.rack[0])
    }

    /// Change class by restamping slot 0.
    pub fn set_class_stamp(&mut self, stamp: Stamp) {
        self.rack[0] = stamp.to_value();
    }

    pub fn number_of_slots(&self) -> usize {
        self.rack.size().saturating_sub(FIRST_SLOT_INDEX)
    }
}

/// An instance that can also be called, e.g. a generic function.
#[repr(C)]
#[derive(Debug)]
pub struct FuncallableInstance {
    pub rack: Rack,
    /// The function run when the instance is called.
    pub entry: Value,
}

impl FuncallableInstance {
    pub fn new(class_stamp: Stamp, nslots: usize, entry: Value) -> Self {
        Self {
            rack: new_rack(class_stamp, nslots),
            entry,
        }
    }
}

/// The runtime representation of a class.
#[repr(C)]
#[derive(Debug)]
pub struct ClassRep {
    pub rack: Rack,
    pub name: Value,
}

impl ClassRep {
    pub fn new(metaclass_stamp: Stamp, nslots: usize, name: Value) -> Self {
        Self {
            rack: new_rack(metaclass_stamp, nslots),
            name,
        }
    }
}

// The resolver reads every rack-redirected kind through `Instance`.
const _: () = {
    assert!(core::mem::offset_of!(FuncallableInstance, rack) == 0);
    assert!(core::mem::offset_of!(ClassRep, rack) == 0);
};

/// A foreign pointer carrying the stamp of the class that wraps it.
#[repr(C)]
#[derive(Debug)]
pub struct WrappedPointer {
    stamp: Stamp,
    pointer: *mut c_void,
}

impl WrappedPointer {
    pub fn new(stamp: Stamp, pointer: *mut c_void) -> Self {
        Self { stamp, pointer }
    }

    #[inline(always)]
    pub fn stamp(&self) -> Stamp {
        self.stamp
    }

    #[inline(always)]
    pub fn pointer(&self) -> *mut c_void {
        self.pointer
    }
}

/// A host object that reports its own class stamp.
pub trait Derivable {
    fn stamp(&self) -> Stamp;
}

pub struct DerivableObject {
    inner: Box<dyn Derivable>,
}

impl DerivableObject {
    pub fn new(inner: Box<dyn Derivable>) -> Self {
        Self { inner }
    }

    #[inline]
    pub fn stamp(&self) -> Stamp {
        self.inner.stamp()
    }

    pub fn inner(&self) -> &dyn Derivable {
        self.inner.as_ref()
    }
}

impl core::fmt::Debug for DerivableObject {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DerivableObject")
            .field("stamp", &self.stamp())
            .finish()
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cons {
    pub car: Value,
    pub cdr: Value,
}

impl Cons {
    pub fn new(car: Value, cdr: Value) -> Self {
        Self { car, cdr }
    }
}

/// Where an optimized slot accessor finds its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotLocation {
    /// Rack index of an instance-allocated slot.
    Index(usize),
    /// A shared cell whose car holds a class-allocated slot.
    Cell(*mut Cons),
}

/// Precomputed slot location for an accessor, and the slot name used when
/// reporting an unbound slot.
#[repr(C)]
#[derive(Debug)]
pub struct OptimizedSlotInfo {
    pub location: Value,
    pub slot_name: Value,
}

impl OptimizedSlotInfo {
    pub fn new(location: Value, slot_name: Value) -> Self {
        Self {
            location,
            slot_name,
        }
    }

    pub fn location(&self) -> SlotLocation {
        let location = self.location;
        if location.is_cons() {
            return SlotLocation::Cell(location.untag());
        }
        match location.as_fixnum().map(usize::try_from) {
            Some(Ok(index)) => SlotLocation::Index(index),
            _ => hard_error!("slot location must be an index or a cons, got {location:?}"),
        }
    }
}
