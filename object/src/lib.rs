pub mod error;
pub mod tag;

mod alloc;
mod gcvector;
mod handle;
mod header;
mod heap;
mod objects;
mod stamp;
mod value;

pub use alloc::{BlockAllocator, Moveable, SystemAllocator};
pub use gcvector::GcVector;
pub use handle::Tagged;
pub use header::{HEADER_SIZE, Header, HeaderFlags};
pub use heap::Heap;
pub use objects::{
    ClassRep, Cons, Derivable, DerivableObject, FIRST_SLOT_INDEX, FuncallableInstance, Instance,
    OptimizedSlotInfo, Rack, SlotLocation, WrappedPointer,
};
pub use stamp::{Stamp, resolve_stamp};
pub use tag::{Tag, decode_tag};
pub use value::Value;
