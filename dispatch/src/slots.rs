use object::{Instance, OptimizedSlotInfo, SlotLocation, Value, hard_error};

use crate::{Condition, Runtime};

fn cell_of(info: &OptimizedSlotInfo) -> *mut object::Cons {
    match info.location() {
        SlotLocation::Cell(cell) => cell,
        SlotLocation::Index(index) => {
            hard_error!("slot at rack index {index} read through a cons location")
        }
    }
}

/// # Safety
///
/// `instance` must be a live instance-shaped object whose rack has more than
/// `index` entries.
#[inline]
pub unsafe fn read_slot_by_index(index: usize, instance: Value) -> Value {
    // SAFETY: guaranteed by caller
    unsafe {
        let instance = instance.as_general::<Instance>();
        *instance.rack.get_unchecked(index)
    }
}

/// # Safety
///
/// `instance` must be a live instance-shaped object whose rack has more than
/// `index` entries.
#[inline]
pub unsafe fn write_slot_by_index(value: Value, index: usize, instance: Value) -> Value {
    // SAFETY: guaranteed by caller
    unsafe {
        let instance = instance.as_general_mut::<Instance>();
        *instance.rack.get_unchecked_mut(index) = value;
    }
    value
}

/// Read a class-allocated slot through the cell named by `optinfo`.
///
/// # Safety
///
/// `optinfo` must be a live [`OptimizedSlotInfo`] whose cell is live.
#[inline]
pub unsafe fn read_slot_by_indirection(optinfo: Value) -> Value {
    // SAFETY: guaranteed by caller
    unsafe {
        let cell = cell_of(optinfo.as_general::<OptimizedSlotInfo>());
        (*cell).car
    }
}

/// # Safety
///
/// `optinfo` must be a live [`OptimizedSlotInfo`] whose cell is live.
#[inline]
pub unsafe fn write_slot_by_indirection(value: Value, optinfo: Value) -> Value {
    // SAFETY: guaranteed by caller
    unsafe {
        let cell = cell_of(optinfo.as_general::<OptimizedSlotInfo>());
        (*cell).car = value;
    }
    value
}

/// Pass a slot value through unless it is unbound.
///
/// An unbound value goes to the slot-unbound function, called with the
/// instance and the slot name. Its primary value replaces the slot value;
/// if it is itself unbound, an [`Condition::UnboundSlot`] is raised instead.
///
/// # Safety
///
/// When `value` is unbound, `optinfo` must be a live [`OptimizedSlotInfo`].
pub unsafe fn bound_or_error(
    runtime: &Runtime,
    optinfo: Value,
    instance: Value,
    value: Value,
) -> Result<Value, Condition> {
    if !value.is_unbound() {
        return Ok(value);
    }
    // SAFETY: guaranteed by caller
    let slot_name = unsafe { optinfo.as_general::<OptimizedSlotInfo>() }.slot_name;
    let symbol = runtime.settings().slot_unbound_symbol();
    log::debug!("slot {slot_name:?} of {instance:?} is unbound, calling {symbol}");

    let result = runtime
        .symbols()
        .funcall(symbol, &[instance, slot_name])?
        .primary();
    if result.is_unbound() {
        return Err(Condition::UnboundSlot {
            instance,
            slot_name,
        });
    }
    Ok(result)
}
