use std::sync::atomic::{AtomicU32, Ordering};

use crate::tag::{TAG_MASK, Tag};
use crate::{DerivableObject, Header, Instance, Value, WrappedPointer, hard_error};

/// Runtime type identifier used as the generic-function dispatch key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Stamp(u32);

static NEXT_CLASS_STAMP: AtomicU32 = AtomicU32::new(Stamp::FIRST_CLASS.0);

impl Stamp {
    // ── Immediates ─────────────────────────────────────────────────
    pub const FIXNUM: Stamp = Stamp(1);
    pub const CHARACTER: Stamp = Stamp(2);
    pub const CONS: Stamp = Stamp(3);
    pub const VASLIST: Stamp = Stamp(4);
    pub const SINGLE_FLOAT: Stamp = Stamp(5);

    // ── Header sentinels that redirect ─────────────────────────────
    pub const INSTANCE: Stamp = Stamp(16);
    pub const FUNCALLABLE_INSTANCE: Stamp = Stamp(17);
    pub const CLASS_REP: Stamp = Stamp(18);
    pub const WRAPPED_POINTER: Stamp = Stamp(19);
    pub const DERIVABLE: Stamp = Stamp(20);

    // ── Fixed header kinds ─────────────────────────────────────────
    pub const OPTIMIZED_SLOT_INFO: Stamp = Stamp(21);

    /// First stamp handed out to classes by [`Stamp::next_class_stamp`].
    pub const FIRST_CLASS: Stamp = Stamp(1024);

    #[inline(always)]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline(always)]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Allocate a fresh class stamp.
    pub fn next_class_stamp() -> Stamp {
        Self::take_from(&NEXT_CLASS_STAMP)
    }

    /// The counter never wraps, so exhaustion stays fatal on every later call.
    fn take_from(counter: &AtomicU32) -> Stamp {
        let next = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |raw| {
            raw.checked_add(1)
        });
        match next {
            Ok(raw) => Stamp(raw),
            Err(_) => hard_error!("class stamps exhausted"),
        }
    }

    /// The fixed stamp of an immediate tag, `None` for heap objects.
    #[inline(always)]
    pub const fn of_immediate(tag: Tag) -> Option<Stamp> {
        match tag {
            Tag::FixnumEven | Tag::FixnumOdd => Some(Stamp::FIXNUM),
            Tag::Character => Some(Stamp::CHARACTER),
            Tag::Cons => Some(Stamp::CONS),
            Tag::Vaslist => Some(Stamp::VASLIST),
            Tag::SingleFloat => Some(Stamp::SINGLE_FLOAT),
            Tag::General => None,
        }
    }

    /// Header stamps whose real stamp lives in rack slot 0.
    #[inline(always)]
    pub const fn is_rack_redirected(self) -> bool {
        matches!(
            self,
            Stamp::INSTANCE | Stamp::FUNCALLABLE_INSTANCE | Stamp::CLASS_REP
        )
    }

    /// Decode a stamp stored as a fixnum, as found in rack slot 0.
    pub fn from_value(value: Value) -> Stamp {
        match value.as_fixnum().map(u32::try_from) {
            Some(Ok(raw)) => Stamp(raw),
            _ => hard_error!("expected a stamp fixnum, got {value:?}"),
        }
    }

    #[inline(always)]
    pub fn to_value(self) -> Value {
        Value::from_fixnum(self.0 as i64)
    }

    fn name(self) -> Option<&'static str> {
        Some(match self {
            Stamp::FIXNUM => "fixnum",
            Stamp::CHARACTER => "character",
            Stamp::CONS => "cons",
            Stamp::VASLIST => "vaslist",
            Stamp::SINGLE_FLOAT => "single-float",
            Stamp::INSTANCE => "instance",
            Stamp::FUNCALLABLE_INSTANCE => "funcallable-instance",
            Stamp::CLASS_REP => "class-rep",
            Stamp::WRAPPED_POINTER => "wrapped-pointer",
            Stamp::DERIVABLE => "derivable",
            Stamp::OPTIMIZED_SLOT_INFO => "optimized-slot-info",
            _ => return None,
        })
    }
}

impl core::fmt::Debug for Stamp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "Stamp({}:{name})", self.0),
            None => write!(f, "Stamp({})", self.0),
        }
    }
}

impl From<Stamp> for i64 {
    fn from(stamp: Stamp) -> Self {
        stamp.0 as i64
    }
}

/// Resolve the dispatch stamp of any tagged value.
///
/// Immediates answer from the tag alone. Heap objects answer from their
/// header, following one level of indirection for kinds that share a header
/// shape but dispatch on a more specific identity: instances read rack slot
/// 0, wrapped pointers read their own stamp field, derivable objects are
/// asked for it.
///
/// # Safety
///
/// A general-tagged `value` must be the client address of a live object
/// allocated with a [`Header`]; if that header names an instance kind, the
/// object must be laid out as an [`Instance`].
pub unsafe fn resolve_stamp(value: Value) -> Stamp {
    match value.tag() {
        Some(Tag::General) => {
            // SAFETY: guaranteed by caller
            unsafe { general_stamp(value) }
        }
        Some(tag) => match Stamp::of_immediate(tag) {
            Some(stamp) => stamp,
            None => hard_error!("{tag:?} has no immediate stamp"),
        },
        None => hard_error!(
            "unreachable tag 0b{:03b} while reading the stamp of 0x{:016x}",
            value.raw() & TAG_MASK,
            value.raw()
        ),
    }
}

unsafe fn general_stamp(value: Value) -> Stamp {
    let client = value.untag::<u8>();
    // SAFETY: guaranteed by caller of resolve_stamp
    let header = unsafe { Header::of(client) };
    match header.stamp() {
        stamp if stamp.is_rack_redirected() => {
            // SAFETY: every rack-redirected kind starts with an instance layout
            let instance = unsafe { &*(client as *const Instance) };
            instance.class_stamp()
        }
        Stamp::WRAPPED_POINTER => {
            // SAFETY: header says so
            let wrapped = unsafe { &*(client as *const WrappedPointer) };
            wrapped.stamp()
        }
        Stamp::DERIVABLE => {
            // SAFETY: header says so
            let derivable = unsafe { &*(client as *const DerivableObject) };
            derivable.stamp()
        }
        stamp => stamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Derivable, Heap};

    #[test]
    fn immediates_resolve_without_touching_memory() {
        let cases = [
            (Value::from_fixnum(0), Stamp::FIXNUM),
            (Value::from_fixnum(-7), Stamp::FIXNUM),
            (Value::from_char('q'), Stamp::CHARACTER),
            (Value::from_single_float(1.5), Stamp::SINGLE_FLOAT),
            // payloads below are never dereferenced
            (Value::from_raw(0xDEAD_BEE8 | crate::tag::CONS_TAG), Stamp::CONS),
            (Value::from_raw(0x8 | crate::tag::CONS_TAG), Stamp::CONS),
            (Value::from_raw(0xDEAD_BEE8 | crate::tag::VASLIST_TAG), Stamp::VASLIST),
        ];
        for (value, expected) in cases {
            assert_eq!(unsafe { resolve_stamp(value) }, expected, "{value:?}");
        }
    }

    #[test]
    fn every_immediate_tag_has_its_builtin_stamp() {
        for tag in Tag::ALL {
            let value = Value::from_raw(0x1000 | tag.bits());
            match Stamp::of_immediate(tag) {
                Some(stamp) => assert_eq!(unsafe { resolve_stamp(value) }, stamp),
                None => assert_eq!(tag, Tag::General),
            }
        }
    }

    #[test]
    #[should_panic(expected = "unreachable tag")]
    fn unused_tag_is_a_hard_error() {
        unsafe { resolve_stamp(Value::from_raw(0x1000 | 0b111)) };
    }

    #[test]
    fn exhausted_class_stamps_never_wrap() {
        let counter = AtomicU32::new(u32::MAX - 1);
        assert_eq!(Stamp::take_from(&counter), Stamp(u32::MAX - 1));
        for _ in 0..2 {
            let result = std::panic::catch_unwind(|| Stamp::take_from(&counter));
            assert!(result.is_err());
        }
        assert_eq!(counter.load(Ordering::Relaxed), u32::MAX);
    }

    #[test]
    fn plain_instance_resolves_to_rack_slot_zero() {
        let mut heap = Heap::new();
        let class = Stamp::next_class_stamp();
        let instance = heap.allocate_instance(Stamp::INSTANCE, class, 2);

        let header_stamp = unsafe { instance.header() }.stamp();
        assert_eq!(header_stamp, Stamp::INSTANCE);
        assert_eq!(unsafe { resolve_stamp(instance.value()) }, class);
        assert_ne!(unsafe { resolve_stamp(instance.value()) }, header_stamp);
    }

    #[test]
    fn funcallable_instances_and_class_reps_redirect_too() {
        let mut heap = Heap::new();
        let gf_class = Stamp::next_class_stamp();
        let gf = heap.allocate_funcallable_instance(gf_class, 1, Value::nil());
        assert_eq!(unsafe { resolve_stamp(gf.value()) }, gf_class);

        let meta = Stamp::next_class_stamp();
        let class = heap.allocate_class_rep(meta, 3, Value::nil());
        assert_eq!(unsafe { resolve_stamp(class.value()) }, meta);
    }

    #[test]
    fn wrapped_pointer_uses_its_own_field() {
        let mut heap = Heap::new();
        let foreign = Stamp::new(4242);
        let wrapped = heap.allocate_wrapped_pointer(foreign, core::ptr::null_mut());
        assert_eq!(unsafe { resolve_stamp(wrapped.value()) }, foreign);
    }

    #[test]
    fn derivable_object_is_asked_for_its_stamp() {
        struct Widget;
        impl Derivable for Widget {
            fn stamp(&self) -> Stamp {
                Stamp::new(3131)
            }
        }

        let mut heap = Heap::new();
        let object = heap.allocate_derivable(Box::new(Widget));
        assert_eq!(unsafe { resolve_stamp(object.value()) }, Stamp::new(3131));
    }

    #[test]
    fn other_heap_kinds_return_header_stamp() {
        let mut heap = Heap::new();
        let cell = heap.allocate_cons(Value::nil(), Value::nil());
        let info = heap.allocate_optimized_slot_info(cell, Value::nil());
        assert_eq!(
            unsafe { resolve_stamp(info.value()) },
            Stamp::OPTIMIZED_SLOT_INFO
        );
    }

    #[test]
    #[should_panic(expected = "expected a stamp fixnum")]
    fn rack_slot_zero_must_hold_a_fixnum() {
        let mut heap = Heap::new();
        let instance = heap.allocate_instance(Stamp::INSTANCE, Stamp::FIRST_CLASS, 1);
        unsafe { instance.as_mut() }.rack[0] = Value::from_char('x');
        unsafe { resolve_stamp(instance.value()) };
    }

    #[test]
    fn class_stamps_are_unique_and_start_above_builtins() {
        let a = Stamp::next_class_stamp();
        let b = Stamp::next_class_stamp();
        assert_ne!(a, b);
        assert!(a >= Stamp::FIRST_CLASS && b >= Stamp::FIRST_CLASS);
    }
}
