use crate::tag::{
    CHARACTER_TAG, CONS_TAG, FIXNUM_MASK, FIXNUM_SHIFT, GENERAL_TAG, SINGLE_FLOAT_TAG, TAG_BITS,
    TAG_MASK, Tag, VASLIST_TAG, decode_tag,
};
use crate::Cons;

/// Payloads in the character tag space past the last Unicode scalar value.
const UNBOUND_PAYLOAD: u64 = char::MAX as u64 + 1;
const NIL_PAYLOAD: u64 = char::MAX as u64 + 2;

/// A tagged 64-bit machine word.
///
/// Encoding (see [`Tag`]):
/// - **Fixnum**:    `...XXX00`: 62-bit signed integer.
/// - **General**:   `...XX001`: heap object, client address (8-byte aligned).
/// - **Character**: `...XX010`: Unicode scalar value above the tag.
/// - **Cons**:      `...XX011`: address of a [`Cons`].
/// - **Vaslist**:   `...XX101`: address of a variadic-argument record.
/// - **Float**:     `...XX110`: IEEE single in the upper 32 bits.
///
/// The unbound marker and nil are distinguished immediates in the character
/// space that no real character can collide with.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Value(u64);

impl Value {
    pub const FIXNUM_MIN: i64 = -(1 << 61);
    pub const FIXNUM_MAX: i64 = (1 << 61) - 1;

    #[inline(always)]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline(always)]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline(always)]
    pub const fn tag(self) -> Option<Tag> {
        decode_tag(self.0)
    }

    // ── Special markers ────────────────────────────────────────────

    /// The marker stored in a slot that was never initialized.
    #[inline(always)]
    pub const fn unbound() -> Self {
        Self((UNBOUND_PAYLOAD << TAG_BITS) | CHARACTER_TAG)
    }

    #[inline(always)]
    pub const fn nil() -> Self {
        Self((NIL_PAYLOAD << TAG_BITS) | CHARACTER_TAG)
    }

    #[inline(always)]
    pub const fn is_unbound(self) -> bool {
        self.0 == Self::unbound().0
    }

    #[inline(always)]
    pub const fn is_nil(self) -> bool {
        self.0 == Self::nil().0
    }

    // ── Fixnum ─────────────────────────────────────────────────────

    #[inline(always)]
    pub const fn is_fixnum(self) -> bool {
        self.0 & FIXNUM_MASK == 0
    }

    #[inline(always)]
    pub fn from_fixnum(n: i64) -> Self {
        debug_assert!(
            (Self::FIXNUM_MIN..=Self::FIXNUM_MAX).contains(&n),
            "fixnum overflow: {n}"
        );
        Self((n << FIXNUM_SHIFT) as u64)
    }

    #[inline(always)]
    pub fn from_usize(n: usize) -> Self {
        Self::from_fixnum(n as i64)
    }

    /// # Safety
    ///
    /// The value must be a fixnum.
    #[inline(always)]
    pub unsafe fn to_fixnum(self) -> i64 {
        debug_assert!(self.is_fixnum());
        (self.0 as i64) >> FIXNUM_SHIFT
    }

    #[inline(always)]
    pub fn as_fixnum(self) -> Option<i64> {
        // SAFETY: checked
        self.is_fixnum().then(|| unsafe { self.to_fixnum() })
    }

    // ── Character ──────────────────────────────────────────────────

    #[inline(always)]
    pub const fn from_char(c: char) -> Self {
        Self(((c as u64) << TAG_BITS) | CHARACTER_TAG)
    }

    #[inline(always)]
    pub const fn is_character(self) -> bool {
        self.0 & TAG_MASK == CHARACTER_TAG
    }

    /// `None` for non-characters and for the unbound/nil markers.
    #[inline(always)]
    pub fn as_char(self) -> Option<char> {
        if !self.is_character() {
            return None;
        }
        char::from_u32((self.0 >> TAG_BITS) as u32)
    }

    // ── Single float ───────────────────────────────────────────────

    #[inline(always)]
    pub fn from_single_float(f: f32) -> Self {
        Self(((f.to_bits() as u64) << 32) | SINGLE_FLOAT_TAG)
    }

    #[inline(always)]
    pub const fn is_single_float(self) -> bool {
        self.0 & TAG_MASK == SINGLE_FLOAT_TAG
    }

    /// # Safety
    ///
    /// The value must be a single float.
    #[inline(always)]
    pub unsafe fn to_single_float(self) -> f32 {
        debug_assert!(self.is_single_float());
        f32::from_bits((self.0 >> 32) as u32)
    }

    // ── Pointers ───────────────────────────────────────────────────

    #[inline(always)]
    fn tag_pointer<T>(ptr: *const T, tag: u64) -> Self {
        let addr = ptr as u64;
        debug_assert!(addr & TAG_MASK == 0, "pointer not aligned: 0x{addr:x}");
        Self(addr | tag)
    }

    /// Tag the client address of a heap object.
    #[inline(always)]
    pub fn from_general<T>(client: *const T) -> Self {
        Self::tag_pointer(client, GENERAL_TAG)
    }

    #[inline(always)]
    pub fn from_cons(cons: *const Cons) -> Self {
        Self::tag_pointer(cons, CONS_TAG)
    }

    #[inline(always)]
    pub fn from_vaslist<T>(vaslist: *const T) -> Self {
        Self::tag_pointer(vaslist, VASLIST_TAG)
    }

    #[inline(always)]
    pub const fn is_general(self) -> bool {
        self.0 & TAG_MASK == GENERAL_TAG
    }

    #[inline(always)]
    pub const fn is_cons(self) -> bool {
        self.0 & TAG_MASK == CONS_TAG
    }

    #[inline(always)]
    pub const fn is_vaslist(self) -> bool {
        self.0 & TAG_MASK == VASLIST_TAG
    }

    /// Strip the tag, yielding the address the value refers to.
    ///
    /// Meaningful only for general, cons and vaslist values.
    #[inline(always)]
    pub const fn untag<T>(self) -> *mut T {
        (self.0 & !TAG_MASK) as *mut T
    }

    /// # Safety
    ///
    /// The value must be general-tagged and refer to a valid, live `T`.
    #[inline(always)]
    pub unsafe fn as_general<'a, T>(self) -> &'a T {
        debug_assert!(self.is_general());
        // SAFETY: guaranteed by caller
        unsafe { &*self.untag::<T>() }
    }

    /// # Safety
    ///
    /// The value must be general-tagged, refer to a valid, live `T`, and no
    /// other references to it may exist.
    #[inline(always)]
    pub unsafe fn as_general_mut<'a, T>(self) -> &'a mut T {
        debug_assert!(self.is_general());
        // SAFETY: guaranteed by caller
        unsafe { &mut *self.untag::<T>() }
    }

    /// # Safety
    ///
    /// The value must be cons-tagged and refer to a live [`Cons`].
    #[inline(always)]
    pub unsafe fn as_cons<'a>(self) -> &'a mut Cons {
        debug_assert!(self.is_cons());
        // SAFETY: guaranteed by caller
        unsafe { &mut *self.untag::<Cons>() }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::nil()
    }
}

impl core::fmt::Debug for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_unbound() {
            return write!(f, "Unbound");
        }
        if self.is_nil() {
            return write!(f, "Nil");
        }
        match self.tag() {
            Some(Tag::FixnumEven | Tag::FixnumOdd) => {
                // SAFETY: tag checked
                write!(f, "Fixnum({})", unsafe { self.to_fixnum() })
            }
            Some(Tag::General) => write!(f, "General(0x{:x})", self.untag::<u8>() as u64),
            Some(Tag::Character) => match self.as_char() {
                Some(c) => write!(f, "Character({c:?})"),
                None => write!(f, "Character(0x{:x})", self.0 >> TAG_BITS),
            },
            Some(Tag::Cons) => write!(f, "Cons(0x{:x})", self.untag::<u8>() as u64),
            Some(Tag::Vaslist) => write!(f, "Vaslist(0x{:x})", self.untag::<u8>() as u64),
            // SAFETY: tag checked
            Some(Tag::SingleFloat) => write!(f, "SingleFloat({})", unsafe {
                self.to_single_float()
            }),
            None => write!(f, "Invalid(0x{:016x})", self.0),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::from_fixnum(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Value::from_char(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::from_single_float(value)
    }
}
