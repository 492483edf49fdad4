use crate::{Header, Value};
use core::marker::PhantomData;

/// A typed heap-object reference.
///
/// The underlying bits are the same general-tagged [`Value`] the runtime
/// passes around, but `T` names the expected client type. Dereferencing is
/// unsafe: the caller must guarantee the value actually points to a live `T`
/// and that no collection moved it since the value was obtained.
#[repr(transparent)]
pub struct Tagged<T> {
    value: Value,
    _marker: PhantomData<*const T>,
}

// we need custom clone implementation as derive would require T: Clone
// but this represents a pointer to a T, not T itself
impl<T> Clone for Tagged<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Tagged<T> {}

impl<T> PartialEq for Tagged<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Tagged<T> {}

impl<T> Tagged<T> {
    #[inline(always)]
    pub fn from_value(value: Value) -> Self {
        debug_assert!(value.is_general(), "not a heap object: {value:?}");
        Self { value, _marker: PhantomData }
    }

    #[inline(always)]
    pub fn from_ptr(client: *const T) -> Self {
        Self::from_value(Value::from_general(client))
    }

    #[inline(always)]
    pub fn value(self) -> Value {
        self.value
    }

    #[inline(always)]
    pub fn as_ptr(self) -> *mut T {
        self.value.untag()
    }

    /// The header preceding the client address.
    ///
    /// # Safety
    ///
    /// The value must refer to an object allocated with a [`Header`].
    #[inline(always)]
    pub unsafe fn header<'a>(self) -> &'a Header {
        // SAFETY: guaranteed by caller
        unsafe { Header::of(self.as_ptr()) }
    }

    /// # Safety
    ///
    /// The value must refer to a valid, live `T`.
    #[inline(always)]
    pub unsafe fn as_ref<'a>(self) -> &'a T {
        // SAFETY: guaranteed by caller
        unsafe { self.value.as_general() }
    }

    /// # Safety
    ///
    /// The value must refer to a valid, live `T`, and no other references to
    /// it may exist.
    #[inline(always)]
    pub unsafe fn as_mut<'a>(self) -> &'a mut T {
        // SAFETY: guaranteed by caller
        unsafe { self.value.as_general_mut() }
    }

    /// Reinterpret as a reference to a layout-compatible type.
    ///
    /// # Safety
    ///
    /// `U` must be a prefix of `T` (or the other way around) at the same
    /// offsets.
    #[inline(always)]
    pub unsafe fn cast<U>(self) -> Tagged<U> {
        Tagged { value: self.value, _marker: PhantomData }
    }
}

impl<T> core::fmt::Debug for Tagged<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Tagged({:?})", self.value)
    }
}

impl<T> From<Tagged<T>> for Value {
    fn from(tagged: Tagged<T>) -> Self {
        tagged.value
    }
}
