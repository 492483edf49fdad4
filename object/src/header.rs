use std::sync::atomic::{AtomicU8, Ordering};

use bitflags::bitflags;

use crate::Stamp;

bitflags! {
    /// Collector bookkeeping stored atomically in the header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HeaderFlags: u8 {
        /// The client value owns resources and must be dropped on release.
        const FINALIZE = 1 << 0;
    }
}

/// The 8-byte header in front of every heap object.
///
/// ```text
/// bytes 0‥3: stamp (u32), most specific static kind of the object
/// byte  4:   flags (atomic), Pinned | Finalize | Forwarded
/// bytes 5‥7: reserved (zero)
/// ```
///
/// The header lives at the fixed negative offset [`HEADER_SIZE`] from the
/// client address that tagged values carry, so `client - HEADER_SIZE` always
/// finds it.
#[repr(C, align(8))]
pub struct Header {
    stamp: u32,
    flags: AtomicU8,
    _reserved: [u8; 3],
}

pub const HEADER_SIZE: usize = size_of::<Header>();

const _: () = assert!(HEADER_SIZE == 8);

impl Header {
    pub fn new(stamp: Stamp, flags: HeaderFlags) -> Self {
        Self {
            stamp: stamp.raw(),
            flags: AtomicU8::new(flags.bits()),
            _reserved: [0; 3],
        }
    }

    /// Locate the header of the object whose client address is `client`.
    ///
    /// # Safety
    ///
    /// `client` must be the client address of an object allocated with a
    /// header in front of it.
    #[inline(always)]
    pub unsafe fn of<'a, T>(client: *const T) -> &'a Header {
        // SAFETY: guaranteed by caller
        unsafe { &*((client as *const u8).sub(HEADER_SIZE) as *const Header) }
    }

    #[inline(always)]
    pub fn stamp(&self) -> Stamp {
        Stamp::new(self.stamp)
    }

    // ── flags ──────────────────────────────────────────────────────

    #[inline(always)]
    pub fn flags(&self) -> HeaderFlags {
        HeaderFlags::from_bits_truncate(self.flags.load(Ordering::Relaxed))
    }

    #[inline(always)]
    pub fn has_flag(&self, flag: HeaderFlags) -> bool {
        self.flags().contains(flag)
    }

    #[inline(always)]
    pub fn add_flag(&self, flag: HeaderFlags) {
        self.flags.fetch_or(flag.bits(), Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn remove_flag(&self, flag: HeaderFlags) {
        self.flags.fetch_and(!flag.bits(), Ordering::Relaxed);
    }
}

impl core::fmt::Debug for Header {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Header")
            .field("stamp", &self.stamp())
            .field("flags", &self.flags())
            .finish()
    }
}
