/// Width of the tag field in the low bits of every [`Value`](crate::Value).
pub const TAG_BITS: u32 = 3;
pub const TAG_MASK: u64 = (1 << TAG_BITS) - 1;

pub const FIXNUM0_TAG: u64 = 0b000;
pub const GENERAL_TAG: u64 = 0b001;
pub const CHARACTER_TAG: u64 = 0b010;
pub const CONS_TAG: u64 = 0b011;
pub const FIXNUM1_TAG: u64 = 0b100;
pub const VASLIST_TAG: u64 = 0b101;
pub const SINGLE_FLOAT_TAG: u64 = 0b110;

/// Both fixnum tags share these low bits; the third bit belongs to the payload.
pub const FIXNUM_MASK: u64 = 0b11;
pub const FIXNUM_SHIFT: u32 = 2;

// Range-based dispatch in generated code and in the stamp resolver relies on
// this exact ordering.
const _: () = assert!(
    FIXNUM0_TAG < GENERAL_TAG
        && GENERAL_TAG < CHARACTER_TAG
        && CHARACTER_TAG < CONS_TAG
        && CONS_TAG < FIXNUM1_TAG
        && FIXNUM1_TAG < VASLIST_TAG
        && VASLIST_TAG < SINGLE_FLOAT_TAG
        && SINGLE_FLOAT_TAG < TAG_MASK,
    "tag values do not match the order needed by the stamp resolver"
);

const _: () = assert!(FIXNUM0_TAG & FIXNUM_MASK == FIXNUM1_TAG & FIXNUM_MASK);

/// The kind of object a tagged word represents.
///
/// ```text
/// ...XXX000  fixnum (even)     ...XXX100  fixnum (odd)
/// ...XXX001  heap object       ...XXX101  vaslist
/// ...XXX010  character         ...XXX110  single float
/// ...XXX011  cons              ...XXX111  unused
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Tag {
    FixnumEven = FIXNUM0_TAG as u8,
    General = GENERAL_TAG as u8,
    Character = CHARACTER_TAG as u8,
    Cons = CONS_TAG as u8,
    FixnumOdd = FIXNUM1_TAG as u8,
    Vaslist = VASLIST_TAG as u8,
    SingleFloat = SINGLE_FLOAT_TAG as u8,
}

impl Tag {
    pub const ALL: [Tag; 7] = [
        Tag::FixnumEven,
        Tag::General,
        Tag::Character,
        Tag::Cons,
        Tag::FixnumOdd,
        Tag::Vaslist,
        Tag::SingleFloat,
    ];

    #[inline(always)]
    pub const fn bits(self) -> u64 {
        self as u64
    }

    #[inline(always)]
    pub const fn is_fixnum(self) -> bool {
        matches!(self, Tag::FixnumEven | Tag::FixnumOdd)
    }

    /// Tags whose payload is an address.
    #[inline(always)]
    pub const fn is_pointer(self) -> bool {
        matches!(self, Tag::General | Tag::Cons | Tag::Vaslist)
    }
}

/// Decode the tag field of a raw word.
///
/// Returns `None` only for the single unused bit pattern.
#[inline(always)]
pub const fn decode_tag(word: u64) -> Option<Tag> {
    match word & TAG_MASK {
        FIXNUM0_TAG => Some(Tag::FixnumEven),
        GENERAL_TAG => Some(Tag::General),
        CHARACTER_TAG => Some(Tag::Character),
        CONS_TAG => Some(Tag::Cons),
        FIXNUM1_TAG => Some(Tag::FixnumOdd),
        VASLIST_TAG => Some(Tag::Vaslist),
        SINGLE_FLOAT_TAG => Some(Tag::SingleFloat),
        _ => None,
    }
}
