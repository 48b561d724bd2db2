#![forbid(unsafe_code)]
//! Bit-string keys shared by every index in the crate.
//!
//! A key is a byte slice plus an explicit bit length. Bits are numbered from
//! the most significant bit of the first byte (big-endian) or of the last byte
//! (little-endian). Past the key length every key continues with its own bit
//! length as a 32-bit big-endian integer, then a single terminating one bit,
//! then zeros. The terminator is the last set bit of the extended form, so it
//! pins the length and no two distinct keys share an extended bit string.

use core::fmt;

use smallvec::SmallVec;

/// Number of extension bits that encode the key length.
pub const LENGTH_BITS: u32 = 32;

/// Extension bits up to and including the terminator.
const EXTENSION_BITS: u32 = LENGTH_BITS + 1;

/// Byte order used when numbering the bits of a key.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Endian {
    /// Bit 0 is the most significant bit of the first byte.
    #[default]
    Big,
    /// Bit 0 is the most significant bit of the last byte.
    Little,
}

/// How the leading bit of a key is interpreted when ordering items.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum SignOrder {
    /// Plain lexical order.
    #[default]
    Unsigned,
    /// Leading bit is a sign and negative values use two's complement.
    TwosComplement,
    /// Leading bit is a sign and the remaining bits are a magnitude (IEEE 754).
    SignMagnitude,
}

impl SignOrder {
    /// Returns true when the leading bit carries a sign.
    pub fn is_signed(self) -> bool {
        !matches!(self, SignOrder::Unsigned)
    }
}

/// Borrowed view of an index key.
#[derive(Copy, Clone)]
pub struct KeyRef<'a> {
    bytes: &'a [u8],
    bits: u32,
    endian: Endian,
    sign: SignOrder,
}

impl<'a> KeyRef<'a> {
    /// Creates a big-endian unsigned key of `bits` bits over `bytes`.
    ///
    /// The bit length is clamped to the bits actually available.
    pub fn new(bytes: &'a [u8], bits: u32) -> Self {
        let available = u32::try_from(bytes.len())
            .unwrap_or(u32::MAX / 8)
            .saturating_mul(8);
        Self {
            bytes,
            bits: bits.min(available),
            endian: Endian::Big,
            sign: SignOrder::Unsigned,
        }
    }

    /// Creates a key spanning every bit of `bytes`.
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self::new(bytes, u32::MAX)
    }

    /// Sets the bit numbering.
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Sets the sign interpretation.
    pub fn with_sign(mut self, sign: SignOrder) -> Self {
        self.sign = sign;
        self
    }

    /// Underlying bytes.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Key length in bits.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Bit numbering of this key.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Sign interpretation of this key.
    pub fn sign(&self) -> SignOrder {
        self.sign
    }

    /// Returns bit `index` of the extended bit string.
    pub fn bit(&self, index: u32) -> bool {
        if index < self.bits {
            let byte = self.byte_offset(index >> 3);
            self.bytes[byte] & (0x80 >> (index & 7)) != 0
        } else if index - self.bits < LENGTH_BITS {
            let shift = LENGTH_BITS - 1 - (index - self.bits);
            (self.bits >> shift) & 1 == 1
        } else if index - self.bits == LENGTH_BITS {
            true
        } else {
            false
        }
    }

    /// Returns true when the sign bit is set under a signed interpretation.
    pub fn is_negative(&self) -> bool {
        self.sign.is_signed() && self.bits > 0 && self.bit(0)
    }

    /// Two keys are equal iff they have the same bit length and identical bits.
    pub fn same_key(&self, other: &KeyRef<'_>) -> bool {
        self.bits == other.bits && first_difference_within(*self, *other, self.bits).is_none()
    }

    /// Returns true when every bit of `self` is a leading bit of `other`.
    pub fn is_prefix_of(&self, other: &KeyRef<'_>) -> bool {
        self.bits <= other.bits && first_difference_within(*self, *other, self.bits).is_none()
    }

    /// Returns the leading `bits` bits of this key as a key of that length.
    pub fn truncate(&self, bits: u32) -> KeyRef<'a> {
        let bits = bits.min(self.bits);
        let len = bits.div_ceil(8) as usize;
        let bytes = match self.endian {
            Endian::Big => &self.bytes[..len],
            Endian::Little => &self.bytes[self.bytes.len() - len..],
        };
        KeyRef {
            bytes,
            bits,
            endian: self.endian,
            sign: self.sign,
        }
    }

    /// Copies the key into an owned buffer.
    pub fn to_key_buf(&self) -> KeyBuf {
        let used = self.bits.div_ceil(8) as usize;
        let bytes = match self.endian {
            Endian::Big => &self.bytes[..used],
            Endian::Little => &self.bytes[self.bytes.len() - used..],
        };
        KeyBuf {
            bytes: SmallVec::from_slice(bytes),
            bits: self.bits,
            endian: self.endian,
            sign: self.sign,
        }
    }

    // Byte holding bits [8 * chunk, 8 * chunk + 8).
    fn byte_offset(&self, chunk: u32) -> usize {
        match self.endian {
            Endian::Big => chunk as usize,
            Endian::Little => {
                let last = ((self.bits - 1) >> 3) as usize;
                let little = last - chunk as usize;
                // Little-endian keys are addressed from the end of the slice.
                self.bytes.len() - 1 - last + little
            }
        }
    }
}

impl fmt::Debug for KeyRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key(")?;
        for b in self.to_key_buf().bytes.iter() {
            write!(f, "{b:02x}")?;
        }
        write!(f, "/{}", self.bits)?;
        if self.endian == Endian::Little {
            write!(f, " le")?;
        }
        if self.sign.is_signed() {
            write!(f, " {:?}", self.sign)?;
        }
        write!(f, ")")
    }
}

/// Finds the first bit at which the extended bit strings of `a` and `b` differ.
///
/// Returns `None` when the keys are equal. Whole bytes shared by both keys are
/// compared with XOR before falling back to single-bit comparison.
pub fn first_difference(a: KeyRef<'_>, b: KeyRef<'_>) -> Option<u32> {
    let end = a.bits.max(b.bits).saturating_add(EXTENSION_BITS);
    first_difference_within(a, b, end)
}

fn first_difference_within(a: KeyRef<'_>, b: KeyRef<'_>, end: u32) -> Option<u32> {
    let full_bytes = a.bits.min(b.bits).min(end) >> 3;
    for chunk in 0..full_bytes {
        let x = a.bytes[a.byte_offset(chunk)] ^ b.bytes[b.byte_offset(chunk)];
        if x != 0 {
            return Some(chunk * 8 + x.leading_zeros());
        }
    }
    (full_bytes * 8..end).find(|&index| a.bit(index) != b.bit(index))
}

/// Owned key with inline storage for keys up to 16 bytes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KeyBuf {
    bytes: SmallVec<[u8; 16]>,
    bits: u32,
    endian: Endian,
    sign: SignOrder,
}

impl KeyBuf {
    /// Owned big-endian unsigned key over all bits of `bytes`.
    pub fn from_slice(bytes: &[u8]) -> Self {
        KeyRef::from_bytes(bytes).to_key_buf()
    }

    /// Owned key with an explicit bit length.
    pub fn with_bits(bytes: &[u8], bits: u32) -> Self {
        KeyRef::new(bytes, bits).to_key_buf()
    }

    /// Zero-length key. Every zero-length key compares equal.
    pub fn empty() -> Self {
        Self {
            bytes: SmallVec::new(),
            bits: 0,
            endian: Endian::Big,
            sign: SignOrder::Unsigned,
        }
    }

    /// Sets the sign interpretation.
    pub fn signed(mut self, sign: SignOrder) -> Self {
        self.sign = sign;
        self
    }

    /// Sets the bit numbering.
    pub fn endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Borrowed view of this key.
    pub fn as_key(&self) -> KeyRef<'_> {
        KeyRef {
            bytes: &self.bytes,
            bits: self.bits,
            endian: self.endian,
            sign: self.sign,
        }
    }
}

impl fmt::Debug for KeyBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_key().fmt(f)
    }
}

impl<'a> From<KeyRef<'a>> for KeyBuf {
    fn from(key: KeyRef<'a>) -> Self {
        key.to_key_buf()
    }
}

/// Contract for anything stored in a trie-backed index.
///
/// The index reads nothing but the key. The key must not change while the
/// item is indexed.
pub trait IndexKey {
    /// Key of this item.
    fn index_key(&self) -> KeyRef<'_>;
}

impl IndexKey for KeyBuf {
    fn index_key(&self) -> KeyRef<'_> {
        self.as_key()
    }
}

impl IndexKey for Vec<u8> {
    fn index_key(&self) -> KeyRef<'_> {
        KeyRef::from_bytes(self)
    }
}

impl IndexKey for String {
    fn index_key(&self) -> KeyRef<'_> {
        KeyRef::from_bytes(self.as_bytes())
    }
}

macro_rules! key_from_int {
    ($($name:ident: $ty:ty => $sign:expr),* $(,)?) => {
        impl KeyBuf {
            $(
                #[doc = concat!("Big-endian key for a `", stringify!($ty), "` ordered numerically.")]
                pub fn $name(value: $ty) -> Self {
                    KeyBuf::from_slice(&value.to_be_bytes()).signed($sign)
                }
            )*
        }
    };
}

key_from_int! {
    from_u8: u8 => SignOrder::Unsigned,
    from_u16: u16 => SignOrder::Unsigned,
    from_u32: u32 => SignOrder::Unsigned,
    from_u64: u64 => SignOrder::Unsigned,
    from_i8: i8 => SignOrder::TwosComplement,
    from_i16: i16 => SignOrder::TwosComplement,
    from_i32: i32 => SignOrder::TwosComplement,
    from_i64: i64 => SignOrder::TwosComplement,
}

impl KeyBuf {
    /// IEEE 754 key ordered numerically through sign-magnitude interpretation.
    pub fn from_f64(value: f64) -> Self {
        KeyBuf::from_slice(&value.to_bits().to_be_bytes()).signed(SignOrder::SignMagnitude)
    }

    /// IEEE 754 key ordered numerically through sign-magnitude interpretation.
    pub fn from_f32(value: f32) -> Self {
        KeyBuf::from_slice(&value.to_bits().to_be_bytes()).signed(SignOrder::SignMagnitude)
    }
}
