use bitflags::bitflags;

bitflags! {
    /// Flags for authenticator Data
    ///
    /// Bits that are not named here are reserved and dropped while parsing.
    ///
    /// <https://w3c.github.io/webauthn/#authdata-flags>
    #[repr(transparent)]
    #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
    pub struct Flags: u8 {
        /// User Present, bit 0
        const UP = 1 << 0;
        /// User Verified, bit 2
        const UV = 1 << 2;
        /// Backup Eligibility, bit 3
        const BE = 1 << 3;
        /// Backup state, bit 4
        const BS = 1 << 4;
        /// Attested Credential Data, bit 6
        const AT = 1 << 6;
        /// Extension Data Included, bit 7
        const ED = 1 << 7;
    }
}

impl Flags {
    /// Decode a flags byte, ignoring the reserved bits.
    pub fn from_byte(byte: u8) -> Self {
        Flags::from_bits_truncate(byte)
    }

    /// Whether the user was present, or verified while also present.
    ///
    /// User verification without user presence is not a valid combination and does not satisfy
    /// this predicate.
    pub fn up_or_uv(&self) -> bool {
        self.contains(Flags::UP)
    }

    /// The names of the set flags, in bit order.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

impl Default for Flags {
    fn default() -> Self {
        Flags::empty()
    }
}

impl From<Flags> for u8 {
    fn from(src: Flags) -> Self {
        src.bits()
    }
}
