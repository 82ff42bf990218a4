//! Derivation constants

/// BIP-32 purpose for deterministic ecash secrets (hardened)
pub const DERIVATION_PURPOSE: u32 = 129_372;

/// Coin type level of the derivation path (hardened)
pub const DERIVATION_COIN_TYPE: u32 = 0;

/// Keyset ids are reduced modulo this value to obtain a hardened child index
pub const KEYSET_INDEX_MODULUS: u64 = (1 << 31) - 1;

/// Largest value a persisted counter may hold.
///
/// Counter indices become hardened BIP-32 children, so they must stay below 2^31.
pub const MAX_COUNTER: u32 = (1 << 31) - 1;

/// Final path component selecting the secret
pub const SECRET_BRANCH: u32 = 0;

/// Final path component selecting the blinding factor
pub const BLINDING_BRANCH: u32 = 1;
