#![deny(unsafe_code)]
#![deny(warnings)]
//! Device identity derived from the STM32F405 unique ID
//!
//! The factory-programmed 96-bit UID is stable across reboots and unique to
//! each chip. It seeds everything that must differ between displays on the
//! same network: the Ethernet MAC, the network stack's random seed and the
//! fallback timer id.

/// Get the STM32F405 unique device ID as a 24-character hex string
pub fn uid_hex() -> &'static str {
    embassy_stm32::uid::uid_hex()
}

/// Get the raw 12-byte (96-bit) unique device ID
pub fn uid() -> &'static [u8; 12] {
    embassy_stm32::uid::uid()
}

/// Locally administered unicast MAC built from the low UID bytes
pub fn mac_address() -> [u8; 6] {
    mac_from_uid(uid())
}

/// Network stack seed folded from the full UID
pub fn stack_seed() -> u64 {
    seed_from_uid(uid())
}

fn mac_from_uid(uid: &[u8; 12]) -> [u8; 6] {
    // 0x02: locally administered, unicast
    [0x02, uid[7], uid[8], uid[9], uid[10], uid[11]]
}

fn seed_from_uid(uid: &[u8; 12]) -> u64 {
    let mut lo = [0u8; 8];
    lo.copy_from_slice(&uid[..8]);
    let mut hi = [0u8; 4];
    hi.copy_from_slice(&uid[8..]);
    u64::from_le_bytes(lo) ^ (u64::from(u32::from_le_bytes(hi)) << 16)
}
