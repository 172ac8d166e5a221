//! Canonical device identifier in the SDL gamecontrollerdb layout.

use std::fmt::Write as _;

/// Number of device-name bytes packed into the fallback identifier.
const NAME_BYTES: usize = 12;

/// Builds the 32-hex-digit identifier the external standard-layout mapping
/// table is keyed by.
///
/// With non-zero vendor, product and version the identifier encodes bus
/// type, vendor, product and version as little-endian 16-bit fields, each
/// followed by two zero bytes. Devices without usable hardware IDs fall
/// back to the bus type plus the first 12 bytes of the device name,
/// zero-padded. Both layouts must stay bit-for-bit stable: they are what
/// community mapping databases match against.
pub fn sdl_gamepad_id(bustype: u16, vendor: u16, product: u16, version: u16, name: &str) -> String {
    let [bus_lo, bus_hi] = bustype.to_le_bytes();
    if vendor != 0 && product != 0 && version != 0 {
        let [ven_lo, ven_hi] = vendor.to_le_bytes();
        let [pro_lo, pro_hi] = product.to_le_bytes();
        let [ver_lo, ver_hi] = version.to_le_bytes();
        return format!(
            "{bus_lo:02x}{bus_hi:02x}0000{ven_lo:02x}{ven_hi:02x}0000{pro_lo:02x}{pro_hi:02x}0000{ver_lo:02x}{ver_hi:02x}0000"
        );
    }

    let mut name_bytes = [0u8; NAME_BYTES];
    for (dst, src) in name_bytes.iter_mut().zip(name.bytes()) {
        *dst = src;
    }
    let mut id = format!("{bus_lo:02x}{bus_hi:02x}0000");
    for b in name_bytes {
        let _ = write!(id, "{b:02x}");
    }
    id
}
