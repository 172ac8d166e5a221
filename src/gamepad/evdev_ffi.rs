//! Kernel ABI constants and record layouts for the evdev backend.
//!
//! Everything that has to match the kernel bit-for-bit lives here: event
//! type/code constants, the `#[repr(C)]` records filled in by ioctls, and
//! the little-endian decoders for `input_event` and inotify records.

// Event types
pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_ABS: u16 = 0x03;
pub const EV_CNT: usize = 0x20;

// Synchronization codes
pub const SYN_REPORT: u16 = 0x00;
pub const SYN_DROPPED: u16 = 0x03;

// Key code space; gamepad buttons start at BTN_MISC
pub const KEY_CNT: usize = 0x300;
pub const BTN_MISC: usize = 0x100;
pub const KEY_SLOTS: usize = KEY_CNT - BTN_MISC;

// Absolute axis code space; hats are the HAT0X..=HAT3Y pairs
pub const ABS_CNT: usize = 0x40;
pub const ABS_HAT0X: u16 = 0x10;
pub const ABS_HAT3Y: u16 = 0x17;
pub const HAT_SLOTS: usize = 4;

// Capability bitmap sizes, one bit per code
pub const EV_BITS_LEN: usize = (EV_CNT + 7) / 8;
pub const KEY_BITS_LEN: usize = (KEY_CNT + 7) / 8;
pub const ABS_BITS_LEN: usize = (ABS_CNT + 7) / 8;

// inotify event masks
pub const IN_ATTRIB: u32 = 0x0000_0004;
pub const IN_CREATE: u32 = 0x0000_0100;
pub const IN_DELETE: u32 = 0x0000_0200;

/// Hardware identity as returned by EVIOCGID.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputId {
    pub bustype: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
}

/// Per-axis calibration record as returned by EVIOCGABS. All six fields
/// are part of the kernel layout even though only the first three are
/// consumed here.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(dead_code)]
pub struct AbsInfo {
    pub value: i32,
    pub minimum: i32,
    pub maximum: i32,
    pub fuzz: i32,
    pub flat: i32,
    pub resolution: i32,
}

/// Tests one bit in an ioctl-returned capability bitmap.
pub fn bit_is_set(bits: &[u8], bit: usize) -> bool {
    bits.get(bit / 8).is_some_and(|b| b & (1 << (bit % 8)) != 0)
}

/// Size of a `struct input_event` on 64-bit kernels: two 8-byte time
/// fields followed by type, code and value.
pub const INPUT_EVENT_SIZE: usize = 24;

/// One decoded device event. The timestamp is not carried over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawInputEvent {
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl RawInputEvent {
    /// Decodes a single `input_event` record, returning `None` on a short
    /// buffer.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < INPUT_EVENT_SIZE {
            return None;
        }
        Some(Self {
            kind: u16::from_le_bytes([buf[16], buf[17]]),
            code: u16::from_le_bytes([buf[18], buf[19]]),
            value: i32::from_le_bytes([buf[20], buf[21], buf[22], buf[23]]),
        })
    }
}

pub const INOTIFY_HEADER_SIZE: usize = 16;

/// One decoded inotify record. Watch id and cookie come with the wire
/// format; only mask and name drive the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub struct NotifyRecord {
    pub wd: i32,
    pub mask: u32,
    pub cookie: u32,
    pub name: String,
}

/// Decodes a batch of variable-length inotify records: a 16-byte header
/// (watch id, mask, cookie, name length) followed by `name length` bytes
/// including the null terminator. A truncated trailing record is dropped.
pub fn parse_notify_records(mut buf: &[u8]) -> Vec<NotifyRecord> {
    let mut records = Vec::new();
    while buf.len() >= INOTIFY_HEADER_SIZE {
        let wd = i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let mask = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let cookie = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
        let name_len = u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]) as usize;
        let end = INOTIFY_HEADER_SIZE + name_len;
        if end > buf.len() {
            break;
        }
        let raw = &buf[INOTIFY_HEADER_SIZE..end];
        let name = match raw.iter().position(|&b| b == 0) {
            Some(n) => String::from_utf8_lossy(&raw[..n]).into_owned(),
            None => String::from_utf8_lossy(raw).into_owned(),
        };
        records.push(NotifyRecord {
            wd,
            mask,
            cookie,
            name,
        });
        buf = &buf[end..];
    }
    records
}
