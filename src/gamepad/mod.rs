//! Logical gamepad model: dense capability maps, normalized per-frame
//! state, and the registry the platform backend populates.

pub(crate) mod evdev_ffi;
#[cfg(target_os = "linux")]
mod linux;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::sdl_id::sdl_gamepad_id;
use self::evdev_ffi::{
    bit_is_set, AbsInfo, InputId, RawInputEvent, ABS_BITS_LEN, ABS_CNT, ABS_HAT0X, ABS_HAT3Y,
    BTN_MISC, EV_ABS, EV_BITS_LEN, EV_KEY, EV_SYN, HAT_SLOTS, KEY_BITS_LEN, KEY_CNT, KEY_SLOTS,
    SYN_DROPPED, SYN_REPORT,
};

// 4-bit hat direction masks; up+right etc. combine.
pub const HAT_CENTERED: u8 = 0;
pub const HAT_UP: u8 = 1;
pub const HAT_RIGHT: u8 = 2;
pub const HAT_DOWN: u8 = 4;
pub const HAT_LEFT: u8 = 8;

/// Matches the kernel's `event<N>` device node naming.
pub(crate) fn is_event_node(name: &str) -> bool {
    match name.strip_prefix("event") {
        Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Capability-query surface of one opened device. The Linux backend
/// implements this over ioctls; tests substitute a fake. Everything above
/// this trait is platform-neutral.
pub(crate) trait DeviceQuery {
    fn event_type_bits(&self) -> Result<[u8; EV_BITS_LEN]>;
    fn key_bits(&self) -> Result<[u8; KEY_BITS_LEN]>;
    fn abs_bits(&self) -> Result<[u8; ABS_BITS_LEN]>;
    fn identity(&self) -> Result<InputId>;
    fn device_name(&self) -> Option<String>;
    fn abs_info(&self, code: u16) -> Result<AbsInfo>;
}

/// Normalized device state plus the sparse-to-dense code maps assigned at
/// discovery. Map entries never change while the device is open.
pub(crate) struct GamepadState {
    key_map: [Option<u16>; KEY_SLOTS],
    abs_map: [Option<u16>; ABS_CNT],
    abs_info: [AbsInfo; ABS_CNT],
    axes: [f32; ABS_CNT],
    buttons: [bool; KEY_SLOTS],
    hats: [u8; HAT_SLOTS],
    dropped: bool,
    axis_count: usize,
    button_count: usize,
    hat_count: usize,
}

impl GamepadState {
    fn new() -> Self {
        Self {
            key_map: [None; KEY_SLOTS],
            abs_map: [None; ABS_CNT],
            abs_info: [AbsInfo::default(); ABS_CNT],
            axes: [0.0; ABS_CNT],
            buttons: [false; KEY_SLOTS],
            hats: [HAT_CENTERED; HAT_SLOTS],
            dropped: false,
            axis_count: 0,
            button_count: 0,
            hat_count: 0,
        }
    }

    /// Assigns dense indices to every code present in the capability
    /// bitmaps, in ascending code order. A hat is an X/Y pair; both codes
    /// land on one hat index. Every non-hat axis gets its calibration read
    /// immediately.
    fn assign_maps(
        &mut self,
        key_bits: &[u8],
        abs_bits: &[u8],
        dev: &impl DeviceQuery,
    ) -> Result<()> {
        for code in BTN_MISC..KEY_CNT {
            if !bit_is_set(key_bits, code) {
                continue;
            }
            self.key_map[code - BTN_MISC] = Some(self.button_count as u16);
            self.button_count += 1;
        }

        let mut code = 0usize;
        while code < ABS_CNT {
            if !bit_is_set(abs_bits, code) {
                code += 1;
                continue;
            }
            let c = code as u16;
            if (ABS_HAT0X..=ABS_HAT3Y).contains(&c) {
                let base = (c - (c - ABS_HAT0X) % 2) as usize;
                self.abs_map[base] = Some(self.hat_count as u16);
                self.abs_map[base + 1] = Some(self.hat_count as u16);
                self.hat_count += 1;
                code = base + 2;
                continue;
            }
            self.abs_info[code] = dev.abs_info(c)?;
            self.abs_map[code] = Some(self.axis_count as u16);
            self.axis_count += 1;
            code += 1;
        }
        Ok(())
    }

    /// Re-reads calibration for every mapped absolute code and pushes the
    /// current raw value through the live normalization path. Runs at
    /// discovery and after every sync report, which is what makes overflow
    /// recovery safe.
    fn resync(&mut self, dev: &impl DeviceQuery) -> Result<()> {
        for code in 0..ABS_CNT {
            if self.abs_map[code].is_none() {
                continue;
            }
            let info = dev.abs_info(code as u16)?;
            self.abs_info[code] = info;
            self.apply_abs(code as u16, info.value);
        }
        Ok(())
    }

    fn process_event(&mut self, ev: RawInputEvent, dev: &impl DeviceQuery) -> Result<()> {
        if ev.kind == EV_SYN {
            match ev.code {
                SYN_DROPPED => self.dropped = true,
                SYN_REPORT => {
                    self.dropped = false;
                    self.resync(dev)?;
                }
                _ => {}
            }
            return Ok(());
        }

        // Between an overflow and the next report the kernel queue holds an
        // inconsistent tail; applying it would corrupt state.
        if self.dropped {
            return Ok(());
        }

        match ev.kind {
            EV_KEY => {
                if let Some(slot) = (ev.code as usize).checked_sub(BTN_MISC) {
                    if let Some(Some(index)) = self.key_map.get(slot).copied() {
                        self.buttons[index as usize] = ev.value != 0;
                    }
                }
            }
            EV_ABS => self.apply_abs(ev.code, ev.value),
            _ => {}
        }
        Ok(())
    }

    fn apply_abs(&mut self, code: u16, value: i32) {
        let Some(index) = self.abs_map.get(code as usize).copied().flatten() else {
            return;
        };
        let index = index as usize;

        if (ABS_HAT0X..=ABS_HAT3Y).contains(&code) {
            let (neg, pos) = if (code - ABS_HAT0X) % 2 == 0 {
                (HAT_LEFT, HAT_RIGHT)
            } else {
                (HAT_UP, HAT_DOWN)
            };
            if value < 0 {
                self.hats[index] |= neg;
                self.hats[index] &= !pos;
            } else if value > 0 {
                self.hats[index] &= !neg;
                self.hats[index] |= pos;
            } else {
                self.hats[index] &= !(neg | pos);
            }
            return;
        }

        let info = self.abs_info[code as usize];
        let range = info.maximum as f32 - info.minimum as f32;
        if range != 0.0 {
            let v = (value as f32 - info.minimum as f32) / range;
            self.axes[index] = v * 2.0 - 1.0;
        }
        // Degenerate calibration (min == max): keep the previous value.
    }
}

/// Result of a successful capability probe.
pub(crate) struct ProbedGamepad {
    pub(crate) name: String,
    pub(crate) sdl_id: String,
    pub(crate) state: GamepadState,
}

/// Queries a device's capabilities and builds its logical state. Returns
/// `Ok(None)` for devices that are not gamepads (no key or no absolute-axis
/// support).
pub(crate) fn probe_device(dev: &impl DeviceQuery) -> Result<Option<ProbedGamepad>> {
    let ev_bits = dev.event_type_bits()?;
    if !bit_is_set(&ev_bits, EV_KEY as usize) || !bit_is_set(&ev_bits, EV_ABS as usize) {
        return Ok(None);
    }

    let key_bits = dev.key_bits()?;
    let abs_bits = dev.abs_bits()?;
    let id = dev.identity()?;
    let name = dev.device_name().unwrap_or_else(|| "Unknown".to_string());
    let sdl_id = sdl_gamepad_id(id.bustype, id.vendor, id.product, id.version, &name);

    let mut state = GamepadState::new();
    state.assign_maps(&key_bits, &abs_bits, dev)?;
    state.resync(dev)?;

    Ok(Some(ProbedGamepad {
        name,
        sdl_id,
        state,
    }))
}

/// One connected gamepad. Owns the open device handle; dropping the handle
/// (explicitly on removal, or with the whole struct) closes it.
pub struct Gamepad {
    name: String,
    sdl_id: String,
    path: PathBuf,
    state: GamepadState,
    #[cfg(target_os = "linux")]
    dev: Option<linux::DeviceHandle>,
}

impl Gamepad {
    #[cfg(target_os = "linux")]
    pub(crate) fn open(probe: ProbedGamepad, path: PathBuf, dev: linux::DeviceHandle) -> Self {
        Self {
            name: probe.name,
            sdl_id: probe.sdl_id,
            path,
            state: probe.state,
            dev: Some(dev),
        }
    }

    /// Drains all pending device events. Disconnection closes the handle
    /// and reports success; the registry prunes the entry afterwards.
    #[cfg(target_os = "linux")]
    pub(crate) fn update(&mut self) -> Result<()> {
        use self::linux::ReadStatus;

        let Some(dev) = self.dev.take() else {
            return Ok(());
        };
        loop {
            match dev.read_event()? {
                ReadStatus::Event(ev) => self.state.process_event(ev, &dev)?,
                ReadStatus::WouldBlock => {
                    self.dev = Some(dev);
                    return Ok(());
                }
                ReadStatus::Disconnected => {
                    log::info!("gamepad disconnected: {}", self.path.display());
                    // dev drops here, closing the fd
                    return Ok(());
                }
            }
        }
    }

    #[cfg(not(target_os = "linux"))]
    pub(crate) fn update(&mut self) -> Result<()> {
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier for looking up a standard button/axis layout in an
    /// external mapping table.
    pub fn sdl_id(&self) -> &str {
        &self.sdl_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_connected(&self) -> bool {
        #[cfg(target_os = "linux")]
        {
            self.dev.is_some()
        }
        #[cfg(not(target_os = "linux"))]
        {
            false
        }
    }

    pub fn axis_count(&self) -> usize {
        self.state.axis_count
    }

    pub fn button_count(&self) -> usize {
        self.state.button_count
    }

    pub fn hat_count(&self) -> usize {
        self.state.hat_count
    }

    /// Normalized axis value in [-1.0, 1.0]; 0.0 for an index out of range.
    pub fn axis_value(&self, axis: usize) -> f32 {
        if axis >= self.state.axis_count {
            return 0.0;
        }
        self.state.axes[axis]
    }

    pub fn is_button_pressed(&self, button: usize) -> bool {
        if button >= self.state.button_count {
            return false;
        }
        self.state.buttons[button]
    }

    /// Analog button pressure.
    ///
    /// # Panics
    ///
    /// Always. The evdev backend reports buttons as on/off only; calling
    /// this is a programming error, not a recoverable condition. Check
    /// `has_own_standard_layout_mapping` and the counts first.
    pub fn button_value(&self, _button: usize) -> f32 {
        panic!("padpoll: button_value is not supported by the evdev backend");
    }

    /// 4-bit direction mask (`HAT_UP` | `HAT_RIGHT` | ...); `HAT_CENTERED`
    /// for an index out of range.
    pub fn hat_state(&self, hat: usize) -> u8 {
        if hat >= self.state.hat_count {
            return HAT_CENTERED;
        }
        self.state.hats[hat]
    }

    /// This backend has no built-in layout; callers look one up in the
    /// external mapping table keyed by [`Gamepad::sdl_id`].
    pub fn has_own_standard_layout_mapping(&self) -> bool {
        false
    }

    /// Rumble hook. The evdev backend does not drive force feedback yet.
    // TODO: upload an FF_RUMBLE effect via EVIOCSFF and write an EV_FF event.
    pub fn vibrate(&mut self, _duration: Duration, _strong_magnitude: f32, _weak_magnitude: f32) {}

    #[cfg(test)]
    fn with_state(state: GamepadState) -> Self {
        Self {
            name: "test pad".to_string(),
            sdl_id: String::new(),
            path: PathBuf::from("/dev/input/event99"),
            state,
            #[cfg(target_os = "linux")]
            dev: None,
        }
    }
}

/// Insertion-ordered collection of connected gamepads plus the directory
/// watcher feeding it. The application calls [`Gamepads::update`] once per
/// frame.
pub struct Gamepads {
    entries: Vec<Gamepad>,
    #[cfg(target_os = "linux")]
    watcher: Option<linux::DeviceWatcher>,
}

impl Gamepads {
    /// Scans the default device directory and starts watching it for
    /// arrivals and removals. A platform without the directory yields an
    /// empty, inert collection.
    pub fn new() -> Result<Self> {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Result<Self> {
        let mut pads = Self {
            entries: Vec::new(),
            #[cfg(target_os = "linux")]
            watcher: None,
        };
        #[cfg(target_os = "linux")]
        {
            pads.watcher = linux::DeviceWatcher::init(&config.device_dir, &mut pads)?;
        }
        #[cfg(not(target_os = "linux"))]
        let _ = config;
        Ok(pads)
    }

    /// One cooperative poll cycle: drain directory notifications, drain
    /// every device's event queue, prune devices that went away.
    pub fn update(&mut self) -> Result<()> {
        #[cfg(target_os = "linux")]
        if let Some(mut watcher) = self.watcher.take() {
            let drained = watcher.poll(self);
            self.watcher = Some(watcher);
            drained?;
        }

        for pad in &mut self.entries {
            pad.update()?;
        }
        self.entries.retain(|pad| {
            if pad.is_connected() {
                true
            } else {
                log::info!("gamepad removed: {} ({})", pad.name(), pad.path().display());
                false
            }
        });
        Ok(())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Gamepad> {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Gamepad> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, mut pred: impl FnMut(&Gamepad) -> bool) -> Option<&Gamepad> {
        self.entries.iter().find(|pad| pred(pad))
    }

    pub(crate) fn add(&mut self, pad: Gamepad) -> &mut Gamepad {
        self.entries.push(pad);
        self.entries.last_mut().expect("just pushed")
    }

    pub(crate) fn remove_first(
        &mut self,
        mut pred: impl FnMut(&Gamepad) -> bool,
    ) -> Option<Gamepad> {
        let index = self.entries.iter().position(|pad| pred(pad))?;
        Some(self.entries.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeDevice {
        ev_bits: [u8; EV_BITS_LEN],
        key_bits: [u8; KEY_BITS_LEN],
        abs_bits: [u8; ABS_BITS_LEN],
        id: InputId,
        name: Option<String>,
        abs: HashMap<u16, AbsInfo>,
    }

    impl FakeDevice {
        fn new() -> Self {
            Self {
                ev_bits: [0; EV_BITS_LEN],
                key_bits: [0; KEY_BITS_LEN],
                abs_bits: [0; ABS_BITS_LEN],
                id: InputId {
                    bustype: 0x0003,
                    vendor: 0x045e,
                    product: 0x028e,
                    version: 0x0110,
                },
                name: Some("Fake Pad".to_string()),
                abs: HashMap::new(),
            }
        }

        fn set_ev(&mut self, bit: u16) {
            self.ev_bits[bit as usize / 8] |= 1 << (bit % 8);
        }

        fn set_key(&mut self, code: u16) {
            self.key_bits[code as usize / 8] |= 1 << (code % 8);
        }

        fn set_abs(&mut self, code: u16, info: AbsInfo) {
            self.abs_bits[code as usize / 8] |= 1 << (code % 8);
            self.abs.insert(code, info);
        }
    }

    impl DeviceQuery for FakeDevice {
        fn event_type_bits(&self) -> Result<[u8; EV_BITS_LEN]> {
            Ok(self.ev_bits)
        }

        fn key_bits(&self) -> Result<[u8; KEY_BITS_LEN]> {
            Ok(self.key_bits)
        }

        fn abs_bits(&self) -> Result<[u8; ABS_BITS_LEN]> {
            Ok(self.abs_bits)
        }

        fn identity(&self) -> Result<InputId> {
            Ok(self.id)
        }

        fn device_name(&self) -> Option<String> {
            self.name.clone()
        }

        fn abs_info(&self, code: u16) -> Result<AbsInfo> {
            Ok(self.abs.get(&code).copied().unwrap_or_default())
        }
    }

    const BTN_SOUTH: u16 = 0x130;
    const BTN_EAST: u16 = 0x131;
    const ABS_X: u16 = 0x00;
    const ABS_Y: u16 = 0x01;
    const ABS_HAT0Y: u16 = 0x11;

    /// 2 buttons, 2 axes, 1 hat.
    fn fake_pad() -> FakeDevice {
        let mut dev = FakeDevice::new();
        dev.set_ev(EV_SYN);
        dev.set_ev(EV_KEY);
        dev.set_ev(EV_ABS);
        dev.set_key(BTN_SOUTH);
        dev.set_key(BTN_EAST);
        dev.set_abs(
            ABS_X,
            AbsInfo {
                value: 0,
                minimum: -32768,
                maximum: 32767,
                ..Default::default()
            },
        );
        dev.set_abs(
            ABS_Y,
            AbsInfo {
                value: 200,
                minimum: 0,
                maximum: 200,
                ..Default::default()
            },
        );
        dev.set_abs(
            ABS_HAT0X,
            AbsInfo {
                value: 0,
                minimum: -1,
                maximum: 1,
                ..Default::default()
            },
        );
        dev.set_abs(
            ABS_HAT0Y,
            AbsInfo {
                value: 0,
                minimum: -1,
                maximum: 1,
                ..Default::default()
            },
        );
        dev
    }

    fn key_event(code: u16, value: i32) -> RawInputEvent {
        RawInputEvent {
            kind: EV_KEY,
            code,
            value,
        }
    }

    fn abs_event(code: u16, value: i32) -> RawInputEvent {
        RawInputEvent {
            kind: EV_ABS,
            code,
            value,
        }
    }

    fn syn_event(code: u16) -> RawInputEvent {
        RawInputEvent {
            kind: EV_SYN,
            code,
            value: 0,
        }
    }

    #[test]
    fn probe_counts_capabilities() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dev = fake_pad();
        let probe = probe_device(&dev).unwrap().unwrap();
        assert_eq!(probe.state.button_count, 2);
        assert_eq!(probe.state.axis_count, 2);
        assert_eq!(probe.state.hat_count, 1);
        assert_eq!(probe.name, "Fake Pad");
        assert_eq!(probe.sdl_id, "030000005e0400008e02000010010000");
    }

    #[test]
    fn probe_rejects_non_gamepads() {
        let mut dev = FakeDevice::new();
        dev.set_ev(EV_KEY); // no EV_ABS: keyboard-like device
        dev.set_key(BTN_SOUTH);
        assert!(probe_device(&dev).unwrap().is_none());

        let mut dev = FakeDevice::new();
        dev.set_ev(EV_ABS); // no EV_KEY
        assert!(probe_device(&dev).unwrap().is_none());
    }

    #[test]
    fn dense_indices_are_contiguous() {
        let mut dev = FakeDevice::new();
        dev.set_ev(EV_KEY);
        dev.set_ev(EV_ABS);
        // Deliberately sparse, non-contiguous codes.
        for code in [0x120u16, 0x130, 0x13f, 0x2c0] {
            dev.set_key(code);
        }
        for code in [0x00u16, 0x05, 0x28] {
            dev.set_abs(code, AbsInfo::default());
        }
        dev.set_abs(ABS_HAT0X, AbsInfo::default());
        dev.set_abs(ABS_HAT0Y, AbsInfo::default());

        let probe = probe_device(&dev).unwrap().unwrap();
        let state = &probe.state;

        let assigned: Vec<u16> = state.key_map.iter().filter_map(|m| *m).collect();
        assert_eq!(assigned, vec![0, 1, 2, 3]);
        assert_eq!(state.button_count, 4);

        // Non-hat axes take 0..axis_count in ascending code order; the hat
        // pair consumes both codes and exactly one hat index.
        assert_eq!(state.abs_map[0x00], Some(0));
        assert_eq!(state.abs_map[0x05], Some(1));
        assert_eq!(state.abs_map[0x28], Some(2));
        assert_eq!(state.abs_map[ABS_HAT0X as usize], Some(0));
        assert_eq!(state.abs_map[ABS_HAT0Y as usize], Some(0));
        assert_eq!(state.axis_count, 3);
        assert_eq!(state.hat_count, 1);
    }

    #[test]
    fn key_event_sets_button() {
        let dev = fake_pad();
        let mut state = probe_device(&dev).unwrap().unwrap().state;

        state.process_event(key_event(BTN_EAST, 1), &dev).unwrap();
        assert!(state.buttons[1]);
        state.process_event(key_event(BTN_EAST, 0), &dev).unwrap();
        assert!(!state.buttons[1]);

        // Codes below BTN_MISC and unmapped codes are ignored.
        state.process_event(key_event(0x30, 1), &dev).unwrap();
        state.process_event(key_event(0x2ff, 1), &dev).unwrap();
        assert_eq!(state.buttons.iter().filter(|b| **b).count(), 0);
    }

    #[test]
    fn axis_normalization_endpoints() {
        let dev = fake_pad();
        let mut state = probe_device(&dev).unwrap().unwrap().state;

        state.process_event(abs_event(ABS_Y, 0), &dev).unwrap();
        assert_eq!(state.axes[1], -1.0);
        state.process_event(abs_event(ABS_Y, 200), &dev).unwrap();
        assert_eq!(state.axes[1], 1.0);
        state.process_event(abs_event(ABS_Y, 100), &dev).unwrap();
        assert!(state.axes[1].abs() < 1e-6);
    }

    #[test]
    fn degenerate_calibration_keeps_previous_value() {
        let dev = fake_pad();
        let mut state = probe_device(&dev).unwrap().unwrap().state;

        state.process_event(abs_event(ABS_Y, 50), &dev).unwrap();
        let before = state.axes[1];

        // Force min == max and replay an event; the value must not move.
        state.abs_info[ABS_Y as usize].minimum = 7;
        state.abs_info[ABS_Y as usize].maximum = 7;
        state.process_event(abs_event(ABS_Y, 123), &dev).unwrap();
        assert_eq!(state.axes[1], before);
    }

    #[test]
    fn hat_directions_are_exclusive_per_pair() {
        let dev = fake_pad();
        let mut state = probe_device(&dev).unwrap().unwrap().state;

        state.process_event(abs_event(ABS_HAT0X, -1), &dev).unwrap();
        assert_eq!(state.hats[0], HAT_LEFT);
        state.process_event(abs_event(ABS_HAT0X, 1), &dev).unwrap();
        assert_eq!(state.hats[0], HAT_RIGHT);
        state.process_event(abs_event(ABS_HAT0Y, -1), &dev).unwrap();
        assert_eq!(state.hats[0], HAT_RIGHT | HAT_UP);
        state.process_event(abs_event(ABS_HAT0Y, 1), &dev).unwrap();
        assert_eq!(state.hats[0], HAT_RIGHT | HAT_DOWN);
        state.process_event(abs_event(ABS_HAT0X, 0), &dev).unwrap();
        assert_eq!(state.hats[0], HAT_DOWN);
        state.process_event(abs_event(ABS_HAT0Y, 0), &dev).unwrap();
        assert_eq!(state.hats[0], HAT_CENTERED);
    }

    #[test]
    fn dropped_window_discards_events_until_report() {
        let mut dev = fake_pad();
        let mut state = probe_device(&dev).unwrap().unwrap().state;

        state.process_event(key_event(BTN_SOUTH, 1), &dev).unwrap();
        state.process_event(abs_event(ABS_Y, 0), &dev).unwrap();
        assert!(state.buttons[0]);
        assert_eq!(state.axes[1], -1.0);

        state.process_event(syn_event(SYN_DROPPED), &dev).unwrap();
        assert!(state.dropped);

        // Three unrelated events inside the dropped window; none may apply.
        state.process_event(key_event(BTN_SOUTH, 0), &dev).unwrap();
        state.process_event(abs_event(ABS_Y, 200), &dev).unwrap();
        state.process_event(abs_event(ABS_HAT0X, -1), &dev).unwrap();
        assert!(state.buttons[0]);
        assert_eq!(state.axes[1], -1.0);
        assert_eq!(state.hats[0], HAT_CENTERED);

        // The device's own current values changed while events were lost.
        dev.abs.get_mut(&ABS_Y).unwrap().value = 150;

        state.process_event(syn_event(SYN_REPORT), &dev).unwrap();
        assert!(!state.dropped);

        // State now matches a fresh resync of the device, not the buffered
        // deltas.
        let mut fresh = probe_device(&dev).unwrap().unwrap().state;
        fresh.resync(&dev).unwrap();
        assert_eq!(state.axes[..state.axis_count], fresh.axes[..fresh.axis_count]);
        assert_eq!(state.hats, fresh.hats);
        // Buttons are not resynchronized by the kernel; the last applied
        // press survives.
        assert!(state.buttons[0]);
    }

    #[test]
    fn accessors_handle_out_of_range_indices() {
        let dev = fake_pad();
        let pad = Gamepad::with_state(probe_device(&dev).unwrap().unwrap().state);

        assert_eq!(pad.axis_count(), 2);
        assert_eq!(pad.button_count(), 2);
        assert_eq!(pad.hat_count(), 1);
        assert_eq!(pad.axis_value(17), 0.0);
        assert!(!pad.is_button_pressed(17));
        assert_eq!(pad.hat_state(17), HAT_CENTERED);
        assert!(!pad.has_own_standard_layout_mapping());
    }

    #[test]
    #[should_panic(expected = "button_value is not supported")]
    fn button_value_is_unsupported() {
        let dev = fake_pad();
        let pad = Gamepad::with_state(probe_device(&dev).unwrap().unwrap().state);
        pad.button_value(0);
    }

    #[test]
    fn event_node_pattern() {
        assert!(is_event_node("event0"));
        assert!(is_event_node("event27"));
        assert!(!is_event_node("event"));
        assert!(!is_event_node("event1a"));
        assert!(!is_event_node("Event0"));
        assert!(!is_event_node("js0"));
        assert!(!is_event_node("mouse1"));
    }

    #[test]
    fn removing_unknown_path_is_a_noop() {
        let mut pads = Gamepads {
            entries: Vec::new(),
            #[cfg(target_os = "linux")]
            watcher: None,
        };
        let dev = fake_pad();
        pads.add(Gamepad::with_state(probe_device(&dev).unwrap().unwrap().state));

        let missing = Path::new("/dev/input/event55");
        assert!(pads.remove_first(|p| p.path() == missing).is_none());
        assert_eq!(pads.len(), 1);

        let known = Path::new("/dev/input/event99");
        assert!(pads.remove_first(|p| p.path() == known).is_some());
        assert!(pads.is_empty());
    }

    #[test]
    fn missing_device_dir_means_no_support() {
        let config = Config {
            device_dir: PathBuf::from("/nonexistent/padpoll-input"),
        };
        let mut pads = Gamepads::with_config(&config).unwrap();
        assert!(pads.is_empty());
        // Updates with no watcher are no-ops.
        pads.update().unwrap();
        pads.update().unwrap();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn create_notification_probes_matching_names() {
        let dir = std::env::temp_dir().join(format!("padpoll-notify-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let config = Config {
            device_dir: dir.clone(),
        };
        let mut pads = Gamepads::with_config(&config).unwrap();
        assert!(pads.is_empty());

        // A regular file named like a device node gets probed once; the
        // capability ioctl on it fails, which is how the probe surfaces
        // here. The non-matching name must never be touched.
        std::fs::write(dir.join("event0"), b"").unwrap();
        std::fs::write(dir.join("js0"), b"").unwrap();
        match pads.update() {
            Err(crate::error::Error::Device { path, .. }) => {
                assert!(path.ends_with("event0"));
            }
            other => panic!("expected a device error for event0, got {:?}", other.err()),
        }
        assert!(pads.is_empty());

        // Deleting names that never registered is a no-op.
        std::fs::remove_file(dir.join("event0")).unwrap();
        std::fs::remove_file(dir.join("js0")).unwrap();
        pads.update().unwrap();
        assert!(pads.is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn empty_device_dir_scans_clean() {
        let dir = std::env::temp_dir().join(format!("padpoll-watch-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let config = Config {
            device_dir: dir.clone(),
        };
        let mut pads = Gamepads::with_config(&config).unwrap();
        assert!(pads.is_empty());
        pads.update().unwrap();

        std::fs::remove_dir_all(&dir).ok();
    }
}
