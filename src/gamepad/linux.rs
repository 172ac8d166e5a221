#![cfg(target_os = "linux")]
//! evdev backend: device handles, capability ioctls, and the inotify
//! directory watcher.

use std::ffi::CString;
use std::io;
use std::mem::size_of;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use super::evdev_ffi::{
    parse_notify_records, AbsInfo, InputId, RawInputEvent, ABS_BITS_LEN, EV_ABS, EV_BITS_LEN,
    EV_KEY, INPUT_EVENT_SIZE, IN_ATTRIB, IN_CREATE, IN_DELETE, KEY_BITS_LEN,
};
use super::{is_event_node, probe_device, DeviceQuery, Gamepad, Gamepads};
use crate::error::{Error, Result};

// ioctl request encoding (asm-generic _IOC, read direction, type 'E')
const IOC_TYPESHIFT: u64 = 8;
const IOC_SIZESHIFT: u64 = 16;
const IOC_DIRSHIFT: u64 = 30;
const IOC_READ: u64 = 2;

const fn ioc_read(nr: u64, size: usize) -> libc::c_ulong {
    ((IOC_READ << IOC_DIRSHIFT)
        | ((b'E' as u64) << IOC_TYPESHIFT)
        | ((size as u64) << IOC_SIZESHIFT)
        | nr) as libc::c_ulong
}

const fn eviocgbit(ev: u16, len: usize) -> libc::c_ulong {
    ioc_read(0x20 + ev as u64, len)
}

const fn eviocgabs(code: u16) -> libc::c_ulong {
    ioc_read(0x40 + code as u64, size_of::<AbsInfo>())
}

const fn eviocgname(len: usize) -> libc::c_ulong {
    ioc_read(0x06, len)
}

const EVIOCGID: libc::c_ulong = ioc_read(0x02, size_of::<InputId>());

/// Outcome of one non-blocking event read.
pub(crate) enum ReadStatus {
    Event(RawInputEvent),
    WouldBlock,
    Disconnected,
}

/// Exclusively owned open device node. Dropping it closes the fd, so every
/// path that discards the handle also releases the device.
pub(crate) struct DeviceHandle {
    fd: libc::c_int,
    path: PathBuf,
}

impl DeviceHandle {
    /// Opens a device read-only and non-blocking. Permission denied and a
    /// node that vanished between notification and open are normal
    /// (`Ok(None)`), anything else is an error.
    fn open(path: &Path) -> Result<Option<Self>> {
        let cpath = CString::new(path.as_os_str().as_bytes()).map_err(|_| Error::Device {
            op: "open",
            path: path.to_path_buf(),
            source: io::Error::from(io::ErrorKind::InvalidInput),
        })?;
        let fd = unsafe {
            libc::open(
                cpath.as_ptr(),
                libc::O_RDONLY | libc::O_NONBLOCK | libc::O_CLOEXEC,
            )
        };
        if fd < 0 {
            let err = io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(libc::EACCES) | Some(libc::ENOENT) => {
                    log::debug!("skipping {}: {}", path.display(), err);
                    Ok(None)
                }
                _ => Err(Error::Device {
                    op: "open",
                    path: path.to_path_buf(),
                    source: err,
                }),
            };
        }
        Ok(Some(Self {
            fd,
            path: path.to_path_buf(),
        }))
    }

    fn ioctl(&self, op: &'static str, request: libc::c_ulong, arg: *mut libc::c_void) -> Result<()> {
        if unsafe { libc::ioctl(self.fd, request, arg) } < 0 {
            return Err(Error::Device {
                op,
                path: self.path.clone(),
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }

    /// Reads and decodes one event record. `EAGAIN` means the queue is
    /// drained for this cycle; `ENODEV` means the device was unplugged.
    pub(crate) fn read_event(&self) -> Result<ReadStatus> {
        let mut buf = [0u8; INPUT_EVENT_SIZE];
        let n = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n < 0 {
            let err = io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(libc::EAGAIN) => Ok(ReadStatus::WouldBlock),
                Some(libc::ENODEV) => Ok(ReadStatus::Disconnected),
                _ => Err(Error::Device {
                    op: "read",
                    path: self.path.clone(),
                    source: err,
                }),
            };
        }
        match RawInputEvent::parse(&buf[..n as usize]) {
            Some(ev) => Ok(ReadStatus::Event(ev)),
            // A short read never happens for evdev; treat it as drained.
            None => Ok(ReadStatus::WouldBlock),
        }
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

impl DeviceQuery for DeviceHandle {
    fn event_type_bits(&self) -> Result<[u8; EV_BITS_LEN]> {
        let mut bits = [0u8; EV_BITS_LEN];
        self.ioctl(
            "EVIOCGBIT(0)",
            eviocgbit(0, bits.len()),
            bits.as_mut_ptr() as *mut _,
        )?;
        Ok(bits)
    }

    fn key_bits(&self) -> Result<[u8; KEY_BITS_LEN]> {
        let mut bits = [0u8; KEY_BITS_LEN];
        self.ioctl(
            "EVIOCGBIT(EV_KEY)",
            eviocgbit(EV_KEY, bits.len()),
            bits.as_mut_ptr() as *mut _,
        )?;
        Ok(bits)
    }

    fn abs_bits(&self) -> Result<[u8; ABS_BITS_LEN]> {
        let mut bits = [0u8; ABS_BITS_LEN];
        self.ioctl(
            "EVIOCGBIT(EV_ABS)",
            eviocgbit(EV_ABS, bits.len()),
            bits.as_mut_ptr() as *mut _,
        )?;
        Ok(bits)
    }

    fn identity(&self) -> Result<InputId> {
        let mut id = InputId::default();
        self.ioctl("EVIOCGID", EVIOCGID, &mut id as *mut _ as *mut _)?;
        Ok(id)
    }

    fn device_name(&self) -> Option<String> {
        let mut buf = [0u8; 256];
        let r = unsafe {
            libc::ioctl(
                self.fd,
                eviocgname(buf.len()),
                buf.as_mut_ptr() as *mut libc::c_void,
            )
        };
        if r < 0 {
            return None;
        }
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        Some(String::from_utf8_lossy(&buf[..end]).into_owned())
    }

    fn abs_info(&self, code: u16) -> Result<AbsInfo> {
        let mut info = AbsInfo::default();
        self.ioctl("EVIOCGABS", eviocgabs(code), &mut info as *mut _ as *mut _)?;
        Ok(info)
    }
}

/// Probes a device node and registers it on success. A path already in the
/// registry and anything that is not a usable gamepad are no-ops.
pub(crate) fn open_gamepad(pads: &mut Gamepads, path: &Path) -> Result<()> {
    if pads.find(|pad| pad.path() == path).is_some() {
        return Ok(());
    }
    let Some(dev) = DeviceHandle::open(path)? else {
        return Ok(());
    };
    let Some(probe) = probe_device(&dev)? else {
        log::debug!("{} is not a gamepad", path.display());
        return Ok(());
    };

    let pad = pads.add(Gamepad::open(probe, path.to_path_buf(), dev));
    log::info!(
        "gamepad connected: {} [{}] at {} (axes={}, buttons={}, hats={})",
        pad.name(),
        pad.sdl_id(),
        pad.path().display(),
        pad.axis_count(),
        pad.button_count(),
        pad.hat_count(),
    );
    Ok(())
}

/// inotify watch on the device directory. Feeds device arrival and removal
/// into the registry each poll cycle.
pub(crate) struct DeviceWatcher {
    fd: libc::c_int,
    dir: PathBuf,
}

impl DeviceWatcher {
    /// Sets up the watch and probes every device node already present.
    /// Returns `None` when the directory does not exist or is not a
    /// directory: the platform simply has no evdev support.
    pub(crate) fn init(dir: &Path, pads: &mut Gamepads) -> Result<Option<Self>> {
        let meta = match std::fs::metadata(dir) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Watch {
                    path: dir.to_path_buf(),
                    source: e,
                })
            }
        };
        if !meta.is_dir() {
            return Ok(None);
        }

        let fd = unsafe { libc::inotify_init1(libc::IN_NONBLOCK | libc::IN_CLOEXEC) };
        if fd < 0 {
            return Err(Error::Watch {
                path: dir.to_path_buf(),
                source: io::Error::last_os_error(),
            });
        }
        let watcher = Self {
            fd,
            dir: dir.to_path_buf(),
        };

        let cdir = CString::new(dir.as_os_str().as_bytes()).map_err(|_| Error::Watch {
            path: dir.to_path_buf(),
            source: io::Error::from(io::ErrorKind::InvalidInput),
        })?;
        // IN_ATTRIB catches udev finishing its permission fixup after the
        // node itself appears.
        let mask = IN_CREATE | IN_ATTRIB | IN_DELETE;
        if unsafe { libc::inotify_add_watch(watcher.fd, cdir.as_ptr(), mask) } < 0 {
            return Err(Error::Watch {
                path: dir.to_path_buf(),
                source: io::Error::last_os_error(),
            });
        }

        // Pick up devices that were connected before we started watching.
        let entries = std::fs::read_dir(dir).map_err(|e| Error::Watch {
            path: dir.to_path_buf(),
            source: e,
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::Watch {
                path: dir.to_path_buf(),
                source: e,
            })?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !is_event_node(name) {
                continue;
            }
            open_gamepad(pads, &dir.join(name))?;
        }

        Ok(Some(watcher))
    }

    /// Non-blocking drain of the notification queue. Creations and
    /// attribute changes trigger a probe, deletions close and unregister
    /// the matching device.
    pub(crate) fn poll(&mut self, pads: &mut Gamepads) -> Result<()> {
        let mut buf = [0u8; 16384];
        loop {
            let n =
                unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
            if n < 0 {
                let err = io::Error::last_os_error();
                if err.raw_os_error() == Some(libc::EAGAIN) {
                    return Ok(());
                }
                return Err(Error::Watch {
                    path: self.dir.clone(),
                    source: err,
                });
            }
            if n == 0 {
                return Ok(());
            }

            for record in parse_notify_records(&buf[..n as usize]) {
                if !is_event_node(&record.name) {
                    continue;
                }
                let path = self.dir.join(&record.name);
                if record.mask & (IN_CREATE | IN_ATTRIB) != 0 {
                    open_gamepad(pads, &path)?;
                } else if record.mask & IN_DELETE != 0 {
                    if let Some(pad) = pads.remove_first(|p| p.path() == path) {
                        log::info!("gamepad removed: {} ({})", pad.name(), path.display());
                        // pad drops here; its handle closes with it
                    }
                }
            }
        }
    }
}

impl Drop for DeviceWatcher {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
