/// ----- SHARED MEMORY MODULE -----
/// The per-car record shared between the car driver, the safety system
/// and the internal controls. One POSIX shared-memory object per car,
/// named `/car<name>`, holding a process-shared mutex and condition
/// variable followed by the car state. Every read or write of the state
/// happens with the mutex held; every mutation is followed by a
/// broadcast so that waiters in other processes re-examine the record.

use std::ffi::CString;
use std::io;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use log::warn;

use super::floor::Floor;
use super::status::DoorStatus;

pub const FLOOR_STR_SIZE: usize = 4;
pub const STATUS_STR_SIZE: usize = 8;

/// Fixed layout of the shared region. The synchronization pair sits at
/// the front; the text fields are NUL-terminated C strings.
#[repr(C)]
pub struct CarSharedMem {
    mutex: libc::pthread_mutex_t,
    cond: libc::pthread_cond_t,
    pub current_floor: [u8; FLOOR_STR_SIZE],
    pub destination_floor: [u8; FLOOR_STR_SIZE],
    pub status: [u8; STATUS_STR_SIZE],
    pub open_button: u8,
    pub close_button: u8,
    pub door_obstruction: u8,
    pub overload: u8,
    pub emergency_stop: u8,
    pub individual_service_mode: u8,
    pub emergency_mode: u8,
}

/// Consistent view of the fields a car reports upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSnapshot {
    pub status: DoorStatus,
    pub current_floor: Floor,
    pub destination_floor: Floor,
}

impl CarSharedMem {
    pub fn try_status(&self) -> Option<DoorStatus> {
        DoorStatus::parse(read_c_str(&self.status)?)
    }

    pub fn set_status(&mut self, status: DoorStatus) {
        write_c_str(&mut self.status, status.as_str());
    }

    pub fn try_current_floor(&self) -> Option<Floor> {
        Floor::parse(read_c_str(&self.current_floor)?)
    }

    pub fn set_current_floor(&mut self, floor: Floor) {
        write_c_str(&mut self.current_floor, &floor.as_string());
    }

    pub fn try_destination_floor(&self) -> Option<Floor> {
        Floor::parse(read_c_str(&self.destination_floor)?)
    }

    pub fn set_destination_floor(&mut self, floor: Floor) {
        write_c_str(&mut self.destination_floor, &floor.as_string());
    }

    pub fn in_special_mode(&self) -> bool {
        self.individual_service_mode == 1 || self.emergency_mode == 1
    }

    /// `None` while any reportable field holds a value outside its
    /// domain (the safety system treats that as a consistency error).
    pub fn try_snapshot(&self) -> Option<StateSnapshot> {
        Some(StateSnapshot {
            status: self.try_status()?,
            current_floor: self.try_current_floor()?,
            destination_floor: self.try_destination_floor()?,
        })
    }
}

fn read_c_str(bytes: &[u8]) -> Option<&str> {
    let end = bytes.iter().position(|&b| b == 0)?;
    std::str::from_utf8(&bytes[..end]).ok()
}

fn write_c_str(dst: &mut [u8], value: &str) {
    let bytes = value.as_bytes();
    debug_assert!(bytes.len() < dst.len());
    dst.fill(0);
    dst[..bytes.len()].copy_from_slice(bytes);
}

pub fn object_name(car_name: &str) -> String {
    format!("/car{}", car_name)
}

/// A mapping of one car's shared record. Dropping the handle unmaps the
/// region; the object itself lives until the creating car unlinks it.
pub struct SharedMemory {
    ptr: *mut CarSharedMem,
    name: CString,
}

// Access to the record goes through the process-shared mutex.
unsafe impl Send for SharedMemory {}
unsafe impl Sync for SharedMemory {}

impl SharedMemory {
    /// Create and initialise the object for `car_name`. Fails if a
    /// record for that car already exists.
    pub fn create(car_name: &str) -> io::Result<Self> {
        let name = object_cstring(car_name)?;
        let fd = unsafe {
            libc::shm_open(
                name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL | libc::O_RDWR,
                0o666,
            )
        };
        if fd == -1 {
            return Err(io::Error::last_os_error());
        }
        let size = mem::size_of::<CarSharedMem>();
        if unsafe { libc::ftruncate(fd, size as libc::off_t) } == -1 {
            let err = io::Error::last_os_error();
            unsafe {
                libc::close(fd);
                libc::shm_unlink(name.as_ptr());
            }
            return Err(err);
        }
        let ptr = map_region(fd, size);
        unsafe { libc::close(fd) };
        let ptr = match ptr {
            Ok(ptr) => ptr,
            Err(err) => {
                unsafe { libc::shm_unlink(name.as_ptr()) };
                return Err(err);
            }
        };
        unsafe { std::ptr::write_bytes(ptr as *mut u8, 0, size) };
        let shared = SharedMemory { ptr, name };
        if let Err(err) = shared.init_sync_pair() {
            shared.unlink();
            return Err(err);
        }
        Ok(shared)
    }

    /// Attach to an existing record created by a running car.
    pub fn open(car_name: &str) -> io::Result<Self> {
        let name = object_cstring(car_name)?;
        let fd = unsafe { libc::shm_open(name.as_ptr(), libc::O_RDWR, 0) };
        if fd == -1 {
            return Err(io::Error::last_os_error());
        }
        let ptr = map_region(fd, mem::size_of::<CarSharedMem>());
        unsafe { libc::close(fd) };
        Ok(SharedMemory { ptr: ptr?, name })
    }

    pub fn lock(&self) -> io::Result<MemGuard<'_>> {
        let rc = unsafe { libc::pthread_mutex_lock(&mut (*self.ptr).mutex) };
        if rc != 0 {
            return Err(io::Error::from_raw_os_error(rc));
        }
        Ok(MemGuard { shared: self })
    }

    /// Remove the object name. Only the creating car calls this; other
    /// mappings stay valid until they are dropped.
    pub fn unlink(&self) {
        if unsafe { libc::shm_unlink(self.name.as_ptr()) } == -1 {
            warn!(
                "could not unlink {}: {}",
                self.name.to_string_lossy(),
                io::Error::last_os_error()
            );
        }
    }

    fn init_sync_pair(&self) -> io::Result<()> {
        unsafe {
            let mut mutex_attr: libc::pthread_mutexattr_t = mem::zeroed();
            check(libc::pthread_mutexattr_init(&mut mutex_attr))?;
            check(libc::pthread_mutexattr_setpshared(
                &mut mutex_attr,
                libc::PTHREAD_PROCESS_SHARED,
            ))?;
            let rc = libc::pthread_mutex_init(&mut (*self.ptr).mutex, &mutex_attr);
            libc::pthread_mutexattr_destroy(&mut mutex_attr);
            check(rc)?;

            let mut cond_attr: libc::pthread_condattr_t = mem::zeroed();
            check(libc::pthread_condattr_init(&mut cond_attr))?;
            check(libc::pthread_condattr_setpshared(
                &mut cond_attr,
                libc::PTHREAD_PROCESS_SHARED,
            ))?;
            let rc = libc::pthread_cond_init(&mut (*self.ptr).cond, &cond_attr);
            libc::pthread_condattr_destroy(&mut cond_attr);
            check(rc)
        }
    }
}

impl Drop for SharedMemory {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr as *mut libc::c_void, mem::size_of::<CarSharedMem>());
        }
    }
}

/// Holds the record mutex for the lifetime of the guard.
pub struct MemGuard<'a> {
    shared: &'a SharedMemory,
}

impl MemGuard<'_> {
    /// Wake every waiter in every attached process.
    pub fn broadcast(&self) {
        unsafe {
            libc::pthread_cond_broadcast(&mut (*self.shared.ptr).cond);
        }
    }

    /// Wait for a broadcast, giving up after `timeout` so callers can
    /// recheck their shutdown flag. Spurious wakes are expected; the
    /// caller re-examines the record either way.
    pub fn timed_wait(&mut self, timeout: Duration) {
        let mut deadline = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        unsafe {
            libc::clock_gettime(libc::CLOCK_REALTIME, &mut deadline);
        }
        deadline.tv_sec += timeout.as_secs() as libc::time_t;
        deadline.tv_nsec += timeout.subsec_nanos() as libc::c_long;
        if deadline.tv_nsec >= 1_000_000_000 {
            deadline.tv_sec += 1;
            deadline.tv_nsec -= 1_000_000_000;
        }
        unsafe {
            libc::pthread_cond_timedwait(
                &mut (*self.shared.ptr).cond,
                &mut (*self.shared.ptr).mutex,
                &deadline,
            );
        }
    }
}

impl Deref for MemGuard<'_> {
    type Target = CarSharedMem;

    fn deref(&self) -> &CarSharedMem {
        unsafe { &*self.shared.ptr }
    }
}

impl DerefMut for MemGuard<'_> {
    fn deref_mut(&mut self) -> &mut CarSharedMem {
        unsafe { &mut *self.shared.ptr }
    }
}

impl Drop for MemGuard<'_> {
    fn drop(&mut self) {
        unsafe {
            libc::pthread_mutex_unlock(&mut (*self.shared.ptr).mutex);
        }
    }
}

fn object_cstring(car_name: &str) -> io::Result<CString> {
    CString::new(object_name(car_name))
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "car name contains NUL"))
}

fn map_region(fd: libc::c_int, size: usize) -> io::Result<*mut CarSharedMem> {
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            fd,
            0,
        )
    };
    if ptr == libc::MAP_FAILED {
        return Err(io::Error::last_os_error());
    }
    Ok(ptr as *mut CarSharedMem)
}

fn check(rc: libc::c_int) -> io::Result<()> {
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::from_raw_os_error(rc))
    }
}
