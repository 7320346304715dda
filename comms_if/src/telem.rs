//! # Telemetry bus
//!
//! Fixed-layout shared memory carrying timestamps and object positions from
//! the awacs process to the other processes. The region is a memory mapped
//! file, not a message queue: no framing, no length prefixes, no per-field
//! locks.
//!
//! ## Layout
//!
//! | offset | contents                                   |
//! |--------|--------------------------------------------|
//! | 0      | generation word (u64)                      |
//! | 8      | timestamp array, `TIME_ARRAY_SIZE` x f64   |
//! | 24     | position array, `POS_ARRAY_SIZE` x i32     |
//!
//! The timestamp and position arrays are the wire contract and must not be
//! reordered. The generation word is bumped before and after every position
//! publish (odd while a write is in flight) so that readers can detect a
//! torn read and retry.
//!
//! ## Writer discipline
//!
//! Exactly one process (awacs) publishes positions and `TIME_PHOTO`. Any
//! process may set `TIME_KILLED`, once, to request a shutdown; the first
//! writer wins. Within a publish the cone slots are written before
//! `NUM_CONES` so a reader never sees a count ahead of its payload.
//!
//! ## Reader discipline
//!
//! Readers take a whole [`TelemetrySnapshot`] per poll. `NUM_CONES` is
//! captured once per read and bounds the cone slots copied out; slots past
//! the count are stale and are never exposed. There is no atomicity between
//! the timestamp array and the position array beyond the generation check —
//! consumers poll far more coarsely than the write interval and treat the
//! bus as eventually consistent.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fs::OpenOptions;
use std::path::Path;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};

use log::warn;
use memmap2::{MmapMut, MmapOptions};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum number of cone slots in the position array.
pub const MAX_CONES: usize = 10;

/// Index of the kill timestamp in the timestamp array.
pub const TIME_KILLED: usize = 0;

/// Index of the photo timestamp in the timestamp array.
pub const TIME_PHOTO: usize = 1;

/// Number of entries in the timestamp array.
pub const TIME_ARRAY_SIZE: usize = 2;

/// Index of the cone count in the position array.
pub const POS_NUM_CONES: usize = 0;

/// Index of the leg count in the position array.
pub const POS_NUM_LEGS: usize = 1;

/// Index of the donut x coordinate in the position array.
pub const POS_DONUT_X: usize = 2;

/// Index of the donut y coordinate in the position array.
pub const POS_DONUT_Y: usize = 3;

/// Index of the first cone coordinate in the position array.
pub const POS_CONE1_X: usize = 4;

/// Number of entries in the position array.
pub const POS_ARRAY_SIZE: usize = 4 + 2 * MAX_CONES;

/// Byte offset of the generation word.
const GEN_OFFSET: usize = 0;

/// Byte offset of the timestamp array.
const TIME_OFFSET: usize = 8;

/// Byte offset of the position array.
const POS_OFFSET: usize = TIME_OFFSET + TIME_ARRAY_SIZE * 8;

/// Total size of the mapped region in bytes.
pub const BUS_SIZE: usize = POS_OFFSET + POS_ARRAY_SIZE * 4;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// One consistent copy of the bus contents.
///
/// Cone slots past the published count are not reachable through this type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TelemetrySnapshot {
    /// Unix time of the photo the positions were detected in, seconds.
    pub time_photo_s: f64,

    /// Number of planned route legs.
    pub num_legs: i32,

    /// Donut (target marker) x coordinate, arena pixels.
    pub donut_x: i32,

    /// Donut (target marker) y coordinate, arena pixels.
    pub donut_y: i32,

    num_cones: usize,
    cone_slots: [[i32; 2]; MAX_CONES],
}

/// Handle on the shared telemetry region.
///
/// Each process creates or opens its own handle on the same backing file.
pub struct TelemetryBus {
    map: MmapMut,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur creating or opening the bus.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryBusError {
    #[error("Could not open the bus file: {0}")]
    FileError(std::io::Error),

    #[error("Could not map the bus file: {0}")]
    MapError(std::io::Error),

    #[error("The bus file is {found} bytes, expected at least {expected}")]
    WrongSize { expected: usize, found: u64 },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TelemetrySnapshot {
    /// Set the cone slots from the given list of (x, y) pairs.
    ///
    /// Counts above [`MAX_CONES`] are clamped with a warning, never an
    /// error.
    pub fn set_cones(&mut self, cones: &[[i32; 2]]) {
        let n = if cones.len() > MAX_CONES {
            warn!(
                "Detected {} cones but the bus carries at most {}, clamping",
                cones.len(),
                MAX_CONES
            );
            MAX_CONES
        } else {
            cones.len()
        };

        self.cone_slots[..n].copy_from_slice(&cones[..n]);
        self.num_cones = n;
    }

    /// The meaningful cone slots, `num_cones` (x, y) pairs.
    pub fn cones(&self) -> &[[i32; 2]] {
        &self.cone_slots[..self.num_cones]
    }

    /// Number of meaningful cone slots, always `<= MAX_CONES`.
    pub fn num_cones(&self) -> usize {
        self.num_cones
    }
}

impl TelemetryBus {
    /// Create the bus file at the given path, zeroed, and map it.
    ///
    /// Only the parent process (gcs) creates the bus; children
    /// [`open`](TelemetryBus::open) it.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, TelemetryBusError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(TelemetryBusError::FileError)?;

        file.set_len(BUS_SIZE as u64)
            .map_err(TelemetryBusError::FileError)?;

        let map = unsafe { MmapOptions::new().map_mut(&file) }
            .map_err(TelemetryBusError::MapError)?;

        Ok(Self { map })
    }

    /// Map an existing bus file.
    ///
    /// The mapping is writable for every process since any process may set
    /// the kill flag; the position-writer discipline is a contract, not an
    /// access mode.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TelemetryBusError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(TelemetryBusError::FileError)?;

        let len = file.metadata().map_err(TelemetryBusError::FileError)?.len();
        if len < BUS_SIZE as u64 {
            return Err(TelemetryBusError::WrongSize {
                expected: BUS_SIZE,
                found: len,
            });
        }

        let map = unsafe { MmapOptions::new().map_mut(&file) }
            .map_err(TelemetryBusError::MapError)?;

        Ok(Self { map })
    }

    /// Publish a snapshot into the position and photo-timestamp fields.
    ///
    /// Only the awacs process may call this.
    pub fn publish(&mut self, snap: &TelemetrySnapshot) {
        // Odd generation marks the write in flight
        self.gen().fetch_add(1, Ordering::AcqRel);

        unsafe {
            self.write_f64(TIME_OFFSET + TIME_PHOTO * 8, snap.time_photo_s);

            // Payload before count: cone slots first
            for (i, cone) in snap.cones().iter().enumerate() {
                self.write_i32(pos_byte(POS_CONE1_X + i * 2), cone[0]);
                self.write_i32(pos_byte(POS_CONE1_X + i * 2 + 1), cone[1]);
            }
            self.write_i32(pos_byte(POS_DONUT_X), snap.donut_x);
            self.write_i32(pos_byte(POS_DONUT_Y), snap.donut_y);
            self.write_i32(pos_byte(POS_NUM_LEGS), snap.num_legs);
            self.write_i32(pos_byte(POS_NUM_CONES), snap.num_cones as i32);
        }

        self.gen().fetch_add(1, Ordering::AcqRel);
    }

    /// Read one consistent snapshot, retrying torn reads.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        loop {
            let gen = self.gen().load(Ordering::Acquire);
            if gen & 1 == 1 {
                // Write in flight
                std::hint::spin_loop();
                continue;
            }

            let snap = unsafe { self.read_raw() };

            if self.gen().load(Ordering::Acquire) == gen {
                return snap;
            }

            std::hint::spin_loop();
        }
    }

    /// Request a shutdown by recording the kill timestamp.
    ///
    /// Returns true if this call was the one that set the flag, false if it
    /// was already set. Zero is the unset sentinel, so a caller passing a
    /// zero timestamp makes no request.
    pub fn request_kill(&self, time_s: f64) -> bool {
        self.killed()
            .compare_exchange(0, time_s.to_bits(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// True once any process has requested a shutdown.
    pub fn kill_requested(&self) -> bool {
        self.killed().load(Ordering::Acquire) != 0
    }

    /// Unix time at which the shutdown was requested, if it has been.
    pub fn killed_at(&self) -> Option<f64> {
        match self.killed().load(Ordering::Acquire) {
            0 => None,
            bits => Some(f64::from_bits(bits)),
        }
    }

    /// Flush the mapping back to the file.
    pub fn flush(&self) -> std::io::Result<()> {
        self.map.flush()
    }

    // ---- field access ----

    fn gen(&self) -> &AtomicU64 {
        // The mapping is page aligned so offset 0 is u64 aligned
        unsafe { &*(self.map.as_ptr().add(GEN_OFFSET) as *const AtomicU64) }
    }

    fn killed(&self) -> &AtomicU64 {
        // The kill timestamp is shared as its f64 bit pattern so that
        // setting it is a single atomic operation
        unsafe { &*(self.map.as_ptr().add(TIME_OFFSET + TIME_KILLED * 8) as *const AtomicU64) }
    }

    unsafe fn read_raw(&self) -> TelemetrySnapshot {
        let mut snap = TelemetrySnapshot {
            time_photo_s: self.read_f64(TIME_OFFSET + TIME_PHOTO * 8),
            num_legs: self.read_i32(pos_byte(POS_NUM_LEGS)),
            donut_x: self.read_i32(pos_byte(POS_DONUT_X)),
            donut_y: self.read_i32(pos_byte(POS_DONUT_Y)),
            ..Default::default()
        };

        // Capture the count once and use it for the whole read
        let num_cones = self.read_i32(pos_byte(POS_NUM_CONES));
        let num_cones = num_cones.max(0) as usize;
        let num_cones = num_cones.min(MAX_CONES);

        for i in 0..num_cones {
            snap.cone_slots[i] = [
                self.read_i32(pos_byte(POS_CONE1_X + i * 2)),
                self.read_i32(pos_byte(POS_CONE1_X + i * 2 + 1)),
            ];
        }
        snap.num_cones = num_cones;

        snap
    }

    unsafe fn read_f64(&self, offset: usize) -> f64 {
        ptr::read_volatile(self.map.as_ptr().add(offset) as *const f64)
    }

    unsafe fn read_i32(&self, offset: usize) -> i32 {
        ptr::read_volatile(self.map.as_ptr().add(offset) as *const i32)
    }

    unsafe fn write_f64(&mut self, offset: usize, value: f64) {
        ptr::write_volatile(self.map.as_mut_ptr().add(offset) as *mut f64, value)
    }

    unsafe fn write_i32(&mut self, offset: usize, value: i32) {
        ptr::write_volatile(self.map.as_mut_ptr().add(offset) as *mut i32, value)
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Byte offset of an index into the position array.
const fn pos_byte(index: usize) -> usize {
    POS_OFFSET + index * 4
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn bus_pair() -> (tempfile::TempDir, TelemetryBus, TelemetryBus) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telem.bus");
        let writer = TelemetryBus::create(&path).unwrap();
        let reader = TelemetryBus::open(&path).unwrap();
        (dir, writer, reader)
    }

    #[test]
    fn test_publish_snapshot_roundtrip() {
        let (_dir, mut writer, reader) = bus_pair();

        let mut snap = TelemetrySnapshot {
            time_photo_s: 1234.5,
            num_legs: 3,
            donut_x: 300,
            donut_y: 310,
            ..Default::default()
        };
        snap.set_cones(&[[10, 20], [30, 40], [50, 60]]);

        writer.publish(&snap);

        let got = reader.snapshot();
        assert_eq!(got, snap);
        assert_eq!(got.num_cones(), 3);
        assert_eq!(got.cones(), &[[10, 20], [30, 40], [50, 60]]);
    }

    #[test]
    fn test_shrinking_cone_count_hides_stale_slots() {
        let (_dir, mut writer, reader) = bus_pair();

        let mut snap = TelemetrySnapshot::default();
        snap.set_cones(&[[1, 1], [2, 2], [3, 3], [4, 4], [5, 5]]);
        writer.publish(&snap);

        // A smaller follow-up publish must hide the now-stale tail
        snap.set_cones(&[[7, 7]]);
        writer.publish(&snap);

        let got = reader.snapshot();
        assert_eq!(got.cones(), &[[7, 7]]);
    }

    #[test]
    fn test_cone_count_clamped() {
        let mut snap = TelemetrySnapshot::default();
        let too_many: Vec<[i32; 2]> = (0..12).map(|i| [i, i]).collect();
        snap.set_cones(&too_many);

        assert_eq!(snap.num_cones(), MAX_CONES);
        assert_eq!(snap.cones().len(), MAX_CONES);
    }

    #[test]
    fn test_kill_flag_set_once_and_observed() {
        let (_dir, writer, reader) = bus_pair();

        assert!(!reader.kill_requested());
        assert_eq!(reader.killed_at(), None);

        // First request wins, the second is a no-op
        assert!(writer.request_kill(42.25));
        assert!(!reader.request_kill(99.0));

        assert!(reader.kill_requested());
        assert_eq!(reader.killed_at(), Some(42.25));
    }

    #[test]
    fn test_poll_loop_observes_kill_within_interval() {
        use std::time::{Duration, Instant};

        let (_dir, writer, reader) = bus_pair();
        let poll_interval = Duration::from_millis(10);

        // A child-style poll loop: check the flag, sleep, repeat
        let handle = std::thread::spawn(move || loop {
            if reader.kill_requested() {
                return Instant::now();
            }
            std::thread::sleep(poll_interval);
        });

        std::thread::sleep(Duration::from_millis(50));
        writer.request_kill(1.0);
        let killed_at = Instant::now();

        let observed_at = handle.join().unwrap();

        // Observed within one poll interval, with generous scheduling slack
        assert!(observed_at.duration_since(killed_at) < poll_interval + Duration::from_millis(100));
    }

    #[test]
    fn test_wire_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telem.bus");
        let mut writer = TelemetryBus::create(&path).unwrap();

        let mut snap = TelemetrySnapshot {
            time_photo_s: 2.0,
            num_legs: 2,
            donut_x: -7,
            donut_y: 9,
            ..Default::default()
        };
        snap.set_cones(&[[11, 12], [13, 14]]);
        writer.publish(&snap);
        writer.flush().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), BUS_SIZE);

        let f64_at = |off: usize| {
            let mut b = [0u8; 8];
            b.copy_from_slice(&bytes[off..off + 8]);
            f64::from_ne_bytes(b)
        };
        let i32_at = |off: usize| {
            let mut b = [0u8; 4];
            b.copy_from_slice(&bytes[off..off + 4]);
            i32::from_ne_bytes(b)
        };

        // Timestamp array: TIME_KILLED then TIME_PHOTO
        assert_eq!(f64_at(8), 0.0);
        assert_eq!(f64_at(16), 2.0);

        // Position array: NUM_CONES, NUM_LEGS, DONUT_X, DONUT_Y, cone pairs
        assert_eq!(i32_at(24), 2);
        assert_eq!(i32_at(28), 2);
        assert_eq!(i32_at(32), -7);
        assert_eq!(i32_at(36), 9);
        assert_eq!(i32_at(40), 11);
        assert_eq!(i32_at(44), 12);
        assert_eq!(i32_at(48), 13);
        assert_eq!(i32_at(52), 14);
    }

    #[test]
    fn test_open_rejects_short_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telem.bus");
        std::fs::write(&path, &[0u8; 16]).unwrap();

        match TelemetryBus::open(&path) {
            Err(TelemetryBusError::WrongSize { expected, found }) => {
                assert_eq!(expected, BUS_SIZE);
                assert_eq!(found, 16);
            }
            _ => panic!("expected WrongSize"),
        }
    }
}
