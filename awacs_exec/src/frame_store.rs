//! # Frame Store
//!
//! Frame file enumeration and the in-memory frame cache.
//!
//! Frames live on disk as `<dir>/<NNNNN>.jpg` with a zero-padded 5 digit
//! sequence number. Frame `00000` is a reserved sentinel and can be dropped
//! from iteration on request.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Extension of all frame files.
pub const FRAME_EXT: &str = "jpg";

/// The reserved sentinel frame number.
pub const SENTINEL_FRAME: &str = "00000";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A frame read from disk: the sequence number string plus the decoded
/// image. Immutable once created.
#[derive(Clone)]
pub struct Frame {
    /// Zero-padded sequence number, e.g. `"00012"`.
    pub fnum: String,

    /// The decoded image.
    pub image: DynamicImage,
}

/// A named multi-valued frame memo.
///
/// Multiple frames may be cached under the same name; retrieval returns all
/// frames recorded under that name since the last clear. The cache lives for
/// the process and is cleared explicitly between runs, never on a timer.
#[derive(Default)]
pub struct FrameCache {
    entries: Vec<(String, Frame)>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Frame {
    /// Load the frame with the given number from the directory.
    pub fn load(dir: &Path, fnum: &str) -> image::ImageResult<Self> {
        let image = image::open(fq_join(dir, fnum, FRAME_EXT))?;

        Ok(Self {
            fnum: String::from(fnum),
            image,
        })
    }
}

impl FrameCache {
    /// Record a frame under the given name. Append semantics, earlier frames
    /// under the same name are kept.
    pub fn cache(&mut self, name: &str, frame: Frame) {
        self.entries.push((String::from(name), frame));
    }

    /// All frames cached under the given name since the last clear, in
    /// caching order.
    pub fn cached(&self, name: &str) -> Vec<&Frame> {
        self.entries
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, f)| f)
            .collect()
    }

    /// Empty the cache.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build the fully qualified path of a frame-numbered file.
pub fn fq_join(dir: &Path, base: &str, ext: &str) -> PathBuf {
    let ext = ext.trim_start_matches('.');
    dir.join(format!("{}.{}", base, ext))
}

/// List the frame numbers present in a directory, sorted ascending.
///
/// Only `.jpg` basenames are considered. Since numbers are zero padded the
/// string sort is also the numeric sort. If `exclude_zero` is set and the
/// first frame is the reserved sentinel it is dropped.
pub fn list_frames(dir: &Path, exclude_zero: bool) -> std::io::Result<Vec<String>> {
    let mut frames = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        let ext_matches = path
            .extension()
            .map(|e| e == FRAME_EXT)
            .unwrap_or(false);

        if ext_matches {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                frames.push(String::from(stem));
            }
        }
    }

    frames.sort();

    if exclude_zero && frames.first().map(|f| f == SENTINEL_FRAME).unwrap_or(false) {
        frames.remove(0);
    }

    Ok(frames)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn touch_frames(dir: &Path, fnums: &[&str]) {
        for fnum in fnums {
            std::fs::write(fq_join(dir, fnum, FRAME_EXT), b"").unwrap();
        }
    }

    fn dummy_frame(fnum: &str) -> Frame {
        Frame {
            fnum: String::from(fnum),
            image: DynamicImage::new_rgb8(1, 1),
        }
    }

    #[test]
    fn test_list_frames() {
        let dir = tempfile::tempdir().unwrap();
        touch_frames(dir.path(), &["00002", "00000", "00001"]);
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let all = list_frames(dir.path(), false).unwrap();
        assert_eq!(all, vec!["00000", "00001", "00002"]);

        let nozero = list_frames(dir.path(), true).unwrap();
        assert_eq!(nozero, vec!["00001", "00002"]);
    }

    #[test]
    fn test_list_frames_no_sentinel_present() {
        let dir = tempfile::tempdir().unwrap();
        touch_frames(dir.path(), &["00005", "00003"]);

        // exclude_zero only drops the actual sentinel
        let frames = list_frames(dir.path(), true).unwrap();
        assert_eq!(frames, vec!["00003", "00005"]);
    }

    #[test]
    fn test_list_frames_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_frames(&dir.path().join("nowhere"), false).is_err());
    }

    #[test]
    fn test_fq_join() {
        let p = fq_join(Path::new("/tmp/frames"), "00042", "jpg");
        assert_eq!(p, PathBuf::from("/tmp/frames/00042.jpg"));

        // Leading dot on the extension is tolerated
        let p = fq_join(Path::new("/tmp/frames"), "00042", ".jpg");
        assert_eq!(p, PathBuf::from("/tmp/frames/00042.jpg"));
    }

    #[test]
    fn test_cache_append_semantics() {
        let mut cache = FrameCache::default();

        cache.cache("aerial", dummy_frame("00001"));
        cache.cache("aerial", dummy_frame("00002"));
        cache.cache("training", dummy_frame("00003"));

        let aerial = cache.cached("aerial");
        assert_eq!(aerial.len(), 2);
        assert_eq!(aerial[0].fnum, "00001");
        assert_eq!(aerial[1].fnum, "00002");

        assert_eq!(cache.cached("training").len(), 1);
        assert!(cache.cached("unknown").is_empty());

        cache.clear();
        assert!(cache.cached("aerial").is_empty());
        assert!(cache.cached("training").is_empty());
    }
}
