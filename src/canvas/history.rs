//! Bounded undo/redo history of full-canvas snapshots
//!
//! Snapshots are LZ4-compressed copies of the raw RGB buffer. A restore always
//! decompresses into a fresh buffer, so the live canvas never aliases stored
//! history.
//!
//! The state the history was last reset to (new canvas / loaded image) is
//! kept as `baseline`; it is the floor that undo returns to and is never
//! itself popped.

use image::RgbImage;
use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct Snapshot {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Snapshot {
    pub fn capture(image: &RgbImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            data: compress_prepend_size(image.as_raw()),
        }
    }

    /// Decompress into a new buffer
    pub fn restore(&self) -> Option<RgbImage> {
        let raw = match decompress_size_prepended(&self.data) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Failed to decompress history snapshot: {}", e);
                return None;
            }
        };
        RgbImage::from_raw(self.width, self.height, raw)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn compressed_len(&self) -> usize {
        self.data.len()
    }
}

#[derive(Debug)]
pub struct History {
    baseline: Snapshot,
    undo: VecDeque<Snapshot>,
    redo: Vec<Snapshot>,
    capacity: usize,
}

impl History {
    pub fn new(initial: &RgbImage, capacity: usize) -> Self {
        Self {
            baseline: Snapshot::capture(initial),
            undo: VecDeque::with_capacity(capacity.min(128)),
            redo: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Drop all entries and start over from `image`
    pub fn reset(&mut self, image: &RgbImage) {
        self.baseline = Snapshot::capture(image);
        self.undo.clear();
        self.redo.clear();
    }

    /// Record a committed state. Clears redo; evicts the oldest entry past capacity.
    pub fn commit(&mut self, image: &RgbImage) {
        self.undo.push_back(Snapshot::capture(image));
        self.redo.clear();
        if self.undo.len() > self.capacity {
            if let Some(oldest) = self.undo.pop_front() {
                self.baseline = oldest;
            }
        }
        tracing::debug!(
            "History commit: {} undo entries, {} bytes",
            self.undo.len(),
            self.total_size()
        );
    }

    /// Step back and return the restored buffer. The stacks only move once
    /// the target snapshot has decompressed.
    pub fn undo(&mut self) -> Option<RgbImage> {
        let depth = self.undo.len();
        if depth == 0 {
            return None;
        }
        let target = match depth {
            1 => &self.baseline,
            _ => &self.undo[depth - 2],
        };
        let image = target.restore()?;
        if let Some(top) = self.undo.pop_back() {
            self.redo.push(top);
        }
        Some(image)
    }

    /// Step forward and return the restored buffer
    pub fn redo(&mut self) -> Option<RgbImage> {
        let image = self.redo.last()?.restore()?;
        if let Some(next) = self.redo.pop() {
            self.undo.push_back(next);
        }
        Some(image)
    }

    pub fn current(&self) -> &Snapshot {
        self.undo.back().unwrap_or(&self.baseline)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total compressed size of all stored snapshots
    pub fn total_size(&self) -> usize {
        self.baseline.compressed_len()
            + self.undo.iter().map(Snapshot::compressed_len).sum::<usize>()
            + self.redo.iter().map(Snapshot::compressed_len).sum::<usize>()
    }
}
