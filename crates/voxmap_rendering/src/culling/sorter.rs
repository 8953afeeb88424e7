//! Per-frame chunk visibility and draw order.
//!
//! Visibility and face flags are cheap and recomputed every frame. The
//! distance sort only runs once the camera has moved far enough, and on
//! large maps it is spread over several frames: the previous order stays in
//! use until the new one is complete.

use std::cmp::Ordering;

use tracing::trace;

use super::frustum::FrustumCuller;
use crate::chunk::{ChunkStore, FaceMask};

/// Computes which chunks are drawn and in which order.
#[derive(Debug, Clone)]
pub struct ChunkSorter {
    opaque: Vec<usize>,
    translucent: Vec<usize>,
    scratch: Vec<(f32, usize)>,
    sorted_eye: Option<[f32; 3]>,
    sorting_eye: Option<[f32; 3]>,
    resort_distance: f32,
    chunks_per_frame: usize,
}

impl ChunkSorter {
    /// Creates a sorter.
    ///
    /// `resort_distance` is how far the camera moves before a new sort
    /// starts; `chunks_per_frame` caps the distances computed per frame.
    #[must_use]
    pub fn new(resort_distance: f32, chunks_per_frame: usize) -> Self {
        Self {
            opaque: Vec::new(),
            translucent: Vec::new(),
            scratch: Vec::new(),
            sorted_eye: None,
            sorting_eye: None,
            resort_distance,
            chunks_per_frame: chunks_per_frame.max(1),
        }
    }

    /// Chunk indices nearest first.
    #[inline]
    #[must_use]
    pub fn opaque_order(&self) -> &[usize] {
        &self.opaque
    }

    /// Chunk indices farthest first.
    #[inline]
    #[must_use]
    pub fn translucent_order(&self) -> &[usize] {
        &self.translucent
    }

    /// Returns true while a sort is spread over frames.
    #[inline]
    #[must_use]
    pub const fn is_sorting(&self) -> bool {
        self.sorting_eye.is_some()
    }

    /// Forgets the current order; the next update sorts from scratch.
    pub fn reset(&mut self) {
        self.opaque.clear();
        self.translucent.clear();
        self.scratch.clear();
        self.sorted_eye = None;
        self.sorting_eye = None;
    }

    /// Sets frustum visibility and drawable face directions of every chunk.
    /// Returns the number of visible chunks.
    pub fn update_visibility(store: &mut ChunkStore, eye: [f32; 3], culler: &FrustumCuller) -> usize {
        let mut visible = 0;
        for chunk in store.iter_mut() {
            chunk.visible = culler.test_aabb(&chunk.bounds);
            chunk.draw = FaceMask::facing(eye, &chunk.bounds);
            visible += usize::from(chunk.visible);
        }
        visible
    }

    /// Advances the distance sort. Returns true when a new order was
    /// published this call.
    ///
    /// Without a usable order (new map, or a store of another size) the
    /// whole sort runs at once so every chunk is always drawn.
    pub fn update_order(&mut self, store: &ChunkStore, eye: [f32; 3]) -> bool {
        let stale = self.opaque.len() != store.len();
        if stale {
            self.sorting_eye = None;
        }

        let moved = self
            .sorted_eye
            .map_or(true, |last| distance_squared(last, eye) >= self.resort_distance * self.resort_distance);
        if self.sorting_eye.is_none() {
            if !stale && !moved {
                return false;
            }
            self.sorting_eye = Some(eye);
            self.scratch.clear();
        }
        let Some(sort_eye) = self.sorting_eye else {
            return false;
        };

        let budget = if stale { store.len() } else { self.chunks_per_frame };
        let start = self.scratch.len();
        let end = (start + budget).min(store.len());
        for index in start..end {
            if let Some(chunk) = store.get(index) {
                self.scratch.push((distance_squared(sort_eye, chunk.centre), index));
            }
        }
        if end < store.len() {
            return false;
        }

        self.publish();
        self.sorted_eye = Some(sort_eye);
        self.sorting_eye = None;
        trace!(chunks = self.opaque.len(), eye = ?sort_eye, "Chunk order updated");
        true
    }

    fn publish(&mut self) {
        self.scratch.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        self.opaque.clear();
        self.opaque.extend(self.scratch.iter().map(|&(_, index)| index));

        self.scratch.sort_unstable_by(|a, b| match b.0.total_cmp(&a.0) {
            Ordering::Equal => a.1.cmp(&b.1),
            other => other,
        });
        self.translucent.clear();
        self.translucent.extend(self.scratch.iter().map(|&(_, index)| index));
        self.scratch.clear();
    }
}

impl Default for ChunkSorter {
    fn default() -> Self {
        Self::new(1.0, 16_384)
    }
}

#[inline]
fn distance_squared(a: [f32; 3], b: [f32; 3]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}
