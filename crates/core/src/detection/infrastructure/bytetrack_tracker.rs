/// Simplified ByteTrack multi-object tracker.
///
/// Two-stage association strategy: high-confidence observations are matched
/// first, then low-confidence observations fill remaining unmatched tracks.
/// This prevents spurious tracks from weak detections while allowing
/// existing tracks to survive momentary confidence drops.
///
/// Track *removal* is reported explicitly: presence logic needs a definite
/// "this object has left the scene" signal, debounced by the `max_lost`
/// horizon rather than by a single missed frame.
use std::collections::HashSet;

use super::math::bbox_iou;

/// A raw box observation fed to the tracker (post-NMS).
#[derive(Clone, Debug)]
pub struct BoxObservation {
    pub bbox: [f64; 4],
    pub score: f64,
}

/// A track visible in the current frame.
#[derive(Clone, Debug)]
pub struct TrackedBox {
    pub id: u32,
    pub bbox: [f64; 4],
    /// Index into this frame's observation slice, when matched.
    pub det_index: Option<usize>,
}

/// Result of one tracker step.
#[derive(Clone, Debug, Default)]
pub struct TrackerUpdate {
    /// Tracks matched in this frame. Lost-but-retained tracks are omitted:
    /// their last box is stale and must not be reported as visible.
    pub active: Vec<TrackedBox>,
    /// Ids of tracks that exceeded the lost horizon this frame.
    pub removed: Vec<u32>,
}

const HIGH_THRESH: f64 = 0.5;
const MATCH_THRESH: f64 = 0.3;

#[derive(Clone, Debug)]
struct TrackState {
    id: u32,
    bbox: [f64; 4],
    frames_lost: usize,
    matched: bool,
    det_index: Option<usize>,
}

pub struct ByteTracker {
    tracks: Vec<TrackState>,
    next_id: u32,
    max_lost: usize,
}

impl ByteTracker {
    pub fn new(max_lost: usize) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            max_lost,
        }
    }

    pub fn update(&mut self, observations: &[BoxObservation]) -> TrackerUpdate {
        let (high, low) = split_by_confidence(observations);

        self.reset_match_flags();
        let num_existing = self.tracks.len();
        let matched_high = self.match_high_confidence(&high, observations);
        self.match_low_confidence(&low, observations);
        self.create_new_tracks(&high, &matched_high);
        let removed = self.age_unmatched_tracks(num_existing);

        TrackerUpdate {
            active: self.active_tracks(),
            removed,
        }
    }

    fn reset_match_flags(&mut self) {
        for track in &mut self.tracks {
            track.matched = false;
            track.det_index = None;
        }
    }

    fn match_high_confidence(
        &mut self,
        high: &[(usize, &BoxObservation)],
        observations: &[BoxObservation],
    ) -> HashSet<usize> {
        let track_refs: Vec<(usize, [f64; 4])> = self
            .tracks
            .iter()
            .enumerate()
            .map(|(i, t)| (i, t.bbox))
            .collect();

        let mut matched_obs = HashSet::new();
        for (ti, oi) in greedy_match(&track_refs, high, MATCH_THRESH) {
            self.apply_match(ti, oi, &observations[oi].bbox);
            matched_obs.insert(oi);
        }
        matched_obs
    }

    fn match_low_confidence(
        &mut self,
        low: &[(usize, &BoxObservation)],
        observations: &[BoxObservation],
    ) {
        let unmatched_refs: Vec<(usize, [f64; 4])> = self
            .tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.matched)
            .map(|(i, t)| (i, t.bbox))
            .collect();

        for (ti, oi) in greedy_match(&unmatched_refs, low, MATCH_THRESH) {
            self.apply_match(ti, oi, &observations[oi].bbox);
        }
    }

    fn apply_match(&mut self, track_idx: usize, obs_idx: usize, bbox: &[f64; 4]) {
        let track = &mut self.tracks[track_idx];
        track.bbox = *bbox;
        track.frames_lost = 0;
        track.matched = true;
        track.det_index = Some(obs_idx);
    }

    /// Only unmatched high-confidence observations start new tracks.
    fn create_new_tracks(&mut self, high: &[(usize, &BoxObservation)], matched: &HashSet<usize>) {
        for (oi, obs) in high {
            if !matched.contains(oi) {
                self.tracks.push(TrackState {
                    id: self.next_id,
                    bbox: obs.bbox,
                    frames_lost: 0,
                    matched: true,
                    det_index: Some(*oi),
                });
                self.next_id += 1;
            }
        }
    }

    /// Ages unmatched tracks and returns ids dropped past the lost horizon.
    fn age_unmatched_tracks(&mut self, num_existing: usize) -> Vec<u32> {
        for track in self.tracks.iter_mut().take(num_existing) {
            if !track.matched {
                track.frames_lost += 1;
            }
        }
        let max_lost = self.max_lost;
        let mut removed = Vec::new();
        self.tracks.retain(|t| {
            if t.frames_lost > max_lost {
                removed.push(t.id);
                false
            } else {
                true
            }
        });
        removed
    }

    fn active_tracks(&self) -> Vec<TrackedBox> {
        self.tracks
            .iter()
            .filter(|t| t.matched)
            .map(|t| TrackedBox {
                id: t.id,
                bbox: t.bbox,
                det_index: t.det_index,
            })
            .collect()
    }
}

type IndexedObs<'a> = Vec<(usize, &'a BoxObservation)>;

fn split_by_confidence(observations: &[BoxObservation]) -> (IndexedObs<'_>, IndexedObs<'_>) {
    let mut high = Vec::new();
    let mut low = Vec::new();
    for (i, obs) in observations.iter().enumerate() {
        if obs.score >= HIGH_THRESH {
            high.push((i, obs));
        } else {
            low.push((i, obs));
        }
    }
    (high, low)
}

/// Greedy IoU matching: pairs sorted by descending IoU, each track and
/// observation used at most once.
fn greedy_match(
    tracks: &[(usize, [f64; 4])],
    observations: &[(usize, &BoxObservation)],
    thresh: f64,
) -> Vec<(usize, usize)> {
    let mut pairs: Vec<(usize, usize, f64)> = Vec::new();
    for (ti, bbox) in tracks {
        for (oi, obs) in observations {
            let score = bbox_iou(bbox, &obs.bbox);
            if score >= thresh {
                pairs.push((*ti, *oi, score));
            }
        }
    }
    pairs.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut used_tracks = HashSet::new();
    let mut used_obs = HashSet::new();
    let mut matches = Vec::new();

    for (ti, oi, _) in &pairs {
        if !used_tracks.contains(ti) && !used_obs.contains(oi) {
            used_tracks.insert(*ti);
            used_obs.insert(*oi);
            matches.push((*ti, *oi));
        }
    }
    matches
}
