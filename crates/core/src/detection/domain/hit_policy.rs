use std::collections::HashSet;

use crate::detection::domain::detection::Detection;

/// Decides whether a frame's detections count as a hit.
///
/// A hit needs one detection at or above the confidence threshold. With no
/// class allowlist every class counts; the allowlist is opt-in only.
#[derive(Clone, Debug)]
pub struct HitPolicy {
    threshold: f32,
    classes: Option<HashSet<u32>>,
}

impl HitPolicy {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            classes: None,
        }
    }

    pub fn with_classes(mut self, classes: impl IntoIterator<Item = u32>) -> Self {
        self.classes = Some(classes.into_iter().collect());
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn is_hit(&self, detections: &[Detection]) -> bool {
        detections.iter().any(|d| self.counts(d))
    }

    /// Number of detections that satisfy the policy.
    pub fn count_matches(&self, detections: &[Detection]) -> usize {
        detections.iter().filter(|d| self.counts(d)).count()
    }

    fn counts(&self, detection: &Detection) -> bool {
        detection.confidence >= self.threshold
            && self
                .classes
                .as_ref()
                .map_or(true, |allowed| allowed.contains(&detection.class_id))
    }
}
