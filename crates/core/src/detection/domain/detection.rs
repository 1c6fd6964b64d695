/// A single tracked object reported by the detector for one frame.
///
/// Classification is an explicit capability: detections from models without
/// class metadata carry no label and never match any classification query.
/// Callers get a definite boolean, never an error.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    label: Option<String>,
    confidence: f64,
    bbox: [f64; 4],
    track_id: u32,
}

impl Detection {
    pub fn new(
        label: impl Into<String>,
        confidence: f64,
        bbox: [f64; 4],
        track_id: u32,
    ) -> Self {
        Self {
            label: Some(label.into()),
            confidence,
            bbox,
            track_id,
        }
    }

    /// A detection without class metadata (model exposed no class output).
    pub fn unclassified(confidence: f64, bbox: [f64; 4], track_id: u32) -> Self {
        Self {
            label: None,
            confidence,
            bbox,
            track_id,
        }
    }

    /// Display label; `"unknown"` when the detection carries no class.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("unknown")
    }

    /// Whether this detection can answer classification queries at all.
    pub fn supports_classification(&self) -> bool {
        self.label.is_some()
    }

    /// Definite classification check: true only when the detector attached
    /// a class label equal to `query` (ASCII case-insensitive).
    pub fn matches_label(&self, query: &str) -> bool {
        self.label
            .as_deref()
            .is_some_and(|l| l.eq_ignore_ascii_case(query))
    }

    pub fn is_person(&self) -> bool {
        self.matches_label("person")
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn bbox(&self) -> [f64; 4] {
        self.bbox
    }

    pub fn track_id(&self) -> u32 {
        self.track_id
    }
}
