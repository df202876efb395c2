use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};
use crate::plate_text;

/// Vehicle box as produced by the detector for a single frame.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: BBox<Ltrb>,
    #[serde(rename = "p")]
    pub confidence: f32,
    #[serde(rename = "c")]
    pub class: i32,
}

impl Detection {
    #[inline]
    pub fn new(bbox: BBox<Ltrb>, confidence: f32, class: i32) -> Self {
        Self {
            bbox,
            confidence,
            class,
        }
    }

    /// `(x1, y1, x2, y2, score, class_id)` as the detector reports it.
    #[inline]
    pub fn ltrb(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, class: i32) -> Self {
        Self::new(BBox::ltrb(x1, y1, x2, y2), confidence, class)
    }

    /// Finite, non-inverted, non-empty box with a finite score.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.bbox.is_valid() && self.confidence.is_finite()
    }

    #[inline]
    pub fn iou(&self, other: &Detection) -> f32 {
        self.bbox.iou(&other.bbox)
    }
}

/// A plate box together with what OCR made of its crop.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(from = "RawPlateReading")]
pub struct PlateReading {
    pub detection: Detection,
    /// Normalized plate text, `None` when OCR returned nothing usable
    text: Option<String>,
    pub ocr_score: f32,
}

// wire form, text as OCR returned it
#[derive(Deserialize)]
struct RawPlateReading {
    detection: Detection,
    text: Option<String>,
    ocr_score: f32,
}

impl From<RawPlateReading> for PlateReading {
    fn from(raw: RawPlateReading) -> Self {
        PlateReading::new(raw.detection, raw.text.as_deref(), raw.ocr_score)
    }
}

impl PlateReading {
    /// Raw OCR text is normalized here, readings shorter than three
    /// characters are treated as missing.
    pub fn new(detection: Detection, raw_text: Option<&str>, ocr_score: f32) -> Self {
        let text = raw_text
            .map(plate_text::normalize)
            .filter(|t| t.chars().count() >= plate_text::MIN_TEXT_LEN);

        Self {
            detection,
            text,
            ocr_score,
        }
    }

    #[inline]
    pub fn bbox(&self) -> &BBox<Ltrb> {
        &self.detection.bbox
    }

    #[inline]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_boxes() {
        assert!(Detection::ltrb(10.0, 10.0, 50.0, 50.0, 0.9, 2).is_valid());
        assert!(!Detection::ltrb(50.0, 10.0, 10.0, 50.0, 0.9, 2).is_valid());
        assert!(!Detection::ltrb(10.0, 10.0, 10.0, 50.0, 0.9, 2).is_valid());
        assert!(!Detection::ltrb(f32::INFINITY, 10.0, 50.0, 50.0, 0.9, 2).is_valid());
        assert!(!Detection::ltrb(10.0, 10.0, 50.0, 50.0, f32::NAN, 2).is_valid());
    }

    #[test]
    fn plate_reading_normalizes_text() {
        let det = Detection::ltrb(20.0, 40.0, 60.0, 55.0, 0.7, 0);

        let reading = PlateReading::new(det, Some("a 123-bc 77"), 0.92);
        assert_eq!(reading.text(), Some("A123BC77"));

        let short = PlateReading::new(det, Some("-a1"), 0.92);
        assert_eq!(short.text(), None);

        let missing = PlateReading::new(det, None, 0.0);
        assert_eq!(missing.text(), None);
    }

    #[test]
    fn deserialized_reading_is_normalized() {
        let det = Detection::ltrb(20.0, 40.0, 60.0, 55.0, 0.5, 0);

        let json = serde_json::json!({"detection": det, "text": "а123вс 77", "ocr_score": 0.5});
        let reading: PlateReading = serde_json::from_value(json).unwrap();
        assert_eq!(reading.text(), Some("A123BC77"));
        assert_eq!(reading.ocr_score, 0.5);
        assert_eq!(reading.detection, det);

        let json = serde_json::json!({"detection": det, "text": "a1", "ocr_score": 0.5});
        let short: PlateReading = serde_json::from_value(json).unwrap();
        assert_eq!(short.text(), None);

        let back: PlateReading =
            serde_json::from_value(serde_json::to_value(&reading).unwrap()).unwrap();
        assert_eq!(back, reading);
    }
}
