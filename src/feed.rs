//! Inbound feed protocol.
//!
//! Newline-delimited JSON, one value per line. A line is a position/heading
//! sample, a bare heading number (compass-only devices), or a control
//! message tagged by `"type"`.

use serde::Deserialize;

use crate::error::{MargaError, Result};
use crate::graph::Point;
use crate::guidance::FeedSample;

/// Maximum accepted line length in bytes.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Position and heading sample.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct FeedMessage {
    #[serde(rename = "headingDegrees", alias = "degrees")]
    pub heading_degrees: f64,
    pub coordinates: Point,
}

impl From<FeedMessage> for FeedSample {
    fn from(msg: FeedMessage) -> Self {
        FeedSample {
            heading_degrees: msg.heading_degrees,
            position: msg.coordinates,
        }
    }
}

/// Selection, calibration and graph edit requests.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ControlMessage {
    SelectStart { location_id: String },
    SelectEnd { location_id: String },
    ClearStart,
    ClearEnd,
    ClearSelection,
    SnapStart { coordinates: Point },
    SnapEnd { coordinates: Point },
    Calibrate { offset_degrees: f64 },
    ReloadGraph,
    AddLocation { name: String, coordinates: Point },
    RemoveLocation { location_id: String },
    AddEdge { from: String, to: String },
    RemoveEdge { edge_id: String },
}

/// One parsed feed line.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InboundMessage {
    Control(ControlMessage),
    Sample(FeedMessage),
    Heading(f64),
}

/// Parse one feed line.
///
/// Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<InboundMessage>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line.len() > MAX_LINE_LEN {
        return Err(MargaError::Protocol(format!(
            "Line too long: {} bytes",
            line.len()
        )));
    }

    serde_json::from_str(line).map(Some).map_err(|_| {
        let preview: String = line.chars().take(80).collect();
        MargaError::Protocol(format!("Unrecognized feed message: {}", preview))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sample() {
        let msg = parse_line(r#"{"headingDegrees": 42.5, "coordinates": [1.0, -2.0]}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            msg,
            InboundMessage::Sample(FeedMessage {
                heading_degrees: 42.5,
                coordinates: Point::new(1.0, -2.0),
            })
        );
    }

    #[test]
    fn test_parse_legacy_degrees_field() {
        let msg = parse_line(r#"{"degrees": 10, "coordinates": [0, 0]}"#)
            .unwrap()
            .unwrap();
        assert!(matches!(msg, InboundMessage::Sample(s) if s.heading_degrees == 10.0));
    }

    #[test]
    fn test_parse_bare_heading() {
        assert_eq!(
            parse_line("273.4\n").unwrap(),
            Some(InboundMessage::Heading(273.4))
        );
    }

    #[test]
    fn test_parse_control_messages() {
        assert_eq!(
            parse_line(r#"{"type": "select_start", "locationId": "1700000000000"}"#).unwrap(),
            Some(InboundMessage::Control(ControlMessage::SelectStart {
                location_id: "1700000000000".into()
            }))
        );
        assert_eq!(
            parse_line(r#"{"type": "calibrate", "offsetDegrees": -12.5}"#).unwrap(),
            Some(InboundMessage::Control(ControlMessage::Calibrate {
                offset_degrees: -12.5
            }))
        );
        assert_eq!(
            parse_line(r#"{"type": "snap_end", "coordinates": [3.0, 4.0]}"#).unwrap(),
            Some(InboundMessage::Control(ControlMessage::SnapEnd {
                coordinates: Point::new(3.0, 4.0)
            }))
        );
        assert_eq!(
            parse_line(r#"{"type": "clear_selection"}"#).unwrap(),
            Some(InboundMessage::Control(ControlMessage::ClearSelection))
        );
        assert_eq!(
            parse_line(r#"{"type": "add_edge", "from": "a", "to": "b"}"#).unwrap(),
            Some(InboundMessage::Control(ControlMessage::AddEdge {
                from: "a".into(),
                to: "b".into()
            }))
        );
    }

    #[test]
    fn test_blank_and_malformed_lines() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert!(parse_line("{not json").is_err());
        assert!(parse_line(r#"{"type": "teleport"}"#).is_err());
        assert!(parse_line(r#"{"coordinates": [1, 2]}"#).is_err());
        assert!(parse_line(r#""north""#).is_err());
    }
}
