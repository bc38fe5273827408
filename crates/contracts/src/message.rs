//! Bus messages - SensorAdapter output
//!
//! Reading published per accepted frame, plus the camera side-channel messages.

use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Wall-clock time stamp (seconds + nanoseconds)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Stamp {
    pub sec: i64,
    pub nsec: u32,
}

impl Stamp {
    /// Create from seconds (f64)
    pub fn from_secs_f64(secs: f64) -> Self {
        let sec = secs.floor();
        let nsec = ((secs - sec) * 1e9).round().min(999_999_999.0) as u32;
        Self {
            sec: sec as i64,
            nsec,
        }
    }

    /// Create from a simulator time offset
    pub fn from_duration(time: Duration) -> Self {
        Self {
            sec: i64::try_from(time.as_secs()).unwrap_or(i64::MAX),
            nsec: time.subsec_nanos(),
        }
    }

    /// Convert to seconds (f64)
    pub fn as_secs_f64(&self) -> f64 {
        self.sec as f64 + self.nsec as f64 * 1e-9
    }
}

/// Message header
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Monotonic sequence number
    pub seq: u32,

    /// Time stamp
    pub stamp: Stamp,

    /// Coordinate frame id
    pub frame_id: String,
}

/// Illuminance reading
///
/// One reading per accepted frame. `variance` is always 0.0 and
/// `header.frame_id` is always empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IlluminanceReading {
    pub header: Header,

    /// Mean intensity over the sampling window
    pub illuminance: f64,

    /// Reading variance
    pub variance: f64,
}

impl IlluminanceReading {
    /// Create a reading with zero variance and empty frame id
    pub fn new(seq: u32, stamp: Stamp, illuminance: f64) -> Self {
        Self {
            header: Header {
                seq,
                stamp,
                frame_id: String::new(),
            },
            illuminance,
            variance: 0.0,
        }
    }

    /// Sequence number shortcut
    pub fn seq(&self) -> u32 {
        self.header.seq
    }
}

/// Raw camera image forwarded on the image topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraImage {
    pub header: Header,
    pub width: u32,
    pub height: u32,
    pub encoding: String,
    /// Row length in bytes
    pub step: u32,
    pub data: Bytes,
}

/// Camera metadata forwarded on the camera-info topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraInfo {
    pub header: Header,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_defaults() {
        let reading = IlluminanceReading::new(3, Stamp::default(), 42.5);
        assert_eq!(reading.seq(), 3);
        assert_eq!(reading.variance, 0.0);
        assert!(reading.header.frame_id.is_empty());
    }

    #[test]
    fn test_stamp_from_secs() {
        let stamp = Stamp::from_secs_f64(12.25);
        assert_eq!(stamp.sec, 12);
        assert_eq!(stamp.nsec, 250_000_000);
        assert!((stamp.as_secs_f64() - 12.25).abs() < 1e-9);
    }

    #[test]
    fn test_stamp_from_duration() {
        let stamp = Stamp::from_duration(Duration::new(3, 33_333_333));
        assert_eq!(stamp, Stamp { sec: 3, nsec: 33_333_333 });
    }

    #[test]
    fn test_reading_json_shape() {
        let reading = IlluminanceReading::new(0, Stamp { sec: 1, nsec: 2 }, 100.0);
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["header"]["seq"], 0);
        assert_eq!(json["header"]["frame_id"], "");
        assert_eq!(json["illuminance"], 100.0);
        assert_eq!(json["variance"], 0.0);
    }
}
