//! The three calibration points, in the order the circuit requires them.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalPoint {
    Mid,
    Low,
    High,
}

impl CalPoint {
    /// Midpoint first: the circuit clears low/high when the midpoint is set.
    pub const SEQUENCE: [CalPoint; 3] = [CalPoint::Mid, CalPoint::Low, CalPoint::High];

    pub fn reference_ph(self) -> f64 {
        match self {
            CalPoint::Mid => 7.00,
            CalPoint::Low => 4.00,
            CalPoint::High => 10.00,
        }
    }

    /// Device command that stores this point.
    pub fn command(self) -> &'static str {
        match self {
            CalPoint::Mid => "Cal,mid,7.00",
            CalPoint::Low => "Cal,low,4.00",
            CalPoint::High => "Cal,high,10.00",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CalPoint::Mid => "mid",
            CalPoint::Low => "low",
            CalPoint::High => "high",
        }
    }

    pub fn next(self) -> Option<CalPoint> {
        match self {
            CalPoint::Mid => Some(CalPoint::Low),
            CalPoint::Low => Some(CalPoint::High),
            CalPoint::High => None,
        }
    }
}

impl fmt::Display for CalPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} point (pH {:.2})", self.label(), self.reference_ph())
    }
}
