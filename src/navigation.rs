use chrono::{NaiveDate, NaiveTime};
use tinyvec::ArrayVec;

/// Nine GSV messages of four satellites each.
pub const MAX_SATELLITES: usize = 36;
/// A GSA sentence lists at most twelve PRNs.
pub const MAX_SATELLITES_USED: usize = 12;

pub const KNOT_TO_MPH: f32 = 1.15078;
pub const KNOT_TO_KMH: f32 = 1.852;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    pub fn as_char(self) -> char {
        match self {
            Hemisphere::North => 'N',
            Hemisphere::South => 'S',
            Hemisphere::East => 'E',
            Hemisphere::West => 'W',
        }
    }

    pub fn is_negative(self) -> bool {
        matches!(self, Hemisphere::South | Hemisphere::West)
    }
}

/// Degree-minute coordinate exactly as received.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Coordinate {
    pub degrees: u8,
    pub minutes: f32,
    pub hemisphere: Hemisphere,
}

impl Coordinate {
    /// Signed decimal degrees, south and west negative.
    pub fn decimal_degrees(&self) -> f32 {
        let dd = self.degrees as f32 + self.minutes / 60.0;
        if self.hemisphere.is_negative() {
            -dd
        } else {
            dd
        }
    }

    /// Degrees, whole minutes and rounded seconds. Seconds that round up to
    /// 60 carry into the minutes.
    pub fn dms(&self) -> (u8, u8, u8) {
        let mut whole = self.minutes as u8;
        let mut seconds = ((self.minutes - whole as f32) * 60.0 + 0.5) as u8;
        if seconds >= 60 {
            whole = whole.saturating_add(1);
            seconds = 0;
        }
        (self.degrees, whole, seconds)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Speed {
    pub knots: f32,
    pub mph: f32,
    pub kmh: f32,
}

impl Speed {
    pub fn from_knots(knots: f32) -> Self {
        Self {
            knots,
            mph: knots * KNOT_TO_MPH,
            kmh: knots * KNOT_TO_KMH,
        }
    }

    pub fn from_kmh(kmh: f32) -> Self {
        Self::from_knots(kmh / KNOT_TO_KMH)
    }
}

/// UTC time of day.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timestamp {
    pub hour: u8,
    pub minute: u8,
    pub second: f32,
}

impl Timestamp {
    /// Shifts the hour by `offset`, wrapping within the day. Minutes, seconds
    /// and the date are left alone.
    pub fn with_offset(self, offset: i8) -> Self {
        let hour = (self.hour as i16 + offset as i16).rem_euclid(24);
        Self {
            hour: hour as u8,
            ..self
        }
    }

    pub fn to_naive_time(&self) -> Option<NaiveTime> {
        let whole = self.second as u32;
        let milli = ((self.second - whole as f32) * 1000.0) as u32;
        NaiveTime::from_hms_milli_opt(self.hour as u32, self.minute as u32, whole, milli)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Date {
    pub day: u8,
    pub month: u8,
    /// Two digits, as sent by the receiver.
    pub year: u8,
}

impl Date {
    /// `century` is 19 or 20 for 19xx or 20xx.
    pub fn to_naive_date(&self, century: u8) -> Option<NaiveDate> {
        let year = century as i32 * 100 + self.year as i32;
        NaiveDate::from_ymd_opt(year, self.month as u32, self.day as u32)
    }
}

/// GGA fix quality indicator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FixQuality {
    #[default]
    Invalid,
    Gps,
    Dgps,
    /// RTK, dead reckoning and friends; kept as the raw code.
    Other(u8),
}

impl From<u8> for FixQuality {
    fn from(code: u8) -> Self {
        match code {
            0 => FixQuality::Invalid,
            1 => FixQuality::Gps,
            2 => FixQuality::Dgps,
            n => FixQuality::Other(n),
        }
    }
}

impl FixQuality {
    pub fn has_fix(self) -> bool {
        self != FixQuality::Invalid
    }
}

/// GSA fix type
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FixType {
    #[default]
    NoFix,
    Fix2D,
    Fix3D,
}

/// GSA selection mode
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SelectionMode {
    Manual,
    #[default]
    Automatic,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Satellite {
    /// Degrees above the horizon.
    pub elevation: Option<u8>,
    /// Degrees from true north.
    pub azimuth: Option<u16>,
    /// dB-Hz; absent when the satellite is not tracked.
    pub snr: Option<u8>,
}

/// Satellites in view, aggregated from a GSV message group.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SatelliteTable {
    entries: ArrayVec<[(u8, Satellite); MAX_SATELLITES]>,
    in_view: u8,
    total_messages: u8,
    last_message: u8,
}

impl SatelliteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replaces the entry for `prn` or appends a new one. Returns `false` if
    /// the table is full.
    pub fn insert(&mut self, prn: u8, sat: Satellite) -> bool {
        if let Some(entry) = self.entries.iter_mut().find(|(p, _)| *p == prn) {
            entry.1 = sat;
            return true;
        }
        self.entries.try_push((prn, sat)).is_none()
    }

    pub fn get(&self, prn: u8) -> Option<&Satellite> {
        self.entries
            .iter()
            .find(|(p, _)| *p == prn)
            .map(|(_, sat)| sat)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(u8, Satellite)> {
        self.entries.iter()
    }

    /// PRNs in the order they were first reported.
    pub fn prns(&self) -> impl Iterator<Item = u8> + '_ {
        self.entries.iter().map(|(prn, _)| *prn)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Satellites in view as declared by the last GSV message.
    pub fn in_view(&self) -> u8 {
        self.in_view
    }

    pub fn total_messages(&self) -> u8 {
        self.total_messages
    }

    pub fn last_message(&self) -> u8 {
        self.last_message
    }

    /// True once every message of the current group has been consumed.
    pub fn is_complete(&self) -> bool {
        self.total_messages > 0 && self.total_messages == self.last_message
    }

    /// Marks the current data as consumed so the next complete group is
    /// recognisable as fresh.
    pub fn unset_complete(&mut self) {
        self.last_message = 0;
    }

    pub(crate) fn record_message(&mut self, total: u8, index: u8, in_view: u8) {
        self.total_messages = total;
        self.last_message = index;
        self.in_view = in_view;
    }
}

/// Live navigation snapshot. Only ever written by committed sentences.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Navigation {
    pub latitude: Option<Coordinate>,
    pub longitude: Option<Coordinate>,
    /// Meters above mean sea level.
    pub altitude: Option<f32>,
    /// Meters, geoid above the WGS84 ellipsoid.
    pub geoid_height: Option<f32>,
    /// Degrees true.
    pub course: f32,
    pub speed: Speed,
    /// Signed degrees, west negative.
    pub magnetic_variation: Option<f32>,
    pub timestamp: Timestamp,
    pub date: Date,
    /// RMC/GLL status flag `A`.
    pub valid: bool,
    pub fix_quality: FixQuality,
    pub fix_type: FixType,
    pub selection_mode: SelectionMode,
    pub satellites_in_use: u8,
    pub satellites_used: ArrayVec<[u8; MAX_SATELLITES_USED]>,
    pub hdop: f32,
    pub vdop: f32,
    pub pdop: f32,
    /// Raw PGTOP antenna code, see [`AntennaModule::status`].
    pub antenna_status: Option<u8>,
    pub satellites: SatelliteTable,
}

impl Navigation {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Antenna {
    Internal,
    Active,
    Shorted,
}

/// Receivers disagree on what each PGTOP code means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AntennaModule {
    Pa1616s,
    Pa6h,
}

impl AntennaModule {
    pub fn status(self, code: u8) -> Option<Antenna> {
        match (self, code) {
            (AntennaModule::Pa1616s, 1) | (AntennaModule::Pa6h, 2) => Some(Antenna::Internal),
            (AntennaModule::Pa1616s, 2) | (AntennaModule::Pa6h, 3) => Some(Antenna::Active),
            (AntennaModule::Pa1616s, 3) | (AntennaModule::Pa6h, 1) => Some(Antenna::Shorted),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_degrees_sign() {
        let lat = Coordinate {
            degrees: 37,
            minutes: 30.0,
            hemisphere: Hemisphere::South,
        };
        assert!((lat.decimal_degrees() + 37.5).abs() < 1e-5);
    }

    #[test]
    fn test_dms_rounds_seconds() {
        let lon = Coordinate {
            degrees: 40,
            minutes: 26.767,
            hemisphere: Hemisphere::North,
        };
        assert_eq!(lon.dms(), (40, 26, 46));
    }

    #[test]
    fn test_dms_carries_rounded_minute() {
        let lat = Coordinate {
            degrees: 12,
            minutes: 26.9999,
            hemisphere: Hemisphere::South,
        };
        assert_eq!(lat.dms(), (12, 27, 0));
    }

    #[test]
    fn test_speed_units_from_one_source() {
        let s = Speed::from_kmh(1.852);
        assert!((s.knots - 1.0).abs() < 1e-5);
        assert!((s.mph - KNOT_TO_MPH).abs() < 1e-5);
    }

    #[test]
    fn test_timestamp_offset_wraps() {
        let t = Timestamp {
            hour: 1,
            minute: 5,
            second: 2.5,
        };
        assert_eq!(t.with_offset(-3).hour, 22);
        assert_eq!(t.with_offset(23).hour, 0);
        assert_eq!(t.with_offset(-3).minute, 5);
    }

    #[test]
    fn test_chrono_conversions() {
        let t = Timestamp {
            hour: 8,
            minute: 18,
            second: 36.5,
        };
        assert_eq!(
            t.to_naive_time(),
            NaiveTime::from_hms_milli_opt(8, 18, 36, 500)
        );
        let d = Date {
            day: 13,
            month: 9,
            year: 98,
        };
        assert_eq!(d.to_naive_date(19), NaiveDate::from_ymd_opt(1998, 9, 13));
        assert_eq!(Date::default().to_naive_date(20), None);
    }

    #[test]
    fn test_satellite_table_upserts_by_prn() {
        let mut table = SatelliteTable::new();
        assert!(table.insert(7, Satellite::default()));
        assert!(table.insert(
            7,
            Satellite {
                snr: Some(40),
                ..Default::default()
            }
        ));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(7).unwrap().snr, Some(40));
    }

    #[test]
    fn test_satellite_table_is_bounded() {
        let mut table = SatelliteTable::new();
        for prn in 0..MAX_SATELLITES as u8 {
            assert!(table.insert(prn, Satellite::default()));
        }
        assert!(!table.insert(200, Satellite::default()));
        assert_eq!(table.len(), MAX_SATELLITES);
    }

    #[test]
    fn test_antenna_codes_per_module() {
        assert_eq!(AntennaModule::Pa1616s.status(3), Some(Antenna::Shorted));
        assert_eq!(AntennaModule::Pa6h.status(3), Some(Antenna::Active));
        assert_eq!(AntennaModule::Pa6h.status(9), None);
    }
}
