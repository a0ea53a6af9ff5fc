use core::str::FromStr;

use tinyvec::ArrayVec;

use super::FieldError;
use crate::navigation::{
    Coordinate, Date, FixQuality, FixType, Hemisphere, Navigation, Satellite, SelectionMode,
    Speed, Timestamp, MAX_SATELLITES_USED,
};

type FieldResult = Result<(), FieldError>;

////////////////////////////////////////////////////////////////////////////////
// Dispatch ////////////////////////////////////////////////////////////////////
////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Talker {
    Gps,
    Glonass,
    Combined,
    Proprietary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SentenceKind {
    Rmc,
    Gga,
    Gll,
    Vtg,
    Gsa,
    Gsv,
    Pgtop,
}

impl SentenceKind {
    /// Resolves a talker+type code. Case-sensitive.
    pub fn lookup(code: &[u8]) -> Option<(Talker, SentenceKind)> {
        if code == b"PGTOP" {
            return Some((Talker::Proprietary, SentenceKind::Pgtop));
        }
        let &[t0, t1, s0, s1, s2] = code else {
            return None;
        };
        let talker = match [t0, t1] {
            [b'G', b'P'] => Talker::Gps,
            [b'G', b'L'] => Talker::Glonass,
            [b'G', b'N'] => Talker::Combined,
            _ => return None,
        };
        let kind = match [s0, s1, s2] {
            [b'R', b'M', b'C'] => SentenceKind::Rmc,
            [b'G', b'G', b'A'] => SentenceKind::Gga,
            [b'G', b'L', b'L'] => SentenceKind::Gll,
            [b'V', b'T', b'G'] => SentenceKind::Vtg,
            [b'G', b'S', b'A'] => SentenceKind::Gsa,
            [b'G', b'S', b'V'] => SentenceKind::Gsv,
            _ => return None,
        };
        Some((talker, kind))
    }

    /// Empty staging record for this grammar.
    pub fn stage(self) -> Sentence {
        match self {
            SentenceKind::Rmc => Sentence::Rmc(Rmc::default()),
            SentenceKind::Gga => Sentence::Gga(Gga::default()),
            SentenceKind::Gll => Sentence::Gll(Gll::default()),
            SentenceKind::Vtg => Sentence::Vtg(Vtg::default()),
            SentenceKind::Gsa => Sentence::Gsa(Gsa::default()),
            SentenceKind::Gsv => Sentence::Gsv(Gsv::default()),
            SentenceKind::Pgtop => Sentence::Pgtop(Pgtop::default()),
        }
    }
}

/// Fields of one sentence, staged until its checksum has been verified.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum Sentence {
    #[default]
    Unsupported,
    Rmc(Rmc),
    Gga(Gga),
    Gll(Gll),
    Vtg(Vtg),
    Gsa(Gsa),
    Gsv(Gsv),
    Pgtop(Pgtop),
}

impl Sentence {
    /// Feeds field `index` (1-based, the type code is field 0). Tokens are
    /// printable ASCII, as delivered by the parser.
    pub(crate) fn field(&mut self, index: u8, token: &str) -> FieldResult {
        match self {
            Sentence::Unsupported => Ok(()),
            Sentence::Rmc(s) => s.field(index, token),
            Sentence::Gga(s) => s.field(index, token),
            Sentence::Gll(s) => s.field(index, token),
            Sentence::Vtg(s) => s.field(index, token),
            Sentence::Gsa(s) => s.field(index, token),
            Sentence::Gsv(s) => s.field(index, token),
            Sentence::Pgtop(s) => s.field(index, token),
        }
    }

    /// Checks fields the grammar cannot do without once the sentence has
    /// ended, returning the first one missing.
    pub(crate) fn finish(&self) -> Result<(), (u8, FieldError)> {
        match self {
            Sentence::Gsv(s) => s.finish(),
            _ => Ok(()),
        }
    }

    /// Writes the staged values into `nav`. Returns `true` when the sentence
    /// carried an active position fix.
    pub fn commit(&self, nav: &mut Navigation) -> bool {
        match self {
            Sentence::Unsupported => false,
            Sentence::Rmc(s) => s.commit(nav),
            Sentence::Gga(s) => s.commit(nav),
            Sentence::Gll(s) => s.commit(nav),
            Sentence::Vtg(s) => {
                s.commit(nav);
                false
            }
            Sentence::Gsa(s) => {
                s.commit(nav);
                false
            }
            Sentence::Gsv(s) => {
                s.commit(nav);
                false
            }
            Sentence::Pgtop(s) => {
                s.commit(nav);
                false
            }
        }
    }

    pub fn kind(&self) -> Option<SentenceKind> {
        match self {
            Sentence::Unsupported => None,
            Sentence::Rmc(_) => Some(SentenceKind::Rmc),
            Sentence::Gga(_) => Some(SentenceKind::Gga),
            Sentence::Gll(_) => Some(SentenceKind::Gll),
            Sentence::Vtg(_) => Some(SentenceKind::Vtg),
            Sentence::Gsa(_) => Some(SentenceKind::Gsa),
            Sentence::Gsv(_) => Some(SentenceKind::Gsv),
            Sentence::Pgtop(_) => Some(SentenceKind::Pgtop),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Token helpers ///////////////////////////////////////////////////////////////
////////////////////////////////////////////////////////////////////////////////

/// Plain decimal: digits with at most one `.`, optionally led by `-`.
/// Rules out the `inf`, `NaN` and exponent forms `str::parse` would take.
fn is_decimal(token: &str, signed: bool) -> bool {
    let body = match token.strip_prefix('-') {
        Some(rest) if signed => rest,
        _ => token,
    };
    let mut dots = 0;
    let mut digits = 0;
    for b in body.bytes() {
        match b {
            b'0'..=b'9' => digits += 1,
            b'.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}

fn decimal<T: FromStr>(token: &str, signed: bool) -> Result<Option<T>, FieldError> {
    if token.is_empty() {
        return Ok(None);
    }
    if !is_decimal(token, signed) {
        return Err(FieldError::Number);
    }
    token.parse().map(Some).map_err(|_| FieldError::Number)
}

fn number<T: FromStr>(token: &str) -> Result<Option<T>, FieldError> {
    decimal(token, false)
}

/// Altitude and geoid separation may go below zero.
fn signed_number<T: FromStr>(token: &str) -> Result<Option<T>, FieldError> {
    decimal(token, true)
}

fn required<T: FromStr>(token: &str) -> Result<T, FieldError> {
    number(token)?.ok_or(FieldError::Incomplete)
}

fn digits<T: FromStr>(token: &str) -> Result<T, FieldError> {
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FieldError::Number);
    }
    token.parse().map_err(|_| FieldError::Number)
}

/// `hhmmss` with optional fractional seconds.
fn time(token: &str) -> Result<Option<Timestamp>, FieldError> {
    if token.is_empty() {
        return Ok(None);
    }
    if token.len() < 6 {
        return Err(FieldError::Number);
    }
    let hour: u8 = digits(&token[0..2])?;
    let minute: u8 = digits(&token[2..4])?;
    let second: f32 = required(&token[4..]).map_err(|_| FieldError::Number)?;
    if hour > 23 || minute > 59 || !(0.0..61.0).contains(&second) {
        return Err(FieldError::Range);
    }
    Ok(Some(Timestamp {
        hour,
        minute,
        second,
    }))
}

/// `ddmmyy`
fn date(token: &str) -> Result<Option<Date>, FieldError> {
    if token.is_empty() {
        return Ok(None);
    }
    if token.len() != 6 {
        return Err(FieldError::Number);
    }
    let day: u8 = digits(&token[0..2])?;
    let month: u8 = digits(&token[2..4])?;
    let year: u8 = digits(&token[4..6])?;
    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return Err(FieldError::Range);
    }
    Ok(Some(Date { day, month, year }))
}

/// Leading `width` digits are whole degrees, the rest decimal minutes.
fn degree_minutes(token: &str, width: usize) -> Result<Option<(u8, f32)>, FieldError> {
    if token.is_empty() {
        return Ok(None);
    }
    if token.len() <= width {
        return Err(FieldError::Number);
    }
    let degrees: u8 = digits(&token[..width])?;
    let minutes: f32 = required(&token[width..]).map_err(|_| FieldError::Number)?;
    Ok(Some((degrees, minutes)))
}

fn hemisphere(token: &str, allowed: [Hemisphere; 2]) -> Result<Option<Hemisphere>, FieldError> {
    let hemi = match token {
        "" => return Ok(None),
        "N" => Hemisphere::North,
        "S" => Hemisphere::South,
        "E" => Hemisphere::East,
        "W" => Hemisphere::West,
        _ => return Err(FieldError::Hemisphere),
    };
    if allowed.contains(&hemi) {
        Ok(Some(hemi))
    } else {
        Err(FieldError::Hemisphere)
    }
}

fn status(token: &str) -> Result<Option<bool>, FieldError> {
    match token {
        "" => Ok(None),
        "A" => Ok(Some(true)),
        "V" => Ok(Some(false)),
        _ => Err(FieldError::Status),
    }
}

const LATITUDE: [Hemisphere; 2] = [Hemisphere::North, Hemisphere::South];
const LONGITUDE: [Hemisphere; 2] = [Hemisphere::East, Hemisphere::West];

/// Pairs a degree-minute value with the hemisphere that follows it.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct StagedCoordinate {
    value: Option<(u8, f32)>,
    coordinate: Option<Coordinate>,
}

impl StagedCoordinate {
    fn value(&mut self, token: &str, width: usize) -> FieldResult {
        self.value = degree_minutes(token, width)?;
        Ok(())
    }

    fn hemisphere(&mut self, token: &str, allowed: [Hemisphere; 2]) -> FieldResult {
        match (self.value, hemisphere(token, allowed)?) {
            (Some((degrees, minutes)), Some(hemisphere)) => {
                self.coordinate = Some(Coordinate {
                    degrees,
                    minutes,
                    hemisphere,
                });
                Ok(())
            }
            (None, None) => Ok(()),
            _ => Err(FieldError::Incomplete),
        }
    }

    fn get(&self) -> Option<Coordinate> {
        self.coordinate
    }
}

/// Latitude (2 degree digits) and longitude (3) at consecutive field pairs
/// starting at `first`.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct StagedPosition {
    lat: StagedCoordinate,
    lon: StagedCoordinate,
}

impl StagedPosition {
    /// Returns `None` when `index` is not one of the four position fields.
    fn field(&mut self, first: u8, index: u8, token: &str) -> Option<FieldResult> {
        let r = match index.checked_sub(first)? {
            0 => self.lat.value(token, 2),
            1 => self.lat.hemisphere(token, LATITUDE),
            2 => self.lon.value(token, 3),
            3 => self.lon.hemisphere(token, LONGITUDE),
            _ => return None,
        };
        Some(r)
    }

    fn commit(&self, nav: &mut Navigation) {
        if let Some(lat) = self.lat.get() {
            nav.latitude = Some(lat);
        }
        if let Some(lon) = self.lon.get() {
            nav.longitude = Some(lon);
        }
    }
}

fn set<T>(slot: &mut T, staged: Option<T>) {
    if let Some(v) = staged {
        *slot = v;
    }
}

////////////////////////////////////////////////////////////////////////////////
// Field interpreters //////////////////////////////////////////////////////////
////////////////////////////////////////////////////////////////////////////////

/// Recommended minimum data
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Rmc {
    pub timestamp: Option<Timestamp>,
    pub active: Option<bool>,
    position: StagedPosition,
    pub knots: Option<f32>,
    pub course: Option<f32>,
    pub date: Option<Date>,
    variation: Option<f32>,
    pub magnetic_variation: Option<f32>,
}

impl Rmc {
    fn field(&mut self, index: u8, token: &str) -> FieldResult {
        if let Some(r) = self.position.field(3, index, token) {
            return r;
        }
        match index {
            1 => self.timestamp = time(token)?,
            2 => self.active = status(token)?,
            7 => self.knots = number(token)?,
            8 => self.course = number(token)?,
            9 => self.date = date(token)?,
            10 => self.variation = number(token)?,
            11 => {
                self.magnetic_variation = match (self.variation, token) {
                    (None, _) => None,
                    (Some(v), "E") => Some(v),
                    (Some(v), "W") => Some(-v),
                    (Some(_), "") => return Err(FieldError::Incomplete),
                    (Some(_), _) => return Err(FieldError::Hemisphere),
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn commit(&self, nav: &mut Navigation) -> bool {
        set(&mut nav.timestamp, self.timestamp);
        set(&mut nav.valid, self.active);
        self.position.commit(nav);
        set(&mut nav.speed, self.knots.map(Speed::from_knots));
        set(&mut nav.course, self.course);
        set(&mut nav.date, self.date);
        if self.magnetic_variation.is_some() {
            nav.magnetic_variation = self.magnetic_variation;
        }
        self.active == Some(true)
    }

    pub fn latitude(&self) -> Option<Coordinate> {
        self.position.lat.get()
    }

    pub fn longitude(&self) -> Option<Coordinate> {
        self.position.lon.get()
    }
}

/// Fix data
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Gga {
    pub timestamp: Option<Timestamp>,
    position: StagedPosition,
    pub fix_quality: Option<FixQuality>,
    pub satellites_in_use: Option<u8>,
    pub hdop: Option<f32>,
    pub altitude: Option<f32>,
    pub geoid_height: Option<f32>,
}

impl Gga {
    fn field(&mut self, index: u8, token: &str) -> FieldResult {
        if let Some(r) = self.position.field(2, index, token) {
            return r;
        }
        match index {
            1 => self.timestamp = time(token)?,
            6 => self.fix_quality = number::<u8>(token)?.map(FixQuality::from),
            7 => self.satellites_in_use = number(token)?,
            8 => self.hdop = number(token)?,
            9 => self.altitude = signed_number(token)?,
            11 => self.geoid_height = signed_number(token)?,
            _ => {}
        }
        Ok(())
    }

    fn commit(&self, nav: &mut Navigation) -> bool {
        set(&mut nav.timestamp, self.timestamp);
        self.position.commit(nav);
        set(&mut nav.fix_quality, self.fix_quality);
        set(&mut nav.satellites_in_use, self.satellites_in_use);
        set(&mut nav.hdop, self.hdop);
        if self.altitude.is_some() {
            nav.altitude = self.altitude;
        }
        if self.geoid_height.is_some() {
            nav.geoid_height = self.geoid_height;
        }
        self.fix_quality.is_some_and(FixQuality::has_fix)
    }

    pub fn latitude(&self) -> Option<Coordinate> {
        self.position.lat.get()
    }

    pub fn longitude(&self) -> Option<Coordinate> {
        self.position.lon.get()
    }
}

/// Geographic position
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Gll {
    position: StagedPosition,
    pub timestamp: Option<Timestamp>,
    pub active: Option<bool>,
}

impl Gll {
    fn field(&mut self, index: u8, token: &str) -> FieldResult {
        if let Some(r) = self.position.field(1, index, token) {
            return r;
        }
        match index {
            5 => self.timestamp = time(token)?,
            6 => self.active = status(token)?,
            _ => {}
        }
        Ok(())
    }

    fn commit(&self, nav: &mut Navigation) -> bool {
        self.position.commit(nav);
        set(&mut nav.timestamp, self.timestamp);
        set(&mut nav.valid, self.active);
        self.active == Some(true)
    }

    pub fn latitude(&self) -> Option<Coordinate> {
        self.position.lat.get()
    }

    pub fn longitude(&self) -> Option<Coordinate> {
        self.position.lon.get()
    }
}

/// Course and speed over ground
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Vtg {
    pub course: Option<f32>,
    pub knots: Option<f32>,
    pub kmh: Option<f32>,
}

impl Vtg {
    fn field(&mut self, index: u8, token: &str) -> FieldResult {
        match index {
            1 => self.course = number(token)?,
            5 => self.knots = number(token)?,
            7 => self.kmh = number(token)?,
            _ => {}
        }
        Ok(())
    }

    /// Knots win when both speeds are present; the other units are derived.
    pub fn speed(&self) -> Option<Speed> {
        self.knots
            .map(Speed::from_knots)
            .or_else(|| self.kmh.map(Speed::from_kmh))
    }

    fn commit(&self, nav: &mut Navigation) {
        set(&mut nav.course, self.course);
        set(&mut nav.speed, self.speed());
    }
}

/// DOP and active satellites
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Gsa {
    pub mode: Option<SelectionMode>,
    pub fix_type: Option<FixType>,
    pub satellites_used: ArrayVec<[u8; MAX_SATELLITES_USED]>,
    pub pdop: Option<f32>,
    pub hdop: Option<f32>,
    pub vdop: Option<f32>,
}

impl Gsa {
    fn field(&mut self, index: u8, token: &str) -> FieldResult {
        match index {
            1 => {
                self.mode = match token {
                    "" => None,
                    "M" => Some(SelectionMode::Manual),
                    "A" => Some(SelectionMode::Automatic),
                    _ => return Err(FieldError::Status),
                }
            }
            2 => {
                self.fix_type = match number::<u8>(token)? {
                    None => None,
                    Some(1) => Some(FixType::NoFix),
                    Some(2) => Some(FixType::Fix2D),
                    Some(3) => Some(FixType::Fix3D),
                    Some(_) => return Err(FieldError::Range),
                }
            }
            3..=14 => {
                if let Some(prn) = number(token)? {
                    self.satellites_used.push(prn);
                }
            }
            15 => self.pdop = number(token)?,
            16 => self.hdop = number(token)?,
            17 => self.vdop = number(token)?,
            _ => {}
        }
        Ok(())
    }

    fn commit(&self, nav: &mut Navigation) {
        set(&mut nav.selection_mode, self.mode);
        set(&mut nav.fix_type, self.fix_type);
        nav.satellites_used = self.satellites_used;
        set(&mut nav.pdop, self.pdop);
        set(&mut nav.hdop, self.hdop);
        set(&mut nav.vdop, self.vdop);
    }
}

/// Satellites in view; one message of a group
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Gsv {
    pub total_messages: Option<u8>,
    pub message: Option<u8>,
    pub in_view: Option<u8>,
    pub satellites: [Option<(u8, Satellite)>; 4],
    pending: Pending,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Pending {
    prn: Option<u8>,
    sat: Satellite,
}

impl Gsv {
    fn field(&mut self, index: u8, token: &str) -> FieldResult {
        match index {
            1 => self.total_messages = Some(required(token)?),
            2 => self.message = Some(required(token)?),
            3 => self.in_view = number(token)?,
            4..=19 => {
                let slot = ((index - 4) / 4) as usize;
                match (index - 4) % 4 {
                    0 => {
                        self.pending = Pending {
                            prn: number(token)?,
                            sat: Satellite::default(),
                        }
                    }
                    1 => self.pending.sat.elevation = number(token)?,
                    2 => self.pending.sat.azimuth = number(token)?,
                    _ => self.pending.sat.snr = number(token)?,
                }
                // A group is stored as soon as its PRN is known so that a
                // last message cut short after the PRN still lists it.
                self.satellites[slot] = self.pending.prn.map(|prn| (prn, self.pending.sat));
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(&self) -> Result<(), (u8, FieldError)> {
        match (self.total_messages, self.message) {
            (None, _) => Err((1, FieldError::Incomplete)),
            (_, None) => Err((2, FieldError::Incomplete)),
            _ => Ok(()),
        }
    }

    fn commit(&self, nav: &mut Navigation) {
        let table = &mut nav.satellites;
        let (Some(total), Some(message)) = (self.total_messages, self.message) else {
            return;
        };
        if message == 1 {
            table.clear();
        }
        for (prn, sat) in self.satellites.iter().flatten() {
            if !table.insert(*prn, *sat) {
                log_warn!("satellite table full, dropping PRN {}", *prn);
            }
        }
        table.record_message(total, message, self.in_view.unwrap_or(table.in_view()));
    }
}

/// MTK antenna status, `$PGTOP,11,<code>`
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Pgtop {
    command: Option<u8>,
    pub code: Option<u8>,
}

impl Pgtop {
    fn field(&mut self, index: u8, token: &str) -> FieldResult {
        match index {
            1 => self.command = number(token)?,
            2 if self.command == Some(11) => self.code = number(token)?,
            _ => {}
        }
        Ok(())
    }

    fn commit(&self, nav: &mut Navigation) {
        if self.command == Some(11) {
            nav.antenna_status = self.code;
        }
    }
}
