use crate::{
    clock::Clock,
    navigation::{
        Coordinate, Date, FixQuality, FixType, Navigation, SatelliteTable, Speed, Timestamp,
    },
    nmea::{NmeaError, NmeaParser, Parsed, SentenceId},
    Position,
};

/// Sentence counters. Never reset by the receiver; they stop at `u32::MAX`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stats {
    /// Checksum-valid sentences, supported or not.
    pub parsed_sentences: u32,
    /// Supported sentences that interpreted cleanly and were committed.
    pub clean_sentences: u32,
    /// Checksum mismatches, bad fields and overflows.
    pub crc_fails: u32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpsConfig {
    /// Hours added to the UTC time returned by [`Gps::timestamp`].
    pub local_offset: i8,
}

/// Owns the parser and everything it has committed.
///
/// Feed it bytes from the serial port with [`Gps::update`]; read the result
/// through [`Gps::navigation`] or the accessors below. A single `Gps` must
/// only ever be fed from one context at a time.
pub struct Gps<C: Clock> {
    parser: NmeaParser,
    nav: Navigation,
    stats: Stats,
    config: GpsConfig,
    clock: C,
    fix_time: Option<u64>,

    pub last_error: Option<NmeaError>,
    pub count: usize,
}

impl<C: Clock> Gps<C> {
    pub fn new(clock: C) -> Self {
        Self::with_config(clock, GpsConfig::default())
    }

    pub fn with_config(clock: C, config: GpsConfig) -> Self {
        Self {
            parser: NmeaParser::new(),
            nav: Navigation::new(),
            stats: Stats::default(),
            config,
            clock,
            fix_time: None,
            last_error: None,
            count: 0,
        }
    }

    /// Feeds one byte, committing a finished sentence if it checks out.
    ///
    /// Returns the sentence id whenever a sentence finished, accepted or not.
    /// Errors are also kept in [`Gps::last_error`] and reflected in
    /// [`Gps::stats`].
    pub fn process_byte(&mut self, b: u8) -> Option<Result<SentenceId, NmeaError>> {
        self.count = self.count.wrapping_add(1);
        let r = self.parser.process_byte(b)?;
        Some(match r {
            Ok(Parsed { id, sentence }) => {
                self.stats.parsed_sentences = self.stats.parsed_sentences.saturating_add(1);
                self.stats.clean_sentences = self.stats.clean_sentences.saturating_add(1);
                if sentence.commit(&mut self.nav) {
                    self.fix_time = Some(self.clock.now_ms());
                }
                log_trace!("committed {}", id.as_str());
                Ok(id)
            }
            Err(e) => {
                if e.is_failure() {
                    self.stats.crc_fails = self.stats.crc_fails.saturating_add(1);
                } else {
                    self.stats.parsed_sentences = self.stats.parsed_sentences.saturating_add(1);
                }
                self.last_error = Some(e);
                Err(e)
            }
        })
    }

    /// Feeds one byte; `Some(id)` once a sentence has finished processing.
    pub fn update(&mut self, b: u8) -> Option<SentenceId> {
        match self.process_byte(b)? {
            Ok(id) => Some(id),
            Err(e) => e.sentence(),
        }
    }

    /// Drains a backlog, returning how many sentences finished.
    pub fn feed(&mut self, bytes: impl IntoIterator<Item = u8>) -> usize {
        bytes
            .into_iter()
            .filter(|&b| self.process_byte(b).is_some())
            .count()
    }

    /// Abandons any partially received sentence.
    pub fn reset(&mut self) {
        self.parser.reset();
    }

    pub fn navigation(&self) -> &Navigation {
        &self.nav
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn config(&self) -> GpsConfig {
        self.config
    }

    pub fn set_local_offset(&mut self, hours: i8) {
        self.config.local_offset = hours;
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Milliseconds since the last sentence carrying an active fix, or `None`
    /// before the first one.
    pub fn time_since_fix(&self) -> Option<u64> {
        self.fix_time.map(|t| self.clock.elapsed_since(t))
    }

    pub fn latitude(&self) -> Option<Coordinate> {
        self.nav.latitude
    }

    pub fn longitude(&self) -> Option<Coordinate> {
        self.nav.longitude
    }

    /// Decimal-degree position, once both halves have been received.
    pub fn position(&self) -> Option<Position> {
        Some(Position {
            lat: self.nav.latitude?.decimal_degrees(),
            lon: self.nav.longitude?.decimal_degrees(),
        })
    }

    pub fn altitude(&self) -> Option<f32> {
        self.nav.altitude
    }

    pub fn geoid_height(&self) -> Option<f32> {
        self.nav.geoid_height
    }

    pub fn speed(&self) -> Speed {
        self.nav.speed
    }

    pub fn course(&self) -> f32 {
        self.nav.course
    }

    /// Time of day with [`GpsConfig::local_offset`] applied.
    pub fn timestamp(&self) -> Timestamp {
        self.nav.timestamp.with_offset(self.config.local_offset)
    }

    pub fn utc_timestamp(&self) -> Timestamp {
        self.nav.timestamp
    }

    /// UTC date; the local offset never rolls it over.
    pub fn date(&self) -> Date {
        self.nav.date
    }

    pub fn valid(&self) -> bool {
        self.nav.valid
    }

    pub fn fix_quality(&self) -> FixQuality {
        self.nav.fix_quality
    }

    pub fn fix_type(&self) -> FixType {
        self.nav.fix_type
    }

    pub fn satellites_in_use(&self) -> u8 {
        self.nav.satellites_in_use
    }

    /// PRNs used in the solution, from the last GSA.
    pub fn satellites_used(&self) -> &[u8] {
        self.nav.satellites_used.as_slice()
    }

    /// PRNs in view, from the current GSV group.
    pub fn satellites_visible(&self) -> impl Iterator<Item = u8> + '_ {
        self.nav.satellites.prns()
    }

    pub fn satellites(&self) -> &SatelliteTable {
        &self.nav.satellites
    }

    pub fn satellite_data_updated(&self) -> bool {
        self.nav.satellites.is_complete()
    }

    pub fn unset_satellite_data_updated(&mut self) {
        self.nav.satellites.unset_complete();
    }

    pub fn hdop(&self) -> f32 {
        self.nav.hdop
    }

    pub fn vdop(&self) -> f32 {
        self.nav.vdop
    }

    pub fn pdop(&self) -> f32 {
        self.nav.pdop
    }

    pub fn antenna_status(&self) -> Option<u8> {
        self.nav.antenna_status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::navigation::Hemisphere;

    fn gps() -> Gps<MockClock> {
        Gps::new(MockClock::new())
    }

    fn feed(gps: &mut Gps<MockClock>, line: &str) -> Option<SentenceId> {
        let mut last = None;
        for b in line.bytes() {
            if let Some(id) = gps.update(b) {
                last = Some(id);
            }
        }
        last
    }

    #[test]
    fn test_rmc_commits_and_counts() {
        let mut gps = gps();
        let id = feed(
            &mut gps,
            "$GPRMC,081836,A,3751.65,S,14507.36,E,000.0,360.0,130998,011.3,E*62\n",
        );
        assert_eq!(id.unwrap(), "GPRMC");
        let lat = gps.latitude().unwrap();
        assert_eq!(
            (lat.degrees, lat.minutes, lat.hemisphere),
            (37, 51.65, Hemisphere::South)
        );
        let lon = gps.longitude().unwrap();
        assert_eq!(
            (lon.degrees, lon.minutes, lon.hemisphere),
            (145, 7.36, Hemisphere::East)
        );
        assert_eq!(gps.speed().knots, 0.0);
        assert_eq!(gps.course(), 360.0);
        assert_eq!(
            gps.date(),
            Date {
                day: 13,
                month: 9,
                year: 98
            }
        );
        assert_eq!(
            gps.timestamp(),
            Timestamp {
                hour: 8,
                minute: 18,
                second: 36.0
            }
        );
        assert_eq!(gps.navigation().magnetic_variation, Some(11.3));
        assert!(gps.valid());
        assert_eq!(
            gps.stats(),
            Stats {
                parsed_sentences: 1,
                clean_sentences: 1,
                crc_fails: 0
            }
        );
    }

    #[test]
    fn test_checksum_failure_leaves_state() {
        let mut gps = gps();
        feed(
            &mut gps,
            "$GPRMC,081836,A,3751.65,S,14507.36,E,000.0,360.0,130998,011.3,E*62\n",
        );
        let before = *gps.navigation();
        let id = feed(
            &mut gps,
            "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6B\n",
        );
        assert_eq!(id.unwrap(), "GPRMC");
        assert_eq!(*gps.navigation(), before);
        assert_eq!(gps.stats().crc_fails, 1);
        assert_eq!(gps.stats().parsed_sentences, 1);
        assert!(matches!(
            gps.last_error,
            Some(NmeaError::BadChecksum { saw: 0x6b, .. })
        ));
    }

    #[test]
    fn test_unsupported_counts_as_parsed_only() {
        let mut gps = gps();
        let id = feed(&mut gps, "$PGACK,103*40\r\n");
        assert_eq!(id.unwrap(), "PGACK");
        assert_eq!(
            gps.stats(),
            Stats {
                parsed_sentences: 1,
                clean_sentences: 0,
                crc_fails: 0
            }
        );
    }

    #[test]
    fn test_local_offset_only_touches_query() {
        let mut gps = Gps::with_config(MockClock::new(), GpsConfig { local_offset: -5 });
        feed(
            &mut gps,
            "$GPRMC,023519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6B\n",
        );
        assert_eq!(gps.timestamp().hour, 21);
        assert_eq!(gps.utc_timestamp().hour, 2);
        assert_eq!(gps.date().day, 23);
    }

    #[test]
    fn test_time_since_fix() {
        let mut gps = gps();
        assert_eq!(gps.time_since_fix(), None);
        gps.clock().set(1_000);
        feed(&mut gps, "$GPGLL,4916.45,N,12311.12,W,225444,A,*1D\n");
        gps.clock().advance(350);
        assert_eq!(gps.time_since_fix(), Some(350));
    }

    #[test]
    fn test_void_gll_keeps_fix_time() {
        let mut gps = gps();
        feed(&mut gps, "$GPGLL,4916.45,N,12311.12,W,225444,A,*1D\n");
        gps.clock().advance(500);
        feed(&mut gps, "$GPGLL,0000.0000,N,00000.0000,E,235947.000,V*2D\n");
        assert!(!gps.valid());
        assert_eq!(gps.latitude().unwrap().degrees, 0);
        assert_eq!(gps.time_since_fix(), Some(500));
    }

    #[test]
    fn test_position_decimal_degrees() {
        let mut gps = gps();
        assert_eq!(gps.position(), None);
        feed(&mut gps, "$GPGLL,4916.45,N,12311.12,W,225444,A,*1D\n");
        let pos = gps.position().unwrap();
        assert!((pos.lat - 49.274166).abs() < 1e-4);
        assert!((pos.lon + 123.185333).abs() < 1e-4);
    }

    #[test]
    fn test_feed_backlog() {
        let mut gps = gps();
        let backlog = b"noise$GPGLL,4916.45,N,12311.12,W,225444,A,*1D\r\n$GPVTG,232.9,T,,M,002.3,N,004.3,K,A*01\r\n";
        assert_eq!(gps.feed(backlog.iter().copied()), 2);
        assert_eq!(gps.count, backlog.len());
        assert_eq!(gps.course(), 232.9);
    }

    #[test]
    fn test_counters_survive_long_uptime() {
        let mut gps = gps();
        gps.count = usize::MAX;
        gps.stats = Stats {
            parsed_sentences: u32::MAX,
            clean_sentences: u32::MAX,
            crc_fails: u32::MAX,
        };
        assert_eq!(gps.update(b'x'), None);
        assert_eq!(gps.count, 0);
        feed(&mut gps, "$GPGLL,4916.45,N,12311.12,W,225444,A,*1D\n");
        feed(&mut gps, "$PGACK,103*40\r\n");
        feed(&mut gps, "$GPGLL,4916.45,N,12311.12,W,225444,A,*1E\n");
        assert_eq!(gps.stats().parsed_sentences, u32::MAX);
        assert_eq!(gps.stats().clean_sentences, u32::MAX);
        assert_eq!(gps.stats().crc_fails, u32::MAX);
        assert!(gps.position().is_some());
    }
}
