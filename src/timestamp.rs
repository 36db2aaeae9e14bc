//! FAT style packed timestamps, shared by FAT16 directory entries and exFAT file entries

use bitfield::bitfield;
use chrono::{Datelike, NaiveDateTime, Timelike};
use derive_more::Into;

bitfield! {
    #[derive(Copy, Clone, Debug, Default, Into, PartialEq, Eq)]
    pub struct Timestamp(u32);
    year_offset, set_year_offset: 31, 25;
    pub month, set_month: 24, 21;
    pub day, set_day: 20, 16;
    pub hour, set_hour: 15, 11;
    pub minute, set_minute: 10, 5;
    pub double_second, set_double_second: 4, 0;
}

impl Timestamp {
    pub fn year(&self) -> u32 {
        self.year_offset() + 1980
    }

    pub fn set_year(&mut self, year: u32) {
        self.set_year_offset(year.clamp(1980, 2107) - 1980)
    }

    pub fn second(&self) -> u32 {
        self.double_second() * 2
    }

    pub fn set_second(&mut self, second: u32) {
        self.set_double_second(second / 2)
    }

    /// FAT directory entry date word
    pub fn date(&self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// FAT directory entry time word
    pub fn time(&self) -> u16 {
        self.0 as u16
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(datetime: NaiveDateTime) -> Self {
        let mut timestamp = Self::default();
        timestamp.set_year(datetime.year().max(0) as u32);
        timestamp.set_month(datetime.month());
        timestamp.set_day(datetime.day());
        timestamp.set_hour(datetime.hour());
        timestamp.set_minute(datetime.minute());
        timestamp.set_second(datetime.second());
        timestamp
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct UTCOffset(u8);

impl UTCOffset {
    pub fn new(minutes: i16) -> Self {
        Self((minutes / 15) as u8 & 0x7F | 0x80)
    }

    pub fn minutes(&self) -> i16 {
        match self.0 & 0x80 > 0 {
            true => (((self.0 & 0x7F) << 1) as i8 >> 1) as i16 * 15,
            false => 0,
        }
    }
}

impl From<UTCOffset> for u8 {
    fn from(offset: UTCOffset) -> u8 {
        offset.0
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DateTime {
    pub timestamp: Timestamp,
    pub millisecond: u16,
    pub utc_offset: UTCOffset,
}

impl DateTime {
    pub fn now() -> Self {
        chrono::Utc::now().naive_utc().into()
    }

    /// 10ms increment field, also carries the odd second
    pub fn increment_10ms(&self) -> u8 {
        let odd_second = (self.millisecond / 1000) * 100;
        (odd_second + self.millisecond % 1000 / 10) as u8
    }
}

impl From<NaiveDateTime> for DateTime {
    /// Taken as UTC
    fn from(datetime: NaiveDateTime) -> Self {
        let millisecond = (datetime.second() % 2) as u16 * 1000 + datetime.and_utc().timestamp_subsec_millis() as u16;
        Self { timestamp: datetime.into(), millisecond, utc_offset: UTCOffset::new(0) }
    }
}
