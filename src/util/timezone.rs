use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use time::{OffsetDateTime, UtcOffset};

const DISPLAY_FORMAT: &str = "%d %b %Y, %H:%M";

pub fn localized_datetime(time: OffsetDateTime, tz: Tz) -> DateTime<Tz> {
    let utc = time.to_offset(UtcOffset::UTC);
    let datetime_utc = DateTime::<Utc>::from_timestamp(utc.unix_timestamp(), utc.nanosecond())
        .unwrap_or_default();
    tz.from_utc_datetime(&datetime_utc.naive_utc())
}

/// Timestamp as shown next to posts and comments.
pub fn display_datetime(time: OffsetDateTime, tz: Tz) -> String {
    localized_datetime(time, tz).format(DISPLAY_FORMAT).to_string()
}

/// RFC 3339 timestamp for `<time datetime=...>` attributes.
pub fn iso_datetime(time: OffsetDateTime, tz: Tz) -> String {
    localized_datetime(time, tz).to_rfc3339()
}
