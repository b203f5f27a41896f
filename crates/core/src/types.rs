/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Calendar-day key used for quota bucketing. Always a UTC date.
pub type DayKey = chrono::NaiveDate;
