/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All persisted timestamps are UTC Unix epoch seconds.
pub type EpochSecs = i64;
