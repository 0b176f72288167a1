use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CycleError {
    #[error("table cycle needs at least one offset")]
    EmptyTable,

    #[error("table cycle offsets must be ascending (offset {offset} follows {previous})")]
    UnsortedTable { previous: u64, offset: u64 },

    #[error("rounding scale must be > 0")]
    ZeroScale,

    #[error("weekly cycle needs at least one weekday")]
    EmptyWeek,

    #[error("weekly cycle needs ticks_per_day > 0")]
    ZeroDay,
}

pub type CycleResult<T> = Result<T, CycleError>;
