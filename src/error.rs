use thiserror::Error;

pub type Result<T> = std::result::Result<T, EdgeError>;

/// Terminal failures of one upload session. None of them are retried automatically.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    #[error("Connection timeout")]
    ConnectTimeout,

    #[error("Connection rejected")]
    ConnectRejected,

    #[error("Write rejected by transport")]
    WriteRejected,

    #[error("Reply exceeded response buffer")]
    ReplyOverflow,

    #[error("Reply timeout")]
    ReplyTimeout,

    #[error("Connection closed before reply")]
    ConnectionClosed,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleRejected {
    #[error("Event table full")]
    TableFull,

    #[error("No free hour")]
    NoFreeHour,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseInvalid {
    #[error("Reply carries no event name")]
    MissingName,

    #[error("Reply status not confirmed")]
    StatusNotConfirmed,
}

#[derive(Error, Debug)]
pub enum EdgeError {
    #[error("Capture overflow: sample buffer full")]
    CaptureOverflow,

    #[error("Transport failure: {0}")]
    Transport(#[from] TransportFailure),

    #[error("Schedule rejected: {0}")]
    Schedule(#[from] ScheduleRejected),

    #[error("Invalid response: {0}")]
    Response(#[from] ResponseInvalid),
}
