use std::fmt;

/// Backend-neutral failure codes. Success-with-info outcomes live in
/// `PresentStatus`; everything here fails the call that returned it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuError {
    Failed,
    Unexpected,
    Aborted,
    AccessDenied,
    InvalidArgument,
    NotImplemented,
    OutOfMemory,

    InvalidCall,
    Unsupported,

    NotFound,
    MoreData,
    AlreadyExists,
    NameAlreadyExists,

    DeviceLost,
    DeviceRemoved,
    DeviceHung,
    DeviceReset,
    DriverInternalError,

    StillDrawing,
    WaitTimeout,

    NotCurrent,
    ModeChangeBlocked,
    SessionDisconnected,
    RemoteClientDisconnected,
    PresentationLost,
    SetDisplayModeRequired,
    FrameStatisticsDisjoint,

    AccessLost,
    NonExclusive,

    CacheCorrupt,
    CacheFull,
    CacheHashCollision,

    AdapterNotFound,
    DriverVersionMismatch,
}

impl GpuError {
    /// The device-lost family is fatal: everything referencing the device
    /// must short-circuit once one of these is observed.
    pub fn is_device_lost(&self) -> bool {
        matches!(
            self,
            GpuError::DeviceLost
                | GpuError::DeviceRemoved
                | GpuError::DeviceHung
                | GpuError::DeviceReset
                | GpuError::DriverInternalError
        )
    }

    /// Errors the executor may retry next frame without tearing anything
    /// down.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, GpuError::StillDrawing | GpuError::WaitTimeout)
    }
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GpuError::Failed => "generic failure",
            GpuError::Unexpected => "unexpected error",
            GpuError::Aborted => "operation aborted",
            GpuError::AccessDenied => "access denied",
            GpuError::InvalidArgument => "invalid argument",
            GpuError::NotImplemented => "not implemented",
            GpuError::OutOfMemory => "out of memory",
            GpuError::InvalidCall => "invalid call",
            GpuError::Unsupported => "unsupported",
            GpuError::NotFound => "not found",
            GpuError::MoreData => "more data available",
            GpuError::AlreadyExists => "already exists",
            GpuError::NameAlreadyExists => "name already exists",
            GpuError::DeviceLost => "device lost",
            GpuError::DeviceRemoved => "device removed",
            GpuError::DeviceHung => "device hung",
            GpuError::DeviceReset => "device reset",
            GpuError::DriverInternalError => "driver internal error",
            GpuError::StillDrawing => "still drawing",
            GpuError::WaitTimeout => "wait timed out",
            GpuError::NotCurrent => "not current",
            GpuError::ModeChangeBlocked => "mode change in progress",
            GpuError::SessionDisconnected => "session disconnected",
            GpuError::RemoteClientDisconnected => "remote client disconnected",
            GpuError::PresentationLost => "presentation lost",
            GpuError::SetDisplayModeRequired => "set display mode required",
            GpuError::FrameStatisticsDisjoint => "frame statistics disjoint",
            GpuError::AccessLost => "access lost",
            GpuError::NonExclusive => "non exclusive access",
            GpuError::CacheCorrupt => "shader cache corrupt",
            GpuError::CacheFull => "shader cache full",
            GpuError::CacheHashCollision => "shader cache hash collision",
            GpuError::AdapterNotFound => "adapter not found",
            GpuError::DriverVersionMismatch => "driver version mismatch",
        };
        f.write_str(name)
    }
}

impl std::error::Error for GpuError {}
