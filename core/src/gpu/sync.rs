use super::*;

/// Monotonically increasing 64-bit counter shared between host and queues.
pub trait Timeline: Send + Sync {
    unsafe fn completed_value(&self) -> u64;
    unsafe fn host_wait(&self, value: u64, timeout_ns: Option<u64>) -> Result<(), GpuError>;

    unsafe fn is_complete(&self, value: u64) -> bool {
        self.completed_value() >= value
    }
}
