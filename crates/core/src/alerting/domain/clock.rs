/// Wall-clock source for alert timestamps.
pub trait Clock: Send {
    /// Whole seconds since the Unix epoch.
    fn unix_seconds(&self) -> u64;
}
