/// Domain interface for the real-world alert side effect.
///
/// `trigger` blocks until the effect completes — for an external player,
/// until the process exits. Failures are reported for logging only;
/// callers must pace the next attempt exactly as if it had succeeded.
pub trait AlertActuator: Send {
    fn trigger(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
