use core::{fmt, time::Duration};

/// Half-duplex byte transport to the servo bus.
#[expect(
    async_fn_in_trait,
    reason = "futures are polled in place by an executor on the calling thread"
)]
pub trait Comm {
    type Error: fmt::Debug + fmt::Display;

    /// Writes the whole frame, then waits out the settling delay.
    async fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Fills `buffer` unless `timeout` elapses first, and returns how many bytes arrived.
    /// Zero means nothing did.
    async fn recv(&mut self, buffer: &mut [u8], timeout: Duration) -> Result<usize, Self::Error>;

    /// Must be harmless to call twice.
    async fn close(&mut self) -> Result<(), Self::Error>;
}
