/// Errors reported by the sleep driver and its collaborators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WwdError {
    /// The host RTOS couldn't allocate the settling timer.
    TimerAlloc,
    /// The settling timer couldn't be initialized.
    TimerInit,
    /// The settling timer couldn't be started.
    TimerStart,
    /// The firmware event dispatcher refused the subscription.
    EventRegistration,
    /// The firmware rejected an iovar write.
    Command {
        /// Name of the iovar, that was written.
        iovar: &'static str,
        /// Status code returned by the firmware.
        code: i32,
    },
    /// The payload for an iovar doesn't fit into the command buffer.
    BufferTooSmall,
    /// A bus transport operation failed with the contained status code.
    Bus(i32),
}

pub type WwdResult<T> = Result<T, WwdError>;
