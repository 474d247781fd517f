use portable_atomic::{AtomicU8, Ordering};

/// Host side bookkeeping of the SDPCM channel.
///
/// The firmware loses track of our sequence numbers, when it goes through DS1, so these have to
/// be reset before any traffic is exchanged after waking up.
///
/// Flow control works through a credit, which the firmware grants by sending us the highest
/// sequence number we may use. We are allowed to transmit, as long as our next sequence number
/// is "behind" that maximum, using wrapping arithmetic.
pub struct SdpcmBusVars {
    tx_seq: AtomicU8,
    tx_seq_max: AtomicU8,
    last_rx_seq: AtomicU8,
}
impl SdpcmBusVars {
    const INITIAL_TX_SEQ: u8 = 0;
    const INITIAL_TX_SEQ_MAX: u8 = 1;
    const INITIAL_LAST_RX_SEQ: u8 = 0xff;

    pub const fn new() -> Self {
        Self {
            tx_seq: AtomicU8::new(Self::INITIAL_TX_SEQ),
            tx_seq_max: AtomicU8::new(Self::INITIAL_TX_SEQ_MAX),
            last_rx_seq: AtomicU8::new(Self::INITIAL_LAST_RX_SEQ),
        }
    }
    /// Reset everything to the state after power on.
    pub fn reset(&self) {
        trace!("Resetting SDPCM bus vars.");
        self.tx_seq.store(Self::INITIAL_TX_SEQ, Ordering::Relaxed);
        self.tx_seq_max
            .store(Self::INITIAL_TX_SEQ_MAX, Ordering::Relaxed);
        self.last_rx_seq
            .store(Self::INITIAL_LAST_RX_SEQ, Ordering::Relaxed);
    }
    /// Take the next TX sequence number.
    pub fn next_tx_seq(&self) -> u8 {
        self.tx_seq.fetch_add(1, Ordering::Relaxed)
    }
    /// Returns the TX sequence number, that will be used next.
    pub fn tx_seq(&self) -> u8 {
        self.tx_seq.load(Ordering::Relaxed)
    }
    /// Check if the firmware granted us credit for another frame.
    pub fn has_credit(&self) -> bool {
        let seq = self.tx_seq.load(Ordering::Relaxed);
        let max = self.tx_seq_max.load(Ordering::Relaxed);
        seq != max && max.wrapping_sub(seq) & 0x80 == 0
    }
    /// Update the credit from a received SDPCM header.
    pub fn update_credit(&self, tx_seq_max: u8) {
        let seq = self.tx_seq.load(Ordering::Relaxed);
        // Bogus credit, that would let us lap the firmware.
        let tx_seq_max = if tx_seq_max.wrapping_sub(seq) > 0x40 {
            seq.wrapping_add(2)
        } else {
            tx_seq_max
        };
        self.tx_seq_max.store(tx_seq_max, Ordering::Relaxed);
    }
    /// Record the sequence number of a received frame.
    ///
    /// Returns `false`, if frames were lost in between.
    pub fn note_rx_seq(&self, seq: u8) -> bool {
        let last = self.last_rx_seq.swap(seq, Ordering::Relaxed);
        let in_order = last.wrapping_add(1) == seq;
        if !in_order {
            debug!("SDPCM RX sequence gap. Expected {}, got {}.", last.wrapping_add(1), seq);
        }
        in_order
    }
}
impl Default for SdpcmBusVars {
    fn default() -> Self {
        Self::new()
    }
}
