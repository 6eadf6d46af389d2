
/// ReplayDetector is the interface of sequence replay detector.
///
/// Detection is two-phase: `check` only inspects the window, `accept`
/// commits the last checked sequence number. Callers authenticate the
/// packet between the two calls so that a forged packet never moves the
/// window.
pub trait ReplayDetector {
    /// check returns true if the sequence number has not been seen and is
    /// still inside the window.
    fn check(&mut self, seq: u64) -> bool;
    /// accept marks the sequence number passed to the last `check` as received.
    fn accept(&mut self);
    /// latest returns the highest accepted sequence number.
    fn latest(&self) -> u64;
}

/// FixedBigInt is a fixed size bit field used as the replay window mask.
/// Bit 0 is the latest accepted sequence number.
#[derive(Debug, Clone)]
pub(crate) struct FixedBigInt {
    bits: Vec<u64>,
    n: usize,
    msb_mask: u64,
}

impl FixedBigInt {
    pub(crate) fn new(n: usize) -> Self {
        let chunk_size = n.div_ceil(64).max(1);
        let msb_mask = if n % 64 == 0 {
            u64::MAX
        } else {
            (1u64 << (n % 64)) - 1
        };

        FixedBigInt {
            bits: vec![0; chunk_size],
            n,
            msb_mask,
        }
    }

    /// lsh shifts the whole field left by n bits.
    pub(crate) fn lsh(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        let n_chunk = n / 64;
        let n_n = n % 64;
        let len = self.bits.len();

        for i in (0..len).rev() {
            if i < n_chunk {
                self.bits[i] = 0;
                continue;
            }
            let mut v = self.bits[i - n_chunk] << n_n;
            if n_n != 0 && i > n_chunk {
                v |= self.bits[i - n_chunk - 1] >> (64 - n_n);
            }
            self.bits[i] = v;
        }

        if let Some(last) = self.bits.last_mut() {
            *last &= self.msb_mask;
        }
    }

    pub(crate) fn bit(&self, i: usize) -> bool {
        if i >= self.n {
            return false;
        }
        (self.bits[i / 64] >> (i % 64)) & 1 == 1
    }

    pub(crate) fn set_bit(&mut self, i: usize) {
        if i >= self.n {
            return;
        }
        self.bits[i / 64] |= 1u64 << (i % 64);
    }
}

/// SlidingWindowDetector detects replay attacks over a sequence space that
/// never wraps, e.g. the 48-bit SRTP packet index or the 31-bit SRTCP index.
#[derive(Debug, Clone)]
pub struct SlidingWindowDetector {
    accepted: bool,
    seq: u64,
    latest_seq: u64,
    max_seq: u64,
    window_size: usize,
    mask: FixedBigInt,
}

impl SlidingWindowDetector {
    /// new creates a detector with the given window size and largest valid
    /// sequence number.
    pub fn new(window_size: usize, max_seq: u64) -> Self {
        SlidingWindowDetector {
            accepted: false,
            seq: 0,
            latest_seq: 0,
            max_seq,
            window_size,
            mask: FixedBigInt::new(window_size),
        }
    }
}

impl ReplayDetector for SlidingWindowDetector {
    fn check(&mut self, seq: u64) -> bool {
        self.accepted = false;

        if seq > self.max_seq {
            // Exceeded upper limit.
            return false;
        }

        if seq <= self.latest_seq {
            if self.latest_seq >= self.window_size as u64 + seq {
                // Older than the low edge of the window.
                return false;
            }
            if self.mask.bit((self.latest_seq - seq) as usize) {
                // The sequence number is duplicated.
                return false;
            }
        }

        self.accepted = true;
        self.seq = seq;
        true
    }

    fn accept(&mut self) {
        if !self.accepted {
            return;
        }

        if self.seq > self.latest_seq {
            // Update the head of the window.
            self.mask.lsh((self.seq - self.latest_seq) as usize);
            self.latest_seq = self.seq;
        }
        let diff = (self.latest_seq - self.seq) as usize;
        self.mask.set_bit(diff);
        self.accepted = false;
    }

    fn latest(&self) -> u64 {
        self.latest_seq
    }
}

/// NoOpReplayDetector accepts everything; used when replay protection is
/// explicitly disabled.
#[derive(Default, Debug, Clone)]
pub struct NoOpReplayDetector {
    seq: u64,
    latest_seq: u64,
}

impl ReplayDetector for NoOpReplayDetector {
    fn check(&mut self, seq: u64) -> bool {
        self.seq = seq;
        true
    }

    fn accept(&mut self) {
        if self.seq > self.latest_seq {
            self.latest_seq = self.seq;
        }
    }

    fn latest(&self) -> u64 {
        self.latest_seq
    }
}
