use crate::buffer::frame::{FrameHeader, FrameId};

/// Frame handed out by [`ClockReplacer::victim`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Victim {
    /// The frame holds no page and can be used as is.
    Free(FrameId),
    /// The frame holds an unpinned page that must be written back (if dirty)
    /// and unmapped before reuse.
    Evict(FrameId),
}

impl Victim {
    pub fn frame_id(&self) -> FrameId {
        match self {
            Victim::Free(frame_id) | Victim::Evict(frame_id) => *frame_id,
        }
    }
}

/// Second-chance replacement over a fixed frame table.
///
/// The hand starts on the last frame so the first scan looks at frame 0.
pub struct ClockReplacer {
    hand: usize,
    num_frames: usize,
}

impl ClockReplacer {
    pub fn new(num_frames: usize) -> Self {
        assert!(num_frames > 0, "clock needs at least one frame");

        ClockReplacer {
            hand: num_frames - 1,
            num_frames,
        }
    }

    pub fn hand(&self) -> FrameId {
        self.hand as FrameId
    }

    fn advance(&mut self) {
        self.hand = (self.hand + 1) % self.num_frames;
    }

    /// Sweeps the clock until it finds a usable frame.
    ///
    /// Checks run in a fixed order at every stop: invalid, unpinned, referenced.
    /// A referenced frame loses its bit and is passed over without counting
    /// against the sweep. A pinned frame without a reference bit counts as one
    /// failed attempt; once failures exceed the number of frames the sweep gives
    /// up and returns `None`.
    pub fn victim(&mut self, frames: &mut [FrameHeader]) -> Option<Victim> {
        debug_assert_eq!(frames.len(), self.num_frames);

        let mut failed = 0;
        while failed <= self.num_frames {
            self.advance();
            let frame = &mut frames[self.hand];

            if !frame.valid {
                return Some(Victim::Free(frame.frame_id));
            }
            if frame.is_evictable() {
                return Some(Victim::Evict(frame.frame_id));
            }
            if frame.ref_bit {
                frame.ref_bit = false;
                continue;
            }

            failed += 1;
        }

        None
    }
}
