use std::time::{Duration, Instant};

use folio_shared::{
    crossbeam_channel::{bounded, Receiver, Sender, TrySendError},
    log::trace,
};

/// Source of animation frames. The host calls [`FrameClock::present`] once per rendered frame
/// and every live [`FrameSubscription`] receives the frame time.
#[derive(Default)]
pub struct FrameClock {
    subscribers: Vec<Sender<Instant>>,
}

impl FrameClock {
    /// Frames a subscription buffers. Frames presented while its backlog is full are
    /// not delivered to it.
    pub const BACKLOG: usize = 240;

    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to the frames presented from now on.
    pub fn subscribe(&mut self) -> FrameSubscription {
        let (sender, receiver) = bounded(Self::BACKLOG);
        self.subscribers.push(sender);
        FrameSubscription { receiver }
    }

    /// Delivers a frame to all subscribers. Subscriptions that have been dropped are removed.
    pub fn present(&mut self, now: Instant) {
        let before = self.subscribers.len();
        self.subscribers
            .retain(|sender| !matches!(sender.try_send(now), Err(TrySendError::Disconnected(_))));
        let pruned = before - self.subscribers.len();
        if pruned > 0 {
            trace!("Removed {pruned} dropped frame subscription(s)");
        }
    }

    /// Number of subscriptions that were alive at the last presented frame.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// Receiving end of a [`FrameClock`] subscription. Dropping it ends the subscription.
pub struct FrameSubscription {
    receiver: Receiver<Instant>,
}

impl FrameSubscription {
    /// Returns the frame times that arrived since the last call.
    pub fn drain(&self) -> impl Iterator<Item = Instant> + '_ {
        self.receiver.try_iter()
    }
}

/// Counts frames in windows of [`FrameRateSampler::WINDOW`] and reports the frame rate
/// whenever a window completes.
#[derive(Debug, Clone)]
pub struct FrameRateSampler {
    window_start: Instant,
    frames: u32,
}

impl FrameRateSampler {
    pub const WINDOW: Duration = Duration::from_secs(1);

    pub fn new(start: Instant) -> Self {
        Self {
            window_start: start,
            frames: 0,
        }
    }

    /// Counts the frame at `now`. Returns the frame rate of the window if `now` completes it.
    pub fn record_frame(&mut self, now: Instant) -> Option<u32> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < Self::WINDOW {
            return None;
        }
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        let fps = (self.frames as f64 * 1000.0 / elapsed_ms).round() as u32;
        self.frames = 0;
        self.window_start = now;
        Some(fps)
    }
}
