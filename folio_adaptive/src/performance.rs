use std::time::Instant;

use folio_shared::{
    log::{info, warn},
    EventQueue,
};

use crate::{classify, quality_settings, Classification, DeviceProfile, FrameClock, FrameRateSampler, FrameSubscription, PerformanceTier, QualitySettings};

/// Frame rates below this threshold downgrade the tier to [`PerformanceTier::Low`].
pub const MIN_ACCEPTABLE_FPS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PerformanceEvent {
    /// The tier moved down. `fps` is the frame rate that caused the downgrade.
    TierChanged {
        from: PerformanceTier,
        to: PerformanceTier,
        fps: u32,
    },
}

/// Keeps track of the [`PerformanceTier`] of the running device.
///
/// The tier starts at the result of the device classification and is re-evaluated
/// every time a frame-rate window completes. It only ever moves down.
pub struct PerformanceMonitor {
    classification: Classification,
    tier: PerformanceTier,
    sampler: FrameRateSampler,
    subscription: FrameSubscription,
    last_fps: Option<u32>,
    events: EventQueue<PerformanceEvent>,
}

impl PerformanceMonitor {
    /// Classifies the device and starts sampling the frames of `frame_clock`.
    pub fn start(profile: &DeviceProfile, frame_clock: &mut FrameClock, now: Instant) -> Self {
        let classification = classify(profile);
        match classification.rule {
            Some(rule) => info!("Classified the device as '{}' ({rule})", classification.tier),
            None => info!("Classified the device as '{}'", classification.tier),
        }
        Self {
            classification,
            tier: classification.tier,
            sampler: FrameRateSampler::new(now),
            subscription: frame_clock.subscribe(),
            last_fps: None,
            events: EventQueue::new(),
        }
    }

    /// Processes the frames presented since the last update and returns the current tier.
    ///
    /// Call it at least once every [`FrameClock::BACKLOG`] frames. Frames beyond the
    /// backlog are lost and lower the measured frame rate.
    pub fn update(&mut self) -> PerformanceTier {
        let frames = self.subscription.drain().collect::<Vec<_>>();
        for frame in frames {
            if let Some(fps) = self.sampler.record_frame(frame) {
                self.last_fps = Some(fps);
                self.evaluate(fps);
            }
        }
        self.tier
    }

    fn evaluate(&mut self, fps: u32) {
        if fps >= MIN_ACCEPTABLE_FPS || self.tier == PerformanceTier::Low {
            return;
        }
        let from = self.tier;
        self.tier = from.downgraded_to(PerformanceTier::Low);
        warn!("Frame rate dropped to {fps} fps. Switching from '{from}' to '{}' quality", self.tier);
        self.events.push(PerformanceEvent::TierChanged { from, to: self.tier, fps });
    }

    pub fn tier(&self) -> PerformanceTier {
        self.tier
    }

    /// Rendering parameters for the current tier.
    pub fn quality_settings(&self) -> QualitySettings {
        quality_settings(self.tier)
    }

    /// The initial device classification.
    pub fn classification(&self) -> Classification {
        self.classification
    }

    /// Frame rate of the last completed window.
    pub fn last_fps(&self) -> Option<u32> {
        self.last_fps
    }

    /// Takes the events that occurred since the last call.
    pub fn take_events(&mut self) -> EventQueue<PerformanceEvent> {
        self.events.take()
    }
}
