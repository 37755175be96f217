use crate::types::Expression;
use std::sync::{Arc, Mutex, MutexGuard};

/// One timestamped snapshot of all sensor and tracking outputs.
///
/// Three frames exist at all times: the background frame (written by the
/// capture thread), the mid frame (the handoff slot), and the foreground
/// frame (read by the consumer). Ownership rotates by `Box` swap, never by
/// copy, so buffers keep their allocations across the pipeline.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Monotonic sequence number assigned by the capture thread.
    pub number: u64,
    /// RGBA color image, width * height * 4 bytes.
    pub color: Vec<u8>,
    /// Depth image, width * height bytes.
    pub depth: Vec<u8>,
    /// 3D scan preview image, RGBA, sized by the scanning module.
    pub scan_preview: Vec<u8>,
    /// Dimensions of `scan_preview`; travels with the frame because the
    /// scanning module can change the preview size at any time.
    pub scan_size: (u32, u32),
    /// Number of faces detected by the tracking module.
    pub head_count: u32,
    /// Head center of the first detected face.
    pub head_position: [f32; 3],
    /// [pitch, yaw, roll] in degrees of the first detected face.
    pub head_rotation: [f32; 3],
    /// Expression values of the first detected face.
    pub expression: Expression,
}

/// The shared mid slot. The mutex is held only for the duration of a swap
/// (or a controller-side resize while the capture thread is stopped);
/// buffer contents are never read or written under contention.
pub(crate) struct MidSlot {
    frame: Mutex<Box<Frame>>,
}

impl MidSlot {
    fn lock(&self) -> MutexGuard<'_, Box<Frame>> {
        match self.frame.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Producer half of the triple buffer, owned by the capture thread while
/// it runs and returned to the controller on join.
pub struct FrameProducer {
    background: Box<Frame>,
    mid: Arc<MidSlot>,
}

impl FrameProducer {
    /// Exclusive access to the background frame. No lock is taken; the
    /// background frame belongs to the producer alone.
    pub fn background_mut(&mut self) -> &mut Frame {
        &mut self.background
    }

    /// Publish the background frame: swap it with the mid slot. The
    /// previous mid frame becomes the new background for the next
    /// iteration. An unconsumed mid frame is overwritten (dropped frame);
    /// there is no queueing or backpressure.
    pub fn publish(&mut self) {
        let mut mid = self.mid.lock();
        std::mem::swap(&mut self.background, &mut *mid);
    }

    /// Run `f` against the mid frame under the lock. Used by the
    /// controller for buffer resizes while the capture thread is stopped.
    pub(crate) fn with_mid(&self, f: impl FnOnce(&mut Frame)) {
        let mut mid = self.mid.lock();
        f(&mut mid);
    }
}

/// Consumer half of the triple buffer. Single consumer only.
pub struct FrameConsumer {
    foreground: Box<Frame>,
    mid: Arc<MidSlot>,
}

impl FrameConsumer {
    /// Swap mid and foreground, but only if the mid frame is newer.
    /// Returns whether a newer frame arrived. A no-op swap leaves the
    /// foreground buffer untouched, so consumed frame numbers never
    /// regress.
    pub fn consume(&mut self) -> bool {
        let mut mid = self.mid.lock();
        if self.foreground.number < mid.number {
            std::mem::swap(&mut self.foreground, &mut *mid);
            true
        } else {
            false
        }
    }

    /// The foreground frame, stable until the next `consume` call.
    pub fn frame(&self) -> &Frame {
        &self.foreground
    }

    pub(crate) fn frame_mut(&mut self) -> &mut Frame {
        &mut self.foreground
    }
}

/// Build a triple buffer from a template frame (all three slots start as
/// clones, so pre-sized image buffers carry over).
pub(crate) fn triple(template: Frame) -> (FrameProducer, FrameConsumer) {
    let mid = Arc::new(MidSlot {
        frame: Mutex::new(Box::new(template.clone())),
    });
    let producer = FrameProducer {
        background: Box::new(template.clone()),
        mid: mid.clone(),
    };
    let consumer = FrameConsumer {
        foreground: Box::new(template),
        mid,
    };
    (producer, consumer)
}
