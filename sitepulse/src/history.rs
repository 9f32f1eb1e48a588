//! Bounded sample history for the live charts, and the adapters that turn it
//! into fixed-width chart series.

use std::collections::VecDeque;

use crate::types::Sample;

/// Samples kept per dashboard (one minute at the agent's 1 Hz rate).
pub const DEFAULT_CAPACITY: usize = 60;

pub fn push_capped<T>(dq: &mut VecDeque<T>, v: T, cap: usize) {
    if cap == 0 {
        return;
    }
    if dq.len() == cap {
        dq.pop_front();
    }
    dq.push_back(v);
}

/// Fixed-capacity FIFO of stamped samples, oldest first.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: VecDeque<Sample>,
    cap: usize,
}

impl SampleBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(cap),
            cap,
        }
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Evicts the oldest sample when full, then appends. Receipt times never
    /// go backwards: a sample stamped before the newest one takes its time.
    pub fn append(&mut self, mut sample: Sample) {
        if let Some(last) = self.samples.back() {
            if sample.received_at < last.received_at {
                sample.received_at = last.received_at;
            }
        }
        push_capped(&mut self.samples, sample, self.cap);
    }

    /// Read-only view in insertion order.
    pub fn snapshot(&self) -> impl ExactSizeIterator<Item = &Sample> + DoubleEndedIterator + '_ {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// Right-align the newest `width` values, padding the left with gaps.
fn padded<F>(buf: &SampleBuffer, width: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&Sample) -> Option<f64>,
{
    let take = buf.len().min(width);
    let mut out = vec![None; width - take];
    out.extend(buf.snapshot().skip(buf.len() - take).map(f));
    out
}

/// CPU percent per slot, clamped to 0..=100 for display.
pub fn cpu_series(buf: &SampleBuffer, width: usize) -> Vec<Option<f64>> {
    padded(buf, width, |s| {
        let v = s.cpu_percent;
        v.is_finite().then(|| f64::from(v.clamp(0.0, 100.0)))
    })
}

/// Used memory percent per slot; inconsistent samples become gaps.
pub fn mem_used_series(buf: &SampleBuffer, width: usize) -> Vec<Option<f64>> {
    padded(buf, width, |s| {
        let used = s.mem_used_bytes()?;
        if s.mem_total_bytes == 0 {
            return None;
        }
        Some(used as f64 / s.mem_total_bytes as f64 * 100.0)
    })
}
