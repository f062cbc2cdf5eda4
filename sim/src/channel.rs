//! Deterministic unreliable transport.

use crate::rng::Rng;

/// A datagram channel with loss, latency and jitter, measured in ticks.
#[derive(Debug)]
pub struct LossyChannel {
    loss: f64,
    latency: u32,
    jitter: u32,
    in_flight: Vec<InFlight>,
}

#[derive(Debug)]
struct InFlight {
    deliver_at: f64,
    bytes: Vec<u8>,
}

/// Outcome of a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sent {
    Queued,
    Dropped,
}

impl LossyChannel {
    /// `loss` is a percentage in `[0, 100]`.
    pub fn new(loss: f64, latency: u32, jitter: u32) -> Self {
        Self {
            loss: (loss / 100.0).clamp(0.0, 1.0),
            latency,
            jitter,
            in_flight: Vec::new(),
        }
    }

    pub fn send(&mut self, now: f64, bytes: Vec<u8>, rng: &mut Rng) -> Sent {
        if rng.unit() < self.loss {
            return Sent::Dropped;
        }
        let jitter = if self.jitter == 0 {
            0.0
        } else {
            rng.unit() * f64::from(self.jitter)
        };
        self.in_flight.push(InFlight {
            deliver_at: now + f64::from(self.latency) + jitter,
            bytes,
        });
        Sent::Queued
    }

    /// Removes every datagram due at `now`, in arrival order.
    pub fn receive(&mut self, now: f64) -> Vec<Vec<u8>> {
        let mut due = Vec::new();
        let mut index = 0;
        while index < self.in_flight.len() {
            if self.in_flight[index].deliver_at <= now {
                due.push(self.in_flight.swap_remove(index));
            } else {
                index += 1;
            }
        }
        due.sort_by(|a, b| a.deliver_at.total_cmp(&b.deliver_at));
        due.into_iter().map(|packet| packet.bytes).collect()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}
