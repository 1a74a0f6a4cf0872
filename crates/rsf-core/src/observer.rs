//! Reporting hooks for the recursion loop.
//!
//! Observers receive a read-only checkpoint every `report_every` iterations.
//! They cannot mutate the field or influence control flow, and
//! `ChannelObserver` hands snapshots to another thread without blocking.

use std::sync::mpsc::{self, Receiver, Sender};

use ndarray::{Array2, ArrayView2};

use crate::engine::IterationRecord;
use crate::modes::ModeMap;

/// Borrowed view of the engine after iteration `iteration` finished.
/// `record` holds the pre-update observation, `field` the post-update Φ.
pub struct Checkpoint<'a> {
    pub iteration: usize,
    pub record: &'a IterationRecord,
    pub field: ArrayView2<'a, f64>,
}

impl Checkpoint<'_> {
    pub fn to_snapshot(&self) -> FieldSnapshot {
        FieldSnapshot {
            iteration: self.iteration,
            coherence: self.record.coherence,
            coefficients: self.record.coefficients.clone(),
            field: self.field.to_owned(),
        }
    }
}

/// Owned copy of a checkpoint, safe to send across threads.
#[derive(Clone, Debug)]
pub struct FieldSnapshot {
    pub iteration: usize,
    pub coherence: f64,
    pub coefficients: ModeMap<f64>,
    pub field: Array2<f64>,
}

pub trait IterationObserver {
    fn observe(&mut self, checkpoint: &Checkpoint<'_>);
}

impl<F> IterationObserver for F
where
    F: FnMut(&Checkpoint<'_>),
{
    fn observe(&mut self, checkpoint: &Checkpoint<'_>) {
        self(checkpoint)
    }
}

pub struct NullObserver;

impl IterationObserver for NullObserver {
    fn observe(&mut self, _checkpoint: &Checkpoint<'_>) {}
}

/// Logs coherence and per-mode coefficients at info level.
pub struct TracingObserver;

impl IterationObserver for TracingObserver {
    fn observe(&mut self, checkpoint: &Checkpoint<'_>) {
        let coefficients: Vec<String> = checkpoint
            .record
            .coefficients
            .iter()
            .map(|(l, c)| format!("{l}:{c:.4}"))
            .collect();
        tracing::info!(
            iteration = checkpoint.iteration,
            coherence = %format!("{:.9}", checkpoint.record.coherence),
            coefficients = %coefficients.join(" "),
            "recursion checkpoint"
        );
    }
}

/// Queues snapshots on an unbounded channel. A dropped receiver is ignored.
pub struct ChannelObserver {
    tx: Sender<FieldSnapshot>,
}

impl ChannelObserver {
    pub fn channel() -> (Self, Receiver<FieldSnapshot>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl IterationObserver for ChannelObserver {
    fn observe(&mut self, checkpoint: &Checkpoint<'_>) {
        if self.tx.send(checkpoint.to_snapshot()).is_err() {
            tracing::trace!(iteration = checkpoint.iteration, "snapshot receiver gone");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> IterationRecord {
        IterationRecord {
            iteration: 3,
            coherence: 0.5,
            coefficients: [(3, 0.1), (6, -0.2)].into_iter().collect(),
        }
    }

    #[test]
    fn test_channel_observer_sends_owned_snapshot() {
        let (mut obs, rx) = ChannelObserver::channel();
        let rec = record();
        let field = Array2::from_elem((2, 3), -1.0);
        obs.observe(&Checkpoint {
            iteration: 3,
            record: &rec,
            field: field.view(),
        });
        let snap = rx.try_recv().unwrap();
        assert_eq!(snap.iteration, 3);
        assert_eq!(snap.field, field);
        assert_eq!(snap.coefficients.get(6), Some(&-0.2));
    }

    #[test]
    fn test_channel_observer_survives_dropped_receiver() {
        let (mut obs, rx) = ChannelObserver::channel();
        drop(rx);
        let rec = record();
        let field = Array2::zeros((1, 1));
        obs.observe(&Checkpoint {
            iteration: 1,
            record: &rec,
            field: field.view(),
        });
    }

    #[test]
    fn test_closure_observer() {
        let mut seen = Vec::new();
        {
            let mut obs = |cp: &Checkpoint<'_>| seen.push(cp.iteration);
            let rec = record();
            let field = Array2::zeros((1, 1));
            obs.observe(&Checkpoint {
                iteration: 9,
                record: &rec,
                field: field.view(),
            });
        }
        assert_eq!(seen, vec![9]);
    }
}
