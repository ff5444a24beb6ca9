//! Inter-arrival series derived from a group's event timestamps.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::events::EventRecord;

/// Why a group's records could not be turned into a series.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeriesError {
    #[error("group has no completed events")]
    Empty,

    #[error("event {file_name} has no usable START_TIME_epoc")]
    MissingEpoch { file_name: String },
}

/// One observation: the event time `ds` (epoch seconds) and the delay `y`
/// until the next event of the same source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub ds: f64,
    pub y: f64,
}

/// Inter-arrival durations of one source, ordered by event time.
///
/// The most recent event has no successor, so it contributes no point; its
/// time is kept as `reference_epoch`, the origin of the next forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedSeries {
    points: Vec<SeriesPoint>,
    reference_epoch: f64,
}

impl DerivedSeries {
    /// Build the series from a group's records. Records are stably sorted by
    /// start time, so ties keep their original row order.
    ///
    /// Fails for an empty group or when any record lacks a start time.
    pub fn from_events(events: &[EventRecord]) -> Result<Self, SeriesError> {
        let epochs = events
            .iter()
            .map(|e| {
                e.start_time_epoch.ok_or_else(|| SeriesError::MissingEpoch {
                    file_name: e.file_name.clone(),
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;
        Self::from_epochs(epochs).ok_or(SeriesError::Empty)
    }

    /// Build the series from raw event epochs in arbitrary order.
    pub fn from_epochs(epochs: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut epochs: Vec<f64> = epochs.into_iter().collect();
        epochs.sort_by(|a, b| a.total_cmp(b));

        let reference_epoch = *epochs.last()?;
        let points = epochs
            .windows(2)
            .map(|pair| SeriesPoint {
                ds: pair[0],
                y: pair[1] - pair[0],
            })
            .collect();

        Some(Self {
            points,
            reference_epoch,
        })
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Time of the most recent event.
    pub fn reference_epoch(&self) -> f64 {
        self.reference_epoch
    }

    /// Time of the earliest event.
    pub fn first_event_epoch(&self) -> f64 {
        self.points
            .first()
            .map(|p| p.ds)
            .unwrap_or(self.reference_epoch)
    }

    /// The first `n` points, as if the event after them were the latest.
    pub fn head(&self, n: usize) -> Self {
        let n = n.min(self.points.len());
        if n == 0 {
            return Self {
                points: Vec::new(),
                reference_epoch: self.first_event_epoch(),
            };
        }
        let last = self.points[n - 1];
        Self {
            points: self.points[..n].to_vec(),
            reference_epoch: last.ds + last.y,
        }
    }

    /// Event times this series was derived from, in order.
    pub fn event_epochs(&self) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| p.ds)
            .chain(std::iter::once(self.reference_epoch))
            .collect()
    }

    /// Merge another batch of observations into this history.
    ///
    /// Both series are expanded back to their event times, merged in time
    /// order and re-derived, so `other` may overlap or precede this series.
    /// An event time present in both counts as many times as the larger of
    /// its two multiplicities.
    pub fn concat(&self, other: &DerivedSeries) -> Self {
        let ours = self.event_epochs();
        let theirs = other.event_epochs();
        let mut merged = Vec::with_capacity(ours.len() + theirs.len());

        let (mut i, mut j) = (0, 0);
        while i < ours.len() && j < theirs.len() {
            match ours[i].total_cmp(&theirs[j]) {
                Ordering::Less => {
                    merged.push(ours[i]);
                    i += 1;
                }
                Ordering::Greater => {
                    merged.push(theirs[j]);
                    j += 1;
                }
                Ordering::Equal => {
                    merged.push(ours[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&ours[i..]);
        merged.extend_from_slice(&theirs[j..]);

        // Both inputs hold at least their reference event.
        Self::from_epochs(merged).unwrap_or_else(|| self.clone())
    }
}
