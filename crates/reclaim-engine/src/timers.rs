//! Deferred actions for the orchestrator.
//!
//! Timers are never cancelled. A sequence that leaves `Active` simply makes
//! its remaining timers no-ops when they come due (check on fire).

use std::{cmp::Reverse, collections::BinaryHeap};

use chrono::{DateTime, Utc};
use reclaim_core::sequence::{MessageKind, SequenceId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerAction {
  /// Dispatch one message of a sequence.
  Fire { sequence: SequenceId, kind: MessageKind },
  /// Drop a finished sequence from the index.
  Retire { sequence: SequenceId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Timer {
  due_at: DateTime<Utc>,
  /// Insertion order; keeps equal deadlines first-in first-out.
  seq_no: u64,
  action: TimerAction,
}

impl Ord for Timer {
  fn cmp(&self, other: &Self) -> std::cmp::Ordering {
    (self.due_at, self.seq_no).cmp(&(other.due_at, other.seq_no))
  }
}

impl PartialOrd for Timer {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> { Some(self.cmp(other)) }
}

#[derive(Debug, Default)]
pub struct TimerQueue {
  heap:    BinaryHeap<Reverse<Timer>>,
  next_no: u64,
}

impl TimerQueue {
  pub fn new() -> Self { Self::default() }

  pub fn schedule(&mut self, due_at: DateTime<Utc>, action: TimerAction) {
    let seq_no = self.next_no;
    self.next_no += 1;
    self.heap.push(Reverse(Timer { due_at, seq_no, action }));
  }

  /// The earliest pending deadline.
  pub fn next_due(&self) -> Option<DateTime<Utc>> {
    self.heap.peek().map(|Reverse(t)| t.due_at)
  }

  /// Remove and return the earliest action if it is due at `now`.
  pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<TimerAction> {
    if self.next_due()? > now {
      return None;
    }
    self.heap.pop().map(|Reverse(t)| t.action)
  }

  pub fn len(&self) -> usize { self.heap.len() }

  pub fn is_empty(&self) -> bool { self.heap.is_empty() }
}
