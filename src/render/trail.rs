use std::collections::VecDeque;

/// The most recent samples of a wave, newest first.
#[derive(Clone, Debug)]
pub struct WaveTrail {
    capacity: usize,
    points: VecDeque<f64>,
}

impl WaveTrail {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, points: VecDeque::with_capacity(capacity) }
    }

    pub fn push(&mut self, y: f64) {
        if self.capacity == 0 {
            return;
        }
        self.points.push_front(y);
        self.points.truncate(self.capacity);
    }

    pub fn points(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}
