use std::collections::VecDeque;

use serde::Serialize;

pub const DEFAULT_CAPACITY: usize = 60;

/// Fixed-size FIFO history. Starts pre-filled with `T::default()` so its
/// length is always exactly `capacity`.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    values: VecDeque<T>,
    capacity: usize,
}

impl<T: Copy + Default> RollingWindow<T> {
    /// Returns `None` for a zero capacity.
    pub fn new(capacity: usize) -> Option<Self> {
        if capacity == 0 {
            return None;
        }
        let mut values = VecDeque::with_capacity(capacity);
        values.resize(capacity, T::default());
        Some(Self { values, capacity })
    }

    pub fn push(&mut self, value: T) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Oldest-first copy of the window.
    pub fn snapshot(&self) -> Vec<T> {
        self.values.iter().copied().collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Copy + Default> Default for RollingWindow<T> {
    fn default() -> Self {
        let mut values = VecDeque::with_capacity(DEFAULT_CAPACITY);
        values.resize(DEFAULT_CAPACITY, T::default());
        Self {
            values,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Read-only copy of the three chart series for one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistorySeries {
    pub cpu: Vec<f64>,
    pub memory: Vec<f64>,
    pub network: Vec<f64>,
}

/// The sampler's chart histories. Pushes always go CPU, memory, network.
#[derive(Debug, Clone, Default)]
pub struct HistorySet {
    cpu: RollingWindow<f64>,
    memory: RollingWindow<f64>,
    network: RollingWindow<f64>,
}

impl HistorySet {
    pub fn new(capacity: usize) -> Option<Self> {
        Some(Self {
            cpu: RollingWindow::new(capacity)?,
            memory: RollingWindow::new(capacity)?,
            network: RollingWindow::new(capacity)?,
        })
    }

    pub fn record(&mut self, cpu_percent: f64, memory_percent: f64, network_percent: f64) {
        self.cpu.push(cpu_percent);
        self.memory.push(memory_percent);
        self.network.push(network_percent);
    }

    pub fn series(&self) -> HistorySeries {
        HistorySeries {
            cpu: self.cpu.snapshot(),
            memory: self.memory.snapshot(),
            network: self.network.snapshot(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.cpu.capacity()
    }
}
