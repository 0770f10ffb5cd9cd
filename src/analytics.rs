//! In-process analytics sink: hourly traffic, counters, response times.

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike};
use std::collections::{HashMap, VecDeque};

/// Rotated days kept for the hourly histogram.
const HISTORY_DAYS: usize = 30;
/// Rolling window of response-time samples.
const RESPONSE_WINDOW: usize = 1000;

/// One handled message.
#[derive(Debug, Clone)]
pub struct Sample<'a> {
    pub sender: &'a str,
    pub intent: &'a str,
    pub handler: &'a str,
    pub response_ms: u64,
    /// Local time the message arrived.
    pub at: DateTime<FixedOffset>,
}

#[derive(Debug, Default)]
pub struct Analytics {
    today: Option<NaiveDate>,
    hourly: [u64; 24],
    history: VecDeque<(NaiveDate, [u64; 24])>,
    per_sender: HashMap<String, u64>,
    intents: HashMap<String, u64>,
    handlers: HashMap<String, u64>,
    response_times: VecDeque<u64>,
    last_handler: Option<String>,
}

/// Read-only copy of the counters.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub total: u64,
    pub today_hourly: [u64; 24],
    pub days_kept: usize,
    pub per_sender: HashMap<String, u64>,
    pub intents: HashMap<String, u64>,
    pub handlers: HashMap<String, u64>,
    pub avg_response_ms: Option<u64>,
    pub last_handler: Option<String>,
}

impl Snapshot {
    /// Busiest local hour today, if any traffic.
    pub fn peak_hour(&self) -> Option<usize> {
        let (hour, count) = self
            .today_hourly
            .iter()
            .enumerate()
            .max_by_key(|(h, c)| (**c, std::cmp::Reverse(*h)))?;
        (*count > 0).then_some(hour)
    }

    fn top(map: &HashMap<String, u64>, n: usize) -> Vec<(String, u64)> {
        let mut v: Vec<(String, u64)> = map.iter().map(|(k, c)| (k.clone(), *c)).collect();
        v.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        v.truncate(n);
        v
    }

    pub fn top_intents(&self, n: usize) -> Vec<(String, u64)> {
        Self::top(&self.intents, n)
    }

    pub fn top_handlers(&self, n: usize) -> Vec<(String, u64)> {
        Self::top(&self.handlers, n)
    }
}

impl Analytics {
    pub fn new() -> Self {
        Self::default()
    }

    fn rotate(&mut self, date: NaiveDate) {
        match self.today {
            Some(today) if today == date => {}
            Some(today) => {
                self.history.push_back((today, self.hourly));
                while self.history.len() > HISTORY_DAYS {
                    self.history.pop_front();
                }
                self.hourly = [0; 24];
                self.today = Some(date);
            }
            None => self.today = Some(date),
        }
    }

    pub fn record(&mut self, sample: Sample<'_>) {
        self.rotate(sample.at.date_naive());
        self.hourly[sample.at.hour() as usize] += 1;

        *self.per_sender.entry(sample.sender.to_string()).or_default() += 1;
        *self.intents.entry(sample.intent.to_string()).or_default() += 1;
        *self.handlers.entry(sample.handler.to_string()).or_default() += 1;

        self.response_times.push_back(sample.response_ms);
        while self.response_times.len() > RESPONSE_WINDOW {
            self.response_times.pop_front();
        }
        self.last_handler = Some(sample.handler.to_string());
    }

    pub fn snapshot(&self) -> Snapshot {
        let avg_response_ms = (!self.response_times.is_empty()).then(|| {
            self.response_times.iter().sum::<u64>() / self.response_times.len() as u64
        });
        Snapshot {
            total: self.per_sender.values().sum(),
            today_hourly: self.hourly,
            days_kept: self.history.len(),
            per_sender: self.per_sender.clone(),
            intents: self.intents.clone(),
            handlers: self.handlers.clone(),
            avg_response_ms,
            last_handler: self.last_handler.clone(),
        }
    }
}
