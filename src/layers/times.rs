// SPDX-License-Identifier: BSD-3-Clause
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use rustc_hash::FxHashMap;
use tracing::{Id, Subscriber};
use tracing_subscriber::{layer::Context, registry::LookupSpan, Layer};

/// Times spent in one kind of span.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SpanTime {
    pub count: u64,
    pub total: Duration,
}

/// Accumulates, per span name, how often spans were entered and how long
/// they stayed entered. Clones share the same totals, so keep one to read the
/// report after installing another in a subscriber.
#[derive(Clone, Debug, Default)]
pub struct SpanTimes {
    times: Arc<Mutex<FxHashMap<&'static str, SpanTime>>>,
}

impl SpanTimes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Totals so far, sorted by span name.
    pub fn report(&self) -> Vec<(&'static str, SpanTime)> {
        let mut report: Vec<(&'static str, SpanTime)> = match self.times.lock() {
            Ok(times) => times.iter().map(|(k, v)| (*k, *v)).collect(),
            Err(_) => Vec::new(),
        };
        report.sort_unstable_by_key(|(name, _)| *name);
        report
    }
}

impl<S> Layer<S> for SpanTimes
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_enter(&self, id: &Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(SystemTime::now());
        }
    }

    fn on_exit(&self, id: &Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            if let Some(time) = span.extensions().get::<SystemTime>() {
                let elapsed = time.elapsed().unwrap_or(Duration::ZERO);
                if let Ok(mut times) = self.times.lock() {
                    let entry = times.entry(span.name()).or_default();
                    entry.count += 1;
                    entry.total += elapsed;
                }
            }
        }
    }
}
