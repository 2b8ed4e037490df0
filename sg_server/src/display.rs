//! Machine-readable display output.

use chrono::{DateTime, Utc};
use serde::Serialize;
use set_game::{DisplayEvent, DisplaySink};
use std::io::Write;

#[derive(Serialize)]
struct Record<'a> {
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    event: &'a DisplayEvent,
}

/// Writes each state-changing display event to stdout as one JSON object per
/// line. Clock and freeze ticks are dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonLinesDisplay;

impl JsonLinesDisplay {
    fn render(event: &DisplayEvent, timestamp: DateTime<Utc>) -> serde_json::Result<String> {
        serde_json::to_string(&Record { timestamp, event })
    }
}

impl DisplaySink for JsonLinesDisplay {
    fn publish(&self, event: DisplayEvent) {
        if event.is_tick() {
            return;
        }
        match Self::render(&event, Utc::now()) {
            Ok(line) => {
                let mut stdout = std::io::stdout().lock();
                if let Err(e) = writeln!(stdout, "{line}") {
                    log::warn!("Failed to write display event: {e}");
                }
            }
            Err(e) => log::warn!("Failed to serialize {event}: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_render_flattens_event() {
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let line =
            JsonLinesDisplay::render(&DisplayEvent::Score { seat: 1, score: 4 }, timestamp)
                .unwrap();

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["event"], "score");
        assert_eq!(value["seat"], 1);
        assert_eq!(value["score"], 4);
        assert_eq!(value["timestamp"], "2024-05-01T12:00:00Z");
    }
}
