use techflow_core::LogRecord;

/// Returns the support chat logs shown on the demo dashboard.
pub fn demo_logs() -> Vec<LogRecord> {
    [
        ("1", "Mario R.", "10:05", "My X-2000 won't turn on after the update."),
        (
            "2",
            "Giulia V.",
            "10:12",
            "Fantastic service, thanks for solving it quickly!",
        ),
        (
            "3",
            "Luca B.",
            "10:30",
            "Continuous E-500 error, the device is burning hot. I am worried.",
        ),
        ("4", "Elena S.", "11:05", "I can't find the manual in Italian."),
        (
            "5",
            "Paolo D.",
            "11:45",
            "I've been waiting for a reply for 20 minutes, this is absurd.",
        ),
        (
            "6",
            "Sara M.",
            "12:10",
            "The red LED is flashing, what does it mean?",
        ),
    ]
    .into_iter()
    .map(|(id, customer, timestamp, message)| {
        LogRecord::new(id, customer, timestamp, message)
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use techflow_core::analysis::serialize_logs;

    use super::*;

    #[test]
    fn test_demo_logs() {
        let logs = demo_logs();
        assert_eq!(logs.len(), 6);

        let ids: HashSet<_> = logs.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids.len(), logs.len());

        let block = serialize_logs(&logs);
        assert_eq!(
            block.lines().next(),
            Some("[10:05] Mario R.: My X-2000 won't turn on after the update.")
        );
        assert_eq!(
            block.lines().last(),
            Some("[12:10] Sara M.: The red LED is flashing, what does it mean?")
        );
    }
}
