use chrono::{Duration, Utc};

/// `after:` date filter for a lookback window of `days`.
fn after_filter(days: u32) -> String {
    let start = Utc::now() - Duration::days(i64::from(days));
    format!("after:{}", start.format("%Y-%m-%d"))
}

/// Search query for messages mentioning a user in a channel.
pub fn mention_query(channel_id: &str, user_id: &str, days: u32) -> String {
    format!("in:<#{channel_id}> <@{user_id}> {}", after_filter(days))
}

/// Search query for messages containing a keyword in a channel.
pub fn keyword_query(channel_id: &str, keyword: &str, days: u32) -> String {
    format!("in:<#{channel_id}> {keyword} {}", after_filter(days))
}
