/// `("a" OR "b") -is:retweet`: posts, reposts excluded, mentioning any
/// exchange of the group.
pub fn exchange_group_query(group: &[String]) -> String {
    let names = group
        .iter()
        .map(|exchange| format!("\"{}\"", exchange))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("({}) -is:retweet", names)
}

/// Plain-text ticker search, English only. No `$` prefix: the cashtag
/// operator is not available on every API tier.
pub fn ticker_query(ticker: &str) -> String {
    format!("{} -is:retweet lang:en", ticker)
}
