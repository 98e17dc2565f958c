use std::cmp::min;
use std::time::Duration;

/// Cost of a route one hop further than `cost`, capped at `infinity`
///
/// # Arguments
///
/// * `cost`: the cost advertised by the neighbour
/// * `infinity`: the unreachable sentinel
///
/// returns: u16
///
/// # Examples
///
/// ```
/// assert_eq!(dvroute::util::hop_cost(2, 16), 3);
/// assert_eq!(dvroute::util::hop_cost(15, 16), 16);
/// assert_eq!(dvroute::util::hop_cost(16, 16), 16);
/// assert_eq!(dvroute::util::hop_cost(u16::MAX, 16), 16);
/// ```
pub fn hop_cost(cost: u16, infinity: u16) -> u16 {
    min(cost.saturating_add(1), infinity)
}

/// Time elapsed between `since` and `now`, zero if `since` lies in the future
pub fn elapsed(now: Duration, since: Duration) -> Duration {
    now.saturating_sub(since)
}
