//! # Best-Result Selection
//!
//! Pure function over a complete [`ProbeSet`]; independent of the order in
//! which protocol tasks finished.
//!
//! 1. Among protocols whose WebSocket probe succeeded, the lowest WebSocket
//!    dial duration wins. Ties go to the earlier protocol in enumeration order.
//! 2. Otherwise the first connected protocol in [`Protocol::PRIORITY`].
//! 3. Otherwise the HTTP result, with `success == false`.

use shared_types::Protocol;

use super::result::{BestResult, ProbeSet};

pub fn select_best(set: &ProbeSet) -> BestResult {
    let fastest_ws = set
        .iter()
        .filter_map(|(protocol, result)| {
            result
                .websocket
                .as_ref()
                .filter(|ws| ws.success)
                .map(|ws| (ws.duration, protocol.index(), protocol))
        })
        .min()
        .map(|(_, _, protocol)| protocol);

    let connected = || {
        Protocol::PRIORITY
            .into_iter()
            .find(|p| set.get(*p).success)
    };

    let protocol = fastest_ws
        .or_else(connected)
        .unwrap_or(Protocol::ALL[0]);

    BestResult {
        protocol,
        result: set.get(protocol).clone(),
    }
}
