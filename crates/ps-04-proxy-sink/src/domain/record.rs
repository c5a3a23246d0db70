use chrono::{DateTime, Utc};
use ps_03_proxy_prober::BestResult;
use shared_types::{Candidate, TestRecord};

/// Persisted form of a selected probe result.
pub fn to_record(candidate: &Candidate, best: &BestResult, tested_at: DateTime<Utc>) -> TestRecord {
    TestRecord {
        ip: candidate.ip().to_string(),
        port: candidate.port(),
        protocol: best.protocol,
        tested_at,
        websocket_supported: best.result.websocket_succeeded(),
        anonymous: !best.result.exposes_ip,
        fetch_succeeded: best.result.fetch_success,
        delay: best.result.duration,
        provider: candidate.origin().to_string(),
        error: best.result.error.clone(),
    }
}
