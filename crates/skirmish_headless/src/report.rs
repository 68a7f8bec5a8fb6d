//! Run summaries.
//!
//! Reports are printed as JSON on stdout and optionally written to a file.

use std::path::Path;

use serde::Serialize;
use skirmish_client::divergence::Divergence;
use skirmish_client::reconciler::ReconcileStats;
use skirmish_client::session::NetStats;
use skirmish_client::transport::LinkProfile;
use skirmish_client::victory::MatchStats;
use skirmish_core::team::{Team, TeamMap};

use crate::error::Result;

/// Outcome of an AI-vs-AI match in a single world.
#[derive(Debug, Clone, Serialize)]
pub struct SoloReport {
    /// Winning team, if the match ended.
    pub winner: Option<Team>,
    /// Match time simulated.
    pub duration_ms: u64,
    /// Whether the time limit stopped the match.
    pub timed_out: bool,
    /// Statistics from [`Team::Player`]'s point of view.
    pub stats: MatchStats,
    /// Live entities at the end.
    pub entities: usize,
    /// Final simulation hash.
    pub state_hash: u64,
}

/// Link traffic over a duel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    /// Messages put on the link.
    pub sent: u64,
    /// Messages delivered.
    pub delivered: u64,
    /// Messages still travelling when the report was taken.
    pub in_flight: usize,
}

/// Outcome of a match between two reconciling peers.
#[derive(Debug, Clone, Serialize)]
pub struct DuelReport {
    /// Link behaviour used.
    pub profile: LinkProfile,
    /// Winner as each peer sees it.
    pub winners: TeamMap<Option<Team>>,
    /// Whether both peers name the same winner.
    pub winners_agree: bool,
    /// Match time simulated, including the settle phase.
    pub duration_ms: u64,
    /// Whether the time limit stopped the match.
    pub timed_out: bool,
    /// Disagreement between the two worlds after traffic settled.
    pub divergence: Divergence,
    /// Per-peer statistics.
    pub stats: TeamMap<MatchStats>,
    /// Per-peer network counters.
    pub net: TeamMap<NetStats>,
    /// Per-peer reconciliation counters.
    pub reconcile: TeamMap<ReconcileStats>,
    /// Link counters.
    pub link: LinkReport,
}

/// Write `report` as pretty JSON, creating parent directories.
pub fn save<T: Serialize>(report: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("solo.json");
        let report = SoloReport {
            winner: Some(Team::Enemy),
            duration_ms: 1_000,
            timed_out: false,
            stats: MatchStats::default(),
            entities: 7,
            state_hash: 42,
        };
        save(&report, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["winner"], "enemy");
        assert_eq!(value["entities"], 7);
    }
}
