//! Serialization utilities for simulation state.

use crate::battle::BattleReport;
use crate::config::SimConfig;
use crate::error::SimResult;
use crate::world::Snapshot;

/// Serialize a snapshot to JSON bytes.
pub fn snapshot_to_json(snapshot: &Snapshot) -> SimResult<Vec<u8>> {
    Ok(serde_json::to_vec(snapshot)?)
}

/// Serialize a snapshot to a JSON string.
pub fn snapshot_to_json_string(snapshot: &Snapshot) -> SimResult<String> {
    Ok(serde_json::to_string(snapshot)?)
}

/// Deserialize a snapshot from a JSON string.
pub fn snapshot_from_json_string(data: &str) -> SimResult<Snapshot> {
    Ok(serde_json::from_str(data)?)
}

pub fn report_to_json_string(report: &BattleReport) -> SimResult<String> {
    Ok(serde_json::to_string(report)?)
}

/// Load a config from JSON and check it before use.
pub fn config_from_json_string(data: &str) -> SimResult<SimConfig> {
    let config: SimConfig = serde_json::from_str(data)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::{BattleResult, BattleStatus, Kills};
    use crate::components::{AnimPhase, Team};
    use crate::error::SimError;
    use crate::unit_data::UnitKind;
    use crate::world::{CosmeticEvent, EntityKind, EntitySnapshot};

    #[test]
    fn test_snapshot_roundtrip() {
        let snapshot = Snapshot {
            tick: 42,
            time: 0.7,
            status: BattleStatus::Fight,
            gold: 300,
            entities: vec![EntitySnapshot {
                id: 1,
                kind: EntityKind::Unit(UnitKind::Knight),
                team: Team::Alpha,
                x: 10.0,
                y: 20.0,
                z: 0.0,
                radius: 28.28,
                health_pct: 1.0,
                armor_pct: 0.5,
                facing: 0.0,
                anim: Some(AnimPhase::Attack { frame: 3 }),
            }],
            events: vec![CosmeticEvent::KillLabel {
                x: 1.0,
                y: 2.0,
                text: "+1".into(),
            }],
            report: None,
            summary_due: false,
        };

        let json = snapshot_to_json_string(&snapshot).unwrap();
        assert!(json.contains("Knight"));
        assert!(json.contains("KillLabel"));
        let restored = snapshot_from_json_string(&json).unwrap();

        assert_eq!(restored.tick, 42);
        assert_eq!(restored.entities, snapshot.entities);
        assert_eq!(restored.events, snapshot.events);
    }

    #[test]
    fn test_report_json_fields() {
        let report = BattleReport {
            result: BattleResult::Win,
            team_a_count: 3,
            team_b_count: 0,
            team_a_cost: 500,
            team_b_cost: 1000,
            kills: Kills { alpha: 10, bravo: 2 },
            team_a_begin_count: 5,
            team_b_begin_count: 10,
        };
        let json = report_to_json_string(&report).unwrap();
        assert!(json.contains("\"result\":\"Win\""));
        assert!(json.contains("\"team_b_begin_count\":10"));
    }

    #[test]
    fn test_config_from_json_validates() {
        let mut config = SimConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(config_from_json_string(&json).unwrap(), config);

        config.fixed_timestep = -1.0;
        let bad = serde_json::to_string(&config).unwrap();
        assert!(matches!(config_from_json_string(&bad), Err(SimError::InvalidConfig(_))));
        assert!(matches!(config_from_json_string("{"), Err(SimError::Serialization(_))));
    }
}
