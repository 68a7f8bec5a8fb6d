//! Every action tag decodes from the JSON shape peers put on the wire.

use skirmish_core::components::EntityId;
use skirmish_core::entity_kind::{BuildingKind, UnitKind};
use skirmish_core::team::Team;
use skirmish_protocol::{Action, ActionEnvelope, ProtocolError};

const SAMPLES: [&str; 16] = [
    concat!(
        r#"{"action":"unitMove","#,
        r#""data":{"unitId":"u1","destination":{"x":100,"y":200},"team":"enemy"}}"#,
    ),
    r#"{"action":"attackMove","data":{"unitId":"u1","destination":{"x":1,"y":2},"team":"enemy"}}"#,
    r#"{"action":"attack","data":{"attackerId":"u1","targetId":"u2","team":"enemy"}}"#,
    concat!(
        r#"{"action":"attackPerformed","#,
        r#""data":{"attackerId":"u1","targetId":"u2","team":"enemy","timestamp":10}}"#,
    ),
    concat!(
        r#"{"action":"unitDamage","#,
        r#""data":{"targetId":"u2","damage":25,"newHealth":55,"team":"player"}}"#,
    ),
    concat!(
        r#"{"action":"turretDamage","#,
        r#""data":{"turretId":"t1","targetId":"u2","damage":20,"#,
        r#""targetTeam":"player","timestamp":10}}"#,
    ),
    r#"{"action":"turretTarget","data":{"turretId":"t1","targetId":"u2","team":"enemy"}}"#,
    r#"{"action":"turretAttack","data":{"turretId":"t1","targetId":"u2"}}"#,
    concat!(
        r#"{"action":"buildingPlace","#,
        r#""data":{"type":"Barracks","position":{"x":460,"y":800},"#,
        r#""team":"player","buildingId":"b1"}}"#,
    ),
    concat!(
        r#"{"action":"buildingQueue","#,
        r#""data":{"type":"Reactor","position":{"x":380,"y":939},"team":"player"}}"#,
    ),
    concat!(
        r#"{"action":"buildingStart","#,
        r#""data":{"buildingId":"b2","team":"player","#,
        r#""type":"Reactor","position":{"x":380,"y":939}}}"#,
    ),
    r#"{"action":"buildingComplete","data":{"buildingId":"b1","team":"player"}}"#,
    r#"{"action":"buildingCancel","data":{"buildingId":"b2","team":"player"}}"#,
    r#"{"action":"unitProduce","data":{"unitType":"Warthog","buildingId":"b1","team":"player"}}"#,
    concat!(
        r#"{"action":"unitSpawn","#,
        r#""data":{"unitType":"Marine","position":{"x":460,"y":867},"#,
        r#""team":"player","unitId":"u9","buildingId":"b1"}}"#,
    ),
    r#"{"action":"positionSync","data":{"units":[{"id":"u1","x":5,"y":6,"team":"enemy"}]}}"#,
];

#[test]
fn every_tag_decodes() {
    for (sample, tag) in SAMPLES.iter().zip(Action::TAGS) {
        let envelope = ActionEnvelope::decode(sample).unwrap_or_else(|e| panic!("{tag}: {e}"));
        assert_eq!(envelope.action.tag(), tag);
    }
}

#[test]
fn decoded_fields_survive_reencoding() {
    let envelope = ActionEnvelope::decode(SAMPLES[14]).unwrap();
    let Action::UnitSpawn(spawn) = &envelope.action else {
        panic!("expected unitSpawn");
    };
    assert_eq!(spawn.unit_type, UnitKind::Marine);
    assert_eq!(spawn.unit_id, EntityId::from("u9"));
    assert_eq!(spawn.team, Team::Player);

    let again = ActionEnvelope::decode(&envelope.encode().unwrap()).unwrap();
    assert_eq!(again, envelope);
}

#[test]
fn queued_building_keeps_type_and_position() {
    let envelope = ActionEnvelope::decode(SAMPLES[9]).unwrap();
    let Action::BuildingQueue(payload) = envelope.action else {
        panic!("expected buildingQueue");
    };
    assert_eq!(payload.kind, BuildingKind::Reactor);
    assert_eq!((payload.position.x, payload.position.y), (380.0, 939.0));
    assert!(payload.building_id.is_none());
}

#[test]
fn unknown_tags_are_reported_not_misparsed() {
    let result = ActionEnvelope::decode(r#"{"action":"chat","data":{"text":"gg"},"senderId":"1"}"#);
    assert!(matches!(result, Err(ProtocolError::UnknownAction(_))));
}
