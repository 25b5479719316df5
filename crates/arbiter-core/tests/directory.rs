//! Agent registry: ownership, spec updates, indices and skill checks.

use arbiter_core::skill_tree::{compute_root, generate_proof, skill_id};
use arbiter_core::{
    AccountId, AgentDirectory, AgentId, AgentSpec, ErrorKind, Hash32, InMemoryAgentDirectory,
};
use chrono::Utc;

fn spec_with(model: &str, skills_root: Hash32) -> AgentSpec {
    AgentSpec::new(
        Hash32::digest(model.as_bytes()),
        Hash32::digest(b"cfg"),
        skills_root,
        1024,
        30,
        90,
        1234,
    )
    .unwrap()
}

fn spec(model: &str) -> AgentSpec {
    spec_with(model, Hash32::digest(b"skills"))
}

fn owner() -> AccountId {
    AccountId::from("owner")
}

#[test]
fn only_owner_may_modify() {
    let mut dir = InMemoryAgentDirectory::new();
    let id = dir.register_agent(&owner(), spec("m"), "", Utc::now()).unwrap();
    let mallory = AccountId::from("mallory");

    let errs = [
        dir.update_spec(&mallory, id, spec("m2"), Utc::now()).unwrap_err(),
        dir.transfer_ownership(&mallory, id, &mallory, Utc::now())
            .unwrap_err(),
        dir.set_metadata_uri(&mallory, id, "x", Utc::now()).unwrap_err(),
        dir.deactivate(&mallory, id, Utc::now()).unwrap_err(),
    ];
    for err in errs {
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }
    assert_eq!(dir.owner(id).unwrap(), owner());
}

#[test]
fn unknown_agent_is_not_found() {
    let dir = InMemoryAgentDirectory::new();
    assert_eq!(dir.spec(AgentId(1)).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(
        dir.reputation_bps(AgentId(1)).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn spec_update_resets_reputation() {
    let mut dir = InMemoryAgentDirectory::new();
    let id = dir.register_agent(&owner(), spec("m"), "", Utc::now()).unwrap();
    dir.record_outcome(id, false).unwrap();
    assert_eq!(dir.reputation_bps(id).unwrap(), 0);

    dir.update_spec(&owner(), id, spec("m2"), Utc::now()).unwrap();
    assert_eq!(dir.reputation_bps(id).unwrap(), 5_000);
    assert_eq!(dir.spec(id).unwrap().model_hash, Hash32::digest(b"m2"));
}

#[test]
fn invalid_update_keeps_old_spec() {
    let mut dir = InMemoryAgentDirectory::new();
    let id = dir.register_agent(&owner(), spec("m"), "", Utc::now()).unwrap();
    let mut bad = spec("m2");
    bad.top_p = 200;
    let err = dir.update_spec(&owner(), id, bad, Utc::now()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
    assert_eq!(dir.spec(id).unwrap(), spec("m"));
}

#[test]
fn model_index_is_eventual() {
    let mut dir = InMemoryAgentDirectory::new();
    let old_model = Hash32::digest(b"m");
    let new_model = Hash32::digest(b"m2");
    let id = dir.register_agent(&owner(), spec("m"), "", Utc::now()).unwrap();
    dir.update_spec(&owner(), id, spec("m2"), Utc::now()).unwrap();

    assert_eq!(dir.agents_by_model(&old_model), vec![id]);
    assert!(dir.current_agents_by_model(&old_model).is_empty());
    assert_eq!(dir.current_agents_by_model(&new_model), vec![id]);
}

#[test]
fn owner_index_follows_transfers() {
    let mut dir = InMemoryAgentDirectory::new();
    let alice = AccountId::from("alice");
    let bob = AccountId::from("bob");
    let a = dir.register_agent(&alice, spec("m"), "", Utc::now()).unwrap();
    let b = dir.register_agent(&alice, spec("m"), "", Utc::now()).unwrap();

    dir.transfer_ownership(&alice, a, &bob, Utc::now()).unwrap();
    assert_eq!(dir.agents_by_owner(&alice), vec![b]);
    assert_eq!(dir.agents_by_owner(&bob), vec![a]);
    assert_eq!(dir.owner(a).unwrap(), bob);

    // Old owner lost control.
    assert!(dir.deactivate(&alice, a, Utc::now()).is_err());
    dir.deactivate(&bob, a, Utc::now()).unwrap();
    assert!(!dir.is_active(a).unwrap());
    dir.reactivate(&bob, a, Utc::now()).unwrap();
    assert!(dir.is_active(a).unwrap());
}

#[test]
fn verify_agent_skill_uses_committed_root() {
    let leaves: Vec<_> = ["search", "code", "math"]
        .iter()
        .map(|name| skill_id(name, "1.0.0"))
        .collect();
    let root = compute_root(&leaves).unwrap();

    let mut dir = InMemoryAgentDirectory::new();
    let id = dir
        .register_agent(&owner(), spec_with("m", root), "ipfs://agent", Utc::now())
        .unwrap();

    let proof = generate_proof(&leaves, 1).unwrap();
    assert!(dir.verify_agent_skill(id, &leaves[1], &proof).unwrap());
    assert!(!dir
        .verify_agent_skill(id, &skill_id("code", "2.0.0"), &proof)
        .unwrap());
    assert_eq!(dir.get(id).unwrap().metadata_uri, "ipfs://agent");
}

#[test]
fn directory_survives_json_round_trip() {
    let mut dir = InMemoryAgentDirectory::new();
    let id = dir.register_agent(&owner(), spec("m"), "uri", Utc::now()).unwrap();
    dir.record_outcome(id, true).unwrap();

    let json = serde_json::to_string(&dir).unwrap();
    let back: InMemoryAgentDirectory = serde_json::from_str(&json).unwrap();
    assert_eq!(back, dir);

    let mut back = back;
    let next = back.register_agent(&owner(), spec("m"), "", Utc::now()).unwrap();
    assert_eq!(next, AgentId(2));
}
