//! Plugin and instance lifecycle through the public API.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;
use cmsadmin::auth::{Credentials, PasswdAuth, SharedTokenAuth};
use cmsadmin::commons::audit::MemoryAuditSink;
use cmsadmin::commons::confstore::ConfigStore;
use cmsadmin::plugin::{Error, InstanceState, Kind, LifecycleOutcome, Params};
use url::Url;

const SALT: &str = "0a1b2c3d";

fn params(pairs: &[(&str, &str)]) -> Params {
    Params::from_pairs(pairs.iter().copied()).unwrap()
}

fn passwd_params(extra: &[(&str, &str)]) -> Params {
    let mut res = params(&[("salt", SALT)]);
    for (name, value) in extra {
        res.insert(*name, *value).unwrap();
    }
    res
}

#[test]
fn added_instance_can_be_looked_up() {
    let store = ConfigStore::memory();
    let (auths, _) = common::subsystems(&store, Arc::default());
    auths.register_plugin("tok", SharedTokenAuth::CLASS).unwrap();
    auths.add_instance(
        "t1", "tok", params(&[("token", "s3cret"), ("subject", "ops")])
    ).unwrap();

    let instance = auths.instance("t1").unwrap();
    assert_eq!(instance.plugin_id(), "tok");
    assert_eq!(instance.params().get("token"), Some("s3cret"));
    assert_eq!(instance.params().get("subject"), Some("ops"));
    assert_eq!(instance.state(), InstanceState::Active);

    let token = auths.authenticate(
        "t1", &Credentials::new().with("token", "s3cret")
    ).unwrap();
    assert_eq!(token.subject, "ops");
}

#[test]
fn unknown_plugin_leaves_no_trace() {
    let store = ConfigStore::memory();
    let (auths, _) = common::subsystems(&store, Arc::default());
    let before = store.export();

    let err = auths.add_instance("inst1", "nope", Params::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidReference(ref id) if id == "nope"));
    assert!(auths.instance("inst1").is_none());
    assert!(auths.root().get_sub_store("instance").unwrap().is_none());
    assert_eq!(store.export(), before);
}

#[test]
fn unregister_in_use_changes_nothing() {
    let store = ConfigStore::memory();
    let (auths, _) = common::subsystems(&store, Arc::default());
    auths.register_plugin("tok", SharedTokenAuth::CLASS).unwrap();
    auths.add_instance("t1", "tok", params(&[("token", "x")])).unwrap();
    let before = store.export();

    let err = auths.unregister_plugin("tok").unwrap_err();
    assert!(matches!(err, Error::InUse { ref instances, .. } if instances == &["t1"]));
    assert!(auths.plugin("tok").is_some());
    assert_eq!(store.export(), before);
}

#[test]
fn failed_modify_keeps_everything() {
    let dir = tempfile::tempdir().unwrap();
    let uri = Url::parse(
        &format!("local://{}/cs.json", dir.path().display())
    ).unwrap();
    let store = ConfigStore::open(&uri).unwrap();
    let (auths, _) = common::subsystems(&store, Arc::default());
    auths.register_plugin("pwd", PasswdAuth::CLASS).unwrap();
    auths.register_plugin("tok", SharedTokenAuth::CLASS).unwrap();
    auths.add_instance("inst1", "pwd", passwd_params(&[])).unwrap();

    let old = auths.instance("inst1").unwrap();
    let on_disk = std::fs::read(dir.path().join("cs.json")).unwrap();
    let before = store.export();
    let config_before = auths.root().snapshot("instance").unwrap();

    // Initialization fails: the salt is not hex.
    let err = auths.modify_instance(
        "inst1", "pwd", params(&[("salt", "not hex")])
    ).unwrap_err();
    assert!(matches!(err, Error::InitFailed { .. }));

    // Initialization fails: a shared token may not be empty.
    let err = auths.modify_instance(
        "inst1", "tok", params(&[("token", "")])
    ).unwrap_err();
    assert!(matches!(err, Error::InitFailed { .. }));

    assert_eq!(store.export(), before);
    assert_eq!(auths.root().snapshot("instance").unwrap(), config_before);
    assert_eq!(std::fs::read(dir.path().join("cs.json")).unwrap(), on_disk);

    let current = auths.instance("inst1").unwrap();
    assert!(Arc::ptr_eq(&old, &current));
    assert_eq!(current.state(), InstanceState::Active);
}

#[test]
fn modify_stops_old_instance() {
    let store = ConfigStore::memory();
    let (auths, _) = common::subsystems(&store, Arc::default());
    auths.register_plugin("tok", SharedTokenAuth::CLASS).unwrap();
    auths.add_instance("t1", "tok", params(&[("token", "one")])).unwrap();
    let old = auths.instance("t1").unwrap();

    let (new, outcome) = auths.modify_instance(
        "t1", "tok", params(&[("token", "two")])
    ).unwrap();
    assert_eq!(outcome, LifecycleOutcome::Done);
    assert_eq!(old.state(), InstanceState::Stopped);
    assert_eq!(new.state(), InstanceState::Active);
    assert!(auths.authenticate(
        "t1", &Credentials::new().with("token", "one")
    ).is_err());
    assert!(auths.authenticate(
        "t1", &Credentials::new().with("token", "two")
    ).is_ok());
}

#[test]
fn concurrent_add_with_same_id() {
    let store = ConfigStore::memory();
    let (auths, _) = common::subsystems(&store, Arc::default());
    auths.register_plugin("tok", SharedTokenAuth::CLASS).unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = ["one", "two"].into_iter().map(|token| {
        let auths = auths.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            barrier.wait();
            auths.add_instance("t1", "tok", params(&[("token", token)]))
        })
    }).collect();
    let results: Vec<_> = handles.into_iter().map(|handle| {
        handle.join().unwrap()
    }).collect();

    assert_eq!(results.iter().filter(|res| res.is_ok()).count(), 1);
    let err = results.into_iter().find_map(Result::err).unwrap();
    assert!(matches!(
        err, Error::DuplicateId { kind: Kind::Instance, ref id } if id == "t1"
    ));
    assert_eq!(auths.instances().len(), 1);
}

#[test]
fn passwd_plugin_scenario() {
    let store = ConfigStore::memory();
    let audit = Arc::new(MemoryAuditSink::default());
    let (auths, _) = common::subsystems(&store, audit);

    auths.register_plugin("pwd", PasswdAuth::CLASS).unwrap();
    auths.add_instance(
        "inst1", "pwd", passwd_params(&[("host", "ldap1")])
    ).unwrap();
    assert_eq!(
        auths.instance("inst1").unwrap().params().get("host"), Some("ldap1")
    );

    assert!(matches!(
        auths.unregister_plugin("pwd"), Err(Error::InUse { .. })
    ));
    assert_eq!(
        auths.remove_instance("inst1").unwrap(), LifecycleOutcome::Done
    );
    auths.unregister_plugin("pwd").unwrap();
    assert!(auths.plugins().is_empty());
    assert!(auths.instances().is_empty());
}

#[test]
fn configuration_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let uri = Url::parse(
        &format!("local://{}/cs.json", dir.path().display())
    ).unwrap();
    {
        let store = ConfigStore::open(&uri).unwrap();
        let (auths, jobs) = common::subsystems(&store, Arc::default());
        auths.register_plugin("tok", SharedTokenAuth::CLASS).unwrap();
        auths.add_instance("t1", "tok", params(&[("token", "x")])).unwrap();
        jobs.update_settings(Some(true), Some(10)).unwrap();
    }

    let store = ConfigStore::open(&uri).unwrap();
    let (auths, jobs) = common::subsystems(&store, Arc::default());
    auths.load().unwrap();
    jobs.load().unwrap();
    assert_eq!(auths.plugin("tok").unwrap().class_ref(), SharedTokenAuth::CLASS);
    assert_eq!(auths.instance("t1").unwrap().params().get("token"), Some("x"));
    let settings = jobs.settings().unwrap();
    assert!(settings.enabled);
    assert_eq!(settings.interval, 10);
}
