use metacrab::error::Error;
use metacrab::plugin::Query;
use metacrab::{ClientInfo, DynResult, Plugins, Sttl};
use serde_json::{json, Value};
use std::net::IpAddr;

fn load(doc: Value) -> Result<Plugins, Error> {
    Plugins::load(doc.as_object().cloned().unwrap())
}

fn resolve(plugins: &Plugins, resolver: &str) -> (Vec<IpAddr>, Sttl) {
    let binding = plugins.bind(resolver, None).unwrap();
    let client = ClientInfo::new("192.0.2.200".parse().unwrap());
    let query = Query {
        worker: 3,
        origin: None,
        client: &client,
    };
    let mut result = DynResult::new();
    let state = binding.resolve(plugins, &query, &mut result);
    (result.addrs().collect(), state)
}

fn ips(list: &[&str]) -> Vec<IpAddr> {
    list.iter().map(|a| a.parse().unwrap()).collect()
}

fn pool() -> Plugins {
    let doc = json!({
        "multifo": {
            "service_types": "http",
            "up_thresh": 0.5,
            "pool": { "1": "192.0.2.1", "2": "192.0.2.2", "3": "192.0.2.3" }
        }
    });
    match load(doc) {
        Ok(plugins) => plugins,
        Err(err) => panic!("{err}"),
    }
}

#[test]
fn answers_with_up_addresses() {
    let plugins = pool();
    plugins
        .monitors()
        .set_state_by_desc("192.0.2.2/http", Sttl::down(40))
        .unwrap();
    let (addrs, state) = resolve(&plugins, "multifo!pool");
    assert_eq!(addrs, ips(&["192.0.2.1", "192.0.2.3"]));
    assert_eq!(state, Sttl::up(40));
}

#[test]
fn below_threshold_answers_with_everything() {
    let plugins = pool();
    let monitors = plugins.monitors();
    monitors
        .set_state_by_desc("192.0.2.1/http", Sttl::down(40))
        .unwrap();
    monitors
        .set_state_by_desc("192.0.2.2/http", Sttl::down(50))
        .unwrap();
    let (addrs, state) = resolve(&plugins, "multifo!pool");
    assert_eq!(addrs, ips(&["192.0.2.1", "192.0.2.2", "192.0.2.3"]));
    assert_eq!(state, Sttl::down(40));
}

#[test]
fn mixed_families() {
    let plugins = match load(json!({
        "multifo": { "dual": { "a": "192.0.2.1", "b": "2001:db8::1" } }
    })) {
        Ok(plugins) => plugins,
        Err(err) => panic!("{err}"),
    };
    let (addrs, state) = resolve(&plugins, "multifo!dual");
    assert_eq!(addrs, ips(&["192.0.2.1", "2001:db8::1"]));
    assert!(!state.is_down());
}

#[test]
fn rejects_bad_config() {
    for doc in [
        json!({ "multifo": { "pool": { "1": "not-an-address" } } }),
        json!({ "multifo": { "up_thresh": 0, "pool": { "1": "192.0.2.1" } } }),
        json!({ "multifo": { "up_thresh": 1.5, "pool": { "1": "192.0.2.1" } } }),
        json!({ "multifo": { "pool": {} } }),
        json!({ "multifo": "pool" }),
    ] {
        assert!(load(doc).is_err());
    }
}
