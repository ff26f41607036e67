use metacrab::error::Error;
use metacrab::meta::Handle;
use metacrab::plugin::{Binding, Query};
use metacrab::{ClientInfo, DynResult, Plugins, Sttl};
use serde_json::{json, Value};
use std::net::IpAddr;
use trust_dns_proto::rr::Name;

fn load(doc: Value) -> Plugins {
    match Plugins::load(doc.as_object().cloned().unwrap()) {
        Ok(plugins) => plugins,
        Err(err) => panic!("load failed: {err}"),
    }
}

fn load_err(doc: Value) -> Error {
    match Plugins::load(doc.as_object().cloned().unwrap()) {
        Ok(_) => panic!("load succeeded"),
        Err(err) => err,
    }
}

fn origin() -> Name {
    Name::from_ascii("example.com.").unwrap()
}

fn name(text: &str) -> Name {
    Name::from_ascii(text).unwrap()
}

fn resolve(plugins: &Plugins, binding: Binding, origin: Option<&Name>) -> (DynResult, Sttl) {
    resolve_for(plugins, binding, origin, "198.51.100.7")
}

fn resolve_for(
    plugins: &Plugins,
    binding: Binding,
    origin: Option<&Name>,
    client: &str,
) -> (DynResult, Sttl) {
    let client = ClientInfo::new(client.parse().unwrap());
    let query = Query {
        worker: 0,
        origin,
        client: &client,
    };
    let mut result = DynResult::new();
    let state = binding.resolve(plugins, &query, &mut result);
    (result, state)
}

fn addrs(result: &DynResult) -> Vec<IpAddr> {
    result.addrs().collect()
}

fn ip(text: &str) -> IpAddr {
    text.parse().unwrap()
}

fn named_failover() -> Value {
    json!({
        "metafo": {
            "datacenters": ["A", "B", "C"],
            "service_types": ["http"],
            "resources": {
                "web": {
                    "dcmap": {
                        "A": "a.example.net.",
                        "B": "b.example.net.",
                        "C": "c.example.net."
                    }
                }
            }
        }
    })
}

#[test]
fn fails_over_to_first_up_datacenter() {
    let plugins = load(named_failover());
    let monitors = plugins.monitors();
    monitors
        .set_state_by_desc("a.example.net./http", Sttl::down(30))
        .unwrap();
    monitors
        .set_state_by_desc("b.example.net./http", Sttl::down(60))
        .unwrap();
    monitors
        .set_state_by_desc("c.example.net./http", Sttl::up(300))
        .unwrap();

    let origin = origin();
    let binding = plugins.bind("metafo!web", Some(&origin)).unwrap();
    let (result, state) = resolve(&plugins, binding, Some(&origin));
    assert_eq!(result.cname(), Some(&name("c.example.net.")));
    assert_eq!(state, Sttl::up(30));
    assert_eq!(result.scope_mask(), 0);
}

#[test]
fn all_down_answers_with_first_choice() {
    let plugins = load(named_failover());
    let monitors = plugins.monitors();
    for (target, ttl) in [("a", 30), ("b", 60), ("c", 45)] {
        monitors
            .set_state_by_desc(&format!("{target}.example.net./http"), Sttl::down(ttl))
            .unwrap();
    }

    let origin = origin();
    let binding = plugins.bind("metafo!web", Some(&origin)).unwrap();
    let (result, state) = resolve(&plugins, binding, Some(&origin));
    assert_eq!(result.cname(), Some(&name("a.example.net.")));
    assert_eq!(state, Sttl::down(30));
}

#[test]
fn pinned_datacenter_ignores_failover() {
    let plugins = load(named_failover());
    plugins
        .monitors()
        .set_state_by_desc("b.example.net./http", Sttl::down(60))
        .unwrap();

    let origin = origin();
    let binding = plugins.bind("metafo!web/B", Some(&origin)).unwrap();
    assert_eq!(Handle::from(binding.handle).pinned(), Some(2));

    let (result, state) = resolve(&plugins, binding, Some(&origin));
    assert_eq!(result.cname(), Some(&name("b.example.net.")));
    assert_eq!(state, Sttl::down(60));

    let err = plugins.bind("metafo!web/Z", Some(&origin)).unwrap_err();
    assert!(matches!(err, Error::UnknownPinnedDatacenter { .. }), "{err}");
}

#[test]
fn admin_override_of_datacenter() {
    let plugins = load(named_failover());
    plugins
        .monitors()
        .force("metafo/web/A", Sttl::down(10))
        .unwrap();

    let origin = origin();
    let binding = plugins.bind("metafo!web", Some(&origin)).unwrap();
    let (result, state) = resolve(&plugins, binding, Some(&origin));
    assert_eq!(result.cname(), Some(&name("b.example.net.")));
    assert_eq!(state, Sttl::up(10));

    plugins.monitors().unforce("metafo/web/A").unwrap();
    plugins
        .monitors()
        .set_state_by_desc("metafo/web/A", Sttl::MAX)
        .unwrap();
    let (result, _) = resolve(&plugins, binding, Some(&origin));
    assert_eq!(result.cname(), Some(&name("a.example.net.")));
}

#[test]
fn partial_names_are_completed_with_origin() {
    let plugins = load(json!({
        "metafo": {
            "datacenters": ["A"],
            "resources": { "web": { "dcmap": { "A": "www" } } }
        }
    }));
    let origin = origin();
    let binding = plugins.bind("metafo!web", Some(&origin)).unwrap();
    let (result, state) = resolve(&plugins, binding, Some(&origin));
    assert_eq!(result.cname(), Some(&name("www.example.com.")));
    assert!(!state.is_down());
}

#[test]
fn names_are_rejected_for_address_records() {
    let plugins = load(named_failover());
    let err = plugins.bind("metafo!web", None).unwrap_err();
    assert!(matches!(err, Error::CnameInAddressContext { .. }), "{err}");
}

#[test]
fn addresses_are_synthesized_into_multifo() {
    let plugins = load(json!({
        "metafo": {
            "datacenters": ["A", "B"],
            "resources": {
                "web": {
                    "dcmap": {
                        "A": "192.0.2.1",
                        "B": ["192.0.2.2", "2001:db8::2"]
                    }
                }
            }
        }
    }));

    assert!(plugins.bind("multifo!metafo_web_A", None).is_ok());
    assert!(plugins.bind("multifo!metafo_web_B", None).is_ok());

    let binding = plugins.bind("metafo!web", None).unwrap();
    let (result, state) = resolve(&plugins, binding, None);
    assert_eq!(addrs(&result), vec![ip("192.0.2.1")]);
    assert!(!state.is_down());

    plugins
        .monitors()
        .force("metafo/web/A", Sttl::down(20))
        .unwrap();
    let (result, _) = resolve(&plugins, binding, None);
    assert_eq!(addrs(&result), vec![ip("192.0.2.2"), ip("2001:db8::2")]);
}

#[test]
fn synthesized_resources_inherit_service_types() {
    let plugins = load(json!({
        "metafo": {
            "datacenters": ["A", "B"],
            "service_types": "http",
            "resources": {
                "web": { "dcmap": { "A": "192.0.2.1", "B": "192.0.2.2" } }
            }
        }
    }));
    plugins
        .monitors()
        .set_state_by_desc("192.0.2.1/http", Sttl::down(15))
        .unwrap();

    let binding = plugins.bind("metafo!web", None).unwrap();
    let (result, state) = resolve(&plugins, binding, None);
    assert_eq!(addrs(&result), vec![ip("192.0.2.2")]);
    assert_eq!(state, Sttl::up(15));
}

#[test]
fn delegates_to_named_resources() {
    let plugins = load(json!({
        "multifo": {
            "pool_a": { "1": "192.0.2.10" },
            "pool_b": { "1": "192.0.2.20" }
        },
        "metafo": {
            "datacenters": ["A", "B"],
            "resources": {
                "web": { "dcmap": { "A": "%multifo!pool_a", "B": "!pool_b" } }
            }
        }
    }));
    plugins
        .monitors()
        .force("metafo/web/A", Sttl::down(5))
        .unwrap();
    let binding = plugins.bind("metafo!web", None).unwrap();
    let (result, _) = resolve(&plugins, binding, None);
    assert_eq!(addrs(&result), vec![ip("192.0.2.20")]);
}

#[test]
fn delegate_validation_happens_at_bind() {
    let plugins = load(json!({
        "metafo": {
            "datacenters": ["A"],
            "resources": {
                "names": { "dcmap": { "A": "a.example.net." } },
                "web": { "dcmap": { "A": "%metafo!names" } },
                "broken": { "dcmap": { "A": "%nosuch!thing" } }
            }
        }
    }));

    let err = plugins.bind("metafo!web", None).unwrap_err();
    assert!(matches!(err, Error::DelegateRejectedAddress { .. }), "{err}");

    let origin = origin();
    let binding = plugins.bind("metafo!web", Some(&origin)).unwrap();
    let (result, _) = resolve(&plugins, binding, Some(&origin));
    assert_eq!(result.cname(), Some(&name("a.example.net.")));

    let err = plugins.bind("metafo!broken", Some(&origin)).unwrap_err();
    assert!(matches!(err, Error::InvalidPluginName { .. }), "{err}");
}

#[test]
fn rejects_self_reference() {
    let err = load_err(json!({
        "metafo": {
            "datacenters": ["A"],
            "resources": { "web": { "dcmap": { "A": "%metafo!web" } } }
        }
    }));
    assert!(matches!(err, Error::SelfReference { .. }), "{err}");

    let err = load_err(json!({
        "metafo": {
            "datacenters": ["A"],
            "resources": { "web": { "plugin": "metafo", "dcmap": { "A": "!web" } } }
        }
    }));
    assert!(matches!(err, Error::SelfReference { .. }), "{err}");
}

#[test]
fn rejects_delegate_without_resource() {
    let err = load_err(json!({
        "metafo": {
            "datacenters": ["A"],
            "resources": { "web": { "dcmap": { "A": "%multifo" } } }
        }
    }));
    assert!(matches!(err, Error::MissingDelegateResource { .. }), "{err}");
}

#[test]
fn rejects_dcmap_mismatch() {
    let err = load_err(json!({
        "metafo": {
            "datacenters": ["A", "B"],
            "resources": { "web": { "dcmap": { "A": "192.0.2.1" } } }
        }
    }));
    assert!(
        matches!(
            err,
            Error::DcMapMismatch {
                configured: 1,
                expected: 2,
                ..
            }
        ),
        "{err}"
    );

    let err = load_err(json!({
        "metafo": {
            "datacenters": ["A"],
            "resources": { "web": { "dcmap": { "Z": "192.0.2.1" } } }
        }
    }));
    assert!(matches!(err, Error::UnknownDatacenter { .. }), "{err}");

    let err = load_err(json!({
        "metafo": {
            "datacenters": ["A"],
            "resources": { "web": {} }
        }
    }));
    assert!(matches!(err, Error::MissingDcMap { .. }), "{err}");
}

#[test]
fn rejects_synthesized_name_collision() {
    let err = load_err(json!({
        "multifo": {
            "metafo_web_A": { "1": "192.0.2.9" }
        },
        "metafo": {
            "datacenters": ["A"],
            "resources": { "web": { "dcmap": { "A": "192.0.2.1" } } }
        }
    }));
    assert!(matches!(err, Error::SynthesizedNameExists { .. }), "{err}");
}

#[test]
fn rejects_self_synthesis() {
    let err = load_err(json!({
        "metafo": {
            "datacenters": ["A"],
            "resources": {
                "web": { "dcmap": { "A": { "plugin": "metafo", "datacenters": ["X"] } } }
            }
        }
    }));
    assert!(matches!(err, Error::SelfSynthesis { .. }), "{err}");
}

#[test]
fn rejects_synthesis_into_loaded_plugin() {
    let err = load_err(json!({
        "geoip": {
            "maps": { "world": { "datacenters": ["us"] } },
            "resources": { "web": { "dcmap": { "us": "192.0.2.1" } } }
        },
        "metafo": {
            "datacenters": ["A"],
            "resources": {
                "web": {
                    "dcmap": { "A": { "plugin": "geoip", "dcmap": { "us": "192.0.2.5" } } }
                }
            }
        }
    }));
    assert!(matches!(err, Error::SynthesisAfterLoad { .. }), "{err}");
}

#[test]
fn rejects_bad_resource_names() {
    let err = load_err(json!({
        "metafo": {
            "datacenters": ["A"],
            "resources": { "web/x": { "dcmap": { "A": "192.0.2.1" } } }
        }
    }));
    assert!(matches!(err, Error::InvalidResourceName { .. }), "{err}");

    let err = load_err(json!({ "metafo": { "datacenters": ["A"] } }));
    assert!(matches!(err, Error::MissingResources(_)), "{err}");
}

#[test]
fn unknown_resources_and_resolvers() {
    let plugins = load(named_failover());
    let origin = origin();
    let err = plugins.bind("metafo!nope", Some(&origin)).unwrap_err();
    assert!(matches!(err, Error::UnknownResource { .. }), "{err}");
    let err = plugins.bind("metafo", Some(&origin)).unwrap_err();
    assert!(matches!(err, Error::InvalidResolver(_)), "{err}");
    let err = plugins.bind("nosuch!web", Some(&origin)).unwrap_err();
    assert!(matches!(err, Error::UnknownPlugin(_)), "{err}");
}

fn geo_doc() -> Value {
    json!({
        "geoip": {
            "maps": {
                "world": {
                    "datacenters": ["us", "eu"],
                    "nets": { "10.0.0.0/8": ["eu", "us"] }
                }
            },
            "resources": {
                "web": { "dcmap": { "us": "192.0.2.1", "eu": "192.0.2.2" } }
            }
        }
    })
}

#[test]
fn geoip_orders_by_client_network() {
    let plugins = load(geo_doc());
    let binding = plugins.bind("geoip!web", None).unwrap();

    let (result, _) = resolve_for(&plugins, binding, None, "10.1.2.3");
    assert_eq!(addrs(&result), vec![ip("192.0.2.2")]);
    assert_eq!(result.scope_mask(), 8);

    let (result, _) = resolve_for(&plugins, binding, None, "198.51.100.7");
    assert_eq!(addrs(&result), vec![ip("192.0.2.1")]);
    assert_eq!(result.scope_mask(), 32);
}

#[test]
fn datacenter_override_beats_map_override() {
    let plugins = load(geo_doc());
    let binding = plugins.bind("geoip!web", None).unwrap();
    let monitors = plugins.monitors();

    monitors
        .force("geoip/map/world/us", Sttl::down(10))
        .unwrap();
    let (result, state) = resolve(&plugins, binding, None);
    assert_eq!(addrs(&result), vec![ip("192.0.2.2")]);
    assert_eq!(state, Sttl::up(10));

    monitors.force("geoip/web/us", Sttl::up(20)).unwrap();
    let (result, state) = resolve(&plugins, binding, None);
    assert_eq!(addrs(&result), vec![ip("192.0.2.1")]);
    assert_eq!(state, Sttl::up(20));
}

#[test]
fn geoip_can_synthesize_metafo_resources() {
    let plugins = load(json!({
        "geoip": {
            "maps": { "world": { "datacenters": ["us"] } },
            "resources": {
                "web": {
                    "dcmap": {
                        "us": {
                            "plugin": "metafo",
                            "datacenters": ["east", "west"],
                            "dcmap": { "east": "192.0.2.1", "west": "192.0.2.2" }
                        }
                    }
                }
            }
        }
    }));
    assert!(plugins.bind("metafo!geoip_web_us", None).is_ok());

    plugins
        .monitors()
        .force("metafo/geoip_web_us/east", Sttl::down(10))
        .unwrap();
    let binding = plugins.bind("geoip!web", None).unwrap();
    let (result, _) = resolve(&plugins, binding, None);
    assert_eq!(addrs(&result), vec![ip("192.0.2.2")]);
}
