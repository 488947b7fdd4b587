#![allow(clippy::unwrap_used)]
// Normalizer properties through the public API: parse → normalize → diff.

use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use onboard_core::{
    ConfigTree, CoreError, DeclarationParser, DefaultParser, EngineConfig, Normalizer, diff,
};

fn tree(value: Value) -> ConfigTree {
    serde_json::from_value(value).unwrap()
}

fn device(common: Value) -> Value {
    let mut tenant = common;
    tenant["class"] = json!("Tenant");
    json!({ "class": "Device", "schemaVersion": "1.0.0", "Common": tenant })
}

fn normalize(
    declaration: &Value,
    current: &ConfigTree,
    original: &ConfigTree,
) -> Result<ConfigTree, CoreError> {
    let parsed = DefaultParser.parse(declaration)?;
    Normalizer::default().normalize(&parsed, current, original)
}

#[test]
fn omitted_class_of_truth_comes_from_original() {
    let original = tree(json!({ "Common": { "DNS": { "foo": "bar" } } }));
    let current = tree(json!({ "Common": { "DNS": { "foo": "changed-by-last-run" } } }));

    let effective = normalize(&device(json!({})), &current, &original).unwrap();
    assert_eq!(effective["Common"]["DNS"], json!({ "foo": "bar" }));
}

#[test]
fn classes_outside_the_truth_list_are_not_defaulted() {
    let original = tree(json!({ "Common": { "User": { "guest": { "shell": "none" } } } }));
    let effective = normalize(&device(json!({})), &ConfigTree::new(), &original).unwrap();
    assert!(!effective.contains_key("Common"));
}

#[test]
fn omitted_untracked_class_is_left_on_the_device() {
    let original = tree(json!({ "Common": { "User": { "guest": { "userType": "regular" } } } }));
    let state = tree(json!({
        "Common": {
            "User": { "guest": { "userType": "regular" } },
            "VLAN": { "old": { "tag": 100 } }
        }
    }));
    let declaration = device(json!({ "hostname": "bigip1.example.com" }));
    let effective = normalize(&declaration, &state, &original).unwrap();
    assert_eq!(
        effective["Common"]["User"],
        json!({ "guest": { "userType": "regular" } })
    );

    let change_set = diff(&effective, &state);
    assert_eq!(
        change_set.to_delete,
        tree(json!({ "Common": { "VLAN": { "old": { "tag": 100 } } } }))
    );
    assert!(!change_set.to_update["Common"].contains_key("User"));
}

#[test]
fn declared_untracked_class_replaces_device_objects() {
    let state = tree(json!({ "Common": { "User": { "guest": { "userType": "regular" } } } }));
    let declaration = device(json!({
        "ops": { "class": "User", "userType": "regular" }
    }));
    let effective = normalize(&declaration, &state, &state).unwrap();
    let change_set = diff(&effective, &state);
    assert_eq!(
        change_set.to_delete,
        tree(json!({ "Common": { "User": { "guest": { "userType": "regular" } } } }))
    );
}

#[test]
fn truth_list_is_configurable() {
    let original = tree(json!({
        "Common": { "DNS": { "nameServers": ["192.0.2.53"] }, "NTP": { "timezone": "UTC" } }
    }));
    let config = EngineConfig {
        classes_of_truth: vec!["NTP".into()],
        ..EngineConfig::default()
    };
    let parsed = DefaultParser.parse(&device(json!({}))).unwrap();
    let effective = Normalizer::new(&config)
        .normalize(&parsed, &ConfigTree::new(), &original)
        .unwrap();
    assert_eq!(
        effective["Common"].keys().collect::<Vec<_>>(),
        vec!["NTP"]
    );
}

#[test]
fn default_route_domains_coalesce() {
    let declaration = device(json!({
        "rd0": { "class": "RouteDomain", "id": 0 },
        "rd0_2": { "class": "RouteDomain", "id": 0 },
        "rd1": { "class": "RouteDomain", "id": 1 }
    }));
    let empty = ConfigTree::new();
    let effective = normalize(&declaration, &empty, &empty).unwrap();
    let domains = effective["Common"]["RouteDomain"].as_object().unwrap();
    assert_eq!(domains.keys().collect::<Vec<_>>(), vec!["0", "rd1"]);
}

#[test]
fn bgp_all_family_is_split() {
    let declaration = device(json!({
        "bgp": {
            "class": "RoutingBGP",
            "localAS": 65010,
            "addressFamily": [{
                "name": "all",
                "redistribute": [{ "routingProtocol": "kernel", "routeMap": "/Common/rm1" }]
            }]
        }
    }));
    let empty = ConfigTree::new();
    let effective = normalize(&declaration, &empty, &empty).unwrap();
    assert_eq!(
        effective["Common"]["RoutingBGP"]["bgp"]["addressFamily"],
        json!([
            {
                "name": "ipv4",
                "redistribute": [{ "routingProtocol": "kernel", "routeMap": "/Common/rm1" }]
            },
            {
                "name": "ipv6",
                "redistribute": [{ "routingProtocol": "kernel", "routeMap": "/Common/rm1" }]
            }
        ])
    );
}

#[test]
fn failover_unicast_conflict_is_a_validation_error() {
    let declaration = device(json!({
        "a": { "class": "FailoverUnicast", "address": "10.1.1.1", "port": 1026 },
        "b": { "class": "FailoverUnicast", "unicastAddress": [{ "address": "10.2.2.2" }] }
    }));
    let empty = ConfigTree::new();
    let err = normalize(&declaration, &empty, &empty).unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
    assert!(
        err.to_string()
            .contains("Cannot have Failover Unicasts with both address and addressPort properties")
    );
}

#[test]
fn volatile_fields_do_not_cause_updates() {
    let declaration = device(json!({
        "external": { "class": "VLAN", "tag": 4094 }
    }));
    let current = tree(json!({
        "Common": {
            "VLAN": {
                "external": {
                    "tag": 4094,
                    "generation": 42,
                    "selfLink": "https://localhost/mgmt/tm/net/vlan/~Common~external"
                }
            },
            "RouteDomain": { "0": { "id": 0, "vlans": ["/Common/external"], "generation": 3 } }
        }
    }));
    let effective = normalize(&declaration, &current, &ConfigTree::new()).unwrap();
    let canonical = Normalizer::default().canonical_state(&current);
    let change_set = diff(&effective, &canonical);
    assert!(change_set.is_empty(), "{change_set:?}");
}

#[test]
fn normalization_is_idempotent_against_its_own_output() {
    let declaration = device(json!({
        "hostname": "bigip1.example.com",
        "dns": { "class": "DNS", "nameServers": ["192.0.2.53"], "search": ["example.com"] },
        "external": { "class": "VLAN", "tag": 4094, "interfaces": [{ "name": "1.1" }] },
        "rd1": { "class": "RouteDomain", "id": 1, "vlans": ["external"] },
        "acl": {
            "class": "RoutingAccessList",
            "entries": [{ "name": 10, "action": "permit", "source": "10.1.1.1", "destination": "::" }]
        },
        "ports": { "class": "FirewallPortList", "ports": [8443, 443] },
        "httpd": { "class": "HTTPD", "allow": "all" },
        "unicast": { "class": "FailoverUnicast", "address": "10.1.1.1" }
    }));
    let original = tree(json!({
        "Common": { "System": { "hostname": "localhost.localdomain" } }
    }));

    let first = normalize(&declaration, &original, &original).unwrap();
    let second = normalize(&declaration, &first, &original).unwrap();
    assert_eq!(first, second);
    assert!(diff(&second, &first).is_empty());

    insta::assert_json_snapshot!(first["Common"], @r###"
    {
      "DNS": {
        "nameServers": [
          "192.0.2.53"
        ],
        "search": [
          "example.com"
        ]
      },
      "FailoverUnicast": {
        "addressPorts": [
          {
            "address": "10.1.1.1",
            "port": 1026
          }
        ]
      },
      "FirewallPortList": {
        "ports": {
          "ports": [
            443,
            8443
          ]
        }
      },
      "HTTPD": {
        "allow": [
          "all"
        ]
      },
      "RouteDomain": {
        "0": {
          "id": 0,
          "vlans": []
        },
        "rd1": {
          "id": 1,
          "vlans": [
            "/Common/external"
          ]
        }
      },
      "RoutingAccessList": {
        "acl": {
          "entries": [
            {
              "action": "permit",
              "destination": "0.0.0.0/0",
              "name": 10,
              "source": "10.1.1.1/32"
            }
          ]
        }
      },
      "System": {
        "hostname": "bigip1.example.com"
      },
      "VLAN": {
        "external": {
          "interfaces": [
            {
              "name": "1.1"
            }
          ],
          "tag": 4094
        }
      }
    }
    "###);
}
