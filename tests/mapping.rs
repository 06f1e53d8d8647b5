// ABOUTME: Integration tests for field tables, the catalog and the mapper.
// ABOUTME: Alias priority, key partitioning, nesting and catalog validation.

use enginewire::mapping::*;
use nonempty::nonempty;
use proptest::prelude::*;
use serde_json::{Value, json};

fn object(value: Value) -> Object {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

mod consume {
    use super::*;

    #[test]
    fn renames_declared_keys_and_keeps_the_rest() {
        let mapper = ModelMapper::default();
        let mapped = mapper
            .consume(
                Table::Port,
                object(json!({"IP": "0.0.0.0", "PrivatePort": 80, "Extra": true})),
            )
            .unwrap();

        assert_eq!(
            Value::Object(mapped.normalized),
            json!({"ip": "0.0.0.0", "private_port": 80})
        );
        assert_eq!(Value::Object(mapped.remainder), json!({"Extra": true}));
    }

    #[test]
    fn first_declared_alias_wins() {
        let mapper = ModelMapper::default();
        let mapped = mapper
            .consume(
                Table::ContainerInspect,
                object(json!({"ID": "second", "Id": "first"})),
            )
            .unwrap();

        assert_eq!(mapped.normalized.get("id"), Some(&json!("first")));
        assert_eq!(mapped.remainder.get("ID"), Some(&json!("second")));
    }

    #[test]
    fn later_alias_used_when_first_absent() {
        let mapper = ModelMapper::default();
        let mapped = mapper
            .consume(Table::Container, object(json!({"Cmd": "sleep 1"})))
            .unwrap();
        assert_eq!(mapped.normalized.get("command"), Some(&json!("sleep 1")));
        assert!(mapped.remainder.is_empty());
    }

    #[test]
    fn empty_input() {
        let mapped = ModelMapper::default()
            .consume(Table::Version, Object::new())
            .unwrap();
        assert!(mapped.normalized.is_empty());
        assert!(mapped.remainder.is_empty());
    }

    #[test]
    fn transform_applied() {
        let mapped = ModelMapper::default()
            .consume(Table::Container, object(json!({"Created": 1365714795})))
            .unwrap();
        assert_eq!(
            mapped.normalized.get("created"),
            Some(&json!("2013-04-11T21:13:15Z"))
        );
    }

    #[test]
    fn transform_failure_names_the_field() {
        let err = ModelMapper::default()
            .consume(Table::Container, object(json!({"Created": "yesterday"})))
            .unwrap_err();
        assert!(matches!(
            err,
            MappingError::Transform {
                table: Table::Container,
                field: "created",
                ..
            }
        ));
    }

    #[test]
    fn non_object_input_rejected() {
        let err = ModelMapper::default()
            .consume_value(Table::Container, json!([1, 2]))
            .unwrap_err();
        assert!(matches!(
            err,
            MappingError::UnexpectedShape {
                expected: "object",
                found: "array",
                ..
            }
        ));
    }
}

mod nested {
    use super::*;

    #[test]
    fn nested_object_mapped_with_its_remainder() {
        let mapped = ModelMapper::default()
            .consume(
                Table::ContainerInspect,
                object(json!({
                    "Id": "abc",
                    "State": {"Running": true, "Pid": 42, "Ghost": 1},
                })),
            )
            .unwrap();

        assert_eq!(
            mapped.normalized.get("state"),
            Some(&json!({"pid": 42, "running": true, "Ghost": 1}))
        );
    }

    #[test]
    fn nested_remainder_colliding_with_field_fails() {
        let err = ModelMapper::default()
            .consume(
                Table::ContainerInspect,
                object(json!({
                    "Id": "abc",
                    "HostConfig": {"Privileged": true, "privileged": "legacy"},
                })),
            )
            .unwrap_err();

        match err {
            MappingError::Nested { field, source, .. } => {
                assert_eq!(field, "host_config");
                assert!(
                    matches!(*source, MappingError::KeyCollision { ref key } if key == "privileged")
                );
            }
            other => panic!("expected a nested error, got {other}"),
        }
    }

    #[test]
    fn merged_keeps_distinct_remainder_keys() {
        let mapped = Mapped {
            normalized: object(json!({"id": "abc"})),
            remainder: object(json!({"Extra": 1})),
        };
        assert_eq!(
            Value::Object(mapped.merged().unwrap()),
            json!({"id": "abc", "Extra": 1})
        );
    }

    #[test]
    fn nested_list_maps_each_item() {
        let mapped = ModelMapper::default()
            .consume(
                Table::Container,
                object(json!({
                    "Ports": [
                        {"PrivatePort": 80, "PublicPort": 8080, "Type": "tcp"},
                        {"PrivatePort": 53, "Type": "udp"},
                    ],
                })),
            )
            .unwrap();

        assert_eq!(
            mapped.normalized.get("ports"),
            Some(&json!([
                {"private_port": 80, "public_port": 8080, "protocol": "tcp"},
                {"private_port": 53, "protocol": "udp"},
            ]))
        );
    }

    #[test]
    fn nested_null_passes_through() {
        let mapped = ModelMapper::default()
            .consume(Table::ContainerInspect, object(json!({"HostConfig": null})))
            .unwrap();
        assert_eq!(mapped.normalized.get("host_config"), Some(&Value::Null));
    }

    #[test]
    fn nested_failure_wraps_inner_error() {
        let err = ModelMapper::default()
            .consume(
                Table::ContainerInspect,
                object(json!({"State": {"StartedAt": "not a time"}})),
            )
            .unwrap_err();

        let MappingError::Nested {
            table,
            field,
            source,
        } = err
        else {
            panic!("expected a nested error");
        };
        assert_eq!(table, Table::ContainerInspect);
        assert_eq!(field, "state");
        assert!(matches!(
            *source,
            MappingError::Transform {
                table: Table::ContainerState,
                field: "started_at",
                ..
            }
        ));
    }
}

mod produce {
    use super::*;

    #[test]
    fn writes_first_alias() {
        let mapped = ModelMapper::default()
            .produce(
                Table::RestartPolicyRequest,
                object(json!({"name": "always", "maximum_retry_count": 3, "other": 1})),
            )
            .unwrap();
        assert_eq!(
            Value::Object(mapped.normalized),
            json!({"MaximumRetryCount": 3, "Name": "always"})
        );
        assert_eq!(Value::Object(mapped.remainder), json!({"other": 1}));
    }

    #[test]
    fn shared_wire_key_first_field_wins() {
        let mapped = ModelMapper::default()
            .produce(
                Table::ContainerConfigRequest,
                object(json!({"command": ["b"], "cmd": ["a"]})),
            )
            .unwrap();
        assert_eq!(mapped.normalized.get("Cmd"), Some(&json!(["a"])));
        assert_eq!(mapped.remainder.get("command"), Some(&json!(["b"])));
    }

    #[test]
    fn later_field_used_when_first_absent() {
        let mapped = ModelMapper::default()
            .produce(
                Table::ContainerConfigRequest,
                object(json!({"command": ["b"]})),
            )
            .unwrap();
        assert_eq!(mapped.normalized.get("Cmd"), Some(&json!(["b"])));
        assert!(mapped.remainder.is_empty());
    }
}

mod catalog {
    use super::*;

    fn port_table() -> FieldTable {
        FieldTable::new(Table::Port, vec![FieldSpec::new("ip", "IP")])
    }

    #[test]
    fn standard_catalog_validates() {
        let catalog = Catalog::new(standard_tables()).unwrap();
        assert_eq!(catalog.len(), Table::ALL.len());
    }

    #[test]
    fn duplicate_table_rejected() {
        let err = Catalog::new(vec![port_table(), port_table()]).unwrap_err();
        assert_eq!(err, CatalogError::DuplicateTable(Table::Port));
    }

    #[test]
    fn missing_nested_table_rejected() {
        let err = Catalog::new(vec![FieldTable::new(
            Table::Container,
            vec![FieldSpec::new("ports", "Ports").nested_list(Table::Port)],
        )])
        .unwrap_err();
        assert_eq!(
            err,
            CatalogError::MissingTable {
                from: Table::Container,
                missing: Table::Port
            }
        );
    }

    #[test]
    fn nested_direction_must_match() {
        let err = Catalog::new(vec![
            FieldTable::new(
                Table::HostConfig,
                vec![FieldSpec::new("devices", "Devices").nested_list(Table::DeviceRequest)],
            ),
            FieldTable::new(Table::DeviceRequest, vec![]),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            CatalogError::DirectionMismatch {
                from: Table::HostConfig,
                nested: Table::DeviceRequest
            }
        );
    }

    #[test]
    fn cycle_rejected() {
        let err = Catalog::new(vec![
            FieldTable::new(
                Table::Container,
                vec![FieldSpec::new("image", "Image").nested(Table::Image)],
            ),
            FieldTable::new(
                Table::Image,
                vec![FieldSpec::new("container", "Container").nested(Table::Container)],
            ),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            CatalogError::Cycle(vec![Table::Container, Table::Image, Table::Container])
        );
    }

    #[test]
    fn unregistered_table_is_mapping_error() {
        let catalog = Catalog::new(vec![port_table()]).unwrap();
        let err = ModelMapper::new(&catalog)
            .consume(Table::Container, Object::new())
            .unwrap_err();
        assert!(matches!(err, MappingError::UnknownTable(Table::Container)));
    }

    #[test]
    fn table_names_parse() {
        assert_eq!("container-inspect".parse::<Table>(), Ok(Table::ContainerInspect));
        assert!("nope".parse::<Table>().is_err());
        assert_eq!(Table::HostConfigRequest.direction(), Direction::Encode);
    }
}

fn aliased_catalog() -> Catalog {
    Catalog::new(vec![FieldTable::new(
        Table::Port,
        vec![
            FieldSpec::aliased("ip", nonempty!["IP", "Ip"]),
            FieldSpec::new("private_port", "PrivatePort"),
            FieldSpec::aliased("protocol", nonempty!["Type", "Proto"]),
        ],
    )])
    .unwrap()
}

fn wire_object() -> impl Strategy<Value = Object> {
    let key = prop_oneof![
        Just("IP".to_string()),
        Just("Ip".to_string()),
        Just("PrivatePort".to_string()),
        Just("Type".to_string()),
        Just("Proto".to_string()),
        "[A-Z][a-z]{0,5}",
    ];
    prop::collection::btree_map(key, any::<i64>().prop_map(|n| json!(n)), 0..8)
        .prop_map(|m| m.into_iter().collect())
}

proptest! {
    #[test]
    fn every_key_consumed_or_kept_exactly_once(wire in wire_object()) {
        let catalog = aliased_catalog();
        let mapped = ModelMapper::new(&catalog).consume(Table::Port, wire.clone()).unwrap();

        prop_assert_eq!(mapped.normalized.len() + mapped.remainder.len(), wire.len());
        for (key, value) in &mapped.remainder {
            prop_assert_eq!(wire.get(key), Some(value));
        }
        for field in catalog.get(Table::Port).unwrap().fields() {
            let present: Vec<&str> = field
                .aliases()
                .iter()
                .copied()
                .filter(|alias| wire.contains_key(*alias))
                .collect();
            match present.first() {
                Some(first) => {
                    prop_assert_eq!(mapped.normalized.get(field.name()), wire.get(*first));
                    prop_assert!(!mapped.remainder.contains_key(*first));
                }
                None => prop_assert!(!mapped.normalized.contains_key(field.name())),
            }
        }
    }

    #[test]
    fn identity_tables_round_trip(wire in wire_object()) {
        let mapper = ModelMapper::default();
        let consumed = mapper.consume(Table::Port, wire.clone()).unwrap();
        let produced = mapper.produce(Table::Port, consumed.normalized).unwrap();

        prop_assert!(produced.remainder.is_empty());
        let mut rebuilt = produced.normalized;
        rebuilt.extend(consumed.remainder);
        prop_assert_eq!(rebuilt, wire);
    }
}
