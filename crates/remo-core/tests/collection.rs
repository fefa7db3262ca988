//! Integration tests for lazy collection iteration, indexed access, and
//! column-wise property reads.

mod common;

use common::MockGateway;
use remo_core::{
    Attribute, CallArg, ProxyHandle, PropertyColumn, RemoError, Session, SessionConfig, Value,
};
use serde_json::json;

fn paged_gateway() -> MockGateway {
    MockGateway::new()
        .with_collection(
            "{C}",
            "Points",
            &["{E1}", "{E2}", "{E3}", "{E4}", "{E5}", "{E6}", "{E7}"],
        )
        .with_named("Points", "{C}")
}

fn named_handle(session: &mut Session<MockGateway>, name: &str) -> ProxyHandle {
    let global = session.global();
    match session.attribute(&global, name).unwrap() {
        Attribute::Property(handle) => handle,
        Attribute::Method(_) => panic!("'{name}' resolved to a method"),
    }
}

fn tokens_of(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.as_handle().expect("expected a handle").token().to_string())
        .collect()
}

#[test]
fn test_lazy_pagination_preserves_order() {
    let config = SessionConfig::default().with_page_size(3);
    let mut session = Session::new(paged_gateway(), config);
    let points = named_handle(&mut session, "Points");

    let values: Vec<Value> = session
        .elements(&points)
        .unwrap()
        .collect::<remo_core::Result<_>>()
        .unwrap();
    assert_eq!(
        tokens_of(&values),
        vec!["{E1}", "{E2}", "{E3}", "{E4}", "{E5}", "{E6}", "{E7}"]
    );

    // 7 elements in pages of 3: one count, three window fetches.
    assert_eq!(session.gateway().calls_with("list:count:{C}"), 1);
    assert_eq!(session.gateway().calls_with("list:sublist:{C}"), 3);
}

#[test]
fn test_early_termination_skips_unvisited_pages() {
    let config = SessionConfig::default().with_page_size(3);
    let mut session = Session::new(paged_gateway(), config);
    let points = named_handle(&mut session, "Points");

    {
        let mut iter = session.elements(&points).unwrap();
        iter.next().unwrap().unwrap();
        iter.next().unwrap().unwrap();
    }
    assert_eq!(session.gateway().calls_with("list:sublist:{C}"), 1);
}

#[test]
fn test_second_iteration_is_served_from_cache() {
    let config = SessionConfig::default().with_page_size(3);
    let mut session = Session::new(paged_gateway(), config);
    let points = named_handle(&mut session, "Points");

    for _ in 0..2 {
        let count = session.elements(&points).unwrap().count();
        assert_eq!(count, 7);
    }
    assert_eq!(session.gateway().calls_with("list:count:{C}"), 1);
    assert_eq!(session.gateway().calls_with("list:sublist:{C}"), 3);
}

#[test]
fn test_indexed_access_is_bounds_checked() {
    let mut session = Session::new(paged_gateway(), SessionConfig::default());
    let points = named_handle(&mut session, "Points");

    let third = session.item(&points, 2).unwrap();
    assert_eq!(
        third.as_handle().map(|h| h.token().as_str()),
        Some("{E3}")
    );

    let err = session.item(&points, 9);
    assert!(matches!(
        err,
        Err(RemoError::IndexOutOfRange { index: 9, len: 7 })
    ));
}

#[test]
fn test_slice_always_yields_a_list() {
    let mut session = Session::new(paged_gateway(), SessionConfig::default());
    let points = named_handle(&mut session, "Points");

    let one = session.slice(&points, 2, 3).unwrap();
    assert_eq!(one.as_list().map(<[Value]>::len), Some(1));
}

#[test]
fn test_member_queries_skip_proxy_construction() {
    let gateway = paged_gateway()
        .with_value("{E1}", "Name", json!("Point_1"))
        .with_value("{E2}", "Name", json!("Point_2"));
    let mut session = Session::new(gateway, SessionConfig::default());
    let points = named_handle(&mut session, "Points");

    assert_eq!(
        session.member_item(&points, 0, "Name").unwrap(),
        Value::Text("Point_1".to_string())
    );
    let names = session.member_slice(&points, 0, 2, "Name").unwrap();
    assert_eq!(
        names.as_list(),
        Some(&[
            Value::Text("Point_1".to_string()),
            Value::Text("Point_2".to_string())
        ][..])
    );
}

#[test]
fn test_object_property_delegates_to_wrapped_collection() {
    let gateway = paged_gateway()
        .with_object("{A}", "Beam")
        .with_property("{A}", "Ends", "{AE}", "Object")
        .with_named("Beam1", "{A}")
        .with_value(
            "{A}",
            "Ends",
            json!({"type": "Points", "guid": "{C}", "islistable": true}),
        );
    let mut session = Session::new(gateway, SessionConfig::default());

    let beam = named_handle(&mut session, "Beam1");
    let ends = match session.attribute(&beam, "Ends").unwrap() {
        Attribute::Property(handle) => handle,
        Attribute::Method(_) => panic!("'Ends' resolved to a method"),
    };
    assert_eq!(session.count(&ends).unwrap(), 7);

    // The entity itself is not listable.
    let err = session.count(&beam);
    assert!(matches!(err, Err(RemoError::NotACollection { .. })));
}

#[test]
fn test_set_item_renders_and_bounds_checks() {
    let mut session = Session::new(paged_gateway(), SessionConfig::default());
    let points = named_handle(&mut session, "Points");

    session.set_item(&points, 1, CallArg::Int(9)).unwrap();
    assert_eq!(session.gateway().calls_with("command:set {C} 1 9"), 1);

    let err = session.set_item(&points, 9, CallArg::Int(0));
    assert!(matches!(err, Err(RemoError::IndexOutOfRange { .. })));
}

#[test]
fn test_property_column_reads_in_one_batch() {
    let gateway = MockGateway::new()
        .with_collection("{C}", "Nodes", &["{E1}", "{E2}", "{E3}"])
        .with_named("Nodes", "{C}")
        .with_value("{E1}", "u", json!(0.1))
        .with_value("{E2}", "u", json!(0.2))
        .with_value("{E3}", "u", json!(0.3));
    let mut session = Session::new(gateway, SessionConfig::default());
    let nodes = named_handle(&mut session, "Nodes");

    let column = PropertyColumn::new(nodes, "u");
    assert_eq!(column.len(&mut session).unwrap(), 3);
    assert_eq!(
        column.values(&mut session).unwrap(),
        vec![Value::Double(0.1), Value::Double(0.2), Value::Double(0.3)]
    );
    // One batched read for the whole column.
    assert_eq!(session.gateway().calls_with("values:u"), 1);

    assert_eq!(column.get(&mut session, 1).unwrap(), Value::Double(0.2));
    let err = column.get(&mut session, 3);
    assert!(matches!(err, Err(RemoError::IndexOutOfRange { .. })));
}

#[test]
fn test_property_column_under_a_phase() {
    let gateway = MockGateway::new()
        .with_collection("{C}", "Nodes", &["{E1}", "{E2}"])
        .with_named("Nodes", "{C}")
        .with_object("{PH1}", "Phase")
        .with_named("Phase1", "{PH1}")
        .with_staged_value("{E1}", "u", "{PH1}", json!(0.5))
        .with_staged_value("{E2}", "u", "{PH1}", json!(0.7));
    let mut session = Session::new(gateway, SessionConfig::default());
    let nodes = named_handle(&mut session, "Nodes");
    let phase = named_handle(&mut session, "Phase1");

    let column = PropertyColumn::new(nodes, "u").in_phase(phase);
    assert_eq!(
        column.values(&mut session).unwrap(),
        vec![Value::Double(0.5), Value::Double(0.7)]
    );
}

#[test]
fn test_property_column_set_goes_through_the_element() {
    let gateway = MockGateway::new()
        .with_collection("{C}", "Nodes", &["{E1}"])
        .with_named("Nodes", "{C}")
        .with_object("{E1}", "Node")
        .with_property("{E1}", "u", "{E1U}", "Number")
        .with_value("{E1}", "u", json!(0.1));
    let mut session = Session::new(gateway, SessionConfig::default());
    let nodes = named_handle(&mut session, "Nodes");

    let column = PropertyColumn::new(nodes, "u");
    column
        .set(&mut session, 0, CallArg::Double(0.9))
        .unwrap();
    assert_eq!(session.gateway().calls_with("command:set {E1U} 0.9"), 1);
}
