use identity::chart::keys;
use identity::{
    ChartIdentity, ChartSource, DataProviderName, DataType, HistoryType, IdentityError,
    PinBoardDefinition, PinDescription, PortSource, PropertyBag,
};

fn port_source() -> PortSource {
    PortSource::new("edge-switch-07 hfi1_0", 0x1a, 3)
}

#[test]
fn group_identity_round_trip() {
    let identity = ChartIdentity::groups("bw", "Bandwidth", ["All", "HFIs", "SWs"])
        .with_data_type(Some(DataType::External))
        .with_history_type(Some(HistoryType::OneHour));

    let bag = identity.encode().unwrap();
    assert_eq!(bag.get(keys::GROUPS), Some("All;HFIs;SWs"));
    assert!(!bag.contains(keys::VFS));

    let decoded = ChartIdentity::decode(&bag).unwrap();
    assert_eq!(decoded, identity);
    assert!(decoded.same_configuration(&identity));
    assert_eq!(decoded.provider(), DataProviderName::Group);
}

#[test]
fn virtual_fabric_identity_round_trip() {
    let identity = ChartIdentity::virtual_fabrics("vf_pr", "VF Packet Rate", ["Default", "Admin"]);
    let bag = identity.encode().unwrap();
    assert_eq!(bag.get(keys::VFS), Some("Default;Admin"));

    let decoded = ChartIdentity::decode(&bag).unwrap();
    assert!(decoded.same_configuration(&identity));
    assert_eq!(decoded.provider(), DataProviderName::VirtualFabric);
    assert_eq!(decoded.data_type(), None);
    assert_eq!(decoded.history_type(), None);
}

#[test]
fn vf_key_wins_over_group_key() {
    let bag: PropertyBag = [
        (keys::NAME, "mixed"),
        (keys::GROUPS, "All"),
        (keys::VFS, "Default"),
    ]
    .into_iter()
    .collect();
    let decoded = ChartIdentity::decode(&bag).unwrap();
    assert_eq!(
        decoded.source(),
        &ChartSource::VirtualFabrics(vec!["Default".to_string()])
    );
}

#[test]
fn port_identity_round_trip() {
    let identity = ChartIdentity::port("port_bw", "Port Bandwidth", port_source().in_vf("Default"))
        .with_data_type(Some(DataType::Receive));
    let bag = identity.encode().unwrap();
    assert_eq!(bag.get(keys::LID), Some("26"));
    assert!(!bag.contains(keys::FIELD));

    let decoded = ChartIdentity::decode(&bag).unwrap();
    assert!(decoded.same_configuration(&identity));
    assert_eq!(decoded.source().port().and_then(|p| p.vf.as_deref()), Some("Default"));
}

#[test]
fn port_counter_identity_round_trip() {
    let identity = ChartIdentity::port_counter(
        "xmit_wait",
        "Transmit Wait",
        port_source(),
        "port_xmit_wait",
    )
    .with_history_type(Some(HistoryType::SixHours));
    let decoded = ChartIdentity::decode(&identity.encode().unwrap()).unwrap();
    assert!(decoded.same_configuration(&identity));
    match decoded.source() {
        ChartSource::PortCounter { port, field } => {
            assert_eq!(port.port, 3);
            assert_eq!(field, "port_xmit_wait");
        }
        other => panic!("unexpected source {other:?}"),
    }
}

#[test]
fn bag_without_discriminating_keys_is_rejected() {
    let bag: PropertyBag = [(keys::NAME, "orphan"), (keys::FULL_NAME, "Orphan")]
        .into_iter()
        .collect();
    let err = ChartIdentity::decode(&bag).unwrap_err();
    assert!(matches!(err, IdentityError::UnsupportedEncoding { .. }));
    let message = err.to_string();
    assert!(message.starts_with("unsupported chart identity encoding"));
    assert!(message.contains("name=orphan"));
}

#[test]
fn malformed_port_values_are_named() {
    let bag: PropertyBag = [
        (keys::NAME, "p"),
        (keys::NODE_DESC, "node"),
        (keys::LID, "not-a-number"),
        (keys::PORT, "1"),
    ]
    .into_iter()
    .collect();
    assert_eq!(
        ChartIdentity::decode(&bag).unwrap_err(),
        IdentityError::InvalidValue {
            key: keys::LID,
            value: "not-a-number".to_string()
        }
    );

    let bag: PropertyBag = [(keys::NAME, "p"), (keys::LID, "1"), (keys::PORT, "1")]
        .into_iter()
        .collect();
    assert_eq!(
        ChartIdentity::decode(&bag).unwrap_err(),
        IdentityError::MissingKey(keys::NODE_DESC)
    );
}

#[test]
fn reserved_delimiter_in_source_is_rejected() {
    let identity = ChartIdentity::groups("bw", "Bandwidth", ["All", "HFIs;SWs"]);
    let err = identity.encode().unwrap_err();
    assert_eq!(
        err,
        IdentityError::ReservedDelimiter {
            component: "HFIs;SWs".to_string(),
            delimiter: ';'
        }
    );
    // identity itself is unchanged and still usable
    assert_eq!(
        identity.source(),
        &ChartSource::Groups(vec!["All".to_string(), "HFIs;SWs".to_string()])
    );
}

#[test]
fn empty_source_component_is_rejected() {
    let identity = ChartIdentity::virtual_fabrics("vf", "VF", ["Default", ""]);
    assert_eq!(
        identity.encode().unwrap_err(),
        IdentityError::EmptySourceComponent
    );
}

#[test]
fn identities_with_same_name_collide_even_when_configured_differently() {
    // A group chart and a port chart sharing a display name address the same
    // pin slot. Kept on purpose; this test pins the behaviour down.
    let group = ChartIdentity::groups("Bandwidth", "Bandwidth", ["All"]);
    let port = ChartIdentity::port("Bandwidth", "Port Bandwidth", port_source());
    assert_eq!(group, port);
    assert!(!group.same_configuration(&port));

    let mut set = std::collections::HashSet::new();
    set.insert(group);
    assert!(!set.insert(port));
}

#[test]
fn pin_board_definition_save_and_load() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("pins.json");

    let identity = ChartIdentity::groups("bw", "Bandwidth", ["All"]);
    let mut board = PinBoardDefinition::new("main");
    board
        .pins
        .push(PinDescription::from_identity("perf.bandwidth", &identity).unwrap());
    board.save_to_file(&path).expect("save");

    let loaded = PinBoardDefinition::load_from_file(&path).expect("load");
    assert_eq!(loaded.name, "main");
    assert_eq!(loaded.pins.len(), 1);
    assert_eq!(loaded.pins[0].provider, "perf.bandwidth");
    assert_eq!(loaded.pins[0].description, "All");
    assert!(loaded.pins[0].identity().unwrap().same_configuration(&identity));
}

#[test]
fn loading_missing_pin_board_reports_io_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let err = PinBoardDefinition::load_from_file(temp.path().join("absent.json")).unwrap_err();
    assert!(err.to_string().starts_with("io error"));
}
