use anyhow::Result;
use arxml_viewer::core::filter::{Filter, FilterManager};
use arxml_viewer::core::layout::{detect_best_layout, LayoutEngine, LayoutParameters, LayoutType};
use arxml_viewer::core::navigation::{Navigator, ViewMode};
use arxml_viewer::core::parser::{ArxmlParser, ParserOptions};
use arxml_viewer::core::search::{SearchEngine, SearchMode, SearchScope};
use arxml_viewer::domain::interface::InterfaceType;
use arxml_viewer::domain::model::{ArxmlModel, ComponentType, ConnectionType};

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/vehicle.arxml");

fn load_model() -> Result<ArxmlModel> {
    let mut parser = ArxmlParser::new(ParserOptions::default());
    Ok(parser.parse_file(FIXTURE)?)
}

#[test]
fn test_parse_fixture_statistics() -> Result<()> {
    let model = load_model()?;
    let stats = model.statistics();

    assert_eq!(stats.packages_parsed, 4);
    assert_eq!(stats.components_parsed, 5);
    assert_eq!(stats.ports_parsed, 7);
    assert_eq!(stats.interfaces_parsed, 3);
    assert_eq!(stats.methods_parsed, 1);
    assert_eq!(stats.data_elements_parsed, 2);
    assert_eq!(stats.prototypes_parsed, 4);
    assert_eq!(stats.connections_parsed, 4);
    assert_eq!(stats.unresolved_references, 0);

    assert_eq!(model.metadata.autosar_version, "4.3.0");
    assert_eq!(model.metadata.root_element, "AUTOSAR");
    assert!(model.metadata.namespaces.contains_key("xsi"));
    assert!(model.metadata.file_path.ends_with("vehicle.arxml"));

    let counts = model.component_type_counts();
    assert_eq!(counts[ComponentType::SensorActuator.tag()], 2);
    assert_eq!(counts[ComponentType::Composition.tag()], 1);
    Ok(())
}

#[test]
fn test_package_hierarchy() -> Result<()> {
    let model = load_model()?;

    assert_eq!(model.packages.len(), 1);
    let vehicle = &model.packages[0];
    assert_eq!(vehicle.uuid, "pkg-vehicle");
    assert_eq!(vehicle.desc.as_deref(), Some("Brake-by-wire demo system"));
    assert_eq!(vehicle.sub_packages.len(), 3);

    let components = model.find_package("/Vehicle/Components").unwrap();
    assert_eq!(components.parent_path.as_deref(), Some("/Vehicle"));
    assert_eq!(components.components.len(), 4);
    assert_eq!(vehicle.all_components(true).len(), 5);

    let interfaces = model.find_package("/Vehicle/Interfaces").unwrap();
    assert_eq!(interfaces.interfaces.len(), 3);
    Ok(())
}

#[test]
fn test_references_are_resolved() -> Result<()> {
    let model = load_model()?;

    let controller = model.find_component_by_name("BrakeController").unwrap();
    let speed_in = controller.port_by_name("SpeedIn").unwrap();
    assert_eq!(speed_in.interface_uuid.as_deref(), Some("if-speed"));
    assert_eq!(speed_in.component_uuid.as_deref(), Some("swc-brake-controller"));

    let composition = model.find_component("swc-vehicle-composition").unwrap();
    assert!(composition.is_composition());
    assert_eq!(composition.prototypes.len(), 4);
    assert!(composition
        .prototypes
        .iter()
        .all(|p| p.component_uuid.is_some()));
    assert_eq!(composition.connections.len(), 4);

    let assembly = model
        .connections
        .iter()
        .find(|c| c.short_name == "Speed_Conn")
        .unwrap();
    assert_eq!(assembly.connection_type, ConnectionType::Assembly);
    assert_eq!(assembly.provider.component_uuid.as_deref(), Some("swc-speed-sensor"));
    assert_eq!(assembly.provider.port_uuid.as_deref(), Some("port-speed-out"));
    assert_eq!(assembly.requester.port_uuid.as_deref(), Some("port-speed-in"));

    let delegation = model
        .connections
        .iter()
        .find(|c| c.connection_type == ConnectionType::Delegation)
        .unwrap();
    assert_eq!(
        delegation.requester.component_uuid.as_deref(),
        Some("swc-vehicle-composition")
    );
    assert_eq!(delegation.requester.port_uuid.as_deref(), Some("port-speed-export"));

    assert_eq!(model.connections_for_component("swc-brake-controller").len(), 3);
    assert_eq!(model.connections_for_port("port-speed-out").len(), 2);
    Ok(())
}

#[test]
fn test_interfaces() -> Result<()> {
    let model = load_model()?;

    assert_eq!(model.interfaces_by_type(InterfaceType::SenderReceiver).len(), 2);

    let diag = model.find_interface_by_ref("/Vehicle/Interfaces/DiagnosticService").unwrap();
    assert!(diag.is_client_server());
    assert!(diag.is_service_interface);
    let read_dtc = diag.method_by_name("ReadDtc").unwrap();
    assert_eq!(read_dtc.input_arguments().len(), 1);
    assert_eq!(read_dtc.output_arguments().len(), 1);
    assert_eq!(read_dtc.possible_errors, ["E_NOT_OK"]);
    assert!(diag.generate_documentation().contains("ReadDtc"));

    let speed = model.interface("if-speed").unwrap();
    let element = speed.data_element_by_name("VehicleSpeed").unwrap();
    assert_eq!(element.type_name(), "uint16");
    assert_eq!(element.default_value.as_deref(), Some("0"));
    assert!(element.is_primitive());
    Ok(())
}

#[test]
fn test_search_over_fixture() -> Result<()> {
    let model = load_model()?;
    let mut search = SearchEngine::new();
    search.build_index(&model);

    let components = search.search("speed", SearchScope::Components, SearchMode::Contains, 10);
    assert_eq!(components.len(), 1);
    assert_eq!(components[0].item_name, "SpeedSensor");
    assert_eq!(components[0].parent_package.as_deref(), Some("/Vehicle/Components"));

    let ports = search.search("speed", SearchScope::Ports, SearchMode::StartsWith, 10);
    assert_eq!(ports.len(), 3);

    let interfaces = search.search("^Brake", SearchScope::Interfaces, SearchMode::Regex, 10);
    assert_eq!(interfaces.len(), 1);
    assert_eq!(interfaces[0].item_name, "BrakeCmdIf");

    let limited = search.search("e", SearchScope::All, SearchMode::Contains, 2);
    assert_eq!(limited.len(), 2);

    let stats = search.statistics();
    assert_eq!(stats.total_indexed_items, 4 + 5 + 7 + 3);
    assert_eq!(stats.packages_indexed, 1);
    Ok(())
}

#[test]
fn test_filters_over_fixture() -> Result<()> {
    let model = load_model()?;
    let components = model.all_components();

    let mut manager = FilterManager::new();
    assert!(manager.apply_quick_filter("sensor_actuator"));
    let sensors = manager.filter_components(components.iter().copied());
    let names: Vec<&str> = sensors.iter().map(|c| c.short_name.as_str()).collect();
    assert_eq!(names, ["SpeedSensor", "BrakeActuator"]);

    let brake: Filter = "name=brake".parse().map_err(anyhow::Error::msg)?;
    manager.add_filter("brake", brake);
    let filtered = manager.filter_components(components.iter().copied());
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].short_name, "BrakeActuator");

    manager.clear_filters();
    assert!(manager.apply_quick_filter("required_ports"));
    let ports = manager.filter_ports(components.iter().copied().flat_map(|c| c.all_ports()));
    assert_eq!(ports.len(), 3);
    Ok(())
}

#[test]
fn test_layouts_over_fixture() -> Result<()> {
    let model = load_model()?;
    let components = model.all_components();
    assert_eq!(
        detect_best_layout(components.len(), model.connections.len()),
        LayoutType::Circular
    );

    let engine = LayoutEngine::new(LayoutParameters::default());
    for layout_type in LayoutType::ALL {
        let result = engine.apply_layout(&components, &model.connections, layout_type);
        assert_eq!(result.positions.len(), components.len(), "{}", layout_type);

        let (min_x, min_y, _, _) = result.bounds().unwrap();
        assert!(min_x >= 50.0 && min_y >= 50.0, "{}", layout_type);

        for component in &components {
            assert!(result.positions.contains_key(&component.uuid));
        }
    }

    let first = engine.apply_layout(&components, &model.connections, LayoutType::ForceDirected);
    let second = engine.apply_layout(&components, &model.connections, LayoutType::ForceDirected);
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_navigation_over_fixture() -> Result<()> {
    let model = load_model()?;
    let mut navigator = Navigator::new(&model);

    assert!(navigator.navigate_to_package("/Vehicle/Components", true));
    assert_eq!(navigator.breadcrumb(), ["Vehicle", "Components"]);
    assert!(navigator.select_component("swc-brake-controller", true));
    navigator.set_view_mode(ViewMode::Tree);

    assert!(navigator.navigate_to_breadcrumb(0));
    assert_eq!(navigator.current_package().unwrap().short_name, "Vehicle");
    assert!(navigator.current_component().is_none());
    assert_eq!(navigator.state().view_mode, ViewMode::Tree);

    assert!(navigator.navigate_back());
    assert_eq!(
        navigator.current_component().map(|c| c.short_name.as_str()),
        Some("BrakeController")
    );
    assert!(navigator.select_by_uuid("pkg-compositions"));
    assert_eq!(navigator.breadcrumb(), ["Vehicle", "Compositions"]);
    assert!(!navigator.can_navigate_forward());
    Ok(())
}

#[test]
fn test_parse_rejects_non_autosar_when_required() {
    let mut parser = ArxmlParser::new(ParserOptions {
        require_autosar_root: true,
        ..ParserOptions::default()
    });
    let result = parser.parse_str("<ROOT><AR-PACKAGES/></ROOT>", "plain.xml");
    assert!(matches!(
        result,
        Err(arxml_viewer::ViewerError::NotAutosar { .. })
    ));
}
