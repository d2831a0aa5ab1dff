mod common;

use common::Fixture;
use daq_config::store::{
    ClassObjectLifecycle, ClassObjectManager, ConfigBackend, Configuration, NamedObject,
    ObjectLifecycle, ObjectManager, ObjectModifier, OksBackend,
};
use daq_config::{AdaptorError, Finding, NameList};
use serde_json::{json, Map, Value};

fn attributes(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn names<T: NamedObject>(objects: &[T]) -> Vec<String> {
    objects.iter().map(|o| o.name().unwrap()).collect()
}

fn open(fixture: &Fixture) -> OksBackend {
    OksBackend::with_path(&fixture.schema_path(), fixture.diagnostics.clone()).unwrap()
}

#[test]
fn test_queries_before_open_fail() {
    let fixture = Fixture::new();
    let backend = OksBackend::new(fixture.diagnostics.clone());

    assert!(!backend.configuration().is_open());
    assert!(matches!(
        backend.handler().get_obj("Component"),
        Err(AdaptorError::ConfigurationNotLoaded)
    ));
    assert!(matches!(
        backend.handler().get_all_obj(None),
        Err(AdaptorError::ConfigurationNotLoaded)
    ));
}

#[test]
fn test_naming_convention_is_only_a_warning() {
    let fixture = Fixture::new();
    let odd = fixture.write("odd-name.xml", common::SCHEMA);
    let mut backend = OksBackend::new(fixture.diagnostics.clone());

    backend.open(&odd).unwrap();

    assert!(backend.configuration().is_open());
    assert_eq!(backend.configuration().name(), Some(odd.as_str()));
    assert!(fixture
        .diagnostics
        .contains(|f| matches!(f, Finding::NamingConvention { expected_suffix, .. } if expected_suffix == "schema.xml")));
}

#[test]
fn test_open_missing_file_fails() {
    let fixture = Fixture::new();
    let mut backend = OksBackend::new(fixture.diagnostics.clone());

    let result = backend.open(&fixture.path("absent.schema.xml"));

    assert!(matches!(result, Err(AdaptorError::Io { .. })));
    assert!(!backend.configuration().is_open());
}

#[test]
fn test_get_all_sorted_and_filtered() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let handler = backend.handler();

    assert_eq!(
        names(&handler.get_all_obj(None).unwrap()),
        vec![
            "Application",
            "Component",
            "DataHandlerModule",
            "Resource",
            "Segment",
            "Session"
        ]
    );

    let filtered = handler
        .get_all_obj(Some(NameList::from(vec!["Session", "Component", "Session"])))
        .unwrap();
    assert_eq!(names(&filtered), vec!["Session", "Component"]);

    assert!(matches!(
        handler.get_all_obj(Some(NameList::from("Missing"))),
        Err(AdaptorError::ObjectNotFound(_))
    ));
    assert!(matches!(
        handler.get_obj("Missing"),
        Err(AdaptorError::ObjectNotFound(_))
    ));
}

#[test]
fn test_create_then_get() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let handler = backend.handler();

    let created = handler
        .create(
            "Detector",
            &attributes(json!({
                "description": "Front-end electronics",
                "is_abstract": true,
                "colour": "red"
            })),
        )
        .unwrap();
    let fetched = handler.get_obj("Detector").unwrap();

    assert_eq!(created, fetched);
    assert_eq!(fetched.get_attr("description").unwrap(), json!("Front-end electronics"));
    assert_eq!(fetched.get_attr("is_abstract").unwrap(), json!(true));
    assert_eq!(fetched.get_attr("file").unwrap(), json!(fixture.schema_path()));
    assert!(fixture
        .diagnostics
        .contains(|f| matches!(f, Finding::IgnoredParameter { key, .. } if key == "colour")));

    assert!(matches!(
        handler.create("Detector", &Map::new()),
        Err(AdaptorError::DuplicateObject(_))
    ));
}

#[test]
fn test_rename_keeps_structure_and_stales_original() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let handler = backend.handler();
    let resource = handler.get_obj("Resource").unwrap();
    let before = resource.summary().unwrap();
    let own_attributes = names(&resource.attributes().get_all().unwrap());

    let renamed = handler.rename(&resource, "Hardware").unwrap();

    assert_eq!(renamed.name().unwrap(), "Hardware");
    assert_eq!(renamed.description().unwrap(), before.description);
    assert_eq!(renamed.super_classes().unwrap(), before.super_classes);
    assert_eq!(names(&renamed.attributes().get_all().unwrap()), own_attributes);
    assert!(matches!(resource.name(), Err(AdaptorError::StaleObject(_))));
    assert!(matches!(handler.get_obj("Resource"), Err(AdaptorError::ObjectNotFound(_))));

    let module = handler.get_obj("DataHandlerModule").unwrap();
    assert_eq!(module.super_classes().unwrap(), vec!["Hardware", "Application"]);
}

#[test]
fn test_delete_makes_wrappers_stale() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let handler = backend.handler();
    let segment = handler.get_obj("Segment").unwrap();

    handler.delete(&segment).unwrap();

    assert!(!segment.is_alive());
    assert!(matches!(segment.get_attr("name"), Err(AdaptorError::StaleObject(_))));
    assert!(matches!(handler.get_obj("Segment"), Err(AdaptorError::ObjectNotFound(_))));
    assert!(matches!(handler.delete(&segment), Err(AdaptorError::StaleObject(_))));
}

#[test]
fn test_add_copies_class_from_another_schema() {
    let fixture = Fixture::new();
    let other_path = fixture.write(
        "detectors.schema.xml",
        r#"<oks-schema>
  <class name="Detector" description="Front end">
    <attribute name="channels" type="u32" init-value="128"/>
  </class>
</oks-schema>"#,
    );
    let other = OksBackend::with_path(&other_path, fixture.diagnostics.clone()).unwrap();
    let backend = open(&fixture);

    let detector = other.handler().get_obj("Detector").unwrap();
    let copy = backend.handler().add(&detector).unwrap();

    assert_ne!(copy, detector);
    assert_eq!(copy.name().unwrap(), "Detector");
    assert_eq!(copy.description().unwrap(), "Front end");
    let channels = copy.attributes().get("channels").unwrap().unwrap();
    assert_eq!(channels.get_attr("init_value").unwrap(), json!("128"));
    assert_ne!(channels.id(), detector.attributes().get("channels").unwrap().unwrap().id());

    assert!(matches!(
        backend.handler().add(&detector),
        Err(AdaptorError::DuplicateObject(_))
    ));
}

#[test]
fn test_unknown_but_supported_set_warns_and_unsupported_set_fails() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let application = backend.handler().get_obj("Application").unwrap();

    application.set_attr("transient", json!(true)).unwrap();
    assert_eq!(application.get_attr("transient").unwrap(), json!(true));
    assert!(fixture
        .diagnostics
        .contains(|f| matches!(f, Finding::UnknownAttribute { attribute, .. } if attribute == "transient")));

    let before = application.summary().unwrap();
    let result = application.set_attr("totally_unknown_field", json!(1));

    assert!(matches!(result, Err(AdaptorError::UnsupportedAttribute { .. })));
    assert_eq!(application.summary().unwrap(), before);
    assert!(fixture.diagnostics.contains(
        |f| matches!(f, Finding::UnsupportedAttribute { attribute, .. } if attribute == "totally_unknown_field")
    ));
}

#[test]
fn test_name_is_read_only_on_class() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let session = backend.handler().get_obj("Session").unwrap();

    assert!(matches!(
        session.set_attr("name", json!("Run")),
        Err(AdaptorError::UnsupportedAttribute { .. })
    ));
    assert_eq!(session.name().unwrap(), "Session");
}

#[test]
fn test_property_lookup_own_then_inherited() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let application = backend.handler().get_obj("Application").unwrap();
    let attributes = application.attributes();

    assert!(attributes.get("port").unwrap().is_some());
    assert!(attributes.get("enabled").unwrap().is_some());
    assert!(attributes.get("nope").unwrap().is_none());
    assert!(fixture
        .diagnostics
        .contains(|f| matches!(f, Finding::PropertyNotFound { property, .. } if property == "nope")));

    assert_eq!(names(&attributes.get_all().unwrap()), vec!["port"]);
    assert_eq!(names(&attributes.get_all_inherited().unwrap()), vec!["port", "enabled"]);

    let port = attributes.get("port").unwrap().unwrap();
    assert_eq!(port.get_attr("type").unwrap(), json!("u16"));
    assert_eq!(port.get_attr("range").unwrap(), json!("1024..65535"));
}

#[test]
fn test_relationship_create_with_parent() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let session = backend.handler().get_obj("Session").unwrap();

    let controller = session
        .relationships()
        .create(
            "controller",
            &attributes(json!({
                "type": "Application",
                "low_cardinality_constraint": 1,
                "high_cardinality_constraint": 2,
                "is_dependent": true,
                "description": "Run control",
                "parent": "Segment",
                "weight": 3
            })),
        )
        .unwrap();

    assert_eq!(controller.get_attr("class_type").unwrap(), json!("Application"));
    assert_eq!(controller.get_attr("low_cardinality_constraint").unwrap(), json!(1));
    assert_eq!(controller.get_attr("high_cardinality_constraint").unwrap(), json!(2));
    assert_eq!(controller.get_attr("is_dependent").unwrap(), json!(true));
    assert_eq!(controller.get_attr("is_composite").unwrap(), json!(false));

    let segment = backend.handler().get_obj("Segment").unwrap();
    assert!(segment.relationships().get("controller").unwrap().is_some());
    assert!(fixture
        .diagnostics
        .contains(|f| matches!(f, Finding::IgnoredParameter { key, .. } if key == "weight")));

    let orphan = session
        .relationships()
        .create("broken", &attributes(json!({"type": "Segment", "parent": "Nowhere"})));
    assert!(matches!(orphan, Err(AdaptorError::ObjectNotFound(_))));
}

#[test]
fn test_attribute_and_method_create_are_bare() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let segment = backend.handler().get_obj("Segment").unwrap();

    let label = segment
        .attributes()
        .create("label", &attributes(json!({"type": "u8"})))
        .unwrap();
    assert_eq!(label.get_attr("type").unwrap(), json!("string"));
    assert!(fixture
        .diagnostics
        .contains(|f| matches!(f, Finding::IgnoredParameter { key, .. } if key == "type")));

    let method = segment.methods().create("start", &Map::new()).unwrap();
    assert_eq!(method.get_attr("implementation").unwrap(), json!([]));

    assert!(matches!(
        segment.attributes().create("label", &Map::new()),
        Err(AdaptorError::DuplicateObject(_))
    ));
}

#[test]
fn test_method_implementations() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let component = backend.handler().get_obj("Component").unwrap();
    let configure = component.methods().get("configure").unwrap().unwrap();

    configure
        .set_attr(
            "implementation",
            json!({"language": "python", "prototype": "def configure(self)", "body": "pass"}),
        )
        .unwrap();
    assert_eq!(configure.get_attr("implementation").unwrap().as_array().unwrap().len(), 2);

    configure
        .set_attr("implementation", json!({"remove": true, "language": "c++"}))
        .unwrap();
    let remaining = configure.get_attr("implementation").unwrap();
    assert_eq!(remaining[0]["language"], json!("python"));
    assert_eq!(remaining.as_array().unwrap().len(), 1);

    assert!(matches!(
        configure.set_attr("implementation", json!({"remove": true, "language": "c++"})),
        Err(AdaptorError::InvalidValue { .. })
    ));
}

#[test]
fn test_property_add_delete_rename() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let handler = backend.handler();
    let application = handler.get_obj("Application").unwrap();
    let segment = handler.get_obj("Segment").unwrap();
    let port = application.attributes().get("port").unwrap().unwrap();

    let attached = segment.attributes().add(&port).unwrap();
    assert_eq!(attached, port);
    assert_eq!(names(&segment.attributes().get_all().unwrap()), vec!["port"]);

    segment.attributes().delete(&port).unwrap();
    assert!(segment.attributes().get_all().unwrap().is_empty());
    assert!(application.attributes().get("port").unwrap().is_some());
    assert!(matches!(
        segment.attributes().delete(&port),
        Err(AdaptorError::ObjectNotFound(_))
    ));

    let renamed = application
        .attributes()
        .rename_by_name("port", "listen_port")
        .unwrap();
    assert_eq!(renamed.name().unwrap(), "listen_port");
    assert!(application.attributes().get("port").unwrap().is_none());

    let configure = handler
        .get_obj("Component")
        .unwrap()
        .methods()
        .get("configure")
        .unwrap()
        .unwrap();
    assert!(matches!(
        segment.attributes().add(&configure),
        Err(AdaptorError::StructuralType { .. })
    ));
}

#[test]
fn test_save_writes_message_and_reloads() {
    let fixture = Fixture::new();
    let mut backend = open(&fixture);
    let session = backend.handler().get_obj("Session").unwrap();
    session.set_attr("description", json!("Top of the run")).unwrap();

    backend.save("describe session").unwrap();

    let text = fixture.read(&fixture.schema_path());
    assert!(text.contains("describe session"));
    assert!(text.contains("Top of the run"));
    let history = backend.configuration().history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].digest.len(), 64);

    let reloaded = open(&fixture);
    let session = reloaded.handler().get_obj("Session").unwrap();
    assert_eq!(session.description().unwrap(), "Top of the run");
    assert_eq!(
        names(&reloaded.handler().get_all_obj(None).unwrap()).len(),
        6
    );
}

#[test]
fn test_save_requires_open_configuration() {
    let fixture = Fixture::new();
    let mut backend = OksBackend::new(fixture.diagnostics.clone());
    assert!(matches!(
        backend.save("nothing"),
        Err(AdaptorError::ConfigurationNotLoaded)
    ));
}

#[test]
fn test_partial_and_full_close() {
    let fixture = Fixture::new();
    let extra = fixture.write(
        "extra.schema.xml",
        r#"<oks-schema><class name="Detector"/></oks-schema>"#,
    );
    let main = fixture.write(
        "main.schema.xml",
        r#"<oks-schema>
  <include path="extra.schema.xml"/>
  <class name="Run"/>
</oks-schema>"#,
    );
    let mut backend = OksBackend::with_path(&main, fixture.diagnostics.clone()).unwrap();
    let run = backend.handler().get_obj("Run").unwrap();
    assert!(backend.handler().get_obj("Detector").is_ok());

    backend
        .close(true, NameList::from(vec![extra.clone(), fixture.path("ghost.schema.xml")]))
        .unwrap();

    assert!(matches!(
        backend.handler().get_obj("Detector"),
        Err(AdaptorError::ObjectNotFound(_))
    ));
    assert!(backend.handler().get_obj("Run").is_ok());
    assert!(fixture
        .diagnostics
        .contains(|f| matches!(f, Finding::UnknownCloseTarget { target } if target.ends_with("ghost.schema.xml"))));

    backend.close(false, NameList::new()).unwrap();

    assert!(!backend.configuration().is_open());
    assert!(matches!(
        backend.handler().get_obj("Run"),
        Err(AdaptorError::ConfigurationNotLoaded)
    ));
    assert!(matches!(run.name(), Err(AdaptorError::ConfigurationNotLoaded)));
}

#[test]
fn test_rename_of_inherited_property_keeps_names_unique() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let handler = backend.handler();
    let component = handler.get_obj("Component").unwrap();
    let application = handler.get_obj("Application").unwrap();
    component.attributes().create("label", &Map::new()).unwrap();

    assert!(matches!(
        application.attributes().rename_by_name("enabled", "label"),
        Err(AdaptorError::DuplicateObject(_))
    ));
    let enabled = application.attributes().get("enabled").unwrap().unwrap();
    assert!(matches!(
        enabled.set_attr("name", json!("label")),
        Err(AdaptorError::DuplicateObject(_))
    ));
    assert_eq!(names(&component.attributes().get_all().unwrap()), vec!["enabled", "label"]);

    let renamed = application
        .attributes()
        .rename_by_name("enabled", "active")
        .unwrap();
    assert_eq!(renamed.name().unwrap(), "active");
    assert_eq!(names(&component.attributes().get_all().unwrap()), vec!["active", "label"]);
}

#[test]
fn test_relationship_create_with_taken_parent_name_changes_nothing() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let session = backend.handler().get_obj("Session").unwrap();
    let segment = backend.handler().get_obj("Segment").unwrap();

    let result = session.relationships().create(
        "modules",
        &attributes(json!({"type": "Application", "parent": "Segment"})),
    );

    assert!(matches!(result, Err(AdaptorError::DuplicateObject(_))));
    assert_eq!(names(&session.relationships().get_all().unwrap()), vec!["segment"]);
    assert_eq!(names(&segment.relationships().get_all().unwrap()), vec!["modules"]);
    let modules = segment.relationships().get("modules").unwrap().unwrap();
    assert_eq!(modules.get_attr("class_type").unwrap(), json!("Component"));
}

#[test]
fn test_property_get_reports_stale_and_unloaded() {
    let fixture = Fixture::new();
    let mut backend = open(&fixture);
    let application = backend.handler().get_obj("Application").unwrap();
    let segment = backend.handler().get_obj("Segment").unwrap();

    backend.handler().delete(&application).unwrap();
    assert!(matches!(
        application.attributes().get("port"),
        Err(AdaptorError::StaleObject(_))
    ));
    assert!(matches!(
        application.attributes().rename_by_name("port", "listen_port"),
        Err(AdaptorError::StaleObject(_))
    ));

    backend.close(false, NameList::new()).unwrap();
    assert!(matches!(
        segment.relationships().get("modules"),
        Err(AdaptorError::ConfigurationNotLoaded)
    ));
}

#[test]
fn test_superclass_edits_refuse_cycles() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let handler = backend.handler();
    let component = handler.get_obj("Component").unwrap();

    assert!(matches!(
        component.add_super_class("Component"),
        Err(AdaptorError::InheritanceCycle(_))
    ));
    assert!(matches!(
        component.add_super_class("Application"),
        Err(AdaptorError::InheritanceCycle(_))
    ));
    assert!(matches!(
        component.set_attr("super_classes", json!(["DataHandlerModule"])),
        Err(AdaptorError::InheritanceCycle(_))
    ));
    assert!(component.super_classes().unwrap().is_empty());
    assert_eq!(
        handler.get_obj("DataHandlerModule").unwrap().all_super_classes().unwrap().len(),
        3
    );
}

#[test]
fn test_superclass_add_and_remove() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let handler = backend.handler();
    let session = handler.get_obj("Session").unwrap();
    let segment = handler.get_obj("Segment").unwrap();

    session.add_super_class("Segment").unwrap();
    session.add_super_class("Segment").unwrap();
    assert_eq!(session.super_classes().unwrap(), vec!["Segment"]);
    assert_eq!(segment.sub_classes().unwrap(), vec!["Session"]);
    assert!(session.relationships().get("modules").unwrap().is_some());

    assert!(session.remove_super_class("Segment").unwrap());
    assert!(!session.remove_super_class("Segment").unwrap());
    assert!(segment.sub_classes().unwrap().is_empty());
    assert!(session.relationships().get("modules").unwrap().is_none());
}

#[test]
fn test_detaching_last_holder_destroys_property() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let segment = backend.handler().get_obj("Segment").unwrap();
    let label = segment.attributes().create("label", &Map::new()).unwrap();

    segment.attributes().delete(&label).unwrap();

    assert!(matches!(label.name(), Err(AdaptorError::StaleObject(_))));
    assert!(segment.attributes().get("label").unwrap().is_none());
    assert!(matches!(
        segment.attributes().delete(&label),
        Err(AdaptorError::StaleObject(_))
    ));
    let again = segment.attributes().create("label", &Map::new()).unwrap();
    assert_eq!(again.name().unwrap(), "label");
}
