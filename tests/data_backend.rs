mod common;

use common::Fixture;
use daq_config::logic::{object_labels, SchemaDataInteraction};
use daq_config::store::{
    ClassObjectManager, ConfigBackend, Configuration, ConffwkBackend, NamedObject,
    NamedObjectLifecycle, NamedObjectManager, ObjectLifecycle, ObjectManager, ObjectModifier,
    OksBackend,
};
use daq_config::{AdaptorError, Finding, NameList};
use serde_json::{json, Map, Value};

fn attributes(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn open(fixture: &Fixture) -> ConffwkBackend {
    ConffwkBackend::with_path(&fixture.data_path(), fixture.diagnostics.clone()).unwrap()
}

fn sorted_names<T: NamedObject>(objects: &[T]) -> Vec<String> {
    let mut names: Vec<String> = objects.iter().map(|o| o.name().unwrap()).collect();
    names.sort();
    names
}

#[test]
fn test_values_are_typed_by_schema() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let module = backend.handler().get_obj("DataHandlerModule", "dlh-01").unwrap();

    assert_eq!(module.get_attr("buffer_size").unwrap(), json!(4096));
    assert_eq!(module.get_attr("enabled").unwrap(), json!(true));
    assert_eq!(module.get_attr("port").unwrap(), json!(5000));
    assert_eq!(module.get_attr("host").unwrap(), json!("localhost"));
    assert_eq!(module.get_attr("id").unwrap(), json!("dlh-01"));
    assert_eq!(module.get_attr("class_name").unwrap(), json!("DataHandlerModule"));
    assert!(!fixture
        .diagnostics
        .contains(|f| matches!(f, Finding::NamingConvention { .. })));
}

#[test]
fn test_lookup_through_superclass() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let handler = backend.handler();

    let via_base = handler.get_obj("Component", "dlh-01").unwrap();
    assert_eq!(via_base, handler.get_obj("DataHandlerModule", "dlh-01").unwrap());
    assert_eq!(via_base.class_name().unwrap(), "DataHandlerModule");

    assert!(matches!(
        handler.get_obj("Session", "missing"),
        Err(AdaptorError::ObjectNotFound(_))
    ));
}

#[test]
fn test_get_all_includes_subclasses() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let handler = backend.handler();

    assert_eq!(handler.get_all_obj(None).unwrap().len(), 4);
    assert_eq!(
        sorted_names(&handler.get_all_obj(Some(NameList::from("Component"))).unwrap()),
        vec!["dlh-01", "trigger.app"]
    );
    assert_eq!(
        handler
            .get_all_obj(Some(NameList::from(vec!["Application", "Component"])))
            .unwrap()
            .len(),
        2
    );
    assert!(matches!(
        handler.get_all_obj(Some(NameList::from("Nope"))),
        Err(AdaptorError::ObjectNotFound(_))
    ));
}

#[test]
fn test_relationship_values() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let handler = backend.handler();

    let readout = handler.get_obj("Segment", "readout").unwrap();
    assert_eq!(
        readout.get_attr("modules").unwrap(),
        json!([
            {"class": "DataHandlerModule", "id": "dlh-01"},
            {"class": "Application", "id": "trigger.app"}
        ])
    );

    let session = handler.get_obj("Session", "np04").unwrap();
    assert_eq!(
        session.get_attr("segment").unwrap(),
        json!({"class": "Segment", "id": "readout"})
    );
}

#[test]
fn test_set_attr_validates() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let handler = backend.handler();
    let app = handler.get_obj("Application", "trigger.app").unwrap();

    assert!(matches!(
        app.set_attr("port", json!(80)),
        Err(AdaptorError::InvalidValue { .. })
    ));
    assert_eq!(app.get_attr("port").unwrap(), json!(6000));
    app.set_attr("port", json!(7000)).unwrap();
    assert_eq!(app.get_attr("port").unwrap(), json!(7000));

    let session = handler.get_obj("Session", "np04").unwrap();
    assert!(matches!(
        session.set_attr(
            "segment",
            json!([{"class": "Segment", "id": "readout"}, {"class": "Segment", "id": "readout"}, {"class": "Application", "id": "trigger.app"}])
        ),
        Err(AdaptorError::InvalidValue { .. })
    ));
    assert!(matches!(
        session.set_attr("segment", json!({"class": "Application", "id": "trigger.app"})),
        Err(AdaptorError::InvalidValue { .. })
    ));
    assert!(matches!(
        session.set_attr("segment", json!({"class": "Segment", "id": "ghost"})),
        Err(AdaptorError::ObjectNotFound(_))
    ));
    session.set_attr("segment", Value::Null).unwrap();
    assert_eq!(session.get_attr("segment").unwrap(), Value::Null);
}

#[test]
fn test_unsupported_attribute() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let app = backend.handler().get_obj("Application", "trigger.app").unwrap();

    assert!(matches!(
        app.get_attr("nope"),
        Err(AdaptorError::UnsupportedAttribute { .. })
    ));
    assert!(matches!(
        app.set_attr("id", json!("other")),
        Err(AdaptorError::UnsupportedAttribute { .. })
    ));
    assert_eq!(app.name().unwrap(), "trigger.app");
    assert!(fixture
        .diagnostics
        .contains(|f| matches!(f, Finding::UnsupportedAttribute { attribute, .. } if attribute == "nope")));
}

#[test]
fn test_create_then_get() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let handler = backend.handler();

    let created = handler
        .create(
            "Application",
            "dqm.app",
            &attributes(json!({"port": 7000, "colour": "red"})),
        )
        .unwrap();
    let fetched = handler.get_obj("Application", "dqm.app").unwrap();

    assert_eq!(created, fetched);
    assert_eq!(fetched.get_attr("port").unwrap(), json!(7000));
    assert_eq!(fetched.file().unwrap(), fixture.data_path());
    assert!(fixture
        .diagnostics
        .contains(|f| matches!(f, Finding::IgnoredParameter { key, .. } if key == "colour")));

    assert!(matches!(
        handler.create("Application", "dqm.app", &Map::new()),
        Err(AdaptorError::DuplicateObject(_))
    ));
    assert!(matches!(
        handler.create("Component", "abstract", &Map::new()),
        Err(AdaptorError::InvalidValue { .. })
    ));
    assert!(matches!(
        handler.create("Nope", "x", &Map::new()),
        Err(AdaptorError::ObjectNotFound(_))
    ));
}

#[test]
fn test_rejected_create_leaves_nothing_behind() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let handler = backend.handler();

    let result = handler.create("Application", "bad.app", &attributes(json!({"port": 10})));

    assert!(matches!(result, Err(AdaptorError::InvalidValue { .. })));
    assert!(matches!(
        handler.get_obj("Application", "bad.app"),
        Err(AdaptorError::ObjectNotFound(_))
    ));
}

#[test]
fn test_rename_in_place() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let handler = backend.handler();
    let app = handler.get_obj("Application", "trigger.app").unwrap();

    let renamed = handler.rename(&app, "trigger-app").unwrap();

    assert_eq!(renamed, app);
    assert_eq!(app.name().unwrap(), "trigger-app");
    assert!(matches!(
        handler.get_obj("Application", "trigger.app"),
        Err(AdaptorError::ObjectNotFound(_))
    ));
    let readout = handler.get_obj("Segment", "readout").unwrap();
    assert_eq!(readout.get_attr("modules").unwrap()[1]["id"], json!("trigger-app"));
}

#[test]
fn test_delete_drops_references() {
    let fixture = Fixture::new();
    let backend = open(&fixture);
    let handler = backend.handler();
    let module = handler.get_obj("DataHandlerModule", "dlh-01").unwrap();

    handler.delete(&module).unwrap();

    assert!(matches!(module.name(), Err(AdaptorError::StaleObject(_))));
    let readout = handler.get_obj("Segment", "readout").unwrap();
    assert_eq!(
        readout.get_attr("modules").unwrap(),
        json!([{"class": "Application", "id": "trigger.app"}])
    );
}

#[test]
fn test_add_copies_object_from_another_database() {
    let fixture = Fixture::new();
    let other_path = fixture.write(
        "remote.data.xml",
        r#"<oks-data>
  <include path="daq.schema.xml"/>
  <obj class="Application" id="remote.app"><attr name="port" val="8080"/></obj>
</oks-data>"#,
    );
    let other = ConffwkBackend::with_path(&other_path, fixture.diagnostics.clone()).unwrap();
    let backend = open(&fixture);

    let remote = other.handler().get_obj("Application", "remote.app").unwrap();
    let copy = backend.handler().add(&remote).unwrap();

    assert_ne!(copy, remote);
    assert_eq!(copy.get_attr("port").unwrap(), json!(8080));
    assert_eq!(copy.file().unwrap(), fixture.data_path());
    assert!(backend.handler().get_obj("Application", "remote.app").is_ok());
    assert!(matches!(
        backend.handler().add(&remote),
        Err(AdaptorError::DuplicateObject(_))
    ));
}

#[test]
fn test_save_and_reload() {
    let fixture = Fixture::new();
    let mut backend = open(&fixture);
    let app = backend.handler().get_obj("Application", "trigger.app").unwrap();
    app.set_attr("port", json!(7100)).unwrap();

    backend.save("tune ports").unwrap();

    let text = fixture.read(&fixture.data_path());
    assert!(text.contains("tune ports"));
    assert!(text.contains("daq.schema.xml"));
    assert_eq!(backend.configuration().history().len(), 1);

    let reloaded = open(&fixture);
    let app = reloaded.handler().get_obj("Application", "trigger.app").unwrap();
    assert_eq!(app.get_attr("port").unwrap(), json!(7100));
    let readout = reloaded.handler().get_obj("Segment", "readout").unwrap();
    assert_eq!(readout.get_attr("modules").unwrap().as_array().unwrap().len(), 2);
}

#[test]
fn test_close_is_always_full() {
    let fixture = Fixture::new();
    let mut backend = open(&fixture);
    let app = backend.handler().get_obj("Application", "trigger.app").unwrap();

    backend.close(true, NameList::from("whatever")).unwrap();

    assert!(fixture
        .diagnostics
        .contains(|f| matches!(f, Finding::PartialCloseUnsupported)));
    assert!(!backend.configuration().is_open());
    assert_eq!(backend.configuration().name(), None);
    assert!(matches!(app.name(), Err(AdaptorError::ConfigurationNotLoaded)));
    assert!(matches!(
        backend.close(false, NameList::new()),
        Err(AdaptorError::ConfigurationNotLoaded)
    ));
    assert!(matches!(
        backend.save("late"),
        Err(AdaptorError::ConfigurationNotLoaded)
    ));
}

#[test]
fn test_object_labels_replace_unsafe_characters() {
    let fixture = Fixture::new();
    let backend = open(&fixture);

    let labels = object_labels(backend.handler(), "____").unwrap();

    let trigger = labels.iter().find(|l| l.label == "trigger.app").unwrap();
    assert_eq!(trigger.widget_id, "btn_trigger____app");
    assert_eq!(labels.len(), 4);
}

#[test]
fn test_schema_data_interaction() {
    let fixture = Fixture::new();
    let data = open(&fixture);
    let schema = OksBackend::with_path(&fixture.schema_path(), fixture.diagnostics.clone()).unwrap();
    let interaction = SchemaDataInteraction::new(&data, &schema);

    let module = data.handler().get_obj("DataHandlerModule", "dlh-01").unwrap();
    let class = interaction.schema_class_of(&module).unwrap();
    assert_eq!(class.name().unwrap(), "DataHandlerModule");

    let component = schema.handler().get_obj("Component").unwrap();
    assert_eq!(
        sorted_names(&interaction.objects_of(&component).unwrap()),
        vec!["dlh-01", "trigger.app"]
    );
    assert!(interaction.undefined_classes().unwrap().is_empty());

    let partial_path = fixture.write(
        "partial.schema.xml",
        r#"<oks-schema><class name="Application"/></oks-schema>"#,
    );
    let partial = OksBackend::with_path(&partial_path, fixture.diagnostics.clone()).unwrap();
    let interaction = SchemaDataInteraction::new(&data, &partial);
    assert_eq!(
        interaction.undefined_classes().unwrap(),
        vec!["DataHandlerModule", "Segment", "Session"]
    );
}
