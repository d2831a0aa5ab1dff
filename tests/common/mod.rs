#![allow(dead_code)]

use daq_config::MemoryDiagnostics;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use tempfile::TempDir;

pub const SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<oks-schema>
  <class name="Component" description="Anything that can be switched on" is-abstract="true">
    <attribute name="enabled" type="bool" init-value="true"/>
    <method name="configure" description="Apply the configuration">
      <implementation language="c++" prototype="void configure()" body=""/>
    </method>
  </class>
  <class name="Resource" description="Hardware or service">
    <superclass name="Component"/>
    <attribute name="host" type="string" init-value="localhost"/>
  </class>
  <class name="Application" description="A running process">
    <superclass name="Component"/>
    <attribute name="port" type="u16" range="1024..65535" init-value="5000"/>
  </class>
  <class name="DataHandlerModule" description="Readout data handler">
    <superclass name="Resource"/>
    <superclass name="Application"/>
    <attribute name="buffer_size" type="u32" init-value="1024"/>
  </class>
  <class name="Segment">
    <relationship name="modules" class-type="Component" low-cc="zero" high-cc="many" is-composite="true"/>
  </class>
  <class name="Session">
    <relationship name="segment" class-type="Segment" low-cc="one" high-cc="one"/>
  </class>
</oks-schema>
"#;

pub const DATA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<oks-data>
  <include path="daq.schema.xml"/>
  <obj class="DataHandlerModule" id="dlh-01">
    <attr name="buffer_size" val="4096"/>
  </obj>
  <obj class="Application" id="trigger.app">
    <attr name="port" val="6000"/>
  </obj>
  <obj class="Segment" id="readout">
    <rel name="modules">
      <ref class="DataHandlerModule" id="dlh-01"/>
      <ref class="Application" id="trigger.app"/>
    </rel>
  </obj>
  <obj class="Session" id="np04">
    <rel name="segment"><ref class="Segment" id="readout"/></rel>
  </obj>
</oks-data>
"#;

/// Schema and data files written into a temporary directory.
pub struct Fixture {
    pub dir: TempDir,
    pub diagnostics: Rc<MemoryDiagnostics>,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("daq.schema.xml"), SCHEMA).unwrap();
        fs::write(dir.path().join("session.data.xml"), DATA).unwrap();
        Self {
            dir,
            diagnostics: Rc::new(MemoryDiagnostics::default()),
        }
    }

    pub fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().into_owned()
    }

    pub fn schema_path(&self) -> String {
        self.path("daq.schema.xml")
    }

    pub fn data_path(&self) -> String {
        self.path("session.data.xml")
    }

    pub fn write(&self, name: &str, contents: &str) -> String {
        fs::write(self.dir.path().join(name), contents).unwrap();
        self.path(name)
    }

    pub fn read(&self, path: &str) -> String {
        fs::read_to_string(Path::new(path)).unwrap()
    }
}
