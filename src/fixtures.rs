/// Shared test fixtures.
#[cfg(test)]
pub mod test {
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::fmt::MakeWriter;

    use crate::cli::Shortcut;
    use crate::schema::{FieldDefault, FieldSpec, Section};
    use crate::types::FieldKind;

    /// Exercises every field kind, a single-character alias and an alias
    /// that shares its name with a shortcut.
    pub static FIXTURE_SECTION: Section = Section {
        key: "Out",
        title: "Output",
        fields: &[
            FieldSpec::string("o", "Output file").metavar("FILE"),
            FieldSpec::integer("count", "How many"),
            FieldSpec::new("enabled", FieldKind::Boolean, "Turn it on"),
            FieldSpec::new("tags", FieldKind::List, "Comma separated tags"),
            FieldSpec::string("debug", "Debug trace file"),
            FieldSpec::string("level", "Output level").default(FieldDefault::Str("WARNING")),
        ],
    };

    pub static FIXTURE_SHORTCUTS: &[Shortcut] = &[
        Shortcut {
            name: "debug",
            short: None,
            help: "level DEBUG",
            sets: &[("Out.level", "DEBUG")],
        },
        Shortcut {
            name: "loud",
            short: Some('l'),
            help: "level INFO and enabled",
            sets: &[("Out.level", "INFO"), ("Out.enabled", "true")],
        },
    ];

    /// Claims `-o`, already taken by the `o` field.
    pub static SHADOWING_SHORTCUTS: &[Shortcut] = &[Shortcut {
        name: "out",
        short: Some('o'),
        help: "shadowing",
        sets: &[("Out.level", "INFO")],
    }];

    /// Two fields mapping to the same alias key.
    pub static DUPLICATE_SECTION: Section = Section {
        key: "Dup",
        title: "Duplicates",
        fields: &[
            FieldSpec::string("out_dir", "first"),
            FieldSpec::string("out_dir_alt", "second").switch("out-dir"),
        ],
    };

    static CLASH_A: Section = Section {
        key: "A",
        title: "A",
        fields: &[FieldSpec::string("name", "a name")],
    };

    static CLASH_B: Section = Section {
        key: "B",
        title: "B",
        fields: &[FieldSpec::string("name", "b name")],
    };

    /// Two sections whose fields claim the same switch.
    pub static CLASHING_SECTIONS: &[&Section] = &[&CLASH_A, &CLASH_B];

    pub static RESERVED_SECTION: Section = Section {
        key: "Reserved",
        title: "Reserved",
        fields: &[
            FieldSpec::string("config", "never a switch"),
            FieldSpec::string("parent", "never a switch"),
            FieldSpec::string("name", "a name"),
        ],
    };

    /// A valid JSON config with credentials and a filter.
    pub const SITE_JSON: &str = r#"{
    "XeroApiConfig": {
        "rsa_key_path": "keys/privatekey.pem",
        "consumer_key": "FILEKEY"
    },
    "BaseConfig": {
        "contact_limit": 50,
        "data_dir": null
    },
    "FilterConfig": {
        "states": "NSW|VIC"
    }
}
"#;

    /// The same content as a config script.
    pub const SITE_SCRIPT: &str = r#"# site config
c = get_config()

c.XeroApiConfig.rsa_key_path = 'keys/privatekey.pem'
c.XeroApiConfig.consumer_key = "FILEKEY"
c.BaseConfig.contact_limit = 50
c.BaseConfig.data_dir = None
c.FilterConfig.states = 'NSW|VIC'  # main address state
"#;

    /// Write `content` to `dir/name`, returning the full path.
    pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// In-memory log sink for [`crate::logging::subscriber`].
    #[derive(Clone, Default)]
    pub struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Capture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Two fields named `x`, told apart only by their switches.
    pub static SAME_NAME_SECTION: Section = Section {
        key: "P",
        title: "Same name",
        fields: &[
            FieldSpec::string("x", "first").switch("alpha"),
            FieldSpec::string("x", "second").switch("beta"),
        ],
    };
}
