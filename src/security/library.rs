/*!
 * Library Descriptors
 *
 * Built-in libraries a script may `require`, as data. Each entry names the
 * engine library to open and the members stripped from it before exposure.
 */

use crate::engine::BuiltinLibrary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryDescriptor {
    pub name: &'static str,
    pub library: BuiltinLibrary,
    /// Members removed after opening
    pub deny: &'static [&'static str],
    /// Also bind the table to a global of the same name
    pub publish_global: bool,
}

impl LibraryDescriptor {
    const fn new(name: &'static str, library: BuiltinLibrary) -> Self {
        Self {
            name,
            library,
            deny: &[],
            publish_global: false,
        }
    }

    pub fn is_denied(&self, member: &str) -> bool {
        self.deny.contains(&member)
    }
}

/// Base library, opened into the globals at sandbox start
/// [SECURITY] Removes code loading, raw printing and collector control
pub const BASE_LIBRARY: LibraryDescriptor = LibraryDescriptor {
    name: "",
    library: BuiltinLibrary::Base,
    deny: &[
        "collectgarbage",
        "coroutine",
        "dofile",
        "load",
        "loadfile",
        "loadstring",
        "newproxy",
        "print",
    ],
    publish_global: false,
};

/// Libraries reachable through `require`
pub static LIBRARIES: &[LibraryDescriptor] = &[
    LibraryDescriptor::new("string", BuiltinLibrary::String),
    LibraryDescriptor::new("math", BuiltinLibrary::Math),
    LibraryDescriptor::new("table", BuiltinLibrary::Table),
    // [SECURITY] No process control or filesystem mutation
    LibraryDescriptor {
        deny: &["execute", "exit", "remove", "rename", "setlocale", "tmpname"],
        ..LibraryDescriptor::new("os", BuiltinLibrary::Os)
    },
    LibraryDescriptor::new("circular_buffer", BuiltinLibrary::CircularBuffer),
    LibraryDescriptor::new("bloom_filter", BuiltinLibrary::BloomFilter),
    LibraryDescriptor::new("hyperloglog", BuiltinLibrary::HyperLogLog),
    LibraryDescriptor::new("lpeg", BuiltinLibrary::Lpeg),
    LibraryDescriptor::new("pb", BuiltinLibrary::Protobuf),
    // Decode-only: encoding goes through output()
    LibraryDescriptor {
        deny: &[
            "encode",
            "encode_sparse_array",
            "encode_max_depth",
            "encode_number_precision",
            "encode_keep_buffer",
            "encode_invalid_numbers",
        ],
        publish_global: true,
        ..LibraryDescriptor::new("cjson", BuiltinLibrary::Json)
    },
];

/// Look up a built-in by module name
pub fn find(name: &str) -> Option<&'static LibraryDescriptor> {
    LIBRARIES.iter().find(|lib| lib.name == name)
}
