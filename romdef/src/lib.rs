//! romdef is a library that reads ROM definition files and resolves them into tables, axes and scales.
//!
//! A ROM definition is an XML document describing where calibration tables are stored inside a
//! firmware image, how their elements are encoded, and which scales convert the raw data to
//! engineering units. Definitions may inherit from each other: a `rom` can name a base `rom`,
//! a `table` can name a base `table`, and a `scaling` can name a base `scalingbase`.
//!
//! # Features
//!
//! - `check`: perform a consistency check on a resolved [`Rom`]

mod attributes;
#[cfg(feature = "check")]
mod checker;
mod definition;
mod itemlist;
mod loader;
mod namemap;
mod resolver;
mod rom;
mod scale;
mod table;
mod xml;

use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

pub use attributes::{
    InvalidStorageType, parse_endian, parse_hex_string, parse_storage_sign, parse_storage_type,
    parse_table_type,
};
pub use definition::Definition;
pub use itemlist::ItemList;
pub use namemap::NameAddressRegistry;
pub use resolver::{ResolveContext, ResolveError, Resolved};
pub use rom::{Rom, RomId, TableLookupError, TableSource};
pub use scale::{DEFAULT_SCALE_NAME, Scale, ScaleRegistry};
pub use table::{
    DataCell, Endian, StorageType, SwitchBit, SwitchState, Table, Table1D, Table1DRole, Table2D,
    Table3D, TableBitwiseSwitch, TableKind, TableSwitch, TableType,
};
pub use xml::{FromAttribute, XmlNode};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RomDefError {
    /// `FileOpenError`: An `IoError` that occurred while loading a file
    #[error("Failed to load {filename}: {ioerror}")]
    FileOpenError {
        filename: PathBuf,
        ioerror: std::io::Error,
    },

    /// `FileReadError`: An `IoError` that occurred while reading from a file
    #[error("Could not read from {filename}: {ioerror}")]
    FileReadError {
        filename: PathBuf,
        ioerror: std::io::Error,
    },

    /// `EmptyDocumentError`: the file does not contain a root element
    #[error("File \"{filename}\" contains no definition data")]
    EmptyDocumentError { filename: PathBuf },

    /// `XmlError`: the document is not well-formed XML
    #[error("{filename}:{line}: {message}")]
    XmlError {
        filename: String,
        line: u32,
        message: String,
    },

    /// `RomNotFound`: no `rom` in the document has the requested xmlid
    #[error("The definition does not contain a rom with xmlid \"{xmlid}\"")]
    RomNotFound { xmlid: String },

    /// `BaseRomNotFound`: a `rom` inherits from a base that is not part of the document
    #[error("Rom \"{xmlid}\" uses the base rom \"{base}\", which does not exist")]
    BaseRomNotFound { xmlid: String, base: String },

    /// `BaseRomCycle`: following the base references of a `rom` leads back to itself
    #[error("The base roms of rom \"{xmlid}\" form a cycle")]
    BaseRomCycle { xmlid: String },

    /// `TableError`: a single table could not be resolved; the other tables are not affected
    #[error("Rom {rom}: {table_error}")]
    TableError {
        rom: String,
        table_error: ResolveError,
    },

    /// `ScaleError`: a `scalingbase` at the document root could not be resolved
    #[error("scalingbase: {scale_error}")]
    ScaleError { scale_error: ResolveError },

    /// `ContentError`: a resolved table contains inconsistent data
    #[error("Content error: table \"{item_name}\" in rom {rom}: {description}")]
    ContentError {
        rom: String,
        item_name: String,
        description: String,
    },
}

/// Access to the name of a named definition item
pub trait RomObjectName {
    fn get_name(&self) -> &str;
}

impl<T: RomObjectName> RomObjectName for Rc<T> {
    fn get_name(&self) -> &str {
        T::get_name(self)
    }
}

/**
Load a ROM definition file

`strict_parsing` toggles strict parsing: If strict parsing is enabled, base references that cannot
be resolved and misplaced data cells are errors that stop the resolution of the affected table.
Otherwise they are silently ignored.

# Example
```no_run
match romdef::load("definitions.xml", false) {
    Ok(definition) => {
        for rom_id in definition.rom_ids() {
            println!("{}", rom_id.xmlid);
        }
    }
    Err(error_message) => println!("{error_message}"),
}
```

# Errors

A `RomDefError` provides details if the file cannot be read, or if it is not well-formed XML.
 */
pub fn load<P: AsRef<Path>>(path: P, strict_parsing: bool) -> Result<Definition, RomDefError> {
    Definition::load(path, strict_parsing)
}

/**
Load a ROM definition that is stored in a string

# Example

```rust
# use romdef::RomDefError;
# fn main() -> Result<(), RomDefError> {
let text = r#"
<roms>
  <rom>
    <romid><xmlid>EXAMPLE</xmlid></romid>
    <table name="Idle Speed" type="1D" storageaddress="0x1200" storagetype="uint16"/>
  </rom>
</roms>"#;
let definition = romdef::load_from_string(text, false)?;
let (rom, log_msgs) = definition.load_rom("EXAMPLE")?;
assert!(log_msgs.is_empty());
assert_eq!(rom.tables.get("Idle Speed").unwrap().storage_address, Some(0x1200));
# Ok(())
# }
```

# Errors

A `RomDefError` provides details if the text is not well-formed XML.
 */
pub fn load_from_string(text: &str, strict_parsing: bool) -> Result<Definition, RomDefError> {
    Definition::load_from_string(text, strict_parsing)
}
