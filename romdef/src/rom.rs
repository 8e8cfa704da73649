use thiserror::Error;

#[cfg(feature = "check")]
use crate::RomDefError;
use crate::attributes::{parse_endian, parse_hex_string, resolved_address};
use crate::itemlist::ItemList;
use crate::table::{Endian, Table};
use crate::xml::XmlNode;

/// The identification block (`romid`) of a rom definition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RomId {
    pub xmlid: String,
    /// location of `internal_id_string` in the firmware image
    pub internal_id_address: Option<u32>,
    pub internal_id_string: String,
    pub ecu_id: String,
    pub make: String,
    pub market: String,
    pub model: String,
    pub submodel: String,
    pub transmission: String,
    pub year: String,
    pub flash_method: String,
    pub mem_model: String,
    pub file_size: String,
    pub obsolete: bool,
    /// byte order that applies to every table of the rom
    pub endian: Option<Endian>,
}

impl RomId {
    /// read a `romid` element
    #[must_use]
    pub fn parse(node: &XmlNode) -> Self {
        let text = |tag: &str| node.child_text(tag).unwrap_or_default().to_string();
        Self {
            xmlid: text("xmlid"),
            internal_id_address: node
                .child_text("internalidaddress")
                .and_then(parse_hex_string)
                .and_then(resolved_address),
            internal_id_string: text("internalidstring"),
            ecu_id: text("ecuid"),
            make: text("make"),
            market: text("market"),
            model: text("model"),
            submodel: text("submodel"),
            transmission: text("transmission"),
            year: text("year"),
            flash_method: text("flashmethod"),
            mem_model: text("memmodel"),
            file_size: text("filesize"),
            obsolete: node
                .child_text("obsolete")
                .is_some_and(|value| value == "1" || value.eq_ignore_ascii_case("true")),
            endian: node
                .child_text("endian")
                .filter(|value| !value.is_empty())
                .map(parse_endian),
        }
    }

    /// fill all fields that are not set with the values of a base rom
    ///
    /// The xmlid always stays the same.
    pub fn inherit_from(&mut self, base: &RomId) {
        fn inherit(value: &mut String, base: &str) {
            if value.is_empty() {
                *value = base.to_string();
            }
        }

        if self.internal_id_address.is_none() {
            self.internal_id_address = base.internal_id_address;
        }
        inherit(&mut self.internal_id_string, &base.internal_id_string);
        inherit(&mut self.ecu_id, &base.ecu_id);
        inherit(&mut self.make, &base.make);
        inherit(&mut self.market, &base.market);
        inherit(&mut self.model, &base.model);
        inherit(&mut self.submodel, &base.submodel);
        inherit(&mut self.transmission, &base.transmission);
        inherit(&mut self.year, &base.year);
        inherit(&mut self.flash_method, &base.flash_method);
        inherit(&mut self.mem_model, &base.mem_model);
        inherit(&mut self.file_size, &base.file_size);
        if self.endian.is_none() {
            self.endian = base.endian;
        }
    }
}

/// The resolved tables of one rom
#[derive(Debug, Clone, Default)]
pub struct Rom {
    pub rom_id: RomId,
    /// tables in the order of their first definition
    pub tables: ItemList<Table>,
}

/// the reasons why a table lookup can fail
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TableLookupError {
    #[error("table \"{name}\" does not exist")]
    NotFound { name: String },

    #[error("\"{name}\" is not a valid table name")]
    InvalidName { name: String },

    #[error("table \"{name}\" is not available: {reason}")]
    Unavailable { name: String, reason: String },
}

/// A collection of tables that can serve as the base of a table definition
pub trait TableSource {
    /// find a table by its exact name
    ///
    /// # Errors
    ///
    /// `NotFound` and `InvalidName` are ordinary lookup failures. Any other error means that the
    /// collection could not provide the table at all.
    fn table_by_name(&self, name: &str) -> Result<&Table, TableLookupError>;
}

impl TableSource for Rom {
    fn table_by_name(&self, name: &str) -> Result<&Table, TableLookupError> {
        if name.trim().is_empty() {
            return Err(TableLookupError::InvalidName {
                name: name.to_string(),
            });
        }
        self.tables
            .get(name)
            .ok_or_else(|| TableLookupError::NotFound {
                name: name.to_string(),
            })
    }
}

impl Rom {
    #[must_use]
    pub fn new(rom_id: RomId) -> Self {
        Self {
            rom_id,
            tables: ItemList::new(),
        }
    }

    /// perform a consistency check on the resolved tables
    ///
    /// Every finding is returned as a [`RomDefError::ContentError`].
    #[cfg(feature = "check")]
    #[must_use]
    pub fn check(&self) -> Vec<RomDefError> {
        let mut log_msgs = Vec::new();
        crate::checker::check(self, &mut log_msgs);
        log_msgs
    }
}
