//! Resolution of `table` elements into [`Table`]s
//!
//! A table element is layered on top of a starting table: either the table of the same name that
//! was resolved from a base rom, or a copy of the table named by its `base` attribute, or a newly
//! created table. Attributes that are present in the element replace the values of the starting
//! table, everything else is inherited.

use log::{debug, trace};
use std::mem::take;
use thiserror::Error;

use crate::attributes::{
    is_axis_type_name, parse_endian, parse_hex_string, parse_storage_sign, parse_storage_type,
    parse_table_type, resolved_address,
};
use crate::namemap::NameAddressRegistry;
use crate::rom::{TableLookupError, TableSource};
use crate::scale::{DEFAULT_SCALE_NAME, Scale, ScaleRegistry};
use crate::table::{DataCell, Endian, Table, TableKind, TableType};
use crate::xml::XmlNode;

/// the outcome of resolving a `table` element
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// the fully resolved table
    Table(Table),
    /// the element is marked with `omit="true"`; the table must be removed from the rom
    Omitted,
    /// the table is not used by the rom, so it was not created
    NotReferenced,
}

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ResolveError {
    /// `UnspecifiedType`: a new table must have a type
    #[error("line {line}: table \"{name}\" does not specify a type")]
    UnspecifiedType { name: String, line: u32 },

    /// `UnknownType`: the type of a new table is not one of the known table types
    #[error("line {line}: table \"{name}\" has the unknown type \"{type_name}\"")]
    UnknownType {
        name: String,
        type_name: String,
        line: u32,
    },

    /// `InvalidAttribute`: an attribute value could not be interpreted
    #[error("line {line}: table \"{table}\": invalid value \"{value}\" of attribute {attribute}")]
    InvalidAttribute {
        table: String,
        attribute: String,
        value: String,
        line: u32,
    },

    /// `BaseTableNotFound`: the base table does not exist in the rom
    #[error("line {line}: the base table \"{base}\" of table \"{table}\" does not exist")]
    BaseTableNotFound {
        table: String,
        base: String,
        line: u32,
    },

    /// `InvalidBaseName`: the name of the base table is not a valid table name
    #[error("line {line}: table \"{table}\" has an invalid base table name \"{base}\"")]
    InvalidBaseName {
        table: String,
        base: String,
        line: u32,
    },

    /// `BaseScaleNotFound`: no registered scale has the name of the base scale
    #[error("line {line}: the base scale \"{base}\" of scale \"{scale}\" does not exist")]
    BaseScaleNotFound {
        scale: String,
        base: String,
        line: u32,
    },

    /// `CloneFailure`: the base table exists, but it could not be copied
    #[error("line {line}: the base table \"{base}\" of table \"{table}\" could not be copied: {reason}")]
    CloneFailure {
        table: String,
        base: String,
        reason: String,
        line: u32,
    },

    /// `MisplacedDataCell`: static data was given for a table that is not a linear table or axis
    #[error("line {line}: table \"{table}\" cannot contain static data")]
    MisplacedDataCell { table: String, line: u32 },
}

/// Everything the resolution of a table needs besides the table element itself
///
/// `tables` provides the base tables, `names` is the pre-scanned list of the tables of the rom,
/// and `scales` collects the scales of all tables.
/// Recoverable problems are added to `log_msgs`.
pub struct ResolveContext<'a> {
    tables: &'a dyn TableSource,
    names: &'a NameAddressRegistry,
    scales: &'a mut ScaleRegistry,
    mem_model_endian: Option<Endian>,
    strict: bool,
    log_msgs: &'a mut Vec<ResolveError>,
}

impl<'a> ResolveContext<'a> {
    pub fn new(
        tables: &'a dyn TableSource,
        names: &'a NameAddressRegistry,
        scales: &'a mut ScaleRegistry,
        log_msgs: &'a mut Vec<ResolveError>,
    ) -> Self {
        Self {
            tables,
            names,
            scales,
            mem_model_endian: None,
            strict: false,
            log_msgs,
        }
    }

    /// force the byte order of every resolved table
    #[must_use]
    pub fn with_mem_model_endian(mut self, endian: Option<Endian>) -> Self {
        self.mem_model_endian = endian;
        self
    }

    /// in strict mode unresolved base references and misplaced data are errors
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// resolve a `table` element
    ///
    /// `existing` is the table of the same name that was resolved previously, if any.
    ///
    /// # Errors
    ///
    /// A `ResolveError` if the table cannot be constructed. Only this table is affected.
    pub fn resolve_table(
        &mut self,
        node: &XmlNode,
        existing: Option<Table>,
    ) -> Result<Resolved, ResolveError> {
        if node.attribute("omit", false) {
            return Ok(Resolved::Omitted);
        }

        let mut seed = existing;
        let base = node.attribute("base", "none".to_string());
        if !base.eq_ignore_ascii_case("none") {
            match self.tables.table_by_name(&base) {
                Ok(base_table) => seed = Some(base_table.clone()),
                Err(TableLookupError::NotFound { .. }) => {
                    self.recover(ResolveError::BaseTableNotFound {
                        table: node.attribute("name", "unknown".to_string()),
                        base,
                        line: node.line,
                    })?;
                }
                Err(TableLookupError::InvalidName { .. }) => {
                    self.recover(ResolveError::InvalidBaseName {
                        table: node.attribute("name", "unknown".to_string()),
                        base,
                        line: node.line,
                    })?;
                }
                Err(lookup_error) => {
                    return Err(ResolveError::CloneFailure {
                        table: node.attribute("name", "unknown".to_string()),
                        base,
                        reason: lookup_error.to_string(),
                        line: node.line,
                    });
                }
            }
        }

        let mut table = match seed {
            Some(table) => table,
            None => match self.create_table(node)? {
                Some(table) => table,
                None => return Ok(Resolved::NotReferenced),
            },
        };

        self.apply_attributes(node, &mut table)?;

        for child in &node.children {
            if child.is("table") {
                self.resolve_axis(child, &mut table)?;
            } else if child.is("scaling") {
                let scale_name = child.attribute("name", DEFAULT_SCALE_NAME.to_string());
                let seed = table
                    .scale(&scale_name)
                    .map_or_else(Scale::default, |scale| Scale::clone(scale));
                let scale = self.scales.resolve_scale(child, seed, self.strict)?;
                table.add_scale(scale);
            } else if child.is("data") {
                if !table.add_static_cell(DataCell::new(child.text())) {
                    self.report(ResolveError::MisplacedDataCell {
                        table: table.name.clone(),
                        line: child.line,
                    })?;
                }
            } else if child.is("description") {
                table.description = child.text().to_string();
            } else if child.is("state") {
                self.set_values(&mut table, child, "data");
            } else if child.is("bit") {
                self.set_values(&mut table, child, "position");
            } else {
                trace!("line {}: ignoring <{}> in a table", child.line, child.name);
            }
        }

        Ok(Resolved::Table(table))
    }

    // only tables that are used by the rom are created; axis tables are always created
    fn create_table(&mut self, node: &XmlNode) -> Result<Option<Table>, ResolveError> {
        let name = node.attribute("name", "unknown".to_string());
        let type_name = node.attribute("type", "none".to_string());
        if !self.names.contains(&name) && !is_axis_type_name(&type_name) {
            trace!("line {}: table \"{name}\" is not used by the rom", node.line);
            return Ok(None);
        }

        if type_name.eq_ignore_ascii_case("none") {
            return Err(ResolveError::UnspecifiedType {
                name,
                line: node.line,
            });
        }
        let Some(table_type) = parse_table_type(&type_name) else {
            return Err(ResolveError::UnknownType {
                name,
                type_name,
                line: node.line,
            });
        };

        let mut table = Table::new(table_type);
        table.add_scale(self.scales.raw_scale());
        Ok(Some(table))
    }

    fn apply_attributes(&self, node: &XmlNode, table: &mut Table) -> Result<(), ResolveError> {
        table.name = node.attribute("name", take(&mut table.name));
        if node.attribute("beforeram", false) {
            table.before_ram = true;
        }
        table.data_layout = node.attribute("dataLayout", take(&mut table.data_layout));
        table.category = node.attribute("category", take(&mut table.category));

        let storage_type = node.attr("storagetype");
        // the sign is taken from the first storage type that is set
        if table.storage_type.is_none() {
            table.signed = storage_type.is_some_and(parse_storage_sign);
        }
        if let Some(text) = storage_type {
            table.storage_type = parse_storage_type(text)
                .map_err(|_| invalid_attribute(node, table, "storagetype", text))?;
        }

        if let Some(endian) = self.mem_model_endian {
            table.mem_model_endian = Some(endian);
            table.endian = endian;
        } else if let Some(text) = node.attr("endian") {
            table.endian = parse_endian(text);
        }

        if let Some(address) = self.names.address(&table.name) {
            table.storage_address = address;
        } else if let Some(text) = node.attr("storageaddress") {
            let raw_address = parse_hex_string(text)
                .ok_or_else(|| invalid_attribute(node, table, "storageaddress", text))?;
            table.storage_address = resolved_address(raw_address);
        }

        table.description = node.attribute("description", take(&mut table.description));
        let data_size = node.attribute("sizex", table.data_size);
        table.data_size = node.attribute("sizey", data_size);
        let flip = node.attribute("flipx", table.flip);
        table.flip = node.attribute("flipy", flip);
        table.user_level = node.attribute("userlevel", table.user_level);
        table.locked = node.attribute("locked", table.locked);
        table.log_param = node.attribute("logparam", take(&mut table.log_param));
        if let Some(text) = node.attr("mask") {
            table.string_mask = parse_hex_string(text)
                .and_then(|mask| u64::try_from(mask).ok())
                .ok_or_else(|| invalid_attribute(node, table, "mask", text))?;
        }

        if let TableKind::Table3D(t3d) = &mut table.kind {
            t3d.swap_xy = node.attribute("swapxy", t3d.swap_xy);
            t3d.flip_x = node.attribute("flipx", t3d.flip_x);
            t3d.flip_y = node.attribute("flipy", t3d.flip_y);
            t3d.size_x = node.attribute("sizex", t3d.size_x);
            t3d.size_y = node.attribute("sizey", t3d.size_y);
        }

        Ok(())
    }

    // a child table of a 2D or 3D table updates one of its axes
    fn resolve_axis(&mut self, child: &XmlNode, table: &mut Table) -> Result<(), ResolveError> {
        let Some(axis_type) = child
            .attr("type")
            .and_then(parse_table_type)
            .filter(TableType::is_axis)
        else {
            return Ok(());
        };

        let data_size = table.data_size;
        let parent_name = table.name.clone();
        let (axis, size) = match &mut table.kind {
            TableKind::Table2D(t2d) => (&mut t2d.axis, data_size),
            TableKind::Table3D(t3d) if axis_type == TableType::XAxis => {
                (&mut t3d.x_axis, t3d.size_x)
            }
            TableKind::Table3D(t3d) => (&mut t3d.y_axis, t3d.size_y),
            _ => return Ok(()),
        };

        match self.resolve_table(child, Some((**axis).clone()))? {
            Resolved::Table(mut resolved) => {
                if !matches!(resolved.kind, TableKind::Table1D(_)) {
                    return Err(ResolveError::InvalidAttribute {
                        table: parent_name,
                        attribute: "base".to_string(),
                        value: child.attribute("base", String::new()),
                        line: child.line,
                    });
                }
                resolved.data_size = size;
                **axis = resolved;
            }
            // an omitted axis does not omit its table
            Resolved::Omitted | Resolved::NotReferenced => {
                debug!(
                    "line {}: axis of table \"{parent_name}\" is omitted, keeping the previous axis",
                    child.line
                );
            }
        }
        Ok(())
    }

    fn set_values(&mut self, table: &mut Table, child: &XmlNode, value_attribute: &str) {
        let name = child.attribute("name", String::new());
        let value = child.attribute(value_attribute, "0".to_string());
        if !table.set_values(&name, &value) {
            self.log_msgs.push(ResolveError::InvalidAttribute {
                table: table.name.clone(),
                attribute: value_attribute.to_string(),
                value,
                line: child.line,
            });
        }
    }

    // problems with base references are ignored unless parsing is strict
    fn recover(&self, error: ResolveError) -> Result<(), ResolveError> {
        if self.strict {
            Err(error)
        } else {
            debug!("{error}");
            Ok(())
        }
    }

    // problems with the content of a table are logged unless parsing is strict
    fn report(&mut self, error: ResolveError) -> Result<(), ResolveError> {
        if self.strict {
            Err(error)
        } else {
            self.log_msgs.push(error);
            Ok(())
        }
    }
}

fn invalid_attribute(node: &XmlNode, table: &Table, attribute: &str, value: &str) -> ResolveError {
    ResolveError::InvalidAttribute {
        table: table.name.clone(),
        attribute: attribute.to_string(),
        value: value.to_string(),
        line: node.line,
    }
}
