use fnv::FnvBuildHasher;
use log::trace;
use std::collections::HashMap;

use crate::attributes::{parse_hex_string, resolved_address};
use crate::xml::XmlNode;

/// Names and storage addresses of the tables of a rom and its base roms
///
/// The registry is filled by a flat pre-scan of the `table` elements of the rom and then of each
/// of its base roms before any table is resolved. Entries of the rom itself take precedence, the
/// bases only add missing names or fill in unresolved addresses. Only tables that are listed here (or axis tables) are created by the resolver,
/// and a resolved address from the registry takes precedence over the address in a table element.
#[derive(Debug, Clone, Default)]
pub struct NameAddressRegistry {
    addresses: HashMap<String, Option<u32>, FnvBuildHasher>,
}

impl NameAddressRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// register the `table` elements among `nodes`
    ///
    /// Child elements are not visited. A table with `omit="true"` ends the scan: neither it nor
    /// any of the following tables are registered.
    pub fn scan(&mut self, nodes: &[XmlNode]) {
        for node in nodes.iter().filter(|node| node.is("table")) {
            if node.attribute("omit", false) {
                trace!("line {}: omitted table ends the table scan", node.line);
                return;
            }
            let name = node.attribute("name", "unknown".to_string());
            let address = node
                .attr("storageaddress")
                .and_then(parse_hex_string)
                .unwrap_or(-1);
            self.insert(&name, address);
        }
    }

    /// add a name with its raw address
    ///
    /// A new name is only added if the address is not negative. An existing name is only updated
    /// if its address is unresolved and the new address is not negative.
    pub fn insert(&mut self, name: &str, raw_address: i64) {
        if raw_address < 0 {
            return;
        }
        match self.addresses.get_mut(name) {
            Some(address) => {
                if address.is_none() {
                    *address = resolved_address(raw_address);
                }
            }
            None => {
                self.addresses
                    .insert(name.to_string(), resolved_address(raw_address));
            }
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.addresses.contains_key(name)
    }

    /// look up the address of a table
    ///
    /// The outer `Option` tells if the name is registered, the inner one if its address is resolved.
    #[must_use]
    pub fn address(&self, name: &str) -> Option<Option<u32>> {
        self.addresses.get(name).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}
