use log::{debug, info};
use std::path::Path;

use crate::RomDefError;
use crate::loader;
use crate::namemap::NameAddressRegistry;
use crate::resolver::{ResolveContext, Resolved};
use crate::rom::{Rom, RomId};
use crate::scale::ScaleRegistry;
use crate::table::Endian;
use crate::xml::{XmlNode, parse_document};

/// A parsed ROM definition document
///
/// The document is kept as an element tree. Individual roms are resolved on demand with
/// [`Definition::load_rom`], each with its own name and scale registries.
#[derive(Debug, Clone)]
pub struct Definition {
    root: XmlNode,
    rom_ids: Vec<RomId>,
    strict: bool,
    mem_model_endian: Option<Endian>,
}

impl Definition {
    /// load a definition from a file
    ///
    /// # Errors
    ///
    /// A `RomDefError` if the file cannot be read, or if it is not well-formed XML.
    pub fn load<P: AsRef<Path>>(path: P, strict_parsing: bool) -> Result<Self, RomDefError> {
        let path = path.as_ref();
        let text = loader::load(path)?;
        let root = parse_document(path, &text)?;
        Ok(Self::from_root(root, strict_parsing))
    }

    /// load a definition from a string
    ///
    /// # Errors
    ///
    /// A `RomDefError` if the text is not well-formed XML.
    pub fn load_from_string(text: &str, strict_parsing: bool) -> Result<Self, RomDefError> {
        let root = parse_document(Path::new(""), text)?;
        Ok(Self::from_root(root, strict_parsing))
    }

    fn from_root(root: XmlNode, strict: bool) -> Self {
        let roms = rom_nodes(&root);
        let rom_ids = roms
            .iter()
            .map(|rom| match rom_chain(&roms, *rom) {
                Ok(chain) => inherited_rom_id(&chain),
                Err(error) => {
                    debug!("{error}");
                    own_rom_id(rom)
                }
            })
            .collect();
        Self {
            root,
            rom_ids,
            strict,
            mem_model_endian: None,
        }
    }

    /// force the byte order of every table, regardless of the `endian` setting of the roms
    ///
    /// `None` restores the default behavior.
    pub fn set_mem_model_endian(&mut self, endian: Option<Endian>) {
        self.mem_model_endian = endian;
    }

    /// the root element of the document
    #[must_use]
    pub fn root(&self) -> &XmlNode {
        &self.root
    }

    /// the identification of every rom in the document, in document order
    ///
    /// Fields that a rom does not set are inherited from its base roms.
    #[must_use]
    pub fn rom_ids(&self) -> &[RomId] {
        &self.rom_ids
    }

    /// find the rom that matches a firmware image
    ///
    /// A rom matches if its `internalidstring` is stored at its `internalidaddress`.
    #[must_use]
    pub fn identify(&self, image: &[u8]) -> Option<&RomId> {
        self.rom_ids.iter().find(|rom_id| {
            let Some(address) = rom_id.internal_id_address else {
                return false;
            };
            let id_bytes = rom_id.internal_id_string.as_bytes();
            let Ok(start) = usize::try_from(address) else {
                return false;
            };
            !id_bytes.is_empty()
                && start
                    .checked_add(id_bytes.len())
                    .and_then(|end| image.get(start..end))
                    == Some(id_bytes)
        })
    }

    /// resolve all tables of a rom
    ///
    /// The tables of the base roms are resolved first, and the rom itself can extend, override or
    /// omit them. Problems with individual tables do not stop the resolution; they are returned
    /// together with the rom.
    ///
    /// # Errors
    ///
    /// - [`RomDefError::RomNotFound`] if no rom has the given xmlid
    /// - [`RomDefError::BaseRomNotFound`] and [`RomDefError::BaseRomCycle`] if the chain of base roms is broken
    pub fn load_rom(&self, xmlid: &str) -> Result<(Rom, Vec<RomDefError>), RomDefError> {
        let roms = rom_nodes(&self.root);
        let target = roms
            .iter()
            .copied()
            .find(|rom| rom_xmlid(rom).eq_ignore_ascii_case(xmlid))
            .ok_or_else(|| RomDefError::RomNotFound {
                xmlid: xmlid.to_string(),
            })?;
        let chain = rom_chain(&roms, target)?;
        let rom_id = inherited_rom_id(&chain);
        let mem_model_endian = self.mem_model_endian.or(rom_id.endian);
        let mut log_msgs = Vec::new();

        // the target is scanned first so that its addresses take precedence over the bases
        let mut names = NameAddressRegistry::new();
        for rom_node in chain.iter().rev() {
            names.scan(&rom_node.children);
        }

        let mut scales = ScaleRegistry::new();
        let mut scale_errors = Vec::new();
        scales.load_base_scales(&self.root, self.strict, &mut scale_errors);
        log_msgs.extend(
            scale_errors
                .into_iter()
                .map(|scale_error| RomDefError::ScaleError { scale_error }),
        );

        let mut rom = Rom::new(rom_id);
        for rom_node in &chain {
            let rom_name = rom_xmlid(rom_node);
            for node in rom_node.children_named("table") {
                let name = node.attribute("name", "unknown".to_string());
                let existing = rom.tables.get(&name).cloned();
                let mut table_errors = Vec::new();
                let result = ResolveContext::new(&rom, &names, &mut scales, &mut table_errors)
                    .with_mem_model_endian(mem_model_endian)
                    .with_strict(self.strict)
                    .resolve_table(node, existing);

                log_msgs.extend(table_errors.into_iter().map(|table_error| {
                    RomDefError::TableError {
                        rom: rom_name.to_string(),
                        table_error,
                    }
                }));
                match result {
                    Ok(Resolved::Table(table)) => {
                        rom.tables.insert_or_replace(table);
                    }
                    Ok(Resolved::Omitted) => {
                        rom.tables.remove(&name);
                    }
                    Ok(Resolved::NotReferenced) => {}
                    Err(table_error) => log_msgs.push(RomDefError::TableError {
                        rom: rom_name.to_string(),
                        table_error,
                    }),
                }
            }
        }

        info!(
            "resolved rom {}: {} tables, {} scales",
            rom.rom_id.xmlid,
            rom.tables.len(),
            scales.len()
        );
        Ok((rom, log_msgs))
    }
}

// the document is either a collection of roms or a single rom
fn rom_nodes(root: &XmlNode) -> Vec<&XmlNode> {
    if root.is("rom") {
        vec![root]
    } else {
        root.children_named("rom").collect()
    }
}

fn rom_xmlid(rom: &XmlNode) -> &str {
    rom.child("romid")
        .and_then(|romid| romid.child_text("xmlid"))
        .unwrap_or_default()
}

fn own_rom_id(rom: &XmlNode) -> RomId {
    rom.child("romid").map(RomId::parse).unwrap_or_default()
}

// the rom and all of its bases, starting with the most basic rom
fn rom_chain<'a>(roms: &[&'a XmlNode], target: &'a XmlNode) -> Result<Vec<&'a XmlNode>, RomDefError> {
    let mut chain = vec![target];
    let mut current = target;
    while let Some(base) = current
        .attr("base")
        .map(str::trim)
        .filter(|base| !base.is_empty() && !base.eq_ignore_ascii_case("none"))
    {
        let Some(base_rom) = roms
            .iter()
            .copied()
            .find(|rom| rom_xmlid(rom).eq_ignore_ascii_case(base))
        else {
            return Err(RomDefError::BaseRomNotFound {
                xmlid: rom_xmlid(current).to_string(),
                base: base.to_string(),
            });
        };
        if chain.iter().any(|rom| std::ptr::eq(*rom, base_rom)) {
            return Err(RomDefError::BaseRomCycle {
                xmlid: rom_xmlid(target).to_string(),
            });
        }
        chain.push(base_rom);
        current = base_rom;
    }
    chain.reverse();
    Ok(chain)
}

// the id of the last rom in the chain, completed from its bases
fn inherited_rom_id(chain: &[&XmlNode]) -> RomId {
    let mut roms = chain.iter().rev();
    let mut rom_id = roms.next().map(|rom| own_rom_id(rom)).unwrap_or_default();
    for base in roms {
        rom_id.inherit_from(&own_rom_id(base));
    }
    rom_id
}
