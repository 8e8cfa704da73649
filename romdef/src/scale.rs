use log::{debug, trace};
use std::rc::Rc;

use crate::RomObjectName;
use crate::resolver::ResolveError;
use crate::xml::XmlNode;

/// name given to a `scaling` that does not have a name attribute
pub const DEFAULT_SCALE_NAME: &str = "Default";

/// Conversion between raw table data and engineering units
///
/// `expression` converts raw values to engineering units and `byte_expression` converts back.
/// Both are kept as the formula text from the definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Scale {
    pub name: String,
    pub unit: String,
    pub expression: String,
    pub byte_expression: String,
    pub format: String,
    pub min: f64,
    pub max: f64,
    pub coarse_increment: f64,
    pub fine_increment: f64,
}

/// the identity scale: raw values are displayed unchanged
impl Default for Scale {
    fn default() -> Self {
        Self {
            name: "Raw Value".to_string(),
            unit: "raw value".to_string(),
            expression: "x".to_string(),
            byte_expression: "x".to_string(),
            format: "#".to_string(),
            min: 0.0,
            max: 0.0,
            coarse_increment: 1.0,
            fine_increment: 1.0,
        }
    }
}

impl RomObjectName for Scale {
    fn get_name(&self) -> &str {
        &self.name
    }
}

/// The canonical scales of one definition document
///
/// Every scale resolved from a `scalingbase` or `scaling` element is registered here. Scales with
/// identical values are stored only once, and all tables that use them share the same instance.
/// A registry belongs to a single resolution pass; it is not shared between documents.
#[derive(Debug)]
pub struct ScaleRegistry {
    scales: Vec<Rc<Scale>>,
    raw: Rc<Scale>,
}

impl ScaleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scales: Vec::new(),
            raw: Rc::new(Scale::default()),
        }
    }

    /// the identity scale that is attached to every newly created table
    #[must_use]
    pub fn raw_scale(&self) -> Rc<Scale> {
        Rc::clone(&self.raw)
    }

    /// register all `scalingbase` elements that are direct children of the document root
    ///
    /// A `scalingbase` that fails to resolve in strict mode is skipped and reported in `log_msgs`.
    pub fn load_base_scales(
        &mut self,
        root: &XmlNode,
        strict: bool,
        log_msgs: &mut Vec<ResolveError>,
    ) {
        for node in root.children_named("scalingbase") {
            if let Err(error) = self.resolve_scale(node, Scale::default(), strict) {
                log_msgs.push(error);
            }
        }
    }

    /// find a registered scale by name, ignoring case
    ///
    /// If several registered scales share the name, the most recently registered one is returned.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Rc<Scale>> {
        self.scales
            .iter()
            .rev()
            .find(|scale| scale.name.eq_ignore_ascii_case(name))
    }

    /// resolve a `scaling` or `scalingbase` element
    ///
    /// `scale` is the starting point for the attribute overlay. It is replaced by a copy of the
    /// base scale if the element names one. The result is the canonical instance of the scale.
    ///
    /// # Errors
    ///
    /// [`ResolveError::BaseScaleNotFound`] if the base scale does not exist and `strict` is set.
    /// Without `strict` the missing base is ignored.
    pub fn resolve_scale(
        &mut self,
        node: &XmlNode,
        mut scale: Scale,
        strict: bool,
    ) -> Result<Rc<Scale>, ResolveError> {
        let base = node.attribute("base", "none".to_string());
        if !base.eq_ignore_ascii_case("none") {
            if let Some(base_scale) = self.find(&base) {
                scale = Scale::clone(base_scale);
            } else if strict {
                return Err(ResolveError::BaseScaleNotFound {
                    scale: node.attribute("name", DEFAULT_SCALE_NAME.to_string()),
                    base,
                    line: node.line,
                });
            } else {
                debug!("line {}: base scale \"{base}\" not found", node.line);
            }
        }

        scale.name = node.attribute("name", DEFAULT_SCALE_NAME.to_string());
        scale.unit = node.attribute("units", scale.unit);
        scale.expression = node.attribute("expression", scale.expression);
        scale.byte_expression = node.attribute("to_byte", scale.byte_expression);
        scale.format = node.attribute("format", scale.format);
        scale.max = node.attribute("max", scale.max);
        scale.min = node.attribute("min", scale.min);
        // "increment" is the old name of "coarseincrement"
        let coarse_increment = node.attribute("increment", scale.coarse_increment);
        scale.coarse_increment = node.attribute("coarseincrement", coarse_increment);
        scale.fine_increment = node.attribute("fineincrement", scale.fine_increment);

        if let Some(existing) = self.scales.iter().find(|existing| ***existing == scale) {
            trace!("scale \"{}\" is already registered", scale.name);
            return Ok(Rc::clone(existing));
        }
        let scale = Rc::new(scale);
        self.scales.push(Rc::clone(&scale));
        Ok(scale)
    }

    /// Returns an iterator over the registered scales
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Scale>> {
        self.scales.iter()
    }

    /// Returns the number of registered scales
    #[must_use]
    pub fn len(&self) -> usize {
        self.scales.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }
}

impl Default for ScaleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
