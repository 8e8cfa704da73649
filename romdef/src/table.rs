use std::rc::Rc;

use crate::itemlist::ItemList;
use crate::scale::{DEFAULT_SCALE_NAME, Scale};
use crate::RomObjectName;

/// byte order of the table data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Big,
    Little,
}

impl Endian {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Endian::Big => "big",
            Endian::Little => "little",
        }
    }
}

/// numeric encoding of each element of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// integer data; the value is the width in bytes
    Integer(u8),
    /// IEEE 754 single precision float
    Float,
    /// 20 bit immediate of a SH-2A `movi20` instruction
    Movi20,
    /// 20 bit immediate of a SH-2A `movi20s` instruction
    Movi20s,
}

impl StorageType {
    /// number of bytes occupied by one element
    #[must_use]
    pub fn byte_width(&self) -> u32 {
        match self {
            StorageType::Integer(bytes) => u32::from(*bytes),
            StorageType::Float | StorageType::Movi20 | StorageType::Movi20s => 4,
        }
    }
}

/// the kind of a table as declared by its `type` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableType {
    Table1D,
    XAxis,
    YAxis,
    Table2D,
    Table3D,
    Switch,
    BitwiseSwitch,
}

impl TableType {
    #[must_use]
    pub fn is_axis(&self) -> bool {
        matches!(self, TableType::XAxis | TableType::YAxis)
    }
}

/// a single static value of an axis
#[derive(Debug, Clone, PartialEq)]
pub struct DataCell {
    text: String,
}

impl DataCell {
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self {
            text: text.trim().to_string(),
        }
    }

    /// the value as written in the definition
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// the value, if it is numeric
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        self.text.parse().ok()
    }
}

/// the role of a linear table: either a table of its own, or the axis of a 2D or 3D table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table1DRole {
    Standalone,
    XAxis,
    YAxis,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table1D {
    pub role: Table1DRole,
    /// values of a static axis, which is not stored in the image
    pub static_cells: Vec<DataCell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table2D {
    pub axis: Box<Table>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table3D {
    pub x_axis: Box<Table>,
    pub y_axis: Box<Table>,
    pub swap_xy: bool,
    pub flip_x: bool,
    pub flip_y: bool,
    pub size_x: u32,
    pub size_y: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchState {
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableSwitch {
    pub states: Vec<SwitchState>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchBit {
    pub name: String,
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableBitwiseSwitch {
    pub bits: Vec<SwitchBit>,
}

/// variant specific content of a [`Table`]
#[derive(Debug, Clone, PartialEq)]
pub enum TableKind {
    Table1D(Table1D),
    Table2D(Table2D),
    Table3D(Table3D),
    Switch(TableSwitch),
    BitwiseSwitch(TableBitwiseSwitch),
}

/// A calibration table inside a firmware image
///
/// Cloning a `Table` produces a fully independent copy, including the axes of 2D and 3D tables.
/// The attached scales are shared: a [`Scale`] is never modified after it has been registered,
/// so a clone can replace its scales without affecting the original.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub category: String,
    pub description: String,
    /// location of the table data; `None` if the definition does not provide a usable address
    pub storage_address: Option<u32>,
    /// `None` until a `storagetype` has been set
    pub storage_type: Option<StorageType>,
    pub signed: bool,
    pub endian: Endian,
    /// byte order forced by the memory model of the rom
    pub mem_model_endian: Option<Endian>,
    pub data_size: u32,
    pub flip: bool,
    pub data_layout: String,
    pub before_ram: bool,
    pub locked: bool,
    pub user_level: u32,
    pub log_param: String,
    pub string_mask: u64,
    scales: ItemList<Rc<Scale>>,
    default_scale: Option<String>,
    pub kind: TableKind,
}

impl Table {
    /// create an empty table of the given type
    #[must_use]
    pub fn new(table_type: TableType) -> Self {
        let kind = match table_type {
            TableType::Table1D => TableKind::Table1D(Table1D::new(Table1DRole::Standalone)),
            TableType::XAxis => TableKind::Table1D(Table1D::new(Table1DRole::XAxis)),
            TableType::YAxis => TableKind::Table1D(Table1D::new(Table1DRole::YAxis)),
            TableType::Table2D => TableKind::Table2D(Table2D {
                axis: Box::new(Table::new(TableType::YAxis)),
            }),
            TableType::Table3D => TableKind::Table3D(Table3D {
                x_axis: Box::new(Table::new(TableType::XAxis)),
                y_axis: Box::new(Table::new(TableType::YAxis)),
                swap_xy: false,
                flip_x: false,
                flip_y: false,
                size_x: 0,
                size_y: 0,
            }),
            TableType::Switch => TableKind::Switch(TableSwitch::default()),
            TableType::BitwiseSwitch => TableKind::BitwiseSwitch(TableBitwiseSwitch::default()),
        };

        Self {
            name: String::new(),
            category: "Other".to_string(),
            description: String::new(),
            storage_address: None,
            storage_type: None,
            signed: false,
            endian: Endian::Big,
            mem_model_endian: None,
            data_size: 0,
            flip: false,
            data_layout: String::new(),
            before_ram: false,
            locked: false,
            user_level: 0,
            log_param: String::new(),
            string_mask: 0,
            scales: ItemList::new(),
            default_scale: None,
            kind,
        }
    }

    #[must_use]
    pub fn table_type(&self) -> TableType {
        match &self.kind {
            TableKind::Table1D(t1d) => match t1d.role {
                Table1DRole::Standalone => TableType::Table1D,
                Table1DRole::XAxis => TableType::XAxis,
                Table1DRole::YAxis => TableType::YAxis,
            },
            TableKind::Table2D(_) => TableType::Table2D,
            TableKind::Table3D(_) => TableType::Table3D,
            TableKind::Switch(_) => TableType::Switch,
            TableKind::BitwiseSwitch(_) => TableType::BitwiseSwitch,
        }
    }

    /// the scales attached to this table, in the order in which they were first added
    pub fn scales(&self) -> impl Iterator<Item = &Rc<Scale>> {
        self.scales.iter()
    }

    #[must_use]
    pub fn scale(&self, name: &str) -> Option<&Rc<Scale>> {
        self.scales.get(name)
    }

    /// attach a scale; an attached scale with the same name is replaced
    ///
    /// The scale named "Default" becomes the default scale of the table. Until such a scale is
    /// attached, the most recently attached scale is the default.
    pub fn add_scale(&mut self, scale: Rc<Scale>) {
        let name = scale.name.clone();
        self.scales.insert_or_replace(scale);
        let keep_current = self
            .default_scale
            .as_deref()
            .is_some_and(|current| current == DEFAULT_SCALE_NAME && name != DEFAULT_SCALE_NAME);
        if !keep_current {
            self.default_scale = Some(name);
        }
    }

    #[must_use]
    pub fn default_scale(&self) -> Option<&Rc<Scale>> {
        self.default_scale
            .as_deref()
            .and_then(|name| self.scales.get(name))
    }

    /// append a static value; only linear tables and axes can hold static data
    ///
    /// Returns `false` if the cell was not added.
    pub fn add_static_cell(&mut self, cell: DataCell) -> bool {
        if let TableKind::Table1D(t1d) = &mut self.kind {
            t1d.static_cells.push(cell);
            true
        } else {
            false
        }
    }

    /// set a named value: a state of a switch table, or a bit of a bitwise switch table
    ///
    /// Switch states are given as whitespace separated hex bytes ("0C 3F 02"), bits as a decimal
    /// bit position. Other kinds of tables ignore the value.
    /// Returns `false` if the value could not be interpreted.
    pub fn set_values(&mut self, name: &str, value: &str) -> bool {
        match &mut self.kind {
            TableKind::Switch(switch) => {
                let data: Option<Vec<u8>> = value
                    .split_whitespace()
                    .map(|byte| u8::from_str_radix(byte, 16).ok())
                    .collect();
                let Some(data) = data else {
                    return false;
                };
                if let Some(state) = switch.states.iter_mut().find(|state| state.name == name) {
                    state.data = data;
                } else {
                    switch.states.push(SwitchState {
                        name: name.to_string(),
                        data,
                    });
                }
                true
            }
            TableKind::BitwiseSwitch(bitwise) => {
                let Ok(position) = value.trim().parse::<u32>() else {
                    return false;
                };
                if let Some(bit) = bitwise.bits.iter_mut().find(|bit| bit.name == name) {
                    bit.position = position;
                } else {
                    bitwise.bits.push(SwitchBit {
                        name: name.to_string(),
                        position,
                    });
                }
                true
            }
            TableKind::Table1D(_) | TableKind::Table2D(_) | TableKind::Table3D(_) => true,
        }
    }

    /// the axis of a 2D table
    #[must_use]
    pub fn axis(&self) -> Option<&Table> {
        match &self.kind {
            TableKind::Table2D(t2d) => Some(&*t2d.axis),
            _ => None,
        }
    }

    /// the X axis of a 3D table
    #[must_use]
    pub fn x_axis(&self) -> Option<&Table> {
        match &self.kind {
            TableKind::Table3D(t3d) => Some(&*t3d.x_axis),
            _ => None,
        }
    }

    /// the Y axis of a 3D table
    #[must_use]
    pub fn y_axis(&self) -> Option<&Table> {
        match &self.kind {
            TableKind::Table3D(t3d) => Some(&*t3d.y_axis),
            _ => None,
        }
    }

    /// the static values of a linear table or axis
    #[must_use]
    pub fn static_cells(&self) -> &[DataCell] {
        match &self.kind {
            TableKind::Table1D(t1d) => &t1d.static_cells,
            _ => &[],
        }
    }

    /// a static axis carries its values in the definition instead of the image
    #[must_use]
    pub fn is_static(&self) -> bool {
        !self.static_cells().is_empty()
    }
}

impl Table1D {
    fn new(role: Table1DRole) -> Self {
        Self {
            role,
            static_cells: Vec::new(),
        }
    }
}

impl RomObjectName for Table {
    fn get_name(&self) -> &str {
        &self.name
    }
}
