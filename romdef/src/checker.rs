use crate::RomDefError;
use crate::rom::Rom;
use crate::table::{Table, TableKind};

// check the consistency of all resolved tables of a rom
pub(crate) fn check(rom: &Rom, log_msgs: &mut Vec<RomDefError>) {
    let rom_name = &rom.rom_id.xmlid;
    for table in &rom.tables {
        check_table(rom_name, table, log_msgs);

        match &table.kind {
            TableKind::Table2D(t2d) => {
                check_axis(rom_name, table, &t2d.axis, table.data_size, log_msgs);
            }
            TableKind::Table3D(t3d) => {
                check_axis(rom_name, table, &t3d.x_axis, t3d.size_x, log_msgs);
                check_axis(rom_name, table, &t3d.y_axis, t3d.size_y, log_msgs);
            }
            TableKind::Switch(switch) => {
                if switch.states.is_empty() {
                    log_msgs.push(content_error(rom_name, &table.name, "switch table has no states"));
                } else if let Some(state) = switch
                    .states
                    .iter()
                    .find(|state| state.data.len() != switch.states[0].data.len())
                {
                    log_msgs.push(content_error(
                        rom_name,
                        &table.name,
                        &format!(
                            "state \"{}\" has {} bytes, but state \"{}\" has {} bytes",
                            state.name,
                            state.data.len(),
                            switch.states[0].name,
                            switch.states[0].data.len()
                        ),
                    ));
                }
            }
            TableKind::BitwiseSwitch(bitwise) => {
                let width = table.storage_type.map_or(1, |storage_type| storage_type.byte_width());
                for bit in &bitwise.bits {
                    if bit.position >= width * 8 {
                        log_msgs.push(content_error(
                            rom_name,
                            &table.name,
                            &format!(
                                "bit \"{}\" at position {} is outside of the {width} byte value",
                                bit.name, bit.position
                            ),
                        ));
                    }
                }
            }
            TableKind::Table1D(_) => {}
        }
    }
}

fn check_table(rom_name: &str, table: &Table, log_msgs: &mut Vec<RomDefError>) {
    // static data is part of the definition, not of the image
    if table.storage_address.is_none() && !table.is_static() {
        log_msgs.push(content_error(rom_name, &table.name, "storage address is not set"));
    }

    let needs_storage_type = matches!(
        table.kind,
        TableKind::Table1D(_) | TableKind::Table2D(_) | TableKind::Table3D(_)
    );
    if needs_storage_type && table.storage_type.is_none() && !table.is_static() {
        log_msgs.push(content_error(rom_name, &table.name, "storage type is not set"));
    }
}

fn check_axis(
    rom_name: &str,
    parent: &Table,
    axis: &Table,
    expected_size: u32,
    log_msgs: &mut Vec<RomDefError>,
) {
    if axis.data_size != expected_size {
        log_msgs.push(content_error(
            rom_name,
            &parent.name,
            &format!(
                "axis \"{}\" has {} elements, but the table has {expected_size}",
                axis.name, axis.data_size
            ),
        ));
    }
    if axis.is_static() {
        let cell_count = axis.static_cells().len();
        if u32::try_from(cell_count).ok() != Some(expected_size) {
            log_msgs.push(content_error(
                rom_name,
                &parent.name,
                &format!(
                    "static axis \"{}\" has {cell_count} values, but the table has {expected_size}",
                    axis.name
                ),
            ));
        }
    } else if axis.storage_address.is_none() {
        log_msgs.push(content_error(
            rom_name,
            &parent.name,
            &format!("storage address of axis \"{}\" is not set", axis.name),
        ));
    }
}

fn content_error(rom_name: &str, item_name: &str, description: &str) -> RomDefError {
    RomDefError::ContentError {
        rom: rom_name.to_string(),
        item_name: item_name.to_string(),
        description: description.to_string(),
    }
}
