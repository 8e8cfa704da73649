#[cfg(test)]
mod test {
    use romdef::*;
    use std::rc::Rc;
    use tempfile::tempdir;

    const TEST_DEFINITION: &str = r###"<?xml version="1.0" encoding="UTF-8"?>
<roms>
  <scalingbase name="AFR" units="AFR" expression="x/10" to_byte="x*10" format="0.0" min="7" max="20" increment="1" fineincrement="0.1"/>
  <scalingbase name="RPM" units="rpm" expression="x*50" to_byte="x/50" format="0" max="10000"/>

  <rom>
    <romid>
      <xmlid>BASE32</xmlid>
      <make>Subaru</make>
      <model>Impreza</model>
      <memmodel>SH7058</memmodel>
      <filesize>1024kb</filesize>
    </romid>

    <table name="AFR Target" type="3D" category="Fueling" storagetype="uint8" sizex="10" sizey="10">
      <scaling name="AFR" base="AFR"/>
      <table name="Engine Load" type="X Axis" storagetype="float">
        <scaling name="Default" units="g/rev" expression="x" format="0.00"/>
      </table>
      <table name="Engine Speed" type="Y Axis" storagetype="float">
        <scaling name="Default" base="RPM"/>
      </table>
    </table>

    <table name="Idle Speed" type="2D" category="Idle" storagetype="uint8" sizey="5">
      <scaling name="Default" base="RPM"/>
      <table name="Coolant Temp" type="Static X Axis">
        <data>-20</data>
        <data>0</data>
        <data>20</data>
        <data>40</data>
        <data>80</data>
      </table>
      <description>target idle speed</description>
    </table>

    <table name="Launch Control" type="Switch" category="Misc" sizey="2">
      <state name="on" data="01 00"/>
      <state name="off" data="00 00"/>
    </table>

    <table name="Diagnostic Flags" type="BitwiseSwitch" category="Misc" storagetype="uint8">
      <bit name="CEL" position="0"/>
      <bit name="Fan" position="5"/>
    </table>

    <table name="Rev Limit" type="1D" category="Misc" storagetype="uint16">
      <scaling name="Default" base="RPM"/>
    </table>
  </rom>

  <rom base="BASE32">
    <romid>
      <xmlid>A2WC522N</xmlid>
      <internalidaddress>2000</internalidaddress>
      <internalidstring>A2WC522N</internalidstring>
      <ecuid>2F12785206</ecuid>
      <year>02</year>
    </romid>
    <table name="AFR Target" storageaddress="0x2000">
      <table type="X Axis" storageaddress="0x2100"/>
      <table type="Y Axis" storageaddress="0x2140"/>
    </table>
    <table name="Idle Speed" storageaddress="0x3000"/>
    <table name="Launch Control" storageaddress="0x3100"/>
    <table name="Diagnostic Flags" storageaddress="0x3200"/>
    <table name="Rev Limit" storageaddress="0x3300" locked="true"/>
    <table name="Rev Limit Copy" base="Rev Limit" storageaddress="0x3400" locked="false"/>
  </rom>

  <rom base="A2WC522N">
    <romid>
      <xmlid>A2WC522S</xmlid>
      <internalidaddress>2000</internalidaddress>
      <internalidstring>A2WC522S</internalidstring>
      <endian>little</endian>
    </romid>
    <table name="AFR Target" storageaddress="0x2000" sizey="16"/>
    <table name="Rev Limit" omit="true"/>
  </rom>
</roms>
"###;

    fn load_test_rom(xmlid: &str) -> Rom {
        let definition = load_from_string(TEST_DEFINITION, false).unwrap();
        let (rom, log_msgs) = definition.load_rom(xmlid).unwrap();
        assert!(log_msgs.is_empty(), "{log_msgs:?}");
        rom
    }

    #[test]
    fn end_to_end() {
        let root = XmlNode::parse(
            r###"<roms>
  <scalingbase name="AFR" units="AFR" expression="x/10" max="20" min="7"/>
  <table name="AFR Target" type="3D" storageaddress="0x1000" sizex="12" sizey="16">
    <scaling name="AFR" base="AFR"/>
  </table>
</roms>"###,
        )
        .unwrap();
        let mut log_msgs = Vec::new();
        let mut scales = ScaleRegistry::new();
        scales.load_base_scales(&root, false, &mut log_msgs);
        let mut names = NameAddressRegistry::new();
        names.insert("AFR Target", 0x2000);
        let rom = Rom::default();

        let table_node = root.child("table").unwrap();
        let result = ResolveContext::new(&rom, &names, &mut scales, &mut log_msgs)
            .resolve_table(table_node, None)
            .unwrap();
        assert!(log_msgs.is_empty());
        let Resolved::Table(table) = result else {
            panic!("table was not resolved");
        };

        assert_eq!(table.table_type(), TableType::Table3D);
        assert_eq!(table.storage_address, Some(0x2000));
        let TableKind::Table3D(t3d) = &table.kind else {
            panic!("not a 3D table");
        };
        assert_eq!(t3d.size_x, 12);
        assert_eq!(t3d.size_y, 16);

        let scale = table.scale("AFR").unwrap();
        let expected = Scale {
            name: "AFR".to_string(),
            unit: "AFR".to_string(),
            expression: "x/10".to_string(),
            max: 20.0,
            min: 7.0,
            ..Scale::default()
        };
        assert_eq!(**scale, expected);
        assert!(Rc::ptr_eq(scale, scales.find("AFR").unwrap()));
        assert_eq!(table.default_scale().unwrap().name, "AFR");
    }

    #[test]
    fn rom_inheritance() {
        let rom = load_test_rom("A2WC522N");
        assert_eq!(rom.rom_id.xmlid, "A2WC522N");
        assert_eq!(rom.rom_id.make, "Subaru");
        assert_eq!(rom.rom_id.mem_model, "SH7058");
        assert_eq!(rom.rom_id.ecu_id, "2F12785206");
        assert_eq!(rom.rom_id.internal_id_address, Some(0x2000));
        assert_eq!(rom.tables.len(), 6);

        let afr = rom.tables.get("AFR Target").unwrap();
        assert_eq!(afr.category, "Fueling");
        assert_eq!(afr.storage_type, Some(StorageType::Integer(1)));
        assert_eq!(afr.storage_address, Some(0x2000));
        let x_axis = afr.x_axis().unwrap();
        assert_eq!(x_axis.name, "Engine Load");
        assert_eq!(x_axis.storage_address, Some(0x2100));
        assert_eq!(x_axis.storage_type, Some(StorageType::Float));
        assert_eq!(x_axis.data_size, 10);
        assert_eq!(x_axis.default_scale().unwrap().unit, "g/rev");
        let y_axis = afr.y_axis().unwrap();
        assert_eq!(y_axis.name, "Engine Speed");
        assert_eq!(y_axis.storage_address, Some(0x2140));
        assert_eq!(y_axis.default_scale().unwrap().unit, "rpm");

        let idle = rom.tables.get("Idle Speed").unwrap();
        assert_eq!(idle.description, "target idle speed");
        let axis = idle.axis().unwrap();
        assert_eq!(axis.data_size, 5);
        let temperatures: Vec<f64> = axis
            .static_cells()
            .iter()
            .filter_map(DataCell::value)
            .collect();
        assert_eq!(temperatures, vec![-20.0, 0.0, 20.0, 40.0, 80.0]);

        let TableKind::Switch(switch) = &rom.tables.get("Launch Control").unwrap().kind else {
            panic!("not a switch table");
        };
        assert_eq!(switch.states[0].name, "on");
        assert_eq!(switch.states[0].data, vec![1, 0]);

        let TableKind::BitwiseSwitch(flags) = &rom.tables.get("Diagnostic Flags").unwrap().kind
        else {
            panic!("not a bitwise switch table");
        };
        assert_eq!(flags.bits.len(), 2);
        assert_eq!(flags.bits[1].position, 5);
    }

    #[test]
    fn base_table_inheritance() {
        let rom = load_test_rom("A2WC522N");
        let original = rom.tables.get("Rev Limit").unwrap();
        let copy = rom.tables.get("Rev Limit Copy").unwrap();

        // overridden attributes
        assert!(original.locked);
        assert!(!copy.locked);
        assert_eq!(original.storage_address, Some(0x3300));
        assert_eq!(copy.storage_address, Some(0x3400));
        // inherited attributes
        assert_eq!(copy.category, original.category);
        assert_eq!(copy.storage_type, original.storage_type);
        assert_eq!(copy.endian, original.endian);
        assert!(Rc::ptr_eq(
            copy.default_scale().unwrap(),
            original.default_scale().unwrap()
        ));
    }

    #[test]
    fn shared_scales() {
        let rom = load_test_rom("A2WC522N");
        let idle = rom.tables.get("Idle Speed").unwrap().scale("Default").unwrap();
        let rev_limit = rom.tables.get("Rev Limit").unwrap().scale("Default").unwrap();
        let engine_speed = rom
            .tables
            .get("AFR Target")
            .unwrap()
            .y_axis()
            .unwrap()
            .scale("Default")
            .unwrap();
        assert!(Rc::ptr_eq(idle, rev_limit));
        assert!(Rc::ptr_eq(idle, engine_speed));
        assert_eq!(idle.unit, "rpm");
    }

    #[test]
    fn unreferenced_tables_are_not_created() {
        // the base rom lists all of its tables, but none of them has an address
        let rom = load_test_rom("BASE32");
        assert!(rom.tables.is_empty());
    }

    #[test]
    fn omitted_table_and_endian() {
        let rom = load_test_rom("A2WC522S");
        assert!(!rom.tables.contains_key("Rev Limit"));
        // the copy is a table of its own and is kept
        let copy = rom.tables.get("Rev Limit Copy").unwrap();
        assert_eq!(copy.storage_address, Some(0x3400));
        // tables placed by the base rom are inherited
        let names: Vec<&str> = rom.tables.iter().map(|table| table.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "AFR Target",
                "Idle Speed",
                "Launch Control",
                "Diagnostic Flags",
                "Rev Limit Copy"
            ]
        );
        assert_eq!(
            rom.tables.get("Idle Speed").unwrap().storage_address,
            Some(0x3000)
        );
        assert_eq!(rom.rom_id.internal_id_string, "A2WC522S");
        assert_eq!(rom.rom_id.ecu_id, "2F12785206");

        let afr = rom.tables.get("AFR Target").unwrap();
        assert_eq!(afr.endian, Endian::Little);
        assert_eq!(afr.mem_model_endian, Some(Endian::Little));
        let TableKind::Table3D(t3d) = &afr.kind else {
            panic!("not a 3D table");
        };
        assert_eq!(t3d.size_x, 10);
        assert_eq!(t3d.size_y, 16);
        // the axes were resolved before the size changed
        assert_eq!(t3d.x_axis.data_size, 10);

        // tables of a rom without a model-wide byte order keep their own
        let rom = load_test_rom("A2WC522N");
        let afr = rom.tables.get("AFR Target").unwrap();
        assert_eq!(afr.endian, Endian::Big);
        assert_eq!(afr.mem_model_endian, None);
    }

    #[test]
    fn identify() {
        let definition = load_from_string(TEST_DEFINITION, false).unwrap();
        let mut image = vec![0xffu8; 0x4000];
        image[0x2000..0x2008].copy_from_slice(b"A2WC522S");
        assert_eq!(definition.identify(&image).unwrap().xmlid, "A2WC522S");
        image[0x2000..0x2008].copy_from_slice(b"A2WC522N");
        assert_eq!(definition.identify(&image).unwrap().xmlid, "A2WC522N");
        assert_eq!(definition.rom_ids().len(), 3);
    }

    #[test]
    fn strict_parsing() {
        let text = r###"<roms>
  <rom>
    <romid><xmlid>S</xmlid></romid>
    <table name="a" type="1D" storageaddress="0x10" base="missing"/>
    <table name="b" type="1D" storageaddress="0x20">
      <scaling name="s" base="missing"/>
    </table>
    <table name="c" type="2D" storageaddress="0x30">
      <data>1</data>
    </table>
    <table name="d" type="1D" storageaddress="0x40"/>
  </rom>
</roms>"###;

        let definition = load_from_string(text, false).unwrap();
        let (rom, log_msgs) = definition.load_rom("S").unwrap();
        assert_eq!(rom.tables.len(), 4);
        // only the misplaced data is reported
        assert_eq!(log_msgs.len(), 1);

        let definition = load_from_string(text, true).unwrap();
        let (rom, log_msgs) = definition.load_rom("S").unwrap();
        assert_eq!(rom.tables.len(), 1);
        assert!(rom.tables.contains_key("d"));
        assert_eq!(log_msgs.len(), 3);
        assert!(matches!(
            &log_msgs[0],
            RomDefError::TableError {
                table_error: ResolveError::BaseTableNotFound { .. },
                ..
            }
        ));
        assert!(matches!(
            &log_msgs[1],
            RomDefError::TableError {
                table_error: ResolveError::BaseScaleNotFound { .. },
                ..
            }
        ));
        assert!(matches!(
            &log_msgs[2],
            RomDefError::TableError {
                table_error: ResolveError::MisplacedDataCell { .. },
                ..
            }
        ));
    }

    #[test]
    fn strict_scalingbase() {
        let text = r###"<roms>
  <scalingbase name="a" base="missing" units="x"/>
  <rom><romid><xmlid>S</xmlid></romid></rom>
</roms>"###;
        let (_, log_msgs) = load_from_string(text, true).unwrap().load_rom("S").unwrap();
        assert_eq!(log_msgs.len(), 1);
        assert!(matches!(&log_msgs[0], RomDefError::ScaleError { .. }));
    }

    #[test]
    fn custom_table_source() {
        struct Library {
            rom: Rom,
        }

        impl TableSource for Library {
            fn table_by_name(&self, name: &str) -> Result<&Table, TableLookupError> {
                if name.starts_with("remote:") {
                    return Err(TableLookupError::Unavailable {
                        name: name.to_string(),
                        reason: "not downloaded".to_string(),
                    });
                }
                self.rom.table_by_name(name)
            }
        }

        let library = Library {
            rom: load_test_rom("A2WC522N"),
        };
        let mut names = NameAddressRegistry::new();
        names.insert("Derived", 0x5000);
        let mut scales = ScaleRegistry::new();
        let mut log_msgs = Vec::new();

        let node = XmlNode::parse(r#"<table name="Derived" base="Rev Limit" category="New"/>"#).unwrap();
        let result = ResolveContext::new(&library, &names, &mut scales, &mut log_msgs)
            .resolve_table(&node, None)
            .unwrap();
        let Resolved::Table(table) = result else {
            panic!("table was not resolved");
        };
        assert_eq!(table.storage_address, Some(0x5000));
        assert_eq!(table.storage_type, Some(StorageType::Integer(2)));
        assert_eq!(table.category, "New");

        let node = XmlNode::parse(r#"<table name="Derived" base="remote:Rev Limit"/>"#).unwrap();
        let result = ResolveContext::new(&library, &names, &mut scales, &mut log_msgs)
            .resolve_table(&node, None);
        assert!(matches!(result, Err(ResolveError::CloneFailure { .. })));
        assert!(log_msgs.is_empty());
    }

    #[cfg(feature = "check")]
    #[test]
    fn check_rom() {
        let rom = load_test_rom("A2WC522N");
        let results = rom.check();
        assert!(results.is_empty(), "{results:?}");
    }

    #[test]
    fn load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ecu_defs.xml");
        std::fs::write(&path, TEST_DEFINITION).unwrap();

        let definition = load(&path, false).unwrap();
        assert_eq!(definition.rom_ids()[0].xmlid, "BASE32");
        let (rom, log_msgs) = definition.load_rom("A2WC522S").unwrap();
        assert!(log_msgs.is_empty());
        assert_eq!(rom.tables.len(), 5);
    }
}
