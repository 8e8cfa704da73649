//! Interpretation of attribute values in a ROM definition
//!
//! All attribute values are plain strings. The functions in this module turn them into
//! addresses, storage types, byte orders and table types.

use num_traits::Num;
use thiserror::Error;

use crate::table::{Endian, StorageType, TableType};

/// parse a number that may be given as decimal or as `0x`-prefixed hex
///
/// Returns `None` if the text is not a valid number of type `T`.
pub(crate) fn parse_number<T: Num>(text: &str) -> Option<T> {
    let text = text.trim();
    if text.len() > 2 && (text.starts_with("0x") || text.starts_with("0X")) {
        T::from_str_radix(&text[2..], 16).ok()
    } else {
        T::from_str_radix(text, 10).ok()
    }
}

/// parse an address string
///
/// Addresses are hexadecimal, with or without a `0x` prefix. A leading `-` is accepted, so that
/// the placeholder value "-1" used for tables without an address can be represented.
#[must_use]
pub fn parse_hex_string(text: &str) -> Option<i64> {
    let text = text.trim();
    let digits = if text.len() > 2 && (text.starts_with("0x") || text.starts_with("0X")) {
        &text[2..]
    } else {
        text
    };
    i64::from_str_radix(digits, 16).ok()
}

/// convert a parsed address to a resolved address
///
/// Any value below 1 does not point at real data and is treated as unresolved.
pub(crate) fn resolved_address(raw: i64) -> Option<u32> {
    if raw < 1 {
        None
    } else {
        u32::try_from(raw).ok()
    }
}

/// the text of a `storagetype` attribute is not a storage type
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("\"{0}\" is not a valid storage type")]
pub struct InvalidStorageType(pub String);

/// parse the `storagetype` attribute of a table
///
/// `Ok(None)` is returned for "0", which means that the storage type is not set.
///
/// # Errors
///
/// [`InvalidStorageType`] if the text does not describe a storage type.
pub fn parse_storage_type(text: &str) -> Result<Option<StorageType>, InvalidStorageType> {
    let invalid = || InvalidStorageType(text.to_string());
    let text = text.trim();
    let lower = text.to_ascii_lowercase();

    if lower == "float" {
        Ok(Some(StorageType::Float))
    } else if lower == "movi20s" {
        Ok(Some(StorageType::Movi20s))
    } else if lower == "movi20" {
        Ok(Some(StorageType::Movi20))
    } else if let Some(bits) = lower
        .strip_prefix("uint")
        .or_else(|| lower.strip_prefix("int"))
    {
        // intN / uintN give the width in bits
        match bits.parse::<u8>() {
            Ok(bits) if bits > 0 && bits % 8 == 0 => Ok(Some(StorageType::Integer(bits / 8))),
            _ => Err(invalid()),
        }
    } else {
        // plain numbers give the width in bytes
        match parse_number::<u8>(text) {
            Some(0) => Ok(None),
            Some(bytes) => Ok(Some(StorageType::Integer(bytes))),
            None => Err(invalid()),
        }
    }
}

/// determine if the `storagetype` attribute describes signed data
#[must_use]
pub fn parse_storage_sign(text: &str) -> bool {
    let lower = text.trim().to_ascii_lowercase();
    lower.starts_with("int") || lower == "movi20s"
}

/// parse the `endian` attribute of a table
///
/// Everything except "little" is big endian.
#[must_use]
pub fn parse_endian(text: &str) -> Endian {
    if text.trim().eq_ignore_ascii_case("little") {
        Endian::Little
    } else {
        Endian::Big
    }
}

/// parse the `type` attribute of a table
#[must_use]
pub fn parse_table_type(text: &str) -> Option<TableType> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("1D") {
        Some(TableType::Table1D)
    } else if text.eq_ignore_ascii_case("2D") {
        Some(TableType::Table2D)
    } else if text.eq_ignore_ascii_case("3D") {
        Some(TableType::Table3D)
    } else if text.eq_ignore_ascii_case("X Axis") || text.eq_ignore_ascii_case("Static X Axis") {
        Some(TableType::XAxis)
    } else if text.eq_ignore_ascii_case("Y Axis") || text.eq_ignore_ascii_case("Static Y Axis") {
        Some(TableType::YAxis)
    } else if text.eq_ignore_ascii_case("Switch") {
        Some(TableType::Switch)
    } else if text.eq_ignore_ascii_case("BitwiseSwitch") {
        Some(TableType::BitwiseSwitch)
    } else {
        None
    }
}

/// axis tables may always be created, even if they are not listed in the `NameAddressRegistry`
pub(crate) fn is_axis_type_name(text: &str) -> bool {
    text.contains("xis")
}
