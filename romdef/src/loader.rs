use crate::RomDefError;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// read a definition file into a string
///
/// Definition files are UTF-8, UTF-16 with a byte order mark, or ISO 8859-1.
pub(crate) fn load(path: &Path) -> Result<String, RomDefError> {
    let mut file = File::open(path).map_err(|ioerror| RomDefError::FileOpenError {
        filename: path.to_path_buf(),
        ioerror,
    })?;

    let filedata = read_data(&mut file, path)?;
    Ok(decode_raw_bytes(&filedata))
}

fn read_data(file: &mut File, path: &Path) -> Result<Vec<u8>, RomDefError> {
    let filesize = file
        .metadata()
        .map_err(|ioerror| RomDefError::FileReadError {
            filename: path.to_path_buf(),
            ioerror,
        })?
        .len();
    let mut buffer = Vec::with_capacity(usize::try_from(filesize).unwrap_or(0));
    file.read_to_end(&mut buffer)
        .map_err(|ioerror| RomDefError::FileReadError {
            filename: path.to_path_buf(),
            ioerror,
        })?;
    Ok(buffer)
}

fn decode_raw_bytes(filedata: &[u8]) -> String {
    // UTF-16 is only recognized by its byte order mark
    let u16conversion: Option<fn([u8; 2]) -> u16> = match filedata {
        [0xfe, 0xff, ..] => Some(u16::from_be_bytes),
        [0xff, 0xfe, ..] => Some(u16::from_le_bytes),
        _ => None,
    };
    if let Some(conversion) = u16conversion {
        if filedata.len() % 2 == 0 {
            let filedata_u16: Vec<u16> = filedata[2..]
                .chunks_exact(2)
                .map(|pair| conversion([pair[0], pair[1]]))
                .collect();
            if let Ok(converted) = String::from_utf16(&filedata_u16) {
                return converted;
            }
        }
    }

    let utf8data = filedata.strip_prefix(b"\xef\xbb\xbf").unwrap_or(filedata);
    if let Ok(converted) = std::str::from_utf8(utf8data) {
        return converted.to_string();
    }

    // ISO 8859-1: every byte is a valid character
    filedata.iter().map(|ch| char::from(*ch)).collect()
}
