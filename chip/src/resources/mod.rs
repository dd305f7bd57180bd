use std::{
    fs,
    io::{prelude::*, Cursor},
    path::Path,
};
use zip::read::ZipArchive;

use crate::{definitions::memory, LoadError};

/// Represents an archive of roms
/// it contains all kind of information about the information of the archives
pub struct RomArchive {
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl RomArchive {
    /// Will open the given zip data as a rom archive
    pub fn new(data: Vec<u8>) -> Result<Self, LoadError> {
        Ok(RomArchive {
            archive: ZipArchive::new(Cursor::new(data))?,
        })
    }

    /// Will read the zip archive at the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let data = fs::read(path)?;
        Self::new(data)
    }

    /// Will return all the rom names available to be chosen
    pub fn file_names(&self) -> Vec<&'_ str> {
        self.archive.file_names().collect()
    }

    /// Will decompress the information from the zip archive
    pub fn get_file_data(&mut self, name: &str) -> Result<Rom, LoadError> {
        let mut file = self.archive.by_name(name)?;
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        Rom::new(name, data)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Represents a single rom with it's information
pub struct Rom {
    /// The rom name
    name: String,
    /// The raw program bytes, they are loaded verbatim at the program start
    data: Box<[u8]>,
}

impl Rom {
    /// Will generate a new rom based of the given data, fails if the data
    /// does not fit into memory behind the program start.
    pub fn new<D: Into<Vec<u8>>>(name: &str, data: D) -> Result<Self, LoadError> {
        let data = data.into();
        if data.len() >= memory::MAX_ROM_SIZE {
            return Err(LoadError::TooLarge {
                len: data.len(),
                max: memory::MAX_ROM_SIZE,
            });
        }
        Ok(Rom {
            name: name.to_string(),
            data: data.into_boxed_slice(),
        })
    }

    /// Will read a raw rom file, the file name becomes the rom name.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::info!("Loaded rom '{}' with {} bytes", name, data.len());
        Self::new(&name, data)
    }

    /// Will return a slice internal values of the given data
    pub fn get_data(&self) -> &[u8] {
        &self.data
    }

    /// Will return the name of the rom.
    pub fn get_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::{build_opcode, Opcode};
    use std::io::Write;
    use zip::{write::FileOptions, ZipWriter};

    const PROGRAM: [u8; 8] = [0x60, 0x05, 0x70, 0x03, 0x80, 0x14, 0x00, 0xE0];

    fn build_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in files {
            writer
                .start_file(*name, FileOptions::default())
                .expect("unable to start the archive entry");
            writer.write_all(data).expect("unable to write the entry");
        }
        writer
            .finish()
            .expect("unable to finish the archive")
            .into_inner()
    }

    #[test]
    fn test_rom_size_limit() {
        let ok = Rom::new("max", vec![0; memory::MAX_ROM_SIZE - 1]);
        assert!(ok.is_ok());

        let err = Rom::new("too large", vec![0; memory::MAX_ROM_SIZE]);
        assert!(matches!(
            err,
            Err(LoadError::TooLarge { len, max }) if len == 3584 && max == 3584
        ));
    }

    #[test]
    fn test_rom_extract() {
        let data = build_archive(&[("PONG", &PROGRAM[..]), ("EMPTY", &[][..])]);
        let mut ra = RomArchive::new(data).unwrap();
        let rom = ra.get_file_data("PONG").unwrap();
        assert_eq!(rom.get_name(), "PONG");

        let expected: [Opcode; 4] = [0x6005, 0x7003, 0x8014, 0x00E0];
        let data = rom.get_data();
        for i in (0..data.len()).step_by(2) {
            assert_eq!(build_opcode(data, i), Ok(expected[i / 2]));
        }

        let empty = ra.get_file_data("EMPTY").unwrap();
        assert!(empty.get_data().is_empty());
    }

    #[test]
    fn test_file_names() {
        let data = build_archive(&[("TETRIS", &PROGRAM[..]), ("BRIX", &PROGRAM[..])]);
        let ra = RomArchive::new(data).unwrap();
        let mut files = ra.file_names();
        files.sort_unstable();
        assert_eq!(files, vec!["BRIX", "TETRIS"]);
    }

    #[test]
    fn test_missing_entry() {
        let data = build_archive(&[("TETRIS", &PROGRAM[..])]);
        let mut ra = RomArchive::new(data).unwrap();
        assert!(matches!(
            ra.get_file_data("PONG"),
            Err(LoadError::Archive(_))
        ));
    }

    #[test]
    fn test_not_an_archive() {
        assert!(matches!(
            RomArchive::new(PROGRAM.to_vec()),
            Err(LoadError::Archive(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("chip8-rom-{}.ch8", std::process::id()));
        fs::write(&path, PROGRAM).unwrap();

        let rom = Rom::from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(rom.get_data(), &PROGRAM[..]);
        assert!(rom.get_name().ends_with(".ch8"));

        assert!(matches!(Rom::from_file(&path), Err(LoadError::Io(_))));
    }
}
