use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    fs::{self, File},
    io::{self, Read},
    marker::PhantomData,
    path::{Path, PathBuf},
};

use log::debug;
use serde::de::DeserializeOwned;

use crate::{
    BatchError,
    core::item::{ItemReader, ItemReaderResult},
};

enum JsonSource<R> {
    Path(PathBuf),
    Reader(R),
}

/// Reads a JSON array and yields its elements one by one.
///
/// The whole document is parsed when the reader is opened, so a malformed
/// file is rejected before the first item is handed out.
pub struct JsonItemReader<R, T> {
    source: RefCell<Option<JsonSource<R>>>,
    origin: String,
    opened: Cell<bool>,
    items: RefCell<VecDeque<T>>,
}

impl<R: Read, T: DeserializeOwned> JsonItemReader<R, T> {
    fn new(source: JsonSource<R>, origin: String) -> Self {
        Self {
            source: RefCell::new(Some(source)),
            origin,
            opened: Cell::new(false),
            items: RefCell::new(VecDeque::new()),
        }
    }

    /// Number of items parsed and not read yet.
    pub fn remaining(&self) -> usize {
        self.items.borrow().len()
    }

    fn load(&self, source: JsonSource<R>) -> Result<Vec<T>, BatchError> {
        let content = match source {
            JsonSource::Path(path) => {
                if !path.exists() {
                    return Err(BatchError::MissingFile(path));
                }
                fs::read_to_string(&path)
            }
            JsonSource::Reader(mut rdr) => {
                let mut content = String::new();
                rdr.read_to_string(&mut content).map(|_| content)
            }
        }
        .map_err(|error| self.io_error(error))?;

        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

        serde_json::from_str(content).map_err(|error| BatchError::Format {
            origin: self.origin.clone(),
            message: error.to_string(),
        })
    }

    fn io_error(&self, error: io::Error) -> BatchError {
        if error.kind() == io::ErrorKind::InvalidData {
            BatchError::Format {
                origin: self.origin.clone(),
                message: "content is not valid UTF-8".to_string(),
            }
        } else {
            BatchError::ItemReader(format!("{}: {}", self.origin, error))
        }
    }
}

impl<R: Read, T: DeserializeOwned> ItemReader<T> for JsonItemReader<R, T> {
    fn open(&self) -> Result<(), BatchError> {
        if self.opened.get() {
            return Ok(());
        }

        let Some(source) = self.source.borrow_mut().take() else {
            return Err(BatchError::ItemReader(format!(
                "{} cannot be opened twice",
                self.origin
            )));
        };

        let items = self.load(source)?;
        debug!("{} items parsed from {}", items.len(), self.origin);

        *self.items.borrow_mut() = items.into();
        self.opened.set(true);
        Ok(())
    }

    fn read(&self) -> ItemReaderResult<T> {
        if !self.opened.get() {
            self.open()?;
        }

        Ok(self.items.borrow_mut().pop_front())
    }
}

pub struct JsonItemReaderBuilder<T> {
    _pd: PhantomData<T>,
}

impl<T> Default for JsonItemReaderBuilder<T> {
    fn default() -> Self {
        Self { _pd: PhantomData }
    }
}

impl<T: DeserializeOwned> JsonItemReaderBuilder<T> {
    pub fn new() -> JsonItemReaderBuilder<T> {
        Self::default()
    }

    /// Reader over a file. The file is only touched when the reader is opened,
    /// a missing file surfaces then as [`BatchError::MissingFile`].
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> JsonItemReader<File, T> {
        let path = path.as_ref().to_path_buf();
        let origin = path.display().to_string();
        JsonItemReader::new(JsonSource::Path(path), origin)
    }

    pub fn from_reader<R: Read>(self, rdr: R) -> JsonItemReader<R, T> {
        JsonItemReader::new(JsonSource::Reader(rdr), "<reader>".to_string())
    }
}
