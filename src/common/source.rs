use std::{
    fs,
    io,
    path::{Path, PathBuf},
    rc::Rc,
};

/// Some source text, together with the path it came from.
/// Source files without a path point to `./source`.
#[derive(Debug, PartialEq, Eq)]
pub struct Source {
    pub contents: String,
    pub path: PathBuf,
}

impl Source {
    /// Builds a `Source` from an in-memory string and an explicit path.
    pub fn new(contents: &str, path: &Path) -> Rc<Source> {
        Rc::new(Source {
            contents: contents.to_string(),
            path: path.to_owned(),
        })
    }

    /// Reads a file from disk into a `Source`.
    pub fn path(path: &Path) -> io::Result<Rc<Source>> {
        let contents = fs::read_to_string(path)?;
        Ok(Source::new(&contents, path))
    }

    /// Builds a `Source` from a bare string, with no backing file.
    pub fn source(contents: &str) -> Rc<Source> {
        Source::new(contents, &PathBuf::from("./source"))
    }
}
