//! Reader for the line-oriented `GameLevel.txt` format exported from Blender:
//!
//! ```text
//! MESH
//! Crate.001
//! <Matrix 4x4 (1.0000, 0.0000, 0.0000, 0.0000)
//!             (0.0000, 1.0000, 0.0000, 0.0000)
//!             (0.0000, 0.0000, 1.0000, 0.0000)
//!             (2.0000, 3.0000, 4.0000, 1.0000)>
//! LIGHT
//! ```
//!
//! Every matrix row carries a 13-character prefix that is skipped without being
//! checked. The prefix is counted in characters, not bytes. An empty line ends
//! the file.

use std::{iter::Enumerate, str::Lines};

use crate::{error::LevelParseError, loader::H2B_EXTENSION};

pub const MESH_TOKEN: &str = "MESH";
pub const LIGHT_TOKEN: &str = "LIGHT";
pub const MATRIX_ROW_PREFIX_LEN: usize = 13;

#[derive(Debug, Clone, PartialEq)]
pub enum LevelRecord {
    Mesh(MeshRecord),
    /// Recognised, but light data is not read yet and no lines are consumed.
    Light { line: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshRecord {
    pub name: String,
    /// Rows exactly as written in the file. The last row holds the translation.
    pub rows: [[f32; 4]; 4],
    /// 1-based line of the `MESH` token.
    pub line: usize,
}

impl MeshRecord {
    /// The file stores matrices with the translation in the last row, which is the
    /// same memory order cgmath uses for columns.
    pub fn world_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from(self.rows)
    }

    pub fn asset_file_name(&self) -> String {
        asset_file_name(&self.name)
    }
}

/// `Crate.001` → `Crate.h2b`; a name without a dot just gets the extension.
pub fn asset_file_name(name: &str) -> String {
    let stem = match name.rfind('.') {
        Some(dot) => &name[..dot],
        None => name,
    };
    format!("{stem}.{H2B_EXTENSION}")
}

/// Parses the four comma-separated floats following the fixed row prefix.
pub fn parse_matrix_row(text: &str, line: usize) -> Result<[f32; 4], LevelParseError> {
    let body = match text.char_indices().nth(MATRIX_ROW_PREFIX_LEN) {
        Some((start, _)) => &text[start..],
        None => {
            return Err(LevelParseError::new(
                format!("matrix row shorter than its {MATRIX_ROW_PREFIX_LEN}-character prefix"),
                line,
            ))
        }
    };

    let fields: Vec<&str> = body.split(',').collect();
    if fields.len() != 4 {
        return Err(LevelParseError::new(
            format!("expected 4 matrix values, found {}", fields.len()),
            line,
        ));
    }

    let mut row = [0.0; 4];
    for (slot, field) in row.iter_mut().zip(fields) {
        let field = field.trim().trim_end_matches(&[')', '>'][..]).trim_end();
        *slot = field
            .parse()
            .map_err(|_| LevelParseError::new(format!("invalid number {field:?}"), line))?;
    }
    Ok(row)
}

/// Iterates the records of a level description. A malformed record yields an
/// error and reading resumes with the following line.
pub struct LevelFileReader<'a> {
    lines: Enumerate<Lines<'a>>,
    finished: bool,
}

impl<'a> LevelFileReader<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
            finished: false,
        }
    }

    /// Next line with its 1-based number; `None` at end of input or the empty sentinel line.
    fn next_line(&mut self) -> Option<(usize, &'a str)> {
        if self.finished {
            return None;
        }
        match self.lines.next() {
            Some((i, line)) => {
                let line = line.trim_end_matches('\r');
                if line.is_empty() {
                    self.finished = true;
                    None
                } else {
                    Some((i + 1, line))
                }
            }
            None => {
                self.finished = true;
                None
            }
        }
    }

    fn read_mesh(&mut self, token_line: usize) -> Result<MeshRecord, LevelParseError> {
        let (_, name) = self
            .next_line()
            .ok_or_else(|| LevelParseError::new("MESH record ends before its name", token_line))?;

        let mut rows = [[0.0; 4]; 4];
        for (i, row) in rows.iter_mut().enumerate() {
            let (line, text) = self.next_line().ok_or_else(|| {
                LevelParseError::new(
                    format!("MESH record {name:?} ends after {i} of 4 matrix rows"),
                    token_line,
                )
            })?;
            *row = parse_matrix_row(text, line)?;
        }

        Ok(MeshRecord {
            name: name.to_string(),
            rows,
            line: token_line,
        })
    }
}

impl Iterator for LevelFileReader<'_> {
    type Item = Result<LevelRecord, LevelParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (line, text) = self.next_line()?;
            match text {
                MESH_TOKEN => return Some(self.read_mesh(line).map(LevelRecord::Mesh)),
                LIGHT_TOKEN => return Some(Ok(LevelRecord::Light { line })),
                // Anything else between records is ignored.
                _ => continue,
            }
        }
    }
}
